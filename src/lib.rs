//! # WAO Stager Library
//!
//! Modulo principale della libreria: espone le API pubbliche della pipeline
//! di staging delle immagini per il web.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione, limiti di default e validazione
//! - `error`: Tipi di errore custom
//! - `media_type`: Classificazione delle estensioni
//! - `file_manager`: Copia, rinomina, pulizia, listing e packaging zip
//! - `asset`: Record per file, misurazione immagini e pianificazione dell'ottimizzazione
//! - `exif_writer`: Lettura/scrittura del blocco GPS EXIF nei JPEG
//! - `geotag`: Geocoding degli indirizzi e scrittura coordinate
//! - `tool_resolver` / `optimizer_tool`: Ricerca e invocazione dell'optimizer esterno
//! - `pipeline`: Skeleton delle directory e orchestratore
//! - `progress` / `json_output`: Feedback all'utente
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use wao_stager::{Config, Director, OptimizeOptions, Stage};
//!
//! # async fn demo() -> wao_stager::Result<()> {
//! let config = Config::default();
//! let mut director = Director::new(config).await?;
//! director.import_dir("uploads".as_ref()).await?;
//! director.stage(&[], Stage::Optimized).await;
//! let options = OptimizeOptions::from_limits(&director.config().limits);
//! director.optimize_batch(&[], &options).await;
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod config;
pub mod error;
pub mod exif_writer;
pub mod file_manager;
pub mod geotag;
pub mod json_output;
pub mod media_type;
pub mod optimizer_tool;
pub mod pipeline;
pub mod progress;
pub mod tool_resolver;
pub mod utils;

pub use asset::planner::{OptimizeCommand, OptimizeOptions};
pub use asset::{Asset, AssetFlag, AssetSummary, ExifListing, OptimizeOutcome, REJECTED_ID};
pub use config::{Config, Limits};
pub use error::{Result, WaoError};
pub use file_manager::{DeleteReport, FileManager};
pub use geotag::{Coordinates, GeoTagger, Geocoder, NominatimGeocoder, DEFAULT_ALTITUDE};
pub use media_type::{ImageKind, MediaType};
pub use optimizer_tool::ExternalOptimizer;
pub use pipeline::{BatchReport, Director, ImportOutcome, Skeleton, Stage};
