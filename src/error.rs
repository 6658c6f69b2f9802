//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom della pipeline.
//!
//! ## Responsabilità:
//! - Definisce `WaoError` enum per categorizzare tutti gli errori possibili
//! - Distingue i path mancanti (`NotFound`) dagli altri errori di I/O
//! - Riporta i fallimenti per-asset dei tool esterni (`TransformFailed`)
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io` / `NotFound`: Errori del filesystem
//! - `Image` / `Exif`: Errori di decodifica immagini e metadata
//! - `Zip`: Errori di packaging dell'archivio
//! - `Geocoding`: Errori del servizio di geocoding
//! - `TransformFailed` / `Timeout`: Optimizer o geotag falliti per un asset
//! - `MissingDependency`: Tool esterno mancante (optimize-images)
//! - `UnknownAsset` / `InvalidFlag` / `Validation`: Errori di input
//!
//! ## Esempio:
//! ```rust
//! use std::process::Output;
//! use wao_stager::WaoError;
//!
//! fn check(name: &str, output: &Output) -> Result<(), WaoError> {
//!     if !output.status.success() {
//!         let reason = String::from_utf8_lossy(&output.stderr).into_owned();
//!         return Err(WaoError::TransformFailed { asset: name.to_string(), reason });
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for the staging pipeline
#[derive(thiserror::Error, Debug)]
pub enum WaoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Geocoding error: {0}")]
    Geocoding(String),

    #[error("Transformation failed for {asset}: {reason}")]
    TransformFailed { asset: String, reason: String },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No uploaded asset with id {0}")]
    UnknownAsset(i64),

    #[error("Unknown asset flag: {0}")]
    InvalidFlag(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl WaoError {
    /// Maps an I/O error on `path` to `NotFound` when the path is missing.
    pub fn from_io(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.into())
        } else {
            Self::Io(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, WaoError>;
