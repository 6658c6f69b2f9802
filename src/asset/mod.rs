//! # Asset Entity
//!
//! Un `Asset` rappresenta un file importato (accettato o scartato).
//!
//! ## Responsabilità:
//! - Copia del file nello stage di destinazione alla creazione
//! - Cattura di estensione, tipo, dimensione (KB) e timestamp
//! - Puntatore attivo (directory + nome) aggiornato solo da `advance_stage`
//! - Flag `is_optimized` / `is_geotagged`
//! - Listing EXIF, assessment dell'immagine e ottimizzazione via tool esterno
//!
//! ## Invariante:
//! La copia nello stage `original` non viene mai modificata: tutte le
//! trasformazioni lavorano sulle copie successive raggiunte dal puntatore attivo.

pub mod assessment;
pub mod planner;

use crate::config::Limits;
use crate::error::{Result, WaoError};
use crate::file_manager::FileManager;
use crate::media_type::{ImageKind, MediaType};
use crate::optimizer_tool::ExternalOptimizer;
use crate::utils::split_file_name;
use assessment::ImageAssessment;
use planner::{OptimizeCommand, OptimizeOptions};
use serde::Serialize;
use std::fmt;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Id given to rejected assets
pub const REJECTED_ID: i64 = -1;

/// Completion flags an asset carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFlag {
    Optimized,
    Geotagged,
}

impl AssetFlag {
    pub fn name(&self) -> &'static str {
        match self {
            AssetFlag::Optimized => "is_optimized",
            AssetFlag::Geotagged => "is_geotagged",
        }
    }
}

impl FromStr for AssetFlag {
    type Err = WaoError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "is_optimized" => Ok(AssetFlag::Optimized),
            "is_geotagged" => Ok(AssetFlag::Geotagged),
            other => Err(WaoError::InvalidFlag(other.to_string())),
        }
    }
}

/// The only view of an asset handed to presentation layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub id: i64,
    pub filename: String,
    pub is_optimized: bool,
    pub is_geotagged: bool,
}

/// Result of an optimize call on one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizeOutcome {
    /// Format left untouched (GIF and others), no process started
    Skipped,
    /// The optimizer ran successfully with this command
    Applied(OptimizeCommand),
}

/// EXIF tags of one file, rendered as `name: value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExifListing {
    pub file_name: String,
    pub entries: Vec<(String, String)>,
}

impl fmt::Display for ExifListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.file_name)?;
        if self.entries.is_empty() {
            return writeln!(f, "  This asset has no metadata.");
        }
        for (name, value) in &self.entries {
            writeln!(f, "  {}: {}", name, value)?;
        }
        Ok(())
    }
}

impl ExifListing {
    /// Reads every EXIF tag of `path`; files without EXIF give an empty listing
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| WaoError::from_io(e, path))?;
        let mut reader = BufReader::new(file);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let entries = match exif::Reader::new().read_from_container(&mut reader) {
            Ok(exif) => exif
                .fields()
                .map(|field| {
                    let name = match field.tag.description() {
                        Some(_) => field.tag.to_string(),
                        None => field.tag.number().to_string(),
                    };
                    (name, field.display_value().with_unit(&exif).to_string())
                })
                .collect(),
            Err(exif::Error::NotFound(_)) | Err(exif::Error::InvalidFormat(_)) => {
                debug!("No EXIF data in {}", file_name);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { file_name, entries })
    }
}

/// One imported file and its staging state
#[derive(Debug, Clone)]
pub struct Asset {
    pub id: i64,
    pub origin_name: String,
    pub origin_dir: PathBuf,
    /// Lowercased, without the leading dot
    pub extension: String,
    pub media_type: MediaType,
    pub size_kb: f64,
    /// Unix seconds
    pub timestamp: i64,
    /// `MM-DD` in UTC
    pub modified: String,
    active_dir: PathBuf,
    active_name: String,
    is_optimized: bool,
    is_geotagged: bool,
}

impl Asset {
    /// Copies `source_dir/filename` into `dest_dir` and records it
    pub async fn new(id: i64, filename: &str, source_dir: &Path, dest_dir: &Path) -> Result<Self> {
        let staged = FileManager::copy(filename, source_dir, dest_dir).await?;

        let (_, extension) = split_file_name(filename);
        let extension = extension.trim_start_matches('.').to_lowercase();
        let size_kb = FileManager::size_kb(&staged).await?;
        let timestamp = FileManager::mtime(&staged).await?;

        let asset = Self {
            id,
            origin_name: filename.to_string(),
            origin_dir: source_dir.to_path_buf(),
            media_type: MediaType::classify(&extension),
            extension,
            size_kb,
            timestamp,
            modified: FileManager::format_month_day(timestamp),
            active_dir: dest_dir.to_path_buf(),
            active_name: filename.to_string(),
            is_optimized: false,
            is_geotagged: false,
        };

        debug!("Created {}", asset);
        Ok(asset)
    }

    pub fn origin_file(&self) -> PathBuf {
        self.origin_dir.join(&self.origin_name)
    }

    pub fn active_dir(&self) -> &Path {
        &self.active_dir
    }

    pub fn active_name(&self) -> &str {
        &self.active_name
    }

    pub fn active_file(&self) -> PathBuf {
        self.active_dir.join(&self.active_name)
    }

    /// Encoding of the active file, which can differ from the origin after a format conversion
    pub fn active_kind(&self) -> ImageKind {
        let (_, extension) = split_file_name(&self.active_name);
        ImageKind::from_extension(extension.trim_start_matches('.'))
    }

    /// Moves the active pointer to another stage copy
    pub fn advance_stage(&mut self, dir: impl Into<PathBuf>, name: impl Into<String>) {
        self.active_dir = dir.into();
        self.active_name = name.into();
    }

    pub fn is_optimized(&self) -> bool {
        self.is_optimized
    }

    pub fn is_geotagged(&self) -> bool {
        self.is_geotagged
    }

    pub fn is_ready(&self) -> bool {
        self.is_optimized && self.is_geotagged
    }

    pub fn set_flag(&mut self, flag: AssetFlag, value: bool) {
        match flag {
            AssetFlag::Optimized => self.is_optimized = value,
            AssetFlag::Geotagged => self.is_geotagged = value,
        }
    }

    pub fn summary(&self) -> AssetSummary {
        AssetSummary {
            id: self.id,
            filename: self.active_name.clone(),
            is_optimized: self.is_optimized,
            is_geotagged: self.is_geotagged,
        }
    }

    /// Decodes the active file and measures it against the limits (0 = default)
    pub fn assess(&self, width_limit: u32, height_limit: u32, limits: &Limits) -> Result<ImageAssessment> {
        ImageAssessment::load(&self.active_file(), width_limit, height_limit, limits)
    }

    /// Command the optimizer would run on the active file, `None` for untouched formats
    pub async fn plan(&self, options: &OptimizeOptions, limits: &Limits) -> Result<Option<OptimizeCommand>> {
        let kind = self.active_kind();
        if matches!(kind, ImageKind::Gif | ImageKind::Other) {
            return Ok(None);
        }

        let path = self.active_file();
        let (width, height, limits) = (options.width, options.height, *limits);
        let assessment = tokio::task::spawn_blocking(move || ImageAssessment::load(&path, width, height, &limits))
            .await
            .map_err(|e| WaoError::TransformFailed {
                asset: self.active_name.clone(),
                reason: e.to_string(),
            })??;

        debug!("{} assessed as {:?}", self.active_name, assessment);
        Ok(OptimizeCommand::derive(kind, &assessment, options))
    }

    /// Plans and runs the optimizer on the active file.
    ///
    /// Flags are left to the caller.
    pub async fn optimize(
        &mut self,
        options: &OptimizeOptions,
        limits: &Limits,
        optimizer: &ExternalOptimizer,
    ) -> Result<OptimizeOutcome> {
        let command = match self.plan(options, limits).await? {
            Some(command) => command,
            None => {
                debug!("Skipping {}: format left untouched", self.active_name);
                return Ok(OptimizeOutcome::Skipped);
            }
        };

        optimizer.run(&command, &self.active_file()).await?;

        if command.converts_format() {
            self.follow_conversion();
        }

        Ok(OptimizeOutcome::Applied(command))
    }

    /// After a PNG→JPEG conversion the source is deleted; point at the new file
    fn follow_conversion(&mut self) {
        if self.active_file().exists() {
            return;
        }

        let (stem, _) = split_file_name(&self.active_name);
        let converted = format!("{}.jpg", stem);
        if self.active_dir.join(&converted).is_file() {
            info!("🔄 {} converted to {}", self.active_name, converted);
            self.active_name = converted;
        }
    }

    /// Lists EXIF tags of the active file
    pub fn exif_listing(&self) -> Result<ExifListing> {
        ExifListing::read(&self.active_file())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Asset type={} size={:.3}kbs modified_on={} name={}>",
            self.media_type, self.size_kb, self.modified, self.active_name
        )
    }
}
