//! # Pipeline Director
//!
//! Orchestratore della pipeline di staging: import → optimize → geotag → package.
//!
//! ## Responsabilità:
//! - Possiede lo skeleton delle directory e il registro degli asset
//!   (`uploaded` accettati, `invalid` scartati) con id sequenziali
//! - Routing dell'import: immagini in `original`, il resto in `ignored` con id -1
//! - Staging di un asset verso `optimized` / `geotagged` (copia + suffisso + puntatore)
//! - Batch optimize / geotag sequenziali: un fallimento non ferma gli altri asset
//! - Predicati di readiness, packaging zip e consegna dell'archivio
//! - Reset completo del registro e dello skeleton
//!
//! ## Flag:
//! `is_optimized` / `is_geotagged` vengono impostati solo quando l'operazione
//! corrispondente termina con successo (anche come no-op per i formati non
//! supportati). In caso di errore il flag resta invariato e il fallimento
//! finisce nel `BatchReport`.

use crate::asset::planner::OptimizeOptions;
use crate::asset::{Asset, AssetFlag, AssetSummary, ExifListing, OptimizeOutcome, REJECTED_ID};
use crate::config::Config;
use crate::error::{Result, WaoError};
use crate::file_manager::{DeleteReport, FileManager};
use crate::geotag::{Coordinates, GeoTagger, GeotagOutcome};
use crate::media_type::MediaType;
use crate::optimizer_tool::ExternalOptimizer;
use crate::pipeline::batch::{self, BatchReport};
use crate::pipeline::skeleton::{Skeleton, Stage};
use crate::progress::ProgressManager;
use crate::utils::split_file_name;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Where an imported file ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Accepted(i64),
    Rejected,
}

/// Outcome of importing a whole folder
#[derive(Debug, Default)]
pub struct ImportReport {
    pub accepted: Vec<i64>,
    pub rejected: Vec<String>,
    pub failed: Vec<(String, WaoError)>,
}

/// Staging pipeline orchestrator
pub struct Director {
    config: Config,
    skeleton: Skeleton,
    optimizer: ExternalOptimizer,
    uploaded: Vec<Asset>,
    invalid: Vec<Asset>,
    next_id: i64,
    is_download: bool,
}

impl Director {
    /// Creates the director and builds the directory skeleton
    pub async fn new(config: Config) -> Result<Self> {
        let skeleton = Skeleton::new(&config.root);
        skeleton.build().await?;

        info!("📁 Asset root: {}", skeleton.upload_root().display());

        Ok(Self {
            optimizer: ExternalOptimizer::from_config(&config),
            skeleton,
            config,
            uploaded: Vec::new(),
            invalid: Vec::new(),
            next_id: 0,
            is_download: false,
        })
    }

    /// Replaces the external optimizer
    pub fn with_optimizer(mut self, optimizer: ExternalOptimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn uploaded(&self) -> &[Asset] {
        &self.uploaded
    }

    pub fn invalid(&self) -> &[Asset] {
        &self.invalid
    }

    pub fn next_id(&self) -> i64 {
        self.next_id
    }

    pub fn is_download(&self) -> bool {
        self.is_download
    }

    fn show_progress(&self) -> bool {
        self.config.show_progress && !self.config.json_output
    }

    /// Idempotently ensures every skeleton directory exists
    pub async fn build_skeleton(&self) -> Result<()> {
        self.skeleton.build().await
    }

    /// Whether a file name carries an accepted image extension
    pub fn validate(filename: &str) -> bool {
        let (_, extension) = split_file_name(filename);
        MediaType::is_accepted_image(extension.trim_start_matches('.'))
    }

    /// Imports one file. Rejection is a routing decision, not an error.
    pub async fn import(&mut self, filename: &str, from_dir: &Path) -> Result<ImportOutcome> {
        if Self::validate(filename) {
            let asset = Asset::new(
                self.next_id,
                filename,
                from_dir,
                &self.skeleton.stage_dir(Stage::Original),
            )
            .await?;

            let id = asset.id;
            info!("📥 Imported #{} {}", id, asset);
            self.uploaded.push(asset);
            self.next_id += 1;
            Ok(ImportOutcome::Accepted(id))
        } else {
            let asset = Asset::new(
                REJECTED_ID,
                filename,
                from_dir,
                &self.skeleton.stage_dir(Stage::Ignored),
            )
            .await?;

            warn!("Ignored {} (not an accepted image)", asset);
            self.invalid.push(asset);
            Ok(ImportOutcome::Rejected)
        }
    }

    /// Imports every regular file directly inside `dir`, in name order
    pub async fn import_dir(&mut self, dir: &Path) -> Result<ImportReport> {
        let mut report = ImportReport::default();

        for name in FileManager::list_files(dir).await? {
            match self.import(&name, dir).await {
                Ok(ImportOutcome::Accepted(id)) => report.accepted.push(id),
                Ok(ImportOutcome::Rejected) => report.rejected.push(name),
                Err(e) => {
                    error!("Failed to import {}: {}", name, e);
                    report.failed.push((name, e));
                }
            }
        }

        info!(
            "Imported {} assets, ignored {}, failed {}",
            report.accepted.len(),
            report.rejected.len(),
            report.failed.len()
        );
        Ok(report)
    }

    pub fn asset_by_id(&self, id: i64) -> Option<&Asset> {
        self.uploaded.iter().find(|asset| asset.id == id)
    }

    fn index_of(&self, id: i64) -> Result<usize> {
        self.uploaded
            .iter()
            .position(|asset| asset.id == id)
            .ok_or(WaoError::UnknownAsset(id))
    }

    /// Empty selection means every uploaded asset
    fn select(&self, ids: &[i64]) -> Vec<i64> {
        if ids.is_empty() {
            self.uploaded.iter().map(|asset| asset.id).collect()
        } else {
            ids.to_vec()
        }
    }

    pub fn summaries(&self) -> Vec<AssetSummary> {
        self.uploaded.iter().map(Asset::summary).collect()
    }

    /// Sets a flag on an uploaded asset by name (`is_optimized`, `is_geotagged`)
    pub fn set_flag(&mut self, id: i64, flag: &str, value: bool) -> Result<()> {
        let flag: AssetFlag = flag.parse()?;
        let index = self.index_of(id)?;
        self.uploaded[index].set_flag(flag, value);
        Ok(())
    }

    fn stage_suffix(&self, stage: Stage) -> Result<&str> {
        match stage {
            Stage::Optimized => Ok(self.config.optimize_suffix.as_str()),
            Stage::Geotagged => Ok(self.config.geotag_suffix.as_str()),
            other => Err(WaoError::Validation(format!(
                "{} is not a processing stage",
                other.dir_name()
            ))),
        }
    }

    async fn stage_one(&mut self, id: i64, stage: Stage) -> Result<()> {
        let index = self.index_of(id)?;
        let suffix = self.stage_suffix(stage)?.to_string();
        let stage_dir = self.skeleton.stage_dir(stage);

        let asset = &self.uploaded[index];
        if asset.active_dir() == stage_dir {
            return Err(WaoError::Validation(format!(
                "{} is already in {}",
                asset.active_name(),
                stage.dir_name()
            )));
        }

        FileManager::copy(asset.active_name(), asset.active_dir(), &stage_dir).await?;
        let staged_name = FileManager::rename_with_suffix(&stage_dir, asset.active_name(), &suffix).await?;

        debug!("Staged #{} into {}/{}", id, stage.dir_name(), staged_name);
        self.uploaded[index].advance_stage(stage_dir, staged_name);
        Ok(())
    }

    /// Copies each selected asset's active file into `stage`, appends the
    /// stage suffix and moves the active pointer there
    pub async fn stage(&mut self, ids: &[i64], stage: Stage) -> BatchReport {
        let mut report = BatchReport::default();

        for id in self.select(ids) {
            match self.stage_one(id, stage).await {
                Ok(()) => report.succeeded.push(id),
                Err(e) => {
                    warn!("Could not stage #{} into {}: {}", id, stage.dir_name(), e);
                    report.fail(id, e);
                }
            }
        }

        report
    }

    /// The copy in `original` is never transformed
    fn ensure_staged(&self, index: usize, action: &str) -> Result<()> {
        let asset = &self.uploaded[index];
        if asset.active_dir() == self.skeleton.stage_dir(Stage::Original) {
            return Err(WaoError::Validation(format!(
                "{} must be staged before {}",
                asset.active_name(),
                action
            )));
        }
        Ok(())
    }

    async fn optimize_one(&mut self, id: i64, options: &OptimizeOptions) -> Result<(usize, OptimizeOutcome)> {
        let index = self.index_of(id)?;
        self.ensure_staged(index, "optimizing")?;
        let limits = self.config.limits;

        let outcome = self.uploaded[index]
            .optimize(options, &limits, &self.optimizer)
            .await?;
        Ok((index, outcome))
    }

    async fn geotag_one(&self, id: i64, coords: Coordinates, altitude: f64) -> Result<(usize, GeotagOutcome)> {
        let index = self.index_of(id)?;
        self.ensure_staged(index, "geotagging")?;

        let outcome = GeoTagger::tag(&self.uploaded[index], coords, altitude).await?;
        Ok((index, outcome))
    }

    /// Optimizes each selected asset; a failure leaves that asset's flag unset
    pub async fn optimize_batch(&mut self, ids: &[i64], options: &OptimizeOptions) -> BatchReport {
        let selection = self.select(ids);
        let progress = ProgressManager::new(selection.len() as u64, self.show_progress());
        let mut report = BatchReport::default();

        info!("🔧 Optimizing {} assets ({:?})", selection.len(), options);

        for id in selection {
            match self.optimize_one(id, options).await {
                Ok((index, outcome)) => {
                    // il flag viene impostato anche per i formati saltati
                    self.uploaded[index].set_flag(AssetFlag::Optimized, true);
                    match outcome {
                        OptimizeOutcome::Applied(command) => {
                            debug!("#{} optimized with `{}`", id, command);
                            report.succeeded.push(id);
                        }
                        OptimizeOutcome::Skipped => report.skipped.push(id),
                    }
                }
                Err(e) => {
                    error!("❌ Optimize failed for #{}: {}", id, e);
                    report.fail(id, e);
                }
            }
            progress.update(&format!("optimize #{}", id));
        }

        progress.finish(&report.format_summary());
        info!("✅ Optimize batch: {}", report.format_summary());
        report
    }

    /// Geotags each selected asset; JPEG gets a GPS block, other formats are a no-op
    pub async fn geotag_batch(&mut self, ids: &[i64], coords: Coordinates, altitude: f64) -> BatchReport {
        let selection = self.select(ids);
        let progress = ProgressManager::new(selection.len() as u64, self.show_progress());
        let mut report = BatchReport::default();

        info!("📍 Geotagging {} assets at {}", selection.len(), coords);

        for id in selection {
            match self.geotag_one(id, coords, altitude).await {
                Ok((index, outcome)) => {
                    self.uploaded[index].set_flag(AssetFlag::Geotagged, true);
                    match outcome {
                        GeotagOutcome::Written => report.succeeded.push(id),
                        GeotagOutcome::Unsupported(_) => report.skipped.push(id),
                    }
                }
                Err(e) => {
                    error!("❌ Geotag failed for #{}: {}", id, e);
                    report.fail(id, e);
                }
            }
            progress.update(&format!("geotag #{}", id));
        }

        progress.finish(&report.format_summary());
        info!("✅ Geotag batch: {}", report.format_summary());
        report
    }

    /// EXIF listing for the selected assets, one result per asset
    pub fn metadata_listing(&self, ids: &[i64]) -> Vec<(i64, Result<ExifListing>)> {
        self.select(ids)
            .into_iter()
            .map(|id| {
                let listing = self
                    .index_of(id)
                    .and_then(|index| self.uploaded[index].exif_listing());
                if let Err(ref e) = listing {
                    warn!("No metadata listing for #{}: {}", id, e);
                }
                (id, listing)
            })
            .collect()
    }

    pub fn all_optimized(&self) -> bool {
        batch::all_optimized(&self.uploaded)
    }

    pub fn all_geotagged(&self) -> bool {
        batch::all_geotagged(&self.uploaded)
    }

    /// Every uploaded asset is optimized and geotagged
    pub fn is_ready(&self) -> bool {
        batch::all_ready(&self.uploaded)
    }

    /// Zips the asset root into the export root
    pub async fn package(&self) -> Result<PathBuf> {
        let source = self.skeleton.upload_root().to_path_buf();
        let destination = self.skeleton.export_root().to_path_buf();
        let base_name = self.config.archive_name.clone();

        if !self.is_ready() {
            warn!("Packaging while some assets are not optimized and geotagged");
        }

        let archive = tokio::task::spawn_blocking(move || FileManager::zip(&source, &destination, &base_name))
            .await
            .map_err(|e| WaoError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        info!("📦 Packaged {}", archive.display());
        Ok(archive)
    }

    /// Copies the archive into `dest_dir` and marks the package as downloaded
    pub async fn deliver(&mut self, archive: &Path, dest_dir: &Path) -> Result<PathBuf> {
        let name = archive
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| WaoError::Validation(format!("Not a file path: {}", archive.display())))?;
        let from_dir = archive.parent().unwrap_or_else(|| Path::new("."));

        let delivered = FileManager::copy(&name, from_dir, dest_dir).await?;
        self.is_download = true;

        info!("⬇️  Delivered {}", delivered.display());
        Ok(delivered)
    }

    /// Clears the registry and rebuilds an empty skeleton
    pub async fn reset(&mut self) -> Result<DeleteReport> {
        self.uploaded.clear();
        self.invalid.clear();
        self.next_id = 0;
        self.is_download = false;

        let report = FileManager::delete_contents(self.skeleton.upload_root()).await;
        if !report.is_complete() {
            warn!("Reset left {} entries behind", report.failed.len());
        }

        self.skeleton.build().await?;
        info!("🧹 Reset complete");
        Ok(report)
    }
}

impl fmt::Display for Director {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Director uploaded=\"{}\" ignored=\"{}\">",
            self.uploaded.len(),
            self.invalid.len()
        )
    }
}
