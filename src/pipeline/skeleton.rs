//! Struttura fissa delle directory sotto la root configurata.
//!
//! ```text
//! <root>/WAOassets/{data, ignored, original, optimized, geotagged}
//! <root>/_exports/
//! ```

use crate::error::{Result, WaoError};
use crate::file_manager::FileManager;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ASSET_ROOT: &str = "WAOassets";
pub const EXPORT_ROOT: &str = "_exports";
pub const LOG_FILE: &str = "log.txt";

/// Named directories under the asset root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Data,
    Ignored,
    Original,
    Optimized,
    Geotagged,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Data,
        Stage::Ignored,
        Stage::Original,
        Stage::Optimized,
        Stage::Geotagged,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::Data => "data",
            Stage::Ignored => "ignored",
            Stage::Original => "original",
            Stage::Optimized => "optimized",
            Stage::Geotagged => "geotagged",
        }
    }
}

/// Paths of the directory skeleton
#[derive(Debug, Clone)]
pub struct Skeleton {
    root: PathBuf,
    upload_root: PathBuf,
    export_root: PathBuf,
}

impl Skeleton {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_root: root.join(ASSET_ROOT),
            export_root: root.join(EXPORT_ROOT),
            root,
        }
    }

    pub fn upload_root(&self) -> &Path {
        &self.upload_root
    }

    pub fn export_root(&self) -> &Path {
        &self.export_root
    }

    pub fn stage_dir(&self, stage: Stage) -> PathBuf {
        self.upload_root.join(stage.dir_name())
    }

    pub fn log_file(&self) -> PathBuf {
        self.stage_dir(Stage::Data).join(LOG_FILE)
    }

    /// Every skeleton directory, parents first
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.upload_root.clone(), self.export_root.clone()];
        dirs.extend(Stage::ALL.iter().map(|stage| self.stage_dir(*stage)));
        dirs
    }

    /// Creates missing directories; safe to call repeatedly
    pub async fn build(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| WaoError::from_io(e, &self.root))?;

        for dir in self.directories() {
            FileManager::make_dir(&dir).await?;
        }

        debug!("Skeleton ready under {}", self.root.display());
        Ok(())
    }

    /// Creates `data/log.txt` if absent
    pub async fn create_log_file(&self) -> Result<PathBuf> {
        let log_file = self.log_file();
        FileManager::make_file(&log_file).await?;
        Ok(log_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let skeleton = Skeleton::new(temp.path().join("site"));

        skeleton.build().await.unwrap();
        tokio::fs::write(skeleton.stage_dir(Stage::Original).join("keep.jpg"), b"x")
            .await
            .unwrap();
        skeleton.build().await.unwrap();

        for dir in skeleton.directories() {
            assert!(dir.is_dir(), "{} missing", dir.display());
        }
        assert!(!skeleton.log_file().exists());
        assert_eq!(skeleton.create_log_file().await.unwrap(), skeleton.log_file());
        assert!(skeleton.log_file().is_file());
        assert!(skeleton.stage_dir(Stage::Original).join("keep.jpg").is_file());
    }

    #[test]
    fn test_layout() {
        let skeleton = Skeleton::new("/srv/wao");
        assert_eq!(skeleton.upload_root(), Path::new("/srv/wao/WAOassets"));
        assert_eq!(skeleton.export_root(), Path::new("/srv/wao/_exports"));
        assert_eq!(skeleton.stage_dir(Stage::Geotagged), Path::new("/srv/wao/WAOassets/geotagged"));
        assert_eq!(skeleton.log_file(), Path::new("/srv/wao/WAOassets/data/log.txt"));
        assert_eq!(skeleton.directories().len(), 7);
    }
}
