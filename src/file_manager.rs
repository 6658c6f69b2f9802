//! # File Management Module
//!
//! Questo modulo raccoglie tutte le primitive sul filesystem usate dalla pipeline.
//!
//! ## Responsabilità:
//! - Query di dimensione e modification time (errore `NotFound` se il path manca)
//! - Creazione idempotente di directory e file
//! - Copia con auto-riparazione della directory di destinazione mancante
//! - Rename con suffisso (`photo.jpg` → `photo_web.jpg`)
//! - Cancellazione ricorsiva del contenuto di una directory con report dei fallimenti
//! - Packaging zip dell'albero degli asset
//!
//! ## Semantica della copia:
//! - Se la copia fallisce perché manca la directory di destinazione, la directory
//!   (con i parent intermedi) viene creata e la copia ritentata una sola volta
//! - Qualsiasi altro errore (sorgente mancante, permessi) viene propagato
//!
//! ## Esempio:
//! ```rust
//! # use std::path::Path;
//! use wao_stager::FileManager;
//!
//! # async fn demo(upload_dir: &Path, original_dir: &Path, optimized_dir: &Path) -> wao_stager::Result<()> {
//! let staged = FileManager::copy("photo.jpg", upload_dir, original_dir).await?;
//! FileManager::copy("photo.jpg", original_dir, optimized_dir).await?;
//! let renamed = FileManager::rename_with_suffix(optimized_dir, "photo.jpg", "web").await?;
//! assert_eq!(renamed, "photo_web.jpg");
//! # let _ = staged;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, WaoError};
use crate::utils::split_file_name;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Outcome of a best-effort recursive delete
#[derive(Debug, Default)]
pub struct DeleteReport {
    /// Number of top-level entries removed
    pub removed: usize,
    /// Entries that could not be removed, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Stateless filesystem operations for staging assets
pub struct FileManager;

impl FileManager {
    /// Size of a file in bytes
    pub async fn size_bytes(path: &Path) -> Result<u64> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| WaoError::from_io(e, path))?;
        Ok(metadata.len())
    }

    /// Size of a file in kilobytes (1 KB = 1000 bytes)
    pub async fn size_kb(path: &Path) -> Result<f64> {
        let bytes = Self::size_bytes(path).await?;
        Ok(bytes as f64 / 1000.0)
    }

    /// Modification time in whole Unix seconds
    pub async fn mtime(path: &Path) -> Result<i64> {
        let metadata = fs::metadata(path)
            .await
            .map_err(|e| WaoError::from_io(e, path))?;
        Ok(Self::unix_seconds(metadata.modified()?))
    }

    fn mtime_blocking(path: &Path) -> Result<i64> {
        let metadata = std::fs::metadata(path).map_err(|e| WaoError::from_io(e, path))?;
        Ok(Self::unix_seconds(metadata.modified()?))
    }

    fn unix_seconds(time: SystemTime) -> i64 {
        match time.duration_since(SystemTime::UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            Err(before) => -(before.duration().as_secs() as i64),
        }
    }

    /// Formats a Unix timestamp as `MM-DD` in UTC
    pub fn format_month_day(timestamp: i64) -> String {
        DateTime::<Utc>::from_timestamp(timestamp, 0)
            .map(|dt| dt.format("%m-%d").to_string())
            .unwrap_or_else(|| "00-00".to_string())
    }

    /// Creates a directory if it does not exist yet. Parents are not created.
    pub async fn make_dir(path: &Path) -> Result<()> {
        match fs::create_dir(path).await {
            Ok(()) => {
                debug!("Created directory: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(WaoError::from_io(e, path)),
        }
    }

    /// Creates an empty file if it does not exist yet
    pub async fn make_file(path: &Path) -> Result<()> {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| WaoError::from_io(e, path))?;
        Ok(())
    }

    /// Copies `name` from `from_dir` into `to_dir`, returning the destination path.
    ///
    /// A missing destination directory is created (with its parents) and the
    /// copy retried once. Any other failure is returned unchanged.
    pub async fn copy(name: &str, from_dir: &Path, to_dir: &Path) -> Result<PathBuf> {
        let source = from_dir.join(name);
        let destination = to_dir.join(name);

        match fs::copy(&source, &destination).await {
            Ok(_) => Ok(destination),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && source.is_file() && !to_dir.is_dir() => {
                debug!("Destination {} missing, creating it and retrying copy", to_dir.display());
                fs::create_dir_all(to_dir)
                    .await
                    .map_err(|e| WaoError::from_io(e, to_dir))?;
                fs::copy(&source, &destination)
                    .await
                    .map_err(|e| WaoError::from_io(e, &source))?;
                Ok(destination)
            }
            Err(e) => Err(WaoError::from_io(e, &source)),
        }
    }

    /// Renames `dir/old_name` to `dir/<stem>_<suffix><ext>` and returns the new name
    pub async fn rename_with_suffix(dir: &Path, old_name: &str, suffix: &str) -> Result<String> {
        let (stem, extension) = split_file_name(old_name);
        let new_name = format!("{}_{}{}", stem, suffix, extension);
        let source = dir.join(old_name);

        fs::rename(&source, dir.join(&new_name))
            .await
            .map_err(|e| WaoError::from_io(e, &source))?;

        debug!("Renamed {} -> {}", old_name, new_name);
        Ok(new_name)
    }

    /// Removes everything under `path`, keeping `path` itself.
    ///
    /// Never fails: entries that cannot be removed are logged and listed in the report.
    pub async fn delete_contents(path: &Path) -> DeleteReport {
        let mut report = DeleteReport::default();

        let mut entries = match fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!("Cannot read {}: {}", path.display(), e);
                report.failed.push((path.to_path_buf(), e.to_string()));
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Error listing {}: {}", path.display(), e);
                    report.failed.push((path.to_path_buf(), e.to_string()));
                    break;
                }
            };

            let entry_path = entry.path();
            let is_dir = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);

            let result = if is_dir {
                fs::remove_dir_all(&entry_path).await
            } else {
                fs::remove_file(&entry_path).await
            };

            match result {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!("Failed to remove {}: {}", entry_path.display(), e);
                    report.failed.push((entry_path, e.to_string()));
                }
            }
        }

        report
    }

    /// Regular files directly inside `dir`, sorted by name
    pub async fn list_files(dir: &Path) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| WaoError::from_io(e, dir))?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Archive file name for a directory timestamp: `<YY-MM-DD>-<base_name>.zip`
    pub fn archive_file_name(timestamp: i64, base_name: &str) -> Result<String> {
        let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
            .ok_or_else(|| WaoError::Validation(format!("Timestamp out of range: {}", timestamp)))?;
        Ok(format!("{}-{}.zip", date.format("%y-%m-%d"), base_name))
    }

    /// Deflates the whole `source_root` tree into `dest_dir/<YY-MM-DD>-<base_name>.zip`.
    ///
    /// Entry names are relative to the parent of `source_root`, so they start
    /// with the root's own directory name. The date prefix comes from the
    /// modification time of `dest_dir`.
    pub fn zip(source_root: &Path, dest_dir: &Path, base_name: &str) -> Result<PathBuf> {
        let stamp = Self::mtime_blocking(dest_dir)?;
        let archive_path = dest_dir.join(Self::archive_file_name(stamp, base_name)?);
        let base = source_root.parent().unwrap_or(source_root);

        let file = std::fs::File::create(&archive_path)?;
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut entries = 0usize;

        for entry in WalkDir::new(source_root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(base)
                .map_err(|e| WaoError::Validation(format!("{}: {}", entry.path().display(), e)))?;
            let entry_name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            writer.start_file(entry_name, options)?;
            let mut input = std::fs::File::open(entry.path())?;
            std::io::copy(&mut input, &mut writer)?;
            entries += 1;
        }

        writer.finish()?;
        debug!("Packaged {} files into {}", entries, archive_path.display());
        Ok(archive_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    async fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, bytes).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_size_and_mtime_of_missing_path() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.jpg");

        assert!(matches!(FileManager::size_kb(&missing).await, Err(WaoError::NotFound(_))));
        assert!(matches!(FileManager::mtime(&missing).await, Err(WaoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_size_kb() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "a.bin", &vec![0u8; 1536]).await;
        assert_eq!(FileManager::size_kb(&path).await.unwrap(), 1.536);

        let tiny = write(temp.path(), "b.bin", b"x").await;
        assert_eq!(FileManager::size_kb(&tiny).await.unwrap(), 0.001);
        let empty = write(temp.path(), "c.bin", b"").await;
        assert_eq!(FileManager::size_kb(&empty).await.unwrap(), 0.0);
    }

    #[test]
    fn test_format_month_day() {
        // 2021-03-04T12:00:00Z
        assert_eq!(FileManager::format_month_day(1_614_859_200), "03-04");
    }

    #[tokio::test]
    async fn test_make_dir_is_idempotent_and_does_not_create_parents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("stage");

        FileManager::make_dir(&dir).await.unwrap();
        FileManager::make_dir(&dir).await.unwrap();
        assert!(dir.is_dir());

        let nested = temp.path().join("a").join("b");
        assert!(FileManager::make_dir(&nested).await.is_err());
    }

    #[tokio::test]
    async fn test_make_file_keeps_existing_content() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), "log.txt", b"keep").await;

        FileManager::make_file(&path).await.unwrap();
        assert_eq!(fs::read(&path).await.unwrap(), b"keep");

        let fresh = temp.path().join("new.txt");
        FileManager::make_file(&fresh).await.unwrap();
        assert!(fresh.is_file());
    }

    #[tokio::test]
    async fn test_copy_heals_missing_destination() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "photo.jpg", b"pixels").await;
        let destination = temp.path().join("deep").join("original");

        let copied = FileManager::copy("photo.jpg", temp.path(), &destination).await.unwrap();
        assert_eq!(copied, destination.join("photo.jpg"));
        assert_eq!(fs::read(&copied).await.unwrap(), b"pixels");
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_not_healed() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("original");

        let result = FileManager::copy("ghost.jpg", temp.path(), &destination).await;
        assert!(matches!(result, Err(WaoError::NotFound(_))));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_rename_with_suffix_chains_on_current_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "photo.jpg", b"x").await;

        let first = FileManager::rename_with_suffix(temp.path(), "photo.jpg", "web").await.unwrap();
        assert_eq!(first, "photo_web.jpg");

        let second = FileManager::rename_with_suffix(temp.path(), &first, "geo").await.unwrap();
        assert_eq!(second, "photo_web_geo.jpg");
        assert!(temp.path().join("photo_web_geo.jpg").is_file());
        assert!(!temp.path().join("photo.jpg").exists());
    }

    #[tokio::test]
    async fn test_rename_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let result = FileManager::rename_with_suffix(temp.path(), "photo.jpg", "web").await;
        assert!(matches!(result, Err(WaoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_contents_keeps_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("WAOassets");
        fs::create_dir_all(root.join("original").join("nested")).await.unwrap();
        write(&root.join("original"), "a.jpg", b"a").await;
        write(&root, "top.txt", b"t").await;

        let report = FileManager::delete_contents(&root).await;
        assert!(report.is_complete());
        assert_eq!(report.removed, 2);
        assert!(root.is_dir());
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_delete_contents_of_missing_dir() {
        let temp = TempDir::new().unwrap();
        let report = FileManager::delete_contents(&temp.path().join("absent")).await;
        assert!(report.is_complete());
        assert_eq!(report.removed, 0);
    }

    #[tokio::test]
    async fn test_list_files_skips_directories() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.png", b"b").await;
        write(temp.path(), "a.jpg", b"a").await;
        fs::create_dir(temp.path().join("sub")).await.unwrap();

        let names = FileManager::list_files(temp.path()).await.unwrap();
        assert_eq!(names, vec!["a.jpg".to_string(), "b.png".to_string()]);
    }

    #[test]
    fn test_zip_packages_tree_named_after_dest_mtime() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("WAOassets");
        let exports = temp.path().join("_exports");
        std::fs::create_dir_all(root.join("original")).unwrap();
        std::fs::create_dir_all(root.join("optimized")).unwrap();
        std::fs::create_dir_all(&exports).unwrap();
        std::fs::write(root.join("original").join("photo.jpg"), b"raw").unwrap();
        std::fs::write(root.join("optimized").join("photo_web.jpg"), b"web").unwrap();

        // 2021-03-04T12:00:00Z
        let stamp = filetime::FileTime::from_unix_time(1_614_859_200, 0);
        filetime::set_file_mtime(&exports, stamp).unwrap();

        let archive = FileManager::zip(&root, &exports, "WebOptimizedAssets").unwrap();
        assert_eq!(archive, exports.join("21-03-04-WebOptimizedAssets.zip"));

        let mut zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
        let names: BTreeSet<String> = zip.file_names().map(str::to_string).collect();
        let expected: BTreeSet<String> = [
            "WAOassets/optimized/photo_web.jpg",
            "WAOassets/original/photo.jpg",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(names, expected);

        let mut content = String::new();
        std::io::Read::read_to_string(&mut zip.by_name("WAOassets/original/photo.jpg").unwrap(), &mut content).unwrap();
        assert_eq!(content, "raw");
    }
}
