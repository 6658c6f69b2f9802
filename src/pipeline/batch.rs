//! Risultati dei batch e predicati di readiness.

use crate::asset::Asset;
use crate::error::WaoError;

/// One asset that could not be processed
#[derive(Debug)]
pub struct AssetFailure {
    pub id: i64,
    pub error: WaoError,
}

/// Per-asset outcome of a batch call
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Assets transformed by the operation
    pub succeeded: Vec<i64>,
    /// Assets whose format is left untouched; their flag is still set
    pub skipped: Vec<i64>,
    pub failed: Vec<AssetFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    pub fn fail(&mut self, id: i64, error: WaoError) {
        self.failed.push(AssetFailure { id, error });
    }

    pub fn format_summary(&self) -> String {
        format!(
            "Processed: {} | Done: {} | Skipped: {} | Failed: {}",
            self.processed(),
            self.succeeded.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// True when every asset has been optimized (vacuously true for none)
pub fn all_optimized<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> bool {
    assets.into_iter().all(Asset::is_optimized)
}

pub fn all_geotagged<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> bool {
    assets.into_iter().all(Asset::is_geotagged)
}

/// Readiness: both flags set on every asset
pub fn all_ready<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> bool {
    assets.into_iter().all(Asset::is_ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetFlag;
    use tempfile::TempDir;

    async fn assets(n: usize) -> (TempDir, Vec<Asset>) {
        let temp = TempDir::new().unwrap();
        let mut out = Vec::new();
        for i in 0..n {
            let name = format!("{}.jpg", i);
            tokio::fs::write(temp.path().join(&name), b"x").await.unwrap();
            out.push(Asset::new(i as i64, &name, temp.path(), &temp.path().join("original")).await.unwrap());
        }
        (temp, out)
    }

    #[tokio::test]
    async fn test_predicates() {
        let (_temp, mut list) = assets(2).await;
        assert!(!all_optimized(&list));

        for asset in list.iter_mut() {
            asset.set_flag(AssetFlag::Optimized, true);
        }
        assert!(all_optimized(&list));
        assert!(!all_ready(&list));

        list[0].set_flag(AssetFlag::Geotagged, true);
        assert!(!all_geotagged(&list));
        list[1].set_flag(AssetFlag::Geotagged, true);
        assert!(all_ready(&list));
    }

    #[test]
    fn test_empty_selection_is_ready() {
        let none: Vec<Asset> = Vec::new();
        assert!(all_optimized(&none));
        assert!(all_ready(&none));
    }

    #[test]
    fn test_report_summary() {
        let mut report = BatchReport::default();
        report.succeeded.push(0);
        report.skipped.push(1);
        report.fail(2, WaoError::UnknownAsset(2));
        assert!(!report.is_success());
        assert_eq!(report.processed(), 3);
        assert_eq!(report.format_summary(), "Processed: 3 | Done: 1 | Skipped: 1 | Failed: 1");
    }
}
