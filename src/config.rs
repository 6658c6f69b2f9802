//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione della pipeline.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con root, limiti, tool esterni e output
//! - Definisce `Limits`, i valori di default usati quando l'utente passa 0
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//!
//! ## Parametri principali:
//! - `root`: Directory che contiene `WAOassets/` e `_exports/`
//! - `limits.width` / `limits.height`: Dimensioni massime (default: 1920x1080)
//! - `limits.quality`: Qualità JPEG (1-100, default: 100)
//! - `limits.colors`: Colori massimi per PNG opachi (default: 255)
//! - `limits.latitude` / `limits.longitude`: Coordinate di default per il geotag
//! - `optimizer_tool`: Tool esterno di ottimizzazione (default: `optimize-images`)
//! - `tool_timeout_secs`: Timeout per ogni invocazione del tool (default: 120)
//! - `archive_name`: Nome base dell'archivio zip (default: `WebOptimizedAssets`)
//!
//! ## Esempio:
//! ```rust
//! use std::path::PathBuf;
//! use wao_stager::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config {
//!     root: PathBuf::from("/srv/wao"),
//!     ..Default::default()
//! };
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default limits applied when a caller passes 0 for a dimension or setting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum width in pixels
    pub width: u32,
    /// Maximum height in pixels
    pub height: u32,
    /// JPEG quality (1-100)
    pub quality: u8,
    /// Palette size for PNG color reduction
    pub colors: u16,
    /// Default GPS latitude
    pub latitude: f64,
    /// Default GPS longitude
    pub longitude: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            quality: 100,
            colors: 255,
            latitude: 33.78814143905052,
            longitude: -117.84297577732852,
        }
    }
}

/// Configuration for the staging pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the asset root and the export root
    pub root: PathBuf,
    /// Default limits
    pub limits: Limits,
    /// Address used when geotagging without explicit coordinates
    pub default_address: String,
    /// Name or path of the external image optimizer
    pub optimizer_tool: String,
    /// Timeout for a single optimizer invocation
    pub tool_timeout_secs: u64,
    /// Base URL of the Nominatim-compatible geocoder
    pub geocoder_url: String,
    /// Timeout for a geocoding request
    pub geocoder_timeout_secs: u64,
    /// User agent sent to the geocoder
    pub geocoder_user_agent: String,
    /// Base name of the packaged archive
    pub archive_name: String,
    /// Suffix appended when staging into "optimized"
    pub optimize_suffix: String,
    /// Suffix appended when staging into "geotagged"
    pub geotag_suffix: String,
    /// Where the packaged archive is delivered (None = user download folder)
    pub download_dir: Option<PathBuf>,
    /// Show progress bars during batches
    pub show_progress: bool,
    /// Output events as JSON for programmatic use
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            limits: Limits::default(),
            default_address: "1015 E Chapman Ave, Orange, CA 92866".to_string(),
            optimizer_tool: "optimize-images".to_string(),
            tool_timeout_secs: 120,
            geocoder_url: "https://nominatim.openstreetmap.org".to_string(),
            geocoder_timeout_secs: 10,
            geocoder_user_agent: concat!("wao-stager/", env!("CARGO_PKG_VERSION")).to_string(),
            archive_name: "WebOptimizedAssets".to_string(),
            optimize_suffix: "web".to_string(),
            geotag_suffix: "geo".to_string(),
            download_dir: None,
            show_progress: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.limits.quality == 0 || self.limits.quality > 100 {
            return Err(anyhow::anyhow!("Quality must be between 1 and 100"));
        }

        if self.limits.colors == 0 || self.limits.colors > 256 {
            return Err(anyhow::anyhow!("Max colors must be between 1 and 256"));
        }

        if self.limits.width == 0 || self.limits.height == 0 {
            return Err(anyhow::anyhow!("Default width and height must be greater than 0"));
        }

        if !(-90.0..=90.0).contains(&self.limits.latitude) {
            return Err(anyhow::anyhow!("Latitude must be between -90 and 90"));
        }

        if !(-180.0..=180.0).contains(&self.limits.longitude) {
            return Err(anyhow::anyhow!("Longitude must be between -180 and 180"));
        }

        if self.tool_timeout_secs == 0 || self.geocoder_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Timeouts must be greater than 0"));
        }

        if self.optimizer_tool.trim().is_empty() {
            return Err(anyhow::anyhow!("Optimizer tool must not be empty"));
        }

        if self.archive_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Archive name must not be empty"));
        }

        for suffix in [&self.optimize_suffix, &self.geotag_suffix] {
            if suffix.is_empty() || suffix.contains(&['/', '\\', '.'][..]) {
                return Err(anyhow::anyhow!("Invalid stage suffix: {:?}", suffix));
            }
        }

        if self.optimize_suffix == self.geotag_suffix {
            return Err(anyhow::anyhow!("Stage suffixes must differ"));
        }

        Ok(())
    }

    /// Folder the packaged archive is copied to
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
            .unwrap_or_else(|| self.root.join("_downloads"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.limits.quality = 0;
        assert!(config.validate().is_err());

        config.limits.quality = 80;
        config.limits.colors = 300;
        assert!(config.validate().is_err());

        config.limits.colors = 255;
        config.limits.latitude = 91.0;
        assert!(config.validate().is_err());

        config.limits.latitude = 10.0;
        config.geotag_suffix = "web".to_string();
        assert!(config.validate().is_err());

        config.geotag_suffix = "geo/x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.limits.width, 1920);
        assert_eq!(config.limits.height, 1080);
        assert_eq!(config.limits.quality, 100);
        assert_eq!(config.limits.colors, 255);
        assert_eq!(config.optimizer_tool, "optimize-images");
        assert_eq!(config.archive_name, "WebOptimizedAssets");
        assert_eq!(config.optimize_suffix, "web");
        assert_eq!(config.geotag_suffix, "geo");
        assert!(!config.json_output);
    }

    #[test]
    fn test_explicit_download_dir_wins() {
        let config = Config {
            download_dir: Some(PathBuf::from("/tmp/drop")),
            ..Default::default()
        };
        assert_eq!(config.resolved_download_dir(), PathBuf::from("/tmp/drop"));
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            root: temp_dir.path().to_path_buf(),
            limits: Limits {
                quality: 80,
                colors: 128,
                ..Default::default()
            },
            archive_name: "Batch".to_string(),
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.root, temp_dir.path());
        assert_eq!(loaded_config.limits.quality, 80);
        assert_eq!(loaded_config.limits.colors, 128);
        assert_eq!(loaded_config.archive_name, "Batch");
    }

    #[tokio::test]
    async fn test_missing_config_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("absent.json")).await.unwrap();
        assert_eq!(config.limits, Limits::default());
    }
}
