//! # JSON Output Module
//!
//! Output strutturato in JSON (una riga per evento) per l'uso programmatico della CLI.
//!
//! ## Tipi di messaggi:
//! - `imported`: Asset accettato e copiato in `original`
//! - `rejected`: File con estensione non accettata, copiato in `ignored`
//! - `batch_complete`: Fine di un batch optimize/geotag con i fallimenti per asset
//! - `geocoded`: Coordinate risolte da un indirizzo
//! - `packaged`: Archivio zip creato (ed eventualmente consegnato)
//! - `summary`: Stato finale degli asset
//! - `error`: Errore generale

use crate::asset::{Asset, AssetSummary};
use crate::pipeline::batch::BatchReport;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    Imported {
        id: i64,
        filename: String,
        media_type: String,
        size_kb: f64,
    },

    Rejected {
        filename: String,
        extension: String,
    },

    BatchComplete {
        stage: String,
        succeeded: usize,
        skipped: usize,
        failures: Vec<JsonFailure>,
    },

    Geocoded {
        address: String,
        latitude: f64,
        longitude: f64,
    },

    Packaged {
        archive: PathBuf,
        delivered_to: Option<PathBuf>,
        size: u64,
    },

    Summary {
        assets: Vec<JsonAsset>,
    },

    Error {
        message: String,
        details: Option<String>,
    },
}

/// Fallimento di un singolo asset in un batch
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonFailure {
    pub id: i64,
    pub error: String,
}

/// Vista JSON di `AssetSummary`
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonAsset {
    pub id: i64,
    pub filename: String,
    pub is_optimized: bool,
    pub is_geotagged: bool,
}

impl From<AssetSummary> for JsonAsset {
    fn from(summary: AssetSummary) -> Self {
        Self {
            id: summary.id,
            filename: summary.filename,
            is_optimized: summary.is_optimized,
            is_geotagged: summary.is_geotagged,
        }
    }
}

impl JsonMessage {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn imported(asset: &Asset) -> Self {
        Self::Imported {
            id: asset.id,
            filename: asset.origin_name.clone(),
            media_type: asset.media_type.to_string(),
            size_kb: asset.size_kb,
        }
    }

    pub fn rejected(asset: &Asset) -> Self {
        Self::Rejected {
            filename: asset.origin_name.clone(),
            extension: asset.extension.clone(),
        }
    }

    pub fn batch_complete(stage: &str, report: &BatchReport) -> Self {
        Self::BatchComplete {
            stage: stage.to_string(),
            succeeded: report.succeeded.len(),
            skipped: report.skipped.len(),
            failures: report
                .failed
                .iter()
                .map(|failure| JsonFailure {
                    id: failure.id,
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }

    pub fn summary(assets: Vec<AssetSummary>) -> Self {
        Self::Summary {
            assets: assets.into_iter().map(JsonAsset::from).collect(),
        }
    }

    /// Crea un messaggio di errore
    pub fn error(message: String, details: Option<String>) -> Self {
        Self::Error { message, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_serialization() {
        let message = JsonMessage::Geocoded {
            address: "somewhere".to_string(),
            latitude: 1.5,
            longitude: -2.5,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "geocoded");
        assert_eq!(json["latitude"], 1.5);

        let summary = JsonMessage::summary(vec![AssetSummary {
            id: 0,
            filename: "a_web_geo.jpg".to_string(),
            is_optimized: true,
            is_geotagged: false,
        }]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["assets"][0]["filename"], "a_web_geo.jpg");
        assert_eq!(json["assets"][0]["is_geotagged"], false);
    }

    #[test]
    fn test_batch_complete_type_name() {
        let json = serde_json::to_value(JsonMessage::batch_complete("optimize", &BatchReport::default())).unwrap();
        assert_eq!(json["type"], "batch_complete");
        assert_eq!(json["stage"], "optimize");
        assert_eq!(json["succeeded"], 0);
    }
}
