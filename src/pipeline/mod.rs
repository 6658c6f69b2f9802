//! # Pipeline Module
//!
//! Sistema di staging degli asset, diviso in componenti:
//!
//! - `skeleton`: Layout fisso delle directory (`WAOassets/`, `_exports/`)
//! - `batch`: Report per asset dei batch e predicati di readiness
//! - `director`: Orchestratore import → optimize → geotag → package

pub mod batch;
pub mod director;
pub mod skeleton;

pub use batch::{AssetFailure, BatchReport};
pub use director::{Director, ImportOutcome, ImportReport};
pub use skeleton::{Skeleton, Stage};
