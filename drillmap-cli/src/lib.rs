//! # drillmap-cli
//!
//! Exploration et export des contours administratifs en ligne de commande.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Exploration interactive
//! drillmap browse --source tiled
//!
//! # Descendre jusqu'à Hangzhou et écrire ses districts
//! drillmap walk --path 330000,330100 --output ./hangzhou.json
//!
//! # Exporter villes et districts du Zhejiang
//! drillmap export --select 330000 --levels city,district --output ./export/
//! ```

pub mod config;
pub mod export;
pub mod report;

pub use config::AppConfig;
pub use report::{ExportReport, ExportStatus};
