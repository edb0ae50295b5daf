//! # drillmap
//!
//! Navigation drill-in / roll-up dans la hiérarchie administrative
//! (pays → province → ville → district) au-dessus de fournisseurs de contours
//! hétérogènes.
//!
//! ## Features
//!
//! - Trait [`GeoDataSource`] commun : « données de ce nœud » et « descendants
//!   de ce nœud à tel niveau »
//! - Deux fournisseurs : registre par code administratif et service tuilé à
//!   champs GID
//! - Contrôleur [`RegionNavigator`] : une transition à la fois, état remplacé
//!   seulement après un fetch réussi, lignée mémorisée pour le roll-up
//! - Export en masse concurrent, isolé par niveau
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use drillmap::{HttpTransport, ProviderKind, RegionNavigator, SourceFactory, SourcesConfig, TracingNotifier};
//!
//! let config = SourcesConfig::default();
//! let transport = Arc::new(HttpTransport::new(config.fetch_timeout())?);
//! let nav = RegionNavigator::new(
//!     SourceFactory::new(config, transport),
//!     ProviderKind::Registry,
//!     Arc::new(TracingNotifier),
//! );
//! nav.load_root().await?;
//! let zhejiang = nav.find_feature(&"330000".into()).unwrap();
//! let state = nav.drill_in(&zhejiang).await?;
//! println!("{} {}", state.level, state.current_id);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod navigator;
pub mod notice;
pub mod source;
pub mod state;
pub mod transport;
pub mod types;

pub use config::{EndpointConfig, SourcesConfig};
pub use error::{DrillError, FetchError, GuardViolation, Result, UnsupportedOperation};
pub use export::{ExportBatch, ExportItem, ExportSink, LevelOutcome};
pub use navigator::RegionNavigator;
pub use notice::{Notice, Notifier, Severity, TracingNotifier};
pub use source::{AncestorFields, GeoDataSource, ProviderKind, SourceFactory};
pub use state::NavigationState;
pub use transport::{HttpTransport, Transport};
pub use types::{
    ChildRequest, FetchOptions, GeometryResult, Identifier, Level, Precision, ProviderConfig,
    SelectedFeature,
};
