//! Abstraction des fournisseurs de données géographiques
//!
//! Chaque fournisseur sait répondre à deux questions : « les données de ce
//! nœud » et « les descendants de ce nœud à tel niveau ». Le contrôleur ne
//! connaît que le trait [`GeoDataSource`].

pub mod registry;
pub mod tiled;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use geojson::Feature;

use crate::config::SourcesConfig;
use crate::error::Result;
use crate::transport::Transport;
use crate::types::{ChildRequest, FetchOptions, GeometryResult, Identifier, Level, ProviderConfig};

pub use registry::RegistrySource;
pub use tiled::TiledSource;

/// Fournisseurs disponibles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// Service registre, indexé par code administratif (DataV)
    Registry,
    /// Service tuilé tiers, codes GID
    Tiled,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Registry => "registry",
            ProviderKind::Tiled => "tiled",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "registry" | "datav" => Ok(ProviderKind::Registry),
            "tiled" | "thirdparty" | "l7" => Ok(ProviderKind::Tiled),
            _ => Err(format!("Unknown source: {}. Use: registry, tiled", s)),
        }
    }
}

/// Table « niveau -> champ ancêtre » d'un fournisseur.
///
/// Le champ d'un niveau porte, sur les features plus fines, l'identifiant de
/// l'ancêtre de ce niveau. La racine n'a jamais de champ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorFields {
    province: Option<String>,
    city: Option<String>,
}

impl AncestorFields {
    /// Aucun champ de lignée (le fournisseur ne filtre pas par ancêtre)
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(province: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            province: Some(province.into()),
            city: Some(city.into()),
        }
    }

    /// Table GID_1 / GID_2 du service tuilé
    pub fn gid() -> Self {
        Self::new("GID_1", "GID_2")
    }

    pub fn field_for(&self, level: Level) -> Option<&str> {
        match level {
            Level::Province => self.province.as_deref(),
            Level::City => self.city.as_deref(),
            Level::Country | Level::District => None,
        }
    }

    /// Codes ancêtres portés par une feature, par niveau
    pub fn harvest(&self, feature: &Feature) -> Vec<(Level, Identifier)> {
        [Level::Province, Level::City]
            .into_iter()
            .filter_map(|level| {
                let field = self.field_for(level)?;
                Identifier::from_property(feature, field).map(|id| (level, id))
            })
            .collect()
    }
}

/// Contrat commun à tous les fournisseurs.
///
/// La construction d'un fournisseur ne fait aucune I/O ; seules les deux
/// méthodes async touchent le réseau.
#[async_trait]
pub trait GeoDataSource: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn config(&self) -> &ProviderConfig;

    /// Identifiant de la racine de la hiérarchie
    fn root_id(&self) -> Identifier {
        Identifier::root()
    }

    fn ancestor_fields(&self) -> &AncestorFields;

    /// Identifiant à utiliser pour descendre dans `feature`
    /// (la racine si la feature n'en porte aucun)
    fn feature_id(&self, feature: &Feature) -> Identifier;

    /// Nom affichable de `feature`
    fn feature_name(&self, feature: &Feature) -> String;

    /// Données du nœud `id` situé au niveau `level`
    async fn fetch_by_identifier(
        &self,
        id: &Identifier,
        level: Level,
        opts: FetchOptions,
    ) -> Result<GeometryResult>;

    /// Toutes les features de `req.child_level` descendant de `req.parent_id`
    async fn fetch_children(&self, req: &ChildRequest) -> Result<GeometryResult>;
}

/// Lit la première propriété textuelle non vide parmi `keys`
pub(crate) fn string_property(feature: &Feature, keys: &[&str]) -> Option<String> {
    let props = feature.properties.as_ref()?;
    keys.iter()
        .filter_map(|k| props.get(*k))
        .find_map(|v| match v {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
}

/// Fabrique de fournisseurs : chaque appel crée une instance neuve liée à la
/// version configurée pour ce fournisseur
#[derive(Clone)]
pub struct SourceFactory {
    config: SourcesConfig,
    transport: Arc<dyn Transport>,
}

impl SourceFactory {
    pub fn new(config: SourcesConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &SourcesConfig {
        &self.config
    }

    pub fn create(&self, kind: ProviderKind) -> Arc<dyn GeoDataSource> {
        match kind {
            ProviderKind::Registry => Arc::new(RegistrySource::new(
                self.config.registry.base_url.clone(),
                ProviderConfig::new(self.config.registry.version.clone()),
                Arc::clone(&self.transport),
            )),
            ProviderKind::Tiled => Arc::new(TiledSource::new(
                self.config.tiled.base_url.clone(),
                ProviderConfig::new(self.config.tiled.version.clone()),
                AncestorFields::gid(),
                Arc::clone(&self.transport),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feature(props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("dataV".parse::<ProviderKind>(), Ok(ProviderKind::Registry));
        assert_eq!("thirdParty".parse::<ProviderKind>(), Ok(ProviderKind::Tiled));
        assert!("osm".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_ancestor_fields() {
        let fields = AncestorFields::gid();
        assert_eq!(fields.field_for(Level::Country), None);
        assert_eq!(fields.field_for(Level::Province), Some("GID_1"));
        assert_eq!(fields.field_for(Level::City), Some("GID_2"));
        assert_eq!(AncestorFields::none().field_for(Level::City), None);
    }

    #[test]
    fn test_harvest() {
        let f = feature(json!({"GID_1": "CHN.30_1", "GID_2": "", "code": 330100}));
        assert_eq!(
            AncestorFields::gid().harvest(&f),
            vec![(Level::Province, Identifier::from("CHN.30_1"))]
        );
        assert!(AncestorFields::none().harvest(&f).is_empty());
    }

    #[test]
    fn test_string_property() {
        let f = feature(json!({"ENG_NAME": " ", "name": "Hangzhou"}));
        assert_eq!(string_property(&f, &["ENG_NAME", "name"]), Some("Hangzhou".into()));
        assert_eq!(string_property(&f, &["NAME"]), None);
    }
}
