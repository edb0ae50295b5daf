//! Fournisseur tuilé tiers : un jeu de données par niveau et par précision
//!
//! Ressources : `{base}/{version}/{level}/{precision}.json` et la variante
//! dense `{base}/{version}/{level}/{precision}_full.json`. Les identifiants ne
//! portent pas la lignée : les features fines exposent les codes de leurs
//! ancêtres dans des champs dédiés (GID_1, GID_2), sur lesquels on filtre.

use std::sync::Arc;

use async_trait::async_trait;
use geojson::Feature;
use tracing::debug;

use super::{string_property, AncestorFields, GeoDataSource, ProviderKind};
use crate::error::{FetchError, Result};
use crate::transport::Transport;
use crate::types::{
    ChildRequest, FetchOptions, GeometryResult, Identifier, Level, Precision, ProviderConfig,
};

pub struct TiledSource {
    base_url: String,
    config: ProviderConfig,
    fields: AncestorFields,
    transport: Arc<dyn Transport>,
}

impl TiledSource {
    pub fn new(
        base_url: impl Into<String>,
        config: ProviderConfig,
        fields: AncestorFields,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            config,
            fields,
            transport,
        }
    }

    /// URL du jeu de données d'un niveau (fonction pure)
    pub fn locator(&self, level: Level, precision: Precision, full: bool) -> String {
        let suffix = if full { "_full" } else { "" };
        format!(
            "{}/{}/{}/{}{}.json",
            self.base_url, self.config.version, level, precision, suffix
        )
    }

    async fn fetch_level(&self, level: Level, opts: FetchOptions) -> Result<GeometryResult> {
        let precision = opts.precision.unwrap_or_default();
        let locator = self.locator(level, precision, opts.full);
        debug!(%level, %precision, full = opts.full, locator = %locator, "tiled fetch");
        Ok(self.transport.fetch_geojson(&locator).await?)
    }

    /// Garde les features dont `keep` est vrai ; une collection vide signifie
    /// que le nœud est inconnu du fournisseur
    fn retain(
        mut data: GeometryResult,
        id: &Identifier,
        level: Level,
        keep: impl Fn(&Feature) -> bool,
    ) -> Result<GeometryResult> {
        data.features.retain(|f| keep(f));
        if data.features.is_empty() {
            return Err(FetchError::not_found(id.as_str(), level).into());
        }
        Ok(data)
    }
}

#[async_trait]
impl GeoDataSource for TiledSource {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tiled
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn ancestor_fields(&self) -> &AncestorFields {
        &self.fields
    }

    fn feature_id(&self, feature: &Feature) -> Identifier {
        Identifier::from_property(feature, "FIRST_GID")
            .or_else(|| Identifier::from_property(feature, "code"))
            .unwrap_or_else(|| self.root_id())
    }

    fn feature_name(&self, feature: &Feature) -> String {
        string_property(feature, &["ENG_NAME", "name", "NAME"]).unwrap_or_default()
    }

    /// Les données d'un nœud sont ses subdivisions directes ; un district,
    /// sans subdivision, se représente lui-même.
    async fn fetch_by_identifier(
        &self,
        id: &Identifier,
        level: Level,
        opts: FetchOptions,
    ) -> Result<GeometryResult> {
        let Some(child_level) = level.next() else {
            let data = self.fetch_level(level, opts).await?;
            return Self::retain(data, id, level, |f| &self.feature_id(f) == id);
        };

        let data = self.fetch_level(child_level, opts).await?;
        match self.fields.field_for(level) {
            None => Ok(data),
            Some(field) => Self::retain(data, id, level, |f| {
                Identifier::from_property(f, field).as_ref() == Some(id)
            }),
        }
    }

    async fn fetch_children(&self, req: &ChildRequest) -> Result<GeometryResult> {
        if req.child_level <= req.parent_level {
            return Err(FetchError::not_found(req.parent_id.as_str(), req.child_level).into());
        }

        let data = self
            .fetch_level(req.child_level, FetchOptions::default())
            .await?;
        match self.fields.field_for(req.parent_level) {
            None => Ok(data),
            Some(field) => {
                debug!(parent = %req.parent_id, field, child_level = %req.child_level, "filter on ancestor field");
                Self::retain(data, &req.parent_id, req.parent_level, |f| {
                    Identifier::from_property(f, field).as_ref() == Some(&req.parent_id)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn fetch_geojson(&self, locator: &str) -> std::result::Result<GeometryResult, FetchError> {
            Err(FetchError::Status {
                locator: locator.to_string(),
                status: 404,
            })
        }
    }

    fn source() -> TiledSource {
        TiledSource::new(
            "https://tiles.example",
            ProviderConfig::new("xinzhengqu"),
            AncestorFields::gid(),
            Arc::new(NoTransport),
        )
    }

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
    fn test_locator() {
        let s = source();
        assert_eq!(
            s.locator(Level::Province, Precision::Low, false),
            "https://tiles.example/xinzhengqu/province/low.json"
        );
        assert_eq!(
            s.locator(Level::City, Precision::High, true),
            "https://tiles.example/xinzhengqu/city/high_full.json"
        );
    }

    #[test]
    fn test_feature_id_priority() {
        let s = source();
        assert_eq!(
            s.feature_id(&feature(json!({"FIRST_GID": "CHN.30_1", "code": 330000}))),
            Identifier::from("CHN.30_1")
        );
        assert_eq!(s.feature_id(&feature(json!({"code": 330000}))), Identifier::from("330000"));
        assert_eq!(s.feature_id(&feature(json!({}))), Identifier::root());
    }

    #[test]
    fn test_feature_name() {
        let s = source();
        assert_eq!(
            s.feature_name(&feature(json!({"ENG_NAME": "Zhejiang", "name": "浙江"}))),
            "Zhejiang"
        );
        assert_eq!(s.feature_name(&feature(json!({"NAME": "Hangzhou"}))), "Hangzhou");
    }

    #[test]
    fn test_retain_empty_is_not_found() {
        let data = GeometryResult {
            bbox: None,
            features: vec![feature(json!({"GID_1": "A"}))],
            foreign_members: None,
        };
        let err = TiledSource::retain(data, &Identifier::from("B"), Level::Province, |_| false)
            .unwrap_err();
        assert!(err.to_string().contains("No resource for B"));
    }
}
