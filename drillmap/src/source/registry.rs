//! Fournisseur « registre » : contours indexés par code administratif
//!
//! Ressources : `{base}/{version}/bound/{code}.json` et la variante dense
//! `{base}/{version}/bound/{code}_full.json` (qui embarque les sous-régions).

use std::sync::Arc;

use async_trait::async_trait;
use geojson::Feature;
use tracing::debug;

use super::{string_property, AncestorFields, GeoDataSource, ProviderKind};
use crate::error::{FetchError, Result};
use crate::transport::Transport;
use crate::types::{ChildRequest, FetchOptions, GeometryResult, Identifier, Level, ProviderConfig};

pub struct RegistrySource {
    base_url: String,
    config: ProviderConfig,
    fields: AncestorFields,
    transport: Arc<dyn Transport>,
}

impl RegistrySource {
    pub fn new(
        base_url: impl Into<String>,
        config: ProviderConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            config,
            fields: AncestorFields::none(),
            transport,
        }
    }

    /// URL de la ressource d'un code (fonction pure)
    pub fn locator(&self, code: &Identifier, full: bool) -> String {
        let suffix = if full { "_full" } else { "" };
        format!(
            "{}/{}/bound/{}{}.json",
            self.base_url, self.config.version, code, suffix
        )
    }
}

#[async_trait]
impl GeoDataSource for RegistrySource {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Registry
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn ancestor_fields(&self) -> &AncestorFields {
        &self.fields
    }

    fn feature_id(&self, feature: &Feature) -> Identifier {
        Identifier::from_property(feature, "adcode").unwrap_or_else(|| self.root_id())
    }

    fn feature_name(&self, feature: &Feature) -> String {
        string_property(feature, &["name"]).unwrap_or_default()
    }

    async fn fetch_by_identifier(
        &self,
        id: &Identifier,
        level: Level,
        opts: FetchOptions,
    ) -> Result<GeometryResult> {
        if let Some(precision) = opts.precision {
            debug!(%precision, "registry source has no precision tiers, ignoring");
        }
        let locator = self.locator(id, opts.full);
        debug!(%id, %level, full = opts.full, locator = %locator, "registry fetch");
        Ok(self.transport.fetch_geojson(&locator).await?)
    }

    /// Les sous-régions sont embarquées dans la ressource dense du parent :
    /// « descendants de X » revient à « X en détail complet », quel que soit
    /// le niveau demandé.
    async fn fetch_children(&self, req: &ChildRequest) -> Result<GeometryResult> {
        if req.parent_level.is_terminal() || req.child_level <= req.parent_level {
            return Err(FetchError::not_found(req.parent_id.as_str(), req.child_level).into());
        }
        if req.parent_level.next() != Some(req.child_level) {
            debug!(
                parent_level = %req.parent_level,
                child_level = %req.child_level,
                "registry serves the parent's full resource for deeper levels"
            );
        }

        let locator = self.locator(&req.parent_id, true);
        debug!(parent = %req.parent_id, child_level = %req.child_level, locator = %locator, "registry children");
        Ok(self.transport.fetch_geojson(&locator).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DrillError;
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

    fn source() -> RegistrySource {
        RegistrySource::new(
            "https://geo.datav.aliyun.com",
            ProviderConfig::new("areas_v3"),
            Arc::new(NoTransport),
        )
    }

    #[test]
    fn test_locator() {
        let s = source();
        assert_eq!(
            s.locator(&Identifier::from("330000"), false),
            "https://geo.datav.aliyun.com/areas_v3/bound/330000.json"
        );
        assert_eq!(
            s.locator(&Identifier::from("330000"), true),
            "https://geo.datav.aliyun.com/areas_v3/bound/330000_full.json"
        );
    }

    #[test]
    fn test_feature_id_fallback() {
        let s = source();
        let with_code = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: json!({"adcode": 330100, "name": "杭州市"}).as_object().cloned(),
            foreign_members: None,
        };
        assert_eq!(s.feature_id(&with_code), Identifier::from("330100"));
        assert_eq!(s.feature_name(&with_code), "杭州市");

        let bare = Feature {
            properties: None,
            ..with_code
        };
        assert_eq!(s.feature_id(&bare), Identifier::root());
    }

    #[tokio::test]
    async fn test_children_below_district_is_fetch_error() {
        let req = ChildRequest::new(Identifier::from("330106"), Level::District, Level::District);
        let err = source().fetch_children(&req).await.unwrap_err();
        assert!(matches!(err, DrillError::Fetch(FetchError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_children_not_descending_is_fetch_error() {
        let req = ChildRequest::new(Identifier::from("330000"), Level::Province, Level::Province);
        let err = source().fetch_children(&req).await.unwrap_err();
        assert!(matches!(err, DrillError::Fetch(FetchError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_children_skipping_levels_fetch_parent_full() {
        let req = ChildRequest::new(Identifier::from("330000"), Level::Province, Level::District);
        let err = source().fetch_children(&req).await.unwrap_err();
        match err {
            DrillError::Fetch(FetchError::Status { locator, .. }) => assert_eq!(
                locator,
                "https://geo.datav.aliyun.com/areas_v3/bound/330000_full.json"
            ),
            other => panic!("unexpected error: {other}"),
        }
    }
}
