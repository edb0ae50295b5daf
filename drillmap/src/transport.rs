//! Récupération des ressources GeoJSON
//!
//! Le cœur ne fait jamais de HTTP directement : les fournisseurs passent par
//! un [`Transport`], ce qui permet d'injecter un transport en mémoire dans les
//! tests.

use std::time::Duration;

use async_trait::async_trait;
use geojson::{FeatureCollection, GeoJson};
use tracing::debug;

use crate::error::FetchError;
use crate::types::GeometryResult;

/// Collaborateur réseau : `locator -> FeatureCollection`
///
/// Pas de retry ici ; un appelant peut envelopper l'implémentation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_geojson(&self, locator: &str) -> Result<GeometryResult, FetchError>;
}

/// User-Agent envoyé aux serveurs de contours
const USER_AGENT: &str = concat!("drillmap/", env!("CARGO_PKG_VERSION"));

/// Transport HTTP basé sur reqwest
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Crée un transport avec un timeout global par requête
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Transport {
                locator: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_geojson(&self, locator: &str) -> Result<GeometryResult, FetchError> {
        debug!(locator, "GET");

        let response = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                locator: locator.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            locator: locator.to_string(),
            reason: format!("Failed to read response: {}", e),
        })?;

        parse_feature_collection(locator, &body)
    }
}

/// Parse un corps GeoJSON en FeatureCollection.
///
/// Une Feature isolée est enveloppée dans une collection à un élément ;
/// une géométrie nue est refusée (pas de propriétés, donc pas d'identifiant).
pub fn parse_feature_collection(locator: &str, body: &str) -> Result<GeometryResult, FetchError> {
    let geojson = body
        .parse::<GeoJson>()
        .map_err(|e| FetchError::malformed(locator, e.to_string()))?;

    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(FetchError::malformed(
            locator,
            "expected a FeatureCollection, got a bare geometry",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_collection() {
        let body = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"adcode":330000,"name":"浙江省"},
             "geometry":{"type":"Point","coordinates":[120.1,30.2]}}]}"#;
        let fc = parse_feature_collection("mem://a", body).unwrap();
        assert_eq!(fc.features.len(), 1);
    }

    #[test]
    fn test_parse_single_feature() {
        let body = r#"{"type":"Feature","properties":{"name":"x"},
            "geometry":{"type":"Point","coordinates":[1.0,2.0]}}"#;
        let fc = parse_feature_collection("mem://b", body).unwrap();
        assert_eq!(fc.features.len(), 1);
    }

    #[test]
    fn test_parse_rejects_geometry_and_garbage() {
        let err = parse_feature_collection("mem://c", r#"{"type":"Point","coordinates":[1.0,2.0]}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));

        let err = parse_feature_collection("mem://d", "<html>404</html>").unwrap_err();
        assert!(err.to_string().contains("mem://d"));
    }
}
