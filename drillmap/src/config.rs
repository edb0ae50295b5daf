//! Configuration des fournisseurs de contours

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// Point d'accès d'un fournisseur
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointConfig {
    /// URL racine du service (sans `/` final)
    #[serde(deserialize_with = "trimmed_url")]
    pub base_url: String,

    /// Révision du jeu de données
    pub version: String,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            version: version.into(),
        }
    }
}

fn trimmed_url<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let url = String::deserialize(deserializer)?;
    Ok(url.trim_end_matches('/').to_string())
}

/// Configuration de l'ensemble des fournisseurs
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Service « registre » (codes administratifs, DataV)
    #[serde(default = "default_registry")]
    pub registry: EndpointConfig,

    /// Service tuilé tiers (codes GID)
    #[serde(default = "default_tiled")]
    pub tiled: EndpointConfig,

    /// Timeout par fetch, en secondes
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_registry() -> EndpointConfig {
    EndpointConfig::new("https://geo.datav.aliyun.com", "areas_v3")
}

fn default_tiled() -> EndpointConfig {
    EndpointConfig::new("https://cdn.jsdelivr.net/npm/xinzhengqu/data", "xinzhengqu")
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            tiled: default_tiled(),
            fetch_timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourcesConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: SourcesConfig =
            serde_json::from_str(r#"{"fetch_timeout_secs": 5}"#).unwrap();
        assert_eq!(cfg.registry.version, "areas_v3");
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let ep = EndpointConfig::new("http://localhost:8080/", "v1");
        assert_eq!(ep.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_trailing_slash_trimmed_from_json() {
        let cfg: SourcesConfig = serde_json::from_str(
            r#"{"registry": {"base_url": "http://x//", "version": "areas_v3"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.registry.base_url, "http://x");
        assert_eq!(cfg.tiled, default_tiled());
    }
}
