//! Configuration de l'application

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use drillmap::{EndpointConfig, SourcesConfig};

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Points d'accès des fournisseurs
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Répertoire de sortie par défaut des exports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("export")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: SourcesConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl AppConfig {
    /// Charge une configuration depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Configuration par défaut surchargée par l'environnement
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_vars(|key| std::env::var(key).ok());
        config
    }

    /// Fichier (si fourni) puis variables d'environnement
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::from_env());
        };
        let mut config = Self::load(path)?;
        config.apply_vars(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applique les variables `DRILLMAP_*` fournies par `get`
    pub fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        let registry = &self.sources.registry;
        self.sources.registry = EndpointConfig::new(
            get("DRILLMAP_REGISTRY_URL").unwrap_or_else(|| registry.base_url.clone()),
            get("DRILLMAP_REGISTRY_VERSION").unwrap_or_else(|| registry.version.clone()),
        );

        let tiled = &self.sources.tiled;
        self.sources.tiled = EndpointConfig::new(
            get("DRILLMAP_TILED_URL").unwrap_or_else(|| tiled.base_url.clone()),
            get("DRILLMAP_TILED_VERSION").unwrap_or_else(|| tiled.version.clone()),
        );

        if let Some(secs) = get("DRILLMAP_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.sources.fetch_timeout_secs = secs;
        }
        if let Some(dir) = get("DRILLMAP_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_apply_vars() {
        let vars: HashMap<&str, &str> = [
            ("DRILLMAP_REGISTRY_URL", "http://localhost:9000/"),
            ("DRILLMAP_TILED_VERSION", "v2"),
            ("DRILLMAP_TIMEOUT_SECS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_vars(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.sources.registry.base_url, "http://localhost:9000");
        assert_eq!(config.sources.registry.version, "areas_v3");
        assert_eq!(config.sources.tiled.version, "v2");
        assert_eq!(config.sources.fetch_timeout_secs, 30);
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join("drillmap_test_config.json");
        std::fs::write(
            &path,
            r#"{"sources": {"tiled": {"base_url": "http://tiles", "version": "2024"}}, "output_dir": "/tmp/out"}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.sources.tiled.version, "2024");
        assert_eq!(config.sources.registry.version, "areas_v3");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/drillmap.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
