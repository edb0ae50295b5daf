//! Types de données pour le crate drillmap

use std::fmt;
use std::str::FromStr;

use geojson::Feature;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Résultat d'un fetch : une FeatureCollection GeoJSON complète.
///
/// Chaque fetch produit une collection neuve qui remplace la précédente
/// (pas de fusion incrémentale).
pub type GeometryResult = geojson::FeatureCollection;

/// Code administratif de la racine (Chine entière)
pub const ROOT_CODE: &str = "100000";

/// Niveau administratif, ordonné de la racine vers le plus fin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Country,
    Province,
    City,
    District,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Country, Level::Province, Level::City, Level::District];

    /// Niveau immédiatement inférieur (`None` pour district)
    pub fn next(self) -> Option<Level> {
        match self {
            Level::Country => Some(Level::Province),
            Level::Province => Some(Level::City),
            Level::City => Some(Level::District),
            Level::District => None,
        }
    }

    /// Niveau immédiatement supérieur (`None` pour country)
    pub fn prev(self) -> Option<Level> {
        match self {
            Level::Country => None,
            Level::Province => Some(Level::Country),
            Level::City => Some(Level::Province),
            Level::District => Some(Level::City),
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Level::District
    }

    pub fn is_root(self) -> bool {
        self == Level::Country
    }

    /// Niveaux strictement plus fins que `self`
    pub fn below(self) -> impl Iterator<Item = Level> {
        Level::ALL.into_iter().filter(move |l| *l > self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Country => "country",
            Level::Province => "province",
            Level::City => "city",
            Level::District => "district",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(Level::Country),
            "province" => Ok(Level::Province),
            "city" => Ok(Level::City),
            "district" => Ok(Level::District),
            _ => Err(format!(
                "Invalid level: {}. Use: country, province, city, district",
                s
            )),
        }
    }
}

/// Identifiant opaque d'un nœud, propre à un fournisseur.
///
/// Deux identifiants de fournisseurs différents ne sont pas comparables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Identifiant de la racine de la hiérarchie
    pub fn root() -> Self {
        Self(ROOT_CODE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lit un identifiant depuis une valeur de propriété GeoJSON
    /// (nombre entier ou chaîne non vide)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(|v| v.to_string())
                .or_else(|| n.as_i64().map(|v| v.to_string()))
                .map(Self),
            Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }

    /// Lit la propriété `key` d'une feature
    pub fn from_property(feature: &Feature, key: &str) -> Option<Self> {
        feature
            .properties
            .as_ref()
            .and_then(|p| p.get(key))
            .and_then(Self::from_value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u32> for Identifier {
    fn from(code: u32) -> Self {
        Self(code.to_string())
    }
}

/// Palier de résolution pour les fournisseurs qui en exposent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Low,
    High,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Precision::Low => "low",
            Precision::High => "high",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Precision::Low),
            "high" => Ok(Precision::High),
            _ => Err(format!("Invalid precision: {}. Use: low, high", s)),
        }
    }
}

/// Révision du jeu de données, figée à la construction du fournisseur
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub version: String,
}

impl ProviderConfig {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

/// Options d'un fetch par identifiant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Variante dense de la ressource (contours complets, sous-régions incluses)
    pub full: bool,

    /// Palier de résolution ; ignoré par les fournisseurs sans paliers
    pub precision: Option<Precision>,
}

impl FetchOptions {
    pub fn full(full: bool) -> Self {
        Self {
            full,
            precision: None,
        }
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }
}

/// Demande de tous les descendants de `parent_id` au niveau `child_level`.
///
/// Utilisée uniquement pour l'export en masse, indépendamment du curseur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRequest {
    pub parent_id: Identifier,
    pub parent_level: Level,
    pub child_level: Level,
}

impl ChildRequest {
    pub fn new(parent_id: Identifier, parent_level: Level, child_level: Level) -> Self {
        Self {
            parent_id,
            parent_level,
            child_level,
        }
    }
}

/// Feature sélectionnée par un clic simple (sert à l'export)
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFeature {
    pub name: String,
    pub id: Identifier,
    /// Niveau de la feature elle-même (celui des features affichées)
    pub level: Level,
    pub feature: Feature,
}
