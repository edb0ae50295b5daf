//! Destinations d'export

pub mod geojson;

pub use self::geojson::GeoJsonFileSink;
