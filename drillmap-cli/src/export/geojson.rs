//! Export vers fichiers GeoJSON

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use drillmap::{DrillError, ExportItem, ExportSink, GeometryResult};

/// Écrit une FeatureCollection dans `output_path`
pub fn write_collection(data: &GeometryResult, output_path: &Path) -> std::io::Result<()> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, data)?;
    writer.flush()?;
    Ok(())
}

/// Nom de fichier sûr pour un label d'export
fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Destination d'export : un fichier `<label>.json` par lot
#[derive(Debug, Clone)]
pub struct GeoJsonFileSink {
    output_dir: PathBuf,
}

impl GeoJsonFileSink {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir).context(format!(
            "Failed to create output directory: {}",
            output_dir.display()
        ))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, label: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", file_stem(label)))
    }
}

#[async_trait]
impl ExportSink for GeoJsonFileSink {
    async fn export(&self, item: ExportItem) -> drillmap::Result<()> {
        let path = self.path_for(&item.label);
        let data = item.data;
        tokio::task::spawn_blocking(move || write_collection(&data, &path))
            .await
            .map_err(|e| DrillError::Task(e.to_string()))??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillmap::Level;
    use geojson::{Feature, Geometry, Value};

    fn sample() -> GeometryResult {
        GeometryResult {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![120.1, 30.2]))),
                id: None,
                properties: serde_json::json!({"adcode": 330000, "name": "浙江省"})
                    .as_object()
                    .cloned(),
                foreign_members: None,
            }],
            foreign_members: None,
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("330000_city"), "330000_city");
        assert_eq!(file_stem("a/b:c"), "a_b_c");
    }

    #[test]
    fn test_write_collection() {
        let path = std::env::temp_dir().join("drillmap_test_write.json");
        write_collection(&sample(), &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(r#""type":"FeatureCollection""#));
        assert!(content.contains("浙江省"));

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_sink_writes_label_file() {
        let dir = std::env::temp_dir().join("drillmap_test_sink");
        let sink = GeoJsonFileSink::new(&dir).unwrap();
        sink.export(ExportItem::descendants(&"330000".into(), Level::City, sample()))
            .await
            .unwrap();

        let path = dir.join("330000_city.json");
        assert!(path.exists());
        let parsed: geojson::GeoJson = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        assert!(matches!(parsed, geojson::GeoJson::FeatureCollection(fc) if fc.features.len() == 1));

        std::fs::remove_dir_all(dir).ok();
    }
}
