//! Définition et implémentation des commandes CLI
//!
//! - `browse`: exploration interactive (drill-in / roll-up au clavier)
//! - `walk`: descend un chemin de codes et écrit la géométrie atteinte
//! - `export`: export en masse des subdivisions d'une région

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use geo::BoundingRect;
use geojson::Feature;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use drillmap::{
    ExportBatch, ExportSink, HttpTransport, Identifier, Level, Notice, Notifier, Precision, ProviderKind,
    RegionNavigator, Severity, SourceFactory,
};
use drillmap_cli::config::AppConfig;
use drillmap_cli::export::geojson::{write_collection, GeoJsonFileSink};
use drillmap_cli::report::ExportReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Explore the hierarchy interactively (ls, drill, up, select, export...)
    Browse {
        /// Data provider (registry, tiled)
        #[arg(short, long, default_value = "registry")]
        source: ProviderKind,

        /// Output directory for exports (défaut : config / ./export)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Drill down a path of region codes and write the reached geometry
    Walk {
        /// Data provider (registry, tiled)
        #[arg(short, long, default_value = "registry")]
        source: ProviderKind,

        /// Region codes to drill into, from the top (ex: 330000,330100)
        #[arg(short, long, value_delimiter = ',')]
        path: Vec<String>,

        /// Output GeoJSON file (défaut : <output_dir>/<code>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export every subdivision level under a region
    Export {
        /// Data provider (registry, tiled)
        #[arg(short, long, default_value = "registry")]
        source: ProviderKind,

        /// Region codes to drill into before selecting
        #[arg(short, long, value_delimiter = ',')]
        path: Vec<String>,

        /// Code of the displayed region to export under
        #[arg(long)]
        select: String,

        /// Levels to export (ex: city,district)
        #[arg(short, long, value_delimiter = ',', required = true)]
        levels: Vec<Level>,

        /// Also write the selected region itself
        #[arg(long)]
        include_selected: bool,

        /// Output directory (défaut : config / ./export)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save a JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Affiche les notices sur la console
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Info => println!("  {}", notice.message),
            Severity::Warning => println!("  ! {}", notice.message),
            Severity::Error => eprintln!("  x {}", notice.message),
        }
    }
}

fn build_navigator(config: &AppConfig, kind: ProviderKind) -> Result<RegionNavigator> {
    let transport = HttpTransport::new(config.sources.fetch_timeout())
        .context("Failed to build HTTP client")?;
    let factory = SourceFactory::new(config.sources.clone(), Arc::new(transport));
    Ok(RegionNavigator::new(factory, kind, Arc::new(ConsoleNotifier)))
}

/// Emprise d'une feature (min_x, min_y, max_x, max_y)
fn feature_bbox(feature: &Feature) -> Option<[f64; 4]> {
    let geometry = feature.geometry.clone()?;
    let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    let rect = geometry.bounding_rect()?;
    Some([rect.min().x, rect.min().y, rect.max().x, rect.max().y])
}

/// Descend `path` depuis la racine, un code par niveau
async fn walk_path(nav: &RegionNavigator, path: &[String]) -> Result<()> {
    for code in path {
        let id = Identifier::from(code.as_str());
        let feature = nav.find_feature(&id).with_context(|| {
            format!("Region {} is not displayed at level {}", id, nav.state().level)
        })?;
        let state = nav.drill_in(&feature).await?;
        debug!(current = %state.current_id, level = %state.level, "walked");
    }
    Ok(())
}

fn print_listing(nav: &RegionNavigator) {
    let state = nav.state();
    let source = nav.source();
    let geometry = nav.geometry();

    println!(
        "\n[{}] {} {} ({} features)",
        nav.provider(),
        state.level,
        state.current_id,
        geometry.features.len()
    );
    for (i, feature) in geometry.features.iter().enumerate() {
        let bbox = feature_bbox(feature)
            .map(|[x0, y0, x1, y1]| format!("[{:.3}, {:.3}, {:.3}, {:.3}]", x0, y0, x1, y1))
            .unwrap_or_default();
        println!(
            "  #{:<3} {:<14} {:<24} {}",
            i,
            source.feature_id(feature),
            source.feature_name(feature),
            bbox
        );
    }
}

/// Résout `#<index>` ou un code parmi les features affichées
fn resolve_feature(nav: &RegionNavigator, arg: Option<&str>) -> Option<Feature> {
    let arg = arg?;
    match arg.strip_prefix('#') {
        Some(index) => {
            let index: usize = index.parse().ok()?;
            nav.geometry().features.get(index).cloned()
        }
        None => nav.find_feature(&Identifier::from(arg)),
    }
}

/// Attend les exports lancés pendant la session ; renvoie le nombre de
/// niveaux en échec
async fn finish_exports(pending: Vec<ExportBatch>) -> usize {
    let mut failed = 0;
    for batch in pending {
        for outcome in batch.join().await {
            if let Err(err) = outcome.result {
                println!("  x export {}: {}", outcome.level, err);
                failed += 1;
            }
        }
    }
    failed
}

const BROWSE_HELP: &str = "Commands:
  ls                      list displayed regions
  drill <code|#idx>       drill into a region
  up                      roll up one level
  select <code|#idx>      select a region for export
  export <level,...>      export subdivisions of the selection
  save [low|high]         write the current level
  save-selected           write the selected region
  source <registry|tiled> switch provider (back to the top)
  state                   show navigation state
  quit";

/// Exploration interactive sur stdin
pub async fn cmd_browse(config: &AppConfig, kind: ProviderKind, output: &Path) -> Result<()> {
    let nav = build_navigator(config, kind)?;
    let sink = Arc::new(GeoJsonFileSink::new(output)?);

    // L'échec est déjà notifié ; on reste dans la boucle
    if nav.load_root().await.is_ok() {
        print_listing(&nav);
    }
    println!("{}", BROWSE_HELP);

    let mut pending = Vec::new();
    let mut read_error = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                read_error = Some(e);
                break;
            }
        };
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let arg = parts.next();

        match command {
            "ls" | "list" => print_listing(&nav),
            "drill" | "d" => match resolve_feature(&nav, arg) {
                Some(feature) => {
                    if nav.drill_in(&feature).await.is_ok() {
                        print_listing(&nav);
                    }
                }
                None => println!("  Unknown region: {}", arg.unwrap_or("")),
            },
            "up" | "u" => {
                if nav.roll_up().await.is_ok() {
                    print_listing(&nav);
                }
            }
            "select" | "s" => match resolve_feature(&nav, arg) {
                Some(feature) => {
                    let selected = nav.select_feature(&feature);
                    println!("  Selected {} ({}, {})", selected.name, selected.id, selected.level);
                }
                None => println!("  Unknown region: {}", arg.unwrap_or("")),
            },
            "export" | "e" => {
                let levels = match arg
                    .unwrap_or("")
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(str::parse::<Level>)
                    .collect::<Result<Vec<_>, _>>()
                {
                    Ok(levels) => levels,
                    Err(e) => {
                        println!("  {}", e);
                        continue;
                    }
                };
                // Les tâches tournent en arrière-plan, attendues en fin de session
                let sink: Arc<dyn ExportSink> = sink.clone();
                let batch = nav.export_descendants(&levels, sink);
                if !batch.is_empty() {
                    debug!(levels = ?batch.levels(), "export launched");
                    pending.push(batch);
                }
            }
            "save" => {
                let precision = match arg.map(str::parse::<Precision>).transpose() {
                    Ok(p) => p.unwrap_or_default(),
                    Err(e) => {
                        println!("  {}", e);
                        continue;
                    }
                };
                if let Ok(count) = nav.export_current(precision, sink.as_ref()).await {
                    println!(
                        "  {} features -> {}",
                        count,
                        sink.path_for(nav.state().current_id.as_str()).display()
                    );
                }
            }
            "save-selected" => {
                if let (Ok(1), Some(selected)) =
                    (nav.export_selected(sink.as_ref()).await, nav.selected())
                {
                    println!("  -> {}", sink.path_for(selected.id.as_str()).display());
                }
            }
            "source" => match arg.map(str::parse::<ProviderKind>) {
                Some(Ok(kind)) => {
                    if nav.switch_provider(kind).await.is_ok() {
                        print_listing(&nav);
                    }
                }
                Some(Err(e)) => println!("  {}", e),
                None => println!("  Current provider: {}", nav.provider()),
            },
            "state" => println!("{}", serde_json::to_string_pretty(&nav.state())?),
            "help" | "?" => println!("{}", BROWSE_HELP),
            "quit" | "q" | "exit" => break,
            other => println!("  Unknown command: {} (type help)", other),
        }
    }

    if !pending.is_empty() {
        println!("  Waiting for {} export(s)...", pending.len());
    }
    let failed = finish_exports(pending).await;
    if failed > 0 {
        warn!(failed, "some export levels failed");
    }

    match read_error {
        Some(e) => Err(e).context("Failed to read stdin"),
        None => Ok(()),
    }
}

/// Descend un chemin et écrit la géométrie atteinte
pub async fn cmd_walk(
    config: &AppConfig,
    kind: ProviderKind,
    path: &[String],
    output: Option<&Path>,
) -> Result<()> {
    let nav = build_navigator(config, kind)?;
    nav.load_root().await?;
    walk_path(&nav, path).await?;

    let state = nav.state();
    let output = match output {
        Some(p) => p.to_path_buf(),
        None => {
            std::fs::create_dir_all(&config.output_dir)?;
            config
                .output_dir
                .join(format!("{}.json", state.current_id))
        }
    };

    let geometry = nav.geometry();
    write_collection(&geometry, &output)
        .context(format!("Failed to write {}", output.display()))?;

    info!(
        current = %state.current_id,
        level = %state.level,
        features = geometry.features.len(),
        output = %output.display(),
        "Walk complete"
    );
    Ok(())
}

/// Export en masse sous une région
#[allow(clippy::too_many_arguments)]
pub async fn cmd_export(
    config: &AppConfig,
    kind: ProviderKind,
    path: &[String],
    select: &str,
    levels: &[Level],
    include_selected: bool,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let nav = build_navigator(config, kind)?;
    nav.load_root().await?;
    walk_path(&nav, path).await?;

    let id = Identifier::from(select);
    let feature = nav.find_feature(&id).with_context(|| {
        format!("Region {} is not displayed at level {}", id, nav.state().level)
    })?;
    let selected = nav.select_feature(&feature);

    let sink = Arc::new(GeoJsonFileSink::new(output)?);
    if include_selected {
        nav.export_selected(sink.as_ref()).await?;
    }

    let export_sink: Arc<dyn ExportSink> = sink.clone();
    let batch = nav.export_descendants(levels, export_sink);
    if batch.is_empty() {
        bail!(
            "No level below {} to export under {}",
            selected.level,
            selected.name
        );
    }

    let mut report = ExportReport::new(kind.as_str(), selected.id.as_str(), &selected.name);
    for outcome in batch.join().await {
        report.record_outcome(outcome, |level| {
            sink.path_for(&format!("{}_{}", selected.id, level))
        });
    }
    report.set_duration(start.elapsed());
    report.finalize();
    report.display();

    if let Some(p) = report_path {
        report.save_to_file(p)?;
        info!(path = %p.display(), "Report saved");
    }

    info!("{}", report.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drillmap::{FetchError, GeometryResult, SourcesConfig, Transport};
    use geojson::{Geometry, Value};

    /// Sert la même collection pour tout locator, sauf ceux contenant `fail`
    struct FixedTransport {
        fail: &'static str,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn fetch_geojson(&self, locator: &str) -> std::result::Result<GeometryResult, FetchError> {
            if locator.contains(self.fail) {
                return Err(FetchError::Status {
                    locator: locator.to_string(),
                    status: 404,
                });
            }
            Ok(GeometryResult {
                bbox: None,
                features: vec![Feature {
                    bbox: None,
                    geometry: None,
                    id: None,
                    properties: serde_json::json!({"adcode": 330000, "name": "浙江省"})
                        .as_object()
                        .cloned(),
                    foreign_members: None,
                }],
                foreign_members: None,
            })
        }
    }

    #[tokio::test]
    async fn test_finish_exports_waits_for_pending_batches() {
        let dir = std::env::temp_dir().join("drillmap_test_browse_exports");
        std::fs::remove_dir_all(&dir).ok();
        let sink = Arc::new(GeoJsonFileSink::new(&dir).unwrap());

        let nav = RegionNavigator::new(
            SourceFactory::new(SourcesConfig::default(), Arc::new(FixedTransport { fail: "/none/" })),
            ProviderKind::Registry,
            Arc::new(ConsoleNotifier),
        );
        nav.load_root().await.unwrap();
        let feature = nav.find_feature(&Identifier::from("330000")).unwrap();
        nav.select_feature(&feature);

        let export_sink: Arc<dyn ExportSink> = sink.clone();
        let batch = nav.export_descendants(&[Level::City, Level::District], export_sink);
        assert_eq!(finish_exports(vec![batch]).await, 0);

        assert!(sink.path_for("330000_city").exists());
        assert!(sink.path_for("330000_district").exists());

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_finish_exports_counts_failed_levels() {
        let dir = std::env::temp_dir().join("drillmap_test_browse_failures");
        let sink: Arc<dyn ExportSink> = Arc::new(GeoJsonFileSink::new(&dir).unwrap());

        let nav = RegionNavigator::new(
            SourceFactory::new(SourcesConfig::default(), Arc::new(FixedTransport { fail: "330000" })),
            ProviderKind::Registry,
            Arc::new(ConsoleNotifier),
        );
        nav.load_root().await.unwrap();
        let feature = nav.find_feature(&Identifier::from("330000")).unwrap();
        nav.select_feature(&feature);

        let batch = nav.export_descendants(&[Level::City], sink);
        assert_eq!(finish_exports(vec![batch, ExportBatch::default()]).await, 1);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_feature_bbox() {
        let feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![vec![
                vec![118.0, 27.0],
                vec![123.0, 27.0],
                vec![123.0, 31.2],
                vec![118.0, 27.0],
            ]]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert_eq!(feature_bbox(&feature), Some([118.0, 27.0, 123.0, 31.2]));
    }

    #[test]
    fn test_feature_bbox_without_geometry() {
        let feature = Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert_eq!(feature_bbox(&feature), None);
    }
}
