//! Point d'entrée CLI pour drillmap

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use drillmap_cli::AppConfig;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Explorer et exporter les contours administratifs (pays, province, ville, district)
#[derive(Parser)]
#[command(name = "drillmap")]
#[command(author, version)]
#[command(about = "Drill into administrative boundaries and export them as GeoJSON")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fichier de configuration JSON (défaut : variables DRILLMAP_*)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    let config = AppConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Browse { source, output } => {
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            info!(source = %source, output = %output.display(), "Interactive browse");
            cli::cmd_browse(&config, source, &output).await?;
        }
        Commands::Walk {
            source,
            path,
            output,
        } => {
            info!(source = %source, path = ?path, "Walk");
            cli::cmd_walk(&config, source, &path, output.as_deref()).await?;
        }
        Commands::Export {
            source,
            path,
            select,
            levels,
            include_selected,
            output,
            report,
        } => {
            let output = output.unwrap_or_else(|| config.output_dir.clone());
            info!(source = %source, select = %select, levels = ?levels, output = %output.display(), "Bulk export");
            cli::cmd_export(
                &config,
                source,
                &path,
                &select,
                &levels,
                include_selected,
                &output,
                report.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
