// Dynasty entry point.
//
// Startup sequence:
// 1. Initialize tracing (append to logs/dynasty.log)
// 2. Load config, apply the optional seed override from argv
// 3. Build the Sleeper client and history engine
// 4. Run the pipeline and write the JSON report

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use dynasty_core::config;
use dynasty_core::history::{HistoryEngine, HistoryReport, ProgressCallback};
use dynasty_core::source::sleeper::SleeperClient;
use tracing::info;

const LOG_FILE: &str = "logs/dynasty.log";
const DEFAULT_FILTER: &str = "dynasty=info,dynasty_core=info,warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing(Path::new(LOG_FILE))?;
    info!("Dynasty starting up");

    // 2. Load config
    let mut config = config::load_config().context("failed to load configuration")?;
    if let Some(seed) = std::env::args().nth(1).filter(|s| !s.trim().is_empty()) {
        info!("Seed league overridden from command line: {}", seed);
        config.league.seed_league_id = seed;
    }
    info!(
        "Config loaded: seed={}, source={}, strategies={:?}",
        config.league.seed_league_id, config.source.base_url, config.champion.strategies
    );

    // 3. Build the engine
    let client = SleeperClient::new(config.source.base_url.clone());
    let progress: ProgressCallback = Arc::new(|percent: u8, message: &str| {
        info!(percent, "{}", message);
    });
    let engine = HistoryEngine::from_config(Arc::new(client), &config).with_progress(progress);

    // 4. Run and write the report
    let seed = &config.league.seed_league_id;
    let report = engine
        .run(seed)
        .await
        .with_context(|| format!("failed to build history for league {seed}"))?;

    let path = Path::new(&config.output.report_path);
    write_report(path, &report)?;
    print_summary(&report, path);

    info!("Dynasty finished");
    Ok(())
}

fn write_report(path: &Path, report: &HistoryReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Report written to {}", path.display());
    Ok(())
}

fn print_summary(report: &HistoryReport, path: &Path) {
    let meta = &report.league_metadata;
    let name = if report.league_name.is_empty() {
        &report.seed_league_id
    } else {
        &report.league_name
    };
    println!(
        "{}: {} seasons ({} to {}), {} games, {} records",
        name,
        meta.total_seasons,
        meta.foundation_season.as_deref().unwrap_or("?"),
        meta.latest_season.as_deref().unwrap_or("?"),
        meta.total_games_played,
        report.records.len()
    );
    for (place, user) in report.all_time_stats.iter().take(3).enumerate() {
        let team = user
            .team_name
            .as_deref()
            .map(|t| format!(" [{t}]"))
            .unwrap_or_default();
        println!(
            "  {}. {}{} {}-{}-{} ({} titles)",
            place + 1,
            user.display_name,
            team,
            user.wins,
            user.losses,
            user.ties,
            user.championships
        );
    }
    println!("Full report: {}", path.display());
}

/// Send tracing output to `path`, appending across runs, so stdout carries
/// only the summary. `RUST_LOG` overrides the default filter.
fn init_tracing(path: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set tracing subscriber: {e}"))
}
