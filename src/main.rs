use std::path::Path;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mlbb_meta_tracker::analysis::{generate_charts, generate_report, preprocess, HeroObservation};
use mlbb_meta_tracker::api::{router, ApiState};
use mlbb_meta_tracker::config::Config;
use mlbb_meta_tracker::error::Result;
use mlbb_meta_tracker::fetcher::Fetcher;
use mlbb_meta_tracker::pipeline::run_extraction;
use mlbb_meta_tracker::store::HistoricalStore;

#[derive(Parser, Debug)]
#[command(name = "tracker", about = "MLBB hero win/ban rate tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch today's snapshot and append it to the historical CSV
    Extract,
    /// Render the PNG charts for the latest extraction date
    Analyze,
    /// Write the text trend report
    Report,
    /// Extract, then chart, then report
    Daily,
    /// Serve the historical table over HTTP
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cli.command, cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command, cfg: Config) -> Result<()> {
    let store = HistoricalStore::new(&cfg);
    let today = Local::now().date_naive();

    match command {
        Command::Extract => extract(&cfg, &store, today).await,
        Command::Analyze => analyze(&cfg.reports_dir, &load_observations(&store)?),
        Command::Report => report(&cfg.reports_dir, &load_observations(&store)?),
        Command::Daily => {
            extract(&cfg, &store, today).await?;
            let obs = load_observations(&store)?;
            analyze(&cfg.reports_dir, &obs)?;
            report(&cfg.reports_dir, &obs)
        }
        Command::Serve => serve(&cfg, store).await,
    }
}

async fn extract(cfg: &Config, store: &HistoricalStore, today: NaiveDate) -> Result<()> {
    info!("Starting extraction for {today} from {}", cfg.api_base_url);
    let fetcher = Fetcher::new(cfg)?;
    let (rows, outcome) = run_extraction(&fetcher, cfg, store, today).await?;
    info!(
        heroes = rows.len(),
        written = outcome.written,
        skipped = outcome.skipped_existing,
        created = outcome.created,
        "Extraction complete, historical file {}",
        store.historical_path().display(),
    );
    Ok(())
}

fn load_observations(store: &HistoricalStore) -> Result<Vec<HeroObservation>> {
    let records = store.load()?;
    let obs = preprocess(&records);
    let dropped = records.len() - obs.len();
    if dropped > 0 {
        warn!("{dropped} historical rows dropped for missing name, win rate or ban rate");
    }
    info!("Loaded {} observations", obs.len());
    Ok(obs)
}

fn analyze(dir: &Path, obs: &[HeroObservation]) -> Result<()> {
    let paths = generate_charts(obs, dir)?;
    info!(
        "Charts ready: {} | {} | {}",
        paths.scatter.display(),
        paths.roles.display(),
        paths.lanes.display()
    );
    Ok(())
}

fn report(dir: &Path, obs: &[HeroObservation]) -> Result<()> {
    let path = generate_report(obs, dir)?;
    info!("Report ready: {}", path.display());
    Ok(())
}

async fn serve(cfg: &Config, store: HistoricalStore) -> Result<()> {
    if !store.exists() {
        warn!(
            "Historical file {} not found yet; /data will answer 404 until an extraction runs",
            store.historical_path().display()
        );
    }
    let app = router(ApiState::new(store));
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
