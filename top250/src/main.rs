use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use top250::analysis::{Analyzer, DEFAULT_TOP_N};
use top250::api::ApiServer;
use top250::config::AppConfig;
use top250::state::AppState;
use top250::types::{PageProgress, ScrapeOutcome};

/// Douban movie Top250 scraper with a statistics API
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Run a scrape in the background as soon as the server starts
        #[clap(long, env = "SCRAPE_ON_START")]
        scrape_on_start: bool,
    },
    /// Scrape every page once, save the CSV and print the top 10
    Scrape,
    /// Print statistics for the saved CSV
    Report,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Supports: DEBUG, INFO, WARNING, ERROR, CRITICAL
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let filter = build_tracing_filter(&log_level);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .json()
        .init();

    let config = AppConfig::from_env();
    let state = Arc::new(AppState::from_config(&config).context("invalid listing URL")?);
    let shutdown = setup_shutdown_handler(state.shutdown_token());

    match args.command.unwrap_or(Command::Serve { scrape_on_start: false }) {
        Command::Serve { scrape_on_start } => serve(&config, state, shutdown, scrape_on_start).await,
        Command::Scrape => scrape_once(&state).await,
        Command::Report => report(&state).await,
    }
}

async fn serve(config: &AppConfig, state: Arc<AppState>, shutdown: CancellationToken, scrape_on_start: bool) -> Result<()> {
    print_ascii_art();
    info!("🚀 Starting Top250 API service");

    state.reload().await;

    if scrape_on_start {
        let state = state.clone();
        tokio::spawn(async move {
            let outcome = state.run_scrape().await;
            if !outcome.is_success() {
                warn!("⚠️ Startup scrape did not complete: {}", outcome.message());
            }
        });
    }

    let server = ApiServer::new(config.api_host.clone(), config.api_port, state);
    let result = server.run(shutdown).await;

    info!("🛑 Shutting down Top250 API service...");
    match result {
        Ok(()) => {
            info!("✅ Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("❌ API server failed: {}", e);
            Err(e)
        }
    }
}

async fn scrape_once(state: &AppState) -> Result<()> {
    let bar = ProgressBar::new(state.progress().pages_total.max(1) as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pages {msg}")
            .context("invalid progress template")?,
    );
    let observer = |update: &PageProgress| {
        bar.set_length(update.pages_total as u64);
        bar.set_position(update.pages_done as u64);
        bar.set_message(update.message());
    };

    let outcome = state.run_scrape_with(Some(&observer)).await;
    bar.finish_and_clear();

    println!("{}", outcome.message());
    check_scrape_outcome(outcome)?;

    let records = state.snapshot();
    println!("\n前{}部电影:", DEFAULT_TOP_N);
    for record in records.iter().take(DEFAULT_TOP_N) {
        println!("{}. {} - 评分: {}", record.rank, record.title, record.rating);
    }
    Ok(())
}

/// Only a scrape that was both collected and saved counts as success
fn check_scrape_outcome(outcome: ScrapeOutcome) -> Result<()> {
    match outcome {
        ScrapeOutcome::Completed { .. } => Ok(()),
        ScrapeOutcome::Empty | ScrapeOutcome::PersistFailed { .. } | ScrapeOutcome::AlreadyRunning => anyhow::bail!("{}", outcome.message()),
    }
}

async fn report(state: &AppState) -> Result<()> {
    let records = state.store().load().await.with_context(|| format!("cannot read {}", state.store().path().display()))?;
    let analyzer = Analyzer::new(&records);

    let basic = analyzer.statistics();
    println!("基本统计:");
    println!("  电影总数: {}", basic.total_movies);
    println!("  平均评分: {:.2}", basic.avg_rating);
    println!("  最高评分: {:.1}", basic.max_rating);
    println!("  最低评分: {:.1}", basic.min_rating);
    println!("  平均评价人数: {}", basic.avg_rating_people);

    println!("\n评分分布:");
    for (label, count) in analyzer.rating_distribution().entries() {
        println!("  {}: {}", label, count);
    }

    println!("\n热门类型:");
    for (genre, count) in analyzer.top_genres(DEFAULT_TOP_N).entries() {
        println!("  {}: {}", genre, count);
    }

    Ok(())
}

fn print_ascii_art() {
    println!(
        r#"
████████╗ ██████╗ ██████╗ ██████╗ ███████╗ ██████╗
╚══██╔══╝██╔═══██╗██╔══██╗╚════██╗██╔════╝██╔═████╗
   ██║   ██║   ██║██████╔╝ █████╔╝███████╗██║██╔██║
   ██║   ██║   ██║██╔═══╝ ██╔═══╝ ╚════██║████╔╝██║
   ██║   ╚██████╔╝██║     ███████╗███████║╚██████╔╝
   ╚═╝    ╚═════╝ ╚═╝     ╚══════╝╚══════╝ ╚═════╝
"#
    );
    println!();
}

fn setup_shutdown_handler(shutdown: CancellationToken) -> CancellationToken {
    let trigger = shutdown.clone();

    tokio::spawn(async move {
        let _ = signal::ctrl_c().await;
        info!("🛑 Received shutdown signal");
        trigger.cancel();
    });

    shutdown
}

/// Build tracing filter string from Python-style log level
fn build_tracing_filter(log_level: &str) -> String {
    let rust_level = match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        "CRITICAL" => "error",
        _ => "info",
    };
    let http_level = if rust_level == "debug" { "debug" } else { "warn" };
    format!("top250={},tower_http={}", rust_level, http_level)
}
