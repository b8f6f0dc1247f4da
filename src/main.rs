use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use feedwatch::commands::CommandContext;
use feedwatch::config::Config;
use feedwatch::feed::FeedFetcher;
use feedwatch::poller::{self, run_cycle};
use feedwatch::registry::Registry;
use feedwatch::transport::{ChatTransport, Destination, StdoutTransport};

/// Get the config file path (~/.config/feedwatch/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedwatch")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "feedwatch", about = "Watch RSS/Atom feeds and deliver new entries to chat")]
struct Args {
    /// Path to the configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the polling interval in seconds (0 suspends polling)
    #[arg(long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load_or_default(&config_path);

    // The shared HTTP client is the one piece of startup that is allowed to
    // be fatal; everything downstream degrades per feed.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("feedwatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;
    let fetcher = FeedFetcher::new(client);

    let registry = Arc::new(Registry::new());
    let transport: Arc<dyn ChatTransport> = Arc::new(StdoutTransport);

    let interval_secs = args.interval.unwrap_or(config.interval_secs);
    let scheduler = {
        let registry = Arc::clone(&registry);
        let fetcher = fetcher.clone();
        let transport = Arc::clone(&transport);
        poller::spawn(interval_secs, move || {
            let registry = Arc::clone(&registry);
            let fetcher = fetcher.clone();
            let transport = Arc::clone(&transport);
            async move { run_cycle(&registry, &fetcher, transport.as_ref()).await }
        })
    };

    let commands = CommandContext::new(
        registry,
        fetcher,
        config.credential_set(),
        scheduler.clone(),
    );

    // Console front end: one line per command, replies on stdout. A chat
    // protocol adapter would call dispatch() the same way with its own
    // destinations.
    let console = Destination::direct("console");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("feedwatch ready — watch <url> | ignore <title> | list | interval [<seconds>] | quit");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        for reply in commands.dispatch(line, &console).await {
            println!("{}", reply);
        }
    }

    scheduler.stop();
    println!("Goodbye!");
    Ok(())
}
