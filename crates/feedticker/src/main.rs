//! `feedticker` - CLI for the feedticker library
//!
//! This binary polls a feed, prints the current headlines and manages the
//! local entry cache.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use chrono::Utc;
use clap::Parser;

use feedticker::cli::{
    ClearCommand, Cli, Command, ConfigCommand, FetchCommand, OutputFormat, RunCommand,
    ShowCommand,
};
use feedticker::display::{render_json, render_text};
use feedticker::{
    init_logging, Config, EntryCache, HttpFeedSource, Origin, Snapshot, Ticker, TickerHandle,
    TickerSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Run(cmd) => handle_run(&config, &cmd).await,
        Command::Fetch(cmd) => handle_fetch(&config, &cmd).await,
        Command::Show(cmd) => handle_show(&config, &cmd),
        Command::Clear(cmd) => handle_clear(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn print_snapshot(
    config: &Config,
    snapshot: &Snapshot,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render_text(snapshot, &config.display)),
        OutputFormat::Json => println!("{}", render_json(snapshot)?),
    }
    Ok(())
}

fn build_ticker(config: &Config) -> anyhow::Result<Ticker<HttpFeedSource>> {
    let cache = EntryCache::open(config.database_path())
        .with_context(|| format!("opening cache at {}", config.database_path().display()))?;
    let source = HttpFeedSource::from_config(config)?;
    Ok(Ticker::new(source, cache, TickerSettings::from(config)))
}

async fn handle_run(config: &Config, cmd: &RunCommand) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(limit) = cmd.limit {
        config.ticker.limit = limit;
    }
    if let Some(interval) = cmd.interval {
        config.ticker.cache_interval_ms = interval;
    }
    config.validate()?;

    let mut ticker = build_ticker(&config)?;
    let handle = TickerHandle::new();

    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping ticker");
            stopper.stop();
        }
    });

    let format = cmd.format;
    ticker
        .run(&handle, |snapshot| {
            if let Err(err) = print_snapshot(&config, snapshot, format) {
                tracing::error!("Failed to render entries: {err}");
            }
        })
        .await;

    Ok(())
}

async fn handle_fetch(config: &Config, cmd: &FetchCommand) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(limit) = cmd.limit {
        config.ticker.limit = limit;
    }
    config.validate()?;

    let mut ticker = build_ticker(&config)?;
    let snapshot = ticker.refresh().await?;
    print_snapshot(&config, snapshot, cmd.format)
}

fn handle_show(config: &Config, cmd: &ShowCommand) -> anyhow::Result<()> {
    let cache = EntryCache::open(config.database_path())?;
    let limit = cmd.limit.unwrap_or(config.ticker.limit);

    let snapshot = Snapshot {
        entries: cache.get_recent(limit)?,
        origin: Origin::Cached,
        refreshed_at: cache.last_refresh()?.unwrap_or_else(Utc::now),
        error: None,
    };
    print_snapshot(config, &snapshot, cmd.format)
}

fn handle_clear(config: &Config, cmd: &ClearCommand) -> anyhow::Result<()> {
    if !cmd.yes {
        println!("This will remove every cached entry.");
        println!("Use --yes to confirm.");
        return Ok(());
    }

    let cache = EntryCache::open(config.database_path())?;
    let removed = cache.clear()?;
    println!("Removed {removed} cached entries.");
    Ok(())
}

fn handle_status(config: &Config, json: bool) -> anyhow::Result<()> {
    let cache = EntryCache::open(config.database_path())?;
    let stats = cache.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": config.database_path(),
            "total_entries": stats.total_entries,
            "last_refresh": stats.last_refresh,
            "feed_url": stats.feed_url,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("feedticker status");
        println!("-----------------");
        println!("Database:      {}", config.database_path().display());
        println!("Entries:       {}", stats.total_entries);
        println!(
            "Last refresh:  {}",
            stats
                .last_refresh
                .map_or_else(|| "never".to_string(), |at| at.to_rfc3339())
        );
        println!(
            "Feed:          {}",
            stats.feed_url.as_deref().unwrap_or("-")
        );
        println!("Size (bytes):  {}", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Feed]");
                println!("  URL:                {}", config.feed.url);
                println!("  CORS proxy:         {}", config.cors_proxy().unwrap_or("disabled"));
                println!("  Timeout (s):        {}", config.feed.request_timeout_secs);
                println!();
                println!("[Ticker]");
                println!("  Limit:              {}", config.ticker.limit);
                println!("  Interval (ms):      {}", config.ticker.cache_interval_ms);
                println!();
                println!("[Cache]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Display]");
                println!("  Width:              {}", config.display.width);
                println!("  Snippets:           {}", config.display.show_snippets);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
