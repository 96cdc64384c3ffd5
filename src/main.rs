use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use gleaner::config::Config;
use gleaner::feed::http_client;
use gleaner::scheduler;
use gleaner::storage::Database;

/// Get the config directory path (~/.config/gleaner/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gleaner"))
}

#[derive(Parser, Debug)]
#[command(name = "gleaner", about = "Single-user RSS aggregator")]
struct Args {
    /// Database file (overrides config)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a feed
    Add {
        /// Display name for the feed
        name: String,
        /// Feed URL
        url: String,
    },
    /// List registered feeds
    Feeds,
    /// Unregister a feed and delete its posts
    Rm {
        /// Feed URL
        url: String,
    },
    /// Print the most recently published posts
    Browse {
        /// Number of posts to print
        #[arg(default_value_t = 2)]
        limit: u32,
    },
    /// Run the aggregation loop
    Agg {
        /// Seconds between ticks (defaults to tick_interval_seconds from config)
        #[arg(value_name = "SECONDS")]
        every: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gleaner=info".into()),
        )
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    let config = Config::load(&config_dir.join("config.toml"))?;

    let db_path = args
        .db
        .or(config.database_path.clone())
        .unwrap_or_else(|| config_dir.join("gleaner.db"));
    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = Database::open(db_path_str)
        .await
        .context("Failed to open database")?;

    match args.command {
        Command::Add { name, url } => {
            // Reject junk before it enters the registry
            url::Url::parse(&url).with_context(|| format!("Invalid feed URL: {}", url))?;
            let feed = db.insert_feed(&name, &url).await?;
            println!("Registered \"{}\" ({})", feed.name, feed.url);
        }
        Command::Feeds => {
            let feeds = db.all_feeds().await?;
            if feeds.is_empty() {
                println!("No feeds registered. Add one with: gleaner add <name> <url>");
            }
            for feed in feeds {
                println!("{}", feed.name);
                println!("* url: {}", feed.url);
                match feed.last_fetched_at {
                    Some(ts) => match Utc.timestamp_opt(ts, 0).single() {
                        Some(dt) => println!("* last fetched: {}", dt.to_rfc3339()),
                        None => println!("* last fetched: (invalid timestamp)"),
                    },
                    None => println!("* last fetched: never"),
                }
            }
        }
        Command::Rm { url } => {
            if db.remove_feed(&url).await? {
                println!("Removed {}", url);
            } else {
                anyhow::bail!("No feed registered with URL {}", url);
            }
        }
        Command::Browse { limit } => {
            for post in db.recent_posts(limit).await? {
                println!("Title: {}", post.title.as_deref().unwrap_or("<untitled>"));
                println!("* Link: {}", post.url.as_deref().unwrap_or(""));
                println!("* Desc: {}", post.description.as_deref().unwrap_or(""));
                if let Some(ts) = post.published_at {
                    if let Some(dt) = Utc.timestamp_opt(ts, 0).single() {
                        println!("* Pub Date: {}", dt.to_rfc3339());
                    }
                }
                println!();
            }
        }
        Command::Agg { every } => {
            let seconds = every.unwrap_or(config.tick_interval_seconds);
            let client = http_client().context("Failed to build HTTP client")?;
            scheduler::run_loop(&db, &client, Duration::from_secs(seconds)).await?;
        }
    }

    Ok(())
}
