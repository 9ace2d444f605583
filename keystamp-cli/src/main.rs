// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Keystamp CLI
//!
//! Command-line interface for Keystamp stores.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keystamp_core::{Element, KeystampConfig};
use keystamp_query::{Filter, Keystamp, SelectQuery, SortOrder};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, Level};

const DEFAULT_DB_PATH: &str = "./keystamp-data";

#[derive(Parser)]
#[command(name = "keystamp")]
#[command(about = "Keystamp - time-keyed record store", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RocksDB data directory, overrides the configured store path
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Namespace, overrides the configured one
    #[arg(short, long)]
    namespace: Option<String>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a record
    Put {
        /// Record value
        value: String,

        /// Timestamp in epoch milliseconds (defaults to now)
        #[arg(short, long)]
        timestamp: Option<i64>,

        /// Attribute as name=value, repeatable, kept in the given order
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Get a record by its full key
    Get {
        key: String,
    },

    /// List every key
    Keys,

    /// Delete records by their full keys
    Delete {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Select records in a time range
    Select {
        /// Range start in epoch milliseconds
        #[arg(long, default_value = "0")]
        from: i64,

        /// Range end in epoch milliseconds (defaults to now)
        #[arg(long)]
        to: Option<i64>,

        /// Newest first
        #[arg(long)]
        desc: bool,

        /// Maximum number of records, 0 for no limit
        #[arg(short, long, default_value = "0")]
        limit: usize,

        /// Regular expression the key must match, repeatable
        #[arg(short = 'm', long = "match", conflicts_with = "rules")]
        patterns: Vec<String>,

        /// JSON file holding a condition tree or a pattern list
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },

    /// Delete expired records
    Purge {
        /// Retention window in seconds, overrides the configured one
        #[arg(long, conflicts_with = "before")]
        window_secs: Option<u64>,

        /// Delete records stamped at or before this epoch millisecond
        #[arg(long)]
        before: Option<i64>,
    },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Cutoff for a retention window ending now; a zero window purges up to `now_ms`
fn window_cutoff(now_ms: i64, window_secs: u64) -> i64 {
    let window_ms = i64::try_from(window_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    now_ms.saturating_sub(window_ms)
}

fn load_config(cli: &Cli) -> Result<KeystampConfig> {
    let mut config = match &cli.config {
        Some(path) => KeystampConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => KeystampConfig::default(),
    };

    let namespace = cli
        .namespace
        .clone()
        .unwrap_or_else(|| config.store.namespace.clone());
    if let Some(path) = &cli.db_path {
        config.store.path = Some(path.clone());
    } else if config.store.path.is_none() {
        config.store.path = Some(PathBuf::from(DEFAULT_DB_PATH));
    }
    config.store.namespace = namespace;
    Ok(config)
}

fn element_json(element: &Element) -> Value {
    json!({
        "key": element.index,
        "value": element.value.as_deref().map(String::from_utf8_lossy),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let db = Keystamp::open(config).context("Failed to open store")?;

    match cli.command {
        Commands::Put {
            value,
            timestamp,
            fields,
        } => {
            let timestamp = timestamp.unwrap_or_else(now_millis);
            let flat: Vec<&str> = fields
                .iter()
                .flat_map(|(name, value)| [name.as_str(), value.as_str()])
                .collect();
            let key = db.insert(timestamp, &flat, value.into_bytes())?;

            if cli.json {
                println!("{}", json!({ "key": key }));
            } else {
                println!("✓ Stored {}", key);
            }
        }

        Commands::Get { key } => match db.get(&key)? {
            Some(value) => {
                let element = Element::new(key, value);
                if cli.json {
                    println!("{}", element_json(&element));
                } else {
                    println!("{}", String::from_utf8_lossy(element.value.as_deref().unwrap_or_default()));
                }
            }
            None => {
                if cli.json {
                    println!("null");
                } else {
                    println!("✗ Record not found");
                }
            }
        },

        Commands::Keys => {
            let keys = db.keys()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&keys)?);
            } else {
                for key in &keys {
                    println!("{}", key);
                }
                println!("{} keys", keys.len());
            }
        }

        Commands::Delete { keys } => {
            db.remove(&keys)?;
            info!(count = keys.len(), "Records deleted");
            if !cli.json {
                println!("✓ Deleted {} keys", keys.len());
            }
        }

        Commands::Select {
            from,
            to,
            desc,
            limit,
            patterns,
            rules,
        } => {
            let filter = match rules {
                Some(path) => {
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let value: Value = serde_json::from_str(&text)
                        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
                    db.parse_filter(value)?
                }
                None if patterns.is_empty() => Filter::None,
                None => Filter::Patterns(patterns),
            };
            let order = if desc {
                SortOrder::Descending
            } else {
                SortOrder::Ascending
            };
            let query = SelectQuery::range(from, to.unwrap_or_else(now_millis))
                .with_order(order)
                .with_limit(limit)
                .with_filter(filter);

            let results = db.select(&query)?;
            if cli.json {
                let rendered: Vec<Value> = results.iter().map(element_json).collect();
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                println!("Found {} records:", results.len());
                for element in &results {
                    let value = element.value.as_deref().unwrap_or_default();
                    println!("  {} = {}", element.index, String::from_utf8_lossy(value));
                }
            }
        }

        Commands::Purge {
            window_secs,
            before,
        } => {
            let stats = match (before, window_secs) {
                (Some(cutoff), _) => db.purge_before(cutoff)?,
                (None, Some(secs)) => db.purge_before(window_cutoff(now_millis(), secs))?,
                (None, None) => db.purge_expired()?,
            };

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "✓ Purged {} records stamped at or before {} ({} ms)",
                    stats.records_deleted, stats.cutoff_ms, stats.cleanup_duration_ms
                );
            }
        }
    }

    Ok(())
}
