//! `kvscan` command line.
//!
//! Seeds an in-memory hash or sorted set and walks it with `HSCAN` / `ZSCAN`,
//! printing every page or every streamed element together with the cursor
//! that came back.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use kvscan::{
    init_logging, Client, HashScan, InMemoryStore, KeyValue, KvResult, LogFormat, ScanArgs,
    ScanKind, ScoredValue, Settings, SortedSetScan, StackError, Transport,
};
use kvscan_error::LogLevel;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "kvscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Walk hashes and sorted sets with cursor scans", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (TOML, YAML or JSON).
    #[arg(short, long, env = "KVSCAN_CONFIG")]
    config: Option<PathBuf>,
    /// `COUNT` hint per scan step.
    #[arg(long)]
    count: Option<u64>,
    /// Store-side `MATCH` glob.
    #[arg(long = "match")]
    pattern: Option<String>,
    /// Deliver elements one at a time instead of collecting pages.
    #[arg(long)]
    stream: bool,
    /// Overrides the configured log level.
    #[arg(long)]
    log_level: Option<String>,
    /// Overrides the configured log format.
    #[arg(long, value_parser = parse_format)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a hash with HSCAN.
    Hash {
        /// Number of fields to seed.
        #[arg(short, long, default_value_t = 50)]
        fields: usize,
    },
    /// Walk a sorted set with ZSCAN.
    Zset {
        /// Number of members to seed.
        #[arg(short, long, default_value_t = 50)]
        members: usize,
    },
}

fn parse_format(s: &str) -> Result<LogFormat, String> {
    s.parse().map_err(|e: StackError| e.to_string())
}

const KEY: &str = "demo";

fn seed_hash(
    client: &mut Client<InMemoryStore>,
    fields: usize,
) -> KvResult<()> {
    let pairs: Vec<(Bytes, Bytes)> = (0..fields)
        .map(|i| (Bytes::from(format!("field:{i:04}")), Bytes::from(format!("value-{i}"))))
        .collect();
    if !pairs.is_empty() {
        client.hmset(KEY, &pairs)?;
    }
    Ok(())
}

fn seed_zset(
    client: &mut Client<InMemoryStore>,
    members: usize,
) -> KvResult<()> {
    let entries: Vec<(f64, Bytes)> = (0..members)
        .map(|i| ((i % 7) as f64 * 1.5, Bytes::from(format!("member:{i:04}"))))
        .collect();
    if !entries.is_empty() {
        client.zadd_multi(KEY, &entries)?;
    }
    Ok(())
}

/// Bulk walk, one printed line per page.
fn print_pages<S, T>(
    client: &mut Client<T>,
    args: Option<&ScanArgs>,
    show: impl Fn(&S::Element) -> String,
) -> KvResult<usize>
where
    S: ScanKind,
    T: Transport,
{
    let mut total = 0;
    let mut pages = client.scan_pages::<S>(KEY, args);
    while let Some(page) = pages.next() {
        let page = page?;
        total += page.len();
        let cursor = pages
            .walk()
            .state()
            .cursor()
            .map(|c| String::from_utf8_lossy(c.position()).into_owned())
            .unwrap_or_default();
        let items: Vec<String> = page.iter().map(&show).collect();
        println!("cursor={cursor:<6} [{}]", items.join(", "));
    }
    Ok(total)
}

fn show_field(kv: &KeyValue) -> String {
    format!(
        "{}={}",
        String::from_utf8_lossy(&kv.key),
        String::from_utf8_lossy(&kv.value)
    )
}

fn show_member(sv: &ScoredValue) -> String {
    format!("{}:{}", String::from_utf8_lossy(&sv.value), sv.score)
}

fn walk(
    client: &mut Client<InMemoryStore>,
    command: Commands,
    stream: bool,
    args: Option<&ScanArgs>,
) -> KvResult<u64> {
    let total = match (command, stream) {
        (Commands::Hash { fields }, false) => {
            seed_hash(client, fields)?;
            print_pages::<HashScan, _>(client, args, show_field)? as u64
        }
        (Commands::Hash { fields }, true) => {
            seed_hash(client, fields)?;
            client.scan_all_stream::<HashScan, _>(
                &mut |kv: KeyValue| -> KvResult<()> {
                    println!("{}", show_field(&kv));
                    Ok(())
                },
                KEY,
                args,
            )?
        }
        (Commands::Zset { members }, false) => {
            seed_zset(client, members)?;
            print_pages::<SortedSetScan, _>(client, args, show_member)? as u64
        }
        (Commands::Zset { members }, true) => {
            seed_zset(client, members)?;
            client.scan_all_stream::<SortedSetScan, _>(
                &mut |sv: ScoredValue| -> KvResult<()> {
                    println!("{}", show_member(&sv));
                    Ok(())
                },
                KEY,
                args,
            )?
        }
    };
    Ok(total)
}

/// Logs a failed walk at the level its status code calls for.
fn report_failure(err: &StackError) {
    let code = err.status_code();
    match err.log_level() {
        LogLevel::Info => info!(%code, error = %err, "Walk failed"),
        LogLevel::Warn => warn!(%code, error = %err, "Walk failed"),
        LogLevel::Error => error!(%code, error = %err, "Walk failed"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }
    if let Some(format) = cli.log_format {
        settings.log_format = format;
    }
    if let Some(count) = cli.count {
        settings.scan_count = Some(count);
    }
    let logging = init_logging(settings.logging_config()).context("failed to initialize logging")?;

    let args = cli.pattern.map(|p| {
        let args = ScanArgs::new().matches(p);
        match settings.scan_count {
            Some(count) => args.limit(count),
            None => args,
        }
    });

    let store = InMemoryStore::new();
    let mut client = Client::with_options(store, settings.client_options());

    let total = match walk(&mut client, cli.command, cli.stream, args.as_ref()) {
        Ok(total) => total,
        Err(err) => {
            report_failure(&err);
            logging.shutdown();
            return Err(err.into());
        }
    };

    info!(total, "Walk finished");
    println!("{total} element(s)");
    logging.shutdown();
    Ok(())
}
