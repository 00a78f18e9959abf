//! iocsync: a local mirror for threat-indicator feeds
//!
//! **iocsync keeps a deduplicated, age-stamped SQLite mirror of a remote
//! indicator feed and fires operator-defined shell actions against it.**
//!
//! Each sync cycle requests only the window elapsed since the previous
//! run (capped at the retention lifetime), stamps new indicators with a
//! local first-seen age, rotates the run timestamps and evicts records
//! past their lifetime. Dispatch cycles partition the mirror into `new`
//! and `old` relative to the previous run and launch templated commands
//! per record type, bracketed by optional `initial`/`final` hooks.
//!
//! # Architecture
//!
//! - [`core`]: shared infrastructure — error taxonomy, SQLite access via
//!   the scoped-connection broker, schema constants, lifespan parsing,
//!   time and output helpers.
//! - [`plugins`]: subsystems — settings row, record mirror, command
//!   registry, sync cycle, dispatch cycle, feed extractor.
//!
//! All store access runs through `DbBroker::with_conn`, which serializes
//! in-process and audits to `broker.events.jsonl`. There is no
//! cross-process exclusion: run one `iocsync` instance per store, or hold
//! an external lock.
//!
//! # Examples
//!
//! ```bash
//! # Create a mirror tracking domains for seven days
//! iocsync init --data-type domains --data-life 7d
//!
//! # Pull the feed window elapsed since the last run
//! iocsync sync
//!
//! # Block newly seen domains, then reload the firewall once
//! iocsync command add --type domain --command "block %hit%" --scope new
//! iocsync command add --type final --command "reload-fw" --scope new
//! iocsync dispatch --scope new
//! ```

pub mod core;
pub mod plugins;

use crate::core::output;
use crate::core::store::Store;
use crate::core::time;
use crate::core::{db, error};
use crate::plugins::commands::{self, Scope};
use crate::plugins::dispatch::{CollectingLauncher, ShellLauncher};
use crate::plugins::feed::{FeedExtractor, HttpFeed};
use crate::plugins::records::{self, Partition};
use crate::plugins::{dispatch, settings, sync};

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "iocsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Mirror a threat-indicator feed into a local aging store and dispatch templated shell actions against it."
)]
struct Cli {
    /// Store root directory (default: $IOCSYNC_HOME or ~/.iocsync).
    #[clap(long, global = true)]
    dir: Option<PathBuf>,
    #[clap(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug)]
struct CsvArgs {
    /// Include a header row.
    #[clap(long, short = 'H')]
    headers: bool,
    /// Field separator.
    #[clap(long, short = 'S', default_value = ",")]
    separator: String,
    /// Output file (default stdout).
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Initialize the store and its settings row (no-op if present).
    Init {
        /// Data to track: domains, hashes, filenames, snort or yara.
        #[clap(long)]
        data_type: String,
        /// Retention lifetime: <n>m, <n>h, <n>d, or 'all' for unbounded.
        #[clap(long)]
        data_life: String,
        /// Minimum analysis maturity (0 initial, 1 ongoing, 2 completed).
        #[clap(long, default_value_t = 0)]
        analysis_level: i64,
        /// Maximum threat level id (1 high .. 4 undefined).
        #[clap(long, default_value_t = 4)]
        threat_level: i64,
    },
    /// Run one sync cycle: fetch the elapsed window, store, rotate, evict.
    Sync,
    /// Run one dispatch cycle against a record partition.
    Dispatch {
        /// Partition to act on: all, new or old.
        #[clap(long)]
        scope: String,
        /// Wait for launched commands instead of fire-and-forget.
        #[clap(long)]
        wait: bool,
    },
    /// Manage command templates.
    Command(commands::CommandsCli),
    /// List mirrored records.
    Records {
        /// Restrict to one partition: new or old.
        #[clap(long)]
        partition: Option<String>,
        /// Render as CSV instead of a JSON envelope.
        #[clap(long)]
        csv: bool,
        #[clap(flatten)]
        csv_args: CsvArgs,
    },
    /// Show the current settings row.
    Settings,
    /// One-shot feed pull rendered as CSV, bypassing the mirror.
    Extract {
        /// Window to request: <n>m, <n>h, <n>d or 'all'.
        #[clap(long, short = 's', default_value = "all")]
        window: String,
        /// Data to look for: domains, hashes, filenames, snort or yara.
        #[clap(long)]
        data_type: String,
        /// Minimum analysis maturity.
        #[clap(long, default_value_t = 0)]
        analysis_level: i64,
        /// Maximum threat level id.
        #[clap(long, default_value_t = 4)]
        threat_level: i64,
        #[clap(flatten)]
        csv_args: CsvArgs,
    },
}

fn emit_csv(
    rows: &[(String, String)],
    csv_args: &CsvArgs,
) -> Result<(), error::IocsyncError> {
    let rendered = output::render_csv(rows, csv_args.headers, &csv_args.separator);
    match &csv_args.output {
        Some(path) => fs::write(path, rendered).map_err(error::IocsyncError::IoError)?,
        None => println!("{}", rendered),
    }
    Ok(())
}

pub fn run() -> Result<(), error::IocsyncError> {
    let cli = Cli::parse();
    let store = Store::resolve(cli.dir)?;

    match cli.command {
        CliCommand::Init {
            data_type,
            data_life,
            analysis_level,
            threat_level,
        } => {
            let created =
                settings::initialize(&store, &data_type, &data_life, analysis_level, threat_level)?;
            if created {
                println!(
                    "{} mirror initialized at {}",
                    "✓".bright_green(),
                    store.root.display()
                );
            } else {
                println!(
                    "{} store at {} already initialized; settings left untouched",
                    "ℹ".bright_blue(),
                    store.root.display()
                );
            }
        }
        CliCommand::Sync => {
            db::initialize_mirror_db(&store.root)?;
            let feed = HttpFeed::from_store(&store)?;
            let report = sync::run_cycle(&store, &feed)?;
            println!(
                "{}",
                time::command_envelope(
                    "sync",
                    "ok",
                    serde_json::json!({
                        "window": report.window,
                        "fetched": report.fetched,
                        "stored": report.stored,
                        "evicted": report.evicted,
                    })
                )
            );
        }
        CliCommand::Dispatch { scope, wait } => {
            let scope: Scope = scope.parse()?;
            let report = if wait {
                let launcher = CollectingLauncher::new();
                let report = dispatch::dispatch(&store, scope, &launcher)?;
                let statuses = launcher.wait_all()?;
                let failed = statuses.iter().filter(|s| !s.success()).count();
                if failed > 0 {
                    eprintln!("{} {} command(s) exited nonzero", "⚠".bright_yellow(), failed);
                }
                report
            } else {
                dispatch::dispatch(&store, scope, &ShellLauncher)?
            };
            println!(
                "{}",
                time::command_envelope(
                    "dispatch",
                    "ok",
                    serde_json::json!({
                        "scope": report.scope,
                        "records": report.records,
                        "launched": report.launched,
                    })
                )
            );
        }
        CliCommand::Command(command_cli) => {
            db::initialize_mirror_db(&store.root)?;
            commands::run_commands_cli(&store, command_cli)?;
        }
        CliCommand::Records {
            partition,
            csv,
            csv_args,
        } => {
            let data = match partition.as_deref() {
                None => records::fetch_all(&store)?,
                Some(p) => {
                    let partition = match p.parse::<Scope>()? {
                        Scope::New => Partition::New,
                        Scope::Old => Partition::Old,
                        Scope::All => {
                            return Err(error::IocsyncError::ValidationError(
                                "--partition takes new or old; omit it to list all records"
                                    .to_string(),
                            ));
                        }
                    };
                    let config = settings::read(&store)?;
                    records::fetch_partition(&store, partition, config.previous_run)?
                }
            };
            if csv {
                let rows: Vec<(String, String)> = data
                    .iter()
                    .map(|r| (r.kind.clone(), r.value.clone()))
                    .collect();
                emit_csv(&rows, &csv_args)?;
            } else {
                println!(
                    "{}",
                    time::command_envelope(
                        "records.list",
                        "ok",
                        serde_json::json!({ "count": data.len(), "records": data })
                    )
                );
            }
        }
        CliCommand::Settings => {
            let config = settings::read(&store)?;
            println!("{}", serde_json::to_string_pretty(&config).unwrap());
        }
        CliCommand::Extract {
            window,
            data_type,
            analysis_level,
            threat_level,
            csv_args,
        } => {
            // Validate before the fetch so a bad window never hits the feed.
            let _ = window.parse::<crate::core::lifespan::LifeSpan>()?;
            let feed = HttpFeed::from_store(&store)?;
            let hits = feed.fetch(&window, &data_type, analysis_level, threat_level)?;
            let rows: Vec<(String, String)> =
                hits.into_iter().map(|h| (h.kind, h.value)).collect();
            emit_csv(&rows, &csv_args)?;
        }
    }
    Ok(())
}
