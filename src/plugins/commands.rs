//! Command template registry: per-type shell templates scoped to a record
//! partition.

use crate::core::broker::DbBroker;
use crate::core::db;
use crate::core::error;
use crate::core::output;
use crate::core::store::Store;
use crate::core::time;
use crate::plugins::records::Partition;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Reserved template key fired once before the per-record phase.
pub const INITIAL_TYPE: &str = "initial";
/// Reserved template key fired once after the per-record phase.
pub const FINAL_TYPE: &str = "final";

/// The partition a template applies to. Scopes do not inherit: an `all`
/// template plays no part in a `new` or `old` dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    New,
    Old,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::New => "new",
            Scope::Old => "old",
        }
    }

    pub fn partition(self) -> Option<Partition> {
        match self {
            Scope::All => None,
            Scope::New => Some(Partition::New),
            Scope::Old => Some(Partition::Old),
        }
    }
}

impl FromStr for Scope {
    type Err = error::IocsyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Scope::All),
            "new" => Ok(Scope::New),
            "old" => Ok(Scope::Old),
            _ => Err(error::IocsyncError::InvalidScope(s.to_string())),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Register a template. Type and scope are stored lowercased; registering
/// the same type again shadows the earlier row at lookup time.
pub fn add(
    store: &Store,
    kind: &str,
    command: &str,
    scope: Scope,
) -> Result<(), error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "commands.add", |conn| {
        conn.execute(
            "INSERT INTO commands(type, command, scope) VALUES(?1, ?2, ?3)",
            rusqlite::params![kind.to_lowercase(), command, scope.as_str()],
        )?;
        Ok(())
    })
}

/// Templates registered for exactly `scope`, keyed by type. Insertion
/// order resolves duplicates: the last registered command per type wins.
pub fn get(store: &Store, scope: Scope) -> Result<HashMap<String, String>, error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "commands.get", |conn| {
        let mut stmt = conn
            .prepare("SELECT type, command FROM commands WHERE scope = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map([scope.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut commands = HashMap::new();
        for row in rows {
            let (kind, command) = row?;
            commands.insert(kind, command);
        }
        Ok(commands)
    })
}

/// Remove every registered template.
pub fn clear(store: &Store) -> Result<usize, error::IocsyncError> {
    let broker = DbBroker::new(&store.root);
    let db_path = db::mirror_db_path(&store.root);
    broker.with_conn(&db_path, "iocsync", "commands.clear", |conn| {
        let deleted = conn.execute("DELETE FROM commands", [])?;
        Ok(deleted)
    })
}

#[derive(Parser, Debug)]
#[clap(name = "command", about = "Manage command templates fired on dispatch.")]
pub struct CommandsCli {
    #[clap(subcommand)]
    pub command: CommandsCommand,
}

#[derive(Subcommand, Debug)]
pub enum CommandsCommand {
    /// Register a template for a record type (or 'initial'/'final').
    Add {
        /// Record type the template fires for, or 'initial'/'final'.
        #[clap(long = "type")]
        kind: String,
        /// Shell command; %hit%, %type%, time and %path% placeholders apply.
        #[clap(long)]
        command: String,
        /// Partition the template applies to: all, new or old.
        #[clap(long)]
        scope: String,
    },
    /// List registered templates for one scope.
    List {
        #[clap(long, default_value = "all")]
        scope: String,
    },
    /// Remove every registered template.
    Clear,
}

pub fn run_commands_cli(store: &Store, cli: CommandsCli) -> Result<(), error::IocsyncError> {
    match cli.command {
        CommandsCommand::Add {
            kind,
            command,
            scope,
        } => {
            let scope: Scope = scope.parse()?;
            add(store, &kind, &command, scope)?;
            println!(
                "{}",
                time::command_envelope(
                    "command.add",
                    "ok",
                    serde_json::json!({ "type": kind.to_lowercase(), "scope": scope.as_str() })
                )
            );
        }
        CommandsCommand::List { scope } => {
            let scope: Scope = scope.parse()?;
            let commands = get(store, scope)?;
            if commands.is_empty() {
                println!("No templates registered for scope '{}'.", scope);
            } else {
                let mut kinds: Vec<_> = commands.keys().collect();
                kinds.sort();
                for kind in kinds {
                    println!("{:<12} {}", kind, output::compact_line(&commands[kind], 80));
                }
            }
        }
        CommandsCommand::Clear => {
            let deleted = clear(store)?;
            println!(
                "{}",
                time::command_envelope(
                    "command.clear",
                    "ok",
                    serde_json::json!({ "deleted": deleted })
                )
            );
        }
    }
    Ok(())
}
