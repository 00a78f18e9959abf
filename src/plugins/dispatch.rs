//! One dispatch cycle: resolve a record partition, substitute templates,
//! fire detached shell commands.
//!
//! Substituted record values come straight from the remote feed and reach
//! the shell unescaped. Command templates must be treated as trusted
//! input and the feed as hostile: a value like `x; rm -rf ~` runs as
//! written. This is a known injection risk, documented here rather than
//! silently mitigated.

use crate::core::error;
use crate::core::store::Store;
use crate::plugins::commands::{self, FINAL_TYPE, INITIAL_TYPE, Scope};
use crate::plugins::records;
use crate::plugins::settings;
use chrono::{DateTime, Datelike, Local, Timelike};
use serde::Serialize;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Mutex;

/// Everything a template may reference besides the record itself.
pub struct TemplateContext<'a> {
    pub base_path: &'a Path,
    pub now: DateTime<Local>,
}

fn replace_token(text: &str, token: &str, replacement: &str) -> String {
    debug_assert!(token.is_ascii());
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if i + token.len() <= text.len()
            && text.is_char_boundary(i + token.len())
            && text[i..i + token.len()].eq_ignore_ascii_case(token)
        {
            out.push_str(replacement);
            i += token.len();
        } else {
            let ch = text[i..].chars().next().unwrap();
            out.push(ch);
            i += ch.len_utf8();
        }
    }
    out
}

/// Ordered token-map substitution pass. Tokens are replaced literally and
/// case-insensitively, every occurrence, independent of surrounding
/// syntax; text matching no token is left unchanged. The record tokens
/// only apply when an entry is supplied, so `initial`/`final` hooks keep
/// `%hit%`/`%type%` verbatim.
pub fn substitute(template: &str, entry: Option<(&str, &str)>, ctx: &TemplateContext) -> String {
    let mut tokens: Vec<(&str, String)> = Vec::with_capacity(9);
    if let Some((value, kind)) = entry {
        tokens.push(("%hit%", value.to_string()));
        tokens.push(("%type%", kind.to_string()));
    }
    tokens.push(("%day%", format!("{:02}", ctx.now.day())));
    tokens.push(("%month%", format!("{:02}", ctx.now.month())));
    tokens.push(("%year%", format!("{:04}", ctx.now.year())));
    tokens.push(("%hour%", format!("{:02}", ctx.now.hour())));
    tokens.push(("%minute%", format!("{:02}", ctx.now.minute())));
    tokens.push(("%second%", format!("{:02}", ctx.now.second())));
    tokens.push(("%path%", ctx.base_path.to_string_lossy().to_string()));

    let mut command = template.to_string();
    for (token, replacement) in &tokens {
        command = replace_token(&command, token, replacement);
    }
    command
}

/// How a dispatch cycle hands a substituted command to the outside world.
pub trait CommandLauncher {
    fn launch(&self, command: &str) -> Result<(), error::IocsyncError>;
}

/// Fire-and-forget shell launch: spawn through `sh -c`, drop the child.
/// Nothing waits on it, captures its status or cancels it.
pub struct ShellLauncher;

impl CommandLauncher for ShellLauncher {
    fn launch(&self, command: &str) -> Result<(), error::IocsyncError> {
        Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(error::IocsyncError::IoError)?;
        Ok(())
    }
}

/// Opt-in launcher that keeps the spawned children so a caller can join
/// them. Default dispatch semantics stay fire-and-forget; this exists for
/// callers that explicitly want completion (`dispatch --wait`).
pub struct CollectingLauncher {
    children: Mutex<Vec<Child>>,
}

impl CollectingLauncher {
    pub fn new() -> Self {
        Self {
            children: Mutex::new(Vec::new()),
        }
    }

    /// Wait for every launched command and collect the exit statuses.
    pub fn wait_all(&self) -> Result<Vec<ExitStatus>, error::IocsyncError> {
        let mut children = self.children.lock().unwrap();
        let mut statuses = Vec::with_capacity(children.len());
        for mut child in children.drain(..) {
            statuses.push(child.wait().map_err(error::IocsyncError::IoError)?);
        }
        Ok(statuses)
    }
}

impl Default for CollectingLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLauncher for CollectingLauncher {
    fn launch(&self, command: &str) -> Result<(), error::IocsyncError> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(error::IocsyncError::IoError)?;
        self.children.lock().unwrap().push(child);
        Ok(())
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct DispatchReport {
    pub scope: String,
    pub records: usize,
    pub launched: usize,
}

/// Run one dispatch cycle. Phase order is a strict contract: the
/// `initial` hook is launched before any per-record command, and `final`
/// is launched only after every per-record command has been. Per-record
/// launches themselves are unordered relative to each other once running.
pub fn dispatch(
    store: &Store,
    scope: Scope,
    launcher: &dyn CommandLauncher,
) -> Result<DispatchReport, error::IocsyncError> {
    let data = match scope.partition() {
        None => records::fetch_all(store)?,
        Some(partition) => {
            let config = settings::read(store)?;
            records::fetch_partition(store, partition, config.previous_run)?
        }
    };
    let templates = commands::get(store, scope)?;
    let ctx = TemplateContext {
        base_path: &store.root,
        now: Local::now(),
    };

    let mut launched = 0usize;
    if let Some(template) = templates.get(INITIAL_TYPE) {
        launcher.launch(&substitute(template, None, &ctx))?;
        launched += 1;
    }
    for record in &data {
        if let Some(template) = templates.get(record.kind.as_str()) {
            let command = substitute(template, Some((&record.value, &record.kind)), &ctx);
            launcher.launch(&command)?;
            launched += 1;
        }
    }
    if let Some(template) = templates.get(FINAL_TYPE) {
        launcher.launch(&substitute(template, None, &ctx))?;
        launched += 1;
    }

    Ok(DispatchReport {
        scope: scope.as_str().to_string(),
        records: data.len(),
        launched,
    })
}
