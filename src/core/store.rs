//! Store handle for the indicator mirror workspace.

use crate::core::error;
use std::path::{Path, PathBuf};

/// A Store is the root directory holding the mirror database, the broker
/// audit log and the feed configuration. One store per feed mirror; all
/// subsystem state is scoped to it.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory
    pub root: PathBuf,
}

impl Store {
    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Resolve the store root: explicit directory if given, otherwise
    /// `$IOCSYNC_HOME`, otherwise `~/.iocsync`.
    pub fn resolve(dir: Option<PathBuf>) -> Result<Self, error::IocsyncError> {
        if let Some(d) = dir {
            return Ok(Self { root: d });
        }
        if let Ok(home) = std::env::var("IOCSYNC_HOME") {
            return Ok(Self {
                root: PathBuf::from(home),
            });
        }
        let home = std::env::var("HOME")?;
        Ok(Self {
            root: Path::new(&home).join(".iocsync"),
        })
    }
}
