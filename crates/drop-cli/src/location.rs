//! Database location
//!
//! An explicit path wins. Otherwise the data directory is
//! `$XDG_DATA_HOME` (files named `drop.*`) or the home directory (files
//! named `.drop.*`), and the first file there with a known backend
//! extension is used. With no such file the default `<prefix>dbm` is
//! returned; the engine creates it on open.

use drop_core::{Error, Result};
use drop_storage::BackendRegistry;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File prefix inside `$XDG_DATA_HOME`
pub const XDG_PREFIX: &str = "drop.";
/// File prefix inside the home directory
pub const HOME_PREFIX: &str = ".drop.";
/// Extension of a newly created database
pub const DEFAULT_EXTENSION: &str = "dbm";

/// Inputs for finding the database file
#[derive(Debug, Clone, Default)]
pub struct Locator {
    /// `--file` / `DROP_DB`
    pub explicit: Option<PathBuf>,
    /// `$XDG_DATA_HOME`
    pub xdg_data_home: Option<PathBuf>,
    /// Home directory
    pub home: Option<PathBuf>,
}

impl Locator {
    /// Locator fed from the process environment
    pub fn from_env(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            xdg_data_home: non_empty(std::env::var_os("XDG_DATA_HOME")),
            home: dirs::home_dir(),
        }
    }

    /// Data directory and the file prefix used inside it
    pub fn data_dir(&self) -> Result<(&Path, &'static str)> {
        if let Some(dir) = &self.xdg_data_home {
            return Ok((dir.as_path(), XDG_PREFIX));
        }
        if let Some(dir) = &self.home {
            return Ok((dir.as_path(), HOME_PREFIX));
        }
        Err(Error::InvalidInput(
            "no data directory: set XDG_DATA_HOME or HOME".to_string(),
        ))
    }

    /// Resolves the database path
    pub fn locate(&self, registry: &BackendRegistry) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            debug!(path = %path.display(), "using explicit database path");
            return Ok(path.clone());
        }

        let (dir, prefix) = self.data_dir()?;
        let found = scan(dir, prefix, registry).map_err(|e| Error::OpenFailed {
            path: dir.to_path_buf(),
            reason: format!("could not scan directory: {}", e),
        })?;

        let path = match found {
            Some(name) => dir.join(name),
            None => dir.join(format!("{}{}", prefix, DEFAULT_EXTENSION)),
        };
        debug!(path = %path.display(), existing = path.exists(), "located database");
        Ok(path)
    }
}

fn non_empty(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// First (sorted) file in `dir` named `<prefix>...` with a known extension
fn scan(dir: &Path, prefix: &str, registry: &BackendRegistry) -> std::io::Result<Option<String>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            continue;
        };
        if !name.starts_with(prefix) || !entry.path().is_file() {
            continue;
        }
        let known = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| registry.is_registered_extension(ext));
        if known {
            candidates.push(name);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}
