//! Executable registration and lookup.
//!
//! A process-wide table maps a logical tool name to the environment
//! variable that overrides its location and to ordered per-OS candidate
//! path lists. Resolution walks that policy against the live environment
//! and filesystem on every call; nothing is cached, so the answer tracks
//! external state without any invalidation logic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::{Captures, Regex};
use tracing::{debug, trace};

/// OS family used to pick a candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Unix,
    Windows,
}

impl OsFamily {
    /// Family of the running host.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }
}

/// Resolution policy for one logical executable.
///
/// Candidate entries may embed `${Name}` environment placeholders that
/// are expanded at lookup time. A candidate referencing an unset variable
/// is dropped from the search instead of matching a mangled path.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Executable {
    /// Logical name, which doubles as the PATH-lookup fallback.
    pub name: String,
    /// Environment variable that short-circuits the search.
    pub variable: String,
    /// Candidate locations on Windows hosts, most specific first.
    pub windows: Vec<String>,
    /// Candidate locations on Unix hosts.
    pub unix: Vec<String>,
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

static REGISTRY: LazyLock<RwLock<HashMap<String, Executable>>> = LazyLock::new(|| {
    let mut table = HashMap::new();
    let bash = Executable {
        name: "bash".to_string(),
        variable: "BASH_PATH".to_string(),
        windows: vec![
            r"${ProgramFiles}\Git\bin\bash.exe".to_string(),
            r"${ProgramFiles}\Git\usr\bin\bash.exe".to_string(),
            r"${ProgramFiles(x86)}\Git\bin\bash.exe".to_string(),
            r"${ProgramFiles(x86)}\Git\usr\bin\bash.exe".to_string(),
            r"${SystemRoot}\System32\bash.exe".to_string(),
        ],
        unix: vec!["/bin/bash".to_string(), "/usr/bin/bash".to_string()],
    };
    table.insert(bash.name.clone(), bash);
    RwLock::new(table)
});

/// Insert or replace a resolution policy under its logical name.
pub fn register(executable: Executable) {
    let mut table = REGISTRY.write();
    table.insert(executable.name.clone(), executable);
}

/// Resolve a registered executable against the current environment and
/// filesystem. Returns `None` when the name is unregistered or no
/// candidate matches.
pub fn find(name: &str) -> Option<PathBuf> {
    find_for(name, OsFamily::current())
}

/// Resolve like [`find`], falling back to the bare logical name so the
/// spawn layer can still attempt its own PATH lookup.
pub fn find_or_default(name: &str) -> PathBuf {
    find(name).unwrap_or_else(|| PathBuf::from(name))
}

/// Path to the bash executable, if the `BASH_PATH` override or one of the
/// registered install locations matches.
pub fn which() -> Option<PathBuf> {
    find("bash")
}

/// Path to the bash executable, or the bare name `bash` when nothing
/// matched.
pub fn which_or_default() -> PathBuf {
    find_or_default("bash")
}

fn find_for(name: &str, family: OsFamily) -> Option<PathBuf> {
    let table = REGISTRY.read();
    let executable = table.get(name)?;

    if let Ok(value) = std::env::var(&executable.variable) {
        let value = value.trim();
        if !value.is_empty() && is_executable(Path::new(value)) {
            debug!(name, path = value, "resolved via override variable");
            return Some(PathBuf::from(value));
        }
        trace!(
            name,
            variable = %executable.variable,
            "override set but does not name an executable file"
        );
    }

    let candidates = match family {
        OsFamily::Windows => &executable.windows,
        OsFamily::Unix => &executable.unix,
    };

    for candidate in candidates {
        let Some(expanded) = expand(candidate) else {
            trace!(name, candidate = %candidate, "skipped candidate with unset placeholder");
            continue;
        };
        if is_executable(Path::new(&expanded)) {
            debug!(name, path = %expanded, "resolved via candidate list");
            return Some(PathBuf::from(expanded));
        }
    }

    debug!(name, "no candidate matched");
    None
}

/// Expand `${Name}` placeholders from the environment. `None` when any
/// referenced variable is unset.
fn expand(candidate: &str) -> Option<String> {
    let mut missing = false;
    let expanded = PLACEHOLDER.replace_all(candidate, |caps: &Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| {
            missing = true;
            String::new()
        })
    });

    if missing {
        None
    } else {
        Some(expanded.into_owned())
    }
}

fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.is_file() && (metadata.permissions().mode() & 0o111 != 0)
    }

    #[cfg(not(unix))]
    {
        metadata.is_file()
    }
}
