//! Windows Subsystem for Linux detection and path mapping.
//!
//! The install probe runs once, the first time the flag is read, and the
//! result is a snapshot: later environment or filesystem drift is ignored
//! for the rest of the process lifetime.

use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::registry::OsFamily;

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Whether the WSL launcher is present on this host. Always `false` on
/// non-Windows hosts.
pub fn installed() -> bool {
    *INSTALLED.get_or_init(|| detect(OsFamily::current()))
}

fn detect(family: OsFamily) -> bool {
    if family != OsFamily::Windows {
        return false;
    }

    let root = std::env::var("SystemRoot").unwrap_or_else(|_| r"C:\Windows".to_string());
    let found = probe(Path::new(&root));
    debug!(root = %root, found, "probed for the WSL launcher");
    found
}

/// True when `<root>/System32/wsl.exe` exists and is not a directory.
/// Stat failures of any kind read as absence.
fn probe(root: &Path) -> bool {
    let launcher = root.join("System32").join("wsl.exe");
    match std::fs::metadata(&launcher) {
        Ok(metadata) => !metadata.is_dir(),
        Err(_) => false,
    }
}

/// Map an absolute drive-letter path (`C:\Users\me`) onto the WSL mount
/// tree (`/mnt/c/Users/me`).
///
/// Only the conventional two-character `X:` prefix is handled; relative
/// and UNC paths are undefined input and come back mangled.
pub fn mount_path(path: &str) -> String {
    let Some(drive) = path.chars().next() else {
        return String::new();
    };
    let rest = path.get(2..).unwrap_or_default();
    format!(
        "/mnt/{}{}",
        drive.to_ascii_lowercase(),
        rest.replace('\\', "/")
    )
}
