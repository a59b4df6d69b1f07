//! Bash discovery and invocation helpers.
//!
//! The crate answers two questions for a host application: where does a
//! usable bash interpreter live, and how should a command line, script
//! file, or inline script body be handed to it. Lookup walks an ordered
//! set of install locations with a `BASH_PATH` override, and Windows
//! hosts get one extra wrinkle: when the resolved interpreter is the WSL
//! launcher's bash, script paths are remapped onto the `/mnt` tree.
//!
//! Process spawning, argument splitting, and stat calls stay with their
//! owners (`std::process`, `shell-words`, `std::fs`); this crate only
//! decides what to spawn and with which arguments.

pub mod invocation;
pub mod registry;
pub mod wsl;

pub use invocation::{
    BashCommand, CommandOutput, CommandStatus, command, file, new, output, run, script,
};
pub use registry::{Executable, OsFamily, find, find_or_default, register, which, which_or_default};
