//! Bash invocation builders.
//!
//! Builders resolve the interpreter through the registry, format an
//! argument list, and hand back a [`BashCommand`] descriptor. Nothing is
//! validated up front; a bad script path or a missing interpreter only
//! surfaces when the process is spawned.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::debug;

use crate::registry;
use crate::wsl;

/// Flags for reproducible non-interactive runs: skip profile and rc
/// files, exit on first error, fail pipelines on any stage.
const STRICT_FLAGS: [&str; 5] = ["-noprofile", "--norc", "-e", "-o", "pipefail"];

/// Exit status of a finished invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandStatus {
    success: bool,
    code: Option<i32>,
}

impl CommandStatus {
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<std::process::ExitStatus> for CommandStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// What a finished invocation produced. A non-zero exit is reported here,
/// not as an error. `stdout`/`stderr` stay empty for [`BashCommand::run`],
/// which leaves the streams attached to the parent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommandOutput {
    pub status: CommandStatus,
    pub stdout: String,
    pub stderr: String,
}

/// A ready-to-spawn bash invocation: resolved program plus argument list,
/// with an optional working directory and extra environment variables.
#[derive(Debug, Clone)]
pub struct BashCommand {
    program: PathBuf,
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl BashCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            current_dir: None,
            envs: Vec::new(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Spawn with stdin, stdout, and stderr inherited from the parent and
    /// wait for exit. The output text in the result is empty.
    pub fn run(self) -> Result<CommandOutput> {
        let status = self
            .build()
            .status()
            .with_context(|| format!("failed to run `{}`", self.program.display()))?;

        Ok(CommandOutput {
            status: CommandStatus::from(status),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    /// Spawn with stdout and stderr piped, wait for exit, and capture
    /// both streams.
    pub fn output(self) -> Result<CommandOutput> {
        let output = self
            .build()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run `{}`", self.program.display()))?;

        Ok(CommandOutput {
            status: CommandStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn build(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }
}

/// Bash invocation with the arguments passed through verbatim.
pub fn new<I, S>(args: I) -> BashCommand
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    BashCommand::new(
        registry::which_or_default(),
        args.into_iter().map(Into::into).collect(),
    )
}

/// Bash invocation from a single shell-style string. Quoting rules,
/// including the unbalanced-quote error, belong to the splitter.
pub fn command(line: &str) -> Result<BashCommand> {
    let args = shell_words::split(line)
        .with_context(|| format!("failed to split command line `{line}`"))?;
    Ok(BashCommand::new(registry::which_or_default(), args))
}

/// Strict-mode invocation of a script file.
///
/// When WSL is installed and the resolved interpreter is the System32
/// bash, an absolute drive-letter path is remapped onto the `/mnt` tree
/// before being appended.
pub fn file(path: impl Into<String>) -> BashCommand {
    let program = registry::which_or_default();
    let args = file_args(&program, wsl::installed(), path.into());
    BashCommand::new(program, args)
}

/// Strict-mode invocation of an inline script, or of a script file when
/// the text is a single line ending in `.sh`.
pub fn script(text: impl Into<String>) -> BashCommand {
    let mut text = text.into();
    if !text.contains('\n') {
        text = text.trim().to_string();
        if text.ends_with(".sh") {
            return file(text);
        }
    }

    let mut args = strict_args();
    args.push("-c".to_string());
    args.push(text);
    BashCommand::new(registry::which_or_default(), args)
}

/// Build via [`script`] and run with inherited streams.
pub fn run(text: impl Into<String>) -> Result<CommandOutput> {
    script(text).run()
}

/// Build via [`script`] and run with both streams captured.
pub fn output(text: impl Into<String>) -> Result<CommandOutput> {
    script(text).output()
}

fn strict_args() -> Vec<String> {
    STRICT_FLAGS.iter().map(|flag| (*flag).to_string()).collect()
}

fn file_args(program: &Path, wsl_active: bool, file: String) -> Vec<String> {
    let mut args = strict_args();

    let file = if wsl_active && is_system32_bash(program) {
        let absolute = if has_drive_prefix(&file) {
            file
        } else {
            // Best effort; an unresolvable path is passed through as-is.
            std::path::absolute(&file)
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or(file)
        };
        let mapped = wsl::mount_path(&absolute);
        debug!(from = %absolute, to = %mapped, "remapped script path for WSL");
        mapped
    } else {
        file
    };

    args.push(file);
    args
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn is_system32_bash(program: &Path) -> bool {
    program
        .to_string_lossy()
        .to_ascii_lowercase()
        .ends_with(r"system32\bash.exe")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn script_builds_an_inline_invocation() {
        let invocation = script("echo hi");
        assert_eq!(
            invocation.args(),
            ["-noprofile", "--norc", "-e", "-o", "pipefail", "-c", "echo hi"]
        );
    }

    #[test]
    fn script_delegates_single_line_sh_paths_to_file() {
        assert_eq!(script("foo.sh").args(), file("foo.sh").args());
    }

    #[test]
    fn script_trims_before_the_extension_check() {
        assert_eq!(script("  foo.sh  ").args(), file("foo.sh").args());
    }

    #[test]
    fn script_keeps_multi_line_text_inline() {
        let text = "apt install -y age \\\n  curl \\\n  zip";
        let invocation = script(text);
        assert_eq!(invocation.args().last().map(String::as_str), Some(text));
        assert!(invocation.args().contains(&"-c".to_string()));
    }

    #[test]
    fn multi_line_text_ending_in_sh_stays_inline() {
        let invocation = script("echo one\nsetup.sh");
        assert!(invocation.args().contains(&"-c".to_string()));
    }

    #[test]
    fn new_passes_arguments_through_verbatim() {
        let invocation = new(["--norc", "-c", "echo hi"]);
        assert_eq!(invocation.args(), ["--norc", "-c", "echo hi"]);
    }

    #[test]
    fn command_splits_with_shell_quoting() {
        let invocation = command("echo 'a b' c").unwrap();
        assert_eq!(invocation.args(), ["echo", "a b", "c"]);
    }

    #[test]
    fn command_surfaces_unbalanced_quotes() {
        assert!(command("echo 'oops").is_err());
    }

    #[test]
    fn file_args_remap_under_system32_bash() {
        let exe = Path::new(r"C:\Windows\System32\bash.exe");
        let args = file_args(exe, true, r"C:\Users\me\script.sh".to_string());
        assert_eq!(
            args.last().map(String::as_str),
            Some("/mnt/c/Users/me/script.sh")
        );
    }

    #[test]
    fn file_args_match_the_interpreter_case_insensitively() {
        let exe = Path::new(r"c:\windows\SYSTEM32\BASH.EXE");
        let args = file_args(exe, true, r"D:\work\build.sh".to_string());
        assert_eq!(args.last().map(String::as_str), Some("/mnt/d/work/build.sh"));
    }

    #[test]
    fn file_args_stay_untranslated_without_wsl() {
        let exe = Path::new(r"C:\Windows\System32\bash.exe");
        let args = file_args(exe, false, r"C:\Users\me\script.sh".to_string());
        assert_eq!(
            args.last().map(String::as_str),
            Some(r"C:\Users\me\script.sh")
        );
    }

    #[test]
    fn file_args_stay_untranslated_for_other_interpreters() {
        let exe = Path::new(r"C:\Program Files\Git\bin\bash.exe");
        let args = file_args(exe, true, r"C:\Users\me\script.sh".to_string());
        assert_eq!(
            args.last().map(String::as_str),
            Some(r"C:\Users\me\script.sh")
        );
    }

    #[test]
    fn file_args_keep_the_strict_flag_order() {
        let args = file_args(Path::new("/usr/bin/bash"), false, "deploy.sh".to_string());
        assert_eq!(
            args,
            ["-noprofile", "--norc", "-e", "-o", "pipefail", "deploy.sh"]
        );
    }

    #[test]
    fn builder_records_cwd_and_env() {
        let invocation = script("pwd")
            .with_current_dir("/tmp")
            .with_env("MARKER", "1");
        assert_eq!(invocation.program(), registry::which_or_default());
        assert_eq!(invocation.current_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(
            invocation.envs,
            vec![("MARKER".to_string(), "1".to_string())]
        );
    }
}
