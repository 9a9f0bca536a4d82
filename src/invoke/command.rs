//! Command-line assembly for the external CLI.
use super::InvocationArgs;
use crate::config::GlobalConfig;
use crate::context::BuildContext;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

/// Opens the JDK modules the tool reflects into, which keeps newer runtimes
/// from printing illegal-access warnings into the build log.
pub const MODULE_OPEN_FLAGS: &[&str] = &[
    "--add-opens=java.base/java.lang=ALL-UNNAMED",
    "--add-opens=java.base/java.lang.reflect=ALL-UNNAMED",
    "--add-opens=java.base/java.util=ALL-UNNAMED",
    "--add-opens=java.base/java.text=ALL-UNNAMED",
    "--add-opens=java.desktop/java.awt.font=ALL-UNNAMED",
];

/// Locate the `java` binary: build `JAVA_HOME`, configured home, then `PATH`.
pub fn resolve_java(ctx: &BuildContext, config: &GlobalConfig) -> Result<PathBuf> {
    if let Some(home) = ctx.env_var("JAVA_HOME") {
        return Ok(java_in_home(Path::new(home)));
    }
    if let Some(home) = config.java_home.as_deref() {
        return Ok(java_in_home(home));
    }
    which::which("java")
        .map_err(|err| anyhow!("no Java runtime found (set JAVA_HOME or java_home): {err}"))
}

fn java_in_home(home: &Path) -> PathBuf {
    home.join("bin").join("java")
}

/// Paths that frame every invocation.
#[derive(Debug, Clone)]
pub struct ToolLayout {
    pub java: PathBuf,
    pub jar: PathBuf,
    pub lib_dir: PathBuf,
    pub state_dir: PathBuf,
}

/// Full argv: runtime, module flags, jar, `-lib`, `-workspace`, step flags.
pub fn compose_command(layout: &ToolLayout, args: &InvocationArgs) -> Vec<String> {
    let mut argv = Vec::with_capacity(MODULE_OPEN_FLAGS.len() + 8);
    argv.push(layout.java.to_string_lossy().into_owned());
    argv.extend(MODULE_OPEN_FLAGS.iter().map(|flag| flag.to_string()));
    argv.push("-jar".to_string());
    argv.push(layout.jar.to_string_lossy().into_owned());
    argv.push("-lib".to_string());
    argv.push(layout.lib_dir.to_string_lossy().into_owned());
    argv.push("-workspace".to_string());
    argv.push(crate::paths::uri_path(&layout.state_dir));
    argv.extend(args.to_argv());
    argv
}

/// A command ready for a `Launcher`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCommand {
    /// Program plus arguments; the OS layer quotes each argument.
    Argv(Vec<String>),
    /// `<program> /C <line>` with `line` handed to the shell exactly as built.
    Shell { program: String, line: String },
}

impl ToolCommand {
    /// Flat view of the command: what the launcher records and logs.
    pub fn argv(&self) -> Vec<String> {
        match self {
            ToolCommand::Argv(argv) => argv.clone(),
            ToolCommand::Shell { program, line } => {
                vec![program.clone(), "/C".to_string(), line.clone()]
            }
        }
    }

    /// Render the command for the build log.
    pub fn display(&self) -> String {
        match self {
            ToolCommand::Argv(argv) => shell_words::join(argv),
            ToolCommand::Shell { program, line } => format!("{program} /C {line}"),
        }
    }
}

/// Wrap an argv for `cmd.exe` so the child's exit code survives.
pub fn to_windows_command(argv: &[String]) -> ToolCommand {
    ToolCommand::Shell {
        program: "cmd.exe".to_string(),
        line: windows_command_line(argv),
    }
}

/// The text after `cmd.exe /C`.
///
/// The whole command sits inside one pair of outer quotes, which `cmd.exe`
/// strips; arguments with characters it treats specially are quoted again,
/// with embedded quotes doubled.
pub fn windows_command_line(argv: &[String]) -> String {
    let mut line = String::from("\"");
    let quoted: Vec<String> = argv.iter().map(|arg| quote_windows_arg(arg)).collect();
    line.push_str(&quoted.join(" "));
    line.push_str(" && exit %%ERRORLEVEL%%\"");
    line
}

fn quote_windows_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    let needs_quotes = arg.chars().any(|ch| {
        matches!(
            ch,
            ' ' | '\t' | '*' | '?' | ',' | ';' | '^' | '&' | '<' | '>' | '|' | '"'
        )
    });
    if !needs_quotes {
        return arg.to_string();
    }
    format!("\"{}\"", arg.replace('"', "\"\""))
}
