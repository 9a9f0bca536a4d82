//! Running the Toad Edge CLI for one build step.
//!
//! Every invocation unpacks the configured library archive into the
//! workspace, runs the jar found there, and removes the unpacked copy again
//! no matter how the process ended.
mod archive;
mod command;
mod launcher;

pub use archive::{find_cli_jar, unpack_archive};
pub use command::{compose_command, resolve_java, to_windows_command, ToolCommand, ToolLayout};
pub use launcher::{Launcher, LocalLauncher};

use crate::config::GlobalConfig;
use crate::context::{BuildContext, BuildLog};
use crate::staging::remove_artifact;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Workspace directory the archive is unpacked into (suffixed with the build number).
pub const CLI_DIR_ROLE: &str = "cli-dir";
/// Workspace directory the tool keeps its internal state in.
pub const TOOL_STATE_DIR: &str = "workspace";

/// Flag/value pairs for one invocation, in insertion order.
///
/// Re-inserting a flag replaces its value in place. An empty value emits
/// the flag alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs {
    entries: Vec<(String, String)>,
}

impl InvocationArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, flag: impl Into<String>, value: impl Into<String>) {
        let flag = flag.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == flag) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((flag, value)),
        }
    }

    pub fn insert_flag(&mut self, flag: impl Into<String>) {
        self.insert(flag, String::new());
    }

    pub fn to_argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.entries.len() * 2);
        for (flag, value) in &self.entries {
            argv.push(flag.clone());
            if !value.is_empty() {
                argv.push(value.clone());
            }
        }
        argv
    }
}

/// Runs the CLI through a `Launcher` using the global configuration.
pub struct Invoker<'a, L: Launcher> {
    config: &'a GlobalConfig,
    launcher: L,
}

impl<'a, L: Launcher> Invoker<'a, L> {
    pub fn new(config: &'a GlobalConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    /// Fail fast on configuration problems, before a step stages anything.
    pub fn check_ready(&self, ctx: &BuildContext) -> Result<()> {
        self.config.require_libs()?;
        resolve_java(ctx, self.config)?;
        Ok(())
    }

    /// Execute the tool and return its exit code.
    ///
    /// Configuration problems surface before anything is written to the
    /// workspace; a missing jar surfaces before launch.
    pub fn invoke(
        &self,
        ctx: &BuildContext,
        args: &InvocationArgs,
        log: &BuildLog,
    ) -> Result<i32> {
        let archive = self.config.require_libs()?;
        let java = resolve_java(ctx, self.config)?;
        let cli_dir = self.cli_dir(ctx);

        let result = unpack_archive(archive, &cli_dir)
            .and_then(|()| find_cli_jar(&cli_dir))
            .and_then(|jar| {
                let layout = ToolLayout {
                    java,
                    jar,
                    lib_dir: cli_dir.join("lib"),
                    state_dir: ensure_state_dir(ctx)?,
                };
                self.run(ctx, &layout, args, log)
            });

        let cleanup = remove_artifact(&cli_dir, log);
        let code = result?;
        cleanup?;
        Ok(code)
    }

    fn run(
        &self,
        ctx: &BuildContext,
        layout: &ToolLayout,
        args: &InvocationArgs,
        log: &BuildLog,
    ) -> Result<i32> {
        let argv = compose_command(layout, args);
        let command = if ctx.platform.is_unix() {
            ToolCommand::Argv(argv)
        } else {
            to_windows_command(&argv)
        };
        log.line(format!("$ {}", command.display()));
        tracing::debug!(cwd = %ctx.workspace.display(), "launching tool");
        self.launcher.launch(&command, &ctx.workspace, log)
    }

    fn cli_dir(&self, ctx: &BuildContext) -> PathBuf {
        ctx.temp_path(CLI_DIR_ROLE, None)
    }
}

fn ensure_state_dir(ctx: &BuildContext) -> Result<PathBuf> {
    let dir = ctx.workspace.join(TOOL_STATE_DIR);
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
#[path = "invoke_tests.rs"]
mod tests;
