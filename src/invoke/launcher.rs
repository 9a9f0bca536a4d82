use super::ToolCommand;
use crate::context::BuildLog;
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Instant;

/// Starts the external tool and reports its exit code.
///
/// The seam exists so hosts can run the tool somewhere other than the
/// local machine, and so tests can stand in for the JVM.
pub trait Launcher {
    fn launch(&self, command: &ToolCommand, cwd: &Path, log: &BuildLog) -> Result<i32>;
}

/// Runs the tool as a child of this process, blocking until it exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLauncher;

impl Launcher for LocalLauncher {
    fn launch(&self, command: &ToolCommand, cwd: &Path, log: &BuildLog) -> Result<i32> {
        let (mut process, program) = build_process(command)?;
        let start = Instant::now();
        let mut child = process
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn {program}"))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        thread::scope(|scope| {
            if let Some(stdout) = stdout {
                scope.spawn(|| pump_stream(log, "stdout", stdout));
            }
            if let Some(stderr) = stderr {
                scope.spawn(|| pump_stream(log, "stderr", stderr));
            }
        });
        let status = child.wait().with_context(|| format!("wait for {program}"))?;
        let elapsed_ms = start.elapsed().as_millis();

        let code = match status.code() {
            Some(code) => code,
            None => {
                log.line(format!("{program} terminated by signal"));
                -1
            }
        };
        tracing::info!(elapsed_ms, exit_code = code, "tool invocation complete");
        Ok(code)
    }
}

fn build_process(command: &ToolCommand) -> Result<(Command, &str)> {
    match command {
        ToolCommand::Argv(argv) => {
            let (program, rest) = argv
                .split_first()
                .ok_or_else(|| anyhow!("empty command line"))?;
            let mut process = Command::new(program);
            process.args(rest);
            Ok((process, program.as_str()))
        }
        ToolCommand::Shell { program, line } => {
            let mut process = Command::new(program);
            process.arg("/C");
            push_raw_arg(&mut process, line);
            Ok((process, program.as_str()))
        }
    }
}

/// `cmd.exe` does its own quote parsing, so the line must not be re-escaped.
#[cfg(windows)]
fn push_raw_arg(process: &mut Command, line: &str) {
    use std::os::windows::process::CommandExt;
    process.raw_arg(line);
}

#[cfg(not(windows))]
fn push_raw_arg(process: &mut Command, line: &str) {
    process.arg(line);
}

/// Copy one child stream into the build log, noting a read failure there.
fn pump_stream<R: Read>(log: &BuildLog, stream: &str, reader: R) {
    if let Err(err) = log.pump(reader) {
        tracing::warn!(stream, error = %err, "reading tool output failed");
        log.line(format!("Tool {stream} could not be read: {err}"));
    }
}
