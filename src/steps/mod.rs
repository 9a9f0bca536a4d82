//! Build steps that drive the Toad Edge CLI.
//!
//! Each step only describes itself as a `StepPlan`: which inputs to stage
//! under which role and flag, where the tool writes, and where the result
//! goes afterwards. `StepRunner` executes every plan the same way: guard,
//! stage, invoke, collect, clean up.
mod baseline;
mod change_script;
mod compare;
mod deploy;
mod report;
mod snapshot;

pub use baseline::BaselineStep;
pub use change_script::ChangeScriptStep;
pub use compare::CompareStep;
pub use deploy::DeployScriptStep;
pub use report::{ReportKind, ReportStep};
pub use snapshot::SnapshotStep;

use crate::context::{BuildContext, BuildLog};
use crate::invoke::{InvocationArgs, Invoker, Launcher};
use crate::paths::{resolve_path, restrict_location, uri_path};
use crate::report::{publish_report, PublishedReport};
use crate::staging::{copy_dir_recursive, copy_file, ensure_dir, remove_artifact, stage_input};
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A step input copied into the workspace before the tool runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedInput {
    pub flag: &'static str,
    pub role: &'static str,
    /// Configured path, resolved against the build at run time.
    pub source: String,
}

/// Shape of what the tool writes at the temporary output location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Dir,
    File,
}

/// Where the temporary output ends up once the tool has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collect {
    /// Copy the output directory's contents into the configured folder.
    IntoDir(String),
    /// Copy the output file to the configured file path.
    ToFile(String),
    /// Store the report in the build directory and expose it on the build.
    BuildReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedOutput {
    pub flag: &'static str,
    pub role: &'static str,
    pub extension: Option<&'static str>,
    pub kind: OutputKind,
    pub collect: Collect,
}

/// Declarative description of one build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPlan {
    pub name: &'static str,
    /// Literal action flag such as `-compare`.
    pub action: &'static str,
    pub inputs: Vec<StagedInput>,
    pub output: Option<StagedOutput>,
    /// Additional flag/value pairs emitted after the action flag.
    pub extra_args: Vec<(&'static str, String)>,
}

/// A configured build step.
pub trait BuildStep {
    /// Check required fields before anything touches the filesystem.
    fn validate(&self) -> Result<()>;
    fn plan(&self) -> StepPlan;
}

/// Result of running one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub exit_code: i32,
    pub report: Option<PublishedReport>,
}

impl StepOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

pub(crate) fn require_field(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{label} must not be empty"));
    }
    Ok(())
}

/// Executes step plans inside one build.
pub struct StepRunner<'a, L: Launcher> {
    ctx: &'a BuildContext,
    invoker: Invoker<'a, L>,
    log: &'a BuildLog,
}

impl<'a, L: Launcher> StepRunner<'a, L> {
    pub fn new(ctx: &'a BuildContext, invoker: Invoker<'a, L>, log: &'a BuildLog) -> Self {
        Self { ctx, invoker, log }
    }

    pub fn run(&self, step: &dyn BuildStep) -> Result<StepOutcome> {
        step.validate()?;
        let plan = step.plan();
        tracing::info!(step = plan.name, build = self.ctx.number, "running build step");

        // Every configured input is checked before the first copy.
        let mut sources = Vec::with_capacity(plan.inputs.len());
        for input in &plan.inputs {
            let source = restrict_location(self.ctx, &input.source)?;
            if !source.exists() {
                return Err(anyhow!("input {} does not exist", source.display()));
            }
            let temp = self.temp_input_path(input.role, &source);
            sources.push((input, source, temp));
        }
        self.invoker.check_ready(self.ctx)?;

        let mut staged: Vec<PathBuf> = Vec::new();
        let result = self.stage_and_invoke(&plan, &sources, &mut staged);
        let (exit_code, report) = match result {
            Ok(done) => done,
            Err(err) => {
                // The invocation error wins; cleanup failures are only logged.
                let _ = self.cleanup(&staged);
                return Err(err);
            }
        };
        self.cleanup(&staged)?;

        if exit_code == 0 {
            tracing::info!(step = plan.name, "build step succeeded");
        } else {
            tracing::warn!(step = plan.name, exit_code, "build step failed");
            self.log.line(format!("{} failed with exit code {exit_code}", plan.name));
        }
        Ok(StepOutcome { exit_code, report })
    }

    fn stage_and_invoke(
        &self,
        plan: &StepPlan,
        sources: &[(&StagedInput, PathBuf, PathBuf)],
        staged: &mut Vec<PathBuf>,
    ) -> Result<(i32, Option<PublishedReport>)> {
        let mut args = InvocationArgs::new();
        for (input, source, temp) in sources {
            staged.push(temp.clone());
            stage_input(source, temp, self.log)?;
            args.insert(input.flag, uri_path(temp));
        }

        let output_temp = match &plan.output {
            Some(output) => {
                let temp = self.ctx.temp_path(output.role, output.extension);
                staged.push(temp.clone());
                match output.kind {
                    OutputKind::Dir => ensure_dir(&temp, self.log)?,
                    OutputKind::File => ensure_dir(&self.ctx.workspace, self.log)?,
                }
                args.insert(output.flag, uri_path(&temp));
                Some((output, temp))
            }
            None => None,
        };

        args.insert_flag(plan.action);
        for (flag, value) in &plan.extra_args {
            args.insert(*flag, value.clone());
        }

        let exit_code = self.invoker.invoke(self.ctx, &args, self.log)?;

        let mut report = None;
        if let Some((output, temp)) = output_temp {
            report = self.collect(output, &temp, exit_code == 0)?;
        }
        Ok((exit_code, report))
    }

    fn collect(
        &self,
        output: &StagedOutput,
        temp: &Path,
        succeeded: bool,
    ) -> Result<Option<PublishedReport>> {
        if !temp.exists() {
            if succeeded {
                return Err(anyhow!(
                    "tool reported success but wrote nothing to {}",
                    temp.display()
                ));
            }
            self.log.line(format!("No output produced at {}", temp.display()));
            return Ok(None);
        }
        match &output.collect {
            Collect::IntoDir(raw) => {
                let dest = resolve_path(self.ctx, raw);
                fs::create_dir_all(&dest).with_context(|| format!("create {}", dest.display()))?;
                self.log.copying(temp, &dest);
                copy_dir_recursive(temp, &dest)?;
                self.log.copying_finished();
                Ok(None)
            }
            Collect::ToFile(raw) => {
                let dest = resolve_path(self.ctx, raw);
                self.log.copying(temp, &dest);
                copy_file(temp, &dest)?;
                self.log.copying_finished();
                Ok(None)
            }
            Collect::BuildReport if succeeded => {
                publish_report(self.ctx, temp, self.log).map(Some)
            }
            Collect::BuildReport => Ok(None),
        }
    }

    fn temp_input_path(&self, role: &str, source: &Path) -> PathBuf {
        if source.is_dir() {
            return self.ctx.temp_path(role, None);
        }
        let extension = source.extension().and_then(|ext| ext.to_str());
        self.ctx.temp_path(role, extension)
    }

    /// Delete every temporary artifact, reporting the first failure.
    fn cleanup(&self, staged: &[PathBuf]) -> Result<()> {
        let mut first_err = None;
        for path in staged {
            if let Err(err) = remove_artifact(path, self.log) {
                tracing::warn!(path = %path.display(), error = %err, "temp cleanup failed");
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "steps_tests.rs"]
mod tests;
