//! `edge-ci`: run Toad Edge CLI build steps from any CI host.
mod cli;
mod config;
mod context;
mod invoke;
mod paths;
mod report;
mod staging;
mod steps;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::{BuildArgs, Command, ConfigArgs, ConfigCommand, ReportArgs, ReportType, RootArgs};
use config::{default_config_path, load_config, validate_libs, write_config, GlobalConfig};
use context::{BuildContext, BuildLog};
use invoke::{Invoker, LocalLauncher};
use report::Served;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use steps::{
    BaselineStep, BuildStep, ChangeScriptStep, CompareStep, DeployScriptStep, ReportKind,
    ReportStep, SnapshotStep, StepRunner,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV_VAR: &str = "EDGE_CI_LOG";

fn main() -> ExitCode {
    init_tracing();
    let args = RootArgs::parse();
    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Dispatch one command; `Ok(false)` means the step ran and failed.
fn run(args: RootArgs) -> Result<bool> {
    match args.command {
        Command::Compare(args) => run_step(
            &args.build,
            &CompareStep {
                source: args.src,
                target: args.tgt,
                output_folder: args.output,
                config_file: args.config_file,
            },
        ),
        Command::Baseline(args) => run_step(
            &args.build,
            &BaselineStep {
                input: args.input,
                output_file: args.output,
            },
        ),
        Command::Snapshot(args) => run_step(
            &args.build,
            &SnapshotStep {
                input: args.input,
                output_file: args.output,
            },
        ),
        Command::Deploy(args) => run_step(
            &args.build,
            &DeployScriptStep {
                script: args.input,
                target: args.target,
            },
        ),
        Command::ChangeScript(args) => run_step(
            &args.build,
            &ChangeScriptStep {
                input_folder: args.input,
                output_file: args.output,
            },
        ),
        Command::Report(args) => run_report(args),
        Command::Browse(args) => {
            let build_dir = resolve_build_dir(&args.build)?;
            run_browse(&build_dir, &args.request)
        }
        Command::Config(args) => run_config(args),
    }
}

fn run_report(args: ReportArgs) -> Result<bool> {
    let kind = match args.report_type {
        ReportType::Jenkins => ReportKind::Jenkins,
        ReportType::Standalone => ReportKind::Standalone {
            output_folder: args.output.unwrap_or_default(),
        },
    };
    run_step(
        &args.build,
        &ReportStep {
            input_folder: args.input,
            kind,
        },
    )
}

fn run_step(build: &BuildArgs, step: &dyn BuildStep) -> Result<bool> {
    let config = load_global_config(build.config.as_deref())?;
    let ctx = build_context(build)?;
    let log = BuildLog::stdout();
    let runner = StepRunner::new(&ctx, Invoker::new(&config, LocalLauncher), &log);
    let outcome = runner.run(step)?;
    if let Some(report) = &outcome.report {
        log.line(format!("Report published to {}", report.report_dir.display()));
        tracing::debug!(record = %report.record_path.display(), "build record updated");
    }
    Ok(outcome.success())
}

fn build_context(args: &BuildArgs) -> Result<BuildContext> {
    let workspace = workspace_path(args)?;
    if !workspace.is_dir() {
        return Err(anyhow!("workspace {} does not exist", workspace.display()));
    }
    let number = build_number(args)?;
    let build_dir = resolve_build_dir(args)?;
    Ok(BuildContext::new(workspace, build_dir, number).with_process_env())
}

fn workspace_path(args: &BuildArgs) -> Result<PathBuf> {
    match args.workspace.clone().or_else(|| env_path("WORKSPACE")) {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("resolve current directory"),
    }
}

/// Explicit flag, then `JOB_ROOT_DIR`, then `<workspace>/.edge-ci/builds/<n>`.
fn resolve_build_dir(args: &BuildArgs) -> Result<PathBuf> {
    if let Some(dir) = args.build_dir.clone().or_else(|| env_path("JOB_ROOT_DIR")) {
        return Ok(dir);
    }
    Ok(workspace_path(args)?
        .join(".edge-ci")
        .join("builds")
        .join(build_number(args)?.to_string()))
}

fn build_number(args: &BuildArgs) -> Result<u64> {
    match args.build_number {
        Some(number) => Ok(number),
        None => build_number_from_env(),
    }
}

fn build_number_from_env() -> Result<u64> {
    let raw = std::env::var("BUILD_NUMBER")
        .map_err(|_| anyhow!("no build number (pass --build-number or set BUILD_NUMBER)"))?;
    raw.trim()
        .parse()
        .with_context(|| format!("parse BUILD_NUMBER {raw:?}"))
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

fn load_global_config(explicit: Option<&Path>) -> Result<GlobalConfig> {
    let path = config_path(explicit)?;
    Ok(load_config(&path)?.with_env_overrides())
}

fn run_browse(build_dir: &Path, request: &str) -> Result<bool> {
    let mut stdout = io::stdout().lock();
    match report::browse(build_dir, request)? {
        Served::File(path) => {
            let mut file =
                fs::File::open(&path).with_context(|| format!("open {}", path.display()))?;
            io::copy(&mut file, &mut stdout).context("write report file")?;
        }
        Served::Listing { dir, entries } => {
            tracing::debug!(dir = %dir.display(), count = entries.len(), "directory listing");
            for entry in entries {
                writeln!(stdout, "{entry}").context("write listing")?;
            }
        }
    }
    stdout.flush().context("flush stdout")?;
    Ok(true)
}

fn run_config(args: ConfigArgs) -> Result<bool> {
    let path = config_path(args.config.as_deref())?;
    match args.command {
        ConfigCommand::Show => {
            let config = load_config(&path)?.with_env_overrides();
            let text = serde_json::to_string_pretty(&config).context("serialize config")?;
            println!("{text}");
        }
        ConfigCommand::SetLibs { archive } => {
            let libs = validate_libs(&archive)?;
            let mut config = load_config(&path)?;
            config.libs = Some(libs);
            write_config(&path, &config)?;
            println!("libraries archive set in {}", path.display());
        }
        ConfigCommand::SetJavaHome { home } => {
            if !home.is_dir() {
                return Err(anyhow!("Java home {} is not a directory", home.display()));
            }
            let mut config = load_config(&path)?;
            config.java_home = Some(home);
            write_config(&path, &config)?;
            println!("java home set in {}", path.display());
        }
    }
    Ok(true)
}
