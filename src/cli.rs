//! CLI argument parsing for the build-step runner.
//!
//! Each build step is one subcommand; the host CI system passes the build
//! coordinates through `BuildArgs` (or the matching environment variables).
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "edge-ci",
    version,
    about = "Run Toad Edge CLI build steps inside a CI workspace",
    after_help = "Examples:\n  edge-ci config set-libs /opt/toad-edge/toad-edge-cli.zip\n  edge-ci compare --src models/dev --tgt models/prod --output '${WORKSPACE}/diff'\n  edge-ci report --input diff --type jenkins --build-dir /var/ci/builds/42\n  edge-ci browse --build-dir /var/ci/builds/42 comparehtmlreport/index.html",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare a source model against a target and write an HTML diff
    Compare(CompareArgs),
    /// Create a baseline file from a model or connection
    Baseline(FileOutputArgs),
    /// Create a snapshot file from a model or connection
    Snapshot(FileOutputArgs),
    /// Deploy a SQL script to a target connection
    Deploy(DeployArgs),
    /// Generate a SQL change script
    ChangeScript(FileOutputArgs),
    /// Render an HTML report from comparison results
    Report(ReportArgs),
    /// Resolve a request path against a build's published report
    Browse(BrowseArgs),
    /// Show or edit the global configuration
    Config(ConfigArgs),
}

/// Where the step runs. Values fall back to `WORKSPACE`, `BUILD_NUMBER`
/// and `JOB_ROOT_DIR` from the environment.
#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Build workspace (default: $WORKSPACE, then the current directory)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Private per-build directory (default: $JOB_ROOT_DIR, then <workspace>/.edge-ci/builds/<n>)
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Build number used to name temporary files (default: $BUILD_NUMBER)
    #[arg(long, value_name = "N")]
    pub build_number: Option<u64>,

    /// Global configuration file (default: <config dir>/edge-ci/config.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Source model, connection or snapshot
    #[arg(long, value_name = "PATH")]
    pub src: String,

    /// Target model, connection or snapshot
    #[arg(long, value_name = "PATH")]
    pub tgt: String,

    /// Folder that receives the comparison results
    #[arg(long, value_name = "DIR")]
    pub output: String,

    /// Comparison settings file
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<String>,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(Args, Debug)]
pub struct FileOutputArgs {
    /// Input file or folder
    #[arg(long, value_name = "PATH")]
    pub input: String,

    /// File that receives the result
    #[arg(long, value_name = "FILE")]
    pub output: String,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// SQL script to deploy
    #[arg(long, value_name = "FILE")]
    pub input: String,

    /// Target connection file
    #[arg(long, value_name = "FILE")]
    pub target: String,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// Store the report with the build and expose it
    Jenkins,
    /// Copy the report into --output
    Standalone,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Folder with comparison results
    #[arg(long, value_name = "DIR")]
    pub input: String,

    #[arg(long = "type", value_enum, value_name = "TYPE")]
    pub report_type: ReportType,

    /// Output folder (standalone reports only)
    #[arg(long, value_name = "DIR", required_if_eq("report_type", "standalone"))]
    pub output: Option<String>,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Request path such as `comparehtmlreport/css/site.css`
    #[arg(value_name = "PATH", default_value = "")]
    pub request: String,

    #[command(flatten)]
    pub build: BuildArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,

    /// Global configuration file (default: <config dir>/edge-ci/config.json)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,
    /// Store the path to the zipped CLI libraries
    SetLibs {
        #[arg(value_name = "ZIP")]
        archive: String,
    },
    /// Store the Java home used when the build has no JAVA_HOME
    SetJavaHome {
        #[arg(value_name = "DIR")]
        home: PathBuf,
    },
}
