//! Shared test infrastructure for integration tests.
//!
//! Every test gets its own workspace, build directory and config file, plus
//! a fake `java` that behaves like the CLI: it writes to its `-out` location
//! according to `FAKE_TOOL_MODE` and exits with `FAKE_TOOL_EXIT`.

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const BUILD_NUMBER: &str = "5";

const FAKE_JAVA: &str = r#"#!/bin/sh
out=""
prev=""
for arg in "$@"; do
  if [ "$prev" = "-out" ]; then out="$arg"; fi
  prev="$arg"
done
echo "fake toad edge: $*"
echo "diagnostic on stderr" >&2
case "$FAKE_TOOL_MODE" in
  dir) mkdir -p "$out" && echo "<html>report</html>" > "$out/index.html" ;;
  file) echo "tool output" > "$out" ;;
esac
exit "${FAKE_TOOL_EXIT:-0}"
"#;

/// Scratch build environment driven through the real binary.
pub struct BuildFixture {
    _temp: TempDir,
    pub workspace: PathBuf,
    pub build_dir: PathBuf,
    pub java_home: PathBuf,
    pub libs: PathBuf,
    pub config: PathBuf,
}

impl BuildFixture {
    pub fn setup() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path().to_path_buf();
        let workspace = root.join("ws");
        fs::create_dir_all(workspace.join("models/dev")).unwrap();
        fs::write(workspace.join("models/dev/schema.sql"), "create schema dev;").unwrap();
        fs::write(workspace.join("models/prod.txt"), "prod").unwrap();

        let java_home = root.join("jdk");
        fs::create_dir_all(java_home.join("bin")).unwrap();
        let java = java_home.join("bin/java");
        fs::write(&java, FAKE_JAVA).unwrap();
        fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();

        let libs = root.join("toad-edge-cli.zip");
        write_cli_zip(&libs);

        Self {
            workspace,
            build_dir: root.join("builds/5"),
            java_home,
            libs,
            config: root.join("config/config.json"),
            _temp: temp,
        }
    }

    /// `edge-ci <subcommand>` with the build coordinates already attached.
    pub fn step(&self, subcommand: &str) -> Command {
        let mut cmd = self.bare(subcommand);
        cmd.arg("--workspace")
            .arg(&self.workspace)
            .arg("--build-dir")
            .arg(&self.build_dir)
            .arg("--build-number")
            .arg(BUILD_NUMBER)
            .arg("--config")
            .arg(&self.config);
        cmd
    }

    /// `edge-ci <subcommand>` with only the fake runtime in the environment.
    pub fn bare(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_edge-ci"));
        cmd.arg(subcommand)
            .env("JAVA_HOME", &self.java_home)
            .env("EDGE_CI_LIBS", &self.libs)
            .env_remove("WORKSPACE")
            .env_remove("BUILD_NUMBER")
            .env_remove("JOB_ROOT_DIR")
            .env_remove("FAKE_TOOL_MODE")
            .env_remove("FAKE_TOOL_EXIT");
        cmd
    }

    /// Workspace entries other than the fixture's own inputs and outputs.
    pub fn leftovers(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.workspace)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| !matches!(name.as_str(), "models" | "out" | "workspace"))
            .collect();
        names.sort();
        names
    }
}

pub fn run(cmd: &mut Command) -> Output {
    let output = cmd.output().expect("run edge-ci");
    eprintln!("stdout:\n{}", String::from_utf8_lossy(&output.stdout));
    eprintln!("stderr:\n{}", String::from_utf8_lossy(&output.stderr));
    output
}

fn write_cli_zip(path: &Path) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    zip.start_file("toad-edge-cli.jar", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"jar").unwrap();
    zip.start_file("lib/dependency.jar", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"dep").unwrap();
    zip.finish().unwrap();
}
