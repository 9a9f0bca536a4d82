//! Test doubles for the external tool.
use super::{Launcher, ToolCommand};
use crate::context::BuildLog;
use anyhow::Result;
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// What the fake tool writes at its `-out` location.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FakeOutput {
    Dir,
    File,
}

/// Records every argv and pretends to be the CLI.
pub(crate) struct FakeLauncher {
    pub exit_code: i32,
    pub output: Option<FakeOutput>,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl FakeLauncher {
    pub fn new(exit_code: i32, output: Option<FakeOutput>) -> Self {
        Self {
            exit_code,
            output,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn last_call(&self) -> Vec<String> {
        self.calls.borrow().last().cloned().unwrap_or_default()
    }
}

impl Launcher for &FakeLauncher {
    fn launch(&self, command: &ToolCommand, _cwd: &Path, log: &BuildLog) -> Result<i32> {
        let argv = command.argv();
        self.calls.borrow_mut().push(argv.clone());
        log.line("fake tool running");
        if let (Some(kind), Some(out)) = (self.output, flag_value(&argv, "-out")) {
            let out = Path::new(out);
            match kind {
                FakeOutput::Dir => {
                    fs::create_dir_all(out)?;
                    fs::write(out.join("index.html"), "<html>report</html>")?;
                    fs::create_dir_all(out.join("css"))?;
                    fs::write(out.join("css/site.css"), "body {}")?;
                }
                FakeOutput::File => fs::write(out, "tool output")?,
            }
        }
        Ok(self.exit_code)
    }
}

pub(crate) fn flag_value<'a>(argv: &'a [String], flag: &str) -> Option<&'a str> {
    argv.iter()
        .position(|arg| arg == flag)
        .and_then(|idx| argv.get(idx + 1))
        .map(String::as_str)
}

/// Write a minimal CLI distribution: one entry jar plus a `lib/` folder.
pub(crate) fn write_cli_zip(path: &Path, with_jar: bool) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    if with_jar {
        zip.start_file("toad-edge-cli.jar", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"jar").unwrap();
    }
    zip.start_file("lib/dependency.jar", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"dep").unwrap();
    zip.finish().unwrap();
}
