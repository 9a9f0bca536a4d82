//! Per-build execution context and the shared build log.
//!
//! A step never looks at process-global state directly: the workspace, the
//! private build directory, the build number and the environment all come
//! from `BuildContext`, so one binary can serve any CI host.
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Operating-system family of the agent that runs the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    pub fn is_unix(self) -> bool {
        self == Platform::Unix
    }
}

/// Everything a step needs to know about the build it runs in.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Transient working directory allocated by the host.
    pub workspace: PathBuf,
    /// Private per-build storage (the `${JOB_ROOT_DIR}` target).
    pub build_dir: PathBuf,
    /// Discriminator for temporary artifact names.
    pub number: u64,
    pub platform: Platform,
    /// Build environment as seen by the host, consulted for `JAVA_HOME`.
    pub env: BTreeMap<String, String>,
}

impl BuildContext {
    pub fn new(workspace: PathBuf, build_dir: PathBuf, number: u64) -> Self {
        Self {
            workspace,
            build_dir,
            number,
            platform: Platform::current(),
            env: BTreeMap::new(),
        }
    }

    /// Capture the current process environment as the build environment.
    pub fn with_process_env(mut self) -> Self {
        self.env = std::env::vars().collect();
        self
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Workspace path for a temporary artifact named `<role><number>[.ext]`.
    pub fn temp_path(&self, role: &str, extension: Option<&str>) -> PathBuf {
        let name = match extension {
            Some(ext) if !ext.is_empty() => format!("{role}{}.{ext}", self.number),
            _ => format!("{role}{}", self.number),
        };
        self.workspace.join(name)
    }
}

/// Line-oriented sink for the human-readable build log.
///
/// Clones share one writer, which lets the invoker stream the child's
/// stdout and stderr from two threads without interleaving partial lines.
#[derive(Clone)]
pub struct BuildLog {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for BuildLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildLog").finish_non_exhaustive()
    }
}

impl BuildLog {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// In-memory log; the returned buffer sees every line written.
    #[cfg(test)]
    pub fn capture() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(Box::new(buffer.clone())), buffer)
    }

    pub fn line(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(target: "edge_ci::build_log", "{message}");
        if let Ok(mut sink) = self.sink.lock() {
            // A closed log must not fail the build step.
            let _ = writeln!(sink, "{message}");
            let _ = sink.flush();
        }
    }

    pub fn copying(&self, from: &Path, to: &Path) {
        self.line(format!("Copying {} to {}", from.display(), to.display()));
    }

    pub fn copying_finished(&self) {
        self.line("Copying finished");
    }

    pub fn deleting(&self, path: &Path) {
        self.line(format!("Deleting {}", path.display()));
    }

    /// Forward every line from `reader` until EOF.
    pub fn pump<R: Read>(&self, reader: R) -> io::Result<()> {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            let text = String::from_utf8_lossy(&buf);
            self.line(text.trim_end_matches(['\r', '\n']));
        }
    }
}

/// Cloneable in-memory writer backing `BuildLog::capture`.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

#[cfg(test)]
impl SharedBuffer {
    pub fn contents(&self) -> String {
        match self.bytes.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| io::Error::other("build log poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
