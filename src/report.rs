//! Exposing a generated HTML report on the build.
//!
//! Publishing copies the report into the build's private directory and
//! records two actions in `build.json`: the report link itself and the
//! frame-embedding action that lets the host show it inline. `browse`
//! resolves request paths under those actions to files, the way a static
//! file server would.
use crate::context::{BuildContext, BuildLog};
use crate::staging::copy_dir_recursive;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Directory under the build directory that holds the published report.
pub const REPORT_DIR_NAME: &str = "JENKINS_REPORT";
pub const PUBLISHER_URL_NAME: &str = "comparehtmlreport";
pub const PUBLISHER_DISPLAY_NAME: &str = "Compare Html report";
pub const FRAME_URL_NAME: &str = "reportframe";
pub const INDEX_FILE: &str = "index.html";
const BUILD_RECORD_FILE: &str = "build.json";
const BUILD_RECORD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BuildAction {
    ReportPublisher {
        url_name: String,
        display_name: String,
        report_dir: PathBuf,
        index_file: String,
    },
    ReportFrame {
        url_name: String,
    },
}

impl BuildAction {
    pub fn url_name(&self) -> &str {
        match self {
            BuildAction::ReportPublisher { url_name, .. } => url_name,
            BuildAction::ReportFrame { url_name } => url_name,
        }
    }
}

/// Persisted per-build metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub schema_version: u32,
    pub number: u64,
    #[serde(default)]
    pub actions: Vec<BuildAction>,
}

impl BuildRecord {
    pub fn new(number: u64) -> Self {
        Self {
            schema_version: BUILD_RECORD_SCHEMA_VERSION,
            number,
            actions: Vec::new(),
        }
    }

    /// Attach an action unless one with the same URL name is present.
    ///
    /// Returns whether the record changed.
    pub fn attach(&mut self, action: BuildAction) -> bool {
        if self.action(action.url_name()).is_some() {
            return false;
        }
        self.actions.push(action);
        true
    }

    pub fn action(&self, url_name: &str) -> Option<&BuildAction> {
        self.actions
            .iter()
            .find(|action| action.url_name() == url_name)
    }
}

pub fn build_record_path(build_dir: &Path) -> PathBuf {
    build_dir.join(BUILD_RECORD_FILE)
}

pub fn load_build_record(build_dir: &Path) -> Result<Option<BuildRecord>> {
    let path = build_record_path(build_dir);
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let record: BuildRecord =
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    if record.schema_version != BUILD_RECORD_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported build record schema_version {}",
            record.schema_version
        ));
    }
    Ok(Some(record))
}

pub fn write_build_record(build_dir: &Path, record: &BuildRecord) -> Result<()> {
    fs::create_dir_all(build_dir).with_context(|| format!("create {}", build_dir.display()))?;
    let path = build_record_path(build_dir);
    let text = serde_json::to_string_pretty(record).context("serialize build record")?;
    fs::write(&path, text.as_bytes()).with_context(|| format!("write {}", path.display()))
}

/// Where a report ended up after publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedReport {
    pub report_dir: PathBuf,
    pub record_path: PathBuf,
}

/// Store `generated` with the build and attach the report actions.
pub fn publish_report(
    ctx: &BuildContext,
    generated: &Path,
    log: &BuildLog,
) -> Result<PublishedReport> {
    let report_dir = ctx.build_dir.join(REPORT_DIR_NAME);
    log.copying(generated, &report_dir);
    copy_dir_recursive(generated, &report_dir)?;
    log.copying_finished();

    let mut record =
        load_build_record(&ctx.build_dir)?.unwrap_or_else(|| BuildRecord::new(ctx.number));
    let mut changed = record.attach(BuildAction::ReportPublisher {
        url_name: PUBLISHER_URL_NAME.to_string(),
        display_name: PUBLISHER_DISPLAY_NAME.to_string(),
        report_dir: report_dir.clone(),
        index_file: INDEX_FILE.to_string(),
    });
    changed |= record.attach(BuildAction::ReportFrame {
        url_name: FRAME_URL_NAME.to_string(),
    });
    if changed {
        write_build_record(&ctx.build_dir, &record)?;
    }
    tracing::info!(report_dir = %report_dir.display(), changed, "report published");
    Ok(PublishedReport {
        report_dir,
        record_path: build_record_path(&ctx.build_dir),
    })
}

/// What a request path resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    File(PathBuf),
    /// Directory without an index document; entry names, directories with a trailing `/`.
    Listing { dir: PathBuf, entries: Vec<String> },
}

/// Resolve `<url-name>/<rel>` against the build's published report.
///
/// An empty request opens the report's index document.
pub fn browse(build_dir: &Path, request: &str) -> Result<Served> {
    let record = load_build_record(build_dir)?
        .ok_or_else(|| anyhow!("build at {} has no published report", build_dir.display()))?;
    let mut segments = request
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".");
    let url_name = segments.next().unwrap_or(PUBLISHER_URL_NAME);
    let (report_dir, index_file) = match record.action(url_name) {
        Some(BuildAction::ReportPublisher {
            report_dir,
            index_file,
            ..
        }) => (report_dir, index_file),
        Some(BuildAction::ReportFrame { .. }) => {
            return Err(anyhow!("{url_name} serves no files"));
        }
        None => return Err(anyhow!("no action named {url_name} on this build")),
    };

    let mut path = report_dir.clone();
    for segment in segments {
        if Path::new(segment)
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(anyhow!("invalid request path {request}"));
        }
        path.push(segment);
    }
    if !path.exists() {
        return Err(anyhow!("not found: {request}"));
    }
    let root = report_dir
        .canonicalize()
        .with_context(|| format!("resolve {}", report_dir.display()))?;
    let resolved = path
        .canonicalize()
        .with_context(|| format!("resolve {}", path.display()))?;
    if !resolved.starts_with(&root) {
        return Err(anyhow!("invalid request path {request}"));
    }

    if resolved.is_file() {
        return Ok(Served::File(resolved));
    }
    let index = resolved.join(index_file);
    if index.is_file() {
        return Ok(Served::File(index));
    }
    Ok(Served::Listing {
        entries: list_dir(&resolved)?,
        dir: resolved,
    })
}

fn list_dir(dir: &Path) -> Result<Vec<String>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry?;
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            name.push('/');
        }
        entries.push(name);
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
