//! Placeholder-aware path resolution for step configuration values.
//!
//! Users write paths the way they would in a job definition: prefixed with
//! `${WORKSPACE}` or `${JOB_ROOT_DIR}`, absolute, or relative to the
//! workspace. Everything the steps touch goes through `resolve_path`.
use crate::context::BuildContext;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

pub const WORKSPACE_VAR: &str = "${WORKSPACE}";
pub const JOB_ROOT_DIR_VAR: &str = "${JOB_ROOT_DIR}";

/// Resolve a configured path against the build it is used in.
pub fn resolve_path(ctx: &BuildContext, raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix(WORKSPACE_VAR) {
        return join_relative(&ctx.workspace, strip_relative_prefix(rest));
    }
    if let Some(rest) = raw.strip_prefix(JOB_ROOT_DIR_VAR) {
        return join_relative(&ctx.build_dir, strip_relative_prefix(rest));
    }
    let path = Path::new(raw);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    join_relative(&ctx.workspace, raw)
}

/// Drop one leading `./`, `.\`, `/` or `\` so the rest joins as relative.
pub fn strip_relative_prefix(path: &str) -> &str {
    for prefix in ["./", ".\\", "/", "\\"] {
        if let Some(rest) = path.strip_prefix(prefix) {
            return rest;
        }
    }
    path
}

fn join_relative(root: &Path, rel: &str) -> PathBuf {
    if rel.is_empty() {
        return root.to_path_buf();
    }
    let normalized = rel.replace('\\', "/");
    normalized
        .split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}

/// Forward-slash path string in `file:` URI form; directories end in `/`.
pub fn uri_path(path: &Path) -> String {
    let mut text = path.to_string_lossy().replace('\\', "/");
    if !text.starts_with('/') {
        text.insert(0, '/');
    }
    if path.is_dir() && !text.ends_with('/') {
        text.push('/');
    }
    text
}

/// Reject configured paths that do not resolve inside the workspace.
///
/// The check is a substring match on URI paths, so a path that embeds the
/// workspace path anywhere passes.
pub fn restrict_location(ctx: &BuildContext, raw: &str) -> Result<PathBuf> {
    let resolved = resolve_path(ctx, raw);
    let resolved_uri = uri_path(&resolved);
    let workspace_uri = uri_path(&ctx.workspace);
    if resolved_uri.contains(&workspace_uri) {
        return Ok(resolved);
    }
    Err(anyhow!(
        "Specified folder or file ({resolved_uri}) should be inside project workspace directory"
    ))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
