use crate::context::BuildLog;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Copy a step input into its temporary workspace location.
///
/// Directories are copied recursively; files keep their bytes verbatim.
pub fn stage_input(source: &Path, dest: &Path, log: &BuildLog) -> Result<()> {
    if !source.exists() {
        return Err(anyhow!("input {} does not exist", source.display()));
    }
    log.copying(source, dest);
    if source.is_dir() {
        copy_dir_recursive(source, dest)?;
    } else {
        copy_file(source, dest)?;
    }
    log.copying_finished();
    Ok(())
}

/// Copy the tree under `source` into `dest`.
///
/// The source is listed before `dest` is created, and `dest` is pruned from
/// the walk, so staging a directory that contains the workspace copy does
/// not recurse into itself.
pub fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<()> {
    let entries = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(dest))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("walk {}", source.display()))?;
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
    for entry in entries {
        let rel = entry
            .path()
            .strip_prefix(source)
            .context("strip staging prefix")?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).with_context(|| format!("create {}", target.display()))?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy one file, creating missing parent directories.
///
/// The bytes land in a hidden sibling first and are renamed into place so a
/// reader never sees a half-written destination.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let file_name = dest
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("staged");
    let tmp_path = dest
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    fs::copy(source, &tmp_path)
        .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;
    fs::rename(&tmp_path, dest).with_context(|| format!("publish {}", dest.display()))?;
    Ok(())
}

/// Create a temporary directory if it is not there yet.
pub fn ensure_dir(path: &Path, log: &BuildLog) -> Result<()> {
    if !path.exists() {
        log.line(format!("Creating temporary folder {}", path.display()));
        fs::create_dir_all(path).with_context(|| format!("create {}", path.display()))?;
    }
    Ok(())
}

/// Delete a temporary artifact; missing artifacts are not an error.
pub fn remove_artifact(path: &Path, log: &BuildLog) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    log.deleting(path);
    if meta.is_dir() {
        fs::remove_dir_all(path).with_context(|| format!("delete {}", path.display()))?;
    } else {
        fs::remove_file(path).with_context(|| format!("delete {}", path.display()))?;
    }
    Ok(())
}
