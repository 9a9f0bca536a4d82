//! Unpacking the zipped CLI distribution and finding its entry jar.
use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Extract `archive` into a fresh `target` directory.
///
/// Any leftover from an earlier invocation is removed first so the jar
/// lookup never sees stale files.
pub fn unpack_archive(archive: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        fs::remove_dir_all(target)
            .with_context(|| format!("remove stale {}", target.display()))?;
    }
    fs::create_dir_all(target).with_context(|| format!("create {}", target.display()))?;
    let file =
        File::open(archive).with_context(|| format!("open libraries {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("read zip archive {}", archive.display()))?;
    zip.extract(target)
        .with_context(|| format!("unzip {} into {}", archive.display(), target.display()))?;
    tracing::debug!(
        entries = zip.len(),
        target = %target.display(),
        "unpacked CLI libraries"
    );
    Ok(())
}

/// Return the first `.jar` directly inside `dir` (lexicographic order).
pub fn find_cli_jar(dir: &Path) -> Result<PathBuf> {
    let mut jars = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let path = entry?.path();
        let is_jar = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"));
        if is_jar && path.is_file() {
            jars.push(path);
        }
    }
    jars.sort();
    jars.into_iter().next().ok_or_else(|| {
        anyhow!(
            "Configured archive doesn't contain CLI tools (no .jar in {})",
            dir.display()
        )
    })
}
