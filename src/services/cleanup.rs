use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use walkdir::WalkDir;

/// Accessory folder name -> every path under the base directory where it was found
pub type FoundFolders = IndexMap<String, Vec<Utf8PathBuf>>;

/// Summary of one cleanup pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Folders staged and put back
    pub kept_folders: usize,
    pub removed_files: usize,
    pub removed_dirs: usize,

    /// Staged folders that were gone when restoring
    pub missing_restores: usize,
}

/// Locate every directory under `base` whose name is in `names`.
///
/// Names are matched exactly. A name found nowhere is left out of the map; a name found
/// several times lists every path in walk order (sorted by file name).
pub fn find_folders_to_keep(base: &Utf8Path, names: &[String]) -> Result<FoundFolders> {
    let mut dirs: Vec<(String, Utf8PathBuf)> = Vec::new();

    for entry in WalkDir::new(base).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", base))?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = Utf8PathBuf::try_from(entry.into_path())
            .map_err(|e| anyhow!("Non UTF-8 path under {}: {}", base, e))?;
        if let Some(name) = path.file_name() {
            dirs.push((name.to_string(), path.clone()));
        }
    }

    let mut found = FoundFolders::new();
    for name in names {
        if found.contains_key(name) {
            continue;
        }

        let paths: Vec<Utf8PathBuf> = dirs
            .iter()
            .filter(|(dir_name, _)| dir_name == name)
            .map(|(_, path)| path.clone())
            .collect();

        if !paths.is_empty() {
            found.insert(name.clone(), paths);
        }
    }

    Ok(found)
}

/// Remove everything under `root` except the accessory folders named in `needed`.
///
/// Convenience wrapper around [`find_folders_to_keep`] and [`relocate_and_clean`].
pub fn clean_directory(root: &Utf8Path, staging: &Utf8Path, needed: &[String]) -> Result<CleanupReport> {
    let found = find_folders_to_keep(root, needed)?;
    relocate_and_clean(root, staging, &found)
}

/// Stage the `found` folders, wipe `root`, then move the folders back.
///
/// 1. every found folder moves to `staging/<path relative to root>`
/// 2. all remaining files and directories under `root` are deleted bottom-up
/// 3. every staged folder moves back to its exact original path
///
/// `root` itself survives. A found folder nested inside another found folder travels
/// with its ancestor instead of being moved on its own.
pub fn relocate_and_clean(
    root: &Utf8Path,
    staging: &Utf8Path,
    found: &FoundFolders,
) -> Result<CleanupReport> {
    let kept = outermost_paths(found);
    let mut report = CleanupReport::default();

    fs::create_dir_all(staging)
        .with_context(|| format!("Failed to create staging directory: {}", staging))?;

    let mut staged: Vec<(Utf8PathBuf, Utf8PathBuf)> = Vec::with_capacity(kept.len());
    for original in &kept {
        let relative = original
            .strip_prefix(root)
            .with_context(|| format!("{} is not under {}", original, root))?;
        let staged_path = staging.join(relative);

        if let Some(parent) = staged_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create staging parent: {}", parent))?;
        }
        move_folder(original, &staged_path)?;
        tracing::debug!("Staged {} at {}", original, staged_path);

        staged.push((original.clone(), staged_path));
    }

    // Collect first: deleting while walking would invalidate the iterator's handles
    let entries: Vec<walkdir::DirEntry> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .collect::<Result<_, _>>()
        .with_context(|| format!("Failed to walk {}", root))?;

    for entry in entries {
        let path = entry.path();
        if entry.file_type().is_dir() {
            if kept.iter().any(|k| k.as_std_path() == path) {
                continue;
            }
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
            report.removed_dirs += 1;
        } else {
            fs::remove_file(path)
                .with_context(|| format!("Failed to remove file: {}", path.display()))?;
            report.removed_files += 1;
        }
    }

    for (original, staged_path) in &staged {
        if !staged_path.exists() {
            tracing::warn!("{} does not exist and cannot be restored.", staged_path);
            report.missing_restores += 1;
            continue;
        }

        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to recreate parent: {}", parent))?;
        }
        move_folder(staged_path, original)?;
        tracing::debug!("Moved {} back to {}", staged_path, original);
        report.kept_folders += 1;
    }

    tracing::info!(
        "Cleanup finished: kept {} folders, removed {} files and {} directories",
        report.kept_folders,
        report.removed_files,
        report.removed_dirs
    );

    Ok(report)
}

/// All found paths, sorted, with paths inside another found path dropped
fn outermost_paths(found: &FoundFolders) -> Vec<Utf8PathBuf> {
    let mut all: Vec<Utf8PathBuf> = found.values().flatten().cloned().collect();
    all.sort();
    all.dedup();

    let mut kept: Vec<Utf8PathBuf> = Vec::with_capacity(all.len());
    for path in all {
        if kept.iter().any(|ancestor| path.starts_with(ancestor)) {
            tracing::debug!("{} is inside another kept folder", path);
            continue;
        }
        kept.push(path);
    }
    kept
}

/// Move a directory to `to`, which must end in the same folder name.
///
/// Falls back to copy-and-delete when a plain rename fails (staging on another drive).
pub fn move_folder(from: &Utf8Path, to: &Utf8Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => tracing::warn!(
            "Rename of {} failed (cross-device?): {}. Attempting fallback move...",
            from,
            e
        ),
    }

    let parent = to
        .parent()
        .with_context(|| format!("Destination has no parent: {}", to))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create destination parent: {}", parent))?;
    let options = fs_extra::dir::CopyOptions::new();

    fs_extra::dir::move_dir(from, parent, &options)
        .map_err(|e| anyhow!("Failed to move {} to {}: {}", from, to, e))?;

    Ok(())
}
