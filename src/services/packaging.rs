use crate::models::GameType;
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Result of writing one output archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSummary {
    pub archive_path: Utf8PathBuf,
    pub files_written: usize,
    pub bytes_written: u64,
}

/// Output archive name: `<gametype>_<version>_packed_<MMDD_HHMMSS>.zip`.
///
/// Unknown game or version leave their segment empty (`_1.53_packed_...`, `ets2__packed_...`).
pub fn archive_file_name(
    game: Option<GameType>,
    version: Option<&str>,
    timestamp: &DateTime<Local>,
) -> String {
    format!(
        "{}_{}_packed_{}.zip",
        game.map(GameType::token).unwrap_or_default(),
        version.unwrap_or_default(),
        timestamp.format("%m%d_%H%M%S")
    )
}

/// Zip the cleaned output of a run into the selected game folder.
///
/// The game token comes from `target_folder`'s path, the name from
/// [`archive_file_name`] with the current local time.
pub fn package_output(
    target_folder: &Utf8Path,
    content_dir: &Utf8Path,
    version: Option<&str>,
) -> Result<PackSummary> {
    let game = GameType::detect(target_folder.as_str());
    let file_name = archive_file_name(game, version, &Local::now());
    let archive_path = target_folder.join(file_name);

    let summary = pack_directory(content_dir, &archive_path)?;
    tracing::info!("Temporary folder zipped to: {}", summary.archive_path);
    Ok(summary)
}

/// Write every file under `content_dir` into a deflate zip at `archive_path`.
///
/// Entry names are relative to `content_dir` with `/` separators, in sorted walk order.
/// Directories without files produce no entries. A partially written archive is removed
/// on failure.
pub fn pack_directory(content_dir: &Utf8Path, archive_path: &Utf8Path) -> Result<PackSummary> {
    let result = write_archive(content_dir, archive_path);

    if result.is_err() && archive_path.exists() {
        if let Err(e) = fs::remove_file(archive_path) {
            tracing::warn!("Failed to remove incomplete archive {}: {}", archive_path, e);
        }
    }

    result
}

fn write_archive(content_dir: &Utf8Path, archive_path: &Utf8Path) -> Result<PackSummary> {
    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive: {}", archive_path))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files_written = 0;
    let mut bytes_written = 0u64;

    for entry in WalkDir::new(content_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", content_dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry_name(content_dir, entry.path())?;
        writer
            .start_file(name.clone(), options)
            .with_context(|| format!("Failed to add {} to archive", name))?;

        let mut source = File::open(entry.path())
            .with_context(|| format!("Failed to open {}", entry.path().display()))?;
        bytes_written += io::copy(&mut source, &mut writer)
            .with_context(|| format!("Failed to write {} to archive", name))?;
        files_written += 1;
    }

    writer
        .finish()
        .with_context(|| format!("Failed to finish archive: {}", archive_path))?;

    Ok(PackSummary {
        archive_path: archive_path.to_path_buf(),
        files_written,
        bytes_written,
    })
}

/// Relative `/`-separated zip entry name for `path` under `root`
fn entry_name(root: &Utf8Path, path: &std::path::Path) -> Result<String> {
    let relative = path
        .strip_prefix(root.as_std_path())
        .with_context(|| format!("{} is not under {}", path.display(), root))?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| anyhow!("Non UTF-8 path: {}", relative.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(parts.join("/"))
}
