use super::cleanup::{CleanupReport, find_folders_to_keep, relocate_and_clean};
use super::extraction::{Converter, ExtractionError, ExtractionService};
use super::packaging::{PackSummary, package_output};
use super::version::read_game_version;
use crate::models::{GameType, ScsLists};
use crate::state::{FileStatus, ProgressReporter, RunOutcome, RunStage};
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use thiserror::Error;
use tokio::sync::watch;

/// Progress reached when every archive has been extracted
pub const EXTRACTION_DONE_PERCENT: f32 = 50.0;

/// Share of the bar spent on locating and cleaning
pub const CLEANUP_SHARE_PERCENT: f32 = 15.0;

/// Progress once packaging is over
pub const PACKAGING_DONE_PERCENT: f32 = 65.0;

/// First step of the closing ramp; the ramp runs up to 99 before reporting 100
pub const FINALIZE_START_PERCENT: u8 = 85;

const WORK_DIR_PREFIX: &str = "temp_proc";

/// Length of the random suffix tempfile appends to the work directory prefix
const WORK_DIR_RAND_LEN: usize = 6;
const STAGING_DIR_PREFIX: &str = "scs_cleanup_temp";

/// Reasons a folder selection is rejected before any run starts.
///
/// The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("The specified folder does not exist.")]
    FolderMissing,

    #[error("No .scs files found in the selected path. Please select another path.")]
    NoScsFiles,

    #[error("The selected folder does not contain valid SCS files.")]
    UnknownGame,

    #[error("No valid .scs files found for processing.")]
    EmptyFileList,
}

/// A validated game folder and the archives to extract from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub folder: Utf8PathBuf,
    pub game: GameType,
    pub files: Vec<String>,
}

/// Check a picked folder and resolve its archive list.
///
/// In order: the folder exists, it holds at least one `.scs` file, its path names a
/// known game, and that game's list is not empty.
pub fn validate_selection(folder: &Utf8Path, lists: &ScsLists) -> Result<Selection, SelectionError> {
    if !folder.is_dir() {
        tracing::error!("Selected folder does not exist: {}", folder);
        return Err(SelectionError::FolderMissing);
    }

    if !contains_scs_files(folder) {
        tracing::error!("No .scs files found in the selected path.");
        return Err(SelectionError::NoScsFiles);
    }

    let Some(game) = GameType::detect(folder.as_str()) else {
        tracing::error!("Could not determine the game for {}", folder);
        return Err(SelectionError::UnknownGame);
    };

    let files = lists.files_for(game);
    if files.is_empty() {
        tracing::error!("No valid .scs files found for processing.");
        return Err(SelectionError::EmptyFileList);
    }

    tracing::info!("Folder selected: {} ({}, {} archives)", folder, game, files.len());

    Ok(Selection {
        folder: folder.to_path_buf(),
        game,
        files: files.to_vec(),
    })
}

fn contains_scs_files(folder: &Utf8Path) -> bool {
    match folder.read_dir_utf8() {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().ends_with(".scs")),
        Err(e) => {
            tracing::warn!("Failed to list {}: {}", folder, e);
            false
        }
    }
}

/// Tunables for [`PackPipeline`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Pause between steps of the closing progress ramp
    pub finalize_step_delay: Duration,

    /// Where the cleanup staging directory is created; `None` means the system temp dir
    pub staging_parent: Option<Utf8PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            finalize_step_delay: Duration::from_millis(20),
            staging_parent: None,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub processed_files: Vec<String>,
    pub failed_files: Vec<String>,
    pub missing_files: Vec<String>,
    pub version: Option<String>,

    /// `None` if cleanup failed or never ran
    pub cleanup: Option<CleanupReport>,

    /// `None` if packaging failed or was skipped
    pub archive: Option<PackSummary>,

    /// Both temporary directories were deleted
    pub temp_removed: bool,

    pub outcome: RunOutcome,
    pub duration: Duration,
}

impl RunReport {
    fn new() -> Self {
        Self {
            processed_files: Vec::new(),
            failed_files: Vec::new(),
            missing_files: Vec::new(),
            version: None,
            cleanup: None,
            archive: None,
            temp_removed: false,
            outcome: RunOutcome::NothingProcessed,
            duration: Duration::ZERO,
        }
    }

    /// Outcome from every stage: anything processed, and nothing after it went wrong
    fn evaluate(&self) -> RunOutcome {
        if self.processed_files.is_empty() {
            RunOutcome::NothingProcessed
        } else if self.failed_files.is_empty()
            && self.cleanup.is_some()
            && self.archive.is_some()
            && self.temp_removed
        {
            RunOutcome::Completed
        } else {
            RunOutcome::CompletedWithErrors
        }
    }
}

/// Working directories owned by one run; dropping them deletes them
struct RunDirs {
    work: TempDir,
    work_path: Utf8PathBuf,
    staging: TempDir,
    staging_path: Utf8PathBuf,
}

impl RunDirs {
    fn create(folder: &Utf8Path, staging_parent: Option<&Utf8Path>) -> Result<Self> {
        let work = tempfile::Builder::new()
            .prefix(WORK_DIR_PREFIX)
            .rand_bytes(WORK_DIR_RAND_LEN)
            .tempdir_in(folder)
            .with_context(|| format!("Failed to create work directory in {}", folder))?;

        let mut staging_builder = tempfile::Builder::new();
        staging_builder.prefix(STAGING_DIR_PREFIX);
        let staging = match staging_parent {
            Some(parent) => staging_builder.tempdir_in(parent),
            None => staging_builder.tempdir(),
        }
        .context("Failed to create cleanup staging directory")?;

        let work_path = utf8_path(work.path())?;
        let staging_path = utf8_path(staging.path())?;

        Ok(Self {
            work,
            work_path,
            staging,
            staging_path,
        })
    }

    /// Delete both directories, logging failures
    fn remove(self) -> bool {
        let mut removed = true;

        for (dir, path) in [(self.work, self.work_path), (self.staging, self.staging_path)] {
            if let Err(e) = dir.close() {
                tracing::error!("Failed to delete temp folder {}: {}", path, e);
                removed = false;
            }
        }

        removed
    }
}

fn utf8_path(path: &std::path::Path) -> Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path.to_path_buf()).map_err(|e| anyhow!("Non UTF-8 temp path: {}", e))
}

/// Extract, clean and package one game folder.
///
/// The pipeline owns the archive lists and the extraction service; each [`run`](Self::run)
/// gets fresh working directories and reports progress through a [`ProgressReporter`].
pub struct PackPipeline<C> {
    lists: Arc<ScsLists>,
    extraction: ExtractionService<C>,
    options: PipelineOptions,
}

impl<C: Converter> PackPipeline<C> {
    pub fn new(
        lists: Arc<ScsLists>,
        converter: C,
        cancel_rx: watch::Receiver<bool>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            lists,
            extraction: ExtractionService::new(converter, cancel_rx),
            options,
        }
    }

    pub fn lists(&self) -> &ScsLists {
        &self.lists
    }

    pub fn extraction(&self) -> &ExtractionService<C> {
        &self.extraction
    }

    /// Run all stages for `selection`.
    ///
    /// A missing folder or empty file list is rejected before any stage is entered.
    /// Every other failure is logged, recorded in the report and folded into the outcome.
    pub async fn run(
        &self,
        selection: &Selection,
        reporter: &mut ProgressReporter,
    ) -> Result<RunReport, SelectionError> {
        if !selection.folder.is_dir() {
            tracing::error!("The specified folder does not exist: {}", selection.folder);
            return Err(SelectionError::FolderMissing);
        }
        if selection.files.is_empty() {
            tracing::error!("No .scs files found for processing.");
            return Err(SelectionError::EmptyFileList);
        }

        let start = Instant::now();
        let mut report = RunReport::new();
        reporter.advance(RunStage::Validating);

        let dirs = match RunDirs::create(&selection.folder, self.options.staging_parent.as_deref()) {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::error!("{:#}", e);
                report.duration = start.elapsed();
                reporter.finish(report.outcome);
                return Ok(report);
            }
        };

        reporter.advance(RunStage::Extracting);
        let cancelled = self.extract_files(selection, &dirs.work_path, &mut report, reporter).await;
        if cancelled || self.extraction.is_cancelled() {
            return Ok(self.close_cancelled(dirs, report, reporter, start));
        }

        report.version = read_game_version(&self.extraction, &selection.folder, &dirs.work_path).await;
        if self.extraction.is_cancelled() {
            return Ok(self.close_cancelled(dirs, report, reporter, start));
        }

        reporter.advance(RunStage::LocatingAccessories);
        let found = find_folders_to_keep(&dirs.work_path, &self.lists.needed_accs);
        if let Ok(found) = &found {
            tracing::info!("Found {} accessory folder names to keep", found.len());
        }

        reporter.advance(RunStage::Cleaning);
        let found_names = match found {
            Ok(found) => {
                match relocate_and_clean(&dirs.work_path, &dirs.staging_path, &found) {
                    Ok(cleanup) => report.cleanup = Some(cleanup),
                    Err(e) => tracing::error!("Cleanup failed: {:#}", e),
                }
                found.len()
            }
            Err(e) => {
                tracing::error!("Failed to locate accessory folders: {:#}", e);
                0
            }
        };
        reporter.set_progress(
            EXTRACTION_DONE_PERCENT + CLEANUP_SHARE_PERCENT / (found_names + 1) as f32,
        );

        reporter.advance(RunStage::Packaging);
        if self.should_package(&report) {
            match package_output(&selection.folder, &dirs.work_path, report.version.as_deref()) {
                Ok(summary) => report.archive = Some(summary),
                Err(e) => tracing::error!("Failed to zip temporary folder: {:#}", e),
            }
        }
        reporter.set_progress(PACKAGING_DONE_PERCENT);

        reporter.advance(RunStage::RemovingTemp);
        report.temp_removed = dirs.remove();

        reporter.advance(RunStage::Finalizing);
        for percent in FINALIZE_START_PERCENT..100 {
            reporter.set_progress(f32::from(percent));
            if !self.options.finalize_step_delay.is_zero() {
                tokio::time::sleep(self.options.finalize_step_delay).await;
            }
        }
        reporter.set_progress(100.0);

        report.outcome = report.evaluate();
        report.duration = start.elapsed();
        tracing::info!(
            "Processing completed in: {:?} ({} processed, {} failed, {} missing)",
            report.duration,
            report.processed_files.len(),
            report.failed_files.len(),
            report.missing_files.len()
        );
        reporter.finish(report.outcome);

        Ok(report)
    }

    /// Extraction loop; returns `true` if the run was cancelled
    async fn extract_files(
        &self,
        selection: &Selection,
        work_path: &Utf8Path,
        report: &mut RunReport,
        reporter: &mut ProgressReporter,
    ) -> bool {
        let total = selection.files.len();

        for (i, file) in selection.files.iter().enumerate() {
            let archive = selection.folder.join(file);

            let status = if archive.exists() {
                match self.extraction.extract_archive(&archive, work_path).await {
                    Ok(()) => {
                        report.processed_files.push(file.clone());
                        FileStatus::Processed
                    }
                    Err(ExtractionError::Cancelled) => return true,
                    Err(_) => {
                        report.failed_files.push(file.clone());
                        FileStatus::Failed
                    }
                }
            } else {
                tracing::warn!("File not found, skipping: {}", file);
                report.missing_files.push(file.clone());
                FileStatus::Missing
            };

            reporter.file_processed(file, status);
            reporter.set_progress((i + 1) as f32 / total as f32 * EXTRACTION_DONE_PERCENT);
        }

        false
    }

    /// Packaging needs extracted content, no hard extraction failures and a clean tree
    fn should_package(&self, report: &RunReport) -> bool {
        if report.processed_files.is_empty() {
            tracing::warn!("Nothing was extracted, skipping packaging");
            false
        } else if !report.failed_files.is_empty() {
            tracing::warn!(
                "Skipping packaging: {} archives failed to extract",
                report.failed_files.len()
            );
            false
        } else if report.cleanup.is_none() {
            tracing::warn!("Skipping packaging: cleanup did not complete");
            false
        } else {
            true
        }
    }

    fn close_cancelled(
        &self,
        dirs: RunDirs,
        mut report: RunReport,
        reporter: &mut ProgressReporter,
        start: Instant,
    ) -> RunReport {
        tracing::warn!("Run cancelled, removing temporary folders");
        reporter.advance(RunStage::RemovingTemp);
        report.temp_removed = dirs.remove();
        report.outcome = RunOutcome::Cancelled;
        report.duration = start.elapsed();
        reporter.finish(report.outcome);
        report
    }
}

/// Remove work directories left in `folder` by an interrupted run.
///
/// Only names shaped exactly like the ones a run creates (`temp_proc` plus six ASCII
/// alphanumerics) are removed. Returns how many directories were removed.
pub fn remove_stale_work_dirs(folder: &Utf8Path) -> Result<usize> {
    let mut removed = 0;

    for entry in folder
        .read_dir_utf8()
        .with_context(|| format!("Failed to list {}", folder))?
    {
        let entry = entry.with_context(|| format!("Failed to list {}", folder))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false)
            && is_work_dir_name(entry.file_name())
        {
            fs::remove_dir_all(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path()))?;
            tracing::info!("Removed stale work directory {}", entry.path());
            removed += 1;
        }
    }

    Ok(removed)
}

fn is_work_dir_name(name: &str) -> bool {
    name.strip_prefix(WORK_DIR_PREFIX).is_some_and(|suffix| {
        suffix.len() == WORK_DIR_RAND_LEN && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn game_dir(name: &str) -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let folder = root.join(name);
        fs::create_dir_all(&folder).unwrap();
        (temp_dir, folder)
    }

    fn lists() -> ScsLists {
        ScsLists {
            ets2_entries: vec!["def.scs".to_string()],
            ats_entries: Vec::new(),
            needed_accs: vec!["badge".to_string()],
        }
    }

    #[test]
    fn test_missing_folder() {
        let (_guard, folder) = game_dir("Euro Truck Simulator 2");
        let result = validate_selection(&folder.join("nope"), &lists());
        assert_eq!(result, Err(SelectionError::FolderMissing));
    }

    #[test]
    fn test_folder_without_scs_files() {
        let (_guard, folder) = game_dir("Euro Truck Simulator 2");
        fs::write(folder.join("eurotrucks2.exe"), b"").unwrap();

        let result = validate_selection(&folder, &lists());
        assert_eq!(result, Err(SelectionError::NoScsFiles));
        assert!(
            SelectionError::NoScsFiles
                .to_string()
                .starts_with("No .scs files found in the selected path")
        );
    }

    #[test]
    fn test_unknown_game_folder() {
        let (_guard, folder) = game_dir("Some Other Game");
        fs::write(folder.join("def.scs"), b"").unwrap();

        let result = validate_selection(&folder, &lists());
        assert_eq!(result, Err(SelectionError::UnknownGame));
        assert!(result.unwrap_err().to_string().contains("does not contain valid SCS files"));
    }

    #[test]
    fn test_empty_list_for_game() {
        let (_guard, folder) = game_dir("American Truck Simulator");
        fs::write(folder.join("def.scs"), b"").unwrap();

        let result = validate_selection(&folder, &lists());
        assert_eq!(result, Err(SelectionError::EmptyFileList));
    }

    #[test]
    fn test_valid_selection() {
        let (_guard, folder) = game_dir("Euro Truck Simulator 2");
        fs::write(folder.join("def.scs"), b"").unwrap();

        let selection = validate_selection(&folder, &lists()).unwrap();
        assert_eq!(selection.game, GameType::Ets2);
        assert_eq!(selection.files, vec!["def.scs".to_string()]);
    }

    #[test]
    fn test_outcome_evaluation() {
        let mut report = RunReport::new();
        assert_eq!(report.evaluate(), RunOutcome::NothingProcessed);

        report.processed_files.push("def.scs".to_string());
        assert_eq!(report.evaluate(), RunOutcome::CompletedWithErrors);

        report.cleanup = Some(CleanupReport::default());
        report.archive = Some(PackSummary {
            archive_path: Utf8PathBuf::from("out.zip"),
            files_written: 1,
            bytes_written: 1,
        });
        report.temp_removed = true;
        assert_eq!(report.evaluate(), RunOutcome::Completed);

        report.failed_files.push("dlc_krone.scs".to_string());
        assert_eq!(report.evaluate(), RunOutcome::CompletedWithErrors);
    }

    #[test]
    fn test_remove_stale_work_dirs() {
        let (_guard, folder) = game_dir("Euro Truck Simulator 2");
        fs::create_dir_all(folder.join("temp_procAbC123/def")).unwrap();
        fs::create_dir_all(folder.join("bin")).unwrap();

        assert_eq!(remove_stale_work_dirs(&folder).unwrap(), 1);
        assert!(!folder.join("temp_procAbC123").exists());
        assert!(folder.join("bin").exists());
    }

    #[test]
    fn test_stale_removal_spares_lookalike_folders() {
        let (_guard, folder) = game_dir("Euro Truck Simulator 2");
        fs::create_dir_all(folder.join("temp_procX9y8Z7")).unwrap();
        fs::create_dir_all(folder.join("temp_processed_mods")).unwrap();
        fs::write(folder.join("temp_processed_mods/my_mod.scs"), b"mod").unwrap();
        fs::create_dir_all(folder.join("temp_proc")).unwrap();
        fs::create_dir_all(folder.join("temp_proc_1234")).unwrap();

        assert_eq!(remove_stale_work_dirs(&folder).unwrap(), 1);
        assert!(!folder.join("temp_procX9y8Z7").exists());
        assert!(folder.join("temp_processed_mods/my_mod.scs").is_file());
        assert!(folder.join("temp_proc").is_dir());
        assert!(folder.join("temp_proc_1234").is_dir());
    }

    #[test]
    fn test_created_work_dir_matches_stale_pattern() {
        let (_guard, folder) = game_dir("Euro Truck Simulator 2");
        let dirs = RunDirs::create(&folder, None).unwrap();

        assert!(is_work_dir_name(dirs.work_path.file_name().unwrap()));
        assert!(dirs.remove());
    }
}
