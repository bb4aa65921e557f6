//! SCS Packer - Extracts truck and trailer definitions from ETS2/ATS archives and repacks them
//!
//! Main entry point.
//!
//! # Execution Flow
//!
//! 1. Load optional settings from `data/settings.yaml`
//! 2. Initialize logging → fresh `log.txt`
//! 3. Verify `data/converter_pix.exe` and `data/scs_files.txt` (exit 1 if missing)
//! 4. Parse the archive lists once
//! 5. Create the tokio runtime; Ctrl+C cancels the active run (the flag is reset per run)
//! 6. Loop: pick a folder → validate → run the pipeline on a worker task while the main
//!    thread prints progress → show the outcome. Closing the picker exits.

use anyhow::Result;
use camino::Utf8PathBuf;
use scs_packer::services::{remove_stale_work_dirs, validate_selection};
use scs_packer::ui::{self, dialogs};
use scs_packer::{
    APP_NAME, ConfigManager, PackPipeline, PipelineOptions, PixConverter, ProgressReporter,
    RunOutcome, VERSION,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Directory holding the converter, the archive lists and the settings
const DATA_DIR: &str = "data";

fn main() -> Result<ExitCode> {
    let config_manager = ConfigManager::new(DATA_DIR);
    let settings_result = config_manager.load_settings();
    let settings = settings_result.as_ref().cloned().unwrap_or_default();

    let _log_guard = scs_packer::logging::setup_logging(
        &settings.log_dir,
        scs_packer::logging::LOG_FILE_NAME,
        settings.debug_mode,
        settings.console_output,
    )?;

    tracing::info!("Application started. Hi, here you can see application logs.");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    if let Err(e) = &settings_result {
        tracing::warn!("{:#}, using default settings", e);
    }

    if let Err(e) = config_manager.verify_support_files() {
        tracing::error!("{}", e);
        dialogs::show_error(&e.to_string());
        return Ok(ExitCode::FAILURE);
    }

    tracing::info!(
        "Using converter {} and archive lists {}",
        config_manager.converter_path(),
        config_manager.scs_files_path()
    );

    let lists = Arc::new(config_manager.load_scs_lists());
    let converter_path = std::path::absolute(config_manager.converter_path())
        .ok()
        .and_then(|p| Utf8PathBuf::try_from(p).ok())
        .unwrap_or_else(|| config_manager.converter_path().to_path_buf());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("scs-packer-worker")
        .build()?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_tx = Arc::new(cancel_tx);
    {
        let cancel_tx = Arc::clone(&cancel_tx);
        runtime.spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl+C received - cancelling...");
                cancel_tx.send_replace(true);
            }
        });
    }

    let converter = PixConverter::new(
        converter_path,
        Duration::from_secs(settings.extraction_timeout_secs),
    );
    let pipeline = Arc::new(PackPipeline::new(
        Arc::clone(&lists),
        converter,
        cancel_rx,
        PipelineOptions::default(),
    ));

    while let Some(folder) = dialogs::pick_game_folder() {
        let selection = match validate_selection(&folder, &lists) {
            Ok(selection) => selection,
            Err(e) => {
                dialogs::show_error(&e.to_string());
                continue;
            }
        };

        match remove_stale_work_dirs(&selection.folder) {
            Ok(0) => {}
            Ok(n) => tracing::info!("Removed {} leftover work directories", n),
            Err(e) => tracing::warn!("{:#}", e),
        }

        // A Ctrl+C outside a run must not cancel the next one
        cancel_tx.send_replace(false);

        let (mut reporter, mut progress_rx) = ProgressReporter::channel();
        let worker = {
            let pipeline = Arc::clone(&pipeline);
            runtime.spawn(async move { pipeline.run(&selection, &mut reporter).await })
        };

        runtime.block_on(ui::follow(&mut progress_rx));

        match runtime.block_on(worker) {
            Ok(Ok(report)) if report.outcome.is_success() => {
                dialogs::show_info(report.outcome.message());
            }
            Ok(Ok(report)) => {
                dialogs::show_error(report.outcome.message());
                if report.outcome == RunOutcome::Cancelled {
                    break;
                }
            }
            Ok(Err(e)) => dialogs::show_error(&e.to_string()),
            Err(e) => {
                tracing::error!("Worker task failed: {}", e);
                dialogs::show_error("Processing failed unexpectedly. Check the log for details.");
            }
        }
    }

    tracing::info!("Exit.");
    runtime.shutdown_timeout(Duration::from_secs(5));

    Ok(ExitCode::SUCCESS)
}
