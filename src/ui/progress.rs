use crate::state::{FileStatus, ProgressEvent, RunOutcome};
use tokio::sync::mpsc;

/// Width of the console progress bar in characters
pub const BAR_WIDTH: usize = 40;

/// Render a percentage as `[#####.....]  50%`
pub fn format_bar(percent: f32, width: usize) -> String {
    let percent = percent.clamp(0.0, 100.0);
    let filled = ((percent / 100.0) * width as f32).round() as usize;

    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        ".".repeat(width - filled),
        percent
    )
}

/// Console line for one event
pub fn render(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::StageChanged { stage } => format!("==> {}", stage),
        ProgressEvent::ProgressUpdated { percent } => format_bar(*percent, BAR_WIDTH),
        ProgressEvent::FileProcessed { file, status } => {
            let status = match status {
                FileStatus::Processed => "processed",
                FileStatus::Failed => "failed",
                FileStatus::Missing => "not found, skipped",
            };
            format!("    {}: {}", file, status)
        }
        ProgressEvent::Finished { outcome } => outcome.message().to_string(),
    }
}

/// Print events until the run drops its reporter.
///
/// # Returns
/// The outcome from the `Finished` event, if one arrived
pub async fn follow(progress_rx: &mut mpsc::UnboundedReceiver<ProgressEvent>) -> Option<RunOutcome> {
    let mut outcome = None;

    while let Some(event) = progress_rx.recv().await {
        if let ProgressEvent::Finished { outcome: finished } = event {
            outcome = Some(finished);
        }
        eprintln!("{}", render(&event));
    }

    outcome
}
