// Run state module
//
// A pack run walks a fixed sequence of stages. The ProgressReporter tracks the current
// stage and percentage and pushes every change into a channel, so the presentation layer
// never polls shared state.

use std::fmt;
use tokio::sync::mpsc;

/// Stages of one pack run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunStage {
    Idle,
    Validating,
    Extracting,
    LocatingAccessories,
    Cleaning,
    Packaging,
    RemovingTemp,
    Finalizing,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStage::Idle => "Idle",
            RunStage::Validating => "Validating inputs",
            RunStage::Extracting => "Extracting archives",
            RunStage::LocatingAccessories => "Locating accessory folders",
            RunStage::Cleaning => "Cleaning extracted files",
            RunStage::Packaging => "Packaging",
            RunStage::RemovingTemp => "Removing temporary folders",
            RunStage::Finalizing => "Finalizing",
            RunStage::Done => "Done",
        };
        f.write_str(label)
    }
}

/// What happened to one configured archive during extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Processed,
    Failed,
    Missing,
}

/// Final result of a run, derived from every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Files were extracted and every later stage succeeded
    Completed,

    /// Files were extracted but cleanup, packaging or temp removal failed or was skipped
    CompletedWithErrors,

    /// No configured archive was extracted
    NothingProcessed,

    Cancelled,
}

impl RunOutcome {
    /// Message shown to the user when the run ends
    pub fn message(self) -> &'static str {
        match self {
            RunOutcome::Completed => "Processing completed!",
            RunOutcome::CompletedWithErrors => {
                "Processing finished with errors. Check the log for details."
            }
            RunOutcome::NothingProcessed => "No files were successfully processed.",
            RunOutcome::Cancelled => "Processing was cancelled.",
        }
    }

    pub fn is_success(self) -> bool {
        self == RunOutcome::Completed
    }
}

/// Events pushed to the presentation layer while a run is active
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// The run entered a new stage
    StageChanged { stage: RunStage },

    /// Overall progress in percent (0.0 to 100.0)
    ProgressUpdated { percent: f32 },

    /// A configured archive has been handled
    FileProcessed { file: String, status: FileStatus },

    /// The run is over
    Finished { outcome: RunOutcome },
}

/// Producer side of the progress channel.
///
/// Stages only move forward and progress is clamped to `0..=100`. A dropped receiver is
/// fine: events are simply discarded.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<ProgressEvent>,
    stage: RunStage,
    percent: f32,
}

impl ProgressReporter {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx,
            stage: RunStage::Idle,
            percent: 0.0,
        }
    }

    /// Create a reporter together with the receiver the presentation layer listens on
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Move to `stage`.
    ///
    /// # Returns
    /// `false` (and no event) if `stage` is not after the current stage
    pub fn advance(&mut self, stage: RunStage) -> bool {
        if stage <= self.stage {
            tracing::warn!("Ignoring stage transition {} -> {}", self.stage, stage);
            return false;
        }

        tracing::debug!("Stage: {} -> {}", self.stage, stage);
        self.stage = stage;
        self.emit(ProgressEvent::StageChanged { stage });
        true
    }

    /// Report overall progress; unchanged values are not re-sent
    pub fn set_progress(&mut self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0);
        if (percent - self.percent).abs() < f32::EPSILON {
            return;
        }

        self.percent = percent;
        self.emit(ProgressEvent::ProgressUpdated { percent });
    }

    pub fn file_processed(&self, file: &str, status: FileStatus) {
        self.emit(ProgressEvent::FileProcessed {
            file: file.to_string(),
            status,
        });
    }

    /// Close the run: enter [`RunStage::Done`] and publish the outcome
    pub fn finish(&mut self, outcome: RunOutcome) {
        if self.stage != RunStage::Done {
            self.advance(RunStage::Done);
        }
        self.emit(ProgressEvent::Finished { outcome });
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    pub fn percent(&self) -> f32 {
        self.percent
    }

    fn emit(&self, event: ProgressEvent) {
        // Ignore send errors - it's OK if no one is listening
        let _ = self.tx.send(event);
    }
}
