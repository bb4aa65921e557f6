use camino::{Utf8Path, Utf8PathBuf};
use std::future::Future;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::timeout;

/// Archive that carries the desktop and hookup definitions besides trucks and trailers
pub const DEFINITIONS_ARCHIVE: &str = "def.scs";

/// Sub-paths requested from `def.scs`
pub const DEFINITION_SUBPATHS: [&str; 4] = [
    "/def/desktop/",
    "/def/vehicle/truck/",
    "/def/vehicle/trailer_owned/",
    "/def/vehicle/addon_hookups/",
];

/// Sub-paths requested from every other archive (DLCs, mods)
pub const VEHICLE_SUBPATHS: [&str; 2] = ["/def/vehicle/truck/", "/def/vehicle/trailer_owned/"];

/// Sub-path that extracts an archive completely
pub const FULL_EXTRACTION_SUBPATH: &str = "/";

/// Errors that prevent a converter invocation from completing.
///
/// A non-zero exit code is not an error here; callers decide what it means.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to start converter {exe}: {source}")]
    Spawn {
        exe: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Converter timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to wait for converter: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Extraction cancelled")]
    Cancelled,
}

/// One call of the converter: extract `subpath` of `archive` into `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterInvocation {
    pub archive: Utf8PathBuf,
    pub subpath: String,
    pub destination: Utf8PathBuf,
}

impl ConverterInvocation {
    pub fn new(archive: &Utf8Path, subpath: &str, destination: &Utf8Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            subpath: subpath.to_string(),
            destination: destination.to_path_buf(),
        }
    }

    /// Command-line arguments in the order the converter expects:
    /// `-b <archive> -extract_d <subpath> -e <destination>`
    pub fn args(&self) -> Vec<String> {
        vec![
            "-b".to_string(),
            self.archive.to_string(),
            "-extract_d".to_string(),
            self.subpath.clone(),
            "-e".to_string(),
            self.destination.to_string(),
        ]
    }
}

/// Something that can run a [`ConverterInvocation`] and report its exit code.
///
/// [`PixConverter`] runs the real executable; tests substitute a recorder.
pub trait Converter: Send + Sync {
    fn run(
        &self,
        invocation: &ConverterInvocation,
    ) -> impl Future<Output = Result<i32, ExtractionError>> + Send;
}

/// Runs `converter_pix` as a subprocess.
///
/// Output streams are captured and discarded. Each run is bounded by `timeout`; a child
/// that outlives it (or whose future is dropped on cancellation) is killed.
#[derive(Debug, Clone)]
pub struct PixConverter {
    exe: Utf8PathBuf,
    timeout: Duration,
}

impl PixConverter {
    pub fn new(exe: impl Into<Utf8PathBuf>, timeout: Duration) -> Self {
        Self {
            exe: exe.into(),
            timeout,
        }
    }
}

impl Converter for PixConverter {
    fn run(
        &self,
        invocation: &ConverterInvocation,
    ) -> impl Future<Output = Result<i32, ExtractionError>> + Send {
        let args = invocation.args();

        async move {
            tracing::debug!("Executing: {} {}", self.exe, args.join(" "));
            let start = Instant::now();

            let mut cmd = Command::new(self.exe.as_std_path());
            cmd.args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = cmd.spawn().map_err(|source| ExtractionError::Spawn {
                exe: self.exe.to_string(),
                source,
            })?;

            let output = timeout(self.timeout, child.wait_with_output())
                .await
                .map_err(|_| {
                    tracing::warn!("Converter timed out after {:?}", self.timeout);
                    ExtractionError::Timeout(self.timeout)
                })?
                .map_err(ExtractionError::Wait)?;

            let exit_code = output.status.code().unwrap_or(-1);
            tracing::debug!(
                "Converter finished in {:.2}s with exit code {}",
                start.elapsed().as_secs_f32(),
                exit_code
            );

            Ok(exit_code)
        }
    }
}

/// Sub-paths to request for an archive, chosen by its file name
pub fn extraction_subpaths(file_name: &str) -> &'static [&'static str] {
    if file_name == DEFINITIONS_ARCHIVE {
        &DEFINITION_SUBPATHS
    } else {
        &VEHICLE_SUBPATHS
    }
}

/// Drives a [`Converter`] for whole archives.
///
/// Every invocation races the cancellation signal; once it fires the in-flight invocation
/// is dropped and [`ExtractionError::Cancelled`] is returned.
pub struct ExtractionService<C> {
    converter: C,
    cancel_rx: watch::Receiver<bool>,
}

impl<C: Converter> ExtractionService<C> {
    pub fn new(converter: C, cancel_rx: watch::Receiver<bool>) -> Self {
        Self {
            converter,
            cancel_rx,
        }
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Run one invocation, aborting it if cancellation is requested
    pub async fn invoke(&self, invocation: &ConverterInvocation) -> Result<i32, ExtractionError> {
        if self.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        let mut cancel_rx = self.cancel_rx.clone();
        tokio::select! {
            result = self.converter.run(invocation) => result,
            _ = wait_for_cancel(&mut cancel_rx) => {
                tracing::warn!("Extraction cancelled during {}", invocation.archive);
                Err(ExtractionError::Cancelled)
            }
        }
    }

    /// Extract the vehicle definition sub-paths of one archive into `destination`.
    ///
    /// A non-zero exit code is logged and the remaining sub-paths are still requested.
    /// An invocation that cannot complete (spawn failure, timeout, cancellation) stops the
    /// archive and is returned as the error.
    pub async fn extract_archive(
        &self,
        archive: &Utf8Path,
        destination: &Utf8Path,
    ) -> Result<(), ExtractionError> {
        let file_name = archive.file_name().unwrap_or(archive.as_str());

        for subpath in extraction_subpaths(file_name) {
            let invocation = ConverterInvocation::new(archive, subpath, destination);

            match self.invoke(&invocation).await {
                Ok(0) => tracing::info!("{} processed successfully ({}).", file_name, subpath),
                Ok(code) => tracing::error!(
                    "Error processing {} ({}): converter exited with code {}",
                    file_name,
                    subpath,
                    code
                ),
                Err(e) => {
                    tracing::error!("Exception processing {}: {}", file_name, e);
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Extract an archive completely; returns the converter's exit code
    pub async fn extract_all(
        &self,
        archive: &Utf8Path,
        destination: &Utf8Path,
    ) -> Result<i32, ExtractionError> {
        let invocation = ConverterInvocation::new(archive, FULL_EXTRACTION_SUBPATH, destination);
        self.invoke(&invocation).await
    }
}

/// Resolves once the watch value becomes `true`; never resolves if the sender is gone.
async fn wait_for_cancel(cancel_rx: &mut watch::Receiver<bool>) {
    loop {
        if *cancel_rx.borrow_and_update() {
            return;
        }
        if cancel_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
