//! Services module - the packing workflow, free of any UI code.
//!
//! # Components
//!
//! - [`extraction`]: runs `converter_pix` per archive ([`ExtractionService`], [`PixConverter`]),
//!   with a timeout and cancellation for every invocation
//! - [`version`]: reads the game version out of `version.scs`
//! - [`cleanup`]: keeps the accessory folders of the extracted tree and deletes the rest
//! - [`packaging`]: zips the cleaned tree into `<game>_<version>_packed_<MMDD_HHMMSS>.zip`
//! - [`pipeline`]: validates a folder selection and runs the stages above in order
//!   ([`PackPipeline`]), reporting progress through [`crate::state::ProgressReporter`]
//!
//! # Usage Example
//!
//! ```ignore
//! use scs_packer::services::{PackPipeline, PipelineOptions, PixConverter, validate_selection};
//! use scs_packer::state::ProgressReporter;
//!
//! let selection = validate_selection(&folder, &lists)?;
//! let converter = PixConverter::new("data/converter_pix.exe", Duration::from_secs(300));
//! let pipeline = PackPipeline::new(lists, converter, cancel_rx, PipelineOptions::default());
//!
//! let (mut reporter, progress_rx) = ProgressReporter::channel();
//! let report = pipeline.run(&selection, &mut reporter).await?;
//! println!("{}", report.outcome.message());
//! ```
//!
//! # Converter Integration
//!
//! The converter is called as `converter_pix -b <archive> -extract_d <subpath> -e <destdir>`.
//! Only its exit code is inspected; `-extract_d /` extracts a whole archive.

pub mod cleanup;
pub mod extraction;
pub mod packaging;
pub mod pipeline;
pub mod version;

pub use cleanup::{CleanupReport, FoundFolders, clean_directory, find_folders_to_keep};
pub use extraction::{
    Converter, ConverterInvocation, ExtractionError, ExtractionService, PixConverter,
    extraction_subpaths,
};
pub use packaging::{PackSummary, archive_file_name, pack_directory, package_output};
pub use pipeline::{
    PackPipeline, PipelineOptions, RunReport, Selection, SelectionError, remove_stale_work_dirs,
    validate_selection,
};
pub use version::{parse_version, read_game_version};
