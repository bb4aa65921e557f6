//! Game version lookup.
//!
//! The installed game version lives in `version.sii` inside `version.scs`:
//!
//! ```text
//! SiiNunit
//! {
//! version_info : .version {
//!  version: "1.53.3.14s"
//! }
//! }
//! ```

use super::extraction::{Converter, ExtractionService};
use camino::Utf8Path;
use regex::Regex;
use std::fs;
use std::sync::LazyLock;

/// Archive holding the version file, looked up in the game folder
pub const VERSION_ARCHIVE: &str = "version.scs";

/// File extracted from [`VERSION_ARCHIVE`]
pub const VERSION_FILE: &str = "version.sii";

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"version:\s*"([^"]*)""#).expect("version pattern is valid")
});

/// Find the `version: "<value>"` entry in SII text
pub fn parse_version(content: &str) -> Option<String> {
    VERSION_PATTERN
        .captures(content)
        .map(|caps| caps[1].to_string())
}

/// Read the game version for `game_folder`.
///
/// Extracts `version.scs` completely into `extract_dir` and parses `version.sii`.
/// Returns `None` when the archive or the entry is missing, or when extraction fails;
/// failures are logged, never raised.
pub async fn read_game_version<C: Converter>(
    extraction: &ExtractionService<C>,
    game_folder: &Utf8Path,
    extract_dir: &Utf8Path,
) -> Option<String> {
    let archive = game_folder.join(VERSION_ARCHIVE);
    if !archive.is_file() {
        tracing::warn!("{} not found in {}, version unknown", VERSION_ARCHIVE, game_folder);
        return None;
    }

    match extraction.extract_all(&archive, extract_dir).await {
        Ok(0) => {}
        Ok(code) => {
            tracing::error!(
                "Error extracting version from {} (exit code {})",
                archive,
                code
            );
            return None;
        }
        Err(e) => {
            tracing::error!("Error extracting version from {}: {}", archive, e);
            return None;
        }
    }

    let version_file = extract_dir.join(VERSION_FILE);
    let bytes = match fs::read(&version_file) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", version_file, e);
            return None;
        }
    };

    let version = parse_version(&String::from_utf8_lossy(&bytes));
    match &version {
        Some(v) => tracing::info!("Detected game version {}", v),
        None => tracing::warn!("No version entry in {}", version_file),
    }
    version
}
