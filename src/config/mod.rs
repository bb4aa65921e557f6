use crate::models::{PackerSettings, ScsLists};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// File name of the external extraction tool inside the data directory
pub const CONVERTER_FILE_NAME: &str = "converter_pix.exe";

/// File name of the archive/accessory list inside the data directory
pub const SCS_FILES_NAME: &str = "scs_files.txt";

/// File name of the optional YAML settings inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.yaml";

const ETS2_MARKER: &str = "ets2_entries:";
const ATS_MARKER: &str = "ats_entries:";
const NEEDED_ACCS_MARKER: &str = "needed_accs:";

/// Required support files that are missing at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StartupError {
    #[error("PIX '{0}' not found. Application will exit.")]
    ConverterMissing(String),

    #[error("SCS files configuration '{0}' not found. Application will exit.")]
    ScsFilesMissing(String),
}

/// Locates and loads everything the packer reads from its data directory.
///
/// - `converter_pix.exe`: the external extractor (required)
/// - `scs_files.txt`: archive lists and accessory allow-list (required)
/// - `settings.yaml`: timeout and logging preferences (optional)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    data_dir: Utf8PathBuf,
    converter_path: Utf8PathBuf,
    scs_files_path: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager rooted at `data_dir` (usually `data`).
    ///
    /// Nothing is read or created here; see [`verify_support_files`](Self::verify_support_files).
    pub fn new<P: AsRef<Utf8Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();

        Self {
            converter_path: data_dir.join(CONVERTER_FILE_NAME),
            scs_files_path: data_dir.join(SCS_FILES_NAME),
            settings_path: data_dir.join(SETTINGS_FILE_NAME),
            data_dir,
        }
    }

    /// Check that both required support files exist.
    ///
    /// The converter is checked first, matching the order of the startup dialogs.
    pub fn verify_support_files(&self) -> Result<(), StartupError> {
        if !self.converter_path.exists() {
            return Err(StartupError::ConverterMissing(CONVERTER_FILE_NAME.to_string()));
        }

        if !self.scs_files_path.exists() {
            return Err(StartupError::ScsFilesMissing(SCS_FILES_NAME.to_string()));
        }

        Ok(())
    }

    /// Load the archive lists.
    ///
    /// Never fails: a missing or unreadable file is logged and yields empty lists, which the
    /// folder selection later reports as "no valid files".
    pub fn load_scs_lists(&self) -> ScsLists {
        match fs::read_to_string(&self.scs_files_path) {
            Ok(content) => {
                let lists = parse_scs_lists(&content);
                tracing::info!(
                    "Loaded SCS lists from {} - ets2: {}, ats: {}, needed_accs: {}",
                    self.scs_files_path,
                    lists.ets2_entries.len(),
                    lists.ats_entries.len(),
                    lists.needed_accs.len()
                );
                lists
            }
            Err(e) => {
                tracing::error!("Failed to load SCS files: {}", e);
                ScsLists::default()
            }
        }
    }

    /// Load the optional settings file.
    ///
    /// # Returns
    /// The loaded settings, or defaults if the file doesn't exist
    pub fn load_settings(&self) -> Result<PackerSettings> {
        if !self.settings_path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(PackerSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: PackerSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &PackerSettings) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {}", self.data_dir))?;
        }

        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn converter_path(&self) -> &Utf8Path {
        &self.converter_path
    }

    pub fn scs_files_path(&self) -> &Utf8Path {
        &self.scs_files_path
    }
}

/// Parse the brace-delimited list format.
///
/// ```text
/// ets2_entries: {
/// def.scs
/// dlc_krone.scs
/// }
/// needed_accs: {
/// f_intake_cab
/// }
/// ```
///
/// Each `}`-terminated section is matched against the three markers. Entries are the
/// trimmed, non-blank lines after the section's first `{`. A marker without a following
/// `{` leaves its list untouched; a repeated marker replaces the earlier list.
pub fn parse_scs_lists(content: &str) -> ScsLists {
    let mut lists = ScsLists::default();

    for section in content.split('}') {
        let target = if section.contains(ETS2_MARKER) {
            &mut lists.ets2_entries
        } else if section.contains(ATS_MARKER) {
            &mut lists.ats_entries
        } else if section.contains(NEEDED_ACCS_MARKER) {
            &mut lists.needed_accs
        } else {
            continue;
        };

        if let Some(body) = section.split('{').nth(1) {
            *target = body
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    lists
}
