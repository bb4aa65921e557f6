use serde::{Deserialize, Serialize};
use std::fmt;

/// Archive and accessory lists parsed from `scs_files.txt`.
///
/// Built once at startup and shared read-only with every run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScsLists {
    /// Archives extracted for Euro Truck Simulator 2
    pub ets2_entries: Vec<String>,

    /// Archives extracted for American Truck Simulator
    pub ats_entries: Vec<String>,

    /// Accessory folder names that survive the cleanup pass
    pub needed_accs: Vec<String>,
}

impl ScsLists {
    /// Archive list configured for the given game
    pub fn files_for(&self, game: GameType) -> &[String] {
        match game {
            GameType::Ets2 => &self.ets2_entries,
            GameType::Ats => &self.ats_entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ets2_entries.is_empty() && self.ats_entries.is_empty() && self.needed_accs.is_empty()
    }
}

/// Game a selected installation folder belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameType {
    Ets2,
    Ats,
}

impl GameType {
    /// Detect the game from a folder path.
    ///
    /// Only the install folder names are recognised; ETS2 wins when both appear.
    pub fn detect(path: &str) -> Option<Self> {
        if path.contains("Euro Truck Simulator 2") {
            Some(GameType::Ets2)
        } else if path.contains("American Truck Simulator") {
            Some(GameType::Ats)
        } else {
            None
        }
    }

    /// Short token used in output archive names
    pub fn token(self) -> &'static str {
        match self {
            GameType::Ets2 => "ets2",
            GameType::Ats => "ats",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Ets2 => write!(f, "Euro Truck Simulator 2"),
            GameType::Ats => write!(f, "American Truck Simulator"),
        }
    }
}

/// Optional user settings from `settings.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackerSettings {
    /// Upper bound for a single converter invocation
    #[serde(default = "default_extraction_timeout")]
    pub extraction_timeout_secs: u64,

    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_console_output")]
    pub console_output: bool,
}

impl Default for PackerSettings {
    fn default() -> Self {
        Self {
            extraction_timeout_secs: default_extraction_timeout(),
            debug_mode: false,
            log_dir: default_log_dir(),
            console_output: default_console_output(),
        }
    }
}

fn default_extraction_timeout() -> u64 {
    300
}

fn default_log_dir() -> String {
    ".".to_string()
}

fn default_console_output() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = PackerSettings::default();
        assert_eq!(settings.extraction_timeout_secs, 300);
        assert_eq!(settings.log_dir, ".");
        assert!(!settings.debug_mode);
        assert!(settings.console_output);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: PackerSettings = serde_yaml_ng::from_str("debug_mode: true\n").unwrap();
        assert!(settings.debug_mode);
        assert_eq!(settings.extraction_timeout_secs, 300);
    }

    #[test]
    fn test_detect_game_type() {
        assert_eq!(
            GameType::detect("C:/Steam/steamapps/common/Euro Truck Simulator 2"),
            Some(GameType::Ets2)
        );
        assert_eq!(
            GameType::detect("D:/Games/American Truck Simulator/"),
            Some(GameType::Ats)
        );
        assert_eq!(GameType::detect("C:/Games/Farming Simulator 22"), None);
    }

    #[test]
    fn test_files_for_game() {
        let lists = ScsLists {
            ets2_entries: vec!["def.scs".to_string()],
            ats_entries: vec!["dlc_kenworth_t680.scs".to_string()],
            needed_accs: Vec::new(),
        };

        assert_eq!(lists.files_for(GameType::Ets2), ["def.scs".to_string()]);
        assert_eq!(lists.files_for(GameType::Ats), ["dlc_kenworth_t680.scs".to_string()]);
        assert_eq!(GameType::Ats.token(), "ats");
    }
}
