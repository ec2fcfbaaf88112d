//! Code for loading program settings.
//!
//! Settings live in an optional `settings.toml` next to the model definition; a missing file
//! means defaults throughout.
use crate::input::read_toml;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// The name of the settings file within a model directory
const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Program settings from the settings file
#[derive(Deserialize, PartialEq, Debug, Default)]
pub struct Settings {
    /// The program log level; overridden by the `HEATHUB_LOG_LEVEL` environment variable
    #[serde(default)]
    pub log_level: Option<String>,
    /// Whether to write into an existing output directory
    #[serde(default)]
    pub overwrite: bool,
}

impl Settings {
    /// Read the settings file from the model directory, if present.
    pub fn from_path(model_dir: &Path) -> Result<Settings> {
        let file_path = model_dir.join(SETTINGS_FILE_NAME);
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(&file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_from_path_no_file() {
        let dir = tempdir().unwrap();
        assert_eq!(Settings::from_path(dir.path()).unwrap(), Settings::default());
    }

    #[test]
    fn test_settings_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(SETTINGS_FILE_NAME)).unwrap();
            writeln!(file, "log_level = \"warn\"\noverwrite = true").unwrap();
        }

        assert_eq!(
            Settings::from_path(dir.path()).unwrap(),
            Settings {
                log_level: Some("warn".to_string()),
                overwrite: true
            }
        );
    }
}
