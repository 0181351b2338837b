use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::averager::PatchSize;

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pixrat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_patch_width")]
    pub patch_width: u32,

    #[serde(default = "default_patch_height")]
    pub patch_height: u32,

    /// Compute patch colors on all cores
    #[serde(default)]
    pub parallel: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_patch_width() -> u32 {
    PatchSize::DEFAULT_WIDTH
}

fn default_patch_height() -> u32 {
    PatchSize::DEFAULT_HEIGHT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            patch_width: default_patch_width(),
            patch_height: default_patch_height(),
            parallel: false,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Settings {
    pub fn patch_size(&self) -> Result<PatchSize> {
        PatchSize::new(self.patch_width, self.patch_height).with_context(|| {
            format!(
                "Invalid patch size {}x{}: both sides must be at least 1",
                self.patch_width, self.patch_height
            )
        })
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.log_level
            .parse::<LevelFilter>()
            .ok()
            .with_context(|| format!("Invalid log level {:?}", self.log_level))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Loads `explicit` if given, otherwise the default config file when one
/// exists. A missing default file yields the defaults.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => load_settings_from_path(path),
        None => match default_config_path() {
            Some(path) if path.exists() => load_settings_from_path(&path),
            _ => Ok(Settings::default()),
        },
    }
}

pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {path:?}"))?;
    parse_settings(&content).with_context(|| format!("Failed to parse settings file {path:?}"))
}

pub fn parse_settings(content: &str) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    Ok(serde_yaml::from_str(content)?)
}
