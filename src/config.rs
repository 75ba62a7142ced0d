//! User preferences stored in `settings.toml` under the platform config
//! directory. Every field is optional; missing ones fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::Result;

const CONFIG_FILE: &str = "settings.toml";
pub const APP_NAME: &str = "PhotoEditor";

pub const DEFAULT_RESET_DURATION_SECS: f32 = 0.3;
pub const DEFAULT_WINDOW_SIZE: [f32; 2] = [800.0, 600.0];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library_dir: Option<PathBuf>,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default)]
    pub corner_radius: Option<f32>,
    #[serde(default)]
    pub reset_duration_secs: Option<f32>,
    #[serde(default)]
    pub window_width: Option<f32>,
    #[serde(default)]
    pub window_height: Option<f32>,
}

impl Config {
    pub fn library_dir(&self) -> PathBuf {
        self.library_dir.clone().unwrap_or_else(|| {
            dirs::picture_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
        })
    }

    pub fn corner_radius(&self) -> f32 {
        self.corner_radius.filter(|r| r.is_finite()).unwrap_or(0.0).max(0.0)
    }

    pub fn reset_duration_secs(&self) -> f32 {
        self.reset_duration_secs
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(DEFAULT_RESET_DURATION_SECS)
    }

    pub fn window_size(&self) -> [f32; 2] {
        let side = |value: Option<f32>, default: f32| {
            value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(default)
        };
        [
            side(self.window_width, DEFAULT_WINDOW_SIZE[0]),
            side(self.window_height, DEFAULT_WINDOW_SIZE[1]),
        ]
    }

    /// Every field filled in with the value actually in effect.
    pub fn with_defaults(&self) -> Config {
        let [width, height] = self.window_size();
        Config {
            library_dir: Some(self.library_dir()),
            font_path: self.font_path.clone(),
            corner_radius: Some(self.corner_radius()),
            reset_duration_secs: Some(self.reset_duration_secs()),
            window_width: Some(width),
            window_height: Some(height),
        }
    }
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

/// Loads the settings file, writing one with the defaults on first run so
/// there is something to edit.
pub fn load_or_create() -> Result<Config> {
    let Some(path) = get_default_config_path() else {
        return Ok(Config::default());
    };
    if path.exists() {
        return load_from_path(&path);
    }
    let config = Config::default().with_defaults();
    match save(&config) {
        Ok(()) => info!(path = %path.display(), "wrote default settings"),
        Err(err) => warn!(%err, "could not write default settings"),
    }
    Ok(config)
}

pub fn save(config: &Config) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content).unwrap_or_default())
}

pub fn save_to_path(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
    fs::write(path, content)?;
    Ok(())
}
