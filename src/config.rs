use std::{env, path::PathBuf};

use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::window::geometry::Viewport;
use crate::window::layout::{Arrangement, LayoutSettings};

const CONFIG: &str = include_str!("../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub config_dir: PathBuf,
}

/// Tunables for the window workspace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Viewports narrower than this maximize every window
    pub narrow_breakpoint: u32,
    /// Offset between cascaded windows, in pixels
    pub cascade_step: u32,
    /// Arrangement used for a fresh workspace and on restore failure
    pub default_arrangement: Arrangement,
    pub default_viewport: Viewport,
    /// Highlight flashes requested when an already-open window is focused
    pub highlight_pulses: u32,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            narrow_breakpoint: 1024,
            cascade_step: 40,
            default_arrangement: Arrangement::SmartTile,
            default_viewport: Viewport::default(),
            highlight_pulses: 1,
        }
    }
}

impl WorkspaceSettings {
    pub fn layout(&self) -> LayoutSettings {
        LayoutSettings {
            narrow_breakpoint: self.narrow_breakpoint,
            cascade_step: self.cascade_step,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub workspace: WorkspaceSettings,
}

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref DATA_FOLDER: Option<PathBuf> =
        env::var(format!("{}_DATA", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
    pub static ref CONFIG_FOLDER: Option<PathBuf> =
        env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
            .ok()
            .map(PathBuf::from);
}

impl Config {
    /// Layer the embedded defaults, then the given file (required) or the
    /// home config file (only if present).
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.to_string_lossy().to_string())?
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5));

        let selected = match config_path {
            Some(p) => Some((expand_tilde(p), true)),
            None => {
                let home_cfg = default_home_config_path();
                home_cfg.exists().then_some((home_cfg, false))
            }
        };
        if let Some((path, required)) = selected {
            tracing::debug!("Reading config from {}", path.display());
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json5)
                    .required(required),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// The defaults compiled into the binary.
    pub fn embedded() -> Result<Self, json5::Error> {
        json5::from_str(CONFIG)
    }
}

fn expand_tilde(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with('~') {
            if let Some(base) = BaseDirs::new() {
                return PathBuf::from(s.replacen('~', base.home_dir().to_str().unwrap_or(""), 1));
            }
        }
    }
    path.clone()
}

fn default_home_config_path() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".corpusdesk-config.json5");
    }
    PathBuf::from(".corpusdesk-config.json5")
}

pub fn get_data_dir() -> PathBuf {
    if let Some(s) = DATA_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_config_dir() -> PathBuf {
    if let Some(s) = CONFIG_FOLDER.clone() {
        s
    } else {
        PathBuf::from(".").join(".config")
    }
}
