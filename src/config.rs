//! User configuration stored as JSON under the platform config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

pub const DEFAULT_OVERLAY_EDGE_DP: f32 = 150.0;
pub const DEFAULT_THUMBNAIL_EDGE: u32 = 160;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folders scanned for videos.
    pub library_dirs: Vec<PathBuf>,
    /// Longer edge of the floating player, in density-independent units.
    pub overlay_edge_dp: f32,
    /// Pixels per density-independent unit.
    pub display_density: f32,
    pub play_overlay_on_attach: bool,
    /// Longer edge of generated thumbnails, in pixels.
    pub thumbnail_edge: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            library_dirs: default_library_dirs(),
            overlay_edge_dp: DEFAULT_OVERLAY_EDGE_DP,
            display_density: 1.0,
            play_overlay_on_attach: true,
            thumbnail_edge: DEFAULT_THUMBNAIL_EDGE,
        }
    }
}

fn default_library_dirs() -> Vec<PathBuf> {
    dirs::video_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Videos")))
        .into_iter()
        .collect()
}

/// Get the path to the config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("floatreel").join("config.json"))
}

impl Config {
    /// Load the config, falling back to defaults when the file is missing or broken.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            log::warn!("No config directory available, using defaults");
            return Config::default();
        };
        match Config::load_from(&path) {
            Ok(Some(config)) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Ok(None) => Config::default(),
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Config::default()
            }
        }
    }

    /// Read a config file. A missing file is `Ok(None)`.
    pub fn load_from(path: &Path) -> Result<Option<Self>, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Config(format!("{}: {}", path.display(), e))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> Result<(), Error> {
        let path = config_path().ok_or_else(|| Error::Config("no config directory".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Config(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Add a library folder unless it is already present. Returns whether it was added.
    pub fn add_library_dir(&mut self, dir: PathBuf) -> bool {
        if self.library_dirs.contains(&dir) {
            return false;
        }
        self.library_dirs.push(dir);
        true
    }
}
