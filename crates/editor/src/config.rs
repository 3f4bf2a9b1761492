use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const SERVER_URL_ENV_VAR: &str = "TUXEDO_SERVER_URL";
pub const REQUEST_TIMEOUT_ENV_VAR: &str = "TUXEDO_REQUEST_TIMEOUT_MS";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const PRELOAD_SUBDIRECTORY: &str = "preload";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("server.url '{url}' is not a valid absolute URL")]
    InvalidServerUrl { url: String },
    #[error("camera zoom bounds are inconsistent: min {min_zoom}, max {max_zoom}")]
    InvalidZoomBounds { min_zoom: f64, max_zoom: f64 },
}

/// Whether resolution answers survive across scene loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionCacheScope {
    #[default]
    PerScene,
    Session,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub assets_path: String,
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVER_URL.to_string(),
            assets_path: "/assets".to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub media_subdirectories: Vec<String>,
    pub resolution_cache_scope: ResolutionCacheScope,
}

impl Default for AssetConfig {
    fn default() -> Self {
        let media_subdirectories = [
            "games", "rooms", "interface", "artifacts", "clothing", "crumbs", "flash",
            "furniture", "igloos", "mainmenu", "misc", "music", "penguin", "postcards",
            PRELOAD_SUBDIRECTORY, "puffles", "shared", "sounds",
        ];
        Self {
            media_subdirectories: media_subdirectories.iter().map(ToString::to_string).collect(),
            resolution_cache_scope: ResolutionCacheScope::default(),
        }
    }
}

impl AssetConfig {
    pub fn has_preload_subdirectory(&self) -> bool {
        self.media_subdirectories
            .iter()
            .any(|name| name == PRELOAD_SUBDIRECTORY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub default_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pan_speed: f64,
    pub zoom_speed: f64,
    pub keyboard_zoom_step: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 3.0,
            pan_speed: 20.0,
            zoom_speed: 0.1,
            keyboard_zoom_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderConfig {
    pub default_width: f64,
    pub default_height: f64,
    pub line_width: f64,
    pub color: u32,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            default_width: 1520.0,
            default_height: 960.0,
            line_width: 4.0,
            color: 0xff0000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub camera: CameraConfig,
    pub border: BorderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSource {
    pub family: String,
    pub url: String,
}

fn default_fonts() -> Vec<FontSource> {
    [
        ("CCComicrazy", "/assets/fonts/CCComicrazy Regular.woff2"),
        ("CCFaceFront", "/assets/fonts/CCFaceFront.woff2"),
        ("Burbank Small", "/assets/fonts/Burbank Small Medium.woff2"),
        ("Arial", "/assets/fonts/Arial.woff2"),
    ]
    .iter()
    .map(|(family, url)| FontSource {
        family: family.to_string(),
        url: url.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub server: ServerConfig,
    pub assets: AssetConfig,
    pub editor: EditorSettings,
    pub fonts: Vec<FontSource>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            assets: AssetConfig::default(),
            editor: EditorSettings::default(),
            fonts: default_fonts(),
        }
    }
}

impl EditorConfig {
    /// Reads the optional JSON file, then applies `TUXEDO_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut deserializer = serde_json::Deserializer::from_str(&raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Invalid override values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(SERVER_URL_ENV_VAR) {
            match Url::parse(&value) {
                Ok(_) => self.server.url = value,
                Err(_) => {
                    warn!(
                        value = %value,
                        fallback_url = %self.server.url,
                        "server_url_override_invalid_using_configured"
                    );
                }
            }
        }

        if let Some(value) = lookup(REQUEST_TIMEOUT_ENV_VAR) {
            match value.parse::<u64>() {
                Ok(timeout_ms) if timeout_ms > 0 => self.server.request_timeout_ms = timeout_ms,
                _ => {
                    warn!(
                        value = %value,
                        fallback_timeout_ms = self.server.request_timeout_ms,
                        "request_timeout_override_invalid_using_configured"
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.server.url).is_err() {
            return Err(ConfigError::InvalidServerUrl {
                url: self.server.url.clone(),
            });
        }
        let camera = &self.editor.camera;
        if !(camera.min_zoom > 0.0 && camera.min_zoom <= camera.max_zoom) {
            return Err(ConfigError::InvalidZoomBounds {
                min_zoom: camera.min_zoom,
                max_zoom: camera.max_zoom,
            });
        }
        Ok(())
    }
}
