//! Configuration loading for the dashboard.
//!
//! Every key is optional. Without a config file the dashboard talks to the analysis
//! service on `http://127.0.0.1:8000` and shows the CARTO light basemap.

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "ecoscan.toml";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TILE_URL: &str = "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png";
pub const DEFAULT_TILE_ATTRIBUTION: &str = "© OpenStreetMap contributors © CARTO";

/// Top-level dashboard configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DashboardConfig {
    /// Base URL of the analysis service (without the /analyze suffix)
    pub backend_url: String,
    /// Request timeout in seconds; the transport default applies when unset
    pub request_timeout_secs: Option<u64>,
    pub map: MapConfig,
}

/// Settings for the geographic view.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MapConfig {
    /// Initial map center as `[latitude, longitude]`.
    pub center: [f64; 2],
    /// Initial zoom level.
    pub zoom: f64,
    /// Tile URL template with `{s}`, `{z}`, `{x}`, `{y}` and `{r}` placeholders.
    pub tile_url: String,
    pub tile_attribution: String,
    pub tiles_enabled: bool,
    /// Optional equirectangular world image painted under the markers when tiles are off.
    pub background_image: Option<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            request_timeout_secs: None,
            map: MapConfig::default(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: [20.0, 140.0],
            zoom: 2.0,
            tile_url: DEFAULT_TILE_URL.to_string(),
            tile_attribution: DEFAULT_TILE_ATTRIBUTION.to_string(),
            tiles_enabled: true,
            background_image: None,
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(config_path).with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `config_path` if it exists, falling back to defaults otherwise.
    ///
    /// A file that exists but cannot be parsed is reported and ignored rather than
    /// preventing the dashboard from starting.
    pub fn load_or_default(config_path: &Path) -> Self {
        if !config_path.exists() {
            log::info!("No {} found, using default configuration", config_path.display());
            return Self::default();
        }

        match Self::load(config_path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", config_path.display());
                config
            }
            Err(e) => {
                log::error!("{:#}", e);
                Self::default()
            }
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DashboardConfig::parse("").unwrap();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.map.center, [20.0, 140.0]);
        assert_eq!(config.map.zoom, 2.0);
        assert!(config.map.tiles_enabled);
    }

    #[test]
    fn kebab_case_keys_override_defaults() {
        let config = DashboardConfig::parse(
            r#"
backend-url = "http://10.0.0.5:9000"
request-timeout-secs = 120

[map]
zoom = 4.5
tiles-enabled = false
background-image = "world.png"
"#,
        )
        .unwrap();

        assert_eq!(config.backend_url, "http://10.0.0.5:9000");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.map.zoom, 4.5);
        assert!(!config.map.tiles_enabled);
        assert_eq!(config.map.background_image.as_deref(), Some("world.png"));
        assert_eq!(config.map.tile_url, DEFAULT_TILE_URL);
    }

    #[test]
    fn broken_file_is_an_error_but_falls_back() {
        assert!(DashboardConfig::parse("backend-url = [").is_err());

        let dir = std::env::temp_dir().join(format!("ecoscan-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        std::fs::write(&path, "backend-url = 42").unwrap();

        assert!(DashboardConfig::load(&path).is_err());
        assert_eq!(DashboardConfig::load_or_default(&path).backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(DashboardConfig::load_or_default(&dir.join("missing.toml")).backend_url, DEFAULT_BACKEND_URL);
    }
}
