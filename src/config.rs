// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Persistent settings live in a TOML file managed by confy. Command-line
//! flags override them for a single run without being written back.

use std::path::PathBuf;

use clap::Parser;
use log::warn;
use map_tiles::{MapSource, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "elrs-groundmap";

/// Default telemetry server address
pub const DEFAULT_TELEMETRY_ADDRESS: &str = "localhost:10000";

/// Campinas, Brazil
const DEFAULT_LATITUDE: f64 = -22.9064;
const DEFAULT_LONGITUDE: f64 = -47.0616;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Telemetry server in host:port format
    #[serde(default = "default_telemetry_address")]
    pub telemetry_address: String,

    /// Root of the on-disk tile cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Map center before the first GPS fix
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_longitude")]
    pub default_longitude: f64,

    /// Initial zoom level (1 - 19)
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    /// "street" or "satellite"
    #[serde(default = "default_map_source")]
    pub map_source: String,

    #[serde(default = "default_window_width")]
    pub window_width: f32,

    #[serde(default = "default_window_height")]
    pub window_height: f32,

    #[serde(default)]
    pub fullscreen: bool,
}

// Default value functions for serde
fn default_telemetry_address() -> String {
    DEFAULT_TELEMETRY_ADDRESS.to_string()
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(|| PathBuf::from("tiles"), |dir| dir.join(APP_NAME).join("tiles"))
}

fn default_latitude() -> f64 {
    DEFAULT_LATITUDE
}

fn default_longitude() -> f64 {
    DEFAULT_LONGITUDE
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_map_source() -> String {
    MapSource::default().dir_name().to_string()
}

fn default_window_width() -> f32 {
    1024.0
}

fn default_window_height() -> f32 {
    600.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telemetry_address: default_telemetry_address(),
            cache_dir: default_cache_dir(),
            default_latitude: DEFAULT_LATITUDE,
            default_longitude: DEFAULT_LONGITUDE,
            default_zoom: DEFAULT_ZOOM,
            map_source: default_map_source(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            fullscreen: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, "config")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, "config", self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, "config")
    }

    /// Configured map source, falling back to the default on a bad value
    #[must_use]
    pub fn map_source(&self) -> MapSource {
        self.map_source.parse().unwrap_or_else(|e| {
            warn!("{}, using {}", e, MapSource::default());
            MapSource::default()
        })
    }

    /// Configured zoom clamped to the supported range
    #[must_use]
    pub fn zoom(&self) -> u8 {
        self.default_zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

/// Ground station moving map for ELRS telemetry
#[derive(Parser, Debug)]
#[command(name = APP_NAME, version, about)]
pub struct Cli {
    /// Telemetry server address (host:port)
    #[arg(long, visible_alias = "grpc")]
    pub telemetry: Option<String>,

    /// Tile cache directory
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Start fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Window width
    #[arg(long)]
    pub width: Option<f32>,

    /// Window height
    #[arg(long)]
    pub height: Option<f32>,

    /// Initial map center latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Initial map center longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Initial zoom level
    #[arg(long, value_parser = clap::value_parser!(u8).range(i64::from(MIN_ZOOM)..=i64::from(MAX_ZOOM)))]
    pub zoom: Option<u8>,

    /// Map source: street or satellite
    #[arg(long)]
    pub source: Option<MapSource>,

    /// Write the effective settings back to the config file
    #[arg(long)]
    pub save_config: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(address) = &self.telemetry {
            config.telemetry_address.clone_from(address);
        }
        if let Some(cache) = &self.cache {
            config.cache_dir.clone_from(cache);
        }
        if self.fullscreen {
            config.fullscreen = true;
        }
        if let Some(width) = self.width {
            config.window_width = width;
        }
        if let Some(height) = self.height {
            config.window_height = height;
        }
        if let Some(lat) = self.lat {
            config.default_latitude = lat;
        }
        if let Some(lon) = self.lon {
            config.default_longitude = lon;
        }
        if let Some(zoom) = self.zoom {
            config.default_zoom = zoom;
        }
        if let Some(source) = self.source {
            config.map_source = source.dir_name().to_string();
        }
    }
}
