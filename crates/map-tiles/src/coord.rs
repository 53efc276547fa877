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

//! Tile addressing: coordinates, map sources and cache keys.

use std::fmt;
use std::str::FromStr;

const ESRI_STREET_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Street_Map/MapServer/tile";
const ESRI_IMAGERY_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile";

/// Integer tile indices at an integer zoom level.
///
/// `x` is expected in `[0, 2^zoom)` after wrapping; `y` is never wrapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileCoord {
    #[must_use]
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Upstream tile provider / map style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MapSource {
    /// ESRI World Street Map
    Street,
    /// ESRI World Imagery
    #[default]
    Satellite,
}

impl MapSource {
    /// Directory name used for this source inside the disk cache.
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Street => "street",
            Self::Satellite => "satellite",
        }
    }

    /// Human-readable name for status displays.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Street => "Street",
            Self::Satellite => "Satellite",
        }
    }

    /// The other source.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Street => Self::Satellite,
            Self::Satellite => Self::Street,
        }
    }

    /// Tile URL for `coord`.
    ///
    /// ESRI MapServer orders the path as `{z}/{y}/{x}`, not the `{z}/{x}/{y}`
    /// used by OSM-style servers.
    #[must_use]
    pub fn tile_url(self, coord: TileCoord) -> String {
        let base = match self {
            Self::Street => ESRI_STREET_URL,
            Self::Satellite => ESRI_IMAGERY_URL,
        };
        format!("{}/{}/{}/{}", base, coord.zoom, coord.y, coord.x)
    }
}

impl fmt::Display for MapSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for MapSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "street" => Ok(Self::Street),
            "satellite" | "sat" => Ok(Self::Satellite),
            other => Err(format!("unknown map source: {other}")),
        }
    }
}

/// Identifies one raster tile: a coordinate rendered by a particular source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    pub coord: TileCoord,
    pub source: MapSource,
}

impl TileCacheKey {
    #[must_use]
    pub fn new(coord: TileCoord, source: MapSource) -> Self {
        Self { coord, source }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.source.tile_url(self.coord)
    }
}

impl fmt::Display for TileCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.source.dir_name(), self.coord)
    }
}
