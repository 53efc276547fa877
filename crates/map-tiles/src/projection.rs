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

//! Web Mercator (slippy map) projection.
//!
//! Pure conversions between geographic coordinates, tile indices and pixel
//! positions on the infinite tile plane at a given zoom level. Nothing here
//! allocates or fails; inputs outside the Mercator latitude band produce
//! out-of-range tile rows.

use std::f64::consts::PI;

/// Edge length of one raster tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Lowest zoom level the map will display.
pub const MIN_ZOOM: u8 = 1;

/// Highest zoom level the upstream providers serve.
pub const MAX_ZOOM: u8 = 19;

/// Zoom level used before the operator changes it.
pub const DEFAULT_ZOOM: u8 = 15;

/// Latitude at which the Mercator square ends (`atan(sinh(pi))` in degrees).
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Web Mercator projection utilities
#[derive(Debug, Clone, Copy)]
pub struct WebMercator;

impl WebMercator {
    /// Number of tiles along one axis at `zoom`.
    #[must_use]
    pub fn tiles_per_axis(zoom: u8) -> u32 {
        1_u32 << zoom
    }

    /// Fractional tile column of a longitude
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = f64::from(Self::tiles_per_axis(zoom));
        (lon + 180.0) / 360.0 * n
    }

    /// Fractional tile row of a latitude
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let n = f64::from(Self::tiles_per_axis(zoom));
        let lat_rad = lat.to_radians();
        (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n
    }

    /// Longitude of the western edge of tile column `x` (fractional allowed).
    #[must_use]
    pub fn x_to_lon(x: f64, zoom: u8) -> f64 {
        let n = f64::from(Self::tiles_per_axis(zoom));
        x / n * 360.0 - 180.0
    }

    /// Latitude of the northern edge of tile row `y` (fractional allowed).
    #[must_use]
    pub fn y_to_lat(y: f64, zoom: u8) -> f64 {
        let n = f64::from(Self::tiles_per_axis(zoom));
        (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
    }

    /// Convert a geographic position to the indices of the tile containing it.
    ///
    /// Callers are expected to clamp `lat` with [`clamp_latitude`] first; a
    /// latitude beyond the Mercator band yields a row outside `[0, 2^zoom)`.
    ///
    /// [`clamp_latitude`]: Self::clamp_latitude
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "tile indices at zoom <= 19 fit comfortably in i32"
    )]
    pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> (i32, i32) {
        let x = Self::lon_to_x(lon, zoom).floor() as i32;
        let y = Self::lat_to_y(lat, zoom).floor() as i32;
        (x, y)
    }

    /// Convert a geographic position to absolute pixel coordinates on the
    /// tile plane at `zoom`.
    #[must_use]
    pub fn lat_lon_to_pixel(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
        let size = f64::from(TILE_SIZE);
        (
            Self::lon_to_x(lon, zoom) * size,
            Self::lat_to_y(lat, zoom) * size,
        )
    }

    /// Inverse of [`lat_lon_to_pixel`](Self::lat_lon_to_pixel).
    #[must_use]
    pub fn pixel_to_lat_lon(px: f64, py: f64, zoom: u8) -> (f64, f64) {
        let size = f64::from(TILE_SIZE);
        (Self::y_to_lat(py / size, zoom), Self::x_to_lon(px / size, zoom))
    }

    /// Geographic position of the top-left corner of tile `(x, y)`.
    #[must_use]
    pub fn tile_to_lat_lon(x: i32, y: i32, zoom: u8) -> (f64, f64) {
        (
            Self::y_to_lat(f64::from(y), zoom),
            Self::x_to_lon(f64::from(x), zoom),
        )
    }

    /// Clamp a latitude into the band Web Mercator can represent.
    #[must_use]
    pub fn clamp_latitude(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPINAS: (f64, f64) = (-22.9064, -47.0616);

    #[test]
    fn test_origin_tile() {
        assert_eq!(WebMercator::lat_lon_to_tile(0.0, 0.0, 1), (1, 1));
        assert_eq!(WebMercator::lat_lon_to_tile(0.0, -180.0, 3), (0, 4));
        assert_eq!(WebMercator::lat_lon_to_tile(MAX_LATITUDE - 1e-9, 179.999, 2), (3, 0));
    }

    #[test]
    fn test_campinas_tile_corner_is_close() {
        let (lat, lon) = CAMPINAS;
        let (x, y) = WebMercator::lat_lon_to_tile(lat, lon, 15);
        assert_eq!((x, y), (12100, 18526));

        let (corner_lat, corner_lon) = WebMercator::tile_to_lat_lon(x, y, 15);
        assert!((corner_lat - lat).abs() < 0.01);
        assert!((corner_lon - lon).abs() < 0.01);
        // Top-left corner: north of and west of the point
        assert!(corner_lat >= lat);
        assert!(corner_lon <= lon);
    }

    #[test]
    fn test_round_trip_within_one_tile() {
        for zoom in [MIN_ZOOM, 5, 10, DEFAULT_ZOOM, MAX_ZOOM] {
            let n = f64::from(WebMercator::tiles_per_axis(zoom));
            let tile_lon = 360.0 / n;
            for lat in [-85.0, -60.5, -22.9064, 0.0, 12.34, 51.4778, 84.9] {
                for lon in [-179.9, -47.0616, 0.0, 2.3522, 179.9] {
                    let (x, y) = WebMercator::lat_lon_to_tile(lat, lon, zoom);
                    let (corner_lat, corner_lon) = WebMercator::tile_to_lat_lon(x, y, zoom);
                    let (next_lat, _) = WebMercator::tile_to_lat_lon(x, y + 1, zoom);

                    assert!(corner_lon <= lon && lon - corner_lon < tile_lon + 1e-9);
                    assert!(corner_lat >= lat && lat >= next_lat - 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_corner_reprojects_to_same_tile() {
        for zoom in [MIN_ZOOM, 7, DEFAULT_ZOOM, MAX_ZOOM] {
            let n = i32::try_from(WebMercator::tiles_per_axis(zoom)).unwrap();
            for (x, y) in [(0, 0), (n / 3, n / 2), (n - 1, n - 1)] {
                let (lat, lon) = WebMercator::tile_to_lat_lon(x, y, zoom);
                // Nudge inside the tile to stay clear of the shared edge
                let eps = 1e-9;
                assert_eq!(
                    WebMercator::lat_lon_to_tile(lat - eps, lon + eps, zoom),
                    (x, y)
                );
            }
        }
    }

    #[test]
    fn test_pixel_agrees_with_tile() {
        let (lat, lon) = CAMPINAS;
        let (px, py) = WebMercator::lat_lon_to_pixel(lat, lon, 15);
        let (x, y) = WebMercator::lat_lon_to_tile(lat, lon, 15);
        let size = f64::from(TILE_SIZE);

        assert_eq!((px / size).floor(), f64::from(x));
        assert_eq!((py / size).floor(), f64::from(y));

        let (back_lat, back_lon) = WebMercator::pixel_to_lat_lon(px, py, 15);
        assert!((back_lat - lat).abs() < 1e-9);
        assert!((back_lon - lon).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_latitude() {
        assert_eq!(WebMercator::clamp_latitude(90.0), MAX_LATITUDE);
        assert_eq!(WebMercator::clamp_latitude(-90.0), -MAX_LATITUDE);
        assert_eq!(WebMercator::clamp_latitude(45.0), 45.0);

        let (_, y) = WebMercator::lat_lon_to_tile(MAX_LATITUDE - 1e-9, 0.0, 4);
        assert_eq!(y, 0);
        let (_, y) = WebMercator::lat_lon_to_tile(-MAX_LATITUDE + 1e-9, 0.0, 4);
        assert_eq!(y, 15);
    }
}
