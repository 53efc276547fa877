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

//! Map view state: where the map is looking and what the operator has marked.
//!
//! Pure state machine driven by key/mouse input and telemetry snapshots. The
//! renderer reads it each frame; nothing here touches tiles or the GPU.

use std::collections::VecDeque;

use eframe::egui;
use log::info;
use map_tiles::{WebMercator, MAX_ZOOM, MIN_ZOOM};
use telemetry_client::TelemetryState;

/// Oldest flight path points are dropped beyond this.
pub const MAX_PATH_POINTS: usize = 1000;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    fn from_state(state: &TelemetryState) -> Self {
        Self::new(state.latitude, state.longitude)
    }
}

/// Great-circle distance in meters (haversine).
#[must_use]
pub fn haversine_distance_m(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing in degrees, normalized to `[0, 360)`.
#[must_use]
pub fn initial_bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lon = (to.lon - from.lon).to_radians();

    let x = delta_lon.sin() * lat2_rad.cos();
    let y = lat1_rad.cos() * lat2_rad.sin() - lat1_rad.sin() * lat2_rad.cos() * delta_lon.cos();

    x.atan2(y).to_degrees().rem_euclid(360.0)
}

#[derive(Debug)]
pub struct MapView {
    center: GeoPoint,
    zoom: u8,
    follow: bool,
    home: Option<GeoPoint>,
    flight_path: VecDeque<GeoPoint>,
    /// Center in tile-plane pixels when the current drag began.
    drag_anchor: Option<(f64, f64)>,
}

impl MapView {
    /// A view centered on `center`, following the aircraft.
    #[must_use]
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        let mut view = Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            follow: true,
            home: None,
            flight_path: VecDeque::new(),
            drag_anchor: None,
        };
        view.set_center(center);
        view
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    #[must_use]
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    #[must_use]
    pub fn is_following(&self) -> bool {
        self.follow
    }

    #[must_use]
    pub fn home(&self) -> Option<GeoPoint> {
        self.home
    }

    /// Recorded positions, oldest first.
    #[must_use]
    pub fn flight_path(&self) -> &VecDeque<GeoPoint> {
        &self.flight_path
    }

    /// Returns `true` if the zoom level changed.
    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(self.zoom.saturating_add(1))
    }

    /// Returns `true` if the zoom level changed.
    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(self.zoom.saturating_sub(1))
    }

    fn set_zoom(&mut self, zoom: u8) -> bool {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        // Anchor pixels belong to the old zoom
        self.drag_anchor = None;
        true
    }

    /// Degrees moved by one pan key press, halving with each zoom level.
    #[must_use]
    pub fn pan_step(&self) -> f64 {
        0.001 * 2f64.powi(18 - i32::from(self.zoom))
    }

    /// Shift the center by a lat/lon delta. Stops following.
    pub fn pan(&mut self, d_lat: f64, d_lon: f64) {
        self.follow = false;
        self.set_center(GeoPoint::new(self.center.lat + d_lat, self.center.lon + d_lon));
    }

    pub fn begin_drag(&mut self) {
        self.drag_anchor = Some(WebMercator::lat_lon_to_pixel(
            self.center.lat,
            self.center.lon,
            self.zoom,
        ));
    }

    /// Move the map so the point under the drag start follows the pointer.
    ///
    /// `(dx, dy)` is the pointer offset in screen pixels since
    /// [`MapView::begin_drag`]. Stops following.
    pub fn drag_to(&mut self, dx: f64, dy: f64) {
        let Some((anchor_x, anchor_y)) = self.drag_anchor else {
            return;
        };
        self.follow = false;
        let (lat, lon) = WebMercator::pixel_to_lat_lon(anchor_x - dx, anchor_y - dy, self.zoom);
        self.set_center(GeoPoint::new(lat, lon));
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    /// Record the aircraft position and recenter when following.
    pub fn update(&mut self, state: &TelemetryState) {
        if !state.has_fix() {
            return;
        }

        let position = GeoPoint::from_state(state);
        // Frames outpace telemetry; repeat positions add nothing to the trail
        if self.flight_path.back() != Some(&position) {
            self.flight_path.push_back(position);
        }
        while self.flight_path.len() > MAX_PATH_POINTS {
            self.flight_path.pop_front();
        }

        if self.follow {
            self.set_center(position);
        }
    }

    /// Mark the aircraft's current position as home. Needs a fix.
    pub fn set_home(&mut self, state: &TelemetryState) -> bool {
        if !state.has_fix() {
            return false;
        }
        let home = GeoPoint::from_state(state);
        info!("Home set to {:.6}, {:.6}", home.lat, home.lon);
        self.home = Some(home);
        true
    }

    pub fn clear_path(&mut self) {
        self.flight_path.clear();
    }

    /// Returns the new follow state.
    pub fn toggle_follow(&mut self) -> bool {
        self.follow = !self.follow;
        self.follow
    }

    /// Distance (m) and bearing (deg) from the aircraft back to home.
    #[must_use]
    pub fn home_distance_bearing(&self, state: &TelemetryState) -> Option<(f64, f64)> {
        let home = self.home?;
        if !state.has_fix() {
            return None;
        }
        let aircraft = GeoPoint::from_state(state);
        Some((
            haversine_distance_m(aircraft, home),
            initial_bearing_deg(aircraft, home),
        ))
    }

    /// Screen position of a point, given where the view center is drawn.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "screen offsets are far inside f32 range"
    )]
    pub fn to_screen(&self, point: GeoPoint, screen_center: egui::Pos2) -> egui::Pos2 {
        let (cx, cy) = self.center_pixel();
        let (px, py) = WebMercator::lat_lon_to_pixel(point.lat, point.lon, self.zoom);
        egui::pos2(
            screen_center.x + (px - cx) as f32,
            screen_center.y + (py - cy) as f32,
        )
    }

    /// View center in tile-plane pixels at the current zoom.
    #[must_use]
    pub fn center_pixel(&self) -> (f64, f64) {
        WebMercator::lat_lon_to_pixel(self.center.lat, self.center.lon, self.zoom)
    }

    fn set_center(&mut self, point: GeoPoint) {
        let lon = if (-180.0..180.0).contains(&point.lon) {
            point.lon
        } else {
            (point.lon + 180.0).rem_euclid(360.0) - 180.0
        };
        self.center = GeoPoint::new(WebMercator::clamp_latitude(point.lat), lon);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPINAS: GeoPoint = GeoPoint {
        lat: -22.9064,
        lon: -47.0616,
    };

    fn fix(lat: f64, lon: f64) -> TelemetryState {
        TelemetryState {
            latitude: lat,
            longitude: lon,
            has_gps: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_haversine_distance() {
        // One degree of latitude is ~111.19 km
        let d = haversine_distance_m(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 10.0);

        // Campinas to Sao Paulo (Se) is roughly 84 km
        let d = haversine_distance_m(CAMPINAS, GeoPoint::new(-23.5505, -46.6333));
        assert!((d - 84_000.0).abs() < 3_000.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = GeoPoint::new(0.0, 0.0);
        let cases = [
            (GeoPoint::new(1.0, 0.0), 0.0),
            (GeoPoint::new(0.0, 1.0), 90.0),
            (GeoPoint::new(-1.0, 0.0), 180.0),
            (GeoPoint::new(0.0, -1.0), 270.0),
        ];
        for (to, expected) in cases {
            let bearing = initial_bearing_deg(origin, to);
            assert!((bearing - expected).abs() < 1e-6, "{bearing} != {expected}");
            assert!((0.0..360.0).contains(&bearing));
        }
    }

    #[test]
    fn test_zoom_is_clamped_and_reports_change() {
        let mut view = MapView::new(CAMPINAS, MAX_ZOOM);
        assert!(!view.zoom_in());
        assert_eq!(view.zoom(), MAX_ZOOM);
        assert!(view.zoom_out());
        assert_eq!(view.zoom(), MAX_ZOOM - 1);

        let mut view = MapView::new(CAMPINAS, 0);
        assert_eq!(view.zoom(), MIN_ZOOM);
        assert!(!view.zoom_out());
        assert!(view.zoom_in());
    }

    #[test]
    fn test_pan_step_halves_per_zoom() {
        let view = MapView::new(CAMPINAS, 18);
        assert!((view.pan_step() - 0.001).abs() < 1e-12);
        let view = MapView::new(CAMPINAS, 15);
        assert!((view.pan_step() - 0.008).abs() < 1e-12);
    }

    #[test]
    fn test_pan_stops_following() {
        let mut view = MapView::new(CAMPINAS, 15);
        assert!(view.is_following());
        view.pan(view.pan_step(), 0.0);
        assert!(!view.is_following());
        assert!((view.center().lat - (CAMPINAS.lat + 0.008)).abs() < 1e-9);

        view.update(&fix(-22.0, -47.0));
        assert!((view.center().lat - (CAMPINAS.lat + 0.008)).abs() < 1e-9);
    }

    #[test]
    fn test_pan_wraps_longitude_and_clamps_latitude() {
        let mut view = MapView::new(GeoPoint::new(84.9, 179.9), 3);
        view.pan(5.0, 0.5);
        assert!(view.center().lat <= map_tiles::MAX_LATITUDE);
        assert!((view.center().lon + 179.6).abs() < 1e-9);
    }

    #[test]
    fn test_follow_recenters_and_records_path() {
        let mut view = MapView::new(CAMPINAS, 15);
        view.update(&fix(-22.91, -47.06));
        view.update(&fix(-22.92, -47.05));
        assert_eq!(view.center(), GeoPoint::new(-22.92, -47.05));
        assert_eq!(view.flight_path().len(), 2);

        // Same snapshot polled again on the next frame
        view.update(&fix(-22.92, -47.05));
        assert_eq!(view.flight_path().len(), 2);

        // No fix: nothing recorded
        view.update(&TelemetryState::default());
        view.update(&fix(0.0, 0.0));
        assert_eq!(view.flight_path().len(), 2);

        view.clear_path();
        assert!(view.flight_path().is_empty());
    }

    #[test]
    fn test_flight_path_is_bounded() {
        let mut view = MapView::new(CAMPINAS, 15);
        for i in 0..(MAX_PATH_POINTS + 25) {
            #[allow(clippy::cast_precision_loss, reason = "small test indices")]
            let offset = i as f64 * 1e-5;
            view.update(&fix(CAMPINAS.lat + offset, CAMPINAS.lon));
        }
        assert_eq!(view.flight_path().len(), MAX_PATH_POINTS);
        let oldest = view.flight_path().front().unwrap();
        assert!((oldest.lat - (CAMPINAS.lat + 25.0 * 1e-5)).abs() < 1e-9);
    }

    #[test]
    fn test_home_needs_fix() {
        let mut view = MapView::new(CAMPINAS, 15);
        assert!(!view.set_home(&TelemetryState::default()));
        assert!(view.home().is_none());
        assert!(view.home_distance_bearing(&fix(1.0, 1.0)).is_none());

        assert!(view.set_home(&fix(0.0, 1.0)));
        // 0,0 is not a fix
        assert!(view.home_distance_bearing(&fix(0.0, 0.0)).is_none());

        let (distance, bearing) = view.home_distance_bearing(&fix(1.0, 1.0)).unwrap();
        assert!((distance - 111_195.0).abs() < 10.0);
        assert!((bearing - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_drag_moves_center_by_pixels() {
        let mut view = MapView::new(CAMPINAS, 15);
        let (cx, cy) = view.center_pixel();

        view.drag_to(10.0, 10.0);
        assert!(view.is_following(), "drag without anchor is ignored");

        view.begin_drag();
        view.drag_to(256.0, -128.0);
        view.drag_to(256.0, -128.0);
        view.end_drag();

        let (nx, ny) = view.center_pixel();
        assert!((nx - (cx - 256.0)).abs() < 1e-6);
        assert!((ny - (cy + 128.0)).abs() < 1e-6);
        assert!(!view.is_following());
    }

    #[test]
    fn test_to_screen_places_center_at_screen_center() {
        let view = MapView::new(CAMPINAS, 15);
        let screen_center = egui::pos2(400.0, 240.0);
        assert_eq!(view.to_screen(CAMPINAS, screen_center), screen_center);

        let (lat, lon) = {
            let (cx, cy) = view.center_pixel();
            WebMercator::pixel_to_lat_lon(cx + 100.0, cy - 50.0, 15)
        };
        let pos = view.to_screen(GeoPoint::new(lat, lon), screen_center);
        assert!((pos.x - 500.0).abs() < 0.01);
        assert!((pos.y - 190.0).abs() < 0.01);
    }
}
