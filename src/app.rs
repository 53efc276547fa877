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

//! The ground map window.
//!
//! Each frame polls a telemetry snapshot, updates the view, then paints tiles
//! (or placeholders while they load), the flight path, the home marker, the
//! aircraft and the status overlays. Tile I/O never happens on this thread.

use std::time::Duration;

use eframe::egui;
use log::info;
use map_tiles::{visible_tiles, TileCacheKey, TileManager, TILE_SIZE};
use telemetry_client::{TelemetryClient, TelemetryState};

use crate::map_view::{GeoPoint, MapView};
use crate::textures::TileTextures;

const PLACEHOLDER_COLOR: egui::Color32 = egui::Color32::from_rgb(50, 50, 55);
const PLACEHOLDER_EDGE_COLOR: egui::Color32 = egui::Color32::from_rgb(62, 62, 68);
const PATH_COLOR: (u8, u8, u8) = (255, 200, 0);
const AIRCRAFT_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 100, 100);
const HOME_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 200, 0, 200);
const OVERLAY_BG: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 170);

/// Telemetry is polled at least this often even without input.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const HELP_LINES: &[&str] = &[
    "+ / -         zoom in / out",
    "scroll        zoom",
    "arrows, WASD  pan",
    "drag          pan",
    "F             follow aircraft",
    "H             set home here",
    "C             clear flight path",
    "M             street / satellite",
    "F11           fullscreen",
    "F1, ?         this help",
    "Q, Esc        quit",
];

pub struct GroundMapApp {
    tiles: TileManager,
    textures: TileTextures,
    telemetry: TelemetryClient,
    view: MapView,
    show_help: bool,
}

impl std::fmt::Debug for GroundMapApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroundMapApp")
            .field("tiles", &self.tiles)
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

impl GroundMapApp {
    #[must_use]
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        tiles: TileManager,
        telemetry: TelemetryClient,
        view: MapView,
    ) -> Self {
        let ctx = cc.egui_ctx.clone();
        tiles.set_repaint_notifier(move || ctx.request_repaint());

        Self {
            tiles,
            textures: TileTextures::default(),
            telemetry,
            view,
            show_help: false,
        }
    }

    fn zoom_changed(&mut self) {
        // Tiles and textures of the old zoom are never drawn again
        self.tiles.clear_cache();
        self.textures.clear();
    }

    fn handle_keys(&mut self, ctx: &egui::Context, state: &TelemetryState) {
        let pressed = |key: egui::Key| ctx.input(|i| i.key_pressed(key));

        if (pressed(egui::Key::Plus) || pressed(egui::Key::Equals)) && self.view.zoom_in() {
            self.zoom_changed();
        }
        if pressed(egui::Key::Minus) && self.view.zoom_out() {
            self.zoom_changed();
        }

        let step = self.view.pan_step();
        if pressed(egui::Key::ArrowUp) || pressed(egui::Key::W) {
            self.view.pan(step, 0.0);
        }
        if pressed(egui::Key::ArrowDown) || pressed(egui::Key::S) {
            self.view.pan(-step, 0.0);
        }
        if pressed(egui::Key::ArrowLeft) || pressed(egui::Key::A) {
            self.view.pan(0.0, -step);
        }
        if pressed(egui::Key::ArrowRight) || pressed(egui::Key::D) {
            self.view.pan(0.0, step);
        }

        if pressed(egui::Key::F) {
            let follow = self.view.toggle_follow();
            info!("Follow aircraft: {}", if follow { "on" } else { "off" });
        }
        if pressed(egui::Key::H) {
            self.view.set_home(state);
        }
        if pressed(egui::Key::C) {
            self.view.clear_path();
        }
        if pressed(egui::Key::M) {
            let source = self.tiles.toggle_source();
            info!("Map source: {}", source);
        }
        if pressed(egui::Key::F1) || pressed(egui::Key::Questionmark) {
            self.show_help = !self.show_help;
        }
        if pressed(egui::Key::F11) {
            let fullscreen = ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!fullscreen));
        }
        if pressed(egui::Key::Q) || pressed(egui::Key::Escape) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn handle_pointer(&mut self, ctx: &egui::Context, response: &egui::Response) {
        if response.hovered() {
            let scroll = ctx.input(|i| i.raw_scroll_delta.y);
            let changed = if scroll > 0.0 {
                self.view.zoom_in()
            } else if scroll < 0.0 {
                self.view.zoom_out()
            } else {
                false
            };
            if changed {
                self.zoom_changed();
            }
        }

        if response.drag_started() {
            self.view.begin_drag();
        }
        if response.dragged() {
            let origin = ctx.input(|i| i.pointer.press_origin());
            if let (Some(origin), Some(pos)) = (origin, response.interact_pointer_pos()) {
                let delta = pos - origin;
                self.view.drag_to(f64::from(delta.x), f64::from(delta.y));
            }
        }
        if response.drag_stopped() {
            self.view.end_drag();
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "tile-plane offsets from the view center fit in f32"
    )]
    fn draw_tiles(&mut self, ctx: &egui::Context, painter: &egui::Painter, rect: egui::Rect) {
        let center = self.view.center();
        let (center_x, center_y) = self.view.center_pixel();
        let screen_center = rect.center();
        let source = self.tiles.source();
        #[allow(clippy::cast_precision_loss, reason = "tile size is 256")]
        let tile_size = TILE_SIZE as f32;
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        let placed = visible_tiles(
            center.lat,
            center.lon,
            self.view.zoom(),
            viewport_pixels(rect.width()),
            viewport_pixels(rect.height()),
        );

        for tile in placed {
            let (origin_x, origin_y) = tile.pixel_origin();
            let min = egui::pos2(
                screen_center.x + (origin_x - center_x) as f32,
                screen_center.y + (origin_y - center_y) as f32,
            );
            let tile_rect = egui::Rect::from_min_size(min, egui::vec2(tile_size, tile_size));
            if !rect.intersects(tile_rect) {
                continue;
            }

            if let Some(image) = self.tiles.get_tile_for(tile.coord, source) {
                let key = TileCacheKey::new(tile.coord, source);
                let texture = self.textures.get_or_upload(ctx, key, &image);
                painter.image(texture.id(), tile_rect, uv, egui::Color32::WHITE);
            } else {
                painter.rect_filled(tile_rect, 0.0, PLACEHOLDER_EDGE_COLOR);
                painter.rect_filled(tile_rect.shrink(1.0), 0.0, PLACEHOLDER_COLOR);
            }
        }
    }

    fn draw_flight_path(&self, painter: &egui::Painter, screen_center: egui::Pos2) {
        let path = self.view.flight_path();
        if path.len() < 2 {
            return;
        }

        let len = path.len();
        let points: Vec<egui::Pos2> = path
            .iter()
            .map(|p| self.view.to_screen(*p, screen_center))
            .collect();

        for (i, segment) in points.windows(2).enumerate() {
            // Older segments fade out
            let alpha = u8::try_from(100 + 155 * (i + 1) / len).unwrap_or(u8::MAX);
            let color =
                egui::Color32::from_rgba_unmultiplied(PATH_COLOR.0, PATH_COLOR.1, PATH_COLOR.2, alpha);
            painter.line_segment([segment[0], segment[1]], egui::Stroke::new(2.0, color));
        }
    }

    fn draw_home(&self, painter: &egui::Painter, rect: egui::Rect) {
        let Some(home) = self.view.home() else {
            return;
        };
        let pos = self.view.to_screen(home, rect.center());
        if !rect.contains(pos) {
            return;
        }

        painter.circle_filled(pos, 8.0, HOME_COLOR);
        painter.circle_stroke(pos, 8.0, egui::Stroke::new(2.0, egui::Color32::WHITE));
        painter.text(
            pos,
            egui::Align2::CENTER_CENTER,
            "H",
            egui::FontId::monospace(10.0),
            egui::Color32::WHITE,
        );
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "unit-circle offsets scaled to a few pixels"
    )]
    fn draw_aircraft(&self, painter: &egui::Painter, rect: egui::Rect, state: &TelemetryState) {
        if !state.has_fix() {
            return;
        }
        let pos = self
            .view
            .to_screen(GeoPoint::new(state.latitude, state.longitude), rect.center());
        if !rect.contains(pos) {
            return;
        }

        let heading = f64::from(state.heading).to_radians();
        let size = 15.0_f64;
        let at = |angle: f64, radius: f64| {
            pos + egui::vec2(
                (radius * angle.sin()) as f32,
                (-radius * angle.cos()) as f32,
            )
        };

        let nose = at(heading, size);
        let left = at(heading + 2.5, size * 0.7);
        let tail = at(heading + std::f64::consts::PI, size * 0.5);
        let right = at(heading - 2.5, size * 0.7);

        painter.add(egui::Shape::closed_line(
            vec![nose, left, tail, right],
            egui::Stroke::new(3.0, AIRCRAFT_COLOR),
        ));
        painter.circle_filled(pos, 3.0, egui::Color32::YELLOW);
    }

    /// Map and cache state, plus distance home when one is set.
    fn map_status(&self, state: &TelemetryState) -> String {
        let home = self
            .view
            .home_distance_bearing(state)
            .map(|(distance, bearing)| {
                format!("HOME {} {:03.0}°  |  ", format_distance(distance), bearing)
            })
            .unwrap_or_default();

        let tiles = if self.tiles.is_loading() {
            format!("  loading {}", self.tiles.in_flight_count())
        } else {
            String::new()
        };
        let failed = match self.tiles.failed_count() {
            0 => String::new(),
            n => format!("  {n} failed"),
        };

        format!(
            "{home}Z{} {} {}{tiles}{failed}  [{} tiles, {} tex]",
            self.view.zoom(),
            if self.view.is_following() { "FOLLOW" } else { "FREE" },
            self.tiles.source_name(),
            self.tiles.resident_count(),
            self.textures.len(),
        )
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: egui::Rect, state: &TelemetryState) {
        let bar = egui::Rect::from_min_max(
            egui::pos2(rect.left(), rect.bottom() - 38.0),
            rect.right_bottom(),
        );
        painter.rect_filled(bar, 0.0, OVERLAY_BG);

        let font = egui::FontId::monospace(12.0);
        let left = bar.left_top() + egui::vec2(8.0, 4.0);
        painter.text(
            left,
            egui::Align2::LEFT_TOP,
            telemetry_readout(state),
            font.clone(),
            egui::Color32::WHITE,
        );
        painter.text(
            left + egui::vec2(0.0, 16.0),
            egui::Align2::LEFT_TOP,
            self.map_status(state),
            font,
            egui::Color32::LIGHT_GRAY,
        );

        // Required by the tile provider
        painter.text(
            egui::pos2(rect.right() - 8.0, bar.top() - 4.0),
            egui::Align2::RIGHT_BOTTOM,
            "Tiles © Esri",
            egui::FontId::proportional(10.0),
            egui::Color32::from_white_alpha(200),
        );
    }

    fn draw_help(painter: &egui::Painter, rect: egui::Rect) {
        let font = egui::FontId::monospace(13.0);
        let line_height = 18.0;
        #[allow(clippy::cast_precision_loss, reason = "a dozen help lines")]
        let height = line_height * (HELP_LINES.len() as f32 + 2.0);
        let panel = egui::Rect::from_center_size(rect.center(), egui::vec2(320.0, height));

        painter.rect_filled(panel, 6.0, OVERLAY_BG);
        painter.text(
            panel.center_top() + egui::vec2(0.0, line_height * 0.5),
            egui::Align2::CENTER_TOP,
            "Controls",
            font.clone(),
            egui::Color32::YELLOW,
        );
        let mut pos = panel.left_top() + egui::vec2(16.0, line_height * 1.75);
        for line in HELP_LINES {
            painter.text(
                pos,
                egui::Align2::LEFT_TOP,
                *line,
                font.clone(),
                egui::Color32::WHITE,
            );
            pos.y += line_height;
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui, state: &TelemetryState) {
        let (response, painter) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        let ctx = ui.ctx().clone();

        self.handle_pointer(&ctx, &response);
        self.handle_keys(&ctx, state);

        painter.rect_filled(rect, 0.0, PLACEHOLDER_COLOR);
        self.draw_tiles(&ctx, &painter, rect);
        self.draw_flight_path(&painter, rect.center());
        self.draw_home(&painter, rect);
        self.draw_aircraft(&painter, rect, state);
        self.draw_status_bar(&painter, rect, state);
        if self.show_help {
            Self::draw_help(&painter, rect);
        }
    }
}

impl eframe::App for GroundMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(POLL_INTERVAL);

        let state = self.telemetry.state();
        self.view.update(&state);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_map(ui, &state);
            });
    }
}

/// One line covering every telemetry group: link, position, attitude,
/// battery, baro/vario and flight mode.
fn telemetry_readout(state: &TelemetryState) -> String {
    let link = if state.connected {
        format!(
            "LQ {}% {}/{}dBm SNR {} {}mW",
            state.link_quality, state.rssi1, state.rssi2, state.snr, state.tx_power
        )
    } else {
        "NO LINK".to_string()
    };

    let gps = if state.has_fix() {
        format!(
            "{:.5} {:.5} {}m {:.0}km/h {}sat",
            state.latitude, state.longitude, state.altitude, state.ground_speed, state.satellites
        )
    } else {
        "NO FIX".to_string()
    };

    let mut readout = format!(
        "{link}  {gps}  P{:+.0} R{:+.0} Y{:03.0}  {:.1}V {:.1}A {}mAh {}%  ALT {:.1}m VS {:+.1}m/s",
        state.pitch,
        state.roll,
        state.yaw,
        state.voltage,
        state.current,
        state.capacity,
        state.remaining,
        state.baro_altitude,
        state.vertical_speed,
    );
    if !state.flight_mode.is_empty() {
        readout.push_str("  ");
        readout.push_str(&state.flight_mode);
    }
    readout
}

/// Viewport extent in whole pixels for tile enumeration.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "clamped to a non-negative window dimension"
)]
fn viewport_pixels(extent: f32) -> u32 {
    extent.max(0.0).ceil() as u32
}

/// Distance for the status bar: meters below 1 km, kilometers above.
fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{meters:.0}m")
    } else {
        format!("{:.2}km", meters / 1000.0)
    }
}
