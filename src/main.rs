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

mod app;
mod config;
mod map_view;
mod textures;

use clap::Parser;
use eframe::egui;
use log::{info, warn};
use map_tiles::TileManager;
use telemetry_client::{ClientConfig, ConnectionConfig, TelemetryClient};

use crate::app::GroundMapApp;
use crate::config::{AppConfig, Cli};
use crate::map_view::{GeoPoint, MapView};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Could not load config, using defaults: {}", e);
        AppConfig::default()
    });
    cli.apply(&mut config);

    if cli.save_config {
        match config.save() {
            Ok(()) => {
                if let Ok(path) = AppConfig::get_config_path() {
                    info!("Saved config to {}", path.display());
                }
            }
            Err(e) => warn!("Could not save config: {}", e),
        }
    }

    // Tile fetches and the telemetry socket share this runtime; the UI owns the main thread
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("groundmap-io")
        .build()?;

    let tiles = TileManager::new(&config.cache_dir, runtime.handle().clone())?;
    tiles.set_source(config.map_source());
    info!(
        "Tile cache at {} ({})",
        config.cache_dir.display(),
        tiles.source_name()
    );

    let telemetry = TelemetryClient::new(
        ClientConfig {
            connection: ConnectionConfig {
                address: config.telemetry_address.clone(),
                ..Default::default()
            },
        },
        runtime.handle().clone(),
    );
    telemetry.connect();
    telemetry.start_stream();

    let view = MapView::new(
        GeoPoint::new(config.default_latitude, config.default_longitude),
        config.zoom(),
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_fullscreen(config.fullscreen)
            .with_title("ELRS Ground Map"),
        ..Default::default()
    };

    eframe::run_native(
        "ELRS Ground Map",
        options,
        Box::new(move |cc| Ok(Box::new(GroundMapApp::new(cc, tiles, telemetry, view)))),
    )?;

    runtime.shutdown_timeout(std::time::Duration::from_secs(1));
    Ok(())
}
