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

//! Slippy-map tiles for the ground station map.
//!
//! Two layers that can be used independently:
//!
//! - **Projection layer**: Web Mercator conversions between lat/lon, tile
//!   indices and absolute pixels ([`WebMercator`])
//! - **Cache layer**: a non-blocking tile cache that resolves memory, then
//!   disk, then network, with at most one fetch per tile in flight
//!   ([`TileManager`])
//!
//! # Quick Start
//!
//! ```no_run
//! use map_tiles::{TileManager, DEFAULT_ZOOM};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let tiles = TileManager::new("tiles", runtime.handle().clone()).unwrap();
//!
//! // Called every frame from the render thread
//! for coord in tiles.get_tiles_for_view(-22.9064, -47.0616, DEFAULT_ZOOM, 800, 480) {
//!     match tiles.get_tile(coord) {
//!         Some(tile) => println!("{coord}: {}x{}", tile.width(), tile.height()),
//!         None => println!("{coord}: loading"),
//!     }
//! }
//! ```
//!
//! ## Projection Only
//!
//! ```
//! use map_tiles::WebMercator;
//!
//! let (x, y) = WebMercator::lat_lon_to_tile(-22.9064, -47.0616, 15);
//! assert_eq!((x, y), (12100, 18526));
//! ```

pub mod coord;
pub mod decode;
pub mod disk;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod projection;

pub use coord::{MapSource, TileCacheKey, TileCoord};
pub use decode::{decode_tile, TileImage};
pub use disk::DiskCache;
pub use error::TileError;
pub use fetch::{HttpFetcher, TileFetcher, REQUEST_TIMEOUT, USER_AGENT};
pub use manager::{visible_tiles, PlacedTile, RepaintNotifier, TileManager};
pub use projection::{WebMercator, DEFAULT_ZOOM, MAX_LATITUDE, MAX_ZOOM, MIN_ZOOM, TILE_SIZE};
