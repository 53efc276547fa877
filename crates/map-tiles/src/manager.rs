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

//! Tile cache manager.
//!
//! Resolves tiles memory -> disk -> network without ever blocking the caller.
//! A miss schedules one background fetch per key on the tokio runtime and
//! returns `None`; the render loop asks again next frame. Decoded tiles live
//! in memory until [`TileManager::clear_cache`] and are never evicted
//! otherwise, so memory grows with the area browsed at one zoom level.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use dashmap::{DashMap, DashSet};
use log::{debug, warn};
use tokio::runtime::Handle;

use crate::coord::{MapSource, TileCacheKey, TileCoord};
use crate::decode::{decode_tile, TileImage};
use crate::disk::DiskCache;
use crate::error::TileError;
use crate::fetch::{HttpFetcher, TileFetcher};
use crate::projection::{WebMercator, TILE_SIZE};

/// Callback fired whenever a tile becomes resident (e.g. to request a repaint).
pub type RepaintNotifier = Arc<dyn Fn() + Send + Sync>;

/// A tile in the view block, with its unwrapped column for screen placement.
///
/// `coord.x` is wrapped into `[0, 2^zoom)` for fetching; `column` is the
/// position on the unwrapped tile plane, so a view straddling the
/// antimeridian places tiles correctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedTile {
    pub coord: TileCoord,
    pub column: i32,
    pub row: i32,
}

impl PlacedTile {
    /// Absolute pixel position of the tile's top-left corner on the tile plane.
    #[must_use]
    pub fn pixel_origin(&self) -> (f64, f64) {
        let size = f64::from(TILE_SIZE);
        (f64::from(self.column) * size, f64::from(self.row) * size)
    }
}

struct Inner<F> {
    disk: DiskCache,
    fetcher: F,
    tiles: DashMap<TileCacheKey, Arc<TileImage>>,
    in_flight: DashSet<TileCacheKey>,
    source: RwLock<MapSource>,
    failed: AtomicUsize,
    notifier: OnceLock<RepaintNotifier>,
}

/// Owns a key's in-flight marker and removes it on drop.
///
/// Created before the fetch task is spawned and moved into it, so the marker
/// goes away whether the task finishes, panics, or is dropped unpolled.
struct InFlightGuard<F: TileFetcher> {
    inner: Arc<Inner<F>>,
    key: TileCacheKey,
}

impl<F: TileFetcher> Drop for InFlightGuard<F> {
    fn drop(&mut self) {
        self.inner.in_flight.remove(&self.key);
    }
}

impl<F: TileFetcher> InFlightGuard<F> {
    async fn load_tile(self) {
        self.inner.load_tile(self.key).await;
    }
}

impl<F: TileFetcher> Inner<F> {
    async fn load_tile(&self, key: TileCacheKey) {
        if self.tiles.contains_key(&key) {
            return;
        }

        match self.resolve(key).await {
            Ok(tile) => self.publish(key, tile),
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Tile {} unavailable: {}", key, e);
            }
        }
    }

    async fn resolve(&self, key: TileCacheKey) -> Result<TileImage, TileError> {
        match self.disk.read(&key).await {
            Ok(bytes) => match decode_off_thread(bytes).await {
                Ok(tile) => {
                    debug!("Loaded tile {} from disk cache", key);
                    return Ok(tile);
                }
                Err(e) => warn!("Ignoring unreadable cached tile {}: {}", key, e),
            },
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!("Failed to read cached tile {}: {}", key, e),
        }

        let bytes = self.fetcher.fetch(&key.url()).await?;

        if let Err(e) = self.disk.write(&key, &bytes).await {
            warn!("Failed to save tile {} to cache: {}", key, e);
        }

        decode_off_thread(bytes).await
    }

    fn publish(&self, key: TileCacheKey, tile: TileImage) {
        self.tiles.insert(key, Arc::new(tile));
        if let Some(notify) = self.notifier.get() {
            notify();
        }
    }
}

async fn decode_off_thread(bytes: Vec<u8>) -> Result<TileImage, TileError> {
    tokio::task::spawn_blocking(move || decode_tile(&bytes))
        .await
        .map_err(|e| TileError::Decode(format!("decode task failed: {e}")))?
}

/// Memory/disk/network tile cache with per-key fetch deduplication.
pub struct TileManager<F: TileFetcher = HttpFetcher> {
    inner: Arc<Inner<F>>,
    runtime: Handle,
}

impl<F: TileFetcher> fmt::Debug for TileManager<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileManager")
            .field("cache_dir", &self.inner.disk.root())
            .field("source", &self.source())
            .field("resident", &self.inner.tiles.len())
            .field("in_flight", &self.inner.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl TileManager<HttpFetcher> {
    /// Create a manager that downloads over HTTP and persists under `cache_dir`.
    ///
    /// Fetch tasks are spawned on `runtime`; the caller may be any thread.
    pub fn new(cache_dir: impl Into<PathBuf>, runtime: Handle) -> Result<Self, TileError> {
        Ok(Self::with_fetcher(cache_dir, HttpFetcher::new()?, runtime))
    }
}

impl<F: TileFetcher> TileManager<F> {
    pub fn with_fetcher(cache_dir: impl Into<PathBuf>, fetcher: F, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Inner {
                disk: DiskCache::new(cache_dir),
                fetcher,
                tiles: DashMap::new(),
                in_flight: DashSet::new(),
                source: RwLock::new(MapSource::default()),
                failed: AtomicUsize::new(0),
                notifier: OnceLock::new(),
            }),
            runtime,
        }
    }

    /// Install the callback fired after each tile is published.
    ///
    /// Only the first notifier is kept; returns `false` if one was already set.
    pub fn set_repaint_notifier(&self, notifier: impl Fn() + Send + Sync + 'static) -> bool {
        self.inner.notifier.set(Arc::new(notifier)).is_ok()
    }

    #[must_use]
    pub fn disk_cache(&self) -> &DiskCache {
        &self.inner.disk
    }

    /// Get a tile for the active source, scheduling a fetch on a miss.
    #[must_use]
    pub fn get_tile(&self, coord: TileCoord) -> Option<Arc<TileImage>> {
        self.get_tile_for(coord, self.source())
    }

    /// Get a resident tile or schedule its fetch. Never blocks on I/O.
    ///
    /// `None` means "not yet available": draw a placeholder and ask again on
    /// a later frame. At most one fetch per key is outstanding at a time.
    #[must_use]
    pub fn get_tile_for(&self, coord: TileCoord, source: MapSource) -> Option<Arc<TileImage>> {
        let key = TileCacheKey::new(coord, source);

        if let Some(tile) = self.inner.tiles.get(&key) {
            return Some(Arc::clone(tile.value()));
        }

        if self.inner.in_flight.insert(key) {
            // A fetch may have published and cleared its marker since the lookup above
            if let Some(tile) = self.inner.tiles.get(&key) {
                self.inner.in_flight.remove(&key);
                return Some(Arc::clone(tile.value()));
            }

            let guard = InFlightGuard {
                inner: Arc::clone(&self.inner),
                key,
            };
            self.runtime.spawn(guard.load_tile());
        }

        None
    }

    /// Tiles covering a viewport centered on `(center_lat, center_lon)`.
    ///
    /// Columns wrap around the antimeridian; rows beyond the poles are
    /// dropped. Each coordinate appears once even when the block is wider
    /// than the world. Order is unspecified.
    #[must_use]
    pub fn get_tiles_for_view(
        &self,
        center_lat: f64,
        center_lon: f64,
        zoom: u8,
        viewport_width: u32,
        viewport_height: u32,
    ) -> Vec<TileCoord> {
        let mut seen = HashSet::new();
        visible_tiles(center_lat, center_lon, zoom, viewport_width, viewport_height)
            .into_iter()
            .map(|placed| placed.coord)
            .filter(|coord| seen.insert(*coord))
            .collect()
    }

    pub fn set_source(&self, source: MapSource) {
        *self.inner.source.write().unwrap_or_else(PoisonError::into_inner) = source;
    }

    #[must_use]
    pub fn source(&self) -> MapSource {
        *self.inner.source.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch between street and satellite, returning the new source.
    ///
    /// Cached tiles of the previous source stay resident.
    pub fn toggle_source(&self) -> MapSource {
        let mut source = self.inner.source.write().unwrap_or_else(PoisonError::into_inner);
        *source = source.toggled();
        *source
    }

    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source().display_name()
    }

    /// Drop every decoded tile. The disk cache is left alone.
    ///
    /// A fetch completing concurrently lands wholly before or after the clear.
    pub fn clear_cache(&self) {
        let dropped = self.inner.tiles.len();
        self.inner.tiles.clear();
        debug!("Cleared {} tiles from memory", dropped);
    }

    #[must_use]
    pub fn is_resident(&self, coord: TileCoord, source: MapSource) -> bool {
        self.inner
            .tiles
            .contains_key(&TileCacheKey::new(coord, source))
    }

    /// True while any fetch is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        !self.inner.in_flight.is_empty()
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    #[must_use]
    pub fn resident_count(&self) -> usize {
        self.inner.tiles.len()
    }

    /// Fetch attempts that ended without a tile since this manager was created.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.inner.failed.load(Ordering::Relaxed)
    }
}

/// The view block with unwrapped placement, for the renderer.
///
/// Unlike [`TileManager::get_tiles_for_view`] a column that
/// wraps onto an already listed tile is kept, since it is drawn twice.
#[must_use]
pub fn visible_tiles(
    center_lat: f64,
    center_lon: f64,
    zoom: u8,
    viewport_width: u32,
    viewport_height: u32,
) -> Vec<PlacedTile> {
    let (center_x, center_y) = WebMercator::lat_lon_to_tile(center_lat, center_lon, zoom);

    // Two spare tiles per axis cover partial tiles at both edges
    let tiles_wide = tile_span(viewport_width);
    let tiles_high = tile_span(viewport_height);

    let start_x = center_x - tiles_wide / 2;
    let start_y = center_y - tiles_high / 2;

    let max_tile = i64::from(WebMercator::tiles_per_axis(zoom));
    let mut tiles = Vec::new();

    for row in start_y..start_y + tiles_high {
        if row < 0 || i64::from(row) >= max_tile {
            continue;
        }
        for column in start_x..start_x + tiles_wide {
            let wrapped = i64::from(column).rem_euclid(max_tile);
            let (Ok(x), Ok(y)) = (u32::try_from(wrapped), u32::try_from(row)) else {
                continue;
            };
            tiles.push(PlacedTile {
                coord: TileCoord::new(x, y, zoom),
                column,
                row,
            });
        }
    }

    tiles
}

#[allow(
    clippy::cast_possible_wrap,
    reason = "viewport spans are a handful of tiles"
)]
fn tile_span(pixels: u32) -> i32 {
    pixels.div_ceil(TILE_SIZE) as i32 + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::tests::encoded_tile;
    use image::ImageFormat;
    use std::sync::atomic::AtomicU16;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    type Manager = TileManager<HttpFetcher>;

    fn view(lat: f64, lon: f64, zoom: u8, w: u32, h: u32) -> Vec<TileCoord> {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let manager = Manager::new(std::env::temp_dir(), runtime.handle().clone()).unwrap();
        manager.get_tiles_for_view(lat, lon, zoom, w, h)
    }

    #[test]
    fn test_campinas_view_is_contiguous_block() {
        let tiles = view(-22.9064, -47.0616, 15, 800, 480);
        assert_eq!(tiles.len(), 6 * 4);

        let unique: HashSet<_> = tiles.iter().copied().collect();
        assert_eq!(unique.len(), tiles.len());

        let min_x = tiles.iter().map(|t| t.x).min().unwrap();
        let max_x = tiles.iter().map(|t| t.x).max().unwrap();
        let min_y = tiles.iter().map(|t| t.y).min().unwrap();
        let max_y = tiles.iter().map(|t| t.y).max().unwrap();
        assert_eq!((max_x - min_x + 1, max_y - min_y + 1), (6, 4));

        // The tile under the view center is part of the block
        assert!(tiles.contains(&TileCoord::new(12100, 18526, 15)));
        assert!(tiles.iter().all(|t| t.zoom == 15));
    }

    #[test]
    fn test_view_wraps_x_and_drops_poles() {
        for zoom in 1..=6 {
            let n = WebMercator::tiles_per_axis(zoom);
            for (lat, lon) in [(85.0, 179.9), (-85.0, -179.9), (0.0, 0.0), (60.0, -179.99)] {
                let tiles = view(lat, lon, zoom, 1280, 1024);
                assert!(!tiles.is_empty());
                for tile in &tiles {
                    assert!(tile.x < n, "x {} out of range at zoom {}", tile.x, zoom);
                    assert!(tile.y < n, "y {} out of range at zoom {}", tile.y, zoom);
                }
                let unique: HashSet<_> = tiles.iter().copied().collect();
                assert_eq!(unique.len(), tiles.len());
            }
        }
    }

    #[test]
    fn test_antimeridian_placement_stays_unwrapped() {
        let placed = visible_tiles(0.0, 179.99, 4, 512, 256);
        let columns: Vec<i32> = placed.iter().map(|p| p.column).collect();
        assert!(columns.contains(&16));
        let wrapped = placed.iter().find(|p| p.column == 16).unwrap();
        assert_eq!(wrapped.coord.x, 0);
        assert_eq!(wrapped.pixel_origin().0, 16.0 * 256.0);
    }

    #[test]
    fn test_tile_span_margin() {
        assert_eq!(tile_span(0), 2);
        assert_eq!(tile_span(256), 3);
        assert_eq!(tile_span(257), 4);
        assert_eq!(tile_span(800), 6);
        assert_eq!(tile_span(480), 4);
    }

    #[test]
    fn test_source_switching() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let manager = Manager::new(std::env::temp_dir(), runtime.handle().clone()).unwrap();

        assert_eq!(manager.source(), MapSource::Satellite);
        assert_eq!(manager.source_name(), "Satellite");
        assert_eq!(manager.toggle_source(), MapSource::Street);
        assert_eq!(manager.source(), MapSource::Street);
        manager.set_source(MapSource::Satellite);
        assert_eq!(manager.source(), MapSource::Satellite);
    }

    #[derive(Debug)]
    struct MockState {
        urls: Mutex<Vec<String>>,
        status: AtomicU16,
        body: Vec<u8>,
        gate: Semaphore,
    }

    /// Serves a fixed body, records every request and can hold requests open.
    #[derive(Debug, Clone)]
    struct MockFetcher(Arc<MockState>);

    impl MockFetcher {
        fn with_permits(body: Vec<u8>, permits: usize) -> Self {
            Self(Arc::new(MockState {
                urls: Mutex::new(Vec::new()),
                status: AtomicU16::new(200),
                body,
                gate: Semaphore::new(permits),
            }))
        }

        fn new(body: Vec<u8>) -> Self {
            Self::with_permits(body, Semaphore::MAX_PERMITS)
        }

        /// Requests block until [`MockFetcher::release`].
        fn gated(body: Vec<u8>) -> Self {
            Self::with_permits(body, 0)
        }

        fn release(&self) {
            self.0.gate.add_permits(1024);
        }

        fn calls(&self) -> usize {
            self.0.urls.lock().unwrap().len()
        }

        fn urls(&self) -> Vec<String> {
            self.0.urls.lock().unwrap().clone()
        }

        fn respond_with(&self, status: u16) {
            self.0.status.store(status, Ordering::SeqCst);
        }
    }

    impl TileFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, TileError> {
            self.0.urls.lock().unwrap().push(url.to_string());
            let _permit = self.0.gate.acquire().await.unwrap();

            let status = self.0.status.load(Ordering::SeqCst);
            if status != 200 {
                return Err(TileError::HttpStatus {
                    url: url.to_string(),
                    status,
                });
            }
            Ok(self.0.body.clone())
        }
    }

    const CAMPINAS: TileCoord = TileCoord {
        x: 12100,
        y: 18526,
        zoom: 15,
    };

    fn manager_with(fetcher: &MockFetcher) -> (TileManager<MockFetcher>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let manager = TileManager::with_fetcher(dir.path(), fetcher.clone(), Handle::current());
        (manager, dir)
    }

    async fn wait_idle<F: TileFetcher>(manager: &TileManager<F>) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while manager.is_loading() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("tile fetches did not settle");
    }

    async fn wait_for_calls(fetcher: &MockFetcher, calls: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while fetcher.calls() < calls {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("fetcher was never called");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_misses_share_one_fetch() {
        let fetcher = MockFetcher::gated(encoded_tile(ImageFormat::Png));
        let (manager, _dir) = manager_with(&fetcher);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        assert!(manager.get_tile(CAMPINAS).is_none());
                    }
                });
            }
        });

        assert_eq!(manager.in_flight_count(), 1);
        assert!(manager.is_loading());
        wait_for_calls(&fetcher, 1).await;

        fetcher.release();
        wait_idle(&manager).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            fetcher.urls(),
            vec!["https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/15/18526/12100".to_string()]
        );
        assert!(manager.is_resident(CAMPINAS, MapSource::Satellite));
        assert_eq!(manager.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_resident_tile_is_served_from_memory() {
        let fetcher = MockFetcher::new(encoded_tile(ImageFormat::Jpeg));
        let (manager, _dir) = manager_with(&fetcher);

        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        for _ in 0..10 {
            let tile = manager.get_tile(CAMPINAS).expect("tile should be resident");
            assert_eq!(tile.size(), [256, 256]);
        }
        assert!(!manager.is_loading());
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(manager.resident_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_network_tile_is_persisted_and_reloaded_after_clear() {
        let fetcher = MockFetcher::new(encoded_tile(ImageFormat::Png));
        let (manager, _dir) = manager_with(&fetcher);

        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        let key = TileCacheKey::new(CAMPINAS, MapSource::Satellite);
        assert!(manager.disk_cache().path(&key).is_file());

        manager.clear_cache();
        assert_eq!(manager.resident_count(), 0);

        // Miss again: a new fetch is scheduled, satisfied from disk this time
        assert!(manager.get_tile(CAMPINAS).is_none());
        assert!(manager.is_loading());
        wait_idle(&manager).await;

        assert!(manager.get_tile(CAMPINAS).is_some());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disk_hit_skips_network() {
        let fetcher = MockFetcher::new(Vec::new());
        let (manager, _dir) = manager_with(&fetcher);

        let key = TileCacheKey::new(CAMPINAS, MapSource::Street);
        manager
            .disk_cache()
            .write(&key, &encoded_tile(ImageFormat::Png))
            .await
            .unwrap();

        assert!(manager.get_tile_for(CAMPINAS, MapSource::Street).is_none());
        wait_idle(&manager).await;

        assert!(manager.get_tile_for(CAMPINAS, MapSource::Street).is_some());
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(manager.failed_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failed_fetch_clears_marker_and_retries() {
        let fetcher = MockFetcher::new(encoded_tile(ImageFormat::Png));
        fetcher.respond_with(404);
        let (manager, _dir) = manager_with(&fetcher);

        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        assert!(!manager.is_resident(CAMPINAS, MapSource::Satellite));
        assert_eq!(manager.failed_count(), 1);
        assert_eq!(manager.in_flight_count(), 0);

        fetcher.respond_with(200);
        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        assert!(manager.get_tile(CAMPINAS).is_some());
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(manager.failed_count(), 1);
    }

    #[test]
    fn test_unspawned_fetch_does_not_strand_marker() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let handle = runtime.handle().clone();
        drop(runtime);

        let dir = tempfile::tempdir().unwrap();
        let fetcher = MockFetcher::new(encoded_tile(ImageFormat::Png));
        let manager = TileManager::with_fetcher(dir.path(), fetcher.clone(), handle);

        // The task is dropped without ever being polled
        assert!(manager.get_tile(CAMPINAS).is_none());
        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        while manager.is_loading() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!manager.is_loading());
        assert_eq!(fetcher.calls(), 0);

        // The key is not blocked from being requested again
        assert!(manager.get_tile(CAMPINAS).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_undecodable_body_is_not_published() {
        let fetcher = MockFetcher::new(b"<html>over quota</html>".to_vec());
        let (manager, _dir) = manager_with(&fetcher);

        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        assert_eq!(manager.resident_count(), 0);
        assert_eq!(manager.failed_count(), 1);
        assert!(manager.get_tile(CAMPINAS).is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_repaint_notifier_fires_on_publish() {
        let fetcher = MockFetcher::new(encoded_tile(ImageFormat::Png));
        let (manager, _dir) = manager_with(&fetcher);

        let repaints = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&repaints);
        assert!(manager.set_repaint_notifier(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!manager.set_repaint_notifier(|| {}));

        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        assert_eq!(repaints.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_toggle_keeps_other_source_resident() {
        let fetcher = MockFetcher::new(encoded_tile(ImageFormat::Png));
        let (manager, _dir) = manager_with(&fetcher);

        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        assert_eq!(manager.toggle_source(), MapSource::Street);
        assert!(manager.get_tile(CAMPINAS).is_none());
        wait_idle(&manager).await;

        assert!(manager.is_resident(CAMPINAS, MapSource::Satellite));
        assert!(manager.is_resident(CAMPINAS, MapSource::Street));
        assert_eq!(fetcher.calls(), 2);
        assert!(fetcher.urls()[1].contains("World_Street_Map"));
    }
}
