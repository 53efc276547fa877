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

//! GPU textures for decoded map tiles.
//!
//! Each decoded tile is uploaded once and the handle reused every frame.
//! Handles are freed when dropped, so clearing this map on zoom change keeps
//! GPU memory in step with the tile cache.

use std::collections::HashMap;

use eframe::egui;
use map_tiles::{TileCacheKey, TileImage};

#[derive(Default)]
pub struct TileTextures {
    textures: HashMap<TileCacheKey, egui::TextureHandle>,
}

impl std::fmt::Debug for TileTextures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileTextures")
            .field("uploaded", &self.textures.len())
            .finish()
    }
}

impl TileTextures {
    /// Texture for `key`, uploading `tile` on first use.
    pub fn get_or_upload(
        &mut self,
        ctx: &egui::Context,
        key: TileCacheKey,
        tile: &TileImage,
    ) -> &egui::TextureHandle {
        self.textures.entry(key).or_insert_with(|| {
            let image = egui::ColorImage::from_rgba_unmultiplied(tile.size(), tile.rgba());
            ctx.load_texture(format!("tile_{key}"), image, egui::TextureOptions::LINEAR)
        })
    }

    pub fn clear(&mut self) {
        self.textures.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }
}
