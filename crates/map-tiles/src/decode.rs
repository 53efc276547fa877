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

//! Raw tile bytes to display-ready RGBA pixels.

use crate::error::TileError;

/// A decoded tile: tightly packed, unmultiplied RGBA8 pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct TileImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl std::fmt::Debug for TileImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl TileImage {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel data, row-major, four bytes per pixel.
    #[must_use]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// `[width, height]` as `usize`, the shape texture uploads expect.
    #[must_use]
    pub fn size(&self) -> [usize; 2] {
        [self.width as usize, self.height as usize]
    }
}

/// Decode PNG or JPEG tile bytes.
///
/// The format is sniffed from the content, so a PNG stored under a `.jpg`
/// cache name decodes fine.
pub fn decode_tile(bytes: &[u8]) -> Result<TileImage, TileError> {
    if bytes.is_empty() {
        return Err(TileError::Decode("empty image data".to_string()));
    }

    let img = image::load_from_memory(bytes).map_err(|e| TileError::Decode(e.to_string()))?;
    let rgba = img.to_rgba8();

    Ok(TileImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
