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

//! Persistent, path-addressed tile store.
//!
//! Layout: `<root>/<source>/<z>_<x>_<y>.jpg`. Files hold the provider's bytes
//! untouched; street tiles are usually PNG despite the extension.

use std::path::{Path, PathBuf};

use crate::coord::TileCacheKey;
use crate::error::TileError;

#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic file path for a key.
    #[must_use]
    pub fn path(&self, key: &TileCacheKey) -> PathBuf {
        let coord = key.coord;
        self.root
            .join(key.source.dir_name())
            .join(format!("{}_{}_{}.jpg", coord.zoom, coord.x, coord.y))
    }

    pub async fn read(&self, key: &TileCacheKey) -> Result<Vec<u8>, TileError> {
        let path = self.path(key);
        tokio::fs::read(&path)
            .await
            .map_err(|source| TileError::Io { path, source })
    }

    /// Store raw bytes for `key`, creating the source directory if needed.
    pub async fn write(&self, key: &TileCacheKey, bytes: &[u8]) -> Result<(), TileError> {
        let path = self.path(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| TileError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| TileError::Io { path, source })
    }
}
