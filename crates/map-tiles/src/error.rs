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

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while resolving a tile.
///
/// None of these are fatal: the tile manager logs them and leaves the key
/// absent so a later request retries.
#[derive(Debug, Error)]
pub enum TileError {
    /// Image bytes could not be decoded (malformed, truncated or empty).
    #[error("failed to decode tile image: {0}")]
    Decode(String),

    /// DNS, connect, timeout or body-read failure.
    #[error("tile request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The provider answered with something other than 200 OK.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Disk cache read, write or directory creation failed.
    #[error("disk cache I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl TileError {
    /// True when the disk cache simply has no file for the key.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
