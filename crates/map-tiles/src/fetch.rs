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

//! Network side of tile resolution.
//!
//! [`TileFetcher`] is the seam between the tile manager and the transport so
//! tests can count or fail requests without a network.

use std::future::Future;
use std::time::Duration;

use log::debug;

use crate::error::TileError;

/// Fixed per-request timeout for tile downloads.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifies this client to tile providers.
pub const USER_AGENT: &str = "ELRS-GroundStation/1.0";

/// Retrieves the raw body of a tile URL.
pub trait TileFetcher: Send + Sync + 'static {
    /// GET `url` and return the body of a 200 response.
    ///
    /// Any other status or a transport failure is an error.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TileError>> + Send;
}

/// Async HTTP fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, TileError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, TileError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(TileError::Client)?;

        Ok(Self { client })
    }
}

impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TileError> {
        debug!("Downloading tile: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| TileError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(TileError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| TileError::Transport {
                url: url.to_string(),
                source,
            })?;

        Ok(bytes.to_vec())
    }
}
