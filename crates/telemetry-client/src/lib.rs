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

//! Telemetry client for the ground station.
//!
//! Connects to a telemetry server that streams one JSON frame per line and
//! keeps the latest value of every reading in a [`TelemetryState`] snapshot.
//! Layers:
//!
//! - **Protocol layer**: JSON line framing into [`TelemetryMessage`]
//! - **State layer**: latest-value snapshot with fix detection
//! - **Connection layer**: async TCP with automatic reconnection and address hot-reload
//!
//! # Quick Start
//!
//! ```no_run
//! use telemetry_client::{ClientConfig, TelemetryClient};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let client = TelemetryClient::new(ClientConfig::default(), runtime.handle().clone());
//! client.connect();
//! client.start_stream();
//!
//! // Polled from the render loop
//! let state = client.state();
//! if state.has_fix() {
//!     println!("{:.5}, {:.5}", state.latitude, state.longitude);
//! }
//! ```
//!
//! ## Protocol Layer Only
//!
//! ```
//! use telemetry_client::protocol::{JsonLinesParser, Protocol, TelemetryMessage};
//!
//! let mut parser = JsonLinesParser::new();
//! let line = br#"{"type":"flight_mode","mode":"ANGL"}"#;
//! if let Ok(Some(TelemetryMessage::FlightMode { mode })) = parser.parse(line) {
//!     println!("Mode: {mode}");
//! }
//! ```

pub mod protocol;
pub mod state;
pub mod tcp;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub use protocol::{JsonLinesParser, ParseError, Protocol, TelemetryMessage};
pub use state::TelemetryState;
pub use tcp::{Connection, ConnectionConfig, ConnectionEvent, ConnectionEvents, ConnectionState};

/// Configuration for the telemetry client.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub connection: ConnectionConfig,
}

/// Pull-style telemetry client.
///
/// Lifecycle calls are cheap and non-blocking; the socket lives on the tokio
/// runtime passed to [`TelemetryClient::new`]. Readers poll
/// [`TelemetryClient::state`] for a snapshot.
pub struct TelemetryClient {
    runtime: Handle,
    state: Arc<RwLock<TelemetryState>>,
    session: Mutex<Session>,
}

struct Session {
    config: ClientConfig,
    connection: Option<Connection>,
}

impl std::fmt::Debug for TelemetryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryClient")
            .field("address", &self.current_address())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl TelemetryClient {
    #[must_use]
    pub fn new(config: ClientConfig, runtime: Handle) -> Self {
        Self {
            runtime,
            state: Arc::new(RwLock::new(TelemetryState::default())),
            session: Mutex::new(Session {
                config,
                connection: None,
            }),
        }
    }

    /// Start the background connection. Calling it again while connected is a no-op.
    pub fn connect(&self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session.connection.is_some() {
            return;
        }

        let (connection, events) =
            Connection::spawn(session.config.connection.clone(), &self.runtime);
        info!(
            "Telemetry client started for {}",
            connection.current_address()
        );

        self.runtime.spawn(process_events(
            events,
            Arc::clone(&self.state),
            connection.cancel_token(),
        ));

        session.connection = Some(connection);
    }

    /// Stop the connection and streaming. The last readings are kept.
    pub fn disconnect(&self) {
        let connection = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connection
            .take();

        if let Some(connection) = connection {
            connection.shutdown();
            info!("Telemetry client disconnected");
        }

        if let Ok(mut state) = self.state.write() {
            state.connected = false;
            state.streaming = false;
        }
    }

    /// Begin applying received frames to the snapshot.
    pub fn start_stream(&self) {
        if let Ok(mut state) = self.state.write() {
            state.streaming = true;
        }
    }

    /// Keep the connection but ignore received frames.
    pub fn stop_stream(&self) {
        if let Ok(mut state) = self.state.write() {
            state.streaming = false;
        }
    }

    /// Copy of the latest telemetry.
    #[must_use]
    pub fn state(&self) -> TelemetryState {
        self.state.read().map(|s| s.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.read().map(|s| s.connected).unwrap_or(false)
    }

    /// Change the server address, reconnecting if a session is active.
    pub fn set_address(&self, address: String) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(connection) = &session.connection {
            connection.set_address(address.clone());
        }
        session.config.connection.address = address;
    }

    #[must_use]
    pub fn current_address(&self) -> String {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.connection.as_ref().map_or_else(
            || session.config.connection.address.clone(),
            Connection::current_address,
        )
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn process_events(
    mut events: ConnectionEvents,
    state: Arc<RwLock<TelemetryState>>,
    cancel_token: CancellationToken,
) {
    let mut parser = JsonLinesParser::new();

    loop {
        let event = tokio::select! {
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
            () = cancel_token.cancelled() => break,
        };

        match event {
            ConnectionEvent::StateChanged(connection_state) => {
                debug!("Telemetry connection state: {:?}", connection_state);
                if let Ok(mut s) = state.write() {
                    s.connected = connection_state == ConnectionState::Connected;
                }
            }
            ConnectionEvent::LineReceived(line) => match parser.parse(&line) {
                Ok(Some(msg)) => {
                    if let Ok(mut s) = state.write() {
                        if s.streaming {
                            s.apply(msg);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping telemetry frame: {}", e),
            },
        }
    }

    if let Ok(mut s) = state.write() {
        s.connected = false;
    }
}
