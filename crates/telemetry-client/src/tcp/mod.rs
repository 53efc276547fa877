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

//! Async TCP connection layer with automatic reconnection.
//!
//! A background task reads the telemetry feed line by line, reconnecting
//! after a fixed delay whenever the session drops. The server address can be
//! swapped at runtime and the task stops on cancellation.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Configuration for TCP connections.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address in "host:port" format.
    pub address: String,
    /// Delay before reconnecting after disconnect.
    pub reconnect_delay: Duration,
    /// Channel buffer size for received lines.
    pub buffer_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "localhost:10000".to_string(),
            reconnect_delay: Duration::from_secs(1),
            buffer_size: 1024,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Attempting to connect.
    Connecting,
    /// Successfully connected.
    Connected,
    /// Disconnected (will attempt reconnect).
    Disconnected,
    /// Connection error occurred.
    Error(String),
}

/// Events emitted by the connection.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Connection state changed.
    StateChanged(ConnectionState),
    /// One line of the feed, without the terminator.
    LineReceived(Vec<u8>),
}

/// Receiving side of a [`Connection`].
pub type ConnectionEvents = mpsc::Receiver<ConnectionEvent>;

/// Handle to a managed TCP connection.
///
/// Dropping the handle stops the background task.
pub struct Connection {
    address_tx: watch::Sender<String>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &*self.address_tx.borrow())
            .field("cancel_token", &self.cancel_token)
            .finish()
    }
}

impl Connection {
    /// Spawn the connection task on `runtime`.
    ///
    /// Returns the control handle and the event stream. The stream ends once
    /// the connection is shut down.
    #[must_use]
    pub fn spawn(config: ConnectionConfig, runtime: &Handle) -> (Self, ConnectionEvents) {
        let (event_tx, event_rx) = mpsc::channel(config.buffer_size);
        let (address_tx, address_rx) = watch::channel(config.address);
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let reconnect_delay = config.reconnect_delay;

        runtime.spawn(async move {
            connection_loop(event_tx, address_rx, task_cancel, reconnect_delay).await;
        });

        (
            Self {
                address_tx,
                cancel_token,
            },
            event_rx,
        )
    }

    /// Change the server address.
    ///
    /// The connection will disconnect and reconnect to the new address.
    pub fn set_address(&self, address: String) {
        self.address_tx.send_replace(address);
    }

    #[must_use]
    pub fn current_address(&self) -> String {
        self.address_tx.borrow().clone()
    }

    /// Token cancelled when this connection shuts down.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// How one telemetry session ended.
enum SessionEnd {
    /// The operator pointed the client at another server.
    Retarget,
    /// The server closed the feed after sending `frames` lines.
    Closed { frames: u64 },
    /// The socket failed, before or during the session.
    Failed { frames: u64, error: std::io::Error },
    /// Shutdown was requested or nobody consumes events any more.
    Stopped,
}

/// Send a state change; `false` once the event consumer is gone.
async fn report(event_tx: &mpsc::Sender<ConnectionEvent>, state: ConnectionState) -> bool {
    event_tx.send(ConnectionEvent::StateChanged(state)).await.is_ok()
}

async fn connection_loop(
    event_tx: mpsc::Sender<ConnectionEvent>,
    mut address_rx: watch::Receiver<String>,
    cancel_token: CancellationToken,
    reconnect_delay: Duration,
) {
    // A ground station is often started before the radio link; only the first
    // failure of a streak is worth a warning.
    let mut failed_attempts: u32 = 0;

    while !cancel_token.is_cancelled() {
        let address = address_rx.borrow_and_update().clone();
        if !report(&event_tx, ConnectionState::Connecting).await {
            break;
        }
        debug!("Dialing telemetry server {}", address);

        let next_state =
            match run_session(&address, &event_tx, &mut address_rx, &cancel_token).await {
                SessionEnd::Retarget => {
                    failed_attempts = 0;
                    continue;
                }
                SessionEnd::Stopped => break,
                SessionEnd::Closed { frames } => {
                    failed_attempts = 0;
                    warn!("Telemetry feed {} closed after {} frames", address, frames);
                    ConnectionState::Disconnected
                }
                SessionEnd::Failed { frames, error } => {
                    if frames > 0 {
                        failed_attempts = 0;
                    }
                    failed_attempts = failed_attempts.saturating_add(1);
                    if failed_attempts == 1 {
                        warn!(
                            "Telemetry link to {} failed after {} frames: {}; retrying every {} ms",
                            address,
                            frames,
                            error,
                            reconnect_delay.as_millis()
                        );
                    } else {
                        debug!(
                            "Telemetry server {} still unavailable (attempt {}): {}",
                            address, failed_attempts, error
                        );
                    }
                    ConnectionState::Error(error.to_string())
                }
            };

        if !report(&event_tx, next_state).await {
            break;
        }

        tokio::select! {
            () = sleep(reconnect_delay) => {}
            () = cancel_token.cancelled() => break,
        }
    }

    info!("Telemetry connection stopped");
}

async fn run_session(
    address: &str,
    event_tx: &mpsc::Sender<ConnectionEvent>,
    address_rx: &mut watch::Receiver<String>,
    cancel_token: &CancellationToken,
) -> SessionEnd {
    let stream = tokio::select! {
        stream = TcpStream::connect(address) => match stream {
            Ok(stream) => stream,
            Err(error) => return SessionEnd::Failed { frames: 0, error },
        },
        () = cancel_token.cancelled() => return SessionEnd::Stopped,
    };
    info!("Telemetry link up: {}", address);

    if !report(event_tx, ConnectionState::Connected).await {
        return SessionEnd::Stopped;
    }

    let mut lines = BufReader::new(stream).lines();
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    frames += 1;
                    if event_tx.send(ConnectionEvent::LineReceived(line.into_bytes())).await.is_err() {
                        return SessionEnd::Stopped;
                    }
                }
                Ok(None) => return SessionEnd::Closed { frames },
                Err(error) => return SessionEnd::Failed { frames, error },
            },

            changed = address_rx.changed() => {
                if changed.is_err() {
                    return SessionEnd::Stopped;
                }
                let next = address_rx.borrow_and_update().clone();
                if next != address {
                    info!("Telemetry server moved from {} to {} after {} frames", address, next, frames);
                    return SessionEnd::Retarget;
                }
            }

            () = cancel_token.cancelled() => return SessionEnd::Stopped,
        }
    }
}
