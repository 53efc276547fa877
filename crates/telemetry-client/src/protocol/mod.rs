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

//! Protocol layer for telemetry frame parsing.
//!
//! Frames arrive one per line as JSON objects tagged by a `"type"` field.
//! Each frame carries one group of readings (GPS, attitude, battery, link
//! statistics, barometer/variometer or flight mode).

mod json_lines;

pub use json_lines::JsonLinesParser;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur during frame parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid frame encoding: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("malformed telemetry frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One telemetry frame.
///
/// Frame types this client does not know deserialize to [`TelemetryMessage::Unknown`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryMessage {
    /// GPS fix.
    Gps {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
        /// Altitude in meters.
        #[serde(default)]
        altitude: i32,
        /// Ground speed in km/h.
        #[serde(default)]
        ground_speed: f32,
        /// Course over ground in degrees (0-360, north = 0).
        #[serde(default)]
        heading: f32,
        #[serde(default)]
        satellites: u32,
    },

    /// Attitude in degrees.
    Attitude { pitch: f32, roll: f32, yaw: f32 },

    Battery {
        /// Pack voltage in volts.
        voltage: f32,
        /// Current draw in amps.
        current: f32,
        /// Consumed capacity in mAh.
        capacity: u32,
        /// Remaining charge in percent.
        remaining: u32,
    },

    /// Radio link statistics.
    LinkStats {
        /// Antenna 1 RSSI in dBm.
        rssi1: i32,
        /// Antenna 2 RSSI in dBm.
        rssi2: i32,
        /// Link quality in percent.
        link_quality: u32,
        snr: i32,
        /// Transmit power in mW.
        tx_power: u32,
    },

    /// Barometric altitude in meters.
    Barometer { altitude: f32 },

    /// Vertical speed in m/s.
    Variometer { vertical_speed: f32 },

    /// Combined barometer and variometer sensor.
    BarometerVariometer { altitude: f32, vertical_speed: f32 },

    FlightMode { mode: String },

    #[serde(other)]
    Unknown,
}

/// Trait for protocol parsers.
pub trait Protocol {
    /// The message type produced by this parser.
    type Message;
    /// The error type for parsing failures.
    type Error;

    /// Parse input bytes into a message.
    ///
    /// Returns `Ok(Some(message))` if parsing succeeded,
    /// `Ok(None)` if the input is valid but doesn't produce a message,
    /// or `Err(error)` if parsing failed.
    fn parse(&mut self, input: &[u8]) -> Result<Option<Self::Message>, Self::Error>;
}
