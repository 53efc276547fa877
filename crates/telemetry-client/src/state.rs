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

//! Latest-value telemetry snapshot.

use chrono::{DateTime, Utc};

use crate::protocol::TelemetryMessage;

/// Most recent reading of every telemetry group plus link status.
///
/// Groups keep their last value until a newer frame of the same type arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryState {
    // GPS
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: i32,
    pub ground_speed: f32,
    pub heading: f32,
    pub satellites: u32,
    /// At least one GPS frame has been received.
    pub has_gps: bool,

    // Attitude
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,

    // Battery
    pub voltage: f32,
    pub current: f32,
    pub capacity: u32,
    pub remaining: u32,

    // Link
    pub rssi1: i32,
    pub rssi2: i32,
    pub link_quality: u32,
    pub snr: i32,
    pub tx_power: u32,

    // Barometer / variometer
    pub baro_altitude: f32,
    pub vertical_speed: f32,

    pub flight_mode: String,

    /// TCP session to the telemetry server is up.
    pub connected: bool,
    /// Received frames are being applied.
    pub streaming: bool,
    pub last_update: Option<DateTime<Utc>>,
}

impl TelemetryState {
    /// Apply a frame received now.
    pub fn apply(&mut self, msg: TelemetryMessage) {
        self.apply_at(msg, Utc::now());
    }

    /// Apply a frame, stamping `last_update` with `at`.
    pub fn apply_at(&mut self, msg: TelemetryMessage, at: DateTime<Utc>) {
        match msg {
            TelemetryMessage::Gps {
                latitude,
                longitude,
                altitude,
                ground_speed,
                heading,
                satellites,
            } => {
                self.latitude = latitude;
                self.longitude = longitude;
                self.altitude = altitude;
                self.ground_speed = ground_speed;
                self.heading = heading;
                self.satellites = satellites;
                self.has_gps = true;
            }
            TelemetryMessage::Attitude { pitch, roll, yaw } => {
                self.pitch = pitch;
                self.roll = roll;
                self.yaw = yaw;
            }
            TelemetryMessage::Battery {
                voltage,
                current,
                capacity,
                remaining,
            } => {
                self.voltage = voltage;
                self.current = current;
                self.capacity = capacity;
                self.remaining = remaining;
            }
            TelemetryMessage::LinkStats {
                rssi1,
                rssi2,
                link_quality,
                snr,
                tx_power,
            } => {
                self.rssi1 = rssi1;
                self.rssi2 = rssi2;
                self.link_quality = link_quality;
                self.snr = snr;
                self.tx_power = tx_power;
            }
            TelemetryMessage::Barometer { altitude } => self.baro_altitude = altitude,
            TelemetryMessage::Variometer { vertical_speed } => self.vertical_speed = vertical_speed,
            TelemetryMessage::BarometerVariometer {
                altitude,
                vertical_speed,
            } => {
                self.baro_altitude = altitude;
                self.vertical_speed = vertical_speed;
            }
            TelemetryMessage::FlightMode { mode } => self.flight_mode = mode,
            TelemetryMessage::Unknown => return,
        }

        self.last_update = Some(at);
    }

    /// A usable position: GPS seen and not the 0,0 placeholder.
    #[must_use]
    pub fn has_fix(&self) -> bool {
        self.has_gps && (self.latitude.abs() > f64::EPSILON || self.longitude.abs() > f64::EPSILON)
    }

    /// Time since the last applied frame, if any.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_update.map(|at| now - at)
    }
}
