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

//! Newline-delimited JSON frame parser.
//!
//! ```text
//! {"type":"gps","latitude":-22.9064,"longitude":-47.0616,"heading":270.0}
//! {"type":"battery","voltage":16.4,"current":12.5,"capacity":850,"remaining":72}
//! ```

use super::{ParseError, Protocol, TelemetryMessage};

/// Parser for one JSON telemetry frame per line.
#[derive(Debug, Default)]
pub struct JsonLinesParser;

impl JsonLinesParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Protocol for JsonLinesParser {
    type Message = TelemetryMessage;
    type Error = ParseError;

    fn parse(&mut self, input: &[u8]) -> Result<Option<TelemetryMessage>, ParseError> {
        let line = std::str::from_utf8(input)?.trim();

        // Keep-alive
        if line.is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(line)? {
            TelemetryMessage::Unknown => Ok(None),
            msg => Ok(Some(msg)),
        }
    }
}
