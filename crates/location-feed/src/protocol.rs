//! # Protocol
//!
//! JSON messages exchanged with the location push server, and the response
//! shape of the pull endpoint.

use chrono::{DateTime, Utc};
use realtime::{BusStatus, EntityMetadata, LocationSample, Result, protocol_error};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Message type discriminators.
pub mod kind {
    pub const LOCATION_UPDATE: &str = "enhanced_location_update";
    pub const EMPLOYEE_CONNECTED: &str = "employee_connected";
    pub const PING: &str = "ping";
    pub const PONG: &str = "pong";
}

/// `{ "type": ..., "data": ... }` wrapper shared by every push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    #[must_use]
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self { kind: kind.into(), data }
    }
}

/// Position and vehicle details pushed for a bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub bus_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BusStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passengers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl LocationUpdate {
    #[must_use]
    pub const fn sample(&self) -> LocationSample {
        LocationSample { lat: self.lat, lng: self.lng, accuracy: self.accuracy, timestamp: self.timestamp }
    }

    #[must_use]
    pub fn metadata(&self) -> EntityMetadata {
        EntityMetadata {
            route: self.route.clone(),
            total_seats: self.total_seats,
            available_seats: self.available_seats,
            passengers: self.passengers,
            status: self.status,
            operator: self.employee_email.clone(),
        }
    }
}

/// Decoded inbound push message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    LocationUpdate(Box<LocationUpdate>),
    Ping,
    Pong,

    /// A well-formed message of a type this client does not interpret.
    Other(Envelope),
}

impl InboundMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns a protocol error when the frame is not an envelope or a known
    /// message type carries a malformed payload.
    pub fn decode(frame: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(frame)?;

        match envelope.kind.as_str() {
            kind::LOCATION_UPDATE => {
                let update = serde_json::from_value::<LocationUpdate>(envelope.data)
                    .map_err(|err| protocol_error!("invalid {}: {err}", kind::LOCATION_UPDATE))?;
                Ok(Self::LocationUpdate(Box::new(update)))
            }
            kind::PING => Ok(Self::Ping),
            kind::PONG => Ok(Self::Pong),
            _ => Ok(Self::Other(envelope)),
        }
    }
}

/// Outbound push message.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Registration sent once the transport is open.
    EmployeeConnected { email: String },
    LocationUpdate(Box<LocationUpdate>),
    Ping,
    Pong,
}

impl OutboundMessage {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmployeeConnected { .. } => kind::EMPLOYEE_CONNECTED,
            Self::LocationUpdate(_) => kind::LOCATION_UPDATE,
            Self::Ping => kind::PING,
            Self::Pong => kind::PONG,
        }
    }

    /// Wrap the message in its envelope.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload cannot be serialized.
    pub fn to_envelope(&self) -> Result<Envelope> {
        let data = match self {
            Self::EmployeeConnected { email } => json!({ "email": email }),
            Self::LocationUpdate(update) => serde_json::to_value(update)?,
            Self::Ping | Self::Pong => json!({}),
        };
        Ok(Envelope::new(self.kind(), data))
    }
}

/// One entry of the pull endpoint's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolledPosition {
    pub bus_id: String,
    #[serde(default)]
    pub latest: Option<LocationSample>,
}
