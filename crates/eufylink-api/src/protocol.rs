//! Wire protocol for the eufy-security event server.
//!
//! Inbound frames are JSON objects discriminated by a top-level `type`
//! field; the payload lives in the field named after the type's value
//! (`"result"`, `"event"`). Only results and events are surfaced, every
//! other frame is dropped during parsing.
//!
//! Outbound frames are small command objects tagged with a `messageId`
//! that the server echoes back on the matching result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Correlation ids ──────────────────────────────────────────────────

/// `messageId` of the start-listening command and its result.
pub const START_LISTENING_ID: &str = "start_listening";

/// `messageId` of the poll-refresh command and its result.
pub const POLL_REFRESH_ID: &str = "poll_refresh";

const GET_PROPERTIES_ID: &str = "get_properties";
const GET_PROPERTIES_METADATA_ID: &str = "get_properties_metadata";
const SET_RTSP_STREAM_ID: &str = "set_rtsp_stream";

// ── DeviceType ───────────────────────────────────────────────────────

/// Device type code reported by the server for stations and devices.
///
/// Only [`DeviceType::Station`] changes command routing; the other named
/// variants exist for display. Codes the server adds later land in
/// [`DeviceType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(from = "u32", into = "u32")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceType {
    Station,
    Camera,
    Sensor,
    Floodlight,
    CameraE,
    Doorbell,
    BatteryDoorbell,
    Camera2C,
    Camera2,
    MotionSensor,
    Keypad,
    Camera2Pro,
    Camera2CPro,
    BatteryDoorbell2,
    IndoorCamera,
    IndoorPtCamera,
    SoloCamera,
    SoloCameraPro,
    LockBasic,
    LockAdvanced,
    Unknown(u32),
}

impl DeviceType {
    pub fn code(self) -> u32 {
        match self {
            Self::Station => 0,
            Self::Camera => 1,
            Self::Sensor => 2,
            Self::Floodlight => 3,
            Self::CameraE => 4,
            Self::Doorbell => 5,
            Self::BatteryDoorbell => 7,
            Self::Camera2C => 8,
            Self::Camera2 => 9,
            Self::MotionSensor => 10,
            Self::Keypad => 11,
            Self::Camera2Pro => 14,
            Self::Camera2CPro => 15,
            Self::BatteryDoorbell2 => 16,
            Self::IndoorCamera => 30,
            Self::IndoorPtCamera => 31,
            Self::SoloCamera => 32,
            Self::SoloCameraPro => 33,
            Self::LockBasic => 50,
            Self::LockAdvanced => 51,
            Self::Unknown(code) => code,
        }
    }

    pub fn is_station(self) -> bool {
        self == Self::Station
    }
}

impl From<u32> for DeviceType {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Station,
            1 => Self::Camera,
            2 => Self::Sensor,
            3 => Self::Floodlight,
            4 => Self::CameraE,
            5 => Self::Doorbell,
            7 => Self::BatteryDoorbell,
            8 => Self::Camera2C,
            9 => Self::Camera2,
            10 => Self::MotionSensor,
            11 => Self::Keypad,
            14 => Self::Camera2Pro,
            15 => Self::Camera2CPro,
            16 => Self::BatteryDoorbell2,
            30 => Self::IndoorCamera,
            31 => Self::IndoorPtCamera,
            32 => Self::SoloCamera,
            33 => Self::SoloCameraPro,
            50 => Self::LockBasic,
            51 => Self::LockAdvanced,
            other => Self::Unknown(other),
        }
    }
}

impl From<DeviceType> for u32 {
    fn from(device_type: DeviceType) -> Self {
        device_type.code()
    }
}

// ── CommandTarget ────────────────────────────────────────────────────

/// The `<device|station>` segment of a namespaced command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CommandTarget {
    Station,
    Device,
}

impl From<DeviceType> for CommandTarget {
    fn from(device_type: DeviceType) -> Self {
        if device_type.is_station() {
            Self::Station
        } else {
            Self::Device
        }
    }
}

// ── Outbound commands ────────────────────────────────────────────────

/// A command the client can send to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    StartListening,
    PollRefresh,
    GetProperties {
        target: CommandTarget,
        serial_number: String,
    },
    GetPropertiesMetadata {
        target: CommandTarget,
        serial_number: String,
    },
    SetRtspStream {
        serial_number: String,
        value: bool,
    },
}

/// Serialized shape of every outbound command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireCommand<'a> {
    message_id: &'static str,
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial_number: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<bool>,
}

impl OutboundCommand {
    /// The correlation id the server echoes on the matching result.
    pub fn message_id(&self) -> &'static str {
        match self {
            Self::StartListening => START_LISTENING_ID,
            Self::PollRefresh => POLL_REFRESH_ID,
            Self::GetProperties { .. } => GET_PROPERTIES_ID,
            Self::GetPropertiesMetadata { .. } => GET_PROPERTIES_METADATA_ID,
            Self::SetRtspStream { .. } => SET_RTSP_STREAM_ID,
        }
    }

    /// The server-side command name, e.g. `"station.get_properties"`.
    pub fn command(&self) -> String {
        match self {
            Self::StartListening => "start_listening".into(),
            Self::PollRefresh => "driver.poll_refresh".into(),
            Self::GetProperties { target, .. } => format!("{target}.get_properties"),
            Self::GetPropertiesMetadata { target, .. } => {
                format!("{target}.get_properties_metadata")
            }
            Self::SetRtspStream { .. } => "device.set_rtsp_stream".into(),
        }
    }

    fn wire(&self) -> WireCommand<'_> {
        let (serial_number, value) = match self {
            Self::StartListening | Self::PollRefresh => (None, None),
            Self::GetProperties { serial_number, .. }
            | Self::GetPropertiesMetadata { serial_number, .. } => {
                (Some(serial_number.as_str()), None)
            }
            Self::SetRtspStream {
                serial_number,
                value,
            } => (Some(serial_number.as_str()), Some(*value)),
        };

        WireCommand {
            message_id: self.message_id(),
            command: self.command(),
            serial_number,
            value,
        }
    }

    /// The command as a JSON value.
    pub fn to_json(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self.wire())?)
    }

    /// The command as a text frame.
    pub fn to_text(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.wire())?)
    }
}

// ── Inbound frames ───────────────────────────────────────────────────

/// A correlated response to a previously sent command.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultFrame {
    pub message_id: String,
    /// The server's `success` flag, when present.
    pub success: Option<bool>,
    /// Contents of the `result` field (`Null` when absent).
    pub result: Value,
}

impl ResultFrame {
    /// The `state` object of a start-listening result.
    pub fn state(&self) -> Option<&Map<String, Value>> {
        self.result.get("state").and_then(Value::as_object)
    }
}

/// An unsolicited push notification about a station or device.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFrame {
    /// Event type name, e.g. `"property changed"`.
    pub event: String,
    /// `"device"` or `"station"`.
    pub source: String,
    pub serial_number: String,
    /// The full event payload, including the fields above.
    pub body: Map<String, Value>,
}

impl EventFrame {
    /// Name of the snapshot collection this event targets (`source + "s"`).
    pub fn collection(&self) -> String {
        format!("{}s", self.source)
    }

    /// The optional `name` field that overrides a rule's property name.
    pub fn name(&self) -> Option<&str> {
        self.body.get("name").and_then(Value::as_str)
    }

    pub fn field(&self, field: &str) -> Option<&Value> {
        self.body.get(field)
    }
}

/// An inbound frame the client cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Result(ResultFrame),
    Event(EventFrame),
}

impl Inbound {
    /// Parse a text frame.
    ///
    /// Parsing is permissive: malformed JSON, unknown `type` values and
    /// frames missing their identifying fields all yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "Failed to parse inbound frame");
                return None;
            }
        };

        let Value::Object(frame) = value else {
            tracing::debug!("Inbound frame is not a JSON object");
            return None;
        };

        match frame.get("type").and_then(Value::as_str) {
            Some("result") => parse_result(&frame).map(Self::Result),
            Some("event") => parse_event(frame).map(Self::Event),
            other => {
                tracing::trace!(frame_type = ?other, "Ignoring inbound frame");
                None
            }
        }
    }
}

fn parse_result(frame: &Map<String, Value>) -> Option<ResultFrame> {
    let Some(message_id) = frame.get("messageId").and_then(Value::as_str) else {
        tracing::debug!("Result frame without messageId");
        return None;
    };

    Some(ResultFrame {
        message_id: message_id.to_owned(),
        success: frame.get("success").and_then(Value::as_bool),
        result: frame.get("result").cloned().unwrap_or(Value::Null),
    })
}

fn parse_event(mut frame: Map<String, Value>) -> Option<EventFrame> {
    // The payload normally sits under `event`; flat frames carry the
    // event name there instead and keep the payload at the top level.
    let body = match frame.remove("event") {
        Some(Value::Object(body)) => body,
        Some(name) => {
            frame.insert("event".into(), name);
            frame
        }
        None => frame,
    };

    let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);

    let (Some(event), Some(source), Some(serial_number)) =
        (text("event"), text("source"), text("serialNumber"))
    else {
        tracing::debug!("Event frame missing event, source or serialNumber");
        return None;
    };

    Some(EventFrame {
        event,
        source,
        serial_number,
        body,
    })
}

// ── Tests ────────────────────────────────────────────────────────────
