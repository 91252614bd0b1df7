//! Kind-specific envelope payloads.
//!
//! Field names follow the wire contract: camelCase where the core speaks
//! camelCase (`executionTimeMs`, `sessionId`, `pythonLayerConnected`), and the
//! older snake_case spellings are accepted as aliases. Unknown payload fields
//! are ignored so a newer core can add data without breaking this client.

use crate::envelope::kind::MessageKind;
use crate::face::{Expression, Phase};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WakeWordDetected {
    pub confidence: f64,
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "audio_duration")]
    pub audio_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpeechStart {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSpeechEnd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResponse {
    pub text: String,
    #[serde(default, alias = "execution_time_ms")]
    pub execution_time_ms: u64,
    #[serde(default, alias = "session_id")]
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsStart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsEnd {}

/// Health of the core and the services behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    /// Absent in frames from cores that only report their services; a frame
    /// from the core means its own layer is up.
    #[serde(default = "core_layer_up", alias = "python_layer_connected")]
    pub python_layer_connected: bool,
    #[serde(default, alias = "voicevox_connected", alias = "voicevox_active")]
    pub voicevox_connected: bool,
    #[serde(default, alias = "langflow_connected", alias = "langflow_active")]
    pub langflow_connected: bool,
}

fn core_layer_up() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Application-level failure reported by the core (`error` kind).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceStateChange {
    pub state: Phase,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "session_id")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Free-form settings patch; the core decides which keys it understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(flatten)]
    pub settings: Map<String, Value>,
}

/// Typed body of an envelope, one variant per [`MessageKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    WakeWordDetected(WakeWordDetected),
    UserSpeechStart(UserSpeechStart),
    UserSpeechEnd(UserSpeechEnd),
    AgentResponse(AgentResponse),
    TtsStart(TtsStart),
    TtsEnd(TtsEnd),
    SystemStatus(SystemStatus),
    LogEntry(LogEntry),
    Error(ErrorReport),
    Heartbeat(Heartbeat),
    FaceStateChange(FaceStateChange),
    UserInput(UserInput),
    SystemCommand(SystemCommand),
    SettingsUpdate(SettingsUpdate),
}

impl Payload {
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::WakeWordDetected(_) => MessageKind::WakeWordDetected,
            Payload::UserSpeechStart(_) => MessageKind::UserSpeechStart,
            Payload::UserSpeechEnd(_) => MessageKind::UserSpeechEnd,
            Payload::AgentResponse(_) => MessageKind::AgentResponse,
            Payload::TtsStart(_) => MessageKind::TtsStart,
            Payload::TtsEnd(_) => MessageKind::TtsEnd,
            Payload::SystemStatus(_) => MessageKind::SystemStatus,
            Payload::LogEntry(_) => MessageKind::LogEntry,
            Payload::Error(_) => MessageKind::Error,
            Payload::Heartbeat(_) => MessageKind::Heartbeat,
            Payload::FaceStateChange(_) => MessageKind::FaceStateChange,
            Payload::UserInput(_) => MessageKind::UserInput,
            Payload::SystemCommand(_) => MessageKind::SystemCommand,
            Payload::SettingsUpdate(_) => MessageKind::SettingsUpdate,
        }
    }

    /// Serialize the payload body into the `data` object of an envelope.
    pub fn to_data(&self) -> Result<Value, serde_json::Error> {
        match self {
            Payload::WakeWordDetected(p) => serde_json::to_value(p),
            Payload::UserSpeechStart(p) => serde_json::to_value(p),
            Payload::UserSpeechEnd(p) => serde_json::to_value(p),
            Payload::AgentResponse(p) => serde_json::to_value(p),
            Payload::TtsStart(p) => serde_json::to_value(p),
            Payload::TtsEnd(p) => serde_json::to_value(p),
            Payload::SystemStatus(p) => serde_json::to_value(p),
            Payload::LogEntry(p) => serde_json::to_value(p),
            Payload::Error(p) => serde_json::to_value(p),
            Payload::Heartbeat(p) => serde_json::to_value(p),
            Payload::FaceStateChange(p) => serde_json::to_value(p),
            Payload::UserInput(p) => serde_json::to_value(p),
            Payload::SystemCommand(p) => serde_json::to_value(p),
            Payload::SettingsUpdate(p) => serde_json::to_value(p),
        }
    }

    /// Parse a `data` object for a known kind. `null` is read as an empty object.
    pub fn from_data(kind: MessageKind, data: Value) -> Result<Self, serde_json::Error> {
        let data = match data {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };

        Ok(match kind {
            MessageKind::WakeWordDetected => Payload::WakeWordDetected(serde_json::from_value(data)?),
            MessageKind::UserSpeechStart => Payload::UserSpeechStart(serde_json::from_value(data)?),
            MessageKind::UserSpeechEnd => Payload::UserSpeechEnd(serde_json::from_value(data)?),
            MessageKind::AgentResponse => Payload::AgentResponse(serde_json::from_value(data)?),
            MessageKind::TtsStart => Payload::TtsStart(serde_json::from_value(data)?),
            MessageKind::TtsEnd => Payload::TtsEnd(serde_json::from_value(data)?),
            MessageKind::SystemStatus => Payload::SystemStatus(serde_json::from_value(data)?),
            MessageKind::LogEntry => Payload::LogEntry(serde_json::from_value(data)?),
            MessageKind::Error => Payload::Error(serde_json::from_value(data)?),
            MessageKind::Heartbeat => Payload::Heartbeat(serde_json::from_value(data)?),
            MessageKind::FaceStateChange => Payload::FaceStateChange(serde_json::from_value(data)?),
            MessageKind::UserInput => Payload::UserInput(serde_json::from_value(data)?),
            MessageKind::SystemCommand => Payload::SystemCommand(serde_json::from_value(data)?),
            MessageKind::SettingsUpdate => Payload::SettingsUpdate(serde_json::from_value(data)?),
        })
    }

    pub fn heartbeat() -> Self {
        Payload::Heartbeat(Heartbeat::default())
    }
}
