use std::fmt::{Display, Formatter, Result as FormatResult};

/// Closed vocabulary of envelope kinds understood by this bridge.
///
/// Tags outside this list are legal on the wire (newer cores may add kinds) and
/// are ignored by the decoder instead of failing the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    // Core -> client
    WakeWordDetected,
    UserSpeechStart,
    UserSpeechEnd,
    AgentResponse,
    TtsStart,
    TtsEnd,
    SystemStatus,
    Error,

    // Either direction
    LogEntry,
    Heartbeat,

    // Client -> core
    FaceStateChange,
    UserInput,
    SystemCommand,
    SettingsUpdate,
}

impl MessageKind {
    pub const ALL: [MessageKind; 14] = [
        MessageKind::WakeWordDetected,
        MessageKind::UserSpeechStart,
        MessageKind::UserSpeechEnd,
        MessageKind::AgentResponse,
        MessageKind::TtsStart,
        MessageKind::TtsEnd,
        MessageKind::SystemStatus,
        MessageKind::Error,
        MessageKind::LogEntry,
        MessageKind::Heartbeat,
        MessageKind::FaceStateChange,
        MessageKind::UserInput,
        MessageKind::SystemCommand,
        MessageKind::SettingsUpdate,
    ];

    /// Wire tag for this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::WakeWordDetected => "wake_word_detected",
            MessageKind::UserSpeechStart => "user_speech_start",
            MessageKind::UserSpeechEnd => "user_speech_end",
            MessageKind::AgentResponse => "agent_response",
            MessageKind::TtsStart => "tts_start",
            MessageKind::TtsEnd => "tts_end",
            MessageKind::SystemStatus => "system_status",
            MessageKind::Error => "error",
            MessageKind::LogEntry => "log_entry",
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::FaceStateChange => "face_state_change",
            MessageKind::UserInput => "user_input",
            MessageKind::SystemCommand => "system_command",
            MessageKind::SettingsUpdate => "settings_update",
        }
    }

    /// Look up a wire tag. Returns `None` for tags outside the vocabulary.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Whether the processing core is expected to emit this kind.
    pub const fn from_core(self) -> bool {
        !matches!(
            self,
            MessageKind::FaceStateChange
                | MessageKind::UserInput
                | MessageKind::SystemCommand
                | MessageKind::SettingsUpdate
        )
    }

    /// Whether the presentation client is expected to emit this kind.
    pub const fn from_client(self) -> bool {
        matches!(
            self,
            MessageKind::FaceStateChange
                | MessageKind::UserInput
                | MessageKind::SystemCommand
                | MessageKind::SettingsUpdate
                | MessageKind::LogEntry
                | MessageKind::Heartbeat
        )
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(self.as_str())
    }
}
