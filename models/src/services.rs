use crate::envelope::payload::SystemStatus;

use std::time::SystemTime;

/// Last reported health of the core and the services it depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceHealth {
    pub python_layer: bool,
    pub voicevox: bool,
    pub langflow: bool,
    /// `None` until the first `system_status` arrives.
    pub updated_at: Option<SystemTime>,
}

impl ServiceHealth {
    pub fn from_status(status: &SystemStatus, at: SystemTime) -> Self {
        Self {
            python_layer: status.python_layer_connected,
            voicevox: status.voicevox_connected,
            langflow: status.langflow_connected,
            updated_at: Some(at),
        }
    }

    pub fn core_healthy(&self) -> bool {
        self.python_layer
    }
}
