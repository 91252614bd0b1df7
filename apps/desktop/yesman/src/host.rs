//! Embedder-facing host: one channel, one face, one settings store.
//!
//! [`FaceHost`] is the boundary a presentation layer talks to. `start()` and
//! `stop()` map onto the channel's connect and disconnect, `get_status()`
//! gathers everything a status panel shows, and the `send_*` helpers wrap
//! client payloads. Inbound `log_entry` envelopes are replayed into the local
//! log and `system_status` envelopes update the service health record.

use crate::error::YesmanError;

use bridge_core::bridge::BridgeChannel;
use bridge_core::bridge::stats::StatsSnapshot;
use bridge_core::config::{AppConfig, BridgeConfig};
use bridge_core::face::{FaceLink, FaceStore, attach_face};
use bridge_core::pubsub::SubscriptionId;
use bridge_core::settings::SettingsStore;

use models::{
    ConnectionSnapshot, Envelope, FaceSnapshot, LogEntry, LogLevel, Payload, ServiceHealth,
    SettingsUpdate, SystemCommand, UserInput,
};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use log::{Level, debug, error, info, log};
use serde_json::Value;

/// Everything the presentation layer needs to render status.
#[derive(Debug, Clone, PartialEq)]
pub struct HostStatus {
    pub connection: ConnectionSnapshot,
    pub face: FaceSnapshot,
    pub services: ServiceHealth,
    pub stats: StatsSnapshot,
}

pub struct FaceHost {
    channel: BridgeChannel,
    face: FaceStore,
    settings: SettingsStore,
    services: Arc<Mutex<ServiceHealth>>,
    link: Mutex<Option<FaceLink>>,
    relay_subscription: SubscriptionId,
}

impl FaceHost {
    /// Wire a channel and a face store from the current settings. Nothing
    /// connects until [`FaceHost::start`].
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new(config: BridgeConfig, settings: SettingsStore) -> Self {
        let current = settings.get().await;

        let channel = BridgeChannel::spawn(config);
        let face = FaceStore::spawn(current.display.overrides);
        let link = attach_face(&channel, &face, current.behavior.echo_face_state);

        let services = Arc::new(Mutex::new(ServiceHealth::default()));
        let relay_services = Arc::clone(&services);
        let relay_subscription =
            channel.on_message(move |envelope| relay_inbound(envelope, &relay_services));

        info!(
            "Face host ready for {} (echo face state: {})",
            channel.endpoint(),
            current.behavior.echo_face_state
        );

        Self {
            channel,
            face,
            settings,
            services,
            link: Mutex::new(Some(link)),
            relay_subscription,
        }
    }

    /// Open the link to the core.
    pub fn start(&self) {
        info!("Starting face host");
        self.channel.connect();
    }

    /// Close the link and stop reconnecting.
    pub fn stop(&self) {
        info!("Stopping face host");
        self.channel.disconnect();
    }

    /// Reset the backoff and reconnect now, including from `failed`.
    pub fn reconnect(&self) {
        self.channel.force_reconnect();
    }

    pub fn get_status(&self) -> HostStatus {
        HostStatus {
            connection: self.channel.status(),
            face: self.face.snapshot(),
            services: *lock(&self.services),
            stats: self.channel.stats(),
        }
    }

    pub fn channel(&self) -> &BridgeChannel {
        &self.channel
    }

    pub fn face(&self) -> &FaceStore {
        &self.face
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Send typed user text to the core. Returns the envelope id.
    pub fn send_user_input(&self, text: impl Into<String>, session_id: Option<String>) -> String {
        self.channel.send(Payload::UserInput(UserInput {
            text: text.into(),
            session_id,
        }))
    }

    pub fn send_system_command(&self, command: impl Into<String>, params: Option<Value>) -> String {
        self.channel.send(Payload::SystemCommand(SystemCommand {
            command: command.into(),
            params,
        }))
    }

    /// Forward a presentation-side log line to the core.
    pub fn forward_log(&self, level: LogLevel, message: impl Into<String>, data: Option<Value>) -> String {
        self.channel.send(Payload::LogEntry(LogEntry {
            level,
            message: message.into(),
            data,
        }))
    }

    /// Validate and persist a settings patch, apply it locally, then tell the
    /// core.
    ///
    /// Face overrides take effect immediately. Changing `echo_face_state`
    /// re-attaches the face with the new echo setting.
    ///
    /// # Errors
    ///
    /// Returns [`YesmanError::Config`] if the patch is rejected; nothing is
    /// changed or sent in that case.
    pub async fn update_settings(&self, patch: Value) -> Result<AppConfig, YesmanError> {
        let previous = self.settings.get().await;
        let updated = self.settings.update(patch.clone()).await?;

        if updated.display.overrides != previous.display.overrides {
            self.face.set_overrides(updated.display.overrides).await?;
        }

        if updated.behavior.echo_face_state != previous.behavior.echo_face_state {
            self.reattach(updated.behavior.echo_face_state);
        }

        if let Value::Object(settings) = patch {
            self.channel
                .send(Payload::SettingsUpdate(SettingsUpdate { settings }));
        }

        Ok(updated)
    }

    /// Detach the face, stop the channel and wait for it to finish.
    pub async fn shutdown(&self) {
        info!("Shutting down face host");
        if let Some(link) = lock(&self.link).take() {
            link.detach();
        }
        self.channel.unsubscribe_message(self.relay_subscription);
        self.channel.shutdown().await;
    }

    fn reattach(&self, echo: bool) {
        let mut link = lock(&self.link);
        if let Some(old) = link.take() {
            old.detach();
        }
        *link = Some(attach_face(&self.channel, &self.face, echo));
        info!("Face re-attached (echo face state: {})", echo);
    }
}

/// Side effects of inbound envelopes that are not face events.
fn relay_inbound(envelope: &Envelope, services: &Mutex<ServiceHealth>) {
    match &envelope.payload {
        Payload::LogEntry(entry) => match &entry.data {
            Some(data) => log!(target: "core", level_for(entry.level), "{} {}", entry.message, data),
            None => log!(target: "core", level_for(entry.level), "{}", entry.message),
        },
        Payload::SystemStatus(status) => {
            let health = ServiceHealth::from_status(status, SystemTime::now());
            let mut current = lock(services);
            let changed = current.python_layer != health.python_layer
                || current.voicevox != health.voicevox
                || current.langflow != health.langflow
                || current.updated_at.is_none();
            *current = health;
            if changed {
                info!(
                    "Core services: python={} voicevox={} langflow={}",
                    health.python_layer, health.voicevox, health.langflow
                );
            }
        }
        Payload::Error(report) => error!("Core reported an error: {}", report.message),
        Payload::AgentResponse(response) => debug!(
            "Agent responded in {}ms (session {:?})",
            response.execution_time_ms, response.session_id
        ),
        _ => {}
    }
}

pub fn level_for(level: LogLevel) -> Level {
    match level {
        LogLevel::Debug => Level::Debug,
        LogLevel::Info => Level::Info,
        LogLevel::Warning => Level::Warn,
        LogLevel::Error => Level::Error,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
