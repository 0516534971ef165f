//! Process-wide handle registry and status dispatcher.
//!
//! The registry is the only thing the native side addresses: outbound calls
//! go through its bridge, inbound `(id, kind, value)` notifications come in
//! through [`MediaRegistry::on_status`].
//!
//! Callbacks always run with the entry map unlocked, so a callback may
//! create handles or issue operations without deadlocking.

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::bridge::{BridgeCall, ExecCallbacks, NativeBridge};
use crate::config::MediaConfig;
use crate::handle::{HandleShared, MediaHandle};
use crate::models::{MediaAction, MediaErrorReport, MediaId, MediaState, StatusMessage};

pub struct MediaRegistry {
    bridge: Arc<dyn NativeBridge>,
    config: MediaConfig,
    entries: Mutex<HashMap<MediaId, Arc<HandleShared>>>,
}

impl MediaRegistry {
    pub fn new(bridge: Arc<dyn NativeBridge>, config: MediaConfig) -> Arc<Self> {
        Arc::new(Self {
            bridge,
            config,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Entries
    // -----------------------------------------------------------------------

    pub(crate) fn insert(&self, shared: Arc<HandleShared>) {
        self.entries.lock().insert(shared.id, shared);
    }

    /// The handle registered under `id`, if any.
    pub fn lookup(self: &Arc<Self>, id: &MediaId) -> Option<MediaHandle> {
        let shared = self.entries.lock().get(id).cloned()?;
        Some(MediaHandle::from_parts(shared, Arc::clone(self)))
    }

    /// Like [`lookup`](Self::lookup) for an id as it arrives from the host.
    pub fn lookup_str(self: &Arc<Self>, id: &str) -> Option<MediaHandle> {
        self.lookup(&MediaId::parse(id)?)
    }

    pub fn contains(&self, id: &MediaId) -> bool {
        self.entries.lock().contains_key(id)
    }

    /// Evict an entry. Later notifications for `id` are dropped.
    pub fn remove(&self, id: &MediaId) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    pub(crate) fn exec(
        &self,
        action: MediaAction,
        args: Vec<Value>,
        callbacks: Option<ExecCallbacks>,
    ) -> Option<Value> {
        let call = BridgeCall {
            service: self.config.service_name.clone(),
            action,
            args,
        };
        self.bridge.exec(call, callbacks)
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Entry point for native status notifications. Never fails: an id
    /// that does not resolve is dropped.
    pub fn on_status(&self, id: &str, kind: i32, value: f64) {
        match MediaId::parse(id) {
            Some(media_id) => {
                self.dispatch(&media_id, StatusMessage::decode(kind, value));
            }
            None => log::debug!("media: dropping status {} for malformed id {:?}", kind, id),
        }
    }

    /// Route a decoded message to its handle. Returns whether a handle was
    /// found.
    pub fn dispatch(&self, id: &MediaId, message: StatusMessage) -> bool {
        let shared = match self.entries.lock().get(id).cloned() {
            Some(shared) => shared,
            None => {
                log::debug!("media: dropping {:?} for unknown id {}", message, id);
                return false;
            }
        };
        deliver(&shared, message);
        true
    }
}

fn deliver(shared: &HandleShared, message: StatusMessage) {
    let callbacks = &shared.callbacks;
    match message {
        StatusMessage::State(state) => {
            shared.cache.lock().last_state = Some(state);
            if state == MediaState::Stopped {
                if let Some(success) = &callbacks.success {
                    success();
                }
            }
            if let Some(status) = &callbacks.status {
                status(state);
            }
        }
        StatusMessage::Duration(duration) => {
            shared.cache.lock().duration = duration;
        }
        StatusMessage::Position(position) => {
            shared.cache.lock().position = position;
            if let Some(on_position) = &callbacks.position {
                on_position(position);
            }
        }
        StatusMessage::Error(code) => {
            if let Some(error) = &callbacks.error {
                error(MediaErrorReport::new(code));
            }
        }
        StatusMessage::Unrecognized { kind, value } => {
            log::debug!("media: ignoring message kind {} ({}) for {}", kind, value, shared.id);
        }
    }
}
