//! Outbound channel to the native media service.
//!
//! Handles never talk to the platform directly. Each operation becomes one
//! [`BridgeCall`] handed to a [`NativeBridge`]; completion is reported later
//! through the registry's status entry point, not through the call.

use serde_json::Value;

use crate::models::MediaAction;

/// One-shot reply continuation.
pub type ReplyFn = Box<dyn FnOnce(Value) + Send>;

/// One request to the native side: service, operation and ordered arguments
/// headed by the media id.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeCall {
    pub service: String,
    pub action: MediaAction,
    pub args: Vec<Value>,
}

impl BridgeCall {
    /// Arguments as a JSON array string.
    pub fn args_json(&self) -> String {
        serde_json::to_string(&self.args).unwrap_or_else(|_| "[]".into())
    }
}

/// Success/error continuations for calls that expect a direct reply.
/// Exactly one of them is meant to run.
pub struct ExecCallbacks {
    on_success: ReplyFn,
    on_error: ReplyFn,
}

impl ExecCallbacks {
    pub fn new(
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(Value) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    pub fn succeed(self, value: Value) {
        (self.on_success)(value)
    }

    pub fn fail(self, value: Value) {
        (self.on_error)(value)
    }
}

impl std::fmt::Debug for ExecCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ExecCallbacks")
    }
}

/// Trait for native execution channels.
///
/// `exec` must not block on the operation itself. The returned value only
/// acknowledges dispatch and is passed through untouched where the caller
/// asks for it.
pub trait NativeBridge: Send + Sync {
    fn exec(&self, call: BridgeCall, callbacks: Option<ExecCallbacks>) -> Option<Value>;
}

/// Silent bridge for headless use. Replies are dropped, never resolved.
pub struct NoopBridge;

impl NativeBridge for NoopBridge {
    fn exec(&self, _: BridgeCall, _: Option<ExecCallbacks>) -> Option<Value> {
        None
    }
}

/// Bridge that only logs what would have been sent.
pub struct LogBridge;

impl NativeBridge for LogBridge {
    fn exec(&self, call: BridgeCall, callbacks: Option<ExecCallbacks>) -> Option<Value> {
        log::info!("media: {}.{} {}", call.service, call.action, call.args_json());
        if callbacks.is_some() {
            log::debug!("media: no native host, reply for {} dropped", call.action);
        }
        None
    }
}
