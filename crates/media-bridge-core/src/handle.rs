//! Per-resource media handle.
//!
//! A handle owns nothing native. It holds the source locator, the
//! application callbacks and a cache of what the native side last reported,
//! and turns each method call into exactly one bridge call.

use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::bridge::ExecCallbacks;
use crate::config::RetentionPolicy;
use crate::error::{MediaError, Result};
use crate::models::{MediaAction, MediaErrorReport, MediaId, MediaState};
use crate::registry::MediaRegistry;

pub type SuccessFn = Box<dyn Fn() + Send + Sync>;
pub type ErrorFn = Box<dyn Fn(MediaErrorReport) + Send + Sync>;
pub type StatusFn = Box<dyn Fn(MediaState) + Send + Sync>;
pub type PositionFn = Box<dyn Fn(f64) + Send + Sync>;

/// Value reported for duration and position before the native side says
/// anything.
pub const UNKNOWN: f64 = -1.0;

// ---------------------------------------------------------------------------
// Callback arguments
// ---------------------------------------------------------------------------

/// Which constructor callback a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackSlot {
    Success,
    Error,
    Status,
    Position,
}

impl fmt::Display for CallbackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackSlot::Success => "success callback",
            CallbackSlot::Error => "error callback",
            CallbackSlot::Status => "status callback",
            CallbackSlot::Position => "position callback",
        };
        f.write_str(name)
    }
}

/// A callback as supplied by a host that cannot guarantee callability.
pub enum CallbackArg<F> {
    Absent,
    Callable(F),
    /// The host passed something that is not a function; the string says
    /// what it was.
    NotCallable(String),
}

impl<F> Default for CallbackArg<F> {
    fn default() -> Self {
        CallbackArg::Absent
    }
}

impl<F> From<Option<F>> for CallbackArg<F> {
    fn from(value: Option<F>) -> Self {
        value.map_or(CallbackArg::Absent, CallbackArg::Callable)
    }
}

impl<F> CallbackArg<F> {
    fn into_slot(self, slot: CallbackSlot) -> Result<Option<F>> {
        match self {
            CallbackArg::Absent => Ok(None),
            CallbackArg::Callable(f) => Ok(Some(f)),
            CallbackArg::NotCallable(found) => {
                log::error!("media: {} is not a function", slot);
                Err(MediaError::CallbackNotCallable { slot, found })
            }
        }
    }
}

/// The four optional constructor callbacks.
#[derive(Default)]
pub struct CallbackArgs {
    pub success: CallbackArg<SuccessFn>,
    pub error: CallbackArg<ErrorFn>,
    pub status: CallbackArg<StatusFn>,
    pub position: CallbackArg<PositionFn>,
}

// ---------------------------------------------------------------------------
// Shared state (what the registry holds)
// ---------------------------------------------------------------------------

pub(crate) struct Callbacks {
    pub(crate) success: Option<SuccessFn>,
    pub(crate) error: Option<ErrorFn>,
    pub(crate) status: Option<StatusFn>,
    pub(crate) position: Option<PositionFn>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Cache {
    pub(crate) duration: f64,
    pub(crate) position: f64,
    pub(crate) last_state: Option<MediaState>,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            duration: UNKNOWN,
            position: UNKNOWN,
            last_state: None,
        }
    }
}

pub(crate) struct HandleShared {
    pub(crate) id: MediaId,
    pub(crate) src: String,
    pub(crate) callbacks: Callbacks,
    /// Written only by status dispatch.
    pub(crate) cache: Mutex<Cache>,
}

// ---------------------------------------------------------------------------
// MediaHandle
// ---------------------------------------------------------------------------

/// One playable/recordable media resource.
///
/// Cloning is cheap and every clone addresses the same registry entry.
#[derive(Clone)]
pub struct MediaHandle {
    shared: Arc<HandleShared>,
    registry: Arc<MediaRegistry>,
}

impl MediaHandle {
    /// Validate the callbacks, then register a fresh handle.
    ///
    /// The first non-callable slot (checked in success, error, status,
    /// position order) aborts construction before an id exists.
    pub fn construct(
        registry: &Arc<MediaRegistry>,
        src: impl Into<String>,
        args: CallbackArgs,
    ) -> Result<Self> {
        let callbacks = Callbacks {
            success: args.success.into_slot(CallbackSlot::Success)?,
            error: args.error.into_slot(CallbackSlot::Error)?,
            status: args.status.into_slot(CallbackSlot::Status)?,
            position: args.position.into_slot(CallbackSlot::Position)?,
        };

        let shared = Arc::new(HandleShared {
            id: MediaId::generate(),
            src: src.into(),
            callbacks,
            cache: Mutex::new(Cache::default()),
        });
        registry.insert(Arc::clone(&shared));

        Ok(Self {
            shared,
            registry: Arc::clone(registry),
        })
    }

    pub fn builder(registry: &Arc<MediaRegistry>, src: impl Into<String>) -> MediaHandleBuilder {
        MediaHandleBuilder {
            registry: Arc::clone(registry),
            src: src.into(),
            args: CallbackArgs::default(),
        }
    }

    pub(crate) fn from_parts(shared: Arc<HandleShared>, registry: Arc<MediaRegistry>) -> Self {
        Self { shared, registry }
    }

    pub fn id(&self) -> MediaId {
        self.shared.id
    }

    pub fn src(&self) -> &str {
        &self.shared.src
    }

    // -----------------------------------------------------------------------
    // Bridge operations
    // -----------------------------------------------------------------------

    /// Start or resume playback of `src`.
    pub fn play(&self) {
        self.exec(MediaAction::StartPlayingAudio, vec![self.src_arg()], None);
    }

    /// Stop playback. Returns whatever the bridge acknowledged, untouched.
    pub fn stop(&self) -> Option<Value> {
        self.exec(MediaAction::StopPlayingAudio, Vec::new(), None)
    }

    pub fn pause(&self) {
        self.exec(MediaAction::PausePlayingAudio, Vec::new(), None);
    }

    /// Seek to an absolute position. Bounds are the native side's problem.
    pub fn seek_to(&self, milliseconds: i64) {
        self.exec(MediaAction::SeekToAudio, vec![Value::from(milliseconds)], None);
    }

    /// Ask the native side for the live position. The reply goes straight
    /// to these one-shot callbacks and does not touch the cache.
    pub fn get_current_position(
        &self,
        on_success: impl FnOnce(Value) + Send + 'static,
        on_error: impl FnOnce(Value) + Send + 'static,
    ) {
        self.exec(
            MediaAction::GetCurrentPositionAudio,
            Vec::new(),
            Some(ExecCallbacks::new(on_success, on_error)),
        );
    }

    /// Start recording into `src`.
    pub fn start_record(&self) {
        self.exec(MediaAction::StartRecordingAudio, vec![self.src_arg()], None);
    }

    pub fn stop_record(&self) {
        self.exec(MediaAction::StopRecordingAudio, Vec::new(), None);
    }

    /// Tell the native side it may reclaim resources for this id. The
    /// handle stays usable either way.
    pub fn release(&self) {
        self.exec(MediaAction::Release, Vec::new(), None);
        if self.registry.config().retention == RetentionPolicy::EvictOnRelease {
            self.registry.remove(&self.shared.id);
        }
    }

    pub fn set_volume(&self, volume: f64) {
        self.exec(MediaAction::SetVolume, vec![Value::from(volume)], None);
    }

    // -----------------------------------------------------------------------
    // Cached state
    // -----------------------------------------------------------------------

    /// Last duration the native side reported, or -1 if none yet.
    pub fn duration(&self) -> f64 {
        self.shared.cache.lock().duration
    }

    /// Last state the native side reported, if any.
    pub fn last_state(&self) -> Option<MediaState> {
        self.shared.cache.lock().last_state
    }

    #[cfg(test)]
    pub(crate) fn cached_position(&self) -> f64 {
        self.shared.cache.lock().position
    }

    fn src_arg(&self) -> Value {
        Value::String(self.shared.src.clone())
    }

    fn exec(
        &self,
        action: MediaAction,
        extra: Vec<Value>,
        callbacks: Option<ExecCallbacks>,
    ) -> Option<Value> {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(Value::String(self.shared.id.to_string()));
        args.extend(extra);
        self.registry.exec(action, args, callbacks)
    }
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandle")
            .field("id", &self.shared.id)
            .field("src", &self.shared.src)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Typed construction path. Every slot it fills is callable, so `build`
/// never trips callback validation.
pub struct MediaHandleBuilder {
    registry: Arc<MediaRegistry>,
    src: String,
    args: CallbackArgs,
}

impl MediaHandleBuilder {
    pub fn on_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.args.success = CallbackArg::Callable(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(MediaErrorReport) + Send + Sync + 'static) -> Self {
        self.args.error = CallbackArg::Callable(Box::new(f));
        self
    }

    pub fn on_status(mut self, f: impl Fn(MediaState) + Send + Sync + 'static) -> Self {
        self.args.status = CallbackArg::Callable(Box::new(f));
        self
    }

    pub fn on_position(mut self, f: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.args.position = CallbackArg::Callable(Box::new(f));
        self
    }

    pub fn build(self) -> Result<MediaHandle> {
        MediaHandle::construct(&self.registry, self.src, self.args)
    }
}
