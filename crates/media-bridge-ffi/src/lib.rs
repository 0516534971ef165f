//! C FFI surface for media-bridge.
//!
//! Pattern: one global registry + C strings + JSON for argument lists.
//!
//! The host installs an exec function that receives every outbound call,
//! then pushes native notifications back in with `media_on_status`. Calls
//! that expect a direct reply carry a non-zero token; the host answers them
//! later with `media_reply`.
//!
//! Handles are addressed by id string. The FFI keeps its own id → handle
//! table, so an id stays usable after the registry evicts it on release;
//! only notifications for it stop arriving.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use media_bridge_core::handle::{ErrorFn, PositionFn, StatusFn, SuccessFn};
use media_bridge_core::{
    BridgeCall, CallbackArg, CallbackArgs, ExecCallbacks, LogBridge, MediaConfig, MediaErrorReport,
    MediaHandle, MediaId, MediaRegistry, MediaState, NativeBridge,
};
use parking_lot::{const_mutex, Mutex};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Error handling (thread-local last error)
// ---------------------------------------------------------------------------

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_error(msg: String) {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = Some(msg));
}

fn clear_error() {
    LAST_ERROR.with(|cell| *cell.borrow_mut() = None);
}

/// Returns the last error message (caller frees with `media_string_free`).
#[no_mangle]
pub extern "C" fn media_last_error() -> *mut c_char {
    LAST_ERROR.with(|cell| {
        cell.borrow_mut()
            .take()
            .and_then(|s| CString::new(s).ok())
            .map(|s| s.into_raw())
            .unwrap_or(ptr::null_mut())
    })
}

/// Frees a string returned from media-bridge FFI.
///
/// # Safety
/// Must be a pointer returned from this FFI and not already freed.
#[no_mangle]
pub unsafe extern "C" fn media_string_free(ptr: *mut c_char) {
    if !ptr.is_null() {
        let _ = CString::from_raw(ptr);
    }
}

// ---------------------------------------------------------------------------
// Host types
// ---------------------------------------------------------------------------

/// Host exec function.
///
/// Receives service, action and the JSON argument array. `reply_token` is 0
/// unless the call expects a `media_reply`. May return a JSON acknowledgement;
/// the string stays owned by the host and is copied before `exec` returns to
/// the caller.
pub type ExecFn = extern "C" fn(
    user_data: *mut c_void,
    service: *const c_char,
    action: *const c_char,
    args_json: *const c_char,
    reply_token: u64,
) -> *const c_char;

pub type SuccessCb = extern "C" fn(user_data: *mut c_void);
/// `code` is passed through exactly as the native side reported it.
pub type ErrorCb = extern "C" fn(user_data: *mut c_void, code: f64);
/// `state` is the raw state value; 0..=4 are the known states.
pub type StatusCb = extern "C" fn(user_data: *mut c_void, state: f64);
pub type PositionCb = extern "C" fn(user_data: *mut c_void, position: f64);
/// One-shot reply for `media_get_current_position`; `json` is borrowed.
pub type ReplyCb = extern "C" fn(user_data: *mut c_void, json: *const c_char);

pub const SLOT_ABSENT: i32 = 0;
pub const SLOT_FUNCTION: i32 = 1;

/// Constructor callbacks. Each `*_kind` says what the host passed:
/// `SLOT_ABSENT`, `SLOT_FUNCTION`, or any other value for something that is
/// not a function (construction then fails).
#[repr(C)]
pub struct MediaCallbacksC {
    pub success_kind: i32,
    pub success: Option<SuccessCb>,
    pub error_kind: i32,
    pub error: Option<ErrorCb>,
    pub status_kind: i32,
    pub status: Option<StatusCb>,
    pub position_kind: i32,
    pub position: Option<PositionCb>,
    pub user_data: *mut c_void,
}

/// Pointer that may cross threads; the host vouches for it.
#[derive(Clone, Copy)]
struct HostPtr(usize);

impl HostPtr {
    fn new(ptr: *mut c_void) -> Self {
        Self(ptr as usize)
    }

    fn get(self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

// ---------------------------------------------------------------------------
// Global state
// ---------------------------------------------------------------------------

static REGISTRY: Mutex<Option<Arc<MediaRegistry>>> = const_mutex(None);
static HANDLES: Mutex<BTreeMap<String, MediaHandle>> = const_mutex(BTreeMap::new());
static PENDING: Mutex<BTreeMap<u64, ExecCallbacks>> = const_mutex(BTreeMap::new());
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

struct HostBridge {
    exec: ExecFn,
    user_data: HostPtr,
}

impl NativeBridge for HostBridge {
    fn exec(&self, call: BridgeCall, callbacks: Option<ExecCallbacks>) -> Option<Value> {
        let (Ok(service), Ok(action), Ok(args)) = (
            CString::new(call.service.as_str()),
            CString::new(call.action.as_str()),
            CString::new(call.args_json()),
        ) else {
            log::warn!("media: {} not sent, interior NUL in call", call.action);
            return None;
        };

        let token = match callbacks {
            Some(cbs) => {
                let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
                PENDING.lock().insert(token, cbs);
                token
            }
            None => 0,
        };

        let ack = (self.exec)(
            self.user_data.get(),
            service.as_ptr(),
            action.as_ptr(),
            args.as_ptr(),
            token,
        );
        if ack.is_null() {
            return None;
        }
        let raw = unsafe { CStr::from_ptr(ack) }.to_string_lossy().into_owned();
        Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Creates the global registry. `exec` may be null, in which case calls are
/// only logged. `config_json` may be null for defaults.
/// Returns 1 on success, 0 on error. Calling it again replaces the registry
/// and forgets every handle and unanswered reply of the previous one.
///
/// # Safety
/// `config_json` must be null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_init(
    exec: Option<ExecFn>,
    user_data: *mut c_void,
    config_json: *const c_char,
) -> i32 {
    clear_error();
    let config = if config_json.is_null() {
        MediaConfig::default()
    } else {
        let parsed = read_cstr(config_json)
            .and_then(|s| MediaConfig::from_json(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(c) => c,
            Err(e) => {
                set_error(e);
                return 0;
            }
        }
    };

    let bridge: Arc<dyn NativeBridge> = match exec {
        Some(exec) => Arc::new(HostBridge {
            exec,
            user_data: HostPtr::new(user_data),
        }),
        None => Arc::new(LogBridge),
    };
    reset(Some(MediaRegistry::new(bridge, config)));
    1
}

/// Drops the global registry, its handles and any unanswered replies.
#[no_mangle]
pub extern "C" fn media_shutdown() {
    reset(None);
}

fn reset(registry: Option<Arc<MediaRegistry>>) {
    *REGISTRY.lock() = registry;
    HANDLES.lock().clear();
    PENDING.lock().clear();
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Creates a media handle. Returns its id (caller frees), or NULL with the
/// last error set.
///
/// # Safety
/// `src` must be a valid C string; `callbacks` must be null or point to a
/// valid `MediaCallbacksC`.
#[no_mangle]
pub unsafe extern "C" fn media_create(
    src: *const c_char,
    callbacks: *const MediaCallbacksC,
) -> *mut c_char {
    clear_error();
    let registry = match registry() {
        Ok(r) => r,
        Err(e) => return err_null(e),
    };
    let src = match read_cstr(src) {
        Ok(s) => s,
        Err(e) => return err_null(e),
    };
    let args = if callbacks.is_null() {
        CallbackArgs::default()
    } else {
        callback_args(&*callbacks)
    };

    match MediaHandle::construct(&registry, src, args) {
        Ok(handle) => {
            let id = handle.id().to_string();
            HANDLES.lock().insert(id.clone(), handle);
            to_cstr(id)
        }
        Err(e) => err_null(e.to_string()),
    }
}

fn callback_args(c: &MediaCallbacksC) -> CallbackArgs {
    let data = HostPtr::new(c.user_data);
    CallbackArgs {
        success: slot(c.success_kind, c.success, |f| {
            Box::new(move || f(data.get())) as SuccessFn
        }),
        error: slot(c.error_kind, c.error, |f| {
            Box::new(move |report: MediaErrorReport| f(data.get(), report.code)) as ErrorFn
        }),
        status: slot(c.status_kind, c.status, |f| {
            Box::new(move |state: MediaState| f(data.get(), state.code())) as StatusFn
        }),
        position: slot(c.position_kind, c.position, |f| {
            Box::new(move |pos: f64| f(data.get(), pos)) as PositionFn
        }),
    }
}

fn slot<C, F>(kind: i32, func: Option<C>, wrap: impl FnOnce(C) -> F) -> CallbackArg<F> {
    match (kind, func) {
        (SLOT_ABSENT, _) => CallbackArg::Absent,
        (SLOT_FUNCTION, Some(f)) => CallbackArg::Callable(wrap(f)),
        (SLOT_FUNCTION, None) => CallbackArg::NotCallable("null function pointer".into()),
        (other, _) => CallbackArg::NotCallable(format!("host value of kind {}", other)),
    }
}

// ---------------------------------------------------------------------------
// Operations (return 1 on success, 0 if the id does not resolve)
// ---------------------------------------------------------------------------

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_play(id: *const c_char) -> i32 {
    with_handle(id, |h| h.play())
}

/// Returns the bridge acknowledgement as JSON (caller frees), or NULL when
/// there was none or the id does not resolve (check `media_last_error`).
///
/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_stop(id: *const c_char) -> *mut c_char {
    clear_error();
    match handle_for(id) {
        Ok(h) => match h.stop() {
            Some(ack) => json_to_cstr(&ack),
            None => ptr::null_mut(),
        },
        Err(e) => err_null(e),
    }
}

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_pause(id: *const c_char) -> i32 {
    with_handle(id, |h| h.pause())
}

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_seek_to(id: *const c_char, milliseconds: i64) -> i32 {
    with_handle(id, |h| h.seek_to(milliseconds))
}

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_start_record(id: *const c_char) -> i32 {
    with_handle(id, |h| h.start_record())
}

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_stop_record(id: *const c_char) -> i32 {
    with_handle(id, |h| h.stop_record())
}

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_release(id: *const c_char) -> i32 {
    with_handle(id, |h| h.release())
}

/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_set_volume(id: *const c_char, volume: f64) -> i32 {
    with_handle(id, |h| h.set_volume(volume))
}

/// Asks the native side for the live position. Exactly one of `ok`/`err`
/// runs once the host answers the call via `media_reply`.
///
/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_get_current_position(
    id: *const c_char,
    ok: Option<ReplyCb>,
    err: Option<ReplyCb>,
    user_data: *mut c_void,
) -> i32 {
    let data = HostPtr::new(user_data);
    with_handle(id, |h| {
        h.get_current_position(
            move |v| reply_to(ok, data, &v),
            move |v| reply_to(err, data, &v),
        )
    })
}

fn reply_to(cb: Option<ReplyCb>, data: HostPtr, value: &Value) {
    if let Some(cb) = cb {
        if let Ok(json) = CString::new(value.to_string()) {
            cb(data.get(), json.as_ptr());
        }
    }
}

/// Cached duration, or -1 if unknown (including an unknown id).
///
/// # Safety
/// `id` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_duration(id: *const c_char) -> f64 {
    clear_error();
    match handle_for(id) {
        Ok(h) => h.duration(),
        Err(e) => {
            set_error(e);
            -1.0
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Native status notification. Unknown ids and kinds are ignored.
///
/// # Safety
/// `id` must be null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_on_status(id: *const c_char, kind: i32, value: f64) {
    let (Ok(registry), Ok(id)) = (registry(), read_cstr(id)) else {
        return;
    };
    registry.on_status(&id, kind, value);
}

/// Answers a call that carried `token`. `ok` non-zero runs the success side.
/// `json` may be null. Returns 0 if the token is unknown or already used.
///
/// # Safety
/// `json` must be null or a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn media_reply(token: u64, ok: i32, json: *const c_char) -> i32 {
    clear_error();
    let Some(callbacks) = PENDING.lock().remove(&token) else {
        set_error(format!("unknown reply token {}", token));
        return 0;
    };
    let value = if json.is_null() {
        Value::Null
    } else {
        let raw = CStr::from_ptr(json).to_string_lossy().into_owned();
        serde_json::from_str(&raw).unwrap_or(Value::String(raw))
    };
    if ok != 0 {
        callbacks.succeed(value);
    } else {
        callbacks.fail(value);
    }
    1
}

/// Version of this FFI surface.
#[no_mangle]
pub extern "C" fn media_version() -> u32 {
    1
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn registry() -> Result<Arc<MediaRegistry>, String> {
    REGISTRY
        .lock()
        .clone()
        .ok_or_else(|| "media_init has not been called".into())
}

fn handle_for(id: *const c_char) -> Result<MediaHandle, String> {
    let id = read_cstr(id)?;
    MediaId::parse(&id)
        .and_then(|key| HANDLES.lock().get(&key.to_string()).cloned())
        .ok_or_else(|| format!("no media handle {}", id))
}

fn with_handle(id: *const c_char, op: impl FnOnce(&MediaHandle)) -> i32 {
    clear_error();
    match handle_for(id) {
        Ok(h) => {
            op(&h);
            1
        }
        Err(e) => {
            set_error(e);
            0
        }
    }
}

fn read_cstr(ptr: *const c_char) -> Result<String, String> {
    if ptr.is_null() {
        return Err("null string pointer".into());
    }
    unsafe {
        CStr::from_ptr(ptr)
            .to_str()
            .map(String::from)
            .map_err(|_| "invalid utf-8".into())
    }
}

fn json_to_cstr<T: serde::Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => to_cstr(json),
        Err(e) => err_null(e.to_string()),
    }
}

fn to_cstr(s: String) -> *mut c_char {
    CString::new(s)
        .map(|c| c.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn err_null(msg: String) -> *mut c_char {
    set_error(msg);
    ptr::null_mut()
}

// ---------------------------------------------------------------------------
// FFI Integration Tests
// ---------------------------------------------------------------------------
