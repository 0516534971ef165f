//! Trace replay: drive handles and native notifications from JSON lines.
//!
//! One record per line, e.g.
//!
//! ```text
//! {"op":"create","name":"a","src":"track.mp3","callbacks":{"status":"log"}}
//! {"op":"play","name":"a"}
//! {"op":"status","name":"a","kind":1,"value":4}
//! ```
//!
//! Everything observable (outbound calls, callback firings, cached reads)
//! is written to the output, one line per event, in the order it happened.

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use thiserror::Error;

use media_bridge_core::handle::{ErrorFn, PositionFn, StatusFn, SuccessFn};
use media_bridge_core::{
    BridgeCall, CallbackArg, CallbackArgs, ExecCallbacks, LogBridge, MediaConfig, MediaErrorReport,
    MediaHandle, MediaRegistry, MediaState, NativeBridge,
};

/// Callback slot value meaning "a function that prints its invocation".
const LOG_CALLBACK: &str = "log";

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum TraceOp {
    Create {
        name: String,
        src: String,
        #[serde(default)]
        callbacks: TraceCallbacks,
    },
    Play { name: String },
    Stop { name: String },
    Pause { name: String },
    SeekTo { name: String, ms: i64 },
    StartRecord { name: String },
    StopRecord { name: String },
    Release { name: String },
    SetVolume { name: String, volume: f64 },
    /// Live position query, answered by a later `reply` record.
    Position { name: String },
    /// Cached duration read.
    Duration { name: String },
    /// Native notification.
    Status { name: String, kind: i32, value: f64 },
    /// Resolves the oldest unanswered query.
    Reply {
        ok: bool,
        #[serde(default)]
        value: Value,
    },
}

#[derive(Debug, Default, Deserialize)]
struct TraceCallbacks {
    #[serde(default)]
    success: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    position: Option<Value>,
}

type Transcript = Arc<Mutex<Vec<String>>>;

/// Bridge that writes each call to the transcript and parks reply
/// continuations until a `reply` record arrives.
struct TraceBridge {
    transcript: Transcript,
    pending: Mutex<VecDeque<ExecCallbacks>>,
}

impl NativeBridge for TraceBridge {
    fn exec(&self, call: BridgeCall, callbacks: Option<ExecCallbacks>) -> Option<Value> {
        self.transcript.lock().push(format!(
            "-> {}.{} {}",
            call.service,
            call.action,
            call.args_json()
        ));
        LogBridge.exec(call, None);
        if let Some(cbs) = callbacks {
            self.pending.lock().push_back(cbs);
        }
        None
    }
}

pub struct Replay {
    registry: Arc<MediaRegistry>,
    bridge: Arc<TraceBridge>,
    handles: HashMap<String, MediaHandle>,
    transcript: Transcript,
}

impl Replay {
    pub fn new(config: MediaConfig) -> Self {
        let transcript: Transcript = Arc::new(Mutex::new(Vec::new()));
        let bridge = Arc::new(TraceBridge {
            transcript: Arc::clone(&transcript),
            pending: Mutex::new(VecDeque::new()),
        });
        Self {
            registry: MediaRegistry::new(bridge.clone(), config),
            bridge,
            handles: HashMap::new(),
            transcript,
        }
    }

    /// Replay every record in `input`. Blank lines and `#` comments are
    /// skipped. Returns the number of records applied.
    pub fn run(&mut self, input: impl BufRead, out: &mut impl Write) -> Result<usize, ReplayError> {
        let mut applied = 0;
        for (index, line) in input.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let op: TraceOp = serde_json::from_str(trimmed).map_err(|source| ReplayError::Parse {
                line: index + 1,
                source,
            })?;
            log::debug!("media: replaying {:?}", op);
            self.apply(op);
            self.flush(out)?;
            applied += 1;
        }
        Ok(applied)
    }

    fn flush(&self, out: &mut impl Write) -> io::Result<()> {
        let lines: Vec<String> = self.transcript.lock().drain(..).collect();
        for line in lines {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }

    fn note(&self, line: String) {
        self.transcript.lock().push(line);
    }

    fn apply(&mut self, op: TraceOp) {
        match op {
            TraceOp::Create {
                name,
                src,
                callbacks,
            } => self.create(name, src, callbacks),
            TraceOp::Play { name } => self.with(&name, |h| h.play()),
            TraceOp::Stop { name } => {
                if let Some(ack) = self.handles.get(&name).and_then(|h| h.stop()) {
                    self.note(format!("{}: stop ack {}", name, ack));
                } else if !self.handles.contains_key(&name) {
                    self.missing(&name);
                }
            }
            TraceOp::Pause { name } => self.with(&name, |h| h.pause()),
            TraceOp::SeekTo { name, ms } => self.with(&name, |h| h.seek_to(ms)),
            TraceOp::StartRecord { name } => self.with(&name, |h| h.start_record()),
            TraceOp::StopRecord { name } => self.with(&name, |h| h.stop_record()),
            TraceOp::Release { name } => self.with(&name, |h| h.release()),
            TraceOp::SetVolume { name, volume } => self.with(&name, |h| h.set_volume(volume)),
            TraceOp::Position { name } => {
                let ok_log = Arc::clone(&self.transcript);
                let err_log = Arc::clone(&self.transcript);
                let (ok_name, err_name) = (name.clone(), name.clone());
                self.with(&name, move |h| {
                    h.get_current_position(
                        move |v| ok_log.lock().push(format!("{}: current position {}", ok_name, v)),
                        move |v| {
                            err_log
                                .lock()
                                .push(format!("{}: current position failed {}", err_name, v))
                        },
                    )
                });
            }
            TraceOp::Duration { name } => match self.handles.get(&name) {
                Some(h) => self.note(format!("{}: duration {}", name, h.duration())),
                None => self.missing(&name),
            },
            TraceOp::Status { name, kind, value } => match self.handles.get(&name) {
                Some(h) => self.registry.on_status(&h.id().to_string(), kind, value),
                None => self.missing(&name),
            },
            TraceOp::Reply { ok, value } => {
                let next = self.bridge.pending.lock().pop_front();
                match next {
                    Some(cbs) if ok => cbs.succeed(value),
                    Some(cbs) => cbs.fail(value),
                    None => self.note("!! no pending reply".into()),
                }
            }
        }
    }

    fn create(&mut self, name: String, src: String, callbacks: TraceCallbacks) {
        let t = &self.transcript;
        let args = CallbackArgs {
            success: slot(callbacks.success, |line| {
                let (t, name) = (Arc::clone(t), name.clone());
                Box::new(move || t.lock().push(format!("{}: {}", name, line))) as SuccessFn
            }),
            error: slot(callbacks.error, |line| {
                let (t, name) = (Arc::clone(t), name.clone());
                Box::new(move |report: MediaErrorReport| {
                    let payload = serde_json::to_string(&report).unwrap_or_default();
                    t.lock().push(format!("{}: {} {}", name, line, payload))
                }) as ErrorFn
            }),
            status: slot(callbacks.status, |line| {
                let (t, name) = (Arc::clone(t), name.clone());
                Box::new(move |state: MediaState| {
                    t.lock()
                        .push(format!("{}: {} {} ({})", name, line, state, state.code()))
                }) as StatusFn
            }),
            position: slot(callbacks.position, |line| {
                let (t, name) = (Arc::clone(t), name.clone());
                Box::new(move |pos: f64| t.lock().push(format!("{}: {} {}", name, line, pos)))
                    as PositionFn
            }),
        };

        match MediaHandle::construct(&self.registry, src, args) {
            Ok(handle) => {
                self.note(format!("{} = {}", name, handle.id()));
                self.handles.insert(name, handle);
            }
            Err(e) => self.note(format!("!! create {} failed: {}", name, e)),
        }
    }

    fn with(&self, name: &str, op: impl FnOnce(&MediaHandle)) {
        match self.handles.get(name) {
            Some(h) => op(h),
            None => self.missing(name),
        }
    }

    fn missing(&self, name: &str) {
        self.note(format!("!! no handle named {}", name));
    }
}

/// Map a trace slot value onto a callback argument. `make` receives the
/// label the callback prints.
fn slot<F>(value: Option<Value>, make: impl FnOnce(&'static str) -> F) -> CallbackArg<F> {
    match value {
        None | Some(Value::Null) => CallbackArg::Absent,
        Some(Value::String(s)) if s == LOG_CALLBACK => CallbackArg::Callable(make("callback")),
        Some(other) => CallbackArg::NotCallable(type_name(&other).into()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
