//! media-bridge-core — media handles over an opaque native bridge.
//!
//! No decoding, no device I/O, no state machine. Every operation is a
//! single request to the native media service; everything the service has
//! to say comes back asynchronously as a status notification.
//!
//! # Architecture
//!
//! ```text
//! app ──► MediaHandle ──► MediaRegistry::exec ──► NativeBridge (host)
//!                                                      │
//! app ◄── callbacks ◄── MediaRegistry::on_status ◄─────┘
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod handle;
pub mod models;
pub mod registry;

pub use bridge::{BridgeCall, ExecCallbacks, LogBridge, NativeBridge, NoopBridge};
pub use config::{MediaConfig, RetentionPolicy};
pub use error::{MediaError, Result};
pub use handle::{CallbackArg, CallbackArgs, CallbackSlot, MediaHandle, MediaHandleBuilder};
pub use models::*;
pub use registry::MediaRegistry;

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Records every call; keeps reply continuations so tests can resolve
    /// them.
    #[derive(Default)]
    struct RecordingBridge {
        calls: Mutex<Vec<BridgeCall>>,
        replies: Mutex<Vec<ExecCallbacks>>,
        ack: Option<Value>,
    }

    impl RecordingBridge {
        fn calls(&self) -> Vec<BridgeCall> {
            self.calls.lock().clone()
        }

        fn last(&self) -> BridgeCall {
            self.calls.lock().last().cloned().expect("no bridge call")
        }
    }

    impl NativeBridge for RecordingBridge {
        fn exec(&self, call: BridgeCall, callbacks: Option<ExecCallbacks>) -> Option<Value> {
            self.calls.lock().push(call);
            if let Some(cbs) = callbacks {
                self.replies.lock().push(cbs);
            }
            self.ack.clone()
        }
    }

    fn setup() -> (Arc<RecordingBridge>, Arc<MediaRegistry>) {
        setup_with(MediaConfig::default())
    }

    fn setup_with(config: MediaConfig) -> (Arc<RecordingBridge>, Arc<MediaRegistry>) {
        let bridge = Arc::new(RecordingBridge::default());
        let registry = MediaRegistry::new(bridge.clone(), config);
        (bridge, registry)
    }

    /// Shared event log for callback ordering assertions.
    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    // -------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------

    #[test]
    fn non_callable_slot_aborts_before_registration() {
        let slots = [
            CallbackSlot::Success,
            CallbackSlot::Error,
            CallbackSlot::Status,
            CallbackSlot::Position,
        ];
        for slot in slots {
            let (bridge, registry) = setup();
            let mut args = CallbackArgs::default();
            let found = "number".to_string();
            match slot {
                CallbackSlot::Success => args.success = CallbackArg::NotCallable(found),
                CallbackSlot::Error => args.error = CallbackArg::NotCallable(found),
                CallbackSlot::Status => args.status = CallbackArg::NotCallable(found),
                CallbackSlot::Position => args.position = CallbackArg::NotCallable(found),
            }

            let err = MediaHandle::construct(&registry, "a.mp3", args).unwrap_err();
            match err {
                MediaError::CallbackNotCallable { slot: got, found } => {
                    assert_eq!(got, slot);
                    assert_eq!(found, "number");
                }
                other => panic!("unexpected error: {other}"),
            }
            assert!(registry.is_empty());
            assert!(bridge.calls().is_empty());
        }
    }

    #[test]
    fn first_bad_slot_is_reported() {
        let (_bridge, registry) = setup();
        let args = CallbackArgs {
            error: CallbackArg::NotCallable("string".into()),
            position: CallbackArg::NotCallable("object".into()),
            ..Default::default()
        };
        let err = MediaHandle::construct(&registry, "a.mp3", args).unwrap_err();
        assert!(matches!(
            err,
            MediaError::CallbackNotCallable { slot: CallbackSlot::Error, .. }
        ));
        assert_eq!(err.to_string(), "error callback is not a function (got string)");
    }

    #[test]
    fn construction_registers_without_bridge_traffic() {
        let (bridge, registry) = setup();
        let handle = MediaHandle::construct(&registry, "a.mp3", CallbackArgs::default()).unwrap();

        assert!(registry.contains(&handle.id()));
        assert_eq!(registry.len(), 1);
        assert_eq!(handle.src(), "a.mp3");
        assert_eq!(handle.duration(), -1.0);
        assert_eq!(handle.cached_position(), -1.0);
        assert_eq!(handle.last_state(), None);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let (_bridge, registry) = setup();
        let ids: HashSet<MediaId> = (0..500)
            .map(|i| {
                MediaHandle::builder(&registry, format!("{i}.mp3"))
                    .build()
                    .unwrap()
                    .id()
            })
            .collect();
        assert_eq!(ids.len(), 500);
        assert_eq!(registry.len(), 500);
    }

    #[test]
    fn option_converts_to_arg() {
        let none: CallbackArg<handle::SuccessFn> = None.into();
        assert!(matches!(none, CallbackArg::Absent));
        let success = Box::new(|| {}) as handle::SuccessFn;
        let some: CallbackArg<handle::SuccessFn> = Some(success).into();
        assert!(matches!(some, CallbackArg::Callable(_)));
    }

    // -------------------------------------------------------------------
    // Outbound calls
    // -------------------------------------------------------------------

    #[test]
    fn every_operation_sends_one_call() {
        let (bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        let id = Value::from(handle.id().to_string());

        handle.play();
        handle.pause();
        handle.stop();
        handle.seek_to(5000);
        handle.start_record();
        handle.stop_record();
        handle.set_volume(0.5);
        handle.get_current_position(|_| {}, |_| {});
        handle.release();

        let got: Vec<(String, &str, Vec<Value>)> = bridge
            .calls()
            .into_iter()
            .map(|c| (c.service, c.action.as_str(), c.args))
            .collect();
        let src = Value::from("track.mp3");
        let expected = vec![
            ("Media".to_string(), "startPlayingAudio", vec![id.clone(), src.clone()]),
            ("Media".to_string(), "pausePlayingAudio", vec![id.clone()]),
            ("Media".to_string(), "stopPlayingAudio", vec![id.clone()]),
            ("Media".to_string(), "seekToAudio", vec![id.clone(), json!(5000)]),
            ("Media".to_string(), "startRecordingAudio", vec![id.clone(), src]),
            ("Media".to_string(), "stopRecordingAudio", vec![id.clone()]),
            ("Media".to_string(), "setVolume", vec![id.clone(), json!(0.5)]),
            ("Media".to_string(), "getCurrentPositionAudio", vec![id.clone()]),
            ("Media".to_string(), "release", vec![id]),
        ];
        assert_eq!(got, expected);
        // Only the position query carries reply continuations.
        assert_eq!(bridge.replies.lock().len(), 1);
    }

    #[test]
    fn seek_does_not_touch_cached_position() {
        let (bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();

        handle.seek_to(5000);

        assert_eq!(bridge.calls().len(), 1);
        let call = bridge.last();
        assert_eq!(call.action, MediaAction::SeekToAudio);
        assert_eq!(call.args, vec![json!(handle.id().to_string()), json!(5000)]);
        assert_eq!(handle.cached_position(), -1.0);
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let (bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        handle.seek_to(-250);
        handle.set_volume(7.5);
        let calls = bridge.calls();
        assert_eq!(calls[0].args[1], json!(-250));
        assert_eq!(calls[1].args[1], json!(7.5));
    }

    #[test]
    fn stop_passes_bridge_ack_through() {
        let bridge = Arc::new(RecordingBridge {
            ack: Some(json!({"queued": true})),
            ..Default::default()
        });
        let registry = MediaRegistry::new(bridge.clone(), MediaConfig::default());
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        assert_eq!(handle.stop(), Some(json!({"queued": true})));

        let (_bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        assert_eq!(handle.stop(), None);
    }

    #[test]
    fn service_name_comes_from_config() {
        let config = MediaConfig {
            service_name: "AudioPlayer".into(),
            ..Default::default()
        };
        let (bridge, registry) = setup_with(config);
        MediaHandle::builder(&registry, "track.mp3").build().unwrap().play();
        assert_eq!(bridge.last().service, "AudioPlayer");
    }

    #[test]
    fn current_position_reply_reaches_caller_only() {
        let (bridge, registry) = setup();
        let status_log = journal();
        let log = status_log.clone();
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_status(move |s| log.lock().push(s.to_string()))
            .build()
            .unwrap();

        let got = journal();
        let ok = got.clone();
        let err = got.clone();
        handle.get_current_position(
            move |v| ok.lock().push(format!("ok {v}")),
            move |v| err.lock().push(format!("err {v}")),
        );

        let reply = bridge.replies.lock().pop().unwrap();
        reply.succeed(json!(12.5));

        assert_eq!(*got.lock(), vec!["ok 12.5".to_string()]);
        assert!(status_log.lock().is_empty());
        assert_eq!(handle.cached_position(), -1.0);
    }

    // -------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------

    #[test]
    fn duration_tracks_latest_notification() {
        let (_bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        let id = handle.id().to_string();

        assert_eq!(handle.duration(), -1.0);
        registry.on_status(&id, MessageKind::Duration.code(), 180_000.0);
        assert_eq!(handle.duration(), 180_000.0);
        registry.on_status(&id, MessageKind::Duration.code(), 1_000.0);
        assert_eq!(handle.duration(), 1_000.0);
        registry.on_status(&id, MessageKind::Duration.code(), -1.0);
        assert_eq!(handle.duration(), -1.0);
    }

    #[test]
    fn stopped_fires_success_then_status() {
        let (_bridge, registry) = setup();
        let events = journal();
        let (a, b) = (events.clone(), events.clone());
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_success(move || a.lock().push("success".into()))
            .on_status(move |s| b.lock().push(format!("status {}", s.code())))
            .build()
            .unwrap();
        let id = handle.id().to_string();

        registry.on_status(&id, 1, MediaState::Stopped.code());
        registry.on_status(&id, 1, MediaState::Stopped.code());

        assert_eq!(
            *events.lock(),
            vec!["success", "status 4", "success", "status 4"]
        );
        assert_eq!(handle.last_state(), Some(MediaState::Stopped));
    }

    #[test]
    fn other_states_skip_success() {
        let (_bridge, registry) = setup();
        let events = journal();
        let (a, b) = (events.clone(), events.clone());
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_success(move || a.lock().push("success".into()))
            .on_status(move |s| b.lock().push(s.to_string()))
            .build()
            .unwrap();
        let id = handle.id().to_string();

        for state in [
            MediaState::None,
            MediaState::Starting,
            MediaState::Running,
            MediaState::Paused,
            MediaState::Unknown(12.0),
        ] {
            registry.on_status(&id, 1, state.code());
        }

        assert_eq!(
            *events.lock(),
            vec!["None", "Starting", "Running", "Paused", "Unknown(12)"]
        );
        assert_eq!(handle.last_state(), Some(MediaState::Unknown(12.0)));
    }

    #[test]
    fn stopped_without_status_callback_still_succeeds() {
        let (_bridge, registry) = setup();
        let events = journal();
        let a = events.clone();
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_success(move || a.lock().push("success".into()))
            .build()
            .unwrap();
        registry.dispatch(&handle.id(), StatusMessage::State(MediaState::Stopped));
        assert_eq!(*events.lock(), vec!["success"]);
    }

    #[test]
    fn error_reaches_error_callback() {
        let (_bridge, registry) = setup();
        let reports = Arc::new(Mutex::new(Vec::new()));
        let r = reports.clone();
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_error(move |report| r.lock().push(report))
            .build()
            .unwrap();

        registry.on_status(&handle.id().to_string(), MessageKind::Error.code(), 2.0);
        registry.on_status(&handle.id().to_string(), MessageKind::Error.code(), 404.0);

        let got = reports.lock().clone();
        assert_eq!(got, vec![MediaErrorReport::new(2.0), MediaErrorReport::new(404.0)]);
        assert_eq!(got[0].kind(), Some(MediaErrorCode::Network));
    }

    #[test]
    fn error_codes_arrive_unchanged() {
        let (_bridge, registry) = setup();
        let reports = Arc::new(Mutex::new(Vec::new()));
        let r = reports.clone();
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_error(move |report: MediaErrorReport| r.lock().push(report.code))
            .build()
            .unwrap();
        let id = handle.id().to_string();

        registry.on_status(&id, MessageKind::Error.code(), 3e9);
        registry.on_status(&id, MessageKind::Error.code(), 2.5);
        registry.on_status(&id, MessageKind::Error.code(), -7.0);

        assert_eq!(*reports.lock(), vec![3e9, 2.5, -7.0]);
    }

    #[test]
    fn only_exact_stopped_fires_success() {
        let (_bridge, registry) = setup();
        let events = journal();
        let (a, b) = (events.clone(), events.clone());
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_success(move || a.lock().push("success".into()))
            .on_status(move |s| b.lock().push(s.to_string()))
            .build()
            .unwrap();
        let id = handle.id().to_string();

        registry.on_status(&id, 1, 4.9);
        registry.on_status(&id, 1, 3.999);
        registry.on_status(&id, 1, f64::NAN);
        registry.on_status(&id, 1, 4e12);

        assert_eq!(
            *events.lock(),
            vec!["Unknown(4.9)", "Unknown(3.999)", "Unknown(NaN)", "Unknown(4000000000000)"]
        );
        assert!(matches!(handle.last_state(), Some(MediaState::Unknown(v)) if v == 4e12));
    }

    #[test]
    fn error_without_callback_is_silent() {
        let (bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        assert!(registry.dispatch(&handle.id(), StatusMessage::Error(3.0)));
        assert_eq!(handle.duration(), -1.0);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn position_updates_cache_and_callback() {
        let (_bridge, registry) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_position(move |p| s.lock().push(p))
            .build()
            .unwrap();
        let id = handle.id().to_string();

        registry.on_status(&id, MessageKind::Position.code(), 3_000.0);
        registry.on_status(&id, MessageKind::Position.code(), 1_500.0);

        assert_eq!(*seen.lock(), vec![3_000.0, 1_500.0]);
        assert_eq!(handle.cached_position(), 1_500.0);
        assert_eq!(handle.duration(), -1.0);
    }

    #[test]
    fn unknown_id_and_kind_are_dropped() {
        let (_bridge, registry) = setup();
        let events = journal();
        let a = events.clone();
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_status(move |s| a.lock().push(s.to_string()))
            .build()
            .unwrap();

        registry.on_status("not-a-uuid", 1, 4.0);
        registry.on_status(&MediaId::generate().to_string(), 1, 4.0);
        assert!(!registry.dispatch(&MediaId::generate(), StatusMessage::Duration(5.0)));
        registry.on_status(&handle.id().to_string(), 42, 4.0);

        assert!(events.lock().is_empty());
        assert_eq!(handle.duration(), -1.0);
    }

    #[test]
    fn round_trip_play_scenario() {
        let (bridge, registry) = setup();
        let events = journal();
        let (a, b) = (events.clone(), events.clone());
        let handle = MediaHandle::builder(&registry, "track.mp3")
            .on_success(move || a.lock().push("success".into()))
            .on_status(move |s| b.lock().push(s.label().into()))
            .build()
            .unwrap();
        let id = handle.id().to_string();

        handle.play();
        let call = bridge.last();
        assert_eq!(call.service, "Media");
        assert_eq!(call.action.as_str(), "startPlayingAudio");
        assert_eq!(call.args, vec![json!(id), json!("track.mp3")]);

        registry.on_status(&id, 1, MediaState::Running.code());
        assert_eq!(*events.lock(), vec!["Running"]);

        registry.on_status(&id, 1, MediaState::Stopped.code());
        assert_eq!(*events.lock(), vec!["Running", "success", "Stopped"]);
    }

    #[test]
    fn callback_may_construct_during_dispatch() {
        let (_bridge, registry) = setup();
        let inner = Arc::clone(&registry);
        let spawned = Arc::new(Mutex::new(None));
        let slot = spawned.clone();
        let handle = MediaHandle::builder(&registry, "first.mp3")
            .on_success(move || {
                let next = MediaHandle::builder(&inner, "second.mp3").build().unwrap();
                next.play();
                *slot.lock() = Some(next.id());
            })
            .build()
            .unwrap();

        registry.dispatch(&handle.id(), StatusMessage::State(MediaState::Stopped));

        let next = spawned.lock().expect("second handle");
        assert!(registry.contains(&next));
        assert_eq!(registry.len(), 2);
    }

    // -------------------------------------------------------------------
    // Retention
    // -------------------------------------------------------------------

    #[test]
    fn release_retains_by_default() {
        let (bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        handle.release();
        assert_eq!(bridge.last().action, MediaAction::Release);
        assert!(registry.contains(&handle.id()));

        registry.on_status(&handle.id().to_string(), 2, 10.0);
        assert_eq!(handle.duration(), 10.0);
    }

    #[test]
    fn release_evicts_when_configured() {
        let config = MediaConfig {
            retention: RetentionPolicy::EvictOnRelease,
            ..Default::default()
        };
        let (bridge, registry) = setup_with(config);
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();

        handle.release();

        assert_eq!(bridge.last().action, MediaAction::Release);
        assert!(!registry.contains(&handle.id()));
        assert!(registry.lookup(&handle.id()).is_none());

        // Late notifications are dropped, the handle itself still works.
        registry.on_status(&handle.id().to_string(), 2, 10.0);
        assert_eq!(handle.duration(), -1.0);
        handle.play();
        assert_eq!(bridge.last().action, MediaAction::StartPlayingAudio);
    }

    #[test]
    fn lookup_returns_same_entry() {
        let (_bridge, registry) = setup();
        let handle = MediaHandle::builder(&registry, "track.mp3").build().unwrap();
        let found = registry.lookup_str(&handle.id().to_string()).unwrap();
        assert_eq!(found.id(), handle.id());
        assert_eq!(found.src(), "track.mp3");

        registry.dispatch(&handle.id(), StatusMessage::Duration(99.0));
        assert_eq!(found.duration(), 99.0);

        assert!(registry.remove(&handle.id()));
        assert!(!registry.remove(&handle.id()));
        assert!(registry.lookup_str("garbage").is_none());
    }
}
