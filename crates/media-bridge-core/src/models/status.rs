//! Inbound status notifications.
//!
//! The native side reports `(id, kind, value)` triples. `StatusMessage` is
//! the decoded form: a tagged enum, genuinely needed for Rust dispatch.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// `value` as an `i32` when it is a whole number in range.
pub(crate) fn whole_code(value: f64) -> Option<i32> {
    let in_range = value >= i32::MIN as f64 && value <= i32::MAX as f64;
    (value.fract() == 0.0 && in_range).then_some(value as i32)
}

/// Writes whole codes as integers so `4.0` goes out as `4`.
pub(crate) fn serialize_code<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match whole_code(*value) {
        Some(code) => serializer.serialize_i32(code),
        None => serializer.serialize_f64(*value),
    }
}

/// Raw message kind codes sent by the native media service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MessageKind {
    State = 1,
    Duration = 2,
    Position = 3,
    Error = 9,
}

impl MessageKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(MessageKind::State),
            2 => Some(MessageKind::Duration),
            3 => Some(MessageKind::Position),
            9 => Some(MessageKind::Error),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

/// State of the native resource backing a handle.
///
/// Observed only. Anything else the native side sends (new codes, fractions,
/// NaN) arrives as `Unknown` with the raw value and is still forwarded to
/// the status callback.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "f64")]
pub enum MediaState {
    None,
    Starting,
    Running,
    Paused,
    Stopped,
    Unknown(f64),
}

impl MediaState {
    pub fn code(self) -> f64 {
        match self {
            MediaState::None => 0.0,
            MediaState::Starting => 1.0,
            MediaState::Running => 2.0,
            MediaState::Paused => 3.0,
            MediaState::Stopped => 4.0,
            MediaState::Unknown(raw) => raw,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaState::None => "None",
            MediaState::Starting => "Starting",
            MediaState::Running => "Running",
            MediaState::Paused => "Paused",
            MediaState::Stopped => "Stopped",
            MediaState::Unknown(_) => "Unknown",
        }
    }
}

impl From<f64> for MediaState {
    fn from(value: f64) -> Self {
        match whole_code(value) {
            Some(0) => MediaState::None,
            Some(1) => MediaState::Starting,
            Some(2) => MediaState::Running,
            Some(3) => MediaState::Paused,
            Some(4) => MediaState::Stopped,
            _ => MediaState::Unknown(value),
        }
    }
}

impl Serialize for MediaState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_code(&self.code(), serializer)
    }
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaState::Unknown(raw) => write!(f, "Unknown({})", raw),
            known => f.write_str(known.label()),
        }
    }
}

/// A decoded status notification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum StatusMessage {
    State(MediaState),
    Duration(f64),
    Position(f64),
    Error(f64),
    Unrecognized { kind: i32, value: f64 },
}

impl StatusMessage {
    /// Decode the raw pair sent by the host. Values are never rounded: a
    /// state that is not exactly one of the known codes stays `Unknown`.
    pub fn decode(kind: i32, value: f64) -> Self {
        match MessageKind::from_code(kind) {
            Some(MessageKind::State) => StatusMessage::State(MediaState::from(value)),
            Some(MessageKind::Duration) => StatusMessage::Duration(value),
            Some(MessageKind::Position) => StatusMessage::Position(value),
            Some(MessageKind::Error) => StatusMessage::Error(value),
            None => StatusMessage::Unrecognized { kind, value },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_known_kinds() {
        assert_eq!(
            StatusMessage::decode(1, 4.0),
            StatusMessage::State(MediaState::Stopped)
        );
        assert_eq!(StatusMessage::decode(2, 1234.5), StatusMessage::Duration(1234.5));
        assert_eq!(StatusMessage::decode(3, -1.0), StatusMessage::Position(-1.0));
        assert_eq!(StatusMessage::decode(9, 3.0), StatusMessage::Error(3.0));
    }

    #[test]
    fn decode_unknown_kind_keeps_raw_pair() {
        assert_eq!(
            StatusMessage::decode(7, 2.0),
            StatusMessage::Unrecognized { kind: 7, value: 2.0 }
        );
    }

    #[test]
    fn unknown_state_code_survives() {
        let state = MediaState::from(42.0);
        assert_eq!(state, MediaState::Unknown(42.0));
        assert_eq!(state.code(), 42.0);
        assert_eq!(state.to_string(), "Unknown(42)");
    }

    #[test]
    fn inexact_state_values_are_not_rounded() {
        assert_eq!(
            StatusMessage::decode(1, 4.9),
            StatusMessage::State(MediaState::Unknown(4.9))
        );
        assert_eq!(MediaState::from(-0.5), MediaState::Unknown(-0.5));
        assert_eq!(MediaState::from(4e9), MediaState::Unknown(4e9));
        assert!(matches!(MediaState::from(f64::NAN), MediaState::Unknown(v) if v.is_nan()));
        assert_eq!(MediaState::from(-0.0), MediaState::None);
    }

    #[test]
    fn error_values_are_kept_whole() {
        assert_eq!(StatusMessage::decode(9, 3e9), StatusMessage::Error(3e9));
        assert_eq!(StatusMessage::decode(9, 2.5), StatusMessage::Error(2.5));
    }

    #[test]
    fn whole_code_rejects_fractions_and_overflow() {
        assert_eq!(whole_code(7.0), Some(7));
        assert_eq!(whole_code(-3.0), Some(-3));
        assert_eq!(whole_code(7.25), None);
        assert_eq!(whole_code(3e9), None);
        assert_eq!(whole_code(f64::NAN), None);
        assert_eq!(whole_code(f64::INFINITY), None);
    }

    #[test]
    fn state_serializes_as_code() {
        let msg = StatusMessage::State(MediaState::Running);
        let v = serde_json::to_value(msg).unwrap();
        assert_eq!(v, serde_json::json!({"kind": "state", "value": 2}));

        let odd = serde_json::to_value(MediaState::Unknown(4.5)).unwrap();
        assert_eq!(odd, serde_json::json!(4.5));
        let back: MediaState = serde_json::from_value(serde_json::json!(3)).unwrap();
        assert_eq!(back, MediaState::Paused);
    }
}
