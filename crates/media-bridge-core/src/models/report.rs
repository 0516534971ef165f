//! Error payloads surfaced to the application's error callback.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::{serialize_code, whole_code};

/// What the error callback receives. Serializes as `{"code": n}`.
///
/// `code` is exactly what the native side sent, even when it is not one of
/// the known codes or not a whole number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaErrorReport {
    #[serde(serialize_with = "serialize_code")]
    pub code: f64,
}

impl MediaErrorReport {
    pub fn new(code: f64) -> Self {
        Self { code }
    }

    /// The well-known meaning of `code`, if it has one.
    pub fn kind(&self) -> Option<MediaErrorCode> {
        whole_code(self.code).and_then(MediaErrorCode::from_code)
    }
}

/// Error codes the native media service is known to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MediaErrorCode {
    NoneActive = 0,
    Aborted = 1,
    Network = 2,
    Decode = 3,
    NoneSupported = 4,
}

impl MediaErrorCode {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MediaErrorCode::NoneActive),
            1 => Some(MediaErrorCode::Aborted),
            2 => Some(MediaErrorCode::Network),
            3 => Some(MediaErrorCode::Decode),
            4 => Some(MediaErrorCode::NoneSupported),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MediaErrorCode::NoneActive => "no active media",
            MediaErrorCode::Aborted => "aborted",
            MediaErrorCode::Network => "network error",
            MediaErrorCode::Decode => "decode error",
            MediaErrorCode::NoneSupported => "source not supported",
        };
        f.write_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_shape() {
        let v = serde_json::to_value(MediaErrorReport::new(3.0)).unwrap();
        assert_eq!(v, serde_json::json!({"code": 3}));
        let v = serde_json::to_value(MediaErrorReport::new(2.5)).unwrap();
        assert_eq!(v, serde_json::json!({"code": 2.5}));
    }

    #[test]
    fn kind_lookup() {
        assert_eq!(MediaErrorReport::new(2.0).kind(), Some(MediaErrorCode::Network));
        assert_eq!(MediaErrorReport::new(77.0).kind(), None);
        assert_eq!(MediaErrorReport::new(2.5).kind(), None);
        assert_eq!(MediaErrorReport::new(3e9).kind(), None);
    }
}
