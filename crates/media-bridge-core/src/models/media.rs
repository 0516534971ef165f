//! Media identity and outbound action names.
//!
//! `MediaAction` is a string enum: it exists for type-safe matching in Rust,
//! but crosses the bridge as the plain operation name.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Process-unique identifier of one media handle.
///
/// Every outbound call carries it as its first argument and every inbound
/// status notification is addressed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(Uuid);

impl MediaId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id as it travels over the bridge. Returns `None` for
    /// anything that is not a UUID.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Operation names understood by the native media service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaAction {
    StartPlayingAudio,
    StopPlayingAudio,
    PausePlayingAudio,
    SeekToAudio,
    GetCurrentPositionAudio,
    StartRecordingAudio,
    StopRecordingAudio,
    Release,
    SetVolume,
}

impl MediaAction {
    pub const ALL: [MediaAction; 9] = [
        MediaAction::StartPlayingAudio,
        MediaAction::StopPlayingAudio,
        MediaAction::PausePlayingAudio,
        MediaAction::SeekToAudio,
        MediaAction::GetCurrentPositionAudio,
        MediaAction::StartRecordingAudio,
        MediaAction::StopRecordingAudio,
        MediaAction::Release,
        MediaAction::SetVolume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaAction::StartPlayingAudio => "startPlayingAudio",
            MediaAction::StopPlayingAudio => "stopPlayingAudio",
            MediaAction::PausePlayingAudio => "pausePlayingAudio",
            MediaAction::SeekToAudio => "seekToAudio",
            MediaAction::GetCurrentPositionAudio => "getCurrentPositionAudio",
            MediaAction::StartRecordingAudio => "startRecordingAudio",
            MediaAction::StopRecordingAudio => "stopRecordingAudio",
            MediaAction::Release => "release",
            MediaAction::SetVolume => "setVolume",
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
