//! media-bridge data models.
//!
//! Plain value types that cross the native boundary: ids and action names
//! going out, status messages and error reports coming back.

pub mod media;
pub mod report;
pub mod status;

pub use media::{MediaAction, MediaId};
pub use report::{MediaErrorCode, MediaErrorReport};
pub use status::{MediaState, MessageKind, StatusMessage};
