use thiserror::Error;

use crate::handle::CallbackSlot;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{slot} is not a function (got {found})")]
    CallbackNotCallable { slot: CallbackSlot, found: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;
