use thiserror::Error;

use crate::query::ParseError;
use crate::window::{CodecError, ValidationError};

/// Any failure surfaced by the library
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("query error: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid window: {0}")]
    Validation(#[from] ValidationError),
    #[error("window state error: {0}")]
    Codec(#[from] CodecError),
    #[error("no window with id {0}")]
    UnknownWindow(String),
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T, E = WorkspaceError> = std::result::Result<T, E>;
