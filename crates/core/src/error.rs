use std::result::Result as StdResult;

use thiserror::Error;

/// Errors raised by domain validation in tablecall
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid badge: {0}")]
    InvalidBadge(String),
}

pub type Result<T> = StdResult<T, CoreError>;
