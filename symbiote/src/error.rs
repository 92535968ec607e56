use thiserror::Error;

/// Errors raised while configuring a session.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
}
