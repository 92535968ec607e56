//! Decoding failures.

use thiserror::Error;

/// Why a binary or JSON value could not be decoded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    #[error("{0} trailing bytes")]
    ExtraData(usize),
    #[error("invalid enum tag: {0}")]
    InvalidEnum(u8),
    #[error("invalid bool")]
    InvalidBool,
    #[error("invalid utf-8")]
    InvalidUtf8,
    #[error("length exceeded: {0} > {1}")]
    LengthExceeded(usize, usize), // length, limit
    #[error("invalid data in {0}: {1}")]
    Invalid(&'static str, &'static str), // type, reason
    #[error("invalid json for {0}: {1}")]
    Json(&'static str, String), // type, reason
}
