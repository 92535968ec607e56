//! Bidirectional message channels between two peers.
//!
//! A session only needs reliable, ordered delivery of whole messages. [memory] connects two
//! sessions in the same process and [tcp] carries length-prefixed frames over a socket.

use std::future::Future;
use thiserror::Error;

pub mod memory;
pub mod tcp;

/// Errors that can occur when sending or receiving on a [Channel].
#[derive(Error, Debug)]
pub enum Error {
    #[error("channel closed")]
    Closed,
    #[error("send failed")]
    SendFailed,
    #[error("recv failed")]
    RecvFailed,
    #[error("send zero size")]
    SendZeroSize,
    #[error("send too large: {0}")]
    SendTooLarge(usize),
    #[error("recv zero size")]
    RecvZeroSize,
    #[error("recv too large: {0}")]
    RecvTooLarge(usize),
    #[error("invalid frame: {0}")]
    Frame(symbiote_codec::Error),
}

/// Ordered delivery of messages of type `P` to a single peer.
pub trait Channel<P>: Send {
    /// Sends a message to the peer.
    fn send(&mut self, message: P) -> impl Future<Output = Result<(), Error>> + Send;

    /// Waits for the next message from the peer.
    ///
    /// Returns [Error::Closed] once the peer has closed its end.
    fn recv(&mut self) -> impl Future<Output = Result<P, Error>> + Send;

    /// Closes this end of the channel.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
