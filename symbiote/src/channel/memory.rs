//! In-process channel backed by a pair of bounded queues.

use super::{Channel, Error};
use futures::{channel::mpsc, SinkExt, StreamExt};

/// One end of a channel created by [pair].
pub struct Endpoint<P> {
    sender: mpsc::Sender<P>,
    receiver: mpsc::Receiver<P>,
}

/// Creates two connected endpoints, each buffering up to `capacity` unread messages.
pub fn pair<P>(capacity: usize) -> (Endpoint<P>, Endpoint<P>) {
    let (a_sender, b_receiver) = mpsc::channel(capacity);
    let (b_sender, a_receiver) = mpsc::channel(capacity);
    (
        Endpoint {
            sender: a_sender,
            receiver: a_receiver,
        },
        Endpoint {
            sender: b_sender,
            receiver: b_receiver,
        },
    )
}

impl<P: Send> Channel<P> for Endpoint<P> {
    async fn send(&mut self, message: P) -> Result<(), Error> {
        self.sender.send(message).await.map_err(|e| {
            if e.is_disconnected() {
                Error::Closed
            } else {
                Error::SendFailed
            }
        })
    }

    async fn recv(&mut self) -> Result<P, Error> {
        self.receiver.next().await.ok_or(Error::Closed)
    }

    async fn close(&mut self) {
        self.sender.close_channel();
        self.receiver.close();
    }
}
