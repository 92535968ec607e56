//! Length-prefixed frames over TCP.
//!
//! Each message is sent as a 4-byte big-endian length followed by that many bytes of the
//! encoding's frame (raw bytes for binary sessions, UTF-8 JSON text for JSON sessions).

use super::{Channel, Error};
use crate::encoding::Encoding;
use bytes::Bytes;
use std::{io::ErrorKind, marker::PhantomData, net::SocketAddr};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};

/// Sends data to the sink with a 4-byte length prefix.
/// Returns an error if the message is empty or too large, or the write fails.
pub async fn send_frame<S: AsyncWrite + Unpin>(
    sink: &mut S,
    buf: &[u8],
    max_message_size: usize,
) -> Result<(), Error> {
    // Validate frame size
    let n = buf.len();
    if n == 0 {
        return Err(Error::SendZeroSize);
    }
    if n > max_message_size {
        return Err(Error::SendTooLarge(n));
    }
    let len: u32 = n.try_into().map_err(|_| Error::SendTooLarge(n))?;

    // Send the length of the message
    sink.write_all(&len.to_be_bytes())
        .await
        .map_err(|_| Error::SendFailed)?;

    // Send the rest of the message
    sink.write_all(buf).await.map_err(|_| Error::SendFailed)?;
    Ok(())
}

/// Receives data from the stream with a 4-byte length prefix.
/// Returns an error if the message is empty or too large, or the stream is closed.
pub async fn recv_frame<S: AsyncRead + Unpin>(
    stream: &mut S,
    max_message_size: usize,
) -> Result<Bytes, Error> {
    // Read the first 4 bytes to get the length of the message
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).await.map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::Closed,
        _ => Error::RecvFailed,
    })?;

    // Validate frame size
    let len = u32::from_be_bytes(buf) as usize;
    if len > max_message_size {
        return Err(Error::RecvTooLarge(len));
    }
    if len == 0 {
        return Err(Error::RecvZeroSize);
    }

    // Read the rest of the message
    let mut buf = vec![0u8; len];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|_| Error::RecvFailed)?;
    Ok(Bytes::from(buf))
}

/// A [Channel] carrying payloads of encoding `E` over a TCP connection.
pub struct Tcp<E: Encoding> {
    stream: TcpStream,
    max_message_size: usize,
    _encoding: PhantomData<E>,
}

impl<E: Encoding> Tcp<E> {
    /// Wraps an established connection.
    pub fn new(stream: TcpStream, max_message_size: usize) -> Self {
        Self {
            stream,
            max_message_size,
            _encoding: PhantomData,
        }
    }

    /// Connects to a listening peer.
    pub async fn connect(addr: SocketAddr, max_message_size: usize) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream, max_message_size))
    }

    /// Address of the remote peer, if still connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

impl<E: Encoding> Channel<E::Payload> for Tcp<E> {
    async fn send(&mut self, message: E::Payload) -> Result<(), Error> {
        let frame = E::to_frame(&message);
        send_frame(&mut self.stream, &frame, self.max_message_size).await
    }

    async fn recv(&mut self) -> Result<E::Payload, Error> {
        let frame = recv_frame(&mut self.stream, self.max_message_size).await?;
        E::from_frame(frame).map_err(Error::Frame)
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
