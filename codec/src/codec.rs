//! Binary encoding traits.

use crate::{error::Error, json::Json};
use bytes::{Buf, BufMut, BytesMut};

/// Writes the binary form of a value.
pub trait Write {
    /// Appends the big-endian encoding of `self` to `buf`.
    fn write(&self, buf: &mut impl BufMut);
}

/// Reads the binary form of a value.
pub trait Read: Sized {
    /// Consumes one value from the front of `buf`, leaving anything after it.
    ///
    /// Implementations check [Buf::remaining] before every read and return [Error::EndOfBuffer]
    /// rather than panic on short input.
    fn read(buf: &mut impl Buf) -> Result<Self, Error>;
}

/// Reports how many bytes [Write::write] will produce.
pub trait EncodeSize {
    /// Exact number of bytes written by [Write::write].
    fn encode_size(&self) -> usize;
}

/// Types whose binary form always has the same length.
pub trait FixedSize {
    /// Encoded length in bytes.
    const SIZE: usize;
}

impl<T: FixedSize> EncodeSize for T {
    #[inline]
    fn encode_size(&self) -> usize {
        Self::SIZE
    }
}

/// Encodes a value into a freshly allocated buffer.
pub trait Encode: Write + EncodeSize {
    /// Returns the binary form of `self`.
    ///
    /// # Panics
    ///
    /// Panics if [Write::write] disagrees with [EncodeSize::encode_size].
    fn encode(&self) -> BytesMut {
        let len = self.encode_size();
        let mut buffer = BytesMut::with_capacity(len);
        self.write(&mut buffer);
        assert_eq!(buffer.len(), len, "encode_size disagrees with write");
        buffer
    }
}

impl<T: Write + EncodeSize> Encode for T {}

/// Decodes a complete value.
pub trait Decode: Read {
    /// Reads one value and fails with [Error::ExtraData] if any bytes are left over.
    fn decode(mut buf: impl Buf) -> Result<Self, Error> {
        let result = Self::read(&mut buf)?;

        let remaining = buf.remaining();
        if remaining > 0 {
            return Err(Error::ExtraData(remaining));
        }

        Ok(result)
    }
}

impl<T: Read> Decode for T {}

/// Types with both a binary and a JSON form.
pub trait Codec: Encode + Decode + Json {}

impl<T: Encode + Decode + Json> Codec for T {}
