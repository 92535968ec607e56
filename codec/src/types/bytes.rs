//! Implementations for the payload carriers.
//!
//! [Bytes] and [Value] hold already-encoded values inside protocol messages. Both are prefixed by a
//! big-endian `u32` byte length when written in binary. For portability and consistency between
//! architectures, the length must fit within a [u32].
//!
//! In JSON, [Bytes] is a lowercase hex string and [Value] is embedded as-is.

use crate::{
    json::{self, Json},
    util::{at_least, from_hex, hex},
    EncodeSize, Error, Read, Write,
};
use bytes::{Buf, BufMut, Bytes};
use serde_json::Value;
use std::mem::size_of;

impl Write for Bytes {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        let len = u32::try_from(self.len()).expect("Bytes length exceeds u32");
        buf.put_u32(len);
        buf.put_slice(self);
    }
}

impl EncodeSize for Bytes {
    #[inline]
    fn encode_size(&self) -> usize {
        size_of::<u32>() + self.len()
    }
}

impl Read for Bytes {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let len = u32::read(buf)? as usize;
        at_least(buf, len)?;
        Ok(buf.copy_to_bytes(len))
    }
}

impl Json for Bytes {
    fn to_json(&self) -> Value {
        Value::String(hex(self))
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        let encoded = json::string("Bytes", value)?;
        from_hex(encoded)
            .map(Bytes::from)
            .ok_or_else(|| Error::Json("Bytes", format!("invalid hex {encoded}")))
    }
}

impl Write for Value {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        let text = self.to_string();
        let len = u32::try_from(text.len()).expect("JSON text length exceeds u32");
        buf.put_u32(len);
        buf.put_slice(text.as_bytes());
    }
}

impl EncodeSize for Value {
    #[inline]
    fn encode_size(&self) -> usize {
        size_of::<u32>() + self.to_string().len()
    }
}

impl Read for Value {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let len = u32::read(buf)? as usize;
        at_least(buf, len)?;
        let text = buf.copy_to_bytes(len);
        serde_json::from_slice(&text).map_err(|e| Error::Json("Value", e.to_string()))
    }
}

impl Json for Value {
    fn to_json(&self) -> Value {
        self.clone()
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        Ok(value.clone())
    }
}
