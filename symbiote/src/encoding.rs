//! Serialization formats under test.
//!
//! A session is run entirely in one [Encoding]: every value, operation, output, and protocol
//! message is carried as that encoding's [Encoding::Payload].

use bytes::Bytes;
use serde_json::Value;
use std::fmt::Debug;
use symbiote_codec::{Codec, Error};

/// A serialization format that every [Codec] type can be written in.
pub trait Encoding: Clone + Copy + Debug + Default + Send + Sync + 'static {
    /// An encoded value, as embedded in a protocol message.
    type Payload: Codec + Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Name used in logs and on the command line.
    const NAME: &'static str;

    /// Encodes `value` into a payload.
    fn encode<T: Codec>(value: &T) -> Self::Payload;

    /// Decodes a payload, requiring that all of it is consumed.
    fn decode<T: Codec>(payload: &Self::Payload) -> Result<T, Error>;

    /// Converts a payload into the bytes carried by a transport frame.
    fn to_frame(payload: &Self::Payload) -> Bytes;

    /// Parses the bytes of a transport frame into a payload.
    fn from_frame(frame: Bytes) -> Result<Self::Payload, Error>;
}

/// Canonical JSON, framed as UTF-8 JSON text.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonEncoding;

impl Encoding for JsonEncoding {
    type Payload = Value;

    const NAME: &'static str = "json";

    fn encode<T: Codec>(value: &T) -> Value {
        value.to_json()
    }

    fn decode<T: Codec>(payload: &Value) -> Result<T, Error> {
        T::from_json(payload)
    }

    fn to_frame(payload: &Value) -> Bytes {
        Bytes::from(payload.to_string())
    }

    fn from_frame(frame: Bytes) -> Result<Value, Error> {
        serde_json::from_slice(&frame).map_err(|e| Error::Json("frame", e.to_string()))
    }
}

/// Canonical binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryEncoding;

impl Encoding for BinaryEncoding {
    type Payload = Bytes;

    const NAME: &'static str = "binary";

    fn encode<T: Codec>(value: &T) -> Bytes {
        value.encode().freeze()
    }

    fn decode<T: Codec>(payload: &Bytes) -> Result<T, Error> {
        T::decode(payload.clone())
    }

    fn to_frame(payload: &Bytes) -> Bytes {
        payload.clone()
    }

    fn from_frame(frame: Bytes) -> Result<Bytes, Error> {
        Ok(frame)
    }
}
