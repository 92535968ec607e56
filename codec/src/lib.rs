//! Encode values under test in canonical JSON and binary forms.
//!
//! # Overview
//!
//! Every value exchanged by two conformance peers has exactly two canonical encodings:
//! - Binary: fixed-width big-endian primitives and length-prefixed containers.
//! - JSON: plain numbers, strings, and arrays, with tagged variants written as single-key objects.
//!
//! Decoding is designed for untrusted input. Every read checks the remaining buffer first, so
//! truncated or forged data yields an [Error] rather than a panic.
//!
//! # Supported Types
//!
//! - Primitives: `u8`..`u64`, `i8`..`i64`, `f32`, `f64`, `bool`, `()`, [std::cmp::Ordering]
//! - Composites: `Option<T>`, [either::Either]
//! - Length-prefixed containers: [Vector8] .. [Vector64] and [String8] .. [String64]
//! - Payload carriers: [bytes::Bytes] and [serde_json::Value]
//!
//! # Example
//!
//! ```
//! use bytes::{Buf, BufMut};
//! use symbiote_codec::{Decode, Encode, EncodeSize, Error, Json, Read, String8, Write};
//! use serde_json::{json, Value};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Item {
//!     id: u32,
//!     name: String8,
//! }
//!
//! impl Write for Item {
//!     fn write(&self, buf: &mut impl BufMut) {
//!         self.id.write(buf);
//!         self.name.write(buf);
//!     }
//! }
//!
//! impl EncodeSize for Item {
//!     fn encode_size(&self) -> usize {
//!         self.id.encode_size() + self.name.encode_size()
//!     }
//! }
//!
//! impl Read for Item {
//!     fn read(buf: &mut impl Buf) -> Result<Self, Error> {
//!         let id = u32::read(buf)?;
//!         let name = String8::read(buf)?;
//!         Ok(Self { id, name })
//!     }
//! }
//!
//! impl Json for Item {
//!     fn to_json(&self) -> Value {
//!         json!([self.id.to_json(), self.name.to_json()])
//!     }
//!
//!     fn from_json(value: &Value) -> Result<Self, Error> {
//!         let fields = symbiote_codec::json::array("Item", value)?;
//!         match fields.as_slice() {
//!             [id, name] => Ok(Self {
//!                 id: u32::from_json(id)?,
//!                 name: String8::from_json(name)?,
//!             }),
//!             _ => Err(Error::Json("Item", "expected two fields".to_string())),
//!         }
//!     }
//! }
//!
//! let item = Item { id: 7, name: String8::try_from("seven").unwrap() };
//! assert_eq!(Item::decode(item.encode()).unwrap(), item);
//! assert_eq!(Item::from_json(&item.to_json()).unwrap(), item);
//! ```

pub mod codec;
pub mod error;
pub mod generate;
pub mod json;
pub mod types;
pub mod util;

pub use codec::{Codec, Decode, Encode, EncodeSize, FixedSize, Read, Write};
pub use error::Error;
pub use generate::{generate_value, generate_with};
pub use json::Json;
pub use types::vector::{
    String16, String32, String64, String8, Vector16, Vector32, Vector64, Vector8,
};
