//! Length-prefixed sequences and strings.
//!
//! Each container is prefixed by its length as a big-endian unsigned integer whose width is fixed by
//! the container type (`Vector8`, `Vector16`, ...). For vectors the length counts elements, for
//! strings it counts UTF-8 bytes. Contents that do not fit the prefix are rejected at construction.
//!
//! Decoding never allocates more capacity up front than there are bytes left in the buffer, so a
//! forged length prefix fails with [Error::EndOfBuffer] instead of exhausting memory.

use crate::{
    json::{self, Json},
    util::{at_least, length},
    EncodeSize, Error, Read, Write,
};
use arbitrary::{Arbitrary, Unstructured};
use bytes::{Buf, BufMut};
use paste::paste;
use serde_json::Value;
use std::{mem::size_of, ops::Deref};

macro_rules! impl_vector {
    ($bits:literal, $prefix:ty, $read_method:ident, $write_method:ident) => {
        paste! {
            #[doc = concat!(
                "A sequence prefixed by its element count as a big-endian `",
                stringify!($prefix),
                "`."
            )]
            #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct [<Vector $bits>]<T>(Vec<T>);

            impl<T> [<Vector $bits>]<T> {
                /// Maximum number of elements.
                pub const MAX_LEN: usize = <$prefix>::MAX as usize;

                /// Wraps `items`, failing if there are more than [Self::MAX_LEN].
                pub fn new(items: Vec<T>) -> Result<Self, Error> {
                    if items.len() > Self::MAX_LEN {
                        return Err(Error::LengthExceeded(items.len(), Self::MAX_LEN));
                    }
                    Ok(Self(items))
                }

                pub fn into_inner(self) -> Vec<T> {
                    self.0
                }
            }

            impl<T> Deref for [<Vector $bits>]<T> {
                type Target = [T];

                fn deref(&self) -> &[T] {
                    &self.0
                }
            }

            impl<T> TryFrom<Vec<T>> for [<Vector $bits>]<T> {
                type Error = Error;

                fn try_from(items: Vec<T>) -> Result<Self, Error> {
                    Self::new(items)
                }
            }

            impl<T: Write> Write for [<Vector $bits>]<T> {
                #[inline]
                fn write(&self, buf: &mut impl BufMut) {
                    buf.$write_method(self.0.len() as $prefix);
                    for item in &self.0 {
                        item.write(buf);
                    }
                }
            }

            impl<T: EncodeSize> EncodeSize for [<Vector $bits>]<T> {
                #[inline]
                fn encode_size(&self) -> usize {
                    size_of::<$prefix>() + self.0.iter().map(EncodeSize::encode_size).sum::<usize>()
                }
            }

            impl<T: Read> Read for [<Vector $bits>]<T> {
                fn read(buf: &mut impl Buf) -> Result<Self, Error> {
                    at_least(buf, size_of::<$prefix>())?;
                    let len = length(buf.$read_method() as u64)?;
                    let mut items = Vec::with_capacity(len.min(buf.remaining()));
                    for _ in 0..len {
                        items.push(T::read(buf)?);
                    }
                    Ok(Self(items))
                }
            }

            impl<T: Json> Json for [<Vector $bits>]<T> {
                fn to_json(&self) -> Value {
                    Value::Array(self.0.iter().map(Json::to_json).collect())
                }

                fn from_json(value: &Value) -> Result<Self, Error> {
                    let items = json::array(stringify!([<Vector $bits>]), value)?
                        .iter()
                        .map(T::from_json)
                        .collect::<Result<Vec<_>, _>>()?;
                    Self::new(items)
                }
            }

            impl<'a, T: Arbitrary<'a>> Arbitrary<'a> for [<Vector $bits>]<T> {
                fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
                    let mut items: Vec<T> = u.arbitrary()?;
                    items.truncate(Self::MAX_LEN);
                    Ok(Self(items))
                }
            }

            #[doc = concat!(
                "A UTF-8 string prefixed by its byte length as a big-endian `",
                stringify!($prefix),
                "`."
            )]
            #[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct [<String $bits>](String);

            impl [<String $bits>] {
                /// Maximum length in bytes.
                pub const MAX_LEN: usize = <$prefix>::MAX as usize;

                /// Wraps `value`, failing if it is longer than [Self::MAX_LEN] bytes.
                pub fn new(value: String) -> Result<Self, Error> {
                    if value.len() > Self::MAX_LEN {
                        return Err(Error::LengthExceeded(value.len(), Self::MAX_LEN));
                    }
                    Ok(Self(value))
                }

                pub fn as_str(&self) -> &str {
                    &self.0
                }

                pub fn into_inner(self) -> String {
                    self.0
                }
            }

            impl Deref for [<String $bits>] {
                type Target = str;

                fn deref(&self) -> &str {
                    &self.0
                }
            }

            impl TryFrom<&str> for [<String $bits>] {
                type Error = Error;

                fn try_from(value: &str) -> Result<Self, Error> {
                    Self::new(value.to_string())
                }
            }

            impl Write for [<String $bits>] {
                #[inline]
                fn write(&self, buf: &mut impl BufMut) {
                    buf.$write_method(self.0.len() as $prefix);
                    buf.put_slice(self.0.as_bytes());
                }
            }

            impl EncodeSize for [<String $bits>] {
                #[inline]
                fn encode_size(&self) -> usize {
                    size_of::<$prefix>() + self.0.len()
                }
            }

            impl Read for [<String $bits>] {
                fn read(buf: &mut impl Buf) -> Result<Self, Error> {
                    at_least(buf, size_of::<$prefix>())?;
                    let len = length(buf.$read_method() as u64)?;
                    at_least(buf, len)?;
                    let mut bytes = vec![0; len];
                    buf.copy_to_slice(&mut bytes);
                    let value = String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
                    Ok(Self(value))
                }
            }

            impl Json for [<String $bits>] {
                fn to_json(&self) -> Value {
                    Value::String(self.0.clone())
                }

                fn from_json(value: &Value) -> Result<Self, Error> {
                    let value = json::string(stringify!([<String $bits>]), value)?;
                    Self::new(value.to_string())
                }
            }

            impl<'a> Arbitrary<'a> for [<String $bits>] {
                fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
                    let mut value: String = u.arbitrary()?;
                    truncate(&mut value, Self::MAX_LEN);
                    Ok(Self(value))
                }
            }
        }
    };
}

impl_vector!(8, u8, get_u8, put_u8);
impl_vector!(16, u16, get_u16, put_u16);
impl_vector!(32, u32, get_u32, put_u32);
impl_vector!(64, u64, get_u64, put_u64);

/// Truncates `value` to at most `max` bytes without splitting a character.
fn truncate(value: &mut String, max: usize) {
    if value.len() <= max {
        return;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}
