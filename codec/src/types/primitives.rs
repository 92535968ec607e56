//! Codec implementations for Rust primitive types.
//!
//! All fixed-size integers and floats are written big-endian to avoid host-endian ambiguity.
//!
//! In JSON, integers are plain numbers (rejected when out of range for the target type) and
//! floats are numbers when finite or one of the strings `"NaN"`, `"Infinity"`, `"-Infinity"`.

use crate::{
    json::{self, Json},
    util::at_least,
    EncodeSize, Error, FixedSize, Read, Write,
};
use bytes::{Buf, BufMut};
use either::Either;
use serde_json::{Number, Value};
use std::cmp::Ordering;

// Integer types implementation
macro_rules! impl_integer {
    ($type:ty, $read_method:ident, $write_method:ident, $as_method:ident) => {
        impl Write for $type {
            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$write_method(*self);
            }
        }

        impl Read for $type {
            #[inline]
            fn read(buf: &mut impl Buf) -> Result<Self, Error> {
                at_least(buf, std::mem::size_of::<$type>())?;
                Ok(buf.$read_method())
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = std::mem::size_of::<$type>();
        }

        impl Json for $type {
            #[inline]
            fn to_json(&self) -> Value {
                Value::from(*self)
            }

            fn from_json(value: &Value) -> Result<Self, Error> {
                value
                    .$as_method()
                    .and_then(|n| <$type>::try_from(n).ok())
                    .ok_or_else(|| {
                        Error::Json(stringify!($type), format!("expected integer, got {value}"))
                    })
            }
        }
    };
}

impl_integer!(u8, get_u8, put_u8, as_u64);
impl_integer!(u16, get_u16, put_u16, as_u64);
impl_integer!(u32, get_u32, put_u32, as_u64);
impl_integer!(u64, get_u64, put_u64, as_u64);
impl_integer!(i8, get_i8, put_i8, as_i64);
impl_integer!(i16, get_i16, put_i16, as_i64);
impl_integer!(i32, get_i32, put_i32, as_i64);
impl_integer!(i64, get_i64, put_i64, as_i64);

// Float types implementation
macro_rules! impl_float {
    ($type:ty, $read_method:ident, $write_method:ident) => {
        impl Write for $type {
            #[inline]
            fn write(&self, buf: &mut impl BufMut) {
                buf.$write_method(*self);
            }
        }

        impl Read for $type {
            #[inline]
            fn read(buf: &mut impl Buf) -> Result<Self, Error> {
                at_least(buf, std::mem::size_of::<$type>())?;
                Ok(buf.$read_method())
            }
        }

        impl FixedSize for $type {
            const SIZE: usize = std::mem::size_of::<$type>();
        }

        impl Json for $type {
            fn to_json(&self) -> Value {
                if self.is_nan() {
                    return Value::from("NaN");
                }
                match Number::from_f64(*self as f64) {
                    Some(number) => Value::Number(number),
                    None if self.is_sign_positive() => Value::from("Infinity"),
                    None => Value::from("-Infinity"),
                }
            }

            fn from_json(value: &Value) -> Result<Self, Error> {
                match value {
                    Value::Number(number) => number.as_f64().map(|n| n as $type).ok_or_else(|| {
                        Error::Json(stringify!($type), format!("unrepresentable number {number}"))
                    }),
                    Value::String(s) if s == "NaN" => Ok(<$type>::NAN),
                    Value::String(s) if s == "Infinity" => Ok(<$type>::INFINITY),
                    Value::String(s) if s == "-Infinity" => Ok(<$type>::NEG_INFINITY),
                    _ => Err(Error::Json(
                        stringify!($type),
                        format!("expected number, got {value}"),
                    )),
                }
            }
        }
    };
}

impl_float!(f32, get_f32, put_f32);
impl_float!(f64, get_f64, put_f64);

// Bool implementation
impl Write for bool {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        buf.put_u8(if *self { 1 } else { 0 });
    }
}

impl Read for bool {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(Error::InvalidBool),
        }
    }
}

impl FixedSize for bool {
    const SIZE: usize = 1;
}

impl Json for bool {
    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        value
            .as_bool()
            .ok_or_else(|| Error::Json("bool", format!("expected boolean, got {value}")))
    }
}

// Unit implementation
impl Write for () {
    #[inline]
    fn write(&self, _: &mut impl BufMut) {}
}

impl Read for () {
    #[inline]
    fn read(_: &mut impl Buf) -> Result<Self, Error> {
        Ok(())
    }
}

impl FixedSize for () {
    const SIZE: usize = 0;
}

impl Json for () {
    fn to_json(&self) -> Value {
        Value::Null
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(()),
            _ => Err(Error::Json("unit", format!("expected null, got {value}"))),
        }
    }
}

// Ordering implementation
impl Write for Ordering {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        (*self as i8).write(buf);
    }
}

impl Read for Ordering {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match i8::read(buf)? {
            -1 => Ok(Ordering::Less),
            0 => Ok(Ordering::Equal),
            1 => Ok(Ordering::Greater),
            _ => Err(Error::Invalid("Ordering", "expected -1, 0, or 1")),
        }
    }
}

impl FixedSize for Ordering {
    const SIZE: usize = 1;
}

impl Json for Ordering {
    fn to_json(&self) -> Value {
        Value::from(*self as i8)
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        match value.as_i64() {
            Some(-1) => Ok(Ordering::Less),
            Some(0) => Ok(Ordering::Equal),
            Some(1) => Ok(Ordering::Greater),
            _ => Err(Error::Json(
                "Ordering",
                format!("expected -1, 0, or 1, got {value}"),
            )),
        }
    }
}

// Option implementation
impl<T: Write> Write for Option<T> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        self.is_some().write(buf);
        if let Some(inner) = self {
            inner.write(buf);
        }
    }
}

impl<T: EncodeSize> EncodeSize for Option<T> {
    #[inline]
    fn encode_size(&self) -> usize {
        match self {
            Some(inner) => 1 + inner.encode_size(),
            None => 1,
        }
    }
}

impl<T: Read> Read for Option<T> {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        if bool::read(buf)? {
            Ok(Some(T::read(buf)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Json> Json for Option<T> {
    fn to_json(&self) -> Value {
        match self {
            Some(inner) => inner.to_json(),
            None => Value::Null,
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_json(value)?)),
        }
    }
}

// Either implementation
const LEFT: u8 = 0;
const RIGHT: u8 = 1;

impl<L: Write, R: Write> Write for Either<L, R> {
    #[inline]
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Either::Left(left) => {
                LEFT.write(buf);
                left.write(buf);
            }
            Either::Right(right) => {
                RIGHT.write(buf);
                right.write(buf);
            }
        }
    }
}

impl<L: EncodeSize, R: EncodeSize> EncodeSize for Either<L, R> {
    #[inline]
    fn encode_size(&self) -> usize {
        1 + match self {
            Either::Left(left) => left.encode_size(),
            Either::Right(right) => right.encode_size(),
        }
    }
}

impl<L: Read, R: Read> Read for Either<L, R> {
    #[inline]
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            LEFT => Ok(Either::Left(L::read(buf)?)),
            RIGHT => Ok(Either::Right(R::read(buf)?)),
            tag => Err(Error::InvalidEnum(tag)),
        }
    }
}

impl<L: Json, R: Json> Json for Either<L, R> {
    fn to_json(&self) -> Value {
        match self {
            Either::Left(left) => json::tagged("left", left.to_json()),
            Either::Right(right) => json::tagged("right", right.to_json()),
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        let (case, inner) = json::untag("Either", value)?;
        let inner = json::argument("Either", case, inner)?;
        match case {
            "left" => Ok(Either::Left(L::from_json(inner)?)),
            "right" => Ok(Either::Right(R::from_json(inner)?)),
            _ => Err(json::unknown_case("Either", case)),
        }
    }
}
