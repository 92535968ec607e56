//! Canonical JSON form of values.
//!
//! Every type that can be carried by the protocol has exactly one JSON representation. Tagged
//! variants are objects with a single key naming the case, or bare strings for cases without
//! arguments.

use crate::Error;
use serde_json::{Map, Value};

/// Trait for types with a canonical JSON representation.
pub trait Json: Sized {
    /// Returns the canonical JSON form of this value.
    fn to_json(&self) -> Value;

    /// Parses a value from its canonical JSON form.
    fn from_json(value: &Value) -> Result<Self, Error>;
}

/// Builds the JSON object `{case: inner}` used for tagged variants with arguments.
pub fn tagged(case: &str, inner: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(case.to_string(), inner);
    Value::Object(map)
}

/// Splits a tagged variant into its case name and (for cases with arguments) its inner value.
///
/// Bare strings are returned with no inner value. Objects must have exactly one key.
pub fn untag<'a>(
    context: &'static str,
    value: &'a Value,
) -> Result<(&'a str, Option<&'a Value>), Error> {
    match value {
        Value::String(case) => return Ok((case, None)),
        Value::Object(map) if map.len() == 1 => {
            if let Some((case, inner)) = map.iter().next() {
                return Ok((case, Some(inner)));
            }
        }
        _ => {}
    }
    Err(Error::Json(
        context,
        format!("expected tagged variant, got {value}"),
    ))
}

/// Returns the inner value of a tagged case, failing if the case carried none.
pub fn argument<'a>(
    context: &'static str,
    case: &str,
    inner: Option<&'a Value>,
) -> Result<&'a Value, Error> {
    inner.ok_or_else(|| Error::Json(context, format!("case {case} requires an argument")))
}

/// Returns the named field of a JSON object.
pub fn field<'a>(context: &'static str, value: &'a Value, name: &str) -> Result<&'a Value, Error> {
    value
        .as_object()
        .and_then(|map| map.get(name))
        .ok_or_else(|| Error::Json(context, format!("missing field {name}")))
}

/// Returns the elements of a JSON array.
pub fn array<'a>(context: &'static str, value: &'a Value) -> Result<&'a Vec<Value>, Error> {
    value
        .as_array()
        .ok_or_else(|| Error::Json(context, format!("expected array, got {value}")))
}

/// Returns the contents of a JSON string.
pub fn string<'a>(context: &'static str, value: &'a Value) -> Result<&'a str, Error> {
    value
        .as_str()
        .ok_or_else(|| Error::Json(context, format!("expected string, got {value}")))
}

/// Builds the error for an unrecognized case name.
pub fn unknown_case(context: &'static str, case: &str) -> Error {
    Error::Json(context, format!("unknown case {case}"))
}
