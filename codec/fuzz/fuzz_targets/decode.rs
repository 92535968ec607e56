#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use std::fmt::Debug;
use symbiote::{
    message::{First, Second},
    AvailableTopics,
};
use symbiote_codec::{Codec, Decode, Encode, String16, String8, Vector32, Vector8};

/// Decoding never panics, and anything that decodes re-encodes to the same bytes.
fn canonical<T: Codec + Debug>(data: &[u8]) {
    if let Ok(value) = T::decode(data) {
        assert_eq!(value.encode().as_ref(), data, "{value:?}");
    }
}

/// Anything that parses from JSON survives a trip back through JSON.
fn json<T: Codec + Debug + PartialEq>(data: &[u8]) {
    let Ok(parsed) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    if let Ok(value) = T::from_json(&parsed) {
        let again = T::from_json(&value.to_json()).expect("failed to reparse own JSON");
        assert_eq!(again, value);
    }
}

#[derive(Arbitrary, Debug)]
enum FuzzInput<'a> {
    Bool(&'a [u8]),
    I32(&'a [u8]),
    U64(&'a [u8]),
    String8(&'a [u8]),
    String16(&'a [u8]),
    Vector8(&'a [u8]),
    Vector32(&'a [u8]),
    Payload(&'a [u8]),
    Topics(&'a [u8]),
    First(&'a [u8]),
    Second(&'a [u8]),
    JsonString8(&'a [u8]),
    JsonVector32(&'a [u8]),
    JsonTopics(&'a [u8]),
    JsonFirst(&'a [u8]),
}

fn fuzz(input: FuzzInput<'_>) {
    match input {
        FuzzInput::Bool(data) => canonical::<bool>(data),
        FuzzInput::I32(data) => canonical::<i32>(data),
        FuzzInput::U64(data) => canonical::<u64>(data),
        FuzzInput::String8(data) => canonical::<String8>(data),
        FuzzInput::String16(data) => canonical::<String16>(data),
        FuzzInput::Vector8(data) => canonical::<Vector8<u16>>(data),
        FuzzInput::Vector32(data) => canonical::<Vector32<i32>>(data),
        FuzzInput::Payload(data) => canonical::<Bytes>(data),
        FuzzInput::Topics(data) => canonical::<AvailableTopics>(data),
        FuzzInput::First(data) => canonical::<First<Bytes>>(data),
        FuzzInput::Second(data) => canonical::<Second<Bytes>>(data),
        FuzzInput::JsonString8(data) => json::<String8>(data),
        FuzzInput::JsonVector32(data) => json::<Vector32<i32>>(data),
        FuzzInput::JsonTopics(data) => json::<AvailableTopics>(data),
        FuzzInput::JsonFirst(data) => json::<First<Value>>(data),
    }
}

fuzz_target!(|input: FuzzInput<'_>| {
    fuzz(input);
});
