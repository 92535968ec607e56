//! Topics under test and the catalog each peer advertises.

use arbitrary::{Arbitrary, Unstructured};
use bytes::{Buf, BufMut};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    mem::size_of,
};
use symbiote_codec::{json, util::at_least, EncodeSize, Error as CodecError, Json, Read, Write};

/// Name of a registered type under test.
///
/// Topics compare byte-wise on their UTF-8 encoding.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Topic {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Write for Topic {
    fn write(&self, buf: &mut impl BufMut) {
        let len = u32::try_from(self.0.len()).expect("topic length exceeds u32");
        buf.put_u32(len);
        buf.put_slice(self.0.as_bytes());
    }
}

impl EncodeSize for Topic {
    fn encode_size(&self) -> usize {
        size_of::<u32>() + self.0.len()
    }
}

impl Read for Topic {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let len = u32::read(buf)? as usize;
        at_least(buf, len)?;
        let mut bytes = vec![0; len];
        buf.copy_to_slice(&mut bytes);
        let name = String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(Self(name))
    }
}

impl Json for Topic {
    fn to_json(&self) -> Value {
        Value::String(self.0.clone())
    }

    fn from_json(value: &Value) -> Result<Self, CodecError> {
        Ok(Self(json::string("Topic", value)?.to_string()))
    }
}

// Rust strings are always valid UTF-8, so a generated topic never carries an unpaired surrogate.
impl<'a> Arbitrary<'a> for Topic {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(u.arbitrary()?))
    }
}

/// Advisory byte-count hint advertised for a topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Size(i32);

impl Size {
    /// Creates a size hint, returning `None` if `bytes` is negative.
    pub const fn new(bytes: i32) -> Option<Self> {
        if bytes < 0 {
            return None;
        }
        Some(Self(bytes))
    }

    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl From<u16> for Size {
    fn from(bytes: u16) -> Self {
        Self(i32::from(bytes))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Write for Size {
    fn write(&self, buf: &mut impl BufMut) {
        self.0.write(buf);
    }
}

impl EncodeSize for Size {
    fn encode_size(&self) -> usize {
        size_of::<i32>()
    }
}

impl Read for Size {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        Self::new(i32::read(buf)?).ok_or(CodecError::Invalid("Size", "negative size"))
    }
}

impl Json for Size {
    fn to_json(&self) -> Value {
        Value::from(self.0)
    }

    fn from_json(value: &Value) -> Result<Self, CodecError> {
        Self::new(i32::from_json(value)?)
            .ok_or_else(|| CodecError::Json("Size", format!("negative size {value}")))
    }
}

/// Topics a peer can test, with their size hints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AvailableTopics(BTreeMap<Topic, Size>);

impl AvailableTopics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a topic, returning the previous size hint if it was already present.
    pub fn insert(&mut self, topic: Topic, size: Size) -> Option<Size> {
        self.0.insert(topic, size)
    }

    pub fn get(&self, topic: &Topic) -> Option<Size> {
        self.0.get(topic).copied()
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.0.contains_key(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Topic, &Size)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Topic, Size)> for AvailableTopics {
    fn from_iter<I: IntoIterator<Item = (Topic, Size)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Write for AvailableTopics {
    fn write(&self, buf: &mut impl BufMut) {
        let len = u32::try_from(self.0.len()).expect("topic count exceeds u32");
        buf.put_u32(len);
        for (topic, size) in &self.0 {
            topic.write(buf);
            size.write(buf);
        }
    }
}

impl EncodeSize for AvailableTopics {
    fn encode_size(&self) -> usize {
        size_of::<u32>()
            + self
                .0
                .iter()
                .map(|(topic, size)| topic.encode_size() + size.encode_size())
                .sum::<usize>()
    }
}

impl Read for AvailableTopics {
    fn read(buf: &mut impl Buf) -> Result<Self, CodecError> {
        let len = u32::read(buf)?;
        let mut topics = BTreeMap::new();
        for _ in 0..len {
            let topic = Topic::read(buf)?;
            let size = Size::read(buf)?;
            if topics.last_key_value().is_some_and(|(last, _)| *last >= topic) {
                return Err(CodecError::Invalid("AvailableTopics", "topics not ascending"));
            }
            topics.insert(topic, size);
        }
        Ok(Self(topics))
    }
}

impl Json for AvailableTopics {
    fn to_json(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(topic, size)| (topic.0.clone(), size.to_json()))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }

    fn from_json(value: &Value) -> Result<Self, CodecError> {
        let map = value.as_object().ok_or_else(|| {
            CodecError::Json("AvailableTopics", format!("expected object, got {value}"))
        })?;
        map.iter()
            .map(|(topic, size)| Ok((Topic::from(topic.as_str()), Size::from_json(size)?)))
            .collect()
    }
}

/// Writes a topic set as a `u32` count followed by each topic in order.
pub(crate) fn write_set(topics: &BTreeSet<Topic>, buf: &mut impl BufMut) {
    let len = u32::try_from(topics.len()).expect("topic count exceeds u32");
    buf.put_u32(len);
    for topic in topics {
        topic.write(buf);
    }
}

pub(crate) fn set_size(topics: &BTreeSet<Topic>) -> usize {
    size_of::<u32>() + topics.iter().map(EncodeSize::encode_size).sum::<usize>()
}

/// Reads a topic set written in ascending order.
pub(crate) fn read_set(buf: &mut impl Buf) -> Result<BTreeSet<Topic>, CodecError> {
    let len = u32::read(buf)?;
    let mut topics = BTreeSet::new();
    for _ in 0..len {
        let topic = Topic::read(buf)?;
        if topics.last().is_some_and(|last| *last >= topic) {
            return Err(CodecError::Invalid("Start", "topics not ascending"));
        }
        topics.insert(topic);
    }
    Ok(topics)
}

pub(crate) fn set_to_json(topics: &BTreeSet<Topic>) -> Value {
    Value::Array(topics.iter().map(Json::to_json).collect())
}

pub(crate) fn set_from_json(value: &Value) -> Result<BTreeSet<Topic>, CodecError> {
    let mut topics = BTreeSet::new();
    for topic in json::array("Start", value)? {
        if !topics.insert(Topic::from_json(topic)?) {
            return Err(CodecError::Json("Start", format!("duplicate topic {topic}")));
        }
    }
    Ok(topics)
}
