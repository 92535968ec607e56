//! Protocol messages.
//!
//! Every message is generic over the payload `P` that carries encoded values: a
//! [serde_json::Value] in a JSON session and a [bytes::Bytes] in a binary one. Both instantiations
//! share the variant definitions below.
//!
//! In binary, each variant starts with a one-byte tag followed by its fields. In JSON, variants with
//! fields are single-key objects naming the case and variants without fields are bare strings.

use crate::topic::{self, AvailableTopics, Topic};
use bytes::{Buf, BufMut};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use symbiote_codec::{json, EncodeSize, Error, Json, Read, Write};

/// Sent by the peer generating values for the current trial.
#[derive(Clone, Debug, PartialEq)]
pub enum Generating<P> {
    /// A freshly generated value and the operation to apply to it.
    Generated { value: P, operation: P },
    /// The operator's result did not match the expected output.
    BadResult(P),
    /// Hands the generator role to the other peer.
    YourTurn,
    /// The sender has no more trials to run for this topic.
    ImFinished,
    /// The operator's result could not be parsed.
    NoParseOperated(P),
}

impl<P> Generating<P> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Generated { .. } => "generated",
            Self::BadResult(_) => "badResult",
            Self::YourTurn => "yourTurn",
            Self::ImFinished => "imFinished",
            Self::NoParseOperated(_) => "noParseOperated",
        }
    }
}

impl<P: Write> Write for Generating<P> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Generated { value, operation } => {
                0u8.write(buf);
                value.write(buf);
                operation.write(buf);
            }
            Self::BadResult(result) => {
                1u8.write(buf);
                result.write(buf);
            }
            Self::YourTurn => 2u8.write(buf),
            Self::ImFinished => 3u8.write(buf),
            Self::NoParseOperated(result) => {
                4u8.write(buf);
                result.write(buf);
            }
        }
    }
}

impl<P: EncodeSize> EncodeSize for Generating<P> {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Generated { value, operation } => value.encode_size() + operation.encode_size(),
            Self::BadResult(result) | Self::NoParseOperated(result) => result.encode_size(),
            Self::YourTurn | Self::ImFinished => 0,
        }
    }
}

impl<P: Read> Read for Generating<P> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => {
                let value = P::read(buf)?;
                let operation = P::read(buf)?;
                Ok(Self::Generated { value, operation })
            }
            1 => Ok(Self::BadResult(P::read(buf)?)),
            2 => Ok(Self::YourTurn),
            3 => Ok(Self::ImFinished),
            4 => Ok(Self::NoParseOperated(P::read(buf)?)),
            d => Err(Error::InvalidEnum(d)),
        }
    }
}

impl<P: Json> Json for Generating<P> {
    fn to_json(&self) -> Value {
        match self {
            Self::Generated { value, operation } => {
                let mut fields = Map::with_capacity(2);
                fields.insert("value".to_string(), value.to_json());
                fields.insert("operation".to_string(), operation.to_json());
                json::tagged(self.kind(), Value::Object(fields))
            }
            Self::BadResult(result) | Self::NoParseOperated(result) => {
                json::tagged(self.kind(), result.to_json())
            }
            Self::YourTurn | Self::ImFinished => Value::from(self.kind()),
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        const CONTEXT: &str = "Generating";
        let (case, inner) = json::untag(CONTEXT, value)?;
        match (case, inner) {
            ("generated", Some(fields)) => Ok(Self::Generated {
                value: P::from_json(json::field(CONTEXT, fields, "value")?)?,
                operation: P::from_json(json::field(CONTEXT, fields, "operation")?)?,
            }),
            ("badResult", Some(result)) => Ok(Self::BadResult(P::from_json(result)?)),
            ("yourTurn", None) => Ok(Self::YourTurn),
            ("imFinished", None) => Ok(Self::ImFinished),
            ("noParseOperated", Some(result)) => Ok(Self::NoParseOperated(P::from_json(result)?)),
            (case, _) => Err(json::unknown_case(CONTEXT, case)),
        }
    }
}

/// Sent by the peer applying operations for the current trial.
#[derive(Clone, Debug, PartialEq)]
pub enum Operating<P> {
    /// The encoded output of applying the operation to the value.
    Operated(P),
    /// The received value could not be parsed.
    NoParseValue(P),
    /// The received operation could not be parsed.
    NoParseOperation(P),
}

impl<P> Operating<P> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Operated(_) => "operated",
            Self::NoParseValue(_) => "noParseValue",
            Self::NoParseOperation(_) => "noParseOperation",
        }
    }

    fn tag(&self) -> u8 {
        match self {
            Self::Operated(_) => 0,
            Self::NoParseValue(_) => 1,
            Self::NoParseOperation(_) => 2,
        }
    }

    fn payload(&self) -> &P {
        match self {
            Self::Operated(p) | Self::NoParseValue(p) | Self::NoParseOperation(p) => p,
        }
    }
}

impl<P: Write> Write for Operating<P> {
    fn write(&self, buf: &mut impl BufMut) {
        self.tag().write(buf);
        self.payload().write(buf);
    }
}

impl<P: EncodeSize> EncodeSize for Operating<P> {
    fn encode_size(&self) -> usize {
        1 + self.payload().encode_size()
    }
}

impl<P: Read> Read for Operating<P> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        let tag = u8::read(buf)?;
        let make = match tag {
            0 => Self::Operated,
            1 => Self::NoParseValue,
            2 => Self::NoParseOperation,
            d => return Err(Error::InvalidEnum(d)),
        };
        Ok(make(P::read(buf)?))
    }
}

impl<P: Json> Json for Operating<P> {
    fn to_json(&self) -> Value {
        json::tagged(self.kind(), self.payload().to_json())
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        const CONTEXT: &str = "Operating";
        let (case, inner) = json::untag(CONTEXT, value)?;
        let make = match case {
            "operated" => Self::Operated,
            "noParseValue" => Self::NoParseValue,
            "noParseOperation" => Self::NoParseOperation,
            _ => return Err(json::unknown_case(CONTEXT, case)),
        };
        Ok(make(P::from_json(json::argument(CONTEXT, case, inner)?)?))
    }
}

/// Messages sent by the peer that opens the session.
#[derive(Clone, Debug, PartialEq)]
pub enum First<P> {
    /// Advertises the topics First can test.
    Topics(AvailableTopics),
    /// The topics Second asked to start were not a non-empty subset of First's.
    BadStartSubset,
    FirstGenerating {
        topic: Topic,
        generating: Generating<P>,
    },
    FirstOperating {
        topic: Topic,
        operating: Operating<P>,
    },
}

impl<P> First<P> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Topics(_) => "topics",
            Self::BadStartSubset => "badStartSubset",
            Self::FirstGenerating { .. } => "firstGenerating",
            Self::FirstOperating { .. } => "firstOperating",
        }
    }
}

impl<P: Write> Write for First<P> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Topics(topics) => {
                0u8.write(buf);
                topics.write(buf);
            }
            Self::BadStartSubset => 1u8.write(buf),
            Self::FirstGenerating { topic, generating } => {
                2u8.write(buf);
                topic.write(buf);
                generating.write(buf);
            }
            Self::FirstOperating { topic, operating } => {
                3u8.write(buf);
                topic.write(buf);
                operating.write(buf);
            }
        }
    }
}

impl<P: EncodeSize> EncodeSize for First<P> {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Topics(topics) => topics.encode_size(),
            Self::BadStartSubset => 0,
            Self::FirstGenerating { topic, generating } => {
                topic.encode_size() + generating.encode_size()
            }
            Self::FirstOperating { topic, operating } => {
                topic.encode_size() + operating.encode_size()
            }
        }
    }
}

impl<P: Read> Read for First<P> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(Self::Topics(AvailableTopics::read(buf)?)),
            1 => Ok(Self::BadStartSubset),
            2 => {
                let topic = Topic::read(buf)?;
                let generating = Generating::read(buf)?;
                Ok(Self::FirstGenerating { topic, generating })
            }
            3 => {
                let topic = Topic::read(buf)?;
                let operating = Operating::read(buf)?;
                Ok(Self::FirstOperating { topic, operating })
            }
            d => Err(Error::InvalidEnum(d)),
        }
    }
}

impl<P: Json> Json for First<P> {
    fn to_json(&self) -> Value {
        match self {
            Self::Topics(topics) => json::tagged(self.kind(), topics.to_json()),
            Self::BadStartSubset => Value::from(self.kind()),
            Self::FirstGenerating { topic, generating } => {
                let mut fields = Map::with_capacity(2);
                fields.insert("topic".to_string(), topic.to_json());
                fields.insert("generating".to_string(), generating.to_json());
                json::tagged(self.kind(), Value::Object(fields))
            }
            Self::FirstOperating { topic, operating } => {
                let mut fields = Map::with_capacity(2);
                fields.insert("topic".to_string(), topic.to_json());
                fields.insert("operating".to_string(), operating.to_json());
                json::tagged(self.kind(), Value::Object(fields))
            }
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        const CONTEXT: &str = "First";
        match json::untag(CONTEXT, value)? {
            ("topics", Some(topics)) => Ok(Self::Topics(AvailableTopics::from_json(topics)?)),
            ("badStartSubset", None) => Ok(Self::BadStartSubset),
            ("firstGenerating", Some(fields)) => Ok(Self::FirstGenerating {
                topic: Topic::from_json(json::field(CONTEXT, fields, "topic")?)?,
                generating: Generating::from_json(json::field(CONTEXT, fields, "generating")?)?,
            }),
            ("firstOperating", Some(fields)) => Ok(Self::FirstOperating {
                topic: Topic::from_json(json::field(CONTEXT, fields, "topic")?)?,
                operating: Operating::from_json(json::field(CONTEXT, fields, "operating")?)?,
            }),
            (case, _) => Err(json::unknown_case(CONTEXT, case)),
        }
    }
}

/// Messages sent by the peer that accepts the session.
///
/// Second always follows First's topic order, so its per-topic messages carry no topic.
#[derive(Clone, Debug, PartialEq)]
pub enum Second<P> {
    /// No usable topics were shared; carries the offending topics.
    BadTopics(AvailableTopics),
    /// The topics both peers will test.
    Start(BTreeSet<Topic>),
    SecondOperating(Operating<P>),
    SecondGenerating(Generating<P>),
}

impl<P> Second<P> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadTopics(_) => "badTopics",
            Self::Start(_) => "start",
            Self::SecondOperating(_) => "secondOperating",
            Self::SecondGenerating(_) => "secondGenerating",
        }
    }
}

impl<P: Write> Write for Second<P> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::BadTopics(topics) => {
                0u8.write(buf);
                topics.write(buf);
            }
            Self::Start(topics) => {
                1u8.write(buf);
                topic::write_set(topics, buf);
            }
            Self::SecondOperating(operating) => {
                2u8.write(buf);
                operating.write(buf);
            }
            Self::SecondGenerating(generating) => {
                3u8.write(buf);
                generating.write(buf);
            }
        }
    }
}

impl<P: EncodeSize> EncodeSize for Second<P> {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::BadTopics(topics) => topics.encode_size(),
            Self::Start(topics) => topic::set_size(topics),
            Self::SecondOperating(operating) => operating.encode_size(),
            Self::SecondGenerating(generating) => generating.encode_size(),
        }
    }
}

impl<P: Read> Read for Second<P> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(Self::BadTopics(AvailableTopics::read(buf)?)),
            1 => Ok(Self::Start(topic::read_set(buf)?)),
            2 => Ok(Self::SecondOperating(Operating::read(buf)?)),
            3 => Ok(Self::SecondGenerating(Generating::read(buf)?)),
            d => Err(Error::InvalidEnum(d)),
        }
    }
}

impl<P: Json> Json for Second<P> {
    fn to_json(&self) -> Value {
        let inner = match self {
            Self::BadTopics(topics) => topics.to_json(),
            Self::Start(topics) => topic::set_to_json(topics),
            Self::SecondOperating(operating) => operating.to_json(),
            Self::SecondGenerating(generating) => generating.to_json(),
        };
        json::tagged(self.kind(), inner)
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        const CONTEXT: &str = "Second";
        let (case, inner) = json::untag(CONTEXT, value)?;
        let inner = match case {
            "badTopics" | "start" | "secondOperating" | "secondGenerating" => {
                json::argument(CONTEXT, case, inner)?
            }
            _ => return Err(json::unknown_case(CONTEXT, case)),
        };
        match case {
            "badTopics" => Ok(Self::BadTopics(AvailableTopics::from_json(inner)?)),
            "start" => Ok(Self::Start(topic::set_from_json(inner)?)),
            "secondOperating" => Ok(Self::SecondOperating(Operating::from_json(inner)?)),
            _ => Ok(Self::SecondGenerating(Generating::from_json(inner)?)),
        }
    }
}
