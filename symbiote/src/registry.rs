//! Map topics to the codecs and properties that exercise them.

use crate::{
    encoding::Encoding,
    message::Operating,
    property::{Property, Subject},
    topic::{AvailableTopics, Size, Topic},
};
use std::{collections::BTreeMap, marker::PhantomData};
use symbiote_codec::generate_with;

/// One generated trial, already encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct Trial<P> {
    pub value: P,
    pub operation: P,
    /// Output the operator is expected to return.
    pub expected: P,
}

/// Outcome of checking an operator's output against a [Trial].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// The output parsed but did not match.
    BadResult,
    /// The output could not be parsed.
    NoParseOperated,
}

/// Everything a session needs to test one topic in encoding `E`, with the value type erased.
pub trait Suite<E: Encoding>: Send + Sync {
    /// Advertised size hint.
    fn size(&self) -> Size;

    /// Number of distinct values worth generating, if bounded.
    fn limit(&self) -> Option<usize>;

    /// Generates a value and operation from `seed`, along with the expected output.
    fn generate(&self, seed: u64) -> Trial<E::Payload>;

    /// Parses a received value and operation and applies the operation.
    ///
    /// Parse failures are reported back to the generator with the raw payload.
    fn operate(&self, value: &E::Payload, operation: &E::Payload) -> Operating<E::Payload>;

    /// Checks the output returned for `trial`.
    fn verify(&self, trial: &Trial<E::Payload>, output: &E::Payload) -> Verdict;
}

/// The codec and property registered for a single topic.
pub struct TopicCodec<T, P> {
    size: Size,
    property: P,
    distinct: Option<usize>,
    _value: PhantomData<fn() -> T>,
}

impl<T: Subject, P: Property<T>> TopicCodec<T, P> {
    pub fn new(size: Size, property: P) -> Self {
        Self {
            size,
            property,
            distinct: None,
            _value: PhantomData,
        }
    }

    /// Caps the number of trials for types with few inhabitants.
    pub fn distinct(mut self, distinct: usize) -> Self {
        self.distinct = Some(distinct);
        self
    }
}

impl<E, T, P> Suite<E> for TopicCodec<T, P>
where
    E: Encoding,
    T: Subject,
    P: Property<T>,
{
    fn size(&self) -> Size {
        self.size
    }

    fn limit(&self) -> Option<usize> {
        self.distinct
    }

    fn generate(&self, seed: u64) -> Trial<E::Payload> {
        let (value, operation) = generate_with(seed, |u| {
            let value = T::arbitrary(u)?;
            let operation = self.property.operation(&value, u)?;
            Ok((value, operation))
        });
        let expected = self.property.perform(&value, &operation);
        Trial {
            value: E::encode(&value),
            operation: E::encode(&operation),
            expected: E::encode(&expected),
        }
    }

    fn operate(&self, value: &E::Payload, operation: &E::Payload) -> Operating<E::Payload> {
        let Ok(parsed) = E::decode::<T>(value) else {
            return Operating::NoParseValue(value.clone());
        };
        let Ok(op) = E::decode::<P::Operation>(operation) else {
            return Operating::NoParseOperation(operation.clone());
        };
        let output = self.property.perform(&parsed, &op);
        Operating::Operated(E::encode(&output))
    }

    fn verify(&self, trial: &Trial<E::Payload>, output: &E::Payload) -> Verdict {
        let Ok(output) = E::decode::<P::Output>(output) else {
            return Verdict::NoParseOperated;
        };
        match E::decode::<P::Output>(&trial.expected) {
            Ok(expected) if expected == output => Verdict::Passed,
            _ => Verdict::BadResult,
        }
    }
}

/// The topics a peer can test in encoding `E`.
///
/// A registry is populated once at startup and then shared read-only between sessions.
pub struct Registry<E: Encoding> {
    suites: BTreeMap<Topic, Box<dyn Suite<E>>>,
}

impl<E: Encoding> Default for Registry<E> {
    fn default() -> Self {
        Self {
            suites: BTreeMap::new(),
        }
    }
}

impl<E: Encoding> Registry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `suite` under `topic`, returning whether an earlier entry was replaced.
    pub fn register(&mut self, topic: impl Into<Topic>, suite: impl Suite<E> + 'static) -> bool {
        self.suites.insert(topic.into(), Box::new(suite)).is_some()
    }

    pub fn lookup(&self, topic: &Topic) -> Option<&dyn Suite<E>> {
        self.suites.get(topic).map(|suite| suite.as_ref())
    }

    /// Topics and size hints to advertise.
    pub fn available(&self) -> AvailableTopics {
        self.suites
            .iter()
            .map(|(topic, suite)| (topic.clone(), suite.size()))
            .collect()
    }

    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.suites.keys()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encoding::{BinaryEncoding, JsonEncoding},
        property::{Comparison, Equality},
    };
    use bytes::Bytes;
    use serde_json::json;

    fn int32() -> TopicCodec<i32, Equality> {
        TopicCodec::new(Size::new(4).unwrap(), Equality)
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = Registry::<BinaryEncoding>::new();
        assert!(!registry.register("Int32", int32()));
        assert!(registry.register("Int32", int32()));
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&Topic::from("Int64")).is_none());
    }

    #[test]
    fn test_available() {
        let mut registry = Registry::<JsonEncoding>::new();
        registry.register("Int32", int32());
        registry.register(
            "String8",
            TopicCodec::<symbiote_codec::String8, _>::new(Size::new(1).unwrap(), Comparison),
        );
        let available = registry.available();
        assert_eq!(available.len(), 2);
        assert_eq!(available.get(&Topic::from("String8")), Size::new(1));
    }

    #[test]
    fn test_generate_deterministic() {
        let suite: &dyn Suite<BinaryEncoding> = &int32();
        assert_eq!(suite.generate(9), suite.generate(9));
        let trial = suite.generate(9);
        assert_eq!(trial.value.len(), 4);
        assert_eq!(trial.operation.len(), 4);
        assert_eq!(trial.expected.len(), 1);
    }

    #[test]
    fn test_operate_and_verify() {
        let suite: &dyn Suite<BinaryEncoding> = &int32();
        for seed in 0..16 {
            let trial = suite.generate(seed);
            let Operating::Operated(output) = suite.operate(&trial.value, &trial.operation) else {
                panic!("operate failed");
            };
            assert_eq!(output, trial.expected);
            assert_eq!(suite.verify(&trial, &output), Verdict::Passed);
        }
    }

    #[test]
    fn test_operate_equal_int32() {
        let suite: &dyn Suite<BinaryEncoding> = &int32();
        let value = Bytes::from_static(&[0x00, 0x00, 0x00, 0x2A]);
        let result = suite.operate(&value, &value);
        assert_eq!(result, Operating::Operated(Bytes::from_static(&[1])));
    }

    #[test]
    fn test_operate_truncated_value() {
        let suite: &dyn Suite<BinaryEncoding> = &int32();
        let value = Bytes::from_static(&[0x00, 0x2A]);
        let operation = Bytes::from_static(&[0x00, 0x00, 0x00, 0x2A]);
        assert_eq!(
            suite.operate(&value, &operation),
            Operating::NoParseValue(value.clone())
        );
        assert_eq!(
            suite.operate(&operation, &value),
            Operating::NoParseOperation(value)
        );
    }

    #[test]
    fn test_verify_failures() {
        let suite: &dyn Suite<JsonEncoding> = &int32();
        let trial = Trial {
            value: json!(42),
            operation: json!(42),
            expected: json!(true),
        };
        assert_eq!(suite.verify(&trial, &json!(true)), Verdict::Passed);
        assert_eq!(suite.verify(&trial, &json!(false)), Verdict::BadResult);
        assert_eq!(suite.verify(&trial, &json!("true")), Verdict::NoParseOperated);
    }
}
