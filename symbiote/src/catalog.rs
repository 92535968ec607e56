//! The reference set of topics every peer ships with.

use crate::{
    encoding::Encoding,
    property::{Both, Comparison, Enumerable, Equality, Monoid, Semigroup, Semiring},
    registry::{Registry, TopicCodec},
    topic::Size,
};
use symbiote_codec::{String16, String32, String8, Vector32, Vector8};

fn size(bytes: u16) -> Size {
    Size::from(bytes)
}

fn concat_strings(a: &String32, b: &String32) -> String32 {
    let mut joined = a.as_str().to_string();
    joined.push_str(b);
    // Saturate at the left operand if the prefix would overflow.
    String32::new(joined).unwrap_or_else(|_| a.clone())
}

fn concat_vectors(a: &Vector32<i32>, b: &Vector32<i32>) -> Vector32<i32> {
    let mut items = a.to_vec();
    items.extend_from_slice(b);
    Vector32::new(items).unwrap_or_else(|_| a.clone())
}

/// Builds the registry of reference topics for encoding `E`.
pub fn registry<E: Encoding>() -> Registry<E> {
    let mut registry = Registry::new();
    registry.register(
        "Unit",
        TopicCodec::<(), _>::new(size(0), Equality).distinct(1),
    );
    registry.register(
        "Boolean",
        TopicCodec::<bool, _>::new(size(1), Equality).distinct(2),
    );
    registry.register(
        "Uint8",
        TopicCodec::<u8, _>::new(
            size(1),
            Enumerable::<u8> {
                succ: |v: &u8| v.checked_add(1),
                pred: |v: &u8| v.checked_sub(1),
            },
        ),
    );
    registry.register(
        "Uint16",
        TopicCodec::<u16, _>::new(
            size(2),
            Semiring::<u16> {
                add: |a: &u16, b: &u16| a.wrapping_add(*b),
                multiply: |a: &u16, b: &u16| a.wrapping_mul(*b),
            },
        ),
    );
    registry.register("Uint32", TopicCodec::<u32, _>::new(size(4), Equality));
    registry.register("Uint64", TopicCodec::<u64, _>::new(size(8), Equality));
    registry.register(
        "Int8",
        TopicCodec::<i8, _>::new(size(1), Both(Equality, Comparison)),
    );
    registry.register("Int16", TopicCodec::<i16, _>::new(size(2), Comparison));
    registry.register("Int32", TopicCodec::<i32, _>::new(size(4), Equality));
    registry.register("Int64", TopicCodec::<i64, _>::new(size(8), Equality));
    registry.register("Float32", TopicCodec::<f32, _>::new(size(4), Equality));
    registry.register("Float64", TopicCodec::<f64, _>::new(size(8), Equality));
    registry.register("String8", TopicCodec::<String8, _>::new(size(1), Equality));
    registry.register(
        "String16",
        TopicCodec::<String16, _>::new(size(2), Comparison),
    );
    registry.register(
        "String32",
        TopicCodec::<String32, _>::new(
            size(4),
            Semigroup::<String32> {
                append: concat_strings,
            },
        ),
    );
    registry.register(
        "Vector8Uint8",
        TopicCodec::<Vector8<u8>, _>::new(size(1), Equality),
    );
    registry.register(
        "Vector32Int32",
        TopicCodec::<Vector32<i32>, _>::new(
            size(4),
            Monoid::<Vector32<i32>> {
                append: concat_vectors,
                empty: Vector32::default,
            },
        ),
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        encoding::{BinaryEncoding, JsonEncoding},
        message::Operating,
        registry::Verdict,
        topic::Topic,
    };

    fn exercise<E: Encoding>() {
        let registry = registry::<E>();
        for topic in registry.topics() {
            let suite = registry.lookup(topic).unwrap();
            for seed in 0..8 {
                let trial = suite.generate(seed);
                let Operating::Operated(output) = suite.operate(&trial.value, &trial.operation)
                else {
                    panic!("{topic}: operate failed for seed {seed}");
                };
                assert_eq!(
                    suite.verify(&trial, &output),
                    Verdict::Passed,
                    "{topic}: seed {seed}"
                );
            }
        }
    }

    #[test]
    fn test_catalog_binary() {
        exercise::<BinaryEncoding>();
    }

    #[test]
    fn test_catalog_json() {
        exercise::<JsonEncoding>();
    }

    #[test]
    fn test_catalog_topics() {
        let registry = registry::<BinaryEncoding>();
        let available = registry.available();
        assert_eq!(available.len(), 17);
        assert_eq!(available.get(&Topic::from("Int32")), Size::new(4));
        assert_eq!(available.get(&Topic::from("String8")), Size::new(1));
        let unit = registry.lookup(&Topic::from("Unit")).unwrap();
        assert_eq!(unit.limit(), Some(1));
    }
}
