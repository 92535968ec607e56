//! Property-check capabilities.
//!
//! A [Property] describes how to exercise a type under test: it draws an operation to pair with a
//! generated value and computes the output both peers must agree on. Each capability asks only for
//! what it tests (equality, ordering, or caller-supplied combinators), so a type that cannot
//! be ordered can still be registered with [Equality].

use arbitrary::{Arbitrary, Unstructured};
use bytes::{Buf, BufMut};
use either::Either;
use serde_json::Value;
use std::{cmp::Ordering, fmt::Debug};
use symbiote_codec::{json, Codec, EncodeSize, Error, Json, Read, Write};

/// Bounds shared by every value, operation, and output carried in a trial.
pub trait Subject:
    Codec + Clone + Debug + PartialEq + Send + Sync + 'static + for<'a> Arbitrary<'a>
{
}

impl<T> Subject for T where
    T: Codec + Clone + Debug + PartialEq + Send + Sync + 'static + for<'a> Arbitrary<'a>
{
}

/// A check that can be run against values of type `T`.
pub trait Property<T>: Send + Sync + 'static {
    /// Input drawn alongside each value.
    type Operation: Codec + Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Result of applying an operation to a value.
    type Output: Codec + Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Draws an operation to pair with `value`.
    fn operation(
        &self,
        value: &T,
        u: &mut Unstructured<'_>,
    ) -> arbitrary::Result<Self::Operation>;

    /// Applies `operation` to `value`.
    fn perform(&self, value: &T, operation: &Self::Operation) -> Self::Output;
}

/// Checks `value == operation`.
///
/// Half of the drawn operations are the value itself, so both outcomes are exercised even for types
/// with many inhabitants.
#[derive(Clone, Copy, Debug, Default)]
pub struct Equality;

impl<T: Subject> Property<T> for Equality {
    type Operation = T;
    type Output = bool;

    fn operation(&self, value: &T, u: &mut Unstructured<'_>) -> arbitrary::Result<T> {
        if u.arbitrary::<bool>()? {
            return Ok(value.clone());
        }
        T::arbitrary(u)
    }

    fn perform(&self, value: &T, operation: &T) -> bool {
        value == operation
    }
}

/// Checks `value.cmp(operation)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Comparison;

impl<T: Subject + Ord> Property<T> for Comparison {
    type Operation = T;
    type Output = Ordering;

    fn operation(&self, value: &T, u: &mut Unstructured<'_>) -> arbitrary::Result<T> {
        if u.ratio(1u8, 4u8)? {
            return Ok(value.clone());
        }
        T::arbitrary(u)
    }

    fn perform(&self, value: &T, operation: &T) -> Ordering {
        value.cmp(operation)
    }
}

/// Checks an associative `append`.
pub struct Semigroup<T> {
    pub append: fn(&T, &T) -> T,
}

impl<T: Subject> Property<T> for Semigroup<T> {
    type Operation = T;
    type Output = T;

    fn operation(&self, _: &T, u: &mut Unstructured<'_>) -> arbitrary::Result<T> {
        T::arbitrary(u)
    }

    fn perform(&self, value: &T, operation: &T) -> T {
        (self.append)(value, operation)
    }
}

/// Operation drawn by [Monoid].
#[derive(Clone, Debug, PartialEq)]
pub enum MonoidOperation<T> {
    /// Append the carried value.
    Append(T),
    /// Append the identity element.
    Identity,
}

impl<T: Write> Write for MonoidOperation<T> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Append(other) => {
                0u8.write(buf);
                other.write(buf);
            }
            Self::Identity => 1u8.write(buf),
        }
    }
}

impl<T: EncodeSize> EncodeSize for MonoidOperation<T> {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Append(other) => other.encode_size(),
            Self::Identity => 0,
        }
    }
}

impl<T: Read> Read for MonoidOperation<T> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(Self::Append(T::read(buf)?)),
            1 => Ok(Self::Identity),
            d => Err(Error::InvalidEnum(d)),
        }
    }
}

impl<T: Json> Json for MonoidOperation<T> {
    fn to_json(&self) -> Value {
        match self {
            Self::Append(other) => json::tagged("append", other.to_json()),
            Self::Identity => Value::from("identity"),
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        const CONTEXT: &str = "MonoidOperation";
        match json::untag(CONTEXT, value)? {
            ("append", inner) => Ok(Self::Append(T::from_json(json::argument(
                CONTEXT, "append", inner,
            )?)?)),
            ("identity", None) => Ok(Self::Identity),
            (case, _) => Err(json::unknown_case(CONTEXT, case)),
        }
    }
}

/// Checks an `append` with an identity element `empty`.
pub struct Monoid<T> {
    pub append: fn(&T, &T) -> T,
    pub empty: fn() -> T,
}

impl<T: Subject> Property<T> for Monoid<T> {
    type Operation = MonoidOperation<T>;
    type Output = T;

    fn operation(&self, _: &T, u: &mut Unstructured<'_>) -> arbitrary::Result<MonoidOperation<T>> {
        if u.ratio(1u8, 3u8)? {
            return Ok(MonoidOperation::Identity);
        }
        Ok(MonoidOperation::Append(T::arbitrary(u)?))
    }

    fn perform(&self, value: &T, operation: &MonoidOperation<T>) -> T {
        match operation {
            MonoidOperation::Append(other) => (self.append)(value, other),
            MonoidOperation::Identity => (self.append)(value, &(self.empty)()),
        }
    }
}

/// Direction drawn by [Enumerable].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Succ,
    Pred,
}

impl Write for Step {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Succ => 0u8.write(buf),
            Self::Pred => 1u8.write(buf),
        }
    }
}

impl EncodeSize for Step {
    fn encode_size(&self) -> usize {
        1
    }
}

impl Read for Step {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(Self::Succ),
            1 => Ok(Self::Pred),
            d => Err(Error::InvalidEnum(d)),
        }
    }
}

impl Json for Step {
    fn to_json(&self) -> Value {
        match self {
            Self::Succ => Value::from("succ"),
            Self::Pred => Value::from("pred"),
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        match json::untag("Step", value)? {
            ("succ", None) => Ok(Self::Succ),
            ("pred", None) => Ok(Self::Pred),
            (case, _) => Err(json::unknown_case("Step", case)),
        }
    }
}

/// Checks the successor and predecessor of a value, which may not exist at the bounds.
pub struct Enumerable<T> {
    pub succ: fn(&T) -> Option<T>,
    pub pred: fn(&T) -> Option<T>,
}

impl<T: Subject> Property<T> for Enumerable<T> {
    type Operation = Step;
    type Output = Option<T>;

    fn operation(&self, _: &T, u: &mut Unstructured<'_>) -> arbitrary::Result<Step> {
        Ok(if u.arbitrary::<bool>()? {
            Step::Succ
        } else {
            Step::Pred
        })
    }

    fn perform(&self, value: &T, operation: &Step) -> Option<T> {
        match operation {
            Step::Succ => (self.succ)(value),
            Step::Pred => (self.pred)(value),
        }
    }
}

/// Operation drawn by [Semiring].
#[derive(Clone, Debug, PartialEq)]
pub enum SemiringOperation<T> {
    Add(T),
    Multiply(T),
}

impl<T: Write> Write for SemiringOperation<T> {
    fn write(&self, buf: &mut impl BufMut) {
        match self {
            Self::Add(other) => {
                0u8.write(buf);
                other.write(buf);
            }
            Self::Multiply(other) => {
                1u8.write(buf);
                other.write(buf);
            }
        }
    }
}

impl<T: EncodeSize> EncodeSize for SemiringOperation<T> {
    fn encode_size(&self) -> usize {
        1 + match self {
            Self::Add(other) | Self::Multiply(other) => other.encode_size(),
        }
    }
}

impl<T: Read> Read for SemiringOperation<T> {
    fn read(buf: &mut impl Buf) -> Result<Self, Error> {
        match u8::read(buf)? {
            0 => Ok(Self::Add(T::read(buf)?)),
            1 => Ok(Self::Multiply(T::read(buf)?)),
            d => Err(Error::InvalidEnum(d)),
        }
    }
}

impl<T: Json> Json for SemiringOperation<T> {
    fn to_json(&self) -> Value {
        match self {
            Self::Add(other) => json::tagged("add", other.to_json()),
            Self::Multiply(other) => json::tagged("multiply", other.to_json()),
        }
    }

    fn from_json(value: &Value) -> Result<Self, Error> {
        const CONTEXT: &str = "SemiringOperation";
        let (case, inner) = json::untag(CONTEXT, value)?;
        match case {
            "add" => Ok(Self::Add(T::from_json(json::argument(CONTEXT, case, inner)?)?)),
            "multiply" => Ok(Self::Multiply(T::from_json(json::argument(
                CONTEXT, case, inner,
            )?)?)),
            _ => Err(json::unknown_case(CONTEXT, case)),
        }
    }
}

/// Checks `add` and `multiply`.
pub struct Semiring<T> {
    pub add: fn(&T, &T) -> T,
    pub multiply: fn(&T, &T) -> T,
}

impl<T: Subject> Property<T> for Semiring<T> {
    type Operation = SemiringOperation<T>;
    type Output = T;

    fn operation(
        &self,
        _: &T,
        u: &mut Unstructured<'_>,
    ) -> arbitrary::Result<SemiringOperation<T>> {
        let other = T::arbitrary(u)?;
        Ok(if u.arbitrary::<bool>()? {
            SemiringOperation::Add(other)
        } else {
            SemiringOperation::Multiply(other)
        })
    }

    fn perform(&self, value: &T, operation: &SemiringOperation<T>) -> T {
        match operation {
            SemiringOperation::Add(other) => (self.add)(value, other),
            SemiringOperation::Multiply(other) => (self.multiply)(value, other),
        }
    }
}

/// Runs either of two properties, chosen per trial.
pub struct Both<A, B>(pub A, pub B);

impl<T, A, B> Property<T> for Both<A, B>
where
    A: Property<T>,
    B: Property<T>,
{
    type Operation = Either<A::Operation, B::Operation>;
    type Output = Either<A::Output, B::Output>;

    fn operation(
        &self,
        value: &T,
        u: &mut Unstructured<'_>,
    ) -> arbitrary::Result<Self::Operation> {
        if u.arbitrary::<bool>()? {
            return Ok(Either::Left(self.0.operation(value, u)?));
        }
        Ok(Either::Right(self.1.operation(value, u)?))
    }

    fn perform(&self, value: &T, operation: &Self::Operation) -> Self::Output {
        match operation {
            Either::Left(operation) => Either::Left(self.0.perform(value, operation)),
            Either::Right(operation) => Either::Right(self.1.perform(value, operation)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;
    use symbiote_codec::{generate_with, Decode, Encode, Vector32};

    fn concat(a: &Vector32<i32>, b: &Vector32<i32>) -> Vector32<i32> {
        let mut items = a.to_vec();
        items.extend_from_slice(b);
        Vector32::new(items).unwrap()
    }

    #[test]
    fn test_equality_draws_both_outcomes() {
        let mut equal = 0;
        for seed in 0..64 {
            let value = 7u32;
            let operation = generate_with(seed, |u| Equality.operation(&value, u));
            if Property::<u32>::perform(&Equality, &value, &operation) {
                equal += 1;
            }
        }
        assert!(equal > 0 && equal < 64);
    }

    #[test]
    fn test_comparison() {
        assert_eq!(Comparison.perform(&3i16, &5i16), Ordering::Less);
        assert_eq!(Comparison.perform(&5i16, &5i16), Ordering::Equal);
    }

    #[test]
    fn test_monoid_identity() {
        let monoid = Monoid {
            append: concat,
            empty: Vector32::default,
        };
        let value = Vector32::new(vec![1, 2]).unwrap();
        assert_eq!(monoid.perform(&value, &MonoidOperation::Identity), value);
        let other = Vector32::new(vec![3]).unwrap();
        assert_eq!(
            monoid.perform(&value, &MonoidOperation::Append(other)),
            Vector32::new(vec![1, 2, 3]).unwrap()
        );
    }

    #[test]
    fn test_monoid_operation_codec() {
        let operation = MonoidOperation::Append(5u8);
        assert_eq!(&operation.encode()[..], &[0, 5]);
        assert_eq!(operation.to_json(), json!({"append": 5}));
        assert_eq!(MonoidOperation::<u8>::Identity.to_json(), json!("identity"));
        assert_eq!(
            MonoidOperation::<u8>::from_json(&json!("identity")).unwrap(),
            MonoidOperation::Identity
        );
        assert!(matches!(
            MonoidOperation::<u8>::decode(Bytes::from_static(&[2])),
            Err(Error::InvalidEnum(2))
        ));
    }

    #[test]
    fn test_enumerable_bounds() {
        let enumerable = Enumerable::<u8> {
            succ: |v: &u8| v.checked_add(1),
            pred: |v: &u8| v.checked_sub(1),
        };
        assert_eq!(enumerable.perform(&255, &Step::Succ), None);
        assert_eq!(enumerable.perform(&0, &Step::Pred), None);
        assert_eq!(enumerable.perform(&9, &Step::Succ), Some(10));
    }

    #[test]
    fn test_step_codec() {
        assert_eq!(Step::Pred.to_json(), json!("pred"));
        assert_eq!(Step::from_json(&json!("succ")).unwrap(), Step::Succ);
        assert!(Step::from_json(&json!({"succ": 1})).is_err());
        assert_eq!(Step::decode(Step::Pred.encode()).unwrap(), Step::Pred);
    }

    #[test]
    fn test_semiring() {
        let semiring = Semiring::<u16> {
            add: |a: &u16, b: &u16| a.wrapping_add(*b),
            multiply: |a: &u16, b: &u16| a.wrapping_mul(*b),
        };
        assert_eq!(semiring.perform(&65535, &SemiringOperation::Add(2)), 1);
        assert_eq!(semiring.perform(&300, &SemiringOperation::Multiply(300)), 24464);
        let operation = SemiringOperation::Multiply(3u16);
        assert_eq!(operation.to_json(), json!({"multiply": 3}));
        assert_eq!(
            SemiringOperation::<u16>::decode(operation.encode()).unwrap(),
            operation
        );
    }

    #[test]
    fn test_both() {
        let both = Both(Equality, Comparison);
        let left = both.perform(&4i8, &Either::Left(4));
        assert_eq!(left, Either::Left(true));
        let right = both.perform(&4i8, &Either::Right(9));
        assert_eq!(right, Either::Right(Ordering::Less));
    }
}
