//! Deterministic generation of values from a seed.
//!
//! Values are drawn with the [arbitrary] crate from a buffer filled by a seeded ChaCha RNG, so the
//! same seed always yields the same value on every platform.

use arbitrary::{Arbitrary, Unstructured};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Initial size of the random buffer used for generating arbitrary values.
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Maximum buffer size to try before giving up (16 MB).
const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// Generate a deterministic value of type `T` using the given seed.
pub fn generate_value<T>(seed: u64) -> T
where
    T: for<'a> Arbitrary<'a>,
{
    generate_with(seed, |u| T::arbitrary(u))
}

/// Generate a deterministic value using `f` to consume the seeded input.
///
/// If the initial buffer is insufficient, the buffer size is doubled until generation succeeds or
/// the maximum size is reached. On `IncorrectFormat` the rejected bytes are already consumed, so
/// retrying reads fresh bytes from the same deterministic buffer.
///
/// # Panics
///
/// Panics if `f` still runs out of data with the maximum buffer size.
pub fn generate_with<T, F>(seed: u64, mut f: F) -> T
where
    F: for<'a> FnMut(&mut Unstructured<'a>) -> arbitrary::Result<T>,
{
    let mut buffer_size = INITIAL_BUFFER_SIZE;
    loop {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut buffer = vec![0u8; buffer_size];
        rng.fill(&mut buffer[..]);

        let mut unstructured = Unstructured::new(&buffer);
        loop {
            match f(&mut unstructured) {
                Ok(value) => return value,
                Err(arbitrary::Error::IncorrectFormat) if !unstructured.is_empty() => continue,
                Err(arbitrary::Error::IncorrectFormat) | Err(arbitrary::Error::NotEnoughData) => {
                    break
                }
                Err(e) => panic!("failed to generate arbitrary value: {e}"),
            }
        }

        // Give up if we've already tried the maximum size
        if buffer_size >= MAX_BUFFER_SIZE {
            panic!("failed to generate arbitrary value: NotEnoughData with {buffer_size} bytes");
        }
        buffer_size = (buffer_size * 2).min(MAX_BUFFER_SIZE);
    }
}
