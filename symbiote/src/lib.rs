//! Check that two implementations of a set of types agree on their serialization.
//!
//! Two peers (First and Second) connect over a [channel::Channel], agree on a set of topics (named
//! types with an expected encoded size), and then run round-trip trials for each topic. In every
//! trial one peer generates a random value and an operation, the other decodes both, performs the
//! operation, and sends back the encoded result. The generator then checks that result against its
//! own. Each peer ends the session with a [Report] of how many trials passed, failed, or were cut
//! short.
//!
//! # Encodings
//!
//! Sessions run entirely in one [Encoding]: [JsonEncoding] sends each message as a JSON document and
//! [BinaryEncoding] sends the big-endian binary layout of [symbiote_codec].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use symbiote::{catalog, channel::memory, BinaryEncoding, Config, Driver};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = Config::test(0);
//! let driver = Driver::<BinaryEncoding>::new(Arc::new(catalog::registry()), config.clone());
//!
//! let (first, second) = memory::pair(config.mailbox_size);
//! let (first, second) = tokio::join!(driver.first(first), driver.second(second));
//! assert!(first.is_success());
//! assert!(second.is_success());
//! # }
//! ```

pub mod catalog;
pub mod channel;
pub mod config;
pub mod driver;
pub mod encoding;
pub mod error;
pub mod message;
pub mod negotiate;
pub mod property;
pub mod registry;
pub mod report;
mod session;
pub mod topic;

pub use config::{parse_duration, Config, Policy};
pub use driver::Driver;
pub use encoding::{BinaryEncoding, Encoding, JsonEncoding};
pub use error::Error;
pub use registry::{Registry, Suite, TopicCodec};
pub use report::{Abort, Party, Report, Tally};
pub use topic::{AvailableTopics, Size, Topic};

/// Returns the version of the crate.
pub fn crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
