//! Full sessions between two drivers.

use arbitrary::{Arbitrary, Unstructured};
use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use symbiote::{
    catalog,
    channel::{memory, tcp::Tcp, Channel},
    message::{First, Generating, Second},
    property::{Equality, Property},
    Abort, AvailableTopics, BinaryEncoding, Config, Driver, Encoding, JsonEncoding, Policy,
    Registry, Report, Size, Tally, Topic, TopicCodec,
};
use test_case::test_case;
use tokio::net::TcpListener;

/// Reports equality backwards.
struct Contrary;

impl Property<i32> for Contrary {
    type Operation = i32;
    type Output = bool;

    fn operation(&self, _: &i32, u: &mut Unstructured<'_>) -> arbitrary::Result<i32> {
        i32::arbitrary(u)
    }

    fn perform(&self, value: &i32, operation: &i32) -> bool {
        value != operation
    }
}

fn int32<E: Encoding>() -> Registry<E> {
    let mut registry = Registry::new();
    registry.register("Int32", TopicCodec::<i32, _>::new(Size::from(4u16), Equality));
    registry
}

fn contrary<E: Encoding>() -> Registry<E> {
    let mut registry = Registry::new();
    registry.register("Int32", TopicCodec::<i32, _>::new(Size::from(4u16), Contrary));
    registry
}

async fn run<E: Encoding>(
    first: Registry<E>,
    second: Registry<E>,
    config: Config,
) -> (Report, Report) {
    let first = Driver::new(Arc::new(first), config.clone());
    let second = Driver::new(Arc::new(second), config.clone());
    let (a, b) = memory::pair(config.mailbox_size);
    tokio::join!(first.first(a), second.second(b))
}

fn assert_all_passed(report: &Report, expected_topics: usize) {
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.topics.len(), expected_topics);
    assert!(report.topics.values().all(|tally| tally.passed > 0));
}

#[test_case(Policy::PerTopic; "per topic")]
#[test_case(Policy::PerTrial; "per trial")]
#[test_case(Policy::Never; "never")]
#[tokio::test]
async fn test_binary_catalog(policy: Policy) {
    let mut config = Config::test(7);
    config.policy = policy;
    let (first, second) = run::<BinaryEncoding>(catalog::registry(), catalog::registry(), config)
        .await;
    assert_all_passed(&first, 17);
    assert_all_passed(&second, 17);
    assert_eq!(first.encoding, "binary");
}

#[test_case(Policy::PerTopic; "per topic")]
#[test_case(Policy::PerTrial; "per trial")]
#[test_case(Policy::Never; "never")]
#[tokio::test]
async fn test_json_catalog(policy: Policy) {
    let mut config = Config::test(11);
    config.policy = policy;
    let (first, second) =
        run::<JsonEncoding>(catalog::registry(), catalog::registry(), config).await;
    assert_all_passed(&first, 17);
    assert_all_passed(&second, 17);
    assert_eq!(second.encoding, "json");
}

#[tokio::test]
async fn test_trial_counts() {
    let config = Config::test(3);
    let (first, second) =
        run::<BinaryEncoding>(catalog::registry(), catalog::registry(), config).await;

    // Both peers generate `trials` values and operate on the other's.
    let expected = Tally {
        passed: 16,
        failed: 0,
        aborted: 0,
    };
    assert_eq!(first.topics[&Topic::from("Int32")], expected);
    assert_eq!(second.topics[&Topic::from("Int32")], expected);

    // Unit has a single inhabitant.
    let unit = Tally {
        passed: 2,
        failed: 0,
        aborted: 0,
    };
    assert_eq!(first.topics[&Topic::from("Unit")], unit);
    assert_eq!(second.topics[&Topic::from("Unit")], unit);
}

#[tokio::test]
async fn test_never_policy_counts() {
    let mut config = Config::test(3);
    config.policy = Policy::Never;
    let (first, second) = run::<BinaryEncoding>(int32(), int32(), config).await;
    let expected = Tally {
        passed: 8,
        failed: 0,
        aborted: 0,
    };
    assert_eq!(first.topics[&Topic::from("Int32")], expected);
    assert_eq!(second.topics[&Topic::from("Int32")], expected);
}

#[tokio::test]
async fn test_negotiates_shared_topics() {
    let mut first = int32::<BinaryEncoding>();
    first.register(
        "String8",
        TopicCodec::<symbiote_codec::String8, _>::new(Size::from(1u16), Equality),
    );
    let (first, second) = run(first, catalog::registry(), Config::test(5)).await;
    for report in [&first, &second] {
        assert!(report.is_success());
        let topics: Vec<_> = report.topics.keys().map(Topic::as_str).collect();
        assert_eq!(topics, ["Int32", "String8"]);
    }
}

#[tokio::test]
async fn test_disjoint_topics() {
    let mut second = Registry::<JsonEncoding>::new();
    second.register(
        "Boolean",
        TopicCodec::<bool, _>::new(Size::from(1u16), Equality),
    );
    let (first, second) = run(int32(), second, Config::test(0)).await;

    let expected: AvailableTopics = [(Topic::from("Boolean"), Size::from(1u16))]
        .into_iter()
        .collect();
    assert_eq!(first.abort, Some(Abort::BadTopics(expected.clone())));
    assert_eq!(second.abort, Some(Abort::BadTopics(expected)));
    assert!(first.topics.is_empty());
    assert!(second.topics.is_empty());
}

#[tokio::test]
async fn test_size_mismatch() {
    let mut second = Registry::<BinaryEncoding>::new();
    second.register("Int32", TopicCodec::<i64, _>::new(Size::from(8u16), Equality));
    let (first, _) = run(int32(), second, Config::test(0)).await;

    let expected: AvailableTopics = [(Topic::from("Int32"), Size::from(8u16))]
        .into_iter()
        .collect();
    assert_eq!(first.abort, Some(Abort::BadTopics(expected)));
}

#[tokio::test]
async fn test_wrong_results_fail_trials() {
    let (first, second) = run::<BinaryEncoding>(int32(), contrary(), Config::test(9)).await;

    // Every trial in both directions disagrees, but the session still completes.
    let expected = Tally {
        passed: 0,
        failed: 16,
        aborted: 0,
    };
    for report in [&first, &second] {
        assert_eq!(report.abort, None);
        assert_eq!(report.topics[&Topic::from("Int32")], expected);
        assert!(!report.is_success());
    }
}

#[tokio::test]
async fn test_max_failures_aborts() {
    let mut config = Config::test(9);
    config.max_failures = Some(0);
    let (first, second) = run::<JsonEncoding>(int32(), contrary(), config).await;

    let topic = Topic::from("Int32");
    assert_eq!(
        first.abort,
        Some(Abort::TooManyFailures {
            topic: topic.clone()
        })
    );
    assert_eq!(first.topics[&topic].failed, 1);
    assert!(second.abort.is_some());
    assert_eq!(second.topics[&topic].passed, 0);
}

#[tokio::test]
async fn test_silent_peer_times_out() {
    let mut config = Config::test(0);
    config.timeout = Duration::from_millis(100);
    let driver = Driver::<BinaryEncoding>::new(Arc::new(catalog::registry()), config.clone());

    let (a, _silent) = memory::pair(config.mailbox_size);
    let report = driver.first(a).await;
    assert_eq!(report.abort, Some(Abort::Timeout { topic: None }));
    assert!(report.topics.is_empty());
}

#[tokio::test]
async fn test_silent_peer_times_out_mid_trial() {
    let mut config = Config::test(0);
    config.timeout = Duration::from_millis(100);
    let driver = Driver::<BinaryEncoding>::new(Arc::new(catalog::registry()), config.clone());
    let (a, mut peer) = memory::pair::<Bytes>(config.mailbox_size);
    let handle = tokio::spawn(async move { driver.first(a).await });

    // Start Int32, take one trial, and never answer it.
    let topics = peer.recv().await.unwrap();
    assert!(matches!(
        BinaryEncoding::decode::<First<Bytes>>(&topics).unwrap(),
        First::Topics(_)
    ));
    let start = Second::<Bytes>::Start([Topic::from("Int32")].into_iter().collect());
    peer.send(BinaryEncoding::encode(&start)).await.unwrap();
    let generated = peer.recv().await.unwrap();
    assert!(matches!(
        BinaryEncoding::decode::<First<Bytes>>(&generated).unwrap(),
        First::FirstGenerating {
            generating: Generating::Generated { .. },
            ..
        }
    ));

    let report = handle.await.unwrap();
    let topic = Topic::from("Int32");
    assert_eq!(
        report.abort,
        Some(Abort::Timeout {
            topic: Some(topic.clone())
        })
    );
    assert_eq!(
        report.topics[&topic],
        Tally {
            passed: 0,
            failed: 1,
            aborted: 0,
        }
    );
    drop(peer);
}

async fn tcp<E: Encoding>(seed: u64) -> (Report, Report) {
    let mut config = Config::test(seed);
    config.max_message_size = 1024 * 1024;
    let driver = Driver::<E>::new(Arc::new(catalog::registry()), config.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = {
        let driver = driver.clone();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            driver
                .second(Tcp::<E>::new(stream, driver.config().max_message_size))
                .await
        })
    };
    let channel = Tcp::<E>::connect(addr, config.max_message_size)
        .await
        .unwrap();
    let first = driver.first(channel).await;
    (first, server.await.unwrap())
}

#[tokio::test]
async fn test_tcp_binary() {
    let (first, second) = tcp::<BinaryEncoding>(21).await;
    assert_all_passed(&first, 17);
    assert_all_passed(&second, 17);
}

#[tokio::test]
async fn test_tcp_json() {
    let (first, second) = tcp::<JsonEncoding>(22).await;
    assert_all_passed(&first, 17);
    assert_all_passed(&second, 17);
}
