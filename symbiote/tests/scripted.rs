//! Sessions against a hand-driven peer.

use bytes::Bytes;
use serde_json::{json, Value};
use std::{collections::BTreeSet, sync::Arc};
use symbiote::{
    catalog,
    channel::{memory, Channel},
    message::{First, Generating, Operating, Second},
    Abort, AvailableTopics, BinaryEncoding, Config, Driver, Encoding, JsonEncoding, Report, Size,
    Tally, Topic,
};
use tokio::task::JoinHandle;

fn advertise(topics: &[(&str, u16)]) -> AvailableTopics {
    topics
        .iter()
        .map(|(topic, size)| (Topic::from(*topic), Size::from(*size)))
        .collect()
}

/// A First peer driven step by step from the test.
struct Script<E: Encoding> {
    channel: memory::Endpoint<E::Payload>,
}

impl<E: Encoding> Script<E> {
    async fn send(&mut self, message: First<E::Payload>) {
        self.channel.send(E::encode(&message)).await.unwrap();
    }

    async fn recv(&mut self) -> Second<E::Payload> {
        let payload = self.channel.recv().await.unwrap();
        E::decode(&payload).unwrap()
    }

    async fn generate(&mut self, topic: &str, generating: Generating<E::Payload>) {
        self.send(First::FirstGenerating {
            topic: Topic::from(topic),
            generating,
        })
        .await;
    }

    /// Advertises `topics` and returns the set Second starts.
    async fn open(&mut self, topics: &[(&str, u16)]) -> BTreeSet<Topic> {
        self.send(First::Topics(advertise(topics))).await;
        match self.recv().await {
            Second::Start(topics) => topics,
            other => panic!("unexpected reply: {other:?}"),
        }
    }
}

/// Starts a Second session against the reference catalog and returns the scripted First.
fn second<E: Encoding>(config: Config) -> (Script<E>, JoinHandle<Report>) {
    let driver = Driver::<E>::new(Arc::new(catalog::registry()), config.clone());
    let (script, channel) = memory::pair(config.mailbox_size);
    let handle = tokio::spawn(async move { driver.second(channel).await });
    (Script { channel: script }, handle)
}

/// A Second peer driven step by step from the test.
struct Responder<E: Encoding> {
    channel: memory::Endpoint<E::Payload>,
}

impl<E: Encoding> Responder<E> {
    async fn send(&mut self, message: Second<E::Payload>) {
        self.channel.send(E::encode(&message)).await.unwrap();
    }

    async fn recv(&mut self) -> First<E::Payload> {
        let payload = self.channel.recv().await.unwrap();
        E::decode(&payload).unwrap()
    }

    /// Waits for First to advertise, then starts `topics`.
    async fn start(&mut self, topics: &[&str]) {
        match self.recv().await {
            First::Topics(_) => {}
            other => panic!("unexpected message: {other:?}"),
        }
        let start = topics.iter().copied().map(Topic::from).collect();
        self.send(Second::Start(start)).await;
    }

    /// Receives the next trial First generates for `topic`.
    async fn generated(&mut self, topic: &str) -> (E::Payload, E::Payload) {
        match self.recv().await {
            First::FirstGenerating {
                topic: received,
                generating: Generating::Generated { value, operation },
            } if received.as_str() == topic => (value, operation),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

/// Starts a First session against the reference catalog and returns the scripted Second.
fn first<E: Encoding>(config: Config) -> (Responder<E>, JoinHandle<Report>) {
    let driver = Driver::<E>::new(Arc::new(catalog::registry()), config.clone());
    let (responder, channel) = memory::pair(config.mailbox_size);
    let handle = tokio::spawn(async move { driver.first(channel).await });
    (Responder { channel: responder }, handle)
}

fn int32<E: Encoding>(value: i32) -> E::Payload {
    E::encode(&value)
}

#[tokio::test]
async fn test_start_is_intersection() {
    let (mut script, handle) = second::<BinaryEncoding>(Config::test(0));
    let started = script
        .open(&[("Int32", 4), ("String8", 1), ("Decimal", 16)])
        .await;
    let expected: BTreeSet<Topic> = ["Int32", "String8"].into_iter().map(Topic::from).collect();
    assert_eq!(started, expected);

    script.generate("Int32", Generating::ImFinished).await;
    script.generate("String8", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.topics.len(), 2);
}

#[tokio::test]
async fn test_operates_on_generated_value() {
    let (mut script, handle) = second::<BinaryEncoding>(Config::test(0));
    script.open(&[("Int32", 4)]).await;

    script
        .generate(
            "Int32",
            Generating::Generated {
                value: int32::<BinaryEncoding>(42),
                operation: int32::<BinaryEncoding>(42),
            },
        )
        .await;
    let reply = script.recv().await;
    assert_eq!(
        reply,
        Second::SecondOperating(Operating::Operated(Bytes::from_static(&[1])))
    );

    // Finishing mid-topic settles the trial and ends the topic.
    script.generate("Int32", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert_eq!(report.abort, None);
    assert_eq!(
        report.topics[&Topic::from("Int32")],
        Tally {
            passed: 1,
            failed: 0,
            aborted: 0,
        }
    );
}

#[tokio::test]
async fn test_truncated_value() {
    let (mut script, handle) = second::<BinaryEncoding>(Config::test(0));
    script.open(&[("Int32", 4)]).await;

    let truncated = Bytes::from_static(&[0x00, 0x2A]);
    script
        .generate(
            "Int32",
            Generating::Generated {
                value: truncated.clone(),
                operation: int32::<BinaryEncoding>(42),
            },
        )
        .await;
    assert_eq!(
        script.recv().await,
        Second::SecondOperating(Operating::NoParseValue(truncated))
    );

    script.generate("Int32", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert_eq!(report.abort, None);
    assert_eq!(report.topics[&Topic::from("Int32")].failed, 1);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_unparseable_json_operation() {
    let (mut script, handle) = second::<JsonEncoding>(Config::test(0));
    script.open(&[("Int32", 4)]).await;

    let operation = json!("forty-two");
    script
        .generate(
            "Int32",
            Generating::Generated {
                value: json!(42),
                operation: operation.clone(),
            },
        )
        .await;
    assert_eq!(
        script.recv().await,
        Second::SecondOperating(Operating::NoParseOperation(operation))
    );

    script.generate("Int32", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert_eq!(report.topics[&Topic::from("Int32")].failed, 1);
}

#[tokio::test]
async fn test_bad_result_fails_provisional_pass() {
    let (mut script, handle) = second::<JsonEncoding>(Config::test(0));
    script.open(&[("Int32", 4)]).await;

    script
        .generate(
            "Int32",
            Generating::Generated {
                value: json!(1),
                operation: json!(2),
            },
        )
        .await;
    let output = match script.recv().await {
        Second::SecondOperating(Operating::Operated(output)) => output,
        other => panic!("unexpected reply: {other:?}"),
    };
    assert_eq!(output, Value::Bool(false));

    // Claim the answer was wrong.
    script
        .generate("Int32", Generating::BadResult(output))
        .await;
    script.generate("Int32", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert_eq!(
        report.topics[&Topic::from("Int32")],
        Tally {
            passed: 0,
            failed: 1,
            aborted: 0,
        }
    );
}

#[tokio::test]
async fn test_unparseable_output_fails_provisional_pass() {
    let (mut script, handle) = second::<BinaryEncoding>(Config::test(0));
    script.open(&[("Int32", 4)]).await;

    script
        .generate(
            "Int32",
            Generating::Generated {
                value: int32::<BinaryEncoding>(5),
                operation: int32::<BinaryEncoding>(5),
            },
        )
        .await;
    let output = match script.recv().await {
        Second::SecondOperating(Operating::Operated(output)) => output,
        other => panic!("unexpected reply: {other:?}"),
    };

    // Claim the answer could not be read.
    script
        .generate("Int32", Generating::NoParseOperated(output))
        .await;
    script.generate("Int32", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert_eq!(report.abort, None);
    assert_eq!(
        report.topics[&Topic::from("Int32")],
        Tally {
            passed: 0,
            failed: 1,
            aborted: 0,
        }
    );
}

#[tokio::test]
async fn test_unparseable_output_is_reported() {
    let (mut peer, handle) = first::<JsonEncoding>(Config::test(0));
    peer.start(&["Int32"]).await;
    peer.generated("Int32").await;

    // Int32 results are booleans.
    peer.send(Second::SecondOperating(Operating::Operated(json!(
        "garbage"
    ))))
    .await;
    assert_eq!(
        peer.recv().await,
        First::FirstGenerating {
            topic: Topic::from("Int32"),
            generating: Generating::NoParseOperated(json!("garbage")),
        }
    );

    // First moves on to its next trial.
    peer.generated("Int32").await;
    peer.send(Second::SecondGenerating(Generating::ImFinished))
        .await;
    let report = handle.await.unwrap();
    assert_eq!(report.abort, None);
    assert_eq!(
        report.topics[&Topic::from("Int32")],
        Tally {
            passed: 0,
            failed: 1,
            aborted: 1,
        }
    );
}

#[tokio::test]
async fn test_finished_while_operating() {
    let (mut peer, handle) = first::<BinaryEncoding>(Config::test(0));
    peer.start(&["Int32", "Uint32"]).await;

    // Leave the trial unanswered and end the topic.
    peer.generated("Int32").await;
    peer.send(Second::SecondGenerating(Generating::ImFinished))
        .await;

    // First carries on with the next topic.
    peer.generated("Uint32").await;
    peer.send(Second::SecondGenerating(Generating::ImFinished))
        .await;

    let report = handle.await.unwrap();
    assert_eq!(report.abort, None);
    let unanswered = Tally {
        passed: 0,
        failed: 0,
        aborted: 1,
    };
    assert_eq!(report.topics[&Topic::from("Int32")], unanswered);
    assert_eq!(report.topics[&Topic::from("Uint32")], unanswered);
    assert!(!report.is_success());
}

#[tokio::test]
async fn test_takes_turn_as_generator() {
    let mut config = Config::test(0);
    config.trials = 2;
    let (mut script, handle) = second::<BinaryEncoding>(config);
    script.open(&[("Boolean", 1)]).await;
    script.generate("Boolean", Generating::YourTurn).await;

    // Boolean has two inhabitants, so Second generates twice before finishing.
    for _ in 0..2 {
        let (value, operation) = match script.recv().await {
            Second::SecondGenerating(Generating::Generated { value, operation }) => {
                (value, operation)
            }
            other => panic!("unexpected reply: {other:?}"),
        };
        let value = BinaryEncoding::decode::<bool>(&value).unwrap();
        let operation = BinaryEncoding::decode::<bool>(&operation).unwrap();
        let output = <BinaryEncoding as Encoding>::encode(&(value == operation));
        script
            .send(First::FirstOperating {
                topic: Topic::from("Boolean"),
                operating: Operating::Operated(output),
            })
            .await;
    }
    assert_eq!(
        script.recv().await,
        Second::SecondGenerating(Generating::ImFinished)
    );

    let report = handle.await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.topics[&Topic::from("Boolean")].passed, 2);
}

#[tokio::test]
async fn test_wrong_topic_aborts() {
    let (mut script, handle) = second::<BinaryEncoding>(Config::test(0));
    script.open(&[("Int32", 4), ("Uint8", 1)]).await;

    // Int32 sorts first, so Uint8 is out of turn.
    script.generate("Uint8", Generating::ImFinished).await;
    let report = handle.await.unwrap();
    assert_eq!(
        report.abort,
        Some(Abort::UnexpectedMessage("firstGenerating"))
    );
}

#[tokio::test]
async fn test_closed_channel_aborts() {
    let (mut script, handle) = second::<BinaryEncoding>(Config::test(0));
    script.open(&[("Int32", 4)]).await;
    script
        .generate(
            "Int32",
            Generating::Generated {
                value: int32::<BinaryEncoding>(7),
                operation: int32::<BinaryEncoding>(8),
            },
        )
        .await;
    script.recv().await;
    script.channel.close().await;

    // The reply was never judged, so it cannot count as passed.
    let report = handle.await.unwrap();
    assert!(matches!(report.abort, Some(Abort::Channel(_))));
    assert_eq!(
        report.topics[&Topic::from("Int32")],
        Tally {
            passed: 0,
            failed: 0,
            aborted: 1,
        }
    );
}

#[tokio::test]
async fn test_start_outside_topics() {
    let config = Config::test(0);
    let driver = Driver::<JsonEncoding>::new(Arc::new(catalog::registry()), config.clone());
    let (mut peer, channel) = memory::pair::<Value>(config.mailbox_size);
    let handle = tokio::spawn(async move { driver.first(channel).await });

    let topics = peer.recv().await.unwrap();
    assert!(topics.get("topics").is_some());

    // Ask for a topic First never advertised.
    let start = Second::<Value>::Start([Topic::from("Decimal")].into_iter().collect());
    peer.send(JsonEncoding::encode(&start)).await.unwrap();
    assert_eq!(peer.recv().await.unwrap(), json!("badStartSubset"));

    let report = handle.await.unwrap();
    assert_eq!(report.abort, Some(Abort::BadStartSubset));
}
