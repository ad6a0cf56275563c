use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::envelope::{chain_correlation_id, Envelope, MessageContext, Metadata};
use super::{ConsumerOptions, DeliveryMode, ProducerOptions, QueueOptions, Session};
use crate::broker::Broker;
use crate::utils::error::MessagingError;

fn open_session(node_id: &str) -> (Broker, Session) {
    let broker = Broker::new();
    let mut session = Session::new(broker.clone(), node_id);
    session.open().unwrap();
    (broker, session)
}

type CaptureFuture = futures::future::BoxFuture<'static, Result<(), super::HandlerError>>;

/// Captures `(ctx, payload)` pairs handed to a consumer handler.
fn capture_handler(
    tx: mpsc::UnboundedSender<(MessageContext, Value)>,
) -> impl Fn(MessageContext, Value) -> CaptureFuture + Send + Sync + 'static {
    move |ctx, payload| {
        let tx = tx.clone();
        Box::pin(async move {
            tx.send((ctx, payload)).unwrap();
            Ok(())
        })
    }
}

#[test]
fn standard_profiles_match_the_documented_defaults() {
    let queue = QueueOptions::default();
    assert!(queue.durable);
    assert!(!queue.auto_delete);
    assert!(!queue.exclusive);
    assert!(!queue.no_wait);
    assert!(queue.arguments.is_none());

    let consumer = ConsumerOptions::default();
    assert!(!consumer.auto_ack);
    assert!(!consumer.exclusive);
    assert!(!consumer.no_local);
    assert!(!consumer.no_wait);

    let producer = ProducerOptions::default();
    assert_eq!(producer.exchange, "");
    assert!(!producer.mandatory);
    assert!(!producer.immediate);
    assert_eq!(producer.delivery_mode, DeliveryMode::Persistent);
}

#[test]
fn envelope_wire_shape_round_trips() {
    let envelope = Envelope {
        metadata: Metadata {
            correlation_id: "gateway[movie-create-abc]".to_string(),
        },
        data: json!({"title": "Dune", "year": "2021"}),
    };
    let wire = serde_json::to_value(&envelope).unwrap();
    assert_eq!(
        wire,
        json!({
            "metadata": {"correlationId": "gateway[movie-create-abc]"},
            "data": {"title": "Dune", "year": "2021"}
        })
    );

    let decoded: Envelope = serde_json::from_value(wire).unwrap();
    assert_eq!(decoded.metadata, envelope.metadata);
    assert_eq!(decoded.data, envelope.data);
}

#[test]
fn fresh_chains_start_with_the_node_segment() {
    let id = chain_correlation_id(None, "gateway", "movie-create");
    assert!(id.starts_with("gateway[movie-create-"));
    assert!(id.ends_with(']'));
}

#[test]
fn chained_ids_keep_the_parent_as_prefix() {
    let parent = chain_correlation_id(None, "gateway", "movie-create");
    let child = chain_correlation_id(Some(&parent), "catalog", "movie-delete");
    assert!(child.starts_with(&format!("{parent}-catalog[movie-delete-")));
    assert_ne!(parent, child);
}

#[tokio::test]
async fn round_trip_delivers_the_payload_structurally_intact() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("movie-create", None, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("movie-create", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    producer
        .send(
            &MessageContext::new(),
            &json!({"title": "Dune", "year": "2021"}),
        )
        .unwrap();

    let (ctx, payload) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, json!({"title": "Dune", "year": "2021"}));
    let metadata = ctx.metadata.unwrap();
    assert!(metadata.correlation_id.starts_with("test-node[movie-create-"));
    // the handler's context carries a fresh id chained onto the inbound one
    let rehydrated = ctx.correlation_id.unwrap();
    assert!(rehydrated.starts_with(&metadata.correlation_id));
    assert_ne!(rehydrated, metadata.correlation_id);
}

#[tokio::test]
async fn id_payloads_decode_as_generic_json_numbers() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("movie-delete", None, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("movie-delete", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    producer
        .send(&MessageContext::new(), &json!({"id": 42}))
        .unwrap();

    let (_ctx, payload) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, json!({"id": 42}));
    assert_eq!(payload["id"].as_f64(), Some(42.0));
}

#[tokio::test]
async fn inbound_correlation_ids_become_chain_prefixes() {
    let (_broker, mut session) = open_session("gateway");
    let (_queue, producer) = session.create_producer("movie-create", None, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("movie-create", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    let parent = "upstream[http-abc123]";
    producer
        .send(&MessageContext::with_correlation_id(parent), &json!(true))
        .unwrap();

    let (ctx, _payload) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let metadata = ctx.metadata.unwrap();
    assert!(metadata
        .correlation_id
        .starts_with("upstream[http-abc123]-gateway[movie-create-"));
    assert!(ctx.correlation_id.unwrap().starts_with(&metadata.correlation_id));
}

#[tokio::test]
async fn publishes_before_registration_are_delivered_after_listen() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("early", None, None).unwrap();
    producer.send(&MessageContext::new(), &json!(1)).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("early", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    let (_ctx, payload) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, json!(1));
}

#[tokio::test]
async fn consumers_registered_between_listen_calls_get_earlier_publishes() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("late", None, None).unwrap();

    // nothing registered yet: this listen starts no loops
    session.listen();
    producer.send(&MessageContext::new(), &json!("queued")).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("late", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    let (_ctx, payload) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, json!("queued"));
}

#[tokio::test]
async fn sequential_publishes_arrive_in_publish_order() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("ordered", None, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("ordered", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    producer.send(&MessageContext::new(), &json!("first")).unwrap();
    producer.send(&MessageContext::new(), &json!("second")).unwrap();

    let (_ctx, first) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let (_ctx, second) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, json!("first"));
    assert_eq!(second, json!("second"));
}

#[tokio::test]
async fn handler_errors_do_not_stop_the_loop() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("flaky", None, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("flaky", None, None, move |_ctx, payload| {
            let tx = tx.clone();
            async move {
                tx.send(payload.clone()).unwrap();
                if payload == json!("poison") {
                    return Err("handler exploded".into());
                }
                Ok(())
            }
        })
        .unwrap();
    session.listen();

    producer.send(&MessageContext::new(), &json!("poison")).unwrap();
    producer.send(&MessageContext::new(), &json!("fine")).unwrap();

    let first = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first, json!("poison"));
    let second = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(second, json!("fine"));
}

#[tokio::test]
async fn undecodable_deliveries_are_discarded_and_the_loop_continues() {
    let (broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("mixed", None, None).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("mixed", None, None, capture_handler(tx))
        .unwrap();
    session.listen();

    // raw bytes that are not an envelope, injected straight at the broker
    let channel = broker.connect().unwrap().channel().unwrap();
    channel
        .publish("mixed", b"not json at all".to_vec(), &ProducerOptions::default())
        .unwrap();
    producer.send(&MessageContext::new(), &json!("valid")).unwrap();

    let (_ctx, payload) = timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload, json!("valid"));
}

#[tokio::test]
async fn non_serializable_payloads_error_without_publishing() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("strict", None, None).unwrap();

    // JSON object keys must be strings; a Vec key cannot serialize
    let mut payload: HashMap<Vec<u8>, u8> = HashMap::new();
    payload.insert(vec![1, 2], 3);
    let err = producer.send(&MessageContext::new(), &payload).unwrap_err();
    assert!(matches!(err, MessagingError::Codec(_)));

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .register_consumer("strict", None, None, capture_handler(tx))
        .unwrap();
    session.listen();
    // nothing was published
    assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
}

#[tokio::test]
async fn sessions_must_be_opened_before_use() {
    let broker = Broker::new();
    let session = Session::new(broker, "test-node");
    let err = session.create_producer("movie-create", None, None).unwrap_err();
    assert!(matches!(err, MessagingError::ConnectionClosed));
}

#[tokio::test]
async fn closing_the_session_is_global_and_idempotent() {
    let (_broker, mut session) = open_session("test-node");
    let (_queue, producer) = session.create_producer("movie-create", None, None).unwrap();

    session.close();
    session.close();
    let err = producer
        .send(&MessageContext::new(), &json!({"title": "Dune", "year": "2021"}))
        .unwrap_err();
    assert!(matches!(err, MessagingError::ConnectionClosed));
}
