//! End-to-end runs through the scheduler.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::config::parse_pipeline_str;
use crate::core::Event;
use crate::errors::{FlowbenchError, ProcessingError};
use crate::pipeline::{Pipeline, PipelineBuilder, RetryPolicy, TransformSpec, HARD_FAIL_COUNTER};
use crate::queue::BoundedQueue;
use crate::stages::{AddTotal, ConsoleSink, Identity, OrdersIngest, ValidateOrder};
use crate::testing::{
    assert_counter, assert_no_hard_fail, assert_order_preserved, order_event, CollectingSink,
    DropWhere, RecordingTransform, SharedBuffer, VecSource,
};

fn no_delay(attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_max_attempts(attempts)
        .with_base_delay_s(0.0)
}

#[tokio::test]
async fn test_orders_end_to_end() {
    let output = SharedBuffer::new();
    let mut pipeline = PipelineBuilder::new("orders")
        .capacity(10)
        .source(Box::new(OrdersIngest::new("ingest", 123)))
        .transform(TransformSpec::new("transform", Box::new(AddTotal::new())))
        .sink(Box::new(ConsoleSink::new("sink", 5, output.clone())))
        .build()
        .unwrap();

    let artifact = pipeline.run(100).await.unwrap();
    let metrics = &artifact.metrics;

    assert_counter(metrics, "ingest.out", 100);
    assert_counter(metrics, "transform.out", 100);
    assert_counter(metrics, "sink.in", 100);
    assert_no_hard_fail(metrics);
    assert_eq!(metrics.latency_ms.count, 101);

    let lines = output.lines();
    assert_eq!(lines.len(), 5);
    for line in lines {
        let payload: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert!(payload.get("total").is_some());
    }
}

#[tokio::test]
async fn test_validated_orders_end_to_end() {
    let sink = CollectingSink::new("sink");
    let mut pipeline = PipelineBuilder::new("orders")
        .capacity(4)
        .source(Box::new(OrdersIngest::new("ingest", 7)))
        .transform(TransformSpec::new("add_total", Box::new(AddTotal::new())))
        .transform(TransformSpec::new("validate", Box::new(ValidateOrder::default())))
        .sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    let artifact = pipeline.run(60).await.unwrap();

    assert_counter(&artifact.metrics, "validate.out", 60);
    assert_eq!(sink.received().len(), 60);
    assert_eq!(artifact.config_snapshot, serde_json::json!({}));
}

#[tokio::test]
async fn test_fifo_preserved_through_small_queues() {
    let events: Vec<Event> = (0..50).map(order_event).collect();
    let recorder = RecordingTransform::new();
    let sink = CollectingSink::new("sink");
    let mut pipeline = PipelineBuilder::new("fifo")
        .capacity(1)
        .source(Box::new(VecSource::new("src", events.clone())))
        .transform(TransformSpec::new("a", Box::new(recorder.clone())))
        .transform(TransformSpec::new("b", Box::new(Identity)))
        .transform(TransformSpec::new("c", Box::new(Identity)))
        .sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    pipeline.run(events.len()).await.unwrap();

    assert_order_preserved(&events, &sink.received());
    let sent: Vec<String> = events.iter().map(|e| e.id().to_string()).collect();
    assert_eq!(recorder.seen(), sent);
}

#[tokio::test]
async fn test_source_emits_at_most_max_events() {
    let events: Vec<Event> = (0..20).map(order_event).collect();
    let sink = CollectingSink::new("sink");
    let mut pipeline = PipelineBuilder::new("short")
        .source(Box::new(VecSource::new("src", events.clone())))
        .transform(TransformSpec::new("t", Box::new(Identity)))
        .sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    let artifact = pipeline.run(5).await.unwrap();

    assert_order_preserved(&events[..5], &sink.received());
    assert_counter(&artifact.metrics, "t.out", 5);
}

#[tokio::test]
async fn test_certain_failure_aborts_run() {
    let sink = CollectingSink::new("sink");
    let mut pipeline = PipelineBuilder::new("doomed")
        .capacity(2)
        .source(Box::new(OrdersIngest::new("ingest", 1)))
        .transform(
            TransformSpec::new("flaky", Box::new(Identity))
                .with_retry(no_delay(3))
                .with_fault_injection(1.0, Some(9)),
        )
        .sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    let err = pipeline.run(10).await.unwrap_err();
    let aborted = err.aborted_run().unwrap();

    assert_eq!(aborted.pipeline_name, "doomed");
    assert_counter(&aborted.metrics, "flaky.errors", 3);
    assert_counter(&aborted.metrics, "flaky.retries", 2);
    assert_counter(&aborted.metrics, "flaky.failed", 1);
    assert_counter(&aborted.metrics, HARD_FAIL_COUNTER, 1);
    assert!(sink.received().is_empty());
    assert!(matches!(
        aborted.cause,
        FlowbenchError::ExhaustedRetries {
            attempts: 3,
            source: ProcessingError::Injected(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_validation_failure_aborts_run() {
    let mut pipeline = PipelineBuilder::new("strict")
        .source(Box::new(VecSource::new("src", vec![order_event(1)])))
        .transform(
            TransformSpec::new("validate", Box::new(ValidateOrder::default()))
                .with_retry(no_delay(2)),
        )
        .sink(Box::new(CollectingSink::new("sink")))
        .build()
        .unwrap();

    let err = pipeline.run(1).await.unwrap_err();
    let aborted = err.aborted_run().unwrap();

    assert_counter(&aborted.metrics, "validate.errors", 2);
    assert!(matches!(
        aborted.cause,
        FlowbenchError::ExhaustedRetries {
            source: ProcessingError::Validation(_),
            ..
        }
    ));
}

#[tokio::test]
async fn test_drops_do_not_stall_downstream() {
    let events: Vec<Event> = (0..30).map(order_event).collect();
    let sink = CollectingSink::new("sink");
    let mut pipeline = PipelineBuilder::new("filter")
        .capacity(2)
        .source(Box::new(VecSource::new("src", events.clone())))
        .transform(TransformSpec::new(
            "evens_out",
            Box::new(DropWhere::new(|e: &Event| e.payload()["order_id"].as_u64().is_some_and(|n| n % 2 == 0))),
        ))
        .transform(TransformSpec::new("pass", Box::new(Identity)))
        .sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    let artifact = pipeline.run(events.len()).await.unwrap();

    let odd: Vec<Event> = events.into_iter().skip(1).step_by(2).collect();
    assert_order_preserved(&odd, &sink.received());
    assert_counter(&artifact.metrics, "evens_out.dropped", 15);
    assert_counter(&artifact.metrics, "evens_out.out", 15);
    assert_counter(&artifact.metrics, "pass.out", 15);
}

#[tokio::test]
async fn test_redelivered_events_are_deduplicated() {
    let unique: Vec<Event> = (0..10).map(order_event).collect();
    let mut delivered = unique.clone();
    delivered.extend(unique.iter().take(4).cloned());

    let sink = CollectingSink::new("sink");
    let mut pipeline = PipelineBuilder::new("dedup")
        .capacity(1)
        .source(Box::new(VecSource::new("src", delivered.clone())))
        .transform(TransformSpec::new("t", Box::new(Identity)))
        .sink(Box::new(sink.clone()))
        .build()
        .unwrap();

    let artifact = pipeline.run(delivered.len()).await.unwrap();

    assert_counter(&artifact.metrics, "t.deduped", 4);
    assert_counter(&artifact.metrics, "t.out", 10);
    assert_order_preserved(&unique, &sink.received());
}

#[tokio::test]
async fn test_pipeline_can_run_twice() {
    let events: Vec<Event> = (0..5).map(order_event).collect();
    let mut pipeline = PipelineBuilder::new("again")
        .source(Box::new(VecSource::new("src", events)))
        .transform(TransformSpec::new("t", Box::new(Identity)))
        .sink(Box::new(CollectingSink::new("sink")))
        .build()
        .unwrap();

    let first = pipeline.run(5).await.unwrap();
    let second = pipeline.run(5).await.unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_counter(&second.metrics, "t.out", 5);
    assert_counter(&second.metrics, "t.deduped", 0);
}

#[tokio::test]
async fn test_programmatic_wiring() {
    let queues: Vec<Arc<BoundedQueue>> = (0..2)
        .map(|i| Arc::new(BoundedQueue::new(format!("q{i}"), 3)))
        .collect();
    let stage = crate::pipeline::Stage::new(
        "t",
        Arc::clone(&queues[0]),
        Some(Arc::clone(&queues[1])),
        Box::new(AddTotal::new()),
    );
    let sink = CollectingSink::new("sink");
    let mut pipeline = Pipeline::new(
        "manual",
        Box::new(OrdersIngest::new("ingest", 5)),
        vec![stage],
        Box::new(sink.clone()),
        queues,
    )
    .unwrap();

    pipeline.run(12).await.unwrap();

    assert_eq!(sink.received().len(), 12);
    assert!(pipeline.queues().iter().all(|q| q.size() == 0 && q.unfinished() == 0));
}

#[tokio::test]
async fn test_run_from_yaml() {
    let yaml = "\
name: yaml_orders
queues:
  maxsize: 5
sample_every: 10
stages:
  - type: orders_ingest
    rng_seed: 42
  - type: add_total
  - type: validate_order
    name: validate
  - type: stdout_sink
    limit: 0
";
    let loaded = parse_pipeline_str(yaml).unwrap();
    let mut pipeline = PipelineBuilder::from_config(&loaded.config)
        .unwrap()
        .build()
        .unwrap();

    let artifact = pipeline
        .run(40)
        .await
        .unwrap()
        .with_config_snapshot(loaded.snapshot.clone());

    assert_counter(&artifact.metrics, "orders_ingest.out", 40);
    assert_counter(&artifact.metrics, "add_total.out", 40);
    assert_counter(&artifact.metrics, "validate.out", 40);
    assert_counter(&artifact.metrics, "stdout_sink.in", 40);
    assert!(!artifact.metrics.queue_depth_samples.is_empty());
    assert_eq!(artifact.config_snapshot["name"], "yaml_orders");
}
