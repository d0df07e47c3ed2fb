//! Producer/consumer drivers and the full pipeline run

use conduit_async::{
    consume, produce, produce_with, run_pipeline, BoundedWorkQueue, CancellationToken, CloseGuard,
    PipelineConfig, QueueError, SideStatus, TaskError,
};
use conduit_common::{Error, ErrorKind, LoggingTransformer};
use std::num::NonZeroUsize;
use std::time::Duration;

fn quick_config(items: u64) -> PipelineConfig {
    PipelineConfig {
        capacity: 2,
        items,
        producer_delay_ms: 1,
        consumer_delay_ms: 3,
        fail_on: None,
    }
}

#[tokio::test(start_paused = true)]
async fn pipeline_delivers_every_item_in_order() {
    LoggingTransformer::init_test();
    let cancel = CancellationToken::new();

    let report = run_pipeline(quick_config(10), &cancel).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.produced, 10);
    assert_eq!(report.consumed, (1..=10).collect::<Vec<_>>());
    assert_eq!(report.producer, SideStatus::Completed);
    assert_eq!(report.consumer, SideStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn producer_fault_reaches_consumer_after_buffered_items() {
    let cancel = CancellationToken::new();
    let config = PipelineConfig {
        fail_on: Some(3),
        ..quick_config(10)
    };

    let report = run_pipeline(config, &cancel).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.produced, 2);
    assert_eq!(report.consumed, vec![1, 2]);
    assert_eq!(
        report.producer,
        SideStatus::Faulted("Boom from item 3".to_string())
    );
    assert_eq!(
        report.consumer,
        SideStatus::Faulted("Boom from item 3".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_both_sides() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(400)).await;
        trigger.cancel();
    });

    let report = run_pipeline(PipelineConfig::default(), &cancel).await.unwrap();

    assert_eq!(report.producer, SideStatus::Cancelled);
    assert_eq!(report.consumer, SideStatus::Cancelled);
    assert!(report.consumed.len() < 20);
    let expected: Vec<u64> = (1..=report.consumed.len() as u64).collect();
    assert_eq!(report.consumed, expected);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_counts_only_stored_items() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    // Item 1 goes to the consumer, item 2 fills the queue, item 3 is
    // generated but never accepted.
    let config = PipelineConfig {
        capacity: 1,
        items: 5,
        producer_delay_ms: 0,
        consumer_delay_ms: 1000,
        fail_on: None,
    };
    let report = run_pipeline(config, &cancel).await.unwrap();

    assert_eq!(report.producer, SideStatus::Cancelled);
    assert_eq!(report.consumer, SideStatus::Cancelled);
    assert!(report.consumed.is_empty());
    assert_eq!(report.produced, 2);
}

#[tokio::test]
async fn produce_with_reports_each_stored_item() {
    let queue = BoundedWorkQueue::new(NonZeroUsize::new(1).unwrap());
    let cancel = CancellationToken::new();
    let mut stored = Vec::new();

    let result = produce_with(
        queue.clone(),
        5,
        Duration::ZERO,
        &cancel,
        |i| if i == 3 { Err(Error::other("bad")) } else { Ok(i) },
        |i| stored.push(i),
    );
    // Capacity 1: item 2 waits until the consumer takes item 1.
    let consumer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        async move {
            let mut seen = Vec::new();
            while let Ok(Some(item)) = queue.dequeue(&cancel).await {
                seen.push(item);
            }
            seen
        }
    };
    let (result, seen) = tokio::join!(result, consumer);

    assert!(matches!(result, Err(TaskError::ExecutionFailed(_))));
    assert_eq!(stored, vec![1, 2]);
    assert_eq!(seen, vec![1, 2]);
}

#[tokio::test]
async fn zero_capacity_is_rejected() {
    let cancel = CancellationToken::new();
    let config = PipelineConfig {
        capacity: 0,
        ..PipelineConfig::default()
    };

    assert_eq!(config.validate().unwrap_err().kind(), &ErrorKind::Validation);
    let error = run_pipeline(config, &cancel).await.unwrap_err();
    assert_eq!(error.kind(), &ErrorKind::Validation);
}

#[test]
fn config_defaults_match_the_documented_knobs() {
    let config: PipelineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert_eq!(config.capacity, 5);
    assert_eq!(config.items, 20);
    assert_eq!(config.producer_delay(), Duration::from_millis(50));
    assert_eq!(config.consumer_delay(), Duration::from_millis(150));
    assert_eq!(config.fail_on, None);

    let partial: PipelineConfig = serde_json::from_str(r#"{"capacity": 2, "fail_on": 4}"#).unwrap();
    assert_eq!(partial.capacity, 2);
    assert_eq!(partial.items, 20);
    assert_eq!(partial.fail_on, Some(4));
}

#[tokio::test(start_paused = true)]
async fn report_serializes_statuses() {
    let cancel = CancellationToken::new();
    let report = run_pipeline(quick_config(1), &cancel).await.unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["producer"]["status"], "completed");
    assert_eq!(json["consumer"]["status"], "completed");
    assert_eq!(json["consumed"], serde_json::json!([1]));
    assert_eq!(json["config"]["capacity"], 2);
}

#[tokio::test]
async fn produce_closes_the_queue_when_done() {
    let queue = BoundedWorkQueue::new(NonZeroUsize::new(4).unwrap());
    let cancel = CancellationToken::new();

    let produced = produce(queue.clone(), 3, Duration::ZERO, &cancel, |i| Ok(i * 10))
        .await
        .unwrap();

    assert_eq!(produced, 3);
    assert!(queue.is_closed());

    let mut seen = Vec::new();
    let consumed = consume(queue, Duration::ZERO, &cancel, |item| seen.push(item))
        .await
        .unwrap();
    assert_eq!(consumed, 3);
    assert_eq!(seen, vec![10, 20, 30]);
}

#[tokio::test]
async fn produce_reports_work_fault_and_closes_with_it() {
    let queue = BoundedWorkQueue::new(NonZeroUsize::new(4).unwrap());
    let cancel = CancellationToken::new();

    let result = produce(queue.clone(), 5, Duration::ZERO, &cancel, |i| {
        if i == 2 {
            Err(Error::other("bad input"))
        } else {
            Ok(i)
        }
    })
    .await;

    match result {
        Err(TaskError::ExecutionFailed(fault)) => assert_eq!(fault.to_string(), "bad input"),
        other => panic!("expected execution failure, got {other:?}"),
    }

    let consumed = consume(queue, Duration::ZERO, &cancel, |_| {}).await;
    match consumed {
        Err(TaskError::Queue(QueueError::UpstreamFault(fault))) => {
            assert_eq!(fault.to_string(), "bad input");
        }
        other => panic!("expected upstream fault, got {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_producer_closes_with_cancellation_fault() {
    let queue = BoundedWorkQueue::new(NonZeroUsize::new(1).unwrap());
    let cancel = CancellationToken::new();

    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { produce(queue, 5, Duration::ZERO, &cancel, Ok).await })
    };

    // The second item blocks on the full queue until cancellation.
    while queue.len() < 1 {
        tokio::task::yield_now().await;
    }
    cancel.cancel();

    let result = producer.await.unwrap();
    assert!(matches!(result, Err(TaskError::Cancelled)));
    assert!(queue.is_closed());

    let live = CancellationToken::new();
    assert_eq!(queue.dequeue(&live).await.unwrap(), Some(1));
    match queue.dequeue(&live).await {
        Err(QueueError::UpstreamFault(fault)) => assert!(fault.is_cancelled()),
        other => panic!("expected cancellation fault, got {other:?}"),
    }
}

#[tokio::test]
async fn aborted_producer_still_closes_the_queue() {
    let queue = BoundedWorkQueue::new(NonZeroUsize::new(1).unwrap());
    let cancel = CancellationToken::new();

    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { produce(queue, 5, Duration::ZERO, &cancel, Ok).await })
    };

    while queue.len() < 1 {
        tokio::task::yield_now().await;
    }
    producer.abort();
    assert!(producer.await.unwrap_err().is_cancelled());

    assert!(queue.is_closed());
    assert_eq!(queue.dequeue(&cancel).await.unwrap(), Some(1));
    match queue.dequeue(&cancel).await {
        Err(QueueError::UpstreamFault(fault)) => assert_eq!(fault.kind(), &ErrorKind::Internal),
        other => panic!("expected guard fault, got {other:?}"),
    }
}

#[tokio::test]
async fn panicking_producer_does_not_strand_the_consumer() {
    let queue = BoundedWorkQueue::new(NonZeroUsize::new(4).unwrap());
    let cancel = CancellationToken::new();

    let producer = {
        let queue = queue.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            produce(queue, 5, Duration::ZERO, &cancel, |i| {
                assert!(i < 2, "work function exploded");
                Ok(i)
            })
            .await
        })
    };
    assert!(producer.await.unwrap_err().is_panic());

    let mut seen = Vec::new();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        consume(queue, Duration::ZERO, &cancel, |item| seen.push(item)),
    )
    .await
    .expect("consumer must not wait on an unclosed queue");

    assert_eq!(seen, vec![1]);
    match result {
        Err(TaskError::Queue(QueueError::UpstreamFault(fault))) => {
            assert_eq!(fault.kind(), &ErrorKind::Internal);
        }
        other => panic!("expected guard fault, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_close_disarms_the_guard() {
    let queue = BoundedWorkQueue::<u64>::new(NonZeroUsize::new(1).unwrap());
    let guard = CloseGuard::new(queue.clone());
    assert!(guard.close(None));
    assert!(queue.is_closed());

    // A later guard cannot overwrite the clean close with a fault.
    drop(CloseGuard::new(queue.clone()));

    let cancel = CancellationToken::new();
    assert_eq!(queue.dequeue(&cancel).await.unwrap(), None);
}

#[tokio::test]
async fn dropped_guard_closes_with_a_fault() {
    let queue = BoundedWorkQueue::<u64>::new(NonZeroUsize::new(1).unwrap());
    drop(CloseGuard::new(queue.clone()));

    let cancel = CancellationToken::new();
    assert!(matches!(
        queue.dequeue(&cancel).await,
        Err(QueueError::UpstreamFault(_))
    ));
}
