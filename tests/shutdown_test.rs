//! End-to-end shutdown scenarios driven through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use graceful_shutdown::{
    close_all, wait_until, wait_with_trigger, ClosePolicy, StopContext, StopError,
    TerminateSignal, WaitGroup,
};

mod common;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_close_runs_ten_callbacks_once() {
    let (signal, counter) = common::counting_signal(10);

    let first = WaitGroup::new();
    let second = WaitGroup::new();
    first.add(1);
    second.add(1);

    let a = {
        let signal = signal.clone();
        let first = first.clone();
        tokio::spawn(async move { signal.close(Some(&first)).await })
    };
    let b = {
        let signal = signal.clone();
        let second = second.clone();
        tokio::spawn(async move { signal.close(Some(&second)).await })
    };
    a.await.unwrap();
    b.await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        first.wait().await;
        second.wait().await;
    })
    .await
    .expect("both completion handles should be signalled");

    assert_eq!(counter.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sync_policy_closes_entities_in_order() {
    let recorder = common::Recorder::default();
    let signals: Vec<TerminateSignal> = (1..=3)
        .map(|i| {
            let signal = TerminateSignal::new().named(format!("entity-{i}"));
            recorder.register_span(&signal, &format!("entity-{i}"), Duration::from_millis(30));
            signal
        })
        .collect();

    wait_with_trigger(async {}, ClosePolicy::Sync, &signals).await;

    assert_eq!(
        recorder.events(),
        vec![
            "entity-1:start",
            "entity-1:end",
            "entity-2:start",
            "entity-2:end",
            "entity-3:start",
            "entity-3:end",
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_timeout_alone_does_not_close() {
    let signal = TerminateSignal::with_timeout(Some(Duration::from_millis(500)));
    let counter = Arc::new(AtomicUsize::new(0));
    let c = counter.clone();
    signal.register_callback(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(signal.stop_context().err(), None);

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(signal.stop_context().err(), Some(StopError::DeadlineExceeded));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(!signal.is_closed());
}

#[tokio::test]
async fn test_zero_entities_return_promptly() {
    let started = Instant::now();
    wait_with_trigger(async {}, ClosePolicy::Async, &[]).await;
    wait_with_trigger(async {}, ClosePolicy::ForceSync, &[]).await;
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_policy_closes_entities_concurrently() {
    let signals: Vec<TerminateSignal> = (0..4)
        .map(|_| {
            let signal = TerminateSignal::new();
            signal.register_callback(|| std::thread::sleep(Duration::from_millis(200)));
            signal
        })
        .collect();

    let started = Instant::now();
    close_all(ClosePolicy::Async, &signals).await;

    // Sequential closing would take at least 800ms.
    assert!(started.elapsed() < Duration::from_millis(700));
    assert!(signals.iter().all(TerminateSignal::is_closed));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_external_context_drives_shutdown() {
    let (parent, trigger) = StopContext::with_cancel(&StopContext::background());
    let (signal, counter) = common::counting_signal(3);
    let child = TerminateSignal::with_context(&parent, None);
    let child_ctx = child.stop_context();

    let signals = vec![signal.clone(), child.clone()];
    let orchestrator = tokio::spawn(async move {
        wait_until(&parent, ClosePolicy::ForceSync, &signals).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!signal.is_closed());

    trigger.cancel();
    orchestrator.await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(child_ctx.err(), Some(StopError::Canceled));
    assert!(child.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_context_seen_by_worker_loop() {
    let signal = TerminateSignal::new();
    let stop = signal.stop_context();
    let worker = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(5)) => {}
                _ = stop.cancelled() => break stop.err(),
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(30)).await;
    signal.close(None).await;

    let reason = tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("worker should observe cancellation")
        .unwrap();
    assert_eq!(reason, Some(StopError::Canceled));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_abandoned_by_timeout_completes_on_retry() {
    let signal = TerminateSignal::new();
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let counter = counter.clone();
        signal.register_callback(move || {
            std::thread::sleep(Duration::from_millis(100));
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
    let signals = vec![signal.clone()];

    let first = tokio::time::timeout(
        Duration::from_millis(20),
        close_all(ClosePolicy::ForceSync, &signals),
    )
    .await;
    assert!(first.is_err());

    tokio::time::timeout(Duration::from_secs(2), close_all(ClosePolicy::Async, &signals))
        .await
        .expect("retried shutdown should return once the first pass drains");

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert!(signal.stop_context().is_cancelled());
}
