//! Bounded-concurrency work queue.
//!
//! Uses the Semaphore + JoinSet + mpsc pattern: a dispatcher task takes a
//! permit per item in input order and spawns the worker; results flow back
//! over a channel to the caller's `on_result`. `run` returns only after every
//! spawned worker has finished.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

/// Shared stop signal. Once set, no further items are scheduled; in-flight
/// work runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a queue run ended.
#[derive(Debug)]
pub struct QueueOutcome<T> {
    /// Items never handed to a worker because the run was cancelled.
    pub unscheduled: Vec<T>,
    /// Workers that panicked (their result was never delivered).
    pub panicked: usize,
}

pub struct TaskQueue {
    concurrency: usize,
    cancel: CancelFlag,
}

impl TaskQueue {
    /// `concurrency` is clamped to at least 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn run<T, R, F, Fut, C>(&self, items: Vec<T>, work: F, mut on_result: C) -> QueueOutcome<T>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        C: FnMut(R),
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel::<R>(self.concurrency * 2);
        let work = Arc::new(work);
        let cancel = self.cancel.clone();

        let dispatcher = tokio::spawn(async move {
            let mut join_set = JoinSet::new();
            let mut pending = items.into_iter();
            let mut unscheduled = Vec::new();

            while let Some(item) = pending.next() {
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    unscheduled.push(item);
                    break;
                };
                if cancel.is_cancelled() {
                    unscheduled.push(item);
                    break;
                }
                let sender = tx.clone();
                let work = Arc::clone(&work);
                join_set.spawn(async move {
                    let out = work(item).await;
                    let _ = sender.send(out).await;
                    drop(permit);
                });
            }
            unscheduled.extend(pending);
            drop(tx);

            let mut panicked = 0usize;
            while let Some(joined) = join_set.join_next().await {
                if let Err(e) = joined {
                    tracing::error!("Worker task failed: {}", e);
                    panicked += 1;
                }
            }
            QueueOutcome {
                unscheduled,
                panicked,
            }
        });

        while let Some(result) = rx.recv().await {
            on_result(result);
        }

        match dispatcher.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Queue dispatcher failed: {}", e);
                QueueOutcome {
                    unscheduled: Vec::new(),
                    panicked: 1,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn every_item_delivered_once() {
        let queue = TaskQueue::new(4);
        let mut seen = Vec::new();
        let outcome = queue
            .run((0..50).collect(), |n: u32| async move { n * 2 }, |r| seen.push(r))
            .await;
        seen.sort();
        assert_eq!(seen, (0..50).map(|n| n * 2).collect::<Vec<_>>());
        assert!(outcome.unscheduled.is_empty());
        assert_eq!(outcome.panicked, 0);
    }

    #[tokio::test]
    async fn sequential_queue_preserves_order() {
        let queue = TaskQueue::new(1);
        let mut seen = Vec::new();
        queue
            .run(vec!["a", "b", "c"], |s: &'static str| async move { s }, |r| seen.push(r))
            .await;
        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn in_flight_never_exceeds_concurrency() {
        tokio::time::pause();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let queue = TaskQueue::new(3);
        let (in_flight_w, peak_w) = (Arc::clone(&in_flight), Arc::clone(&peak));
        queue
            .run(
                (0..20).collect::<Vec<u32>>(),
                move |_| {
                    let in_flight = Arc::clone(&in_flight_w);
                    let peak = Arc::clone(&peak_w);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    }
                },
                |_| {},
            )
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_concurrency_clamped() {
        assert_eq!(TaskQueue::new(0).concurrency(), 1);
    }

    #[tokio::test]
    async fn cancel_stops_scheduling() {
        let queue = TaskQueue::new(1);
        let cancel = queue.cancel_flag();
        let mut seen = Vec::new();
        let outcome = queue
            .run(
                (0..10).collect::<Vec<u32>>(),
                move |n| {
                    let cancel = cancel.clone();
                    async move {
                        if n == 2 {
                            cancel.cancel();
                        }
                        n
                    }
                },
                |n| seen.push(n),
            )
            .await;

        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(outcome.unscheduled, (3..10).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let queue = TaskQueue::new(2).with_cancel(cancel);
        let mut count = 0;
        let outcome = queue
            .run(vec![1, 2, 3], |n: i32| async move { n }, |_| count += 1)
            .await;
        assert_eq!(count, 0);
        assert_eq!(outcome.unscheduled, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn panicking_worker_does_not_stop_others() {
        let queue = TaskQueue::new(2);
        let mut seen = Vec::new();
        let outcome = queue
            .run(
                vec![1, 2, 3, 4],
                |n: i32| async move {
                    if n == 3 {
                        panic!("boom");
                    }
                    n
                },
                |n| seen.push(n),
            )
            .await;
        seen.sort();
        assert_eq!(seen, vec![1, 2, 4]);
        assert_eq!(outcome.panicked, 1);
    }
}
