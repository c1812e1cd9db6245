// Copyright (c) Microsoft Corporation.

//! The background refresh pipeline.
//!
//! A bounded queue of keys, a fixed pool of worker tasks, and a set of keys
//! currently queued or being refreshed. Producers hand keys over with a
//! non-blocking send; when the queue is full the request is dropped rather
//! than blocking the caller.

use std::{collections::HashSet, hash::Hash, sync::Arc};

use parking_lot::Mutex;
use tokio::{
    sync::{Mutex as AsyncMutex, mpsc},
    task::JoinHandle,
};

/// Outcome of [`RefreshPipeline::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Schedule {
    /// The key was handed to the queue.
    Queued,
    /// A refresh for the key is already queued or being processed.
    AlreadyPending,
    /// The queue was full (or closed); the request was dropped.
    Dropped,
}

/// Bounded refresh queue with a fixed worker pool.
///
/// A key is a member of the in-flight set from the moment it is scheduled
/// until the worker that picked it up has finished with it, so at most one
/// refresh per key is pending at any time.
pub(crate) struct RefreshPipeline<K> {
    queue: Mutex<Option<mpsc::Sender<K>>>,
    in_flight: Arc<Mutex<HashSet<K>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<K> std::fmt::Debug for RefreshPipeline<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshPipeline")
            .field("closed", &self.queue.lock().is_none())
            .finish_non_exhaustive()
    }
}

impl<K> RefreshPipeline<K>
where
    K: Clone + Eq + Hash + Send + 'static,
{
    /// Starts `worker_count` workers draining a queue of `buffer_size` slots.
    ///
    /// Each received key is passed to `refresh`; the key leaves the
    /// in-flight set only after the returned future has completed.
    pub(crate) fn start<F, Fut>(worker_count: usize, buffer_size: usize, refresh: F) -> Self
    where
        F: Fn(K) -> Fut + Clone + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<K>(buffer_size);
        let rx = Arc::new(AsyncMutex::new(rx));
        let in_flight = Arc::new(Mutex::new(HashSet::new()));

        let workers = (0..worker_count)
            .map(|_| {
                let rx = Arc::clone(&rx);
                let in_flight = Arc::clone(&in_flight);
                let refresh = refresh.clone();
                tokio::spawn(async move {
                    loop {
                        let received = { rx.lock().await.recv().await };
                        let Some(key) = received else { break };
                        refresh(key.clone()).await;
                        in_flight.lock().remove(&key);
                    }
                })
            })
            .collect();

        Self {
            queue: Mutex::new(Some(tx)),
            in_flight,
            workers: Mutex::new(workers),
        }
    }

    /// Schedules a refresh for `key` without ever blocking the caller.
    ///
    /// Claims the key in the in-flight set first; if the subsequent
    /// non-blocking send fails the claim is undone, so a dropped request
    /// leaves no trace.
    pub(crate) fn schedule(&self, key: &K) -> Schedule {
        if !self.in_flight.lock().insert(key.clone()) {
            return Schedule::AlreadyPending;
        }

        let sent = self
            .queue
            .lock()
            .as_ref()
            .is_some_and(|queue| queue.try_send(key.clone()).is_ok());
        if sent {
            Schedule::Queued
        } else {
            self.in_flight.lock().remove(key);
            Schedule::Dropped
        }
    }

    /// Stops accepting new refreshes, closes the queue, joins all workers
    /// and drains the in-flight set. Keys already queued are still
    /// processed before the workers exit.
    pub(crate) async fn close(&self) {
        self.queue.lock().take();
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
        self.in_flight.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_pipeline(workers: usize, buffer: usize) -> (RefreshPipeline<String>, Arc<AtomicUsize>) {
        let processed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&processed);
        let pipeline = RefreshPipeline::start(workers, buffer, move |_key: String| {
            let seen = Arc::clone(&seen);
            async move {
                seen.fetch_add(1, Ordering::AcqRel);
            }
        });
        (pipeline, processed)
    }

    #[tokio::test]
    async fn schedule_marks_key_pending() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let held = Arc::clone(&gate);
        let pipeline = RefreshPipeline::start(1, 4, move |_key: String| {
            let held = Arc::clone(&held);
            async move {
                let _permit = held.acquire().await;
            }
        });

        assert_eq!(pipeline.schedule(&"k".to_string()), Schedule::Queued);
        assert_eq!(pipeline.schedule(&"k".to_string()), Schedule::AlreadyPending);
        assert_eq!(pipeline.schedule(&"other".to_string()), Schedule::Queued);

        gate.add_permits(8);
        pipeline.close().await;
    }

    #[tokio::test]
    async fn full_queue_drops_and_undoes_claim() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let held = Arc::clone(&gate);
        let started = Arc::new(tokio::sync::Notify::new());
        let announce = Arc::clone(&started);
        let pipeline = RefreshPipeline::start(1, 1, move |_key: String| {
            let held = Arc::clone(&held);
            let announce = Arc::clone(&announce);
            async move {
                announce.notify_one();
                let _permit = held.acquire().await;
            }
        });

        // First key occupies the worker, second fills the only queue slot.
        assert_eq!(pipeline.schedule(&"k1".to_string()), Schedule::Queued);
        started.notified().await;
        assert_eq!(pipeline.schedule(&"k2".to_string()), Schedule::Queued);

        // Third key finds the queue full and is dropped without a claim.
        assert_eq!(pipeline.schedule(&"k3".to_string()), Schedule::Dropped);
        assert_eq!(pipeline.schedule(&"k3".to_string()), Schedule::Dropped);

        gate.add_permits(8);
        pipeline.close().await;
    }

    #[tokio::test]
    async fn key_can_be_rescheduled_after_processing() {
        let (pipeline, processed) = counting_pipeline(1, 4);

        assert_eq!(pipeline.schedule(&"k".to_string()), Schedule::Queued);
        for _ in 0..100 {
            if processed.load(Ordering::Acquire) == 1 && pipeline.in_flight.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(pipeline.schedule(&"k".to_string()), Schedule::Queued);
        pipeline.close().await;
        assert_eq!(processed.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn close_rejects_later_schedules() {
        let (pipeline, processed) = counting_pipeline(2, 4);
        pipeline.close().await;

        assert_eq!(pipeline.schedule(&"k".to_string()), Schedule::Dropped);
        assert_eq!(processed.load(Ordering::Acquire), 0);
    }

    #[tokio::test]
    async fn close_processes_already_queued_keys() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let held = Arc::clone(&gate);
        let processed = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&processed);
        let pipeline = RefreshPipeline::start(1, 4, move |_key: String| {
            let held = Arc::clone(&held);
            let seen = Arc::clone(&seen);
            async move {
                let _permit = held.acquire().await;
                seen.fetch_add(1, Ordering::AcqRel);
            }
        });

        assert_eq!(pipeline.schedule(&"k1".to_string()), Schedule::Queued);
        assert_eq!(pipeline.schedule(&"k2".to_string()), Schedule::Queued);

        gate.add_permits(8);
        pipeline.close().await;
        assert_eq!(processed.load(Ordering::Acquire), 2);
    }
}
