// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalesces duplicate async loads into a single execution.
//!
//! This crate provides [`Coalescer`], a mechanism for deduplicating
//! concurrent async operations. When multiple tasks request the same work
//! (identified by a key), only the first task (the "leader") performs the
//! actual work while subsequent tasks (the "followers") wait and receive a
//! clone of the result.
//!
//! # When to use
//!
//! Use a `Coalescer` when expensive or rate-limited operations may be
//! requested concurrently with the same parameters:
//!
//! - **Cache population**: prevent thundering herd when a cache entry expires
//! - **API calls**: deduplicate concurrent requests to the same endpoint
//! - **Database queries**: coalesce identical queries issued simultaneously
//!
//! # Example
//!
//! ```
//! use coalesce::Coalescer;
//!
//! # async fn example() {
//! let group: Coalescer<&str, String> = Coalescer::new();
//!
//! // Concurrent calls with the same key share a single execution.
//! let result = group.run("user:123", || async {
//!     // This expensive operation runs only once.
//!     "expensive_result".to_string()
//! }).await;
//! # }
//! ```
//!
//! # Cancellation
//!
//! The producer runs inside the leader caller's future, so the leader's
//! cancellation cancels the in-flight load: when the leader is dropped
//! before completing, one waiting follower is promoted to leader and runs
//! its own producer. Dropping a follower never affects the leader or the
//! other followers. Once the leader completes, every waiter receives a clone
//! of its result, and the key is released so a later call starts a fresh
//! producer.

#![cfg_attr(docsrs, feature(doc_cfg))]

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        Arc, OnceLock, Weak,
        atomic::{AtomicUsize, Ordering},
    },
};

use event_listener::Event;
use parking_lot::Mutex;

type FlightMap<K, T> = Arc<Mutex<HashMap<K, Weak<Shared<T>>>>>;

/// Represents a class of loads and creates a space in which loads for the
/// same key are executed with duplicate suppression.
pub struct Coalescer<K, T> {
    flights: FlightMap<K, T>,
}

impl<K, T> Default for Coalescer<K, T> {
    fn default() -> Self {
        Self { flights: Arc::default() }
    }
}

impl<K, T> Clone for Coalescer<K, T> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
        }
    }
}

impl<K, T> std::fmt::Debug for Coalescer<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer").finish_non_exhaustive()
    }
}

/// State shared by every caller joined onto one in-flight load.
struct Shared<T> {
    /// Result slot - written once by the leader, then lock-free reads.
    slot: OnceLock<T>,
    /// Wakes followers when the result lands or the leader is dropped.
    done: Event,
    /// 1 while a leader is executing, 0 when the seat is free.
    leader: AtomicUsize,
}

impl<T> Shared<T> {
    fn new() -> Self {
        Self {
            slot: OnceLock::new(),
            done: Event::new(),
            leader: AtomicUsize::new(0),
        }
    }
}

/// RAII seat for the single leader; frees the seat and wakes a follower for
/// promotion if the leader is dropped without storing a result.
struct LeaderSeat<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> LeaderSeat<T> {
    /// Tries to take the leader seat. Fails if another leader is executing.
    fn try_claim(shared: &Arc<Shared<T>>) -> Option<Self> {
        shared
            .leader
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self {
            shared: Some(Arc::clone(shared)),
        })
    }

    /// Consumes the seat without freeing it, once a result has been stored.
    /// Late joiners then always read the slot instead of claiming the seat.
    fn retire(mut self) {
        self.shared.take();
    }
}

impl<T> Drop for LeaderSeat<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.leader.store(0, Ordering::Release);
            if shared.slot.get().is_none() {
                shared.done.notify(1);
            }
        }
    }
}

enum Role<T, F> {
    Leader { producer: F, seat: LeaderSeat<T> },
    /// Keeps its producer for promotion if every leader is dropped.
    Follower { producer: F },
}

struct Waiter<K, T, F> {
    role: Role<T, F>,
    shared: Arc<Shared<T>>,
    key: K,
    flights: FlightMap<K, T>,
}

impl<K, T, F, Fut> Waiter<K, T, F>
where
    K: Hash + Eq,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
    T: Clone,
{
    async fn wait(self) -> T {
        let Self {
            role,
            shared,
            key,
            flights,
        } = self;
        match role {
            Role::Leader { producer, seat } => Self::lead(shared, key, flights, producer, seat).await,
            Role::Follower { producer } => Self::follow(shared, key, flights, producer).await,
        }
    }

    async fn lead(shared: Arc<Shared<T>>, key: K, flights: FlightMap<K, T>, producer: F, seat: LeaderSeat<T>) -> T {
        if let Some(result) = shared.slot.get() {
            seat.retire();
            return result.clone();
        }

        let value = producer().await;

        // No suspension point between storing, unmapping and notifying:
        // once the producer has resolved, followers are guaranteed to be
        // woken even if this future is dropped immediately afterwards.
        if shared.slot.set(value.clone()).is_ok() {
            flights.lock().remove(&key);
        }
        shared.done.notify(usize::MAX);
        seat.retire();

        shared.slot.get().cloned().unwrap_or(value)
    }

    async fn follow(shared: Arc<Shared<T>>, key: K, flights: FlightMap<K, T>, producer: F) -> T {
        loop {
            if let Some(result) = shared.slot.get() {
                return result.clone();
            }

            // Register before re-checking state so a notification fired
            // between the checks is not lost.
            let listener = shared.done.listen();

            if let Some(result) = shared.slot.get() {
                return result.clone();
            }

            // Leader dropped without a result: promote ourselves.
            if shared.leader.load(Ordering::Acquire) == 0 {
                if let Some(seat) = LeaderSeat::try_claim(&shared) {
                    return Self::lead(shared, key, flights, producer, seat).await;
                }
            }

            listener.await;
        }
    }
}

impl<K, T> Coalescer<K, T>
where
    K: Hash + Eq + Clone,
{
    /// Creates a new `Coalescer`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `producer` for `key`, making sure that at most one producer per
    /// key is in flight at a given moment. A duplicate call arriving while a
    /// producer runs waits for it and receives a clone of its result.
    ///
    /// The producer executes inside the caller's future; see the crate docs
    /// for the cancellation and promotion policy.
    pub fn run<F, Fut>(&self, key: K, producer: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        T: Clone,
    {
        let waiter = self.join(key, producer);
        waiter.wait()
    }

    /// Joins the flight for `key`, claiming the leader seat if it is free.
    /// Registration is synchronous so a caller is part of the flight from
    /// the moment `run` returns, before its future is first polled.
    fn join<F>(&self, key: K, producer: F) -> Waiter<K, T, F> {
        let mut flights = self.flights.lock();

        if let Some(shared) = flights.get(&key).and_then(Weak::upgrade) {
            let role = match LeaderSeat::try_claim(&shared) {
                Some(seat) => Role::Leader { producer, seat },
                None => Role::Follower { producer },
            };
            return Waiter {
                role,
                shared,
                key,
                flights: Arc::clone(&self.flights),
            };
        }

        // No live flight for this key (or every participant was dropped):
        // start a new one with this caller as leader.
        let shared = Arc::new(Shared::new());
        flights.insert(key.clone(), Arc::downgrade(&shared));
        let seat = LeaderSeat::try_claim(&shared).expect("leader seat of a new flight is always free");
        Waiter {
            role: Role::Leader { producer, seat },
            shared,
            key,
            flights: Arc::clone(&self.flights),
        }
    }
}
