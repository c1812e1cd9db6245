// Copyright (c) Microsoft Corporation.

use std::{
    ops::Deref,
    time::{Duration, Instant},
};

/// The freshness state of an [`Entry`] at a given instant.
///
/// Derived by [`Entry::freshness`] from a single `now` reading so both
/// deadline comparisons see the same clock value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// The entry is current and can be served without contacting the origin.
    Fresh,
    /// The entry is past its stale deadline but still servable; a background
    /// revalidation should be scheduled.
    Stale,
    /// The entry is past its dead deadline and must not be served.
    Dead,
}

/// A cached value with stale and dead deadlines.
///
/// `Entry` wraps a value with the two instants that drive the
/// fresh/stale/dead lifecycle. Entries are immutable after construction;
/// a revalidation replaces the whole cache slot rather than mutating the
/// entry in place.
///
/// # Examples
///
/// ```
/// use freshet_backend::{Entry, Freshness};
/// use std::time::{Duration, Instant};
///
/// let entry = Entry::new("data", Duration::from_secs(60), Duration::from_secs(300));
/// assert_eq!(entry.freshness(Instant::now()), Freshness::Fresh);
/// assert_eq!(*entry.value(), "data");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<V> {
    value: V,
    stale_at: Instant,
    dead_at: Instant,
}

impl<V> Entry<V> {
    /// Creates an entry whose deadlines are offsets from the current time.
    ///
    /// Both deadlines are computed from a single clock reading.
    pub fn new(value: V, time_to_stale: Duration, time_to_dead: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            stale_at: now + time_to_stale,
            dead_at: now + time_to_dead,
        }
    }

    /// Creates an entry with explicit deadlines.
    ///
    /// This is typically used when recreating entries from another store or
    /// when seeding a cache in tests.
    pub fn with_deadlines(value: V, stale_at: Instant, dead_at: Instant) -> Self {
        Self { value, stale_at, dead_at }
    }

    /// Returns the instant after which the entry is no longer fresh.
    #[must_use]
    pub fn stale_at(&self) -> Instant {
        self.stale_at
    }

    /// Returns the instant after which the entry must not be served.
    #[must_use]
    pub fn dead_at(&self) -> Instant {
        self.dead_at
    }

    /// Returns the freshness state of this entry at `now`.
    ///
    /// The stale deadline is checked first, so an entry constructed with
    /// `stale_at > dead_at` is fresh until `stale_at` and dead afterwards.
    #[must_use]
    pub fn freshness(&self, now: Instant) -> Freshness {
        if now < self.stale_at {
            Freshness::Fresh
        } else if now < self.dead_at {
            Freshness::Stale
        } else {
            Freshness::Dead
        }
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }
}

impl<V> Deref for Entry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
