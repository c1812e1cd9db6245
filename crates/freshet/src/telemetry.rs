// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Engine telemetry: structured logs via `tracing` and OpenTelemetry
//! metrics.
//!
//! Telemetry is optional; engines built without it record nothing.

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Meter},
};

const CACHE_EVENT_COUNT_NAME: &str = "cache.event.count";
const CACHE_NAME_ATTRIBUTE: &str = "cache.name";
const CACHE_ACTIVITY_ATTRIBUTE: &str = "cache.activity";

/// Type alias for cache names used in telemetry.
pub type CacheName = &'static str;

/// Telemetry collector for the cache engines.
///
/// Emits each engine activity as a structured `tracing` event and, when a
/// meter is provided, counts it in an OpenTelemetry counter keyed by cache
/// name and activity. Construct one and pass it to an engine builder via
/// `.telemetry()`.
///
/// # Examples
///
/// ```
/// use freshet::CacheTelemetry;
///
/// // Logs only.
/// let telemetry = CacheTelemetry::new(true, None);
///
/// // Logs and metrics.
/// let meter = opentelemetry::global::meter("my-service");
/// let telemetry = CacheTelemetry::new(true, Some(&meter));
/// ```
#[derive(Clone, Debug)]
pub struct CacheTelemetry {
    logging_enabled: bool,
    event_counter: Option<Counter<u64>>,
}

impl CacheTelemetry {
    /// Creates a new telemetry collector.
    ///
    /// # Arguments
    ///
    /// * `logging_enabled` - Whether activities are emitted as `tracing` events
    /// * `meter` - The OpenTelemetry meter to count events with, if any
    #[must_use]
    pub fn new(logging_enabled: bool, meter: Option<&Meter>) -> Self {
        Self {
            logging_enabled,
            event_counter: meter.map(|meter| {
                meter
                    .u64_counter(CACHE_EVENT_COUNT_NAME)
                    .with_description("Cache events")
                    .with_unit("{event}")
                    .build()
            }),
        }
    }

    #[inline]
    pub(crate) fn record(&self, cache_name: CacheName, activity: CacheActivity) {
        if let Some(counter) = &self.event_counter {
            counter.add(
                1,
                &[
                    KeyValue::new(CACHE_NAME_ATTRIBUTE, cache_name),
                    KeyValue::new(CACHE_ACTIVITY_ATTRIBUTE, activity.as_str()),
                ],
            );
        }

        if self.logging_enabled {
            Self::emit(cache_name, activity);
        }
    }

    fn emit(cache_name: CacheName, activity: CacheActivity) {
        let ev = activity.as_str();

        // Tracing level must be constant, so a macro selects the level.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(cache.name = cache_name, cache.activity = ev, "cache.event")
            };
        }

        match activity {
            CacheActivity::Hit | CacheActivity::Miss | CacheActivity::Refresh => emit_event!(debug),
            CacheActivity::Stale | CacheActivity::Dead | CacheActivity::RefreshDropped => emit_event!(info),
            CacheActivity::Error => emit_event!(error),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheActivity {
    Hit,
    Stale,
    Miss,
    Dead,
    Refresh,
    RefreshDropped,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Stale => "cache.stale",
            Self::Miss => "cache.miss",
            Self::Dead => "cache.dead",
            Self::Refresh => "cache.refresh",
            Self::RefreshDropped => "cache.refresh_dropped",
            Self::Error => "cache.error",
        }
    }
}
