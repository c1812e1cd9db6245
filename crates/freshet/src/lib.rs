// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! Composable caching strategies over pluggable backends.
//!
//! This crate provides two layered caching engines:
//!
//! - [`LookThrough`]: a read-through cache that resolves misses through an
//!   origin [`Repository`], with concurrent loads for the same key coalesced
//!   onto a single origin request.
//! - [`Swr`]: a stale-while-revalidate cache whose entries carry stale and
//!   dead deadlines. Fresh entries are served directly, stale entries are
//!   served immediately while a bounded background pipeline revalidates
//!   them, and dead or missing entries are reloaded synchronously.
//!
//! Backends plug in through the [`Repository`] and [`Cache`] contracts from
//! `freshet_backend`; `freshet_memory` supplies the default bounded
//! in-memory store.
//!
//! # Examples
//!
//! ## Stale-while-revalidate over an origin
//!
//! ```no_run
//! use freshet::Swr;
//! use freshet_backend::testing::MockRepository;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = MockRepository::<String, String>::new();
//! repo.put("config".to_string(), "v1".to_string());
//!
//! let swr = Swr::builder(repo, Duration::from_secs(60), Duration::from_secs(300))
//!     .memory(10_000)
//!     .refresh_workers(4)
//!     .error_callback(|error| eprintln!("refresh trouble: {error}"))
//!     .build()?;
//!
//! // Loads through the origin once, then serves from memory while fresh.
//! assert_eq!(swr.get(&"config".to_string()).await?.as_deref(), Some("v1"));
//! assert_eq!(swr.get(&"config".to_string()).await?.as_deref(), Some("v1"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Read-through composition
//!
//! ```
//! use freshet::LookThrough;
//! use freshet_backend::testing::{MockCache, MockRepository};
//!
//! # futures::executor::block_on(async {
//! let cache = MockCache::<String, i32>::new();
//! let repo = MockRepository::<String, i32>::new();
//! repo.put("answer".to_string(), 42);
//!
//! let engine = LookThrough::builder(cache, repo).build()?;
//! assert_eq!(engine.get(&"answer".to_string()).await?, Some(42));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod builder;
mod lookthrough;
mod refresh;
mod swr;
mod telemetry;

#[doc(inline)]
pub use builder::{
    BuildError, DEFAULT_REFRESH_BUFFER_SIZE, DEFAULT_REFRESH_TIMEOUT, DEFAULT_REFRESH_WORKERS, ErrorCallback,
    LookThroughBuilder, SwrBuilder,
};
#[doc(inline)]
pub use freshet_backend::{Cache, Entry, Error, Freshness, Repository, Result};
#[doc(inline)]
pub use freshet_memory::MemoryCache;
#[doc(inline)]
pub use lookthrough::LookThrough;
#[doc(inline)]
pub use swr::Swr;
#[doc(inline)]
pub use telemetry::{CacheName, CacheTelemetry};
