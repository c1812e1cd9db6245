// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! Backend contracts and freshness metadata for the `freshet` cache engines.
//!
//! This crate defines the two capabilities the engines consume, a read-only
//! [`Repository`] and a read/write [`Cache`], along with [`Entry`], the
//! value wrapper carrying stale/dead deadlines, and [`Error`] for fallible
//! backend operations.
//!
//! # Overview
//!
//! The contracts separate storage concerns from caching strategy. Implement
//! [`Repository`] for your origin (a database, an HTTP service) and
//! [`Cache`] for your store (in-memory, remote key-value), then compose them
//! with `freshet`'s engines.
//!
//! # Implementing a backend
//!
//! ```
//! use freshet_backend::{Cache, Error, Repository};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct SimpleStore<K, V>(RwLock<HashMap<K, V>>);
//!
//! impl<K, V> Repository<K, V> for SimpleStore<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn get(&self, key: &K) -> Result<Option<V>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//! }
//!
//! impl<K, V> Cache<K, V> for SimpleStore<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Clone + Send + Sync,
//! {
//!     async fn set(&self, key: &K, value: V) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(key.clone(), value);
//!         Ok(())
//!     }
//! }
//! ```

pub(crate) mod backend;
mod entry;
pub mod error;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use backend::{Cache, Repository};
#[doc(inline)]
pub use entry::{Entry, Freshness};
#[doc(inline)]
pub use error::{Error, Result};
