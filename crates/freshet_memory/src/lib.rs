// Copyright (c) Microsoft Corporation.

#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory cache backend backed by moka.
//!
//! This crate provides [`MemoryCache`], a concurrent in-memory store using
//! moka's `TinyLFU` eviction algorithm for excellent hit rates. Use
//! [`MemoryCacheBuilder`] to configure capacity without exposing moka types
//! directly.
//!
//! # Quick start
//!
//! ```
//! use freshet_backend::{Cache, Repository};
//! use freshet_memory::MemoryCache;
//!
//! # futures::executor::block_on(async {
//! let cache = MemoryCache::<String, i32>::with_capacity(1000);
//!
//! cache.set(&"key".to_string(), 42).await?;
//! let value = cache.get(&"key".to_string()).await?;
//! assert_eq!(value, Some(42));
//! # Ok::<(), freshet_backend::Error>(())
//! # });
//! ```

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::MemoryCacheBuilder;
#[doc(inline)]
pub use tier::MemoryCache;
