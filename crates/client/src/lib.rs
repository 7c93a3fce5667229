//! Network side of the stash worker.
//!
//! This crate provides the outbound fetch client and the per-class
//! strategy engine shared by the worker runtime.

pub mod fetch;
pub mod strategy;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use strategy::{Served, Source, StoreNames, StrategyEngine};
