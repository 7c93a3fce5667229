//! SQLite-backed registry of named, versioned response stores.
//!
//! This module provides the durable half of the worker using SQLite with
//! async access via tokio-rusqlite. It supports:
//!
//! - Stores named `{logical}-v{version}`, created on first use
//! - Request-keyed envelopes (response snapshot + write timestamp)
//! - Automatic schema migrations
//! - Bulk store deletion (by version set, by name predicate, or all)
//! - Oldest-first trimming of a single store

pub mod connection;
pub mod envelopes;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use envelopes::Envelope;
pub use stores::{LogicalStore, StoreStats};
