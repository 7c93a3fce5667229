//! Core types and shared functionality for the stash offline worker.
//!
//! This crate provides:
//! - Request/response types and request-key normalization
//! - Resource classification
//! - Versioned cache store registry with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod request;
pub mod response;

pub use cache::{CacheDb, Envelope, LogicalStore, StoreStats};
pub use classify::{Classifier, ResourceClass};
pub use config::AppConfig;
pub use error::Error;
pub use request::Request;
pub use response::Response;
