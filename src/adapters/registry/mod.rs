//! Drug registry API adapter
//!
//! HTTP client for the registry's REST API plus the wire models it parses
//! and the request pacer shared across workers.

pub mod client;
pub mod models;
pub mod pacer;

pub use client::{HttpRegistryClient, RegistrySource};
pub use pacer::RequestPacer;
