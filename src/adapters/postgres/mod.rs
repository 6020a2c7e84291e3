//! PostgreSQL persistence adapter
//!
//! Pooled client plus the drug/document store built on it.

pub mod client;
pub mod store;

pub use client::PostgresClient;
pub use store::{DocumentInsert, DrugStore, PostgresStore, StoreCounts};
