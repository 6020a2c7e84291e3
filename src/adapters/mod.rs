//! External integrations
//!
//! Adapters for the two collaborators the pipeline talks to: the drug
//! registry REST API and the PostgreSQL store. Each adapter exposes a trait
//! seam ([`registry::RegistrySource`], [`postgres::DrugStore`]) that the
//! core pipeline depends on.

pub mod postgres;
pub mod registry;
