//! usergraph-store — Neo4j-backed user store.
//!
//! All reads and writes to the user graph flow through [`GraphClient`]:
//! a bounded-retry connect that waits for the server to come up, then one
//! parameterized statement per operation, each executed as its own unit
//! of work.

pub mod client;
pub mod mutations;
pub mod queries;

pub use client::{GraphClient, GraphConfig, GraphError};
pub use queries::{AnyNodeRecord, UserRecord};
