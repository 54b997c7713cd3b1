//! Shared types and domain logic for bar inventory management
//!
//! This crate holds the reconciliation engine, the pending-edit buffer and
//! the access policy. It does no I/O and is used by the async client and, via
//! WASM, by the browser table.

pub mod buffer;
pub mod models;
pub mod policy;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use buffer::*;
pub use models::*;
pub use policy::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
