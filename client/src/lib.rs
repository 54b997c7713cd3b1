//! Bar inventory client
//!
//! Async client for the backend inventory service plus the stateful
//! per-day session that buffers edits, reconciles stock and enforces the
//! access policy before anything is sent.

pub mod config;
pub mod error;
pub mod external;
pub mod services;
pub mod storage;

pub use config::{Config, SessionContext};
pub use error::{ClientError, ClientResult};
pub use external::{HttpInventoryApi, InventoryApi};
pub use services::{DayView, FlushOutcome, InventorySession};
pub use storage::FileStore;
