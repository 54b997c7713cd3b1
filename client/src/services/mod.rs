//! Client-side services

pub mod session;

pub use session::{DayView, FlushOutcome, InventorySession};
