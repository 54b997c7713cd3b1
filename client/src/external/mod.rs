//! External API integrations

pub mod inventory_api;

pub use inventory_api::{normalize_base_url, HttpInventoryApi, InventoryApi};
