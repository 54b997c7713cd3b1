//! Domain models for bar inventory management

mod inventory;
mod product;
mod transfer;
mod user;

pub use inventory::*;
pub use product::*;
pub use transfer::*;
pub use user::*;
