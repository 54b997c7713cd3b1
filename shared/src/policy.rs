//! Access policy for inventory edits
//!
//! The backend remains the authority; this gate keeps the client from
//! offering or attempting edits the backend would refuse.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Whether `role` may edit inventory recorded on `record_date`
pub fn can_edit(role: Role, record_date: NaiveDate, today: NaiveDate) -> bool {
    match role {
        Role::Admin => true,
        Role::Employee => record_date == today,
    }
}

/// Same check for a session whose role may be unresolved
pub fn can_edit_as(role: Option<Role>, record_date: NaiveDate, today: NaiveDate) -> bool {
    role.is_some_and(|role| can_edit(role, record_date, today))
}

/// Whether `role` may record the day's counted cash
pub fn can_record_cash(role: Option<Role>) -> bool {
    matches!(role, Some(Role::Admin))
}

/// Outcome of a local mutation.
///
/// Denied or inapplicable mutations leave all state untouched.
#[must_use]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mutation {
    Applied,
    /// The access policy refused the change
    Denied,
    /// The row is not being edited
    NotEditing,
    /// No row of the current day has this product
    UnknownProduct,
}

impl Mutation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Mutation::Applied)
    }
}
