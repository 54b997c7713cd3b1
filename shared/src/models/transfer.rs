//! Inter-bar stock transfer models
//!
//! Approval happens in the backend workflow; the client only files requests
//! and later reads the resulting in/out quantities on the inventory records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BarRef, ProductRef};
use crate::types::{business_date, BarId, ProductId, TransferId};

/// Request to move stock from one bar to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub qty: i64,
    pub from_bar: BarId,
    pub to_bar: BarId,
    #[serde(with = "business_date")]
    pub date: NaiveDate,
}

/// Transfer as tracked by the backend workflow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    #[serde(rename = "_id")]
    pub id: TransferId,
    #[serde(default)]
    pub product: Option<ProductRef>,
    pub qty: i64,
    #[serde(default)]
    pub from_bar: Option<BarRef>,
    #[serde(default)]
    pub to_bar: Option<BarRef>,
    pub status: TransferStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Approved => "approved",
            TransferStatus::Rejected => "rejected",
        }
    }
}
