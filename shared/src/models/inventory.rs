//! Daily inventory models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Product, ProductRef};
use crate::types::{business_date, BarId, ProductId};

/// Stock position of one product at one bar on one day
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    #[serde(default)]
    pub product: Option<ProductRef>,
    #[serde(default)]
    pub opening: Option<i64>,
    #[serde(default)]
    pub received_qty: Option<i64>,
    /// Populated by the transfer workflow; read-only here
    #[serde(default)]
    pub transfer_in_qty: Option<i64>,
    /// Populated by the transfer workflow; read-only here
    #[serde(default)]
    pub transfer_out_qty: Option<i64>,
    /// Physically counted stock; `None` means not counted yet
    #[serde(default)]
    pub manual_closing: Option<i64>,
    /// Price in effect for this bar and date
    #[serde(default)]
    pub selling_price: Option<Decimal>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    pub fn product_id(&self) -> Option<&ProductId> {
        self.product.as_ref().map(ProductRef::id)
    }

    pub fn populated_product(&self) -> Option<&Product> {
        self.product.as_ref().and_then(ProductRef::populated)
    }
}

/// Response body of the inventory listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryPage {
    #[serde(default)]
    pub data: Vec<InventoryRecord>,
}

/// One edited row in a bulk upsert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpsertItem {
    pub product_id: ProductId,
    pub opening: i64,
    pub received_qty: i64,
    pub manual_closing: i64,
}

/// All pending edits of one day, sent as a single request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpsertRequest {
    pub bar_id: BarId,
    #[serde(with = "business_date")]
    pub date: NaiveDate,
    pub items: Vec<BulkUpsertItem>,
}

/// Rows written by a bulk upsert; the new source of truth for those products
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkUpsertResponse {
    #[serde(default)]
    pub updated: Vec<InventoryRecord>,
}

/// Merge rows returned by a bulk upsert into the local day.
///
/// Rows are matched on product id. Returned rows replace their local
/// counterpart in place, unknown products are appended, and local rows not
/// present in the response are left untouched. A returned row that carries
/// only the product id keeps the local populated product.
pub fn merge_updated(records: &mut Vec<InventoryRecord>, updated: Vec<InventoryRecord>) {
    for mut row in updated {
        let Some(product_id) = row.product_id().cloned() else {
            continue;
        };
        match records
            .iter_mut()
            .find(|existing| existing.product_id() == Some(&product_id))
        {
            Some(existing) => {
                if row.populated_product().is_none() && existing.populated_product().is_some() {
                    row.product = existing.product.take();
                }
                *existing = row;
            }
            None => records.push(row),
        }
    }
}
