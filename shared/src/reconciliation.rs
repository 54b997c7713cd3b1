//! Daily stock reconciliation
//!
//! Sales are not recorded as transactions. They are inferred from the
//! physical count at the end of the day:
//!
//! ```text
//! sales_qty        = opening + received + transfer_in - transfer_out - manual_closing
//! expected_closing = opening + received + transfer_in - (sales_qty + transfer_out)
//! variance         = manual_closing - expected_closing
//! ```
//!
//! Because the count drives the sales figure, `variance` is always zero for a
//! counted row; a miscount shows up as sales. Rows that have not been counted
//! yet have no sales, no sales amount and no variance, and their expected
//! closing is the stock on hand before sales.
//!
//! Negative quantities from the backend are read as 0, and the arithmetic
//! saturates instead of overflowing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::buffer::EditEntries;
use crate::models::InventoryRecord;
use crate::types::ProductId;

/// One inventory row with its derived figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub opening: i64,
    pub received_qty: i64,
    pub transfer_in_qty: i64,
    pub transfer_out_qty: i64,
    /// `None` until the row has been counted
    pub sales_qty: Option<i64>,
    pub unit_price: Decimal,
    pub sales_amt: Option<Decimal>,
    pub cost_price: Decimal,
    pub gross_profit: Option<Decimal>,
    pub expected_closing: i64,
    pub manual_closing: Option<i64>,
    pub variance: Option<i64>,
    pub low_stock_threshold: Option<i64>,
    /// The row has uncommitted local edits
    pub editing: bool,
}

impl EnrichedRow {
    /// Stock on hand: the count if there is one, else the expectation
    pub fn on_hand(&self) -> i64 {
        self.manual_closing.unwrap_or(self.expected_closing)
    }

    pub fn is_low_stock(&self) -> bool {
        self.low_stock_threshold
            .is_some_and(|threshold| self.on_hand() <= threshold)
    }

    /// Counted below expectation
    pub fn is_short(&self) -> bool {
        self.variance.is_some_and(|v| v < 0)
    }
}

/// Data gaps found while reconciling; they never change the figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Record without a populated product; left out of the day
    MissingProduct { index: usize },
    /// Neither the record nor the product has a price; priced at 0
    MissingPrice { product_id: ProductId },
}

/// Result of reconciling one day
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Reconciliation {
    pub rows: Vec<EnrichedRow>,
    pub warnings: Vec<DataQualityWarning>,
}

/// Day-level cash position
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub total_expected_cash: Decimal,
    pub total_sales_qty: i64,
    pub cost_of_sales: Decimal,
    pub gross_profit: Decimal,
    pub counted_rows: usize,
    pub uncounted_rows: usize,
    pub cash_count: Option<Decimal>,
    /// `cash_count - total_expected_cash`, once cash has been counted
    pub cash_variance: Option<Decimal>,
    pub shortage: bool,
}

/// Low-stock entry for alerts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub name: String,
    pub on_hand: i64,
    pub threshold: i64,
}

/// Reconcile a day's records with the pending local edits.
///
/// Edited values take precedence over the server's. Rows come back sorted by
/// product name, case-insensitively, keeping server order among equal names.
pub fn reconcile(records: &[InventoryRecord], edits: &EditEntries) -> Reconciliation {
    let mut rows = Vec::with_capacity(records.len());
    let mut warnings = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let Some(product) = record.populated_product() else {
            warnings.push(DataQualityWarning::MissingProduct { index });
            continue;
        };
        let edit = edits.get(&product.id);

        let opening = stock(edit.map(|e| e.opening).or(record.opening));
        let received_qty = stock(edit.map(|e| e.received_qty).or(record.received_qty));
        let manual_closing = edit
            .map(|e| e.manual_closing)
            .or(record.manual_closing)
            .map(|counted| counted.max(0));
        let transfer_in_qty = stock(record.transfer_in_qty);
        let transfer_out_qty = stock(record.transfer_out_qty);

        let unit_price = match record.selling_price.or(product.selling_price) {
            Some(price) => price,
            None => {
                warnings.push(DataQualityWarning::MissingPrice {
                    product_id: product.id.clone(),
                });
                Decimal::ZERO
            }
        };
        let cost_price = product.cost_price.unwrap_or(Decimal::ZERO);

        let available = opening
            .saturating_add(received_qty)
            .saturating_add(transfer_in_qty);
        let sales_qty = manual_closing.map(|counted| {
            available
                .saturating_sub(transfer_out_qty)
                .saturating_sub(counted)
        });
        let expected_closing =
            available.saturating_sub(sales_qty.unwrap_or(0).saturating_add(transfer_out_qty));
        let variance = manual_closing.map(|counted| counted.saturating_sub(expected_closing));

        let sales_amt = sales_qty.map(|qty| Decimal::from(qty).saturating_mul(unit_price));
        let gross_profit = sales_qty
            .zip(sales_amt)
            .map(|(qty, amt)| amt.saturating_sub(Decimal::from(qty).saturating_mul(cost_price)));

        rows.push(EnrichedRow {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            opening,
            received_qty,
            transfer_in_qty,
            transfer_out_qty,
            sales_qty,
            unit_price,
            sales_amt,
            cost_price,
            gross_profit,
            expected_closing,
            manual_closing,
            variance,
            low_stock_threshold: product.low_stock_threshold,
            editing: edit.is_some(),
        });
    }

    rows.sort_by_cached_key(|row| row.product_name.to_lowercase());

    Reconciliation { rows, warnings }
}

/// Stock quantities are never negative; a missing one counts as 0
fn stock(qty: Option<i64>) -> i64 {
    qty.unwrap_or(0).max(0)
}

/// Aggregate a reconciled day against the counted cash
pub fn summarize(rows: &[EnrichedRow], cash_count: Option<Decimal>) -> DaySummary {
    let mut summary = DaySummary {
        cash_count,
        ..Default::default()
    };

    for row in rows {
        match (row.sales_qty, row.sales_amt) {
            (Some(qty), Some(amt)) => {
                summary.counted_rows += 1;
                summary.total_sales_qty = summary.total_sales_qty.saturating_add(qty);
                summary.total_expected_cash = summary.total_expected_cash.saturating_add(amt);
                summary.cost_of_sales = summary
                    .cost_of_sales
                    .saturating_add(Decimal::from(qty).saturating_mul(row.cost_price));
            }
            _ => summary.uncounted_rows += 1,
        }
    }

    summary.gross_profit = summary
        .total_expected_cash
        .saturating_sub(summary.cost_of_sales);
    summary.cash_variance =
        cash_count.map(|cash| cash.saturating_sub(summary.total_expected_cash));
    summary.shortage = summary.cash_variance.is_some_and(|v| v < Decimal::ZERO);
    summary
}

/// Rows whose product name contains `term`, ignoring case
pub fn filter_rows<'a>(rows: &'a [EnrichedRow], term: &str) -> Vec<&'a EnrichedRow> {
    let needle = term.trim().to_lowercase();
    rows.iter()
        .filter(|row| needle.is_empty() || row.product_name.to_lowercase().contains(&needle))
        .collect()
}

/// Rows at or below their product's low-stock threshold
pub fn low_stock(rows: &[EnrichedRow]) -> Vec<LowStockItem> {
    rows.iter()
        .filter_map(|row| {
            let threshold = row.low_stock_threshold?;
            row.is_low_stock().then(|| LowStockItem {
                product_id: row.product_id.clone(),
                name: row.product_name.clone(),
                on_hand: row.on_hand(),
                threshold,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{EditBuffer, EditField, MemoryStore, PendingEdit};
    use crate::types::DayKey;
    use crate::validation::MAX_QUANTITY;
    use crate::models::{Product, ProductRef};
    use proptest::prelude::*;

    fn product(id: &str, name: &str, price: Option<i64>) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            category: None,
            cost_price: None,
            selling_price: price.map(Decimal::from),
            low_stock_threshold: None,
        }
    }

    fn record(product: Product) -> InventoryRecord {
        InventoryRecord {
            product: Some(ProductRef::Populated(product)),
            ..Default::default()
        }
    }

    fn counted(
        opening: i64,
        received: i64,
        transfer_in: i64,
        transfer_out: i64,
        closing: Option<i64>,
    ) -> InventoryRecord {
        InventoryRecord {
            opening: Some(opening),
            received_qty: Some(received),
            transfer_in_qty: Some(transfer_in),
            transfer_out_qty: Some(transfer_out),
            manual_closing: closing,
            ..record(product("p1", "Lager", Some(3)))
        }
    }

    #[test]
    fn test_worked_example() {
        let result = reconcile(&[counted(10, 5, 0, 2, Some(8))], &EditEntries::new());
        let row = &result.rows[0];

        assert_eq!(row.sales_qty, Some(5));
        assert_eq!(row.sales_amt, Some(Decimal::from(15)));
        assert_eq!(row.expected_closing, 8);
        assert_eq!(row.variance, Some(0));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_uncounted_row_has_no_sales_or_variance() {
        let result = reconcile(&[counted(10, 5, 1, 2, None)], &EditEntries::new());
        let row = &result.rows[0];

        assert_eq!(row.sales_qty, None);
        assert_eq!(row.sales_amt, None);
        assert_eq!(row.variance, None);
        assert_eq!(row.expected_closing, 14);

        let summary = summarize(&result.rows, None);
        assert_eq!(summary.total_expected_cash, Decimal::ZERO);
        assert_eq!(summary.uncounted_rows, 1);
        assert_eq!(summary.counted_rows, 0);
    }

    #[test]
    fn test_negative_server_quantities_read_as_zero() {
        let result = reconcile(&[counted(-5, 3, -1, -2, Some(-4))], &EditEntries::new());
        let row = &result.rows[0];

        assert_eq!(row.opening, 0);
        assert_eq!(row.transfer_in_qty, 0);
        assert_eq!(row.transfer_out_qty, 0);
        assert_eq!(row.manual_closing, Some(0));
        assert_eq!(row.sales_qty, Some(3));
        assert_eq!(row.expected_closing, 0);
    }

    #[test]
    fn test_huge_edit_does_not_overflow() {
        let pid = ProductId::new("p1");
        let records = [counted(10, i64::MAX, i64::MAX, 0, Some(0))];
        let mut buffer = EditBuffer::new(
            DayKey::new("bar", chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            MemoryStore::new(),
        );
        buffer.start_edit(pid.clone(), &records[0]);
        assert!(buffer.update_field(&pid, EditField::Opening, "1e30"));
        assert!(buffer.update_field(&pid, EditField::ReceivedQty, "99999999999999999999"));
        assert_eq!(buffer.get(&pid).unwrap().opening, MAX_QUANTITY);

        let result = reconcile(&records, buffer.entries());
        let row = &result.rows[0];
        assert_eq!(row.product_id, pid);
        assert_eq!(row.opening, MAX_QUANTITY);
        assert_eq!(row.sales_qty, Some(i64::MAX));
        assert_eq!(row.expected_closing, 0);

        let summary = summarize(&result.rows, Some(Decimal::ZERO));
        assert!(summary.shortage);
    }

    #[test]
    fn test_rows_sorted_by_name_case_insensitive() {
        let records = vec![
            record(product("1", "banana", Some(1))),
            record(product("2", "Apple", Some(1))),
            record(product("3", "cherry", Some(1))),
        ];
        let names: Vec<String> = reconcile(&records, &EditEntries::new())
            .rows
            .into_iter()
            .map(|r| r.product_name)
            .collect();

        assert_eq!(names, vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_names() {
        let records = vec![
            record(product("first", "Gin", Some(1))),
            record(product("second", "GIN", Some(1))),
            record(product("third", "gin", Some(1))),
        ];
        let ids: Vec<String> = reconcile(&records, &EditEntries::new())
            .rows
            .into_iter()
            .map(|r| r.product_id.0)
            .collect();

        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_edits_take_precedence() {
        let mut edits = EditEntries::new();
        edits.insert(
            ProductId::new("p1"),
            PendingEdit {
                opening: 20,
                received_qty: 0,
                manual_closing: 12,
            },
        );
        let result = reconcile(&[counted(10, 5, 0, 2, None)], &edits);
        let row = &result.rows[0];

        assert!(row.editing);
        assert_eq!(row.opening, 20);
        assert_eq!(row.received_qty, 0);
        assert_eq!(row.manual_closing, Some(12));
        assert_eq!(row.sales_qty, Some(6));
    }

    #[test]
    fn test_price_falls_back_to_product_then_zero() {
        let mut with_day_price = counted(1, 0, 0, 0, Some(0));
        with_day_price.selling_price = Some(Decimal::new(55, 1));
        let result = reconcile(&[with_day_price], &EditEntries::new());
        assert_eq!(result.rows[0].unit_price, Decimal::new(55, 1));

        let result = reconcile(&[counted(1, 0, 0, 0, Some(0))], &EditEntries::new());
        assert_eq!(result.rows[0].unit_price, Decimal::from(3));

        let unpriced = InventoryRecord {
            opening: Some(4),
            manual_closing: Some(1),
            ..record(product("p9", "Tonic", None))
        };
        let result = reconcile(&[unpriced], &EditEntries::new());
        assert_eq!(result.rows[0].sales_amt, Some(Decimal::ZERO));
        assert_eq!(
            result.warnings,
            vec![DataQualityWarning::MissingPrice {
                product_id: ProductId::new("p9")
            }]
        );
    }

    #[test]
    fn test_rows_without_product_are_excluded() {
        let bare = InventoryRecord {
            product: Some(ProductRef::Id(ProductId::new("p2"))),
            opening: Some(100),
            manual_closing: Some(0),
            ..Default::default()
        };
        let records = vec![InventoryRecord::default(), counted(10, 5, 0, 2, Some(8)), bare];
        let result = reconcile(&records, &EditEntries::new());

        assert_eq!(result.rows.len(), 1);
        assert_eq!(
            result.warnings,
            vec![
                DataQualityWarning::MissingProduct { index: 0 },
                DataQualityWarning::MissingProduct { index: 2 },
            ]
        );
        assert_eq!(
            summarize(&result.rows, None).total_expected_cash,
            Decimal::from(15)
        );
    }

    #[test]
    fn test_cash_variance() {
        let mut a = counted(50, 0, 0, 0, Some(30));
        a.selling_price = Some(Decimal::from(2));
        let mut b = counted(20, 0, 0, 0, Some(11));
        b.selling_price = Some(Decimal::new(5, 0));
        b.product = Some(ProductRef::Populated(product("p2", "Wine", None)));
        let result = reconcile(&[a, b], &EditEntries::new());

        let summary = summarize(&result.rows, Some(Decimal::from(100)));
        assert_eq!(summary.total_expected_cash, Decimal::from(85));
        assert_eq!(summary.cash_variance, Some(Decimal::from(15)));
        assert!(!summary.shortage);

        let short = summarize(&result.rows, Some(Decimal::from(80)));
        assert_eq!(short.cash_variance, Some(Decimal::from(-5)));
        assert!(short.shortage);

        let uncounted_cash = summarize(&result.rows, None);
        assert_eq!(uncounted_cash.cash_variance, None);
        assert!(!uncounted_cash.shortage);
    }

    #[test]
    fn test_gross_profit_uses_cost_price() {
        let mut lager = product("p1", "Lager", Some(5));
        lager.cost_price = Some(Decimal::from(2));
        let rec = InventoryRecord {
            opening: Some(10),
            manual_closing: Some(6),
            ..record(lager)
        };
        let result = reconcile(&[rec], &EditEntries::new());
        assert_eq!(result.rows[0].gross_profit, Some(Decimal::from(12)));

        let summary = summarize(&result.rows, None);
        assert_eq!(summary.cost_of_sales, Decimal::from(8));
        assert_eq!(summary.gross_profit, Decimal::from(12));
    }

    #[test]
    fn test_filter_rows_by_name() {
        let records = vec![
            record(product("1", "Pale Ale", Some(1))),
            record(product("2", "Lager", Some(1))),
            record(product("3", "IPA ale", Some(1))),
        ];
        let result = reconcile(&records, &EditEntries::new());

        let names: Vec<&str> = filter_rows(&result.rows, "ALE")
            .into_iter()
            .map(|r| r.product_name.as_str())
            .collect();
        assert_eq!(names, vec!["IPA ale", "Pale Ale"]);
        assert_eq!(filter_rows(&result.rows, "  ").len(), 3);
        assert!(filter_rows(&result.rows, "cider").is_empty());
    }

    #[test]
    fn test_low_stock_detection() {
        let mut tracked = product("1", "Vodka", Some(1));
        tracked.low_stock_threshold = Some(5);
        let mut plenty = product("2", "Rum", Some(1));
        plenty.low_stock_threshold = Some(5);
        let records = vec![
            InventoryRecord {
                opening: Some(10),
                manual_closing: Some(4),
                ..record(tracked)
            },
            InventoryRecord {
                opening: Some(12),
                ..record(plenty)
            },
            InventoryRecord {
                opening: Some(0),
                ..record(product("3", "Water", Some(1)))
            },
        ];
        let result = reconcile(&records, &EditEntries::new());

        assert_eq!(
            low_stock(&result.rows),
            vec![LowStockItem {
                product_id: ProductId::new("1"),
                name: "Vodka".to_string(),
                on_hand: 4,
                threshold: 5,
            }]
        );
    }

    fn qty() -> impl Strategy<Value = i64> {
        0i64..10_000
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// expected_closing = opening + received + in - (sales + out)
        #[test]
        fn prop_expected_closing_identity(
            opening in qty(),
            received in qty(),
            transfer_in in qty(),
            transfer_out in qty(),
            closing in prop::option::of(qty()),
        ) {
            let result = reconcile(
                &[counted(opening, received, transfer_in, transfer_out, closing)],
                &EditEntries::new(),
            );
            let row = &result.rows[0];
            let sales = row.sales_qty.unwrap_or(0);

            prop_assert_eq!(
                row.expected_closing,
                opening + received + transfer_in - (sales + transfer_out)
            );
            prop_assert_eq!(row.variance.is_none(), closing.is_none());
            if closing.is_some() {
                prop_assert_eq!(row.variance, Some(0));
            }
        }

        /// total_expected_cash = sum of sales_amt
        #[test]
        fn prop_expected_cash_is_sum_of_sales(
            rows in prop::collection::vec((qty(), prop::option::of(qty()), 0i64..100), 0..20),
            cash in 0i64..1_000_000,
        ) {
            let records: Vec<InventoryRecord> = rows
                .iter()
                .enumerate()
                .map(|(i, (opening, closing, price))| InventoryRecord {
                    opening: Some(*opening),
                    manual_closing: *closing,
                    ..record(product(&i.to_string(), &format!("item {i}"), Some(*price)))
                })
                .collect();
            let result = reconcile(&records, &EditEntries::new());
            let summary = summarize(&result.rows, Some(Decimal::from(cash)));

            let expected: Decimal = result.rows.iter().filter_map(|r| r.sales_amt).sum();
            prop_assert_eq!(summary.total_expected_cash, expected);
            prop_assert_eq!(summary.cash_variance, Some(Decimal::from(cash) - expected));
        }

        #[test]
        fn prop_rows_sorted_case_insensitive(names in prop::collection::vec("[a-zA-Z]{1,8}", 0..15)) {
            let records: Vec<InventoryRecord> = names
                .iter()
                .enumerate()
                .map(|(i, name)| record(product(&i.to_string(), name, Some(1))))
                .collect();
            let rows = reconcile(&records, &EditEntries::new()).rows;

            prop_assert_eq!(rows.len(), names.len());
            for pair in rows.windows(2) {
                prop_assert!(pair[0].product_name.to_lowercase() <= pair[1].product_name.to_lowercase());
            }
        }
    }
}
