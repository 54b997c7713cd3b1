//! WebAssembly module for the bar inventory table
//!
//! Runs the reconciliation engine, the pending-edit buffer and the access
//! policy in the browser. Network calls stay in JavaScript: the table hands
//! out request payloads and takes the backend's responses back as JSON.

mod storage;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    can_edit_as, can_record_cash, coerce_amount, coerce_quantity, filter_rows, format_date,
    load_cash_count, low_stock, merge_updated, parse_business_date, reconcile, save_cash_count,
    summarize, validate_transfer_request, BarId, BulkUpsertResponse, DataQualityWarning, DayKey,
    DaySummary, EditBuffer, EditEntries, EditField, InventoryPage, InventoryRecord, LowStockItem,
    Mutation, ProductId, Reconciliation, Role, TransferRequest,
};
use wasm_bindgen::prelude::*;

pub use storage::BrowserStore;

/// Records as returned by the listing endpoint, bare or wrapped in `data`
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsPayload {
    Rows(Vec<InventoryRecord>),
    Page(InventoryPage),
}

impl RecordsPayload {
    fn into_records(self) -> Vec<InventoryRecord> {
        match self {
            RecordsPayload::Rows(rows) => rows,
            RecordsPayload::Page(page) => page.data,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TableView {
    bar_id: BarId,
    date: String,
    #[serde(flatten)]
    reconciliation: Reconciliation,
    summary: DaySummary,
    low_stock: Vec<LowStockItem>,
    editable: bool,
    pending_edits: usize,
}

/// Inventory table state of one user on one bar-day
#[wasm_bindgen]
pub struct InventoryTable {
    day: DayKey,
    today: NaiveDate,
    role: Option<Role>,
    records: Vec<InventoryRecord>,
    buffer: EditBuffer<BrowserStore>,
    cash_count: Option<Decimal>,
    /// Entries carried by the save request awaiting a response
    in_flight: Option<EditEntries>,
}

#[wasm_bindgen]
impl InventoryTable {
    /// Open the table for a bar-day. `today` defaults to the browser's local
    /// date.
    #[wasm_bindgen(constructor)]
    pub fn new(
        bar_id: &str,
        date: &str,
        role: Option<String>,
        today: Option<String>,
    ) -> Result<InventoryTable, JsValue> {
        let today = match today {
            Some(today) => today,
            None => format_date(browser_today().ok_or_else(|| JsValue::from_str("Invalid clock"))?),
        };
        Self::open(bar_id, date, role.as_deref(), &today, BrowserStore::local())
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Replace the day's rows with the listing response
    #[wasm_bindgen(js_name = loadRecords)]
    pub fn load_records(&mut self, records_json: &str) -> Result<usize, JsValue> {
        self.replace_records(records_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Reconciled rows, day summary and alerts as JSON
    pub fn view(&self) -> Result<String, JsValue> {
        self.view_json().map_err(|e| JsValue::from_str(&e))
    }

    /// Reconciled rows whose product name contains `term`
    pub fn search(&self, term: &str) -> Result<String, JsValue> {
        self.search_json(term).map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = canEdit)]
    pub fn can_edit(&self) -> bool {
        can_edit_as(self.role, self.day.date, self.today)
    }

    #[wasm_bindgen(js_name = pendingCount)]
    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    #[wasm_bindgen(js_name = startEdit)]
    pub fn start_edit(&mut self, product_id: &str) -> String {
        mutation_label(self.begin_edit(&ProductId::new(product_id)))
    }

    /// Change one field from raw input; `field` is `opening`, `receivedQty`
    /// or `manualClosing`
    #[wasm_bindgen(js_name = updateField)]
    pub fn update_field(&mut self, product_id: &str, field: &str, raw: &str) -> Result<String, JsValue> {
        self.set_field(&ProductId::new(product_id), field, raw)
            .map(mutation_label)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = cancelEdit)]
    pub fn cancel_edit(&mut self, product_id: &str) -> String {
        mutation_label(self.discard_edit(&ProductId::new(product_id)))
    }

    /// Body of the bulk upsert, or `undefined` when nothing is pending.
    /// Throws while an earlier save has not been answered.
    #[wasm_bindgen(js_name = flushPayload)]
    pub fn flush_payload(&mut self) -> Result<Option<String>, JsValue> {
        self.bulk_payload().map_err(|e| JsValue::from_str(&e))
    }

    /// Take a successful bulk upsert response: merge the rows and drop the
    /// edits that request carried. Edits made meanwhile stay pending.
    #[wasm_bindgen(js_name = applyFlushResponse)]
    pub fn apply_flush_response(&mut self, response_json: &str) -> Result<usize, JsValue> {
        self.merge_saved(response_json)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// The save request failed; every pending edit is kept for a retry
    #[wasm_bindgen(js_name = flushFailed)]
    pub fn flush_failed(&mut self) -> bool {
        self.abandon_flush()
    }

    #[wasm_bindgen(js_name = isSaving)]
    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    #[wasm_bindgen(js_name = recordCashCount)]
    pub fn record_cash_count(&mut self, raw: &str) -> String {
        mutation_label(self.set_cash_count(raw))
    }

    /// Move to another bar-day; call `loadRecords` with its listing next
    #[wasm_bindgen(js_name = switchDay)]
    pub fn switch_day(&mut self, bar_id: &str, date: &str) -> Result<usize, JsValue> {
        self.change_day(bar_id, date)
            .map_err(|e| JsValue::from_str(&e))
    }

    /// Validated body of a transfer request from the current bar
    #[wasm_bindgen(js_name = transferPayload)]
    pub fn transfer_payload(&self, product_id: &str, to_bar: &str, qty: f64) -> Result<String, JsValue> {
        self.transfer_json(product_id, to_bar, qty)
            .map_err(|e| JsValue::from_str(&e))
    }
}

impl InventoryTable {
    pub fn open(
        bar_id: &str,
        date: &str,
        role: Option<&str>,
        today: &str,
        store: BrowserStore,
    ) -> Result<Self, String> {
        let day = DayKey::new(bar_id, parse_business_date(date)?);
        let today = parse_business_date(today)?;

        let mut buffer = EditBuffer::new(day.clone(), store);
        if buffer.restore().is_err() {
            web_warn("Discarded unreadable pending edits");
        }
        let cash_count = load_cash_count(buffer.store(), &day);

        Ok(Self {
            day,
            today,
            role: Role::resolve(role),
            records: Vec::new(),
            buffer,
            cash_count,
            in_flight: None,
        })
    }

    pub fn replace_records(&mut self, records_json: &str) -> Result<usize, String> {
        let payload: RecordsPayload = serde_json::from_str(records_json)
            .map_err(|e| format!("Invalid inventory JSON: {}", e))?;
        self.records = payload.into_records();
        Ok(self.records.len())
    }

    pub fn view_json(&self) -> Result<String, String> {
        let reconciliation = reconcile(&self.records, self.buffer.entries());
        let summary = summarize(&reconciliation.rows, self.cash_count);
        let low_stock = low_stock(&reconciliation.rows);

        let view = TableView {
            bar_id: self.day.bar_id.clone(),
            date: format_date(self.day.date),
            reconciliation,
            summary,
            low_stock,
            editable: self.can_edit(),
            pending_edits: self.buffer.len(),
        };
        serde_json::to_string(&view).map_err(|e| e.to_string())
    }

    pub fn search_json(&self, term: &str) -> Result<String, String> {
        let reconciliation = reconcile(&self.records, self.buffer.entries());
        serde_json::to_string(&filter_rows(&reconciliation.rows, term)).map_err(|e| e.to_string())
    }

    pub fn begin_edit(&mut self, product_id: &ProductId) -> Mutation {
        if !self.can_edit() {
            return Mutation::Denied;
        }
        let Some(record) = self
            .records
            .iter()
            .find(|record| record.product_id() == Some(product_id))
        else {
            return Mutation::UnknownProduct;
        };
        let record = record.clone();
        self.buffer.start_edit(product_id.clone(), &record);
        Mutation::Applied
    }

    pub fn set_field(&mut self, product_id: &ProductId, field: &str, raw: &str) -> Result<Mutation, String> {
        let field: EditField = field.parse().map_err(|e: &str| e.to_string())?;
        if !self.can_edit() {
            return Ok(Mutation::Denied);
        }
        Ok(if self.buffer.update_field(product_id, field, raw) {
            Mutation::Applied
        } else {
            Mutation::NotEditing
        })
    }

    pub fn discard_edit(&mut self, product_id: &ProductId) -> Mutation {
        if self.buffer.cancel_edit(product_id) {
            Mutation::Applied
        } else {
            Mutation::NotEditing
        }
    }

    pub fn bulk_payload(&mut self) -> Result<Option<String>, String> {
        if !self.can_edit() {
            return Err("Not allowed to edit this day".to_string());
        }
        if self.in_flight.is_some() {
            return Err("A save is already in progress".to_string());
        }
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let payload = serde_json::to_string(&self.buffer.bulk_request()).map_err(|e| e.to_string())?;
        self.in_flight = Some(self.buffer.entries().clone());
        Ok(Some(payload))
    }

    pub fn merge_saved(&mut self, response_json: &str) -> Result<usize, String> {
        if self.in_flight.is_none() {
            return Err("No save in progress".to_string());
        }
        let response: BulkUpsertResponse = serde_json::from_str(response_json)
            .map_err(|e| format!("Invalid bulk upsert response: {}", e))?;
        let updated = response.updated.len();
        if let Some(sent) = self.in_flight.take() {
            self.buffer.settle(&sent);
        }
        merge_updated(&mut self.records, response.updated);
        Ok(updated)
    }

    pub fn abandon_flush(&mut self) -> bool {
        self.in_flight.take().is_some()
    }

    pub fn set_cash_count(&mut self, raw: &str) -> Mutation {
        if !can_record_cash(self.role) {
            return Mutation::Denied;
        }
        let amount = coerce_amount(raw);
        save_cash_count(self.buffer.store_mut(), &self.day, amount);
        self.cash_count = Some(amount);
        Mutation::Applied
    }

    pub fn change_day(&mut self, bar_id: &str, date: &str) -> Result<usize, String> {
        let day = DayKey::new(bar_id, parse_business_date(date)?);
        let restored = match self.buffer.switch_day(day.clone()) {
            Ok(restored) => restored,
            Err(_) => {
                web_warn("Discarded unreadable pending edits");
                0
            }
        };
        self.cash_count = load_cash_count(self.buffer.store(), &day);
        self.day = day;
        self.records.clear();
        self.in_flight = None;
        Ok(restored)
    }

    pub fn transfer_json(&self, product_id: &str, to_bar: &str, qty: f64) -> Result<String, String> {
        if !qty.is_finite() || qty.fract() != 0.0 {
            return Err("Quantity must be a whole number".to_string());
        }
        let request = TransferRequest {
            product_id: ProductId::new(product_id),
            qty: qty as i64,
            from_bar: self.day.bar_id.clone(),
            to_bar: BarId::new(to_bar),
            date: self.day.date,
        };
        validate_transfer_request(&request)?;
        serde_json::to_string(&request).map_err(|e| e.to_string())
    }
}

/// Reconcile records with a map of pending edits, both as JSON
#[wasm_bindgen(js_name = reconcileInventory)]
pub fn reconcile_inventory(records_json: &str, edits_json: &str) -> Result<String, JsValue> {
    reconcile_json(records_json, edits_json).map_err(|e| JsValue::from_str(&e))
}

fn reconcile_json(records_json: &str, edits_json: &str) -> Result<String, String> {
    let records = serde_json::from_str::<RecordsPayload>(records_json)
        .map_err(|e| format!("Invalid inventory JSON: {}", e))?
        .into_records();
    let edits: EditEntries = if edits_json.trim().is_empty() {
        EditEntries::new()
    } else {
        serde_json::from_str(edits_json).map_err(|e| format!("Invalid edits JSON: {}", e))?
    };

    let reconciliation = reconcile(&records, &edits);
    for warning in &reconciliation.warnings {
        if let DataQualityWarning::MissingProduct { index } = warning {
            web_warn(&format!("Inventory row {} has no product", index));
        }
    }
    serde_json::to_string(&reconciliation).map_err(|e| e.to_string())
}

/// Whether `role` may edit inventory recorded on `record_date`
#[wasm_bindgen(js_name = canEditInventory)]
pub fn can_edit_inventory(role: Option<String>, record_date: &str, today: &str) -> bool {
    match (parse_business_date(record_date), parse_business_date(today)) {
        (Ok(record_date), Ok(today)) => can_edit_as(Role::resolve(role.as_deref()), record_date, today),
        _ => false,
    }
}

/// Coerce raw quantity input the way the table does
#[wasm_bindgen(js_name = parseQuantity)]
pub fn parse_quantity(raw: &str) -> f64 {
    coerce_quantity(raw) as f64
}

fn mutation_label(mutation: Mutation) -> String {
    match mutation {
        Mutation::Applied => "applied",
        Mutation::Denied => "denied",
        Mutation::NotEditing => "not_editing",
        Mutation::UnknownProduct => "unknown_product",
    }
    .to_string()
}

fn browser_today() -> Option<NaiveDate> {
    let now = js_sys::Date::new_0();
    NaiveDate::from_ymd_opt(now.get_full_year() as i32, now.get_month() + 1, now.get_date())
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn web_warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(message));
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn web_warn(_message: &str) {}
