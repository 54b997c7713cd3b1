//! Inventory session for one bar-day
//!
//! Wires the pending-edit buffer, the reconciliation engine and the access
//! policy to the inventory service:
//!
//! server rows → pending edits merged over them → derived figures → view,
//! and on save the pending edits go back in one bulk upsert.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    can_edit_as, can_record_cash, coerce_amount, load_cash_count, low_stock, merge_updated,
    reconcile, save_cash_count, summarize, validate_transfer_request, BarId, DataQualityWarning,
    DayKey, DaySummary, EditBuffer, EditField, InventoryRecord, KeyValueStore, LowStockItem, Mutation,
    ProductId, Reconciliation, TransferId, TransferRecord, TransferRequest, TransferStatus,
};
use tracing::{info, warn};

use crate::config::SessionContext;
use crate::error::{ClientError, ClientResult};
use crate::external::InventoryApi;

/// Result of saving the pending edits
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// The backend accepted the edits; these rows were written
    Saved(Vec<InventoryRecord>),
    /// There was nothing to save; no request was sent
    NothingToSave,
    /// The access policy refused the save; the edits are kept
    Denied,
}

/// Everything the table needs to render one day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    #[serde(flatten)]
    pub reconciliation: Reconciliation,
    pub summary: DaySummary,
    pub low_stock: Vec<LowStockItem>,
    pub editable: bool,
    pub pending_edits: usize,
}

/// Stateful inventory session of one user on one bar-day
pub struct InventorySession<A, S> {
    api: A,
    context: SessionContext,
    records: Vec<InventoryRecord>,
    buffer: EditBuffer<S>,
    cash_count: Option<Decimal>,
}

impl<A, S> InventorySession<A, S>
where
    A: InventoryApi,
    S: KeyValueStore,
{
    /// Open a session, restoring edits left over from an earlier one.
    /// Call [`load`](Self::load) to fetch the day's rows.
    pub fn new(api: A, context: SessionContext, store: S) -> Self {
        let mut buffer = EditBuffer::new(context.day.clone(), store);
        restore_buffer(&mut buffer);
        let cash_count = load_cash_count(buffer.store(), &context.day);

        Self {
            api,
            context,
            records: Vec::new(),
            buffer,
            cash_count,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn day(&self) -> &DayKey {
        &self.context.day
    }

    pub fn records(&self) -> &[InventoryRecord] {
        &self.records
    }

    pub fn buffer(&self) -> &EditBuffer<S> {
        &self.buffer
    }

    pub fn cash_count(&self) -> Option<Decimal> {
        self.cash_count
    }

    /// Rows with unsaved edits, for the "N rows unsaved" banner
    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the current user may change this day
    pub fn can_edit(&self) -> bool {
        can_edit_as(self.context.role, self.context.day.date, self.context.today)
    }

    /// Fetch the day's rows from the backend, replacing local rows
    pub async fn load(&mut self) -> ClientResult<()> {
        let day = &self.context.day;
        let records = self.api.fetch_inventory(&day.bar_id, day.date).await?;
        info!(day = %day, rows = records.len(), "Fetched inventory");
        self.records = records;
        Ok(())
    }

    /// Move to another bar-day. Pending edits of the current day stay
    /// persisted under their own key.
    pub async fn switch_day(&mut self, day: DayKey) -> ClientResult<()> {
        if let Err(err) = self.buffer.switch_day(day.clone()) {
            warn!(error = %err, "Discarded unreadable pending edits");
        }
        self.cash_count = load_cash_count(self.buffer.store(), &day);
        self.context.day = day;
        self.records.clear();
        self.load().await
    }

    /// Start editing a row
    pub fn start_edit(&mut self, product_id: &ProductId) -> Mutation {
        if !self.can_edit() {
            return Mutation::Denied;
        }
        let Some(record) = self.find_record(product_id) else {
            return Mutation::UnknownProduct;
        };
        let record = record.clone();
        self.buffer.start_edit(product_id.clone(), &record);
        Mutation::Applied
    }

    /// Change one field of a row being edited, from raw form input
    pub fn update_field(&mut self, product_id: &ProductId, field: EditField, raw: &str) -> Mutation {
        if !self.can_edit() {
            return Mutation::Denied;
        }
        if self.buffer.update_field(product_id, field, raw) {
            Mutation::Applied
        } else {
            Mutation::NotEditing
        }
    }

    /// Discard the unsaved edits of a row.
    ///
    /// Always permitted: dropping local edits never reaches the backend.
    pub fn cancel_edit(&mut self, product_id: &ProductId) -> Mutation {
        if self.buffer.cancel_edit(product_id) {
            Mutation::Applied
        } else {
            Mutation::NotEditing
        }
    }

    /// Save every pending edit of the day in one bulk upsert.
    ///
    /// On success the buffer is cleared and the returned rows are merged into
    /// the local day. On failure nothing changes and the error is returned so
    /// the user can retry.
    pub async fn flush(&mut self) -> ClientResult<FlushOutcome> {
        if !self.can_edit() {
            return Ok(FlushOutcome::Denied);
        }
        if self.buffer.is_empty() {
            return Ok(FlushOutcome::NothingToSave);
        }

        let request = self.buffer.bulk_request();
        let response = match self.api.bulk_upsert_inventory(&request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    day = %self.context.day,
                    items = request.items.len(),
                    error = %err,
                    "Bulk upsert failed; edits kept"
                );
                return Err(err);
            }
        };

        info!(
            day = %self.context.day,
            items = request.items.len(),
            updated = response.updated.len(),
            "Saved pending edits"
        );
        self.buffer.clear();
        merge_updated(&mut self.records, response.updated.clone());
        Ok(FlushOutcome::Saved(response.updated))
    }

    /// Reconcile the current rows with the pending edits
    pub fn reconcile(&self) -> Reconciliation {
        let reconciliation = reconcile(&self.records, self.buffer.entries());
        log_warnings(&self.context.day, &reconciliation.warnings);
        reconciliation
    }

    /// Reconciled rows plus the day summary and alerts
    pub fn view(&self) -> DayView {
        let reconciliation = self.reconcile();
        let summary = summarize(&reconciliation.rows, self.cash_count);
        let low_stock = low_stock(&reconciliation.rows);

        DayView {
            reconciliation,
            summary,
            low_stock,
            editable: self.can_edit(),
            pending_edits: self.pending_count(),
        }
    }

    /// Record the counted cash of the day (admin only)
    pub fn record_cash_count(&mut self, raw: &str) -> Mutation {
        if !can_record_cash(self.context.role) {
            return Mutation::Denied;
        }
        let amount = coerce_amount(raw);
        save_cash_count(self.buffer.store_mut(), &self.context.day, amount);
        self.cash_count = Some(amount);
        Mutation::Applied
    }

    /// File a transfer of stock from this bar to another, then refresh the day
    pub async fn request_transfer(
        &mut self,
        product_id: &ProductId,
        to_bar: &BarId,
        qty: i64,
    ) -> ClientResult<TransferRecord> {
        let request = TransferRequest {
            product_id: product_id.clone(),
            qty,
            from_bar: self.context.day.bar_id.clone(),
            to_bar: to_bar.clone(),
            date: self.context.day.date,
        };
        validate_transfer_request(&request).map_err(|message| ClientError::Validation {
            field: "transfer".to_string(),
            message: message.to_string(),
        })?;

        let transfer = self.api.request_transfer(&request).await?;
        info!(transfer = %transfer.id, product = %product_id, to = %to_bar, qty, "Requested transfer");
        self.load().await?;
        Ok(transfer)
    }

    /// Transfers awaiting a decision
    pub async fn pending_transfers(&self) -> ClientResult<Vec<TransferRecord>> {
        self.api.fetch_transfers(TransferStatus::Pending).await
    }

    /// Approve a transfer effective on the session's date. The backend moves
    /// the stock, so the day is re-fetched.
    pub async fn approve_transfer(&mut self, id: &TransferId) -> ClientResult<TransferRecord> {
        let transfer = self.api.approve_transfer(id, self.context.day.date).await?;
        info!(transfer = %id, date = %self.context.day.date, "Approved transfer");
        self.load().await?;
        Ok(transfer)
    }

    pub async fn reject_transfer(&self, id: &TransferId) -> ClientResult<TransferRecord> {
        let transfer = self.api.reject_transfer(id).await?;
        info!(transfer = %id, "Rejected transfer");
        Ok(transfer)
    }

    fn find_record(&self, product_id: &ProductId) -> Option<&InventoryRecord> {
        self.records
            .iter()
            .find(|record| record.product_id() == Some(product_id))
    }
}

fn restore_buffer<S: KeyValueStore>(buffer: &mut EditBuffer<S>) {
    match buffer.restore() {
        Ok(0) => {}
        Ok(count) => info!(day = %buffer.key(), pending = count, "Restored pending edits"),
        Err(err) => warn!(error = %err, "Discarded unreadable pending edits"),
    }
}

fn log_warnings(day: &DayKey, warnings: &[DataQualityWarning]) {
    for warning in warnings {
        match warning {
            DataQualityWarning::MissingProduct { index } => {
                warn!(day = %day, index, "Inventory row without product excluded")
            }
            DataQualityWarning::MissingPrice { product_id } => {
                warn!(day = %day, product = %product_id, "No selling price; counted at zero")
            }
        }
    }
}
