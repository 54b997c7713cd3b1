//! Inventory service API client
//!
//! Talks to the REST backend that owns inventory records, bulk upserts and
//! the transfer workflow.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::{
    format_date, BarId, BulkUpsertRequest, BulkUpsertResponse, InventoryPage, InventoryRecord,
    TransferId, TransferRecord, TransferRequest, TransferStatus,
};

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};

/// Operations of the backend inventory service
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Rows of one bar on one day
    async fn fetch_inventory(&self, bar_id: &BarId, date: NaiveDate)
        -> ClientResult<Vec<InventoryRecord>>;

    /// Write every edited row of a day in one request
    async fn bulk_upsert_inventory(
        &self,
        request: &BulkUpsertRequest,
    ) -> ClientResult<BulkUpsertResponse>;

    async fn request_transfer(&self, request: &TransferRequest) -> ClientResult<TransferRecord>;

    async fn fetch_transfers(&self, status: TransferStatus) -> ClientResult<Vec<TransferRecord>>;

    async fn approve_transfer(&self, id: &TransferId, date: NaiveDate)
        -> ClientResult<TransferRecord>;

    async fn reject_transfer(&self, id: &TransferId) -> ClientResult<TransferRecord>;
}

/// `reqwest`-backed implementation of [`InventoryApi`]
#[derive(Clone)]
pub struct HttpInventoryApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

/// Error body returned by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    field: Option<String>,
}

impl HttpInventoryApi {
    /// Create a client from configuration
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(&config.base_url),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, url: String, builder: RequestBuilder) -> ClientResult<T> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response.json::<T>().await.map_err(|e| ClientError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryApi {
    async fn fetch_inventory(
        &self,
        bar_id: &BarId,
        date: NaiveDate,
    ) -> ClientResult<Vec<InventoryRecord>> {
        let url = self.url("/inventory");
        let builder = self
            .client
            .get(&url)
            .query(&[("barId", bar_id.as_str()), ("date", format_date(date).as_str())]);
        let page: InventoryPage = self.send(url, builder).await?;
        Ok(page.data)
    }

    async fn bulk_upsert_inventory(
        &self,
        request: &BulkUpsertRequest,
    ) -> ClientResult<BulkUpsertResponse> {
        let url = self.url("/inventory/bulk-upsert");
        let builder = self.client.post(&url).json(request);
        self.send(url, builder).await
    }

    async fn request_transfer(&self, request: &TransferRequest) -> ClientResult<TransferRecord> {
        let url = self.url("/transfers");
        let builder = self.client.post(&url).json(request);
        self.send(url, builder).await
    }

    async fn fetch_transfers(&self, status: TransferStatus) -> ClientResult<Vec<TransferRecord>> {
        let url = self.url("/transfers");
        let builder = self.client.get(&url).query(&[("status", status.as_str())]);
        self.send(url, builder).await
    }

    async fn approve_transfer(
        &self,
        id: &TransferId,
        date: NaiveDate,
    ) -> ClientResult<TransferRecord> {
        let url = self.url(&format!("/transfers/{}/approve", id));
        let builder = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "date": format_date(date) }));
        self.send(url, builder).await
    }

    async fn reject_transfer(&self, id: &TransferId) -> ClientResult<TransferRecord> {
        let url = self.url(&format!("/transfers/{}/reject", id));
        let builder = self.client.put(&url).json(&serde_json::json!({}));
        self.send(url, builder).await
    }
}

/// Normalise the backend URL: add a scheme, strip trailing slashes and a
/// trailing `/api` segment.
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/api").unwrap_or(trimmed);
    trimmed.trim_end_matches('/').to_string()
}

fn transport_error(url: &str, err: &reqwest::Error) -> ClientError {
    if err.is_timeout() {
        return ClientError::Timeout {
            url: url.to_string(),
        };
    }
    ClientError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Map a non-success response to an error
fn status_error(status: StatusCode, body: &str) -> ClientError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let field = parsed.as_ref().and_then(|b| b.field.clone());
    let message = parsed
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Validation {
            field: field.unwrap_or_default(),
            message,
        },
        _ => ClientError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
