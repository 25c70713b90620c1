use chrono::NaiveDate;
use serde::Deserialize;

use tally_core::{Category, Error, Transaction, active_snapshot};

use crate::session::LedgerApi;

/// Fixed page size for the transaction fetch. The server caps one response
/// at this many rows and there is no pagination in this client: anything
/// beyond the first page is silently truncated. Narrow the date range to
/// stay under it.
pub const PAGE_SIZE: usize = 200;

pub struct LedgerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LedgerClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Non-archived, non-group categories, in ledger order.
    pub async fn active_categories(&self) -> Result<Vec<Category>, Error> {
        #[derive(Deserialize)]
        struct Resp {
            categories: Vec<Category>,
        }

        let resp = self
            .client
            .get(format!("{}/categories", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(request_error)?;
        let resp = check_status(resp).await?;
        let out: Resp = resp.json().await.map_err(request_error)?;
        Ok(active_snapshot(&out.categories))
    }

    /// Uncategorized, non-parent transactions in the inclusive date range.
    /// Server-side filtered; bounded by [`PAGE_SIZE`] (see there).
    pub async fn uncategorized_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, Error> {
        #[derive(Deserialize)]
        struct Resp {
            transactions: Vec<Transaction>,
        }

        let resp = self
            .client
            .get(format!("{}/transactions", self.base_url))
            .header("X-Api-Key", &self.api_key)
            .query(&transactions_query(start, end))
            .send()
            .await
            .map_err(request_error)?;
        let resp = check_status(resp).await?;
        let out: Resp = resp.json().await.map_err(request_error)?;
        Ok(out
            .transactions
            .into_iter()
            .filter(Transaction::is_eligible)
            .collect())
    }

    /// Assign a category. Idempotent on the server; failure leaves the
    /// remote row unchanged.
    pub async fn set_category(&self, transaction_id: i64, category_id: i64) -> Result<(), Error> {
        let resp = self
            .client
            .patch(format!("{}/transactions/{}", self.base_url, transaction_id))
            .header("X-Api-Key", &self.api_key)
            .json(&serde_json::json!({ "categoryId": category_id }))
            .send()
            .await
            .map_err(request_error)?;
        check_status(resp).await?;
        Ok(())
    }
}

impl LedgerApi for LedgerClient {
    async fn active_categories(&self) -> Result<Vec<Category>, Error> {
        LedgerClient::active_categories(self).await
    }

    async fn uncategorized_transactions(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, Error> {
        LedgerClient::uncategorized_transactions(self, start, end).await
    }

    async fn set_category(&self, transaction_id: i64, category_id: i64) -> Result<(), Error> {
        LedgerClient::set_category(self, transaction_id, category_id).await
    }
}

fn transactions_query(start: NaiveDate, end: NaiveDate) -> [(&'static str, String); 4] {
    [
        ("start", start.format("%Y-%m-%d").to_string()),
        ("end", end.format("%Y-%m-%d").to_string()),
        ("uncategorized", "true".to_string()),
        ("limit", PAGE_SIZE.to_string()),
    ]
}

fn request_error(err: reqwest::Error) -> Error {
    Error::transport(err.status().map(|s| s.as_u16()), err.to_string())
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::transport(Some(status.as_u16()), body))
}
