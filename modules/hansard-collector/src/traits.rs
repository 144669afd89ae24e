// Upstream seam for the crawler.
//
// HansardSource hides the HTTP client so a day can be processed against
// MockSource in tests: no network, deterministic failures, call counting.

use async_trait::async_trait;
use chrono::NaiveDate;
use hansard_client::{HansardClient, Result};
use serde_json::Value;

#[async_trait]
pub trait HansardSource: Send + Sync {
    /// Base URL used to derive `hansard_url` / `json_url` for quotes.
    fn base_url(&self) -> &str;

    /// One day's sitting index. `NotFound` means no sitting.
    async fn sitting_index(&self, date: NaiveDate) -> Result<Value>;

    /// The document tree for one debate href.
    async fn debate(&self, href: &str) -> Result<Value>;
}

#[async_trait]
impl HansardSource for HansardClient {
    fn base_url(&self) -> &str {
        HansardClient::base_url(self)
    }

    async fn sitting_index(&self, date: NaiveDate) -> Result<Value> {
        HansardClient::sitting_index(self, date).await
    }

    async fn debate(&self, href: &str) -> Result<Value> {
        HansardClient::debate(self, href).await
    }
}
