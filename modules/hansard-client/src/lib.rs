pub mod error;
pub mod throttle;

pub use error::{classify_status, HansardError, Result};
pub use throttle::{with_retry, FetchOutcome, RateLimiter, RetryPolicy};

use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde_json::Value;

pub const BASE_URL: &str = hansard_common::config::DEFAULT_BASE_URL;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Lowercase three-letter month slug used in Hansard paths.
pub fn month_slug(date: NaiveDate) -> &'static str {
    MONTHS[date.month0() as usize]
}

/// `/sittings/1905/aug/10`
pub fn sitting_path(date: NaiveDate) -> String {
    format!(
        "/sittings/{}/{}/{:02}",
        date.year(),
        month_slug(date),
        date.day()
    )
}

/// Human-readable page for a debate reference.
pub fn hansard_url(base_url: &str, href: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), normalize_href(href))
}

/// Machine-readable document for a debate reference.
pub fn json_url(base_url: &str, href: &str) -> String {
    format!("{}.js", hansard_url(base_url, href))
}

fn normalize_href(href: &str) -> String {
    let trimmed = href.trim().trim_end_matches(".js");
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Client for the historic Hansard JSON endpoints. No authentication.
pub struct HansardClient {
    client: reqwest::Client,
    base_url: String,
}

impl HansardClient {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HansardError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn sitting_index_url(&self, date: NaiveDate) -> String {
        format!("{}{}.js", self.base_url, sitting_path(date))
    }

    /// Fetch one day's sitting index. `NotFound` means Parliament did not sit.
    pub async fn sitting_index(&self, date: NaiveDate) -> Result<Value> {
        let url = self.sitting_index_url(date);
        self.get_json(&url).await
    }

    /// Fetch the nested document tree for one debate.
    pub async fn debate(&self, href: &str) -> Result<Value> {
        let url = json_url(&self.base_url, href);
        self.get_json(&url).await
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        tracing::debug!(url, "GET");
        let resp = self.client.get(url).send().await?;

        if let Some(err) = classify_status(resp.status().as_u16(), url) {
            return Err(err);
        }

        let bytes = resp.bytes().await?;
        let value: Value = serde_json::from_slice(&bytes)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn sitting_path_pads_day() {
        assert_eq!(sitting_path(d(1905, 8, 1)), "/sittings/1905/aug/01");
        assert_eq!(sitting_path(d(1920, 12, 15)), "/sittings/1920/dec/15");
    }

    #[test]
    fn debate_urls() {
        let href = "/commons/1905/aug/10/aliens-bill";
        assert_eq!(
            hansard_url(BASE_URL, href),
            "https://api.parliament.uk/historic-hansard/commons/1905/aug/10/aliens-bill"
        );
        assert_eq!(
            json_url("https://example.org/", "commons/1905/aug/10/aliens-bill.js"),
            "https://example.org/commons/1905/aug/10/aliens-bill.js"
        );
    }

    #[test]
    fn bad_user_agent_is_a_setup_error() {
        match HansardClient::new(BASE_URL, "bad\nagent", Duration::from_secs(1)) {
            Err(err) => {
                assert!(matches!(err, HansardError::Client(_)), "{err}");
                assert!(!err.is_retryable());
            }
            Ok(_) => panic!("client built with an invalid user agent"),
        }
    }

    #[test]
    fn index_url_uses_base() {
        let client =
            HansardClient::new("https://example.org/", "test", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.sitting_index_url(d(1905, 8, 10)),
            "https://example.org/sittings/1905/aug/10.js"
        );
    }
}
