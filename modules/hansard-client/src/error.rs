use thiserror::Error;

pub type Result<T> = std::result::Result<T, HansardError>;

#[derive(Debug, Error)]
pub enum HansardError {
    /// 404: the resource does not exist (no sitting that day). Never retried.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network failure, timeout, 429 or 5xx. Retried with backoff.
    #[error("Transient error fetching {url}: {message}")]
    Transient { url: String, message: String },

    /// Any other non-success status. Not retried.
    #[error("API error (status {status}) for {url}")]
    Api { status: u16, url: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// The HTTP client itself could not be built (bad user agent, TLS setup).
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl HansardError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, HansardError::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HansardError::NotFound(_))
    }

    pub fn transient(url: &str, message: impl Into<String>) -> Self {
        HansardError::Transient {
            url: url.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for HansardError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_decode() {
            return HansardError::Parse(err.to_string());
        }
        if let Some(status) = err.status() {
            return classify_status(status.as_u16(), &url)
                .unwrap_or_else(|| HansardError::transient(&url, err.to_string()));
        }
        // Timeouts, connection resets, DNS: all worth another try.
        HansardError::transient(&url, err.to_string())
    }
}

impl From<serde_json::Error> for HansardError {
    fn from(err: serde_json::Error) -> Self {
        HansardError::Parse(err.to_string())
    }
}

/// Map a non-success HTTP status to an error. Returns `None` for 2xx.
pub fn classify_status(status: u16, url: &str) -> Option<HansardError> {
    match status {
        200..=299 => None,
        404 | 410 => Some(HansardError::NotFound(url.to_string())),
        408 | 429 | 500..=599 => Some(HansardError::transient(url, format!("HTTP {status}"))),
        _ => Some(HansardError::Api {
            status,
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(classify_status(200, "u").is_none());
        assert!(classify_status(404, "u").unwrap().is_not_found());
        assert!(classify_status(429, "u").unwrap().is_retryable());
        assert!(classify_status(503, "u").unwrap().is_retryable());
        let forbidden = classify_status(403, "u").unwrap();
        assert!(!forbidden.is_retryable());
        assert!(!forbidden.is_not_found());
    }
}
