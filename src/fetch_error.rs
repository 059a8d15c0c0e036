use std::fmt;

use reqwest::StatusCode;

/// Upstream call a failure belongs to. Rendered into every error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CurrentConditions,
    Forecast,
    Alerts,
    LocationSearch,
    ReverseGeocoding,
    Assistant,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CurrentConditions => "current conditions",
            Operation::Forecast => "forecast",
            Operation::Alerts => "alerts",
            Operation::LocationSearch => "location search",
            Operation::ReverseGeocoding => "reverse geocoding",
            Operation::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Non-success status, transport failure or timeout.
    #[error("{operation} fetch failed")]
    Upstream {
        operation: Operation,
        status: Option<StatusCode>,
        #[source]
        source: Option<reqwest::Error>,
    },
    #[error("{operation} fetch failed: unexpected response shape ({detail})")]
    Schema { operation: Operation, detail: String },
    #[error("HTTP client could not be built: {0}")]
    Client(#[source] reqwest::Error),
}

impl FetchError {
    pub fn status(operation: Operation, status: StatusCode) -> Self {
        FetchError::Upstream {
            operation,
            status: Some(status),
            source: None,
        }
    }

    pub fn transport(operation: Operation, source: reqwest::Error) -> Self {
        FetchError::Upstream {
            operation,
            status: source.status(),
            source: Some(source),
        }
    }

    pub fn schema(operation: Operation, detail: impl fmt::Display) -> Self {
        FetchError::Schema {
            operation,
            detail: detail.to_string(),
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            FetchError::Upstream { operation, .. } | FetchError::Schema { operation, .. } => {
                Some(*operation)
            }
            FetchError::Client(_) => None,
        }
    }

    /// Transport failures, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Upstream { status: None, .. } => true,
            FetchError::Upstream {
                status: Some(status),
                ..
            } => status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS,
            FetchError::Schema { .. } | FetchError::Client(_) => false,
        }
    }
}
