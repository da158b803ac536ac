use thiserror::Error;

/// Caller-input problems. Always reported back as an error-flagged tool result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter: {0}")]
    Missing(String),

    #[error("parameter {name} is not of type {expected}")]
    TypeMismatch { name: String, expected: &'static str },

    #[error("invalid value for parameter {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("tool arguments must be a JSON object")]
    InvalidArguments,
}

/// Failures that happen before a response status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("request cancelled")]
    Cancelled,
}

/// Hard failures surfaced to the JSON-RPC layer instead of a tool result.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to marshal response: {0}")]
    Marshal(#[from] serde_json::Error),

    #[error("request cancelled")]
    Cancelled,

    #[error("tool {0} is disabled in read-only mode")]
    ReadOnly(&'static str),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing GITHUB_TOKEN or GH_TOKEN")]
    MissingToken,

    #[error("invalid GITHUB_API_URL {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
}
