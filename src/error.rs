/// Error types shared across the scraping pipeline and the extension bridges

use thiserror::Error;

/// Failure of a single DOM lookup. Recorded in the strategy outcome, never raised further.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("unsupported selector `{selector}`: {reason}")]
    UnsupportedSelector { selector: String, reason: String },

    #[error("query `{selector}` failed: {reason}")]
    Query { selector: String, reason: String },
}

/// Failure to read an application list out of an intercepted response body
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PayloadError {
    #[error("response body is not JSON: {0}")]
    NotJson(String),

    #[error("payload has no application list")]
    NoItemList,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid URL `{value}`: {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("invalid API pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("could not read configuration: {0}")]
    Malformed(String),
}

/// Failures talking to chrome.* APIs or to the page's own primitives
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BridgeError {
    #[error("{0} is not available in this context")]
    Unavailable(&'static str),

    #[error("storage {operation} failed: {reason}")]
    Storage { operation: &'static str, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("could not hook {primitive}: {reason}")]
    Hook { primitive: &'static str, reason: String },

    #[error("runtime messaging failed: {0}")]
    Messaging(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_input() {
        let err = ExtractError::UnsupportedSelector {
            selector: "div:has(> img)".to_string(),
            reason: "unexpected token".to_string(),
        };
        assert_eq!(err.to_string(), "unsupported selector `div:has(> img)`: unexpected token");

        let err = ConfigError::Zero { field: "maxRetries" };
        assert_eq!(err.to_string(), "maxRetries must be greater than zero");
    }

    #[test]
    fn test_missing_page_context_reads_as_unavailable() {
        let err = BridgeError::Unavailable("location");
        assert_eq!(err.to_string(), "location is not available in this context");
        assert_ne!(err, BridgeError::Messaging("location".to_string()));
    }
}
