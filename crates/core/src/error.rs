//! Error types shared by the REST client and the controllers.

use std::fmt;

use thiserror::Error;

/// The operation a request was performing, used to name failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Fetching a collection.
    List,
    /// Creating an item.
    Create,
    /// Updating an item.
    Update,
    /// Deleting an item.
    Delete,
    /// Exchanging credentials for a token.
    Login,
}

impl Action {
    /// Verb used in user-facing messages.
    pub fn verb(self) -> &'static str {
        match self {
            Action::List => "fetch",
            Action::Create => "add",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Login => "log in",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Failure kinds reported by the REST layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the bearer token (HTTP 401) or none is present.
    #[error("authorization expired")]
    AuthExpired,
    /// Non-success status or a payload that does not have the expected shape.
    #[error("failed to {action}: {reason}")]
    RequestFailed {
        /// Operation that failed.
        action: Action,
        /// Server-provided or derived explanation.
        reason: String,
    },
    /// Transport-level failure (connection refused, timeout, ...).
    #[error("network error while trying to {action}: {source}")]
    Network {
        /// Operation that failed.
        action: Action,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Build a [`ApiError::RequestFailed`] from any displayable reason.
    pub fn failed(action: Action, reason: impl Into<String>) -> Self {
        ApiError::RequestFailed {
            action,
            reason: reason.into(),
        }
    }
}

/// Local validation failure for user-entered form data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A numeric field received text that is not a number.
    #[error("{field} must be a number (got {value:?})")]
    NotANumber {
        /// Field name.
        field: String,
        /// Rejected input.
        value: String,
    },
    /// A numeric field was left blank.
    #[error("{field} is required")]
    Missing {
        /// Field name.
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_names_the_action() {
        let err = ApiError::failed(Action::Delete, "server responded with 500");
        assert_eq!(
            err.to_string(),
            "failed to delete: server responded with 500"
        );
        assert_eq!(
            ApiError::AuthExpired.to_string(),
            "authorization expired"
        );
    }
}
