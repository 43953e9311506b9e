use thiserror::Error;

/// Canonical error type for planning and execution.
///
/// Classification and compilation errors are surfaced as data before any
/// scanner is bound; only `Store` may arise at iteration time.
#[derive(Debug, Error)]
pub enum Error {
    /// The filter contains a construct the planner cannot classify
    /// (e.g. a property-on-property comparison inside a supported operator).
    #[error("unsupported expression: {detail}")]
    UnsupportedExpression {
        /// Human-readable description of the offending construct.
        detail: String,
    },

    /// Malformed schema string or conflicting default attributes.
    #[error("invalid schema: {detail}")]
    InvalidSchema {
        /// Human-readable description of the violation.
        detail: String,
    },

    /// A plan required a hint that was not supplied
    /// (e.g. a density plan without an envelope).
    #[error("configuration error: {detail}")]
    Configuration {
        /// Human-readable description of the missing or inconsistent hint.
        detail: String,
    },

    /// Propagated from the underlying scanner handle.
    #[error("store error: {detail}")]
    Store {
        /// Message reported by the store client.
        detail: String,
    },
}

impl Error {
    /// Creates an `UnsupportedExpression` variant.
    #[must_use]
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::UnsupportedExpression {
            detail: detail.into(),
        }
    }

    /// Creates an `InvalidSchema` variant.
    #[must_use]
    pub fn invalid_schema(detail: impl Into<String>) -> Self {
        Self::InvalidSchema {
            detail: detail.into(),
        }
    }

    /// Creates a `Configuration` variant.
    #[must_use]
    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::Configuration {
            detail: detail.into(),
        }
    }

    /// Creates a `Store` variant.
    #[must_use]
    pub fn store(detail: impl Into<String>) -> Self {
        Self::Store {
            detail: detail.into(),
        }
    }
}

/// Convenient result alias bound to the shared error type.
pub type Result<T> = std::result::Result<T, Error>;
