use std::fmt;

/// Errors surfaced by records and record sets.
///
/// Lookups (`get`, `get_at`, `get_attribute`, ...) return `Option` rather
/// than an error; a miss is not an error condition in this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network failure or non-2xx response. Carries the HTTP status when one
    /// was received. Never retried internally.
    Transport {
        status: Option<u16>,
        detail: String,
    },
    /// A record of the wrong resource type was added to a record set.
    TypeMismatch {
        expected: String,
        actual: String,
    },
    /// No URL can be derived — missing override, missing owner, or an owner
    /// without a collection URL.
    Configuration(&'static str),
}

impl StoreError {
    /// The HTTP status carried by a transport error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Transport {
                status: Some(status),
                detail,
            } => write!(f, "transport error (status {}): {}", status, detail),
            StoreError::Transport {
                status: None,
                detail,
            } => write!(f, "transport error: {}", detail),
            StoreError::TypeMismatch { expected, actual } => write!(
                f,
                "record set can only hold \"{}\" records (got \"{}\")",
                expected, actual
            ),
            StoreError::Configuration(detail) => write!(f, "{}", detail),
        }
    }
}

impl std::error::Error for StoreError {}
