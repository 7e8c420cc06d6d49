use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// Malformed request payload or identifier.
    InvalidInput(String),
    /// Upstream call failed or answered with an unexpected shape.
    Remote { endpoint: String, message: String },
    /// A numeric page id did not resolve to a title.
    Lookup { page_id: u64 },
    /// Identifier is well-formed but nothing exists behind it.
    NotFound(String),
}

impl ReconcileError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn remote(endpoint: &str, msg: impl Into<String>) -> Self {
        Self::Remote { endpoint: endpoint.to_string(), message: msg.into() }
    }

    /// Stable machine-readable name, used as the `error` field of the body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Remote { .. } => "remote",
            Self::Lookup { .. } => "lookup",
            Self::NotFound(_) => "not_found",
        }
    }

    /// HTTP-equivalent status for the outer service layer.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Remote { .. } => 502,
            Self::Lookup { .. } | Self::NotFound(_) => 404,
        }
    }

    /// `{error, message}` body returned to reconciliation clients.
    pub fn to_body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        })
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "{msg}"),
            Self::Remote { endpoint, message } => write!(f, "remote error from {endpoint}: {message}"),
            Self::Lookup { page_id } => write!(f, "no title found for page id {page_id}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
        }
    }
}

impl std::error::Error for ReconcileError {}
