//! Error types for the Trovebox client.
//!
//! # Design
//! Every operation fails with exactly one of four kinds: the transport could
//! not complete the exchange, the transport was misused, the payload did not
//! have the expected shape, or the server (or a local precondition) rejected
//! the request. Rejections carry a `RejectionKind` so callers can branch on
//! "not found" or "needs a token" without string matching.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::http::{HttpResponse, TransportError};

/// Errors returned by every contract operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or connection failure. Never retried by this crate.
    #[error("{operation}: transport failure: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    /// The transport was used in an invalid state, e.g. a body consumed twice.
    #[error("{operation}: protocol state error: {message}")]
    ProtocolState {
        operation: &'static str,
        message: String,
    },

    /// The response could not be parsed into the expected envelope.
    #[error("{operation}: malformed response: {message}")]
    MalformedResponse {
        operation: &'static str,
        message: String,
    },

    /// The server (or a local precondition check) refused the request.
    #[error("{operation}: {rejection}")]
    Rejected {
        operation: &'static str,
        rejection: Rejection,
    },
}

impl ApiError {
    pub fn operation(&self) -> &'static str {
        match self {
            ApiError::Transport { operation, .. }
            | ApiError::ProtocolState { operation, .. }
            | ApiError::MalformedResponse { operation, .. }
            | ApiError::Rejected { operation, .. } => operation,
        }
    }

    /// The rejection kind, if this is a rejection.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            ApiError::Rejected { rejection, .. } => Some(rejection.kind),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.rejection_kind() == Some(RejectionKind::NotFound)
    }

    pub fn is_access_denied(&self) -> bool {
        self.rejection_kind() == Some(RejectionKind::AccessDenied)
    }

    /// A precondition failure raised before any request was sent.
    pub(crate) fn invalid_input(operation: &'static str, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            operation,
            rejection: Rejection {
                kind: RejectionKind::Validation,
                status: None,
                message: message.into(),
            },
        }
    }

    pub(crate) fn malformed(operation: &'static str, message: impl fmt::Display) -> Self {
        ApiError::MalformedResponse {
            operation,
            message: message.to_string(),
        }
    }

    pub(crate) fn from_transport(operation: &'static str, err: TransportError) -> Self {
        match err {
            TransportError::InvalidState(message) => ApiError::ProtocolState { operation, message },
            source => ApiError::Transport { operation, source },
        }
    }
}

/// Server-side refusal classes callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NotFound,
    AccessDenied,
    Conflict,
    Validation,
    Other,
}

impl RejectionKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => RejectionKind::Validation,
            401 | 403 => RejectionKind::AccessDenied,
            404 => RejectionKind::NotFound,
            409 => RejectionKind::Conflict,
            _ => RejectionKind::Other,
        }
    }
}

/// A structured refusal.
///
/// `status` is `None` when the request was refused locally and never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub status: Option<u16>,
    pub message: String,
}

impl Rejection {
    pub fn is_local(&self) -> bool {
        self.status.is_none()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "rejected ({:?}, {status}): {}", self.kind, self.message),
            None => write!(f, "rejected before sending ({:?}): {}", self.kind, self.message),
        }
    }
}

/// The status fields every envelope carries, success or not.
#[derive(Debug, Deserialize)]
struct StatusFields {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Project a raw response onto a rejection, if it is one.
///
/// The envelope `code` wins over the HTTP status: the service reports some
/// refusals with HTTP 200 and a 4xx `code` in the body.
pub(crate) fn check_response(operation: &'static str, response: &HttpResponse) -> Result<(), ApiError> {
    let fields = serde_json::from_str::<StatusFields>(&response.body).ok();
    let body_code = fields
        .as_ref()
        .and_then(|f| f.code)
        .and_then(|code| u16::try_from(code).ok())
        .filter(|code| *code >= 400);

    let status = match (response.is_success(), body_code) {
        (true, None) => return Ok(()),
        (_, Some(code)) => code,
        (false, None) => response.status,
    };

    let message = fields
        .and_then(|f| f.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| response.body.trim().to_string());
    let rejection = Rejection {
        kind: RejectionKind::from_status(status),
        status: Some(status),
        message,
    };
    tracing::warn!(operation, status, kind = ?rejection.kind, "request rejected");
    Err(ApiError::Rejected { operation, rejection })
}
