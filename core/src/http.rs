//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `TroveboxClient` builds
//! `HttpRequest` values and parses `HttpResponse` values; a `Transport`
//! implementation owned by the caller performs the actual exchange.
//!
//! Upload bodies are the one exception to "plain data": a multipart body is a
//! `Read` stream over the source file so the transport can send it without
//! buffering the whole photo, and so progress is reported while bytes are
//! actually being written.

use std::fmt;
use std::io::Read;

use thiserror::Error;

use crate::progress::MultipartBody;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// Body of an outgoing request.
pub enum RequestBody<'a> {
    Empty,
    /// `application/x-www-form-urlencoded` payload.
    Form(String),
    /// Streaming `multipart/form-data` payload.
    Multipart(MultipartBody<'a>),
}

impl RequestBody<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Form payload, if this is a form body.
    pub fn as_form(&self) -> Option<&str> {
        match self {
            RequestBody::Form(form) => Some(form),
            _ => None,
        }
    }

    /// Value of the `content-type` header the transport must send, if any.
    pub fn content_type(&self) -> Option<String> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Form(_) => Some("application/x-www-form-urlencoded".to_string()),
            RequestBody::Multipart(body) => Some(body.content_type()),
        }
    }

    /// Exact number of body bytes.
    pub fn len(&self) -> u64 {
        match self {
            RequestBody::Empty => 0,
            RequestBody::Form(form) => form.len() as u64,
            RequestBody::Multipart(body) => body.len(),
        }
    }
}

impl fmt::Debug for RequestBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Form(form) => f.debug_tuple("Form").field(form).finish(),
            RequestBody::Multipart(body) => f
                .debug_struct("Multipart")
                .field("content_type", &body.content_type())
                .field("len", &body.len())
                .finish(),
        }
    }
}

/// An HTTP request described as data.
///
/// Built by `TroveboxClient::build_*` methods. The transport executes it and
/// hands back the matching `HttpResponse`.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody<'a>,
}

impl<'a> HttpRequest<'a> {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Take the body as a reader, leaving `RequestBody::Empty` behind.
    pub fn take_body(&mut self) -> Box<dyn Read + Send + 'a> {
        match std::mem::replace(&mut self.body, RequestBody::Empty) {
            RequestBody::Empty => Box::new(std::io::empty()),
            RequestBody::Form(form) => Box::new(std::io::Cursor::new(form.into_bytes())),
            RequestBody::Multipart(body) => Box::new(body),
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure reported by a `Transport` before a response was obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The transport was driven in a state it does not support, such as
    /// sending a body that was already consumed.
    #[error("invalid transport state: {0}")]
    InvalidState(String),
}

/// Executes HTTP exchanges on behalf of the contract adapter.
///
/// Implementations must be safe to share between threads; connection reuse,
/// TLS, redirects and timeouts are entirely theirs.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}
