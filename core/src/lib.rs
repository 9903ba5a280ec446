//! Synchronous, strongly typed client contract for the Trovebox photo service.
//!
//! # Overview
//! Covers tags, albums, photos, uploads, profiles, tokens and OAuth URL
//! construction. Requests are built and responses parsed without touching the
//! network (host-does-IO pattern); the caller supplies a `Transport` that
//! performs the exchange.
//!
//! # Design
//! - `TroveboxClient` is stateless: it holds only the parsed base URL and an
//!   optional user agent.
//! - Each operation is a `build_*` / `parse_*` pair, so the I/O boundary is
//!   explicit and every parse can be tested from canned responses.
//! - `TroveboxApi` is the blocking contract; `Trovebox<T: Transport>`
//!   implements it by running build, execute and parse in sequence.
//! - Failures collapse into the four `ApiError` kinds. Rejections keep a
//!   `RejectionKind` so callers can tell "not found" from "needs a token".
//! - Uploads stream from the open file and report progress from inside the
//!   body reader.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
mod lenient;
pub mod model;
pub mod progress;
pub mod response;
pub mod types;

pub use api::{Trovebox, TroveboxApi};
pub use client::{TroveboxClient, TOKEN_HEADER};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, Rejection, RejectionKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport, TransportError};
pub use model::{Album, Photo, Profile, ProfileCounts, SystemVersion, Tag, Token, TokenType, TokenValidation};
pub use progress::{MultipartBody, ProgressListener};
pub use response::{
    Acknowledgement, AlbumResponse, AlbumsResponse, PageCursor, PhotoResponse, PhotosResponse,
    ProfileResponse, ResponseStatus, SystemVersionResponse, TagsResponse, TokenResponse,
    TokenValidationResponse, UploadResponse,
};
pub use types::{ImageSize, Paging, Permission, PhotoListQuery, PhotoUpdate, ReturnSizes, UploadMetaData};
