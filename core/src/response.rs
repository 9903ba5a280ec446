//! Typed response envelopes, one per operation family.
//!
//! # Design
//! Each envelope is a concrete struct composed of the shared `ResponseStatus`
//! and, for listings, a `PageCursor`. Parsing goes through `parse_envelope`,
//! which only hands back a value once the whole payload has been decoded, so
//! a malformed payload never yields a half-filled envelope.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{check_response, ApiError};
use crate::http::HttpResponse;
use crate::lenient::value_u64;
use crate::model::{Album, Photo, Profile, SystemVersion, Tag, Token, TokenValidation};

/// Status fields common to every envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    pub code: i64,
    pub message: String,
}

/// What the server says it actually returned for a paged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_rows: u64,
}

impl PageCursor {
    /// Listing items repeat the paging fields; read them off the first one.
    fn from_item(item: &Value) -> Option<Self> {
        Some(Self {
            current_page: u32::try_from(value_u64(item.get("currentPage")?)?).ok()?,
            page_size: u32::try_from(value_u64(item.get("pageSize")?)?).ok()?,
            total_pages: u32::try_from(value_u64(item.get("totalPages")?)?).ok()?,
            total_rows: value_u64(item.get("totalRows")?)?,
        })
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagsResponse {
    pub status: ResponseStatus,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumsResponse {
    pub status: ResponseStatus,
    pub albums: Vec<Album>,
    pub paging: Option<PageCursor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumResponse {
    pub status: ResponseStatus,
    pub album: Album,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoResponse {
    pub status: ResponseStatus,
    pub photo: Photo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotosResponse {
    pub status: ResponseStatus,
    pub photos: Vec<Photo>,
    pub paging: Option<PageCursor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: ResponseStatus,
    pub photo: Photo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub status: ResponseStatus,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemVersionResponse {
    pub status: ResponseStatus,
    pub version: SystemVersion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub status: ResponseStatus,
    pub token: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenValidationResponse {
    pub status: ResponseStatus,
    pub validation: TokenValidation,
}

impl TokenValidationResponse {
    pub fn is_valid(&self) -> bool {
        self.validation.valid
    }
}

/// Generic acknowledgement for operations with no meaningful result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub status: ResponseStatus,
}

#[derive(Deserialize)]
struct RawEnvelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    result: T,
}

/// Check for rejection, then decode the whole envelope.
pub(crate) fn parse_envelope<T: DeserializeOwned>(
    operation: &'static str,
    response: &HttpResponse,
) -> Result<(ResponseStatus, T), ApiError> {
    check_response(operation, response)?;
    let raw: RawEnvelope<T> =
        serde_json::from_str(&response.body).map_err(|e| ApiError::malformed(operation, e))?;
    Ok((
        ResponseStatus {
            code: raw.code,
            message: raw.message,
        },
        raw.result,
    ))
}

/// Decode a listing, extracting the cursor and enforcing the requested
/// page size.
pub(crate) fn parse_listing<T: DeserializeOwned>(
    operation: &'static str,
    response: &HttpResponse,
    page_size: Option<u32>,
) -> Result<(ResponseStatus, Vec<T>, Option<PageCursor>), ApiError> {
    let (status, items): (_, Vec<Value>) = parse_envelope(operation, response)?;
    if let Some(limit) = page_size {
        if items.len() > limit as usize {
            return Err(ApiError::malformed(
                operation,
                format!("{} records returned for a page size of {limit}", items.len()),
            ));
        }
    }

    let cursor = items.first().and_then(PageCursor::from_item);
    let records = items
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| ApiError::malformed(operation, e))?;
    Ok((status, records, cursor))
}
