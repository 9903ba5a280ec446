//! The blocking operation contract and its transport-bound implementation.
//!
//! # Design
//! `TroveboxApi` is the surface callers program against. `Trovebox<T>` wires
//! `TroveboxClient`'s build/parse pairs to a caller-supplied `Transport`.
//! Nothing here retries, caches or keeps state between calls, so one value can
//! be shared freely across threads.

use std::path::Path;

use crate::client::{op, TroveboxClient};
use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::progress::ProgressListener;
use crate::response::{
    Acknowledgement, AlbumResponse, AlbumsResponse, PhotoResponse, PhotosResponse, ProfileResponse,
    SystemVersionResponse, TagsResponse, TokenResponse, TokenValidationResponse, UploadResponse,
};
use crate::types::{Paging, PhotoListQuery, PhotoUpdate, ReturnSizes, UploadMetaData};

/// Every operation the service offers, as synchronous calls.
///
/// Mutations (`create_album`, `update_photo_details`, `delete_photo`,
/// `upload_photo`, `notify_upload_finished`) are not guaranteed idempotent;
/// whether to repeat one after a failure is the caller's decision.
pub trait TroveboxApi {
    /// All tags in use. Not paged.
    fn list_tags(&self) -> Result<TagsResponse, ApiError>;

    fn list_albums(&self, paging: Option<Paging>, skip_empty: bool) -> Result<AlbumsResponse, ApiError>;

    fn get_album(&self, album_id: &str) -> Result<AlbumResponse, ApiError>;

    /// `token` unlocks photos that need a share token; `host` sends the
    /// request to an alternate server.
    fn get_photo(
        &self,
        photo_id: &str,
        sizes: &ReturnSizes,
        token: Option<&str>,
        host: Option<&str>,
    ) -> Result<PhotoResponse, ApiError>;

    fn list_photos(&self, query: &PhotoListQuery) -> Result<PhotosResponse, ApiError>;

    /// The home feed, most recent first. Not the same as `list_photos`
    /// sorted by date.
    fn list_newest_photos(&self, sizes: &ReturnSizes, paging: Paging) -> Result<PhotosResponse, ApiError>;

    fn find_photos_by_hash(&self, hash: &str) -> Result<PhotosResponse, ApiError>;

    fn get_profile(&self, include_viewer: bool) -> Result<ProfileResponse, ApiError>;

    fn get_system_version(&self) -> Result<SystemVersionResponse, ApiError>;

    fn create_album(&self, name: &str) -> Result<AlbumResponse, ApiError>;

    fn update_photo_details(&self, photo_id: &str, update: &PhotoUpdate) -> Result<PhotoResponse, ApiError>;

    fn delete_photo(&self, photo_id: &str) -> Result<Acknowledgement, ApiError>;

    /// Stream `path` to the server. `progress` is called while the body is
    /// being written and never before.
    fn upload_photo(
        &self,
        path: &Path,
        metadata: &UploadMetaData,
        token: Option<&str>,
        host: Option<&str>,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<UploadResponse, ApiError>;

    /// URL the user must open to authorize this application.
    fn oauth_url(&self, app_name: &str, callback_url: &str) -> Result<String, ApiError>;

    fn create_token_for_photo(&self, photo_id: &str) -> Result<TokenResponse, ApiError>;

    /// Read-only; never changes the token.
    fn validate_upload_token(&self, token: &str) -> Result<TokenValidationResponse, ApiError>;

    /// Best-effort signal that `count` uploads under `token` completed.
    fn notify_upload_finished(
        &self,
        token: &str,
        host: Option<&str>,
        uploader_name: Option<&str>,
        count: u32,
    ) -> Result<Acknowledgement, ApiError>;
}

/// `TroveboxApi` over a concrete `Transport`.
#[derive(Debug, Clone)]
pub struct Trovebox<T> {
    client: TroveboxClient,
    transport: T,
}

impl<T: Transport> Trovebox<T> {
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ConfigError> {
        Ok(Self {
            client: TroveboxClient::new(config)?,
            transport,
        })
    }

    pub fn client(&self) -> &TroveboxClient {
        &self.client
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn execute(&self, operation: &'static str, request: HttpRequest<'_>) -> Result<HttpResponse, ApiError> {
        let response = self
            .transport
            .execute(request)
            .map_err(|e| ApiError::from_transport(operation, e))?;
        tracing::debug!(operation, status = response.status, "received response");
        Ok(response)
    }
}

impl<T: Transport> TroveboxApi for Trovebox<T> {
    fn list_tags(&self) -> Result<TagsResponse, ApiError> {
        let req = self.client.build_list_tags()?;
        self.client.parse_list_tags(self.execute(op::LIST_TAGS, req)?)
    }

    fn list_albums(&self, paging: Option<Paging>, skip_empty: bool) -> Result<AlbumsResponse, ApiError> {
        let req = self.client.build_list_albums(paging, skip_empty)?;
        self.client
            .parse_list_albums(self.execute(op::LIST_ALBUMS, req)?, paging)
    }

    fn get_album(&self, album_id: &str) -> Result<AlbumResponse, ApiError> {
        let req = self.client.build_get_album(album_id)?;
        self.client.parse_get_album(self.execute(op::GET_ALBUM, req)?)
    }

    fn get_photo(
        &self,
        photo_id: &str,
        sizes: &ReturnSizes,
        token: Option<&str>,
        host: Option<&str>,
    ) -> Result<PhotoResponse, ApiError> {
        let req = self.client.build_get_photo(photo_id, sizes, token, host)?;
        self.client.parse_get_photo(self.execute(op::GET_PHOTO, req)?)
    }

    fn list_photos(&self, query: &PhotoListQuery) -> Result<PhotosResponse, ApiError> {
        let req = self.client.build_list_photos(query)?;
        self.client
            .parse_list_photos(self.execute(op::LIST_PHOTOS, req)?, query.paging)
    }

    fn list_newest_photos(&self, sizes: &ReturnSizes, paging: Paging) -> Result<PhotosResponse, ApiError> {
        let req = self.client.build_list_newest_photos(sizes, paging)?;
        self.client
            .parse_list_newest_photos(self.execute(op::LIST_NEWEST_PHOTOS, req)?, paging)
    }

    fn find_photos_by_hash(&self, hash: &str) -> Result<PhotosResponse, ApiError> {
        let req = self.client.build_find_photos_by_hash(hash)?;
        self.client
            .parse_find_photos_by_hash(self.execute(op::FIND_PHOTOS_BY_HASH, req)?)
    }

    fn get_profile(&self, include_viewer: bool) -> Result<ProfileResponse, ApiError> {
        let req = self.client.build_get_profile(include_viewer)?;
        self.client.parse_get_profile(self.execute(op::GET_PROFILE, req)?)
    }

    fn get_system_version(&self) -> Result<SystemVersionResponse, ApiError> {
        let req = self.client.build_get_system_version()?;
        self.client
            .parse_get_system_version(self.execute(op::GET_SYSTEM_VERSION, req)?)
    }

    fn create_album(&self, name: &str) -> Result<AlbumResponse, ApiError> {
        let req = self.client.build_create_album(name)?;
        self.client.parse_create_album(self.execute(op::CREATE_ALBUM, req)?)
    }

    fn update_photo_details(&self, photo_id: &str, update: &PhotoUpdate) -> Result<PhotoResponse, ApiError> {
        let req = self.client.build_update_photo_details(photo_id, update)?;
        self.client
            .parse_update_photo_details(self.execute(op::UPDATE_PHOTO_DETAILS, req)?)
    }

    fn delete_photo(&self, photo_id: &str) -> Result<Acknowledgement, ApiError> {
        let req = self.client.build_delete_photo(photo_id)?;
        self.client.parse_delete_photo(self.execute(op::DELETE_PHOTO, req)?)
    }

    fn upload_photo(
        &self,
        path: &Path,
        metadata: &UploadMetaData,
        token: Option<&str>,
        host: Option<&str>,
        progress: Option<&dyn ProgressListener>,
    ) -> Result<UploadResponse, ApiError> {
        // The request owns the file handle; it is closed when `execute`
        // drops the request, whatever the outcome.
        let req = self
            .client
            .build_upload_photo(path, metadata, token, host, progress)?;
        self.client.parse_upload_photo(self.execute(op::UPLOAD_PHOTO, req)?)
    }

    fn oauth_url(&self, app_name: &str, callback_url: &str) -> Result<String, ApiError> {
        self.client.oauth_url(app_name, callback_url)
    }

    fn create_token_for_photo(&self, photo_id: &str) -> Result<TokenResponse, ApiError> {
        let req = self.client.build_create_token_for_photo(photo_id)?;
        self.client
            .parse_create_token_for_photo(self.execute(op::CREATE_TOKEN_FOR_PHOTO, req)?)
    }

    fn validate_upload_token(&self, token: &str) -> Result<TokenValidationResponse, ApiError> {
        let req = self.client.build_validate_upload_token(token)?;
        self.client
            .parse_validate_upload_token(self.execute(op::VALIDATE_UPLOAD_TOKEN, req)?)
    }

    fn notify_upload_finished(
        &self,
        token: &str,
        host: Option<&str>,
        uploader_name: Option<&str>,
        count: u32,
    ) -> Result<Acknowledgement, ApiError> {
        let req = self
            .client
            .build_notify_upload_finished(token, host, uploader_name, count)?;
        self.client
            .parse_notify_upload_finished(self.execute(op::NOTIFY_UPLOAD_FINISHED, req)?)
    }
}
