//! Stateless HTTP request builder and response parser for the Trovebox API.
//!
//! # Design
//! `TroveboxClient` holds only its parsed configuration and carries no
//! mutable state between calls. Each operation is split into a `build_*`
//! method that produces an `HttpRequest` and a `parse_*` method that consumes
//! an `HttpResponse`. The caller (or `Trovebox<T>`) executes the round-trip in
//! between, keeping this type deterministic and free of network I/O.

use std::fs::File;
use std::path::Path;

use url::form_urlencoded;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::model::{Album, Photo, Tag};
use crate::progress::{FormField, MultipartBody, ProgressListener};
use crate::response::{
    parse_envelope, parse_listing, Acknowledgement, AlbumResponse, AlbumsResponse, PhotoResponse,
    PhotosResponse, ProfileResponse, SystemVersionResponse, TagsResponse, TokenResponse,
    TokenValidationResponse, UploadResponse,
};
use crate::types::{join_tags, Paging, PhotoListQuery, PhotoUpdate, ReturnSizes, UploadMetaData};

/// Request-scoped share or upload token header.
pub const TOKEN_HEADER: &str = "x-trovebox-token";

/// Operation names used in errors and logs.
pub mod op {
    pub const LIST_TAGS: &str = "list_tags";
    pub const LIST_ALBUMS: &str = "list_albums";
    pub const GET_ALBUM: &str = "get_album";
    pub const GET_PHOTO: &str = "get_photo";
    pub const LIST_PHOTOS: &str = "list_photos";
    pub const LIST_NEWEST_PHOTOS: &str = "list_newest_photos";
    pub const FIND_PHOTOS_BY_HASH: &str = "find_photos_by_hash";
    pub const CREATE_ALBUM: &str = "create_album";
    pub const UPDATE_PHOTO_DETAILS: &str = "update_photo_details";
    pub const DELETE_PHOTO: &str = "delete_photo";
    pub const UPLOAD_PHOTO: &str = "upload_photo";
    pub const OAUTH_URL: &str = "oauth_url";
    pub const CREATE_TOKEN_FOR_PHOTO: &str = "create_token_for_photo";
    pub const VALIDATE_UPLOAD_TOKEN: &str = "validate_upload_token";
    pub const NOTIFY_UPLOAD_FINISHED: &str = "notify_upload_finished";
    pub const GET_PROFILE: &str = "get_profile";
    pub const GET_SYSTEM_VERSION: &str = "get_system_version";
}

/// Synchronous, stateless request builder and response parser.
#[derive(Debug, Clone)]
pub struct TroveboxClient {
    base_url: Url,
    user_agent: Option<String>,
}

impl TroveboxClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.parse_base_url()?;
        Ok(Self {
            base_url,
            user_agent: config.user_agent,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    // -----------------------------------------------------------------------
    // Read operations
    // -----------------------------------------------------------------------

    pub fn build_list_tags(&self) -> Result<HttpRequest<'static>, ApiError> {
        let url = self.endpoint(op::LIST_TAGS, None, &["tags", "list.json"])?;
        Ok(self.get(op::LIST_TAGS, url, None))
    }

    pub fn parse_list_tags(&self, response: HttpResponse) -> Result<TagsResponse, ApiError> {
        let (status, tags) = parse_envelope::<Vec<Tag>>(op::LIST_TAGS, &response)?;
        Ok(TagsResponse { status, tags })
    }

    pub fn build_list_albums(
        &self,
        paging: Option<Paging>,
        skip_empty: bool,
    ) -> Result<HttpRequest<'static>, ApiError> {
        let mut url = self.endpoint(op::LIST_ALBUMS, None, &["albums", "list.json"])?;
        let mut pairs = paging.map(|p| p.query_pairs()).unwrap_or_default();
        if skip_empty {
            pairs.push(("skipEmpty", "1".to_string()));
        }
        append_query(&mut url, &pairs);
        Ok(self.get(op::LIST_ALBUMS, url, None))
    }

    /// `paging` must be the window the request was built with.
    pub fn parse_list_albums(
        &self,
        response: HttpResponse,
        paging: Option<Paging>,
    ) -> Result<AlbumsResponse, ApiError> {
        let page_size = paging.and_then(|p| p.page_size());
        let (status, albums, paging) = parse_listing::<Album>(op::LIST_ALBUMS, &response, page_size)?;
        Ok(AlbumsResponse {
            status,
            albums,
            paging,
        })
    }

    pub fn build_get_album(&self, album_id: &str) -> Result<HttpRequest<'static>, ApiError> {
        require(op::GET_ALBUM, "album id", album_id)?;
        let url = self.endpoint(op::GET_ALBUM, None, &["album", album_id, "view.json"])?;
        Ok(self.get(op::GET_ALBUM, url, None))
    }

    pub fn parse_get_album(&self, response: HttpResponse) -> Result<AlbumResponse, ApiError> {
        let (status, album) = parse_envelope::<Album>(op::GET_ALBUM, &response)?;
        Ok(AlbumResponse { status, album })
    }

    pub fn build_get_photo(
        &self,
        photo_id: &str,
        sizes: &ReturnSizes,
        token: Option<&str>,
        host: Option<&str>,
    ) -> Result<HttpRequest<'static>, ApiError> {
        require(op::GET_PHOTO, "photo id", photo_id)?;
        let mut url = self.endpoint(op::GET_PHOTO, host, &["photo", photo_id, "view.json"])?;
        if let Some(sizes) = sizes.query_value() {
            append_query(&mut url, &[("returnSizes", sizes)]);
        }
        Ok(self.get(op::GET_PHOTO, url, token))
    }

    pub fn parse_get_photo(&self, response: HttpResponse) -> Result<PhotoResponse, ApiError> {
        let (status, photo) = parse_envelope::<Photo>(op::GET_PHOTO, &response)?;
        Ok(PhotoResponse { status, photo })
    }

    pub fn build_list_photos(&self, query: &PhotoListQuery) -> Result<HttpRequest<'static>, ApiError> {
        let mut url = self.endpoint(op::LIST_PHOTOS, query.host.as_deref(), &["photos", "list.json"])?;
        let mut pairs = Vec::new();
        if let Some(sizes) = query.sizes.query_value() {
            pairs.push(("returnSizes", sizes));
        }
        if let Some(tags) = &query.tags {
            let tags = join_tags(tags).map_err(|e| ApiError::invalid_input(op::LIST_PHOTOS, e))?;
            pairs.push(("tags", tags));
        }
        if let Some(album) = &query.album {
            pairs.push(("album", album.clone()));
        }
        if let Some(sort_by) = &query.sort_by {
            pairs.push(("sortBy", sort_by.clone()));
        }
        if let Some(paging) = query.paging {
            pairs.extend(paging.query_pairs());
        }
        append_query(&mut url, &pairs);
        Ok(self.get(op::LIST_PHOTOS, url, query.token.as_deref()))
    }

    /// `paging` must be the window the request was built with.
    pub fn parse_list_photos(
        &self,
        response: HttpResponse,
        paging: Option<Paging>,
    ) -> Result<PhotosResponse, ApiError> {
        parse_photos(op::LIST_PHOTOS, &response, paging)
    }

    pub fn build_list_newest_photos(
        &self,
        sizes: &ReturnSizes,
        paging: Paging,
    ) -> Result<HttpRequest<'static>, ApiError> {
        let mut url = self.endpoint(op::LIST_NEWEST_PHOTOS, None, &["photos", "newest.json"])?;
        let mut pairs = Vec::new();
        if let Some(sizes) = sizes.query_value() {
            pairs.push(("returnSizes", sizes));
        }
        pairs.extend(paging.query_pairs());
        append_query(&mut url, &pairs);
        Ok(self.get(op::LIST_NEWEST_PHOTOS, url, None))
    }

    pub fn parse_list_newest_photos(
        &self,
        response: HttpResponse,
        paging: Paging,
    ) -> Result<PhotosResponse, ApiError> {
        parse_photos(op::LIST_NEWEST_PHOTOS, &response, Some(paging))
    }

    pub fn build_find_photos_by_hash(&self, hash: &str) -> Result<HttpRequest<'static>, ApiError> {
        require(op::FIND_PHOTOS_BY_HASH, "hash", hash)?;
        let mut url = self.endpoint(op::FIND_PHOTOS_BY_HASH, None, &["photos", "list.json"])?;
        append_query(&mut url, &[("hash", hash.to_string())]);
        Ok(self.get(op::FIND_PHOTOS_BY_HASH, url, None))
    }

    /// No match is an empty `photos`, not an error.
    pub fn parse_find_photos_by_hash(&self, response: HttpResponse) -> Result<PhotosResponse, ApiError> {
        parse_photos(op::FIND_PHOTOS_BY_HASH, &response, None)
    }

    pub fn build_get_profile(&self, include_viewer: bool) -> Result<HttpRequest<'static>, ApiError> {
        let mut url = self.endpoint(op::GET_PROFILE, None, &["user", "profile.json"])?;
        if include_viewer {
            append_query(&mut url, &[("includeViewer", "1".to_string())]);
        }
        Ok(self.get(op::GET_PROFILE, url, None))
    }

    pub fn parse_get_profile(&self, response: HttpResponse) -> Result<ProfileResponse, ApiError> {
        let (status, profile) = parse_envelope(op::GET_PROFILE, &response)?;
        Ok(ProfileResponse { status, profile })
    }

    pub fn build_get_system_version(&self) -> Result<HttpRequest<'static>, ApiError> {
        let url = self.endpoint(op::GET_SYSTEM_VERSION, None, &["system", "version.json"])?;
        Ok(self.get(op::GET_SYSTEM_VERSION, url, None))
    }

    pub fn parse_get_system_version(
        &self,
        response: HttpResponse,
    ) -> Result<SystemVersionResponse, ApiError> {
        let (status, version) = parse_envelope(op::GET_SYSTEM_VERSION, &response)?;
        Ok(SystemVersionResponse { status, version })
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn build_create_album(&self, name: &str) -> Result<HttpRequest<'static>, ApiError> {
        require(op::CREATE_ALBUM, "album name", name)?;
        let url = self.endpoint(op::CREATE_ALBUM, None, &["album", "create.json"])?;
        let form = encode_form(&[("name", name)]);
        Ok(self.post(op::CREATE_ALBUM, url, None, RequestBody::Form(form)))
    }

    pub fn parse_create_album(&self, response: HttpResponse) -> Result<AlbumResponse, ApiError> {
        let (status, album) = parse_envelope::<Album>(op::CREATE_ALBUM, &response)?;
        Ok(AlbumResponse { status, album })
    }

    /// Only fields set in `update` are sent; see `PhotoUpdate`.
    pub fn build_update_photo_details(
        &self,
        photo_id: &str,
        update: &PhotoUpdate,
    ) -> Result<HttpRequest<'static>, ApiError> {
        require(op::UPDATE_PHOTO_DETAILS, "photo id", photo_id)?;
        let url = self.endpoint(op::UPDATE_PHOTO_DETAILS, None, &["photo", photo_id, "update.json"])?;

        let tags = match &update.tags {
            Some(tags) => {
                Some(join_tags(tags).map_err(|e| ApiError::invalid_input(op::UPDATE_PHOTO_DETAILS, e))?)
            }
            None => None,
        };
        let mut pairs: Vec<(&str, &str)> = Vec::new();
        if let Some(title) = &update.title {
            pairs.push(("title", title));
        }
        if let Some(description) = &update.description {
            pairs.push(("description", description));
        }
        if let Some(tags) = &tags {
            pairs.push(("tags", tags));
        }
        if let Some(permission) = update.permission {
            pairs.push(("permission", permission.as_param()));
        }
        let form = encode_form(&pairs);
        Ok(self.post(op::UPDATE_PHOTO_DETAILS, url, None, RequestBody::Form(form)))
    }

    pub fn parse_update_photo_details(&self, response: HttpResponse) -> Result<PhotoResponse, ApiError> {
        let (status, photo) = parse_envelope::<Photo>(op::UPDATE_PHOTO_DETAILS, &response)?;
        Ok(PhotoResponse { status, photo })
    }

    pub fn build_delete_photo(&self, photo_id: &str) -> Result<HttpRequest<'static>, ApiError> {
        require(op::DELETE_PHOTO, "photo id", photo_id)?;
        let url = self.endpoint(op::DELETE_PHOTO, None, &["photo", photo_id, "delete.json"])?;
        Ok(self.post(op::DELETE_PHOTO, url, None, RequestBody::Empty))
    }

    pub fn parse_delete_photo(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        parse_acknowledgement(op::DELETE_PHOTO, &response)
    }

    // -----------------------------------------------------------------------
    // Upload
    // -----------------------------------------------------------------------

    /// Open `path` and lay out a streaming multipart request for it.
    ///
    /// Fails with a local `Validation` rejection, before anything is sent, if
    /// the file cannot be opened or is empty. The returned request owns the
    /// open file; dropping it (sent or not) closes the handle.
    pub fn build_upload_photo<'a>(
        &self,
        path: &Path,
        metadata: &UploadMetaData,
        token: Option<&str>,
        host: Option<&str>,
        progress: Option<&'a dyn ProgressListener>,
    ) -> Result<HttpRequest<'a>, ApiError> {
        let url = self.endpoint(op::UPLOAD_PHOTO, host, &["photo", "upload.json"])?;
        let fields = upload_fields(metadata)?;

        let unreadable =
            |e: std::io::Error| ApiError::invalid_input(op::UPLOAD_PHOTO, format!("cannot read {}: {e}", path.display()));
        let file = File::open(path).map_err(unreadable)?;
        let meta = file.metadata().map_err(unreadable)?;
        if !meta.is_file() {
            return Err(ApiError::invalid_input(
                op::UPLOAD_PHOTO,
                format!("{} is not a regular file", path.display()),
            ));
        }
        if meta.len() == 0 {
            return Err(ApiError::invalid_input(
                op::UPLOAD_PHOTO,
                format!("{} is empty", path.display()),
            ));
        }

        let body = MultipartBody::new(&fields, "photo", path, file, meta.len(), progress);
        Ok(self.post(op::UPLOAD_PHOTO, url, token, RequestBody::Multipart(body)))
    }

    pub fn parse_upload_photo(&self, response: HttpResponse) -> Result<UploadResponse, ApiError> {
        let (status, photo) = parse_envelope::<Photo>(op::UPLOAD_PHOTO, &response)?;
        Ok(UploadResponse { status, photo })
    }

    // -----------------------------------------------------------------------
    // Authorization and tokens
    // -----------------------------------------------------------------------

    /// URL to open in a browser to start OAuth authorization. No request is
    /// made; exchanging the result for credentials happens elsewhere.
    pub fn oauth_url(&self, app_name: &str, callback_url: &str) -> Result<String, ApiError> {
        require(op::OAUTH_URL, "app name", app_name)?;
        require(op::OAUTH_URL, "callback URL", callback_url)?;
        let mut url = self.endpoint(op::OAUTH_URL, None, &["v1", "oauth", "authorize"])?;
        append_query(
            &mut url,
            &[
                ("oauth_callback", callback_url.to_string()),
                ("name", app_name.to_string()),
                ("tokenType", "access".to_string()),
            ],
        );
        Ok(url.into())
    }

    pub fn build_create_token_for_photo(&self, photo_id: &str) -> Result<HttpRequest<'static>, ApiError> {
        require(op::CREATE_TOKEN_FOR_PHOTO, "photo id", photo_id)?;
        let url = self.endpoint(
            op::CREATE_TOKEN_FOR_PHOTO,
            None,
            &["token", "photo", photo_id, "create.json"],
        )?;
        Ok(self.post(op::CREATE_TOKEN_FOR_PHOTO, url, None, RequestBody::Empty))
    }

    pub fn parse_create_token_for_photo(&self, response: HttpResponse) -> Result<TokenResponse, ApiError> {
        let (status, token) = parse_envelope(op::CREATE_TOKEN_FOR_PHOTO, &response)?;
        Ok(TokenResponse { status, token })
    }

    pub fn build_validate_upload_token(&self, token: &str) -> Result<HttpRequest<'static>, ApiError> {
        require(op::VALIDATE_UPLOAD_TOKEN, "token", token)?;
        let url = self.endpoint(
            op::VALIDATE_UPLOAD_TOKEN,
            None,
            &["token", "upload", token, "validate.json"],
        )?;
        Ok(self.get(op::VALIDATE_UPLOAD_TOKEN, url, None))
    }

    pub fn parse_validate_upload_token(
        &self,
        response: HttpResponse,
    ) -> Result<TokenValidationResponse, ApiError> {
        let (status, validation) = parse_envelope(op::VALIDATE_UPLOAD_TOKEN, &response)?;
        Ok(TokenValidationResponse { status, validation })
    }

    pub fn build_notify_upload_finished(
        &self,
        token: &str,
        host: Option<&str>,
        uploader_name: Option<&str>,
        count: u32,
    ) -> Result<HttpRequest<'static>, ApiError> {
        require(op::NOTIFY_UPLOAD_FINISHED, "token", token)?;
        let url = self.endpoint(
            op::NOTIFY_UPLOAD_FINISHED,
            host,
            &["photos", "upload", token, "notify.json"],
        )?;
        let count = count.to_string();
        let mut pairs = vec![("count", count.as_str())];
        if let Some(uploader) = uploader_name {
            pairs.push(("uploader", uploader));
        }
        let form = encode_form(&pairs);
        Ok(self.post(op::NOTIFY_UPLOAD_FINISHED, url, None, RequestBody::Form(form)))
    }

    pub fn parse_notify_upload_finished(&self, response: HttpResponse) -> Result<Acknowledgement, ApiError> {
        parse_acknowledgement(op::NOTIFY_UPLOAD_FINISHED, &response)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Base URL, or `host` with the base path kept. `host` is either a full
    /// `http(s)://` URL or a bare authority that inherits the base scheme.
    fn base_for(&self, operation: &'static str, host: Option<&str>) -> Result<Url, ApiError> {
        let Some(host) = host.map(str::trim).filter(|h| !h.is_empty()) else {
            return Ok(self.base_url.clone());
        };
        let candidate = if host.contains("://") {
            host.to_string()
        } else {
            format!("{}://{host}", self.base_url.scheme())
        };
        let invalid = |reason: String| ApiError::invalid_input(operation, format!("invalid host {host:?}: {reason}"));
        let mut url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid("expected an http(s) host".to_string()));
        }
        url.set_path(self.base_url.path());
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }

    fn endpoint(&self, operation: &'static str, host: Option<&str>, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_for(operation, host)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::invalid_input(operation, "base URL cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn headers(&self, token: Option<&str>) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(agent) = &self.user_agent {
            headers.push(("user-agent".to_string(), agent.clone()));
        }
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.push((TOKEN_HEADER.to_string(), token.to_string()));
        }
        headers
    }

    fn get(&self, operation: &'static str, url: Url, token: Option<&str>) -> HttpRequest<'static> {
        tracing::debug!(operation, method = "GET", url = %url, "built request");
        HttpRequest {
            method: HttpMethod::Get,
            url: url.into(),
            headers: self.headers(token),
            body: RequestBody::Empty,
        }
    }

    fn post<'a>(
        &self,
        operation: &'static str,
        url: Url,
        token: Option<&str>,
        body: RequestBody<'a>,
    ) -> HttpRequest<'a> {
        tracing::debug!(operation, method = "POST", url = %url, body_len = body.len(), "built request");
        let mut headers = self.headers(token);
        if let Some(content_type) = body.content_type() {
            headers.push(("content-type".to_string(), content_type));
        }
        HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            headers,
            body,
        }
    }
}

fn require(operation: &'static str, what: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::invalid_input(operation, format!("{what} must not be empty")));
    }
    Ok(())
}

fn append_query(url: &mut Url, pairs: &[(&str, String)]) {
    if pairs.is_empty() {
        return;
    }
    let mut query = url.query_pairs_mut();
    for (key, value) in pairs {
        query.append_pair(key, value);
    }
}

fn encode_form(pairs: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

fn upload_fields(metadata: &UploadMetaData) -> Result<Vec<FormField>, ApiError> {
    let mut fields = Vec::new();
    let mut push = |name: &'static str, value: &str| {
        fields.push(FormField {
            name,
            value: value.to_string(),
        })
    };
    if let Some(title) = &metadata.title {
        push("title", title);
    }
    if let Some(description) = &metadata.description {
        push("description", description);
    }
    if let Some(tags) = &metadata.tags {
        let tags = join_tags(tags).map_err(|e| ApiError::invalid_input(op::UPLOAD_PHOTO, e))?;
        push("tags", &tags);
    }
    if let Some(album) = &metadata.album {
        push("albums", album);
    }
    if let Some(permission) = metadata.permission {
        push("permission", permission.as_param());
    }
    Ok(fields)
}

fn parse_photos(
    operation: &'static str,
    response: &HttpResponse,
    paging: Option<Paging>,
) -> Result<PhotosResponse, ApiError> {
    let page_size = paging.and_then(|p| p.page_size());
    let (status, photos, paging) = parse_listing::<Photo>(operation, response, page_size)?;
    Ok(PhotosResponse {
        status,
        photos,
        paging,
    })
}

fn parse_acknowledgement(operation: &'static str, response: &HttpResponse) -> Result<Acknowledgement, ApiError> {
    let (status, _) = parse_envelope::<serde_json::Value>(operation, response)?;
    Ok(Acknowledgement { status })
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;
    use crate::error::RejectionKind;
    use crate::types::{ImageSize, Permission};

    fn client() -> TroveboxClient {
        TroveboxClient::new(ClientConfig::new("http://localhost:3000")).unwrap()
    }

    fn form_of(req: &HttpRequest<'_>) -> Vec<(String, String)> {
        form_urlencoded::parse(req.body.as_form().unwrap().as_bytes())
            .into_owned()
            .collect()
    }

    fn rejection_kind(err: ApiError) -> (RejectionKind, bool) {
        match err {
            ApiError::Rejected { rejection, .. } => (rejection.kind, rejection.is_local()),
            other => panic!("expected rejection, got {other}"),
        }
    }

    #[test]
    fn build_list_tags_produces_correct_request() {
        let req = client().build_list_tags().unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/tags/list.json");
        assert!(req.body.is_empty());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_list_albums_with_paging_and_skip_empty() {
        let req = client()
            .build_list_albums(Paging::new(2, 10), true)
            .unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/albums/list.json?page=2&pageSize=10&skipEmpty=1"
        );
        let req = client().build_list_albums(None, false).unwrap();
        assert_eq!(req.url, "http://localhost:3000/albums/list.json");
    }

    #[test]
    fn build_get_photo_with_sizes_token_and_host() {
        let sizes = ReturnSizes::new().with(ImageSize::new(200, 200).unwrap());
        let req = client()
            .build_get_photo("p 1", &sizes, Some("share-1"), Some("alt.example.com:8080"))
            .unwrap();
        assert_eq!(
            req.url,
            "http://alt.example.com:8080/photo/p%201/view.json?returnSizes=200x200"
        );
        assert_eq!(req.header(TOKEN_HEADER), Some("share-1"));
    }

    #[test]
    fn host_override_keeps_base_path() {
        let client = TroveboxClient::new(ClientConfig::new("http://localhost:3000/api/")).unwrap();
        let req = client
            .build_get_photo("p1", &ReturnSizes::new(), None, Some("https://cdn.example.com/ignored?q=1"))
            .unwrap();
        assert_eq!(req.url, "https://cdn.example.com/api/photo/p1/view.json");
    }

    #[test]
    fn invalid_host_is_local_validation() {
        let err = client()
            .build_get_photo("p1", &ReturnSizes::new(), None, Some("ftp://files.example.com"))
            .unwrap_err();
        assert_eq!(rejection_kind(err), (RejectionKind::Validation, true));
    }

    #[test]
    fn build_list_photos_with_every_option() {
        let query = PhotoListQuery::new()
            .sizes(ReturnSizes::new().with(ImageSize::cropped(100, 100).unwrap()))
            .tags(["sunset", "beach"])
            .album("a1")
            .token("tok")
            .sort_by("dateTaken,desc")
            .paging(Paging::new(1, 5).unwrap());
        let req = client().build_list_photos(&query).unwrap();
        assert_eq!(
            req.url,
            "http://localhost:3000/photos/list.json?returnSizes=100x100xCR&tags=beach%2Csunset&album=a1&sortBy=dateTaken%2Cdesc&page=1&pageSize=5"
        );
        assert_eq!(req.header(TOKEN_HEADER), Some("tok"));
    }

    #[test]
    fn build_list_photos_without_options_has_no_query() {
        let req = client().build_list_photos(&PhotoListQuery::new()).unwrap();
        assert_eq!(req.url, "http://localhost:3000/photos/list.json");
        assert!(req.header(TOKEN_HEADER).is_none());
    }

    #[test]
    fn build_list_newest_photos_uses_feed_endpoint() {
        let req = client()
            .build_list_newest_photos(&ReturnSizes::new(), Paging::page(1).unwrap())
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/photos/newest.json?page=1");
    }

    #[test]
    fn build_find_photos_by_hash() {
        let req = client().build_find_photos_by_hash("deadbeef").unwrap();
        assert_eq!(req.url, "http://localhost:3000/photos/list.json?hash=deadbeef");
        let err = client().build_find_photos_by_hash("").unwrap_err();
        assert_eq!(rejection_kind(err), (RejectionKind::Validation, true));
    }

    #[test]
    fn update_omits_unset_fields() {
        let update = PhotoUpdate::new().title("New title");
        let req = client().build_update_photo_details("p1", &update).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/photo/p1/update.json");
        assert_eq!(req.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(form_of(&req), vec![("title".to_string(), "New title".to_string())]);
    }

    #[test]
    fn update_sends_empty_values_to_clear() {
        let update = PhotoUpdate::new().title("").clear_tags().permission(Permission::Private);
        let req = client().build_update_photo_details("p1", &update).unwrap();
        assert_eq!(
            form_of(&req),
            vec![
                ("title".to_string(), String::new()),
                ("tags".to_string(), String::new()),
                ("permission".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn update_rejects_tag_with_comma() {
        let update = PhotoUpdate::new().tags(["a,b"]);
        let err = client().build_update_photo_details("p1", &update).unwrap_err();
        assert_eq!(rejection_kind(err), (RejectionKind::Validation, true));
    }

    #[test]
    fn build_notify_upload_finished() {
        let req = client()
            .build_notify_upload_finished("up-1", None, Some("Ann Lee"), 3)
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/photos/upload/up-1/notify.json");
        assert_eq!(
            form_of(&req),
            vec![
                ("count".to_string(), "3".to_string()),
                ("uploader".to_string(), "Ann Lee".to_string()),
            ]
        );
    }

    #[test]
    fn oauth_url_is_pure() {
        let url = client()
            .oauth_url("My App", "myapp://callback")
            .unwrap();
        assert_eq!(
            url,
            "http://localhost:3000/v1/oauth/authorize?oauth_callback=myapp%3A%2F%2Fcallback&name=My+App&tokenType=access"
        );
    }

    #[test]
    fn user_agent_is_attached() {
        let client = TroveboxClient::new(ClientConfig::new("http://localhost:3000").with_user_agent("trovebox-test/1"))
            .unwrap();
        let req = client.build_get_system_version().unwrap();
        assert_eq!(req.header("user-agent"), Some("trovebox-test/1"));
    }

    #[test]
    fn upload_of_empty_file_fails_before_sending() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = client()
            .build_upload_photo(file.path(), &UploadMetaData::new(), None, None, None)
            .unwrap_err();
        assert_eq!(rejection_kind(err), (RejectionKind::Validation, true));
    }

    #[test]
    fn upload_of_missing_file_fails_before_sending() {
        let err = client()
            .build_upload_photo(Path::new("/nonexistent/photo.jpg"), &UploadMetaData::new(), None, None, None)
            .unwrap_err();
        assert_eq!(rejection_kind(err), (RejectionKind::Validation, true));
    }

    #[test]
    fn upload_sends_only_set_metadata() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"PNGDATA").unwrap();
        let metadata = UploadMetaData::new().tags(["b", "a"]).album("x");
        let mut req = client()
            .build_upload_photo(file.path(), &metadata, Some("up-1"), None, None)
            .unwrap();

        assert_eq!(req.url, "http://localhost:3000/photo/upload.json");
        assert_eq!(req.header(TOKEN_HEADER), Some("up-1"));
        assert!(req
            .header("content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));

        let mut sent = String::new();
        req.take_body().read_to_string(&mut sent).unwrap();
        assert!(sent.contains("name=\"tags\"\r\n\r\na,b\r\n"));
        assert!(sent.contains("name=\"albums\"\r\n\r\nx\r\n"));
        assert!(!sent.contains("name=\"title\""));
        assert!(!sent.contains("name=\"permission\""));
        assert!(sent.contains("PNGDATA"));
    }

    #[test]
    fn parse_list_tags_success() {
        let response = HttpResponse::new(
            200,
            r#"{"code":200,"message":"Tags","result":[{"id":"sunset","count":2}]}"#,
        );
        let tags = client().parse_list_tags(response).unwrap();
        assert_eq!(tags.status.message, "Tags");
        assert_eq!(tags.tags, vec![Tag { id: "sunset".into(), count: 2 }]);
    }

    #[test]
    fn parse_get_album_not_found() {
        let response = HttpResponse::new(404, r#"{"code":404,"message":"Album not found","result":false}"#);
        let err = client().parse_get_album(response).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn parse_create_album_conflict() {
        let response = HttpResponse::new(409, r#"{"code":409,"message":"Album exists","result":null}"#);
        let err = client().parse_create_album(response).unwrap_err();
        assert_eq!(err.rejection_kind(), Some(RejectionKind::Conflict));
    }

    #[test]
    fn parse_get_photo_access_denied() {
        let response = HttpResponse::new(403, r#"{"code":403,"message":"Token required","result":null}"#);
        let err = client().parse_get_photo(response).unwrap_err();
        assert!(err.is_access_denied());
    }

    #[test]
    fn parse_find_by_hash_empty_is_success() {
        let response = HttpResponse::new(200, r#"{"code":200,"message":"","result":[]}"#);
        let photos = client().parse_find_photos_by_hash(response).unwrap();
        assert!(photos.photos.is_empty());
        assert!(photos.paging.is_none());
    }

    #[test]
    fn parse_delete_photo_acknowledgement() {
        let response = HttpResponse::new(200, r#"{"code":204,"message":"Photo deleted","result":true}"#);
        let ack = client().parse_delete_photo(response).unwrap();
        assert_eq!(ack.status.code, 204);
    }

    #[test]
    fn parse_bad_json_is_malformed() {
        let response = HttpResponse::new(200, "<html>maintenance</html>");
        let err = client().parse_get_system_version(response).unwrap_err();
        assert!(matches!(
            err,
            ApiError::MalformedResponse {
                operation: "get_system_version",
                ..
            }
        ));
    }

    #[test]
    fn parse_validate_upload_token() {
        let response = HttpResponse::new(
            200,
            r#"{"code":200,"message":"","result":{"valid":true,"token":{"id":"up-1","type":"upload","data":"owner"}}}"#,
        );
        let validation = client().parse_validate_upload_token(response).unwrap();
        assert!(validation.is_valid());
    }
}
