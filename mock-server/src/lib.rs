use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const TOKEN_HEADER: &str = "x-trovebox-token";
/// Upload token present in every fresh store.
pub const DEMO_UPLOAD_TOKEN: &str = "upload-demo";
pub const DEFAULT_PAGE_SIZE: usize = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    pub message: String,
    pub result: Value,
}

#[derive(Clone, Debug)]
pub struct StoredPhoto {
    pub id: String,
    pub hash: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub albums: Vec<String>,
    pub permission: u8,
    pub filename: String,
    pub size: usize,
    pub date_uploaded: i64,
}

#[derive(Clone, Debug)]
pub struct StoredAlbum {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct StoredToken {
    pub id: String,
    pub kind: &'static str,
    pub data: String,
}

#[derive(Debug)]
pub struct Store {
    pub photos: Vec<StoredPhoto>,
    pub albums: Vec<StoredAlbum>,
    pub tokens: HashMap<String, StoredToken>,
    pub finished_uploads: HashMap<String, u32>,
    clock: i64,
}

impl Default for Store {
    fn default() -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(
            DEMO_UPLOAD_TOKEN.to_string(),
            StoredToken {
                id: DEMO_UPLOAD_TOKEN.to_string(),
                kind: "upload",
                data: "owner@trovebox.test".to_string(),
            },
        );
        Self {
            photos: Vec::new(),
            albums: Vec::new(),
            tokens,
            finished_uploads: HashMap::new(),
            clock: 1_700_000_000,
        }
    }
}

impl Store {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn token(&self, id: &str, kind: &str) -> Option<&StoredToken> {
        self.tokens.get(id).filter(|t| t.kind == kind)
    }

    fn photo_unlocked(&self, photo: &StoredPhoto, token: Option<&str>) -> bool {
        photo.permission == 1
            || token
                .and_then(|t| self.token(t, "photo"))
                .is_some_and(|t| t.data == photo.id)
    }

    fn album_count(&self, album_id: &str) -> usize {
        self.photos
            .iter()
            .filter(|p| p.albums.iter().any(|a| a == album_id))
            .count()
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with_store(Store::default())
}

pub fn app_with_store(store: Store) -> Router {
    router(Arc::new(RwLock::new(store)))
}

/// Router over a store the caller keeps a handle to.
pub fn router(db: Db) -> Router {
    Router::new()
        .route("/tags/list.json", get(list_tags))
        .route("/albums/list.json", get(list_albums))
        .route("/album/create.json", post(create_album))
        .route("/album/{id}/view.json", get(get_album))
        .route("/photos/list.json", get(list_photos))
        .route("/photos/newest.json", get(list_newest_photos))
        .route("/photo/upload.json", post(upload_photo))
        .route("/photo/{id}/view.json", get(get_photo))
        .route("/photo/{id}/update.json", post(update_photo))
        .route("/photo/{id}/delete.json", post(delete_photo))
        .route("/user/profile.json", get(get_profile))
        .route("/system/version.json", get(get_system_version))
        .route("/token/photo/{id}/create.json", post(create_photo_token))
        .route("/token/upload/{token}/validate.json", get(validate_upload_token))
        .route("/photos/upload/{token}/notify.json", post(notify_upload_finished))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

#[derive(Debug)]
pub struct Failure(StatusCode, String);

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self(status, message.into())
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        tracing::debug!(status = self.0.as_u16(), message = %self.1, "rejecting request");
        let body = Envelope {
            code: self.0.as_u16(),
            message: self.1,
            result: Value::Null,
        };
        (self.0, Json(body)).into_response()
    }
}

type Reply = Result<Json<Envelope>, Failure>;

fn ok(message: &str, result: Value) -> Reply {
    Ok(Json(Envelope {
        code: 200,
        message: message.to_string(),
        result,
    }))
}

fn request_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn render_photo(photo: &StoredPhoto, sizes: &[String]) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("id".into(), json!(photo.id));
    obj.insert("hash".into(), json!(photo.hash));
    obj.insert("title".into(), json!(photo.title));
    obj.insert("description".into(), json!(photo.description));
    obj.insert("tags".into(), json!(photo.tags));
    obj.insert("albums".into(), json!(photo.albums));
    obj.insert("permission".into(), json!(photo.permission));
    obj.insert("filenameOriginal".into(), json!(photo.filename));
    obj.insert("dateUploaded".into(), json!(photo.date_uploaded));
    obj.insert("url".into(), json!(format!("/p/{}", photo.id)));
    obj.insert(
        "pathOriginal".into(),
        json!(format!("/photos/original/{}/{}", photo.id, photo.filename)),
    );
    for size in sizes {
        obj.insert(
            format!("path{size}"),
            json!(format!("/photos/custom/{}_{size}.jpg", photo.id)),
        );
    }
    obj
}

fn render_album(album: &StoredAlbum, count: usize) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("id".into(), json!(album.id));
    obj.insert("name".into(), json!(album.name));
    obj.insert("count".into(), json!(count));
    obj
}

fn render_token(token: &StoredToken) -> Value {
    json!({ "id": token.id, "type": token.kind, "data": token.data })
}

/// Slice `items` to the requested window and stamp each with paging fields.
fn paginate(items: Vec<Map<String, Value>>, page: Option<u32>, page_size: Option<u32>) -> Result<Value, Failure> {
    let page = page.unwrap_or(1) as usize;
    let page_size = page_size.map(|s| s as usize).unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 || page_size == 0 {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "page and pageSize must be positive"));
    }
    let total_rows = items.len();
    let total_pages = total_rows.div_ceil(page_size);
    let window = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .map(|mut item| {
            item.insert("currentPage".into(), json!(page));
            item.insert("pageSize".into(), json!(page_size));
            item.insert("totalPages".into(), json!(total_pages));
            item.insert("totalRows".into(), json!(total_rows));
            Value::Object(item)
        })
        .collect();
    Ok(Value::Array(window))
}

// --- tags ---

async fn list_tags(State(db): State<Db>) -> Reply {
    let store = db.read().await;
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for photo in &store.photos {
        for tag in &photo.tags {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    let tags: Vec<Value> = counts
        .into_iter()
        .map(|(id, count)| json!({ "id": id, "count": count }))
        .collect();
    ok("Tags", Value::Array(tags))
}

// --- albums ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub skip_empty: Option<String>,
}

async fn list_albums(State(db): State<Db>, Query(params): Query<AlbumListParams>) -> Reply {
    let store = db.read().await;
    let skip_empty = params.skip_empty.as_deref() == Some("1");
    let albums = store
        .albums
        .iter()
        .map(|a| (a, store.album_count(&a.id)))
        .filter(|(_, count)| !skip_empty || *count > 0)
        .map(|(a, count)| render_album(a, count))
        .collect();
    ok("Albums", paginate(albums, params.page, params.page_size)?)
}

async fn get_album(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    let store = db.read().await;
    let album = store
        .albums
        .iter()
        .find(|a| a.id == id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Album not found"))?;
    ok("Album", Value::Object(render_album(album, store.album_count(&id))))
}

#[derive(Debug, Deserialize)]
pub struct CreateAlbumForm {
    pub name: String,
}

async fn create_album(State(db): State<Db>, Form(input): Form<CreateAlbumForm>) -> Reply {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "Album name is required"));
    }
    let mut store = db.write().await;
    if store.albums.iter().any(|a| a.name.eq_ignore_ascii_case(&name)) {
        return Err(Failure::new(StatusCode::CONFLICT, format!("Album {name} already exists")));
    }
    let album = StoredAlbum {
        id: format!("a{}", store.albums.len() + 1),
        name,
    };
    store.albums.push(album.clone());
    tracing::info!(id = %album.id, "album created");
    ok("Album created", Value::Object(render_album(&album, 0)))
}

// --- photos ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoListParams {
    pub return_sizes: Option<String>,
    pub tags: Option<String>,
    pub album: Option<String>,
    pub hash: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_photos(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<PhotoListParams>,
) -> Reply {
    let store = db.read().await;
    let token = request_token(&headers);
    let tags = split_list(params.tags.as_deref());
    let sizes = split_list(params.return_sizes.as_deref());

    let mut photos: Vec<&StoredPhoto> = store
        .photos
        .iter()
        .filter(|p| store.photo_unlocked(p, token))
        .filter(|p| tags.iter().all(|t| p.tags.contains(t)))
        .filter(|p| params.album.as_ref().map_or(true, |a| p.albums.contains(a)))
        .filter(|p| params.hash.as_ref().map_or(true, |h| &p.hash == h))
        .collect();

    match params.sort_by.as_deref() {
        Some("dateUploaded,desc") => photos.sort_by(|a, b| b.date_uploaded.cmp(&a.date_uploaded)),
        Some("title,asc") => photos.sort_by(|a, b| a.title.cmp(&b.title)),
        _ => {}
    }

    let items = photos.into_iter().map(|p| render_photo(p, &sizes)).collect();
    ok("Photos", paginate(items, params.page, params.page_size)?)
}

async fn list_newest_photos(State(db): State<Db>, Query(params): Query<PhotoListParams>) -> Reply {
    let store = db.read().await;
    let sizes = split_list(params.return_sizes.as_deref());
    let mut photos: Vec<&StoredPhoto> = store.photos.iter().filter(|p| p.permission == 1).collect();
    photos.sort_by(|a, b| b.date_uploaded.cmp(&a.date_uploaded));
    let items = photos.into_iter().map(|p| render_photo(p, &sizes)).collect();
    ok("Newest photos", paginate(items, params.page, params.page_size)?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoViewParams {
    pub return_sizes: Option<String>,
}

async fn get_photo(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<PhotoViewParams>,
) -> Reply {
    let store = db.read().await;
    let photo = store
        .photos
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Photo not found"))?;
    if !store.photo_unlocked(photo, request_token(&headers)) {
        return Err(Failure::new(StatusCode::FORBIDDEN, "A valid token is required for this photo"));
    }
    let sizes = split_list(params.return_sizes.as_deref());
    ok("Photo", Value::Object(render_photo(photo, &sizes)))
}

/// The body is drained before any rejection so clients still streaming it
/// see the error response rather than a reset connection.
async fn upload_photo(State(db): State<Db>, headers: HeaderMap, mut multipart: Multipart) -> Reply {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, format!("Bad multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, format!("Bad photo part: {e}")))?;
            file = Some((filename, bytes.to_vec()));
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| Failure::new(StatusCode::BAD_REQUEST, format!("Bad field {name}: {e}")))?;
            fields.insert(name, value);
        }
    }

    if let Some(token) = request_token(&headers) {
        if db.read().await.token(token, "upload").is_none() {
            return Err(Failure::new(StatusCode::FORBIDDEN, "Invalid upload token"));
        }
    }

    let (filename, bytes) = file
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| Failure::new(StatusCode::BAD_REQUEST, "No photo was uploaded"))?;
    let hash = blake3::hash(&bytes).to_hex().to_string();

    let mut store = db.write().await;
    if store.photos.iter().any(|p| p.hash == hash) {
        return Err(Failure::new(StatusCode::CONFLICT, "This photo already exists"));
    }
    let albums = split_list(fields.get("albums").map(String::as_str));
    if let Some(missing) = albums.iter().find(|a| !store.albums.iter().any(|s| &s.id == *a)) {
        return Err(Failure::new(StatusCode::NOT_FOUND, format!("Album {missing} not found")));
    }
    let permission = match fields.get("permission").map(String::as_str) {
        None | Some("1") => 1,
        Some("0") => 0,
        Some(other) => {
            return Err(Failure::new(StatusCode::BAD_REQUEST, format!("Invalid permission {other}")));
        }
    };

    let date_uploaded = store.tick();
    let photo = StoredPhoto {
        id: Uuid::new_v4().simple().to_string()[..12].to_string(),
        hash,
        title: fields.get("title").cloned(),
        description: fields.get("description").cloned(),
        tags: split_list(fields.get("tags").map(String::as_str)).into_iter().collect(),
        albums,
        permission,
        filename,
        size: bytes.len(),
        date_uploaded,
    };
    tracing::info!(id = %photo.id, size = photo.size, "photo uploaded");
    store.photos.push(photo.clone());
    ok("Photo uploaded", Value::Object(render_photo(&photo, &[])))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePhotoForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub permission: Option<u8>,
}

async fn update_photo(
    State(db): State<Db>,
    Path(id): Path<String>,
    Form(input): Form<UpdatePhotoForm>,
) -> Reply {
    if input.permission.is_some_and(|p| p > 1) {
        return Err(Failure::new(StatusCode::BAD_REQUEST, "Invalid permission"));
    }
    let mut store = db.write().await;
    let photo = store
        .photos
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Photo not found"))?;
    if let Some(title) = input.title {
        photo.title = Some(title).filter(|t| !t.is_empty());
    }
    if let Some(description) = input.description {
        photo.description = Some(description).filter(|d| !d.is_empty());
    }
    if let Some(tags) = input.tags {
        photo.tags = split_list(Some(tags.as_str())).into_iter().collect();
    }
    if let Some(permission) = input.permission {
        photo.permission = permission;
    }
    ok("Photo updated", Value::Object(render_photo(photo, &[])))
}

async fn delete_photo(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    let mut store = db.write().await;
    let index = store
        .photos
        .iter()
        .position(|p| p.id == id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, "Photo not found"))?;
    store.photos.remove(index);
    store.tokens.retain(|_, t| !(t.kind == "photo" && t.data == id));
    ok("Photo deleted", Value::Bool(true))
}

// --- profile and system ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileParams {
    pub include_viewer: Option<String>,
}

async fn get_profile(State(db): State<Db>, Query(params): Query<ProfileParams>) -> Reply {
    let store = db.read().await;
    let tag_count = store
        .photos
        .iter()
        .flat_map(|p| p.tags.iter())
        .collect::<BTreeSet<_>>()
        .len();
    let mut profile = json!({
        "id": "owner@trovebox.test",
        "name": "Mock Owner",
        "isOwner": true,
        "counts": {
            "photos": store.photos.len(),
            "albums": store.albums.len(),
            "tags": tag_count,
            "storage": store.photos.iter().map(|p| p.size).sum::<usize>(),
        },
    });
    if params.include_viewer.as_deref() == Some("1") {
        profile["viewer"] = json!({ "id": "owner@trovebox.test", "name": "Mock Owner", "isOwner": true });
    }
    ok("Profile", profile)
}

async fn get_system_version() -> Reply {
    ok(
        "Version",
        json!({ "api": "v1", "system": "4.0.0", "database": "mock", "filesystem": "memory" }),
    )
}

// --- tokens ---

async fn create_photo_token(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    let mut store = db.write().await;
    if !store.photos.iter().any(|p| p.id == id) {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Photo not found"));
    }
    let token = StoredToken {
        id: Uuid::new_v4().simple().to_string(),
        kind: "photo",
        data: id,
    };
    store.tokens.insert(token.id.clone(), token.clone());
    ok("Token created", render_token(&token))
}

async fn validate_upload_token(State(db): State<Db>, Path(token): Path<String>) -> Reply {
    let store = db.read().await;
    let found = store.token(&token, "upload");
    ok(
        "Token validation",
        json!({ "valid": found.is_some(), "token": found.map(render_token) }),
    )
}

#[derive(Debug, Deserialize)]
pub struct NotifyForm {
    pub count: u32,
    pub uploader: Option<String>,
}

async fn notify_upload_finished(
    State(db): State<Db>,
    Path(token): Path<String>,
    Form(input): Form<NotifyForm>,
) -> Reply {
    let mut store = db.write().await;
    if store.token(&token, "upload").is_none() {
        return Err(Failure::new(StatusCode::NOT_FOUND, "Upload token not found"));
    }
    tracing::info!(token = %token, count = input.count, uploader = ?input.uploader, "uploads finished");
    store.finished_uploads.insert(token, input.count);
    ok("Notification received", Value::Bool(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo(id: &str) -> StoredPhoto {
        StoredPhoto {
            id: id.to_string(),
            hash: format!("hash-{id}"),
            title: None,
            description: None,
            tags: BTreeSet::new(),
            albums: Vec::new(),
            permission: 1,
            filename: format!("{id}.jpg"),
            size: 3,
            date_uploaded: 1,
        }
    }

    #[test]
    fn envelope_serializes_to_json() {
        let envelope = Envelope {
            code: 200,
            message: "ok".to_string(),
            result: json!([]),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["code"], 200);
        assert_eq!(json["result"], json!([]));
    }

    #[test]
    fn render_photo_includes_requested_sizes() {
        let rendered = render_photo(&photo("p1"), &["200x200".to_string()]);
        assert_eq!(rendered["path200x200"], "/photos/custom/p1_200x200.jpg");
        assert_eq!(rendered["pathOriginal"], "/photos/original/p1/p1.jpg");
        assert!(!rendered.contains_key("currentPage"));
    }

    #[test]
    fn paginate_windows_and_stamps_items() {
        let items = (0..5).map(|i| render_photo(&photo(&format!("p{i}")), &[])).collect();
        let page = paginate(items, Some(2), Some(2)).unwrap();
        let page = page.as_array().unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["id"], "p2");
        assert_eq!(page[0]["totalPages"], 3);
        assert_eq!(page[0]["totalRows"], 5);
        assert_eq!(page[0]["currentPage"], 2);
    }

    #[test]
    fn paginate_rejects_zero_page() {
        assert!(paginate(Vec::new(), Some(0), None).is_err());
        assert!(paginate(Vec::new(), Some(1), Some(0)).is_err());
    }

    #[test]
    fn split_list_drops_empty_entries() {
        assert_eq!(split_list(Some("a, b,,c")), vec!["a", "b", "c"]);
        assert!(split_list(Some("")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn private_photo_needs_matching_token() {
        let mut store = Store::default();
        let mut private = photo("p1");
        private.permission = 0;
        store.tokens.insert(
            "t1".to_string(),
            StoredToken {
                id: "t1".to_string(),
                kind: "photo",
                data: "p1".to_string(),
            },
        );
        assert!(!store.photo_unlocked(&private, None));
        assert!(!store.photo_unlocked(&private, Some(DEMO_UPLOAD_TOKEN)));
        assert!(store.photo_unlocked(&private, Some("t1")));
    }

    #[test]
    fn update_form_all_fields_optional() {
        let input: UpdatePhotoForm = serde_json::from_str("{}").unwrap();
        assert!(input.title.is_none());
        assert!(input.tags.is_none());
    }
}
