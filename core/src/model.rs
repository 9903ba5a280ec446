//! Records returned by the service.
//!
//! These mirror the JSON the server sends but are defined here independently;
//! the integration tests against the mock server catch schema drift.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Deserialize;
use serde_json::Value;

use crate::lenient;
use crate::types::{ImageSize, Permission};

/// A tag in use on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub count: u32,
}

/// An album. Albums group photos by reference; they do not own them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    pub count: u32,
}

/// A photo with the renditions the server resolved for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawPhoto")]
pub struct Photo {
    pub id: String,
    pub hash: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
    pub albums: Vec<String>,
    pub permission: Option<Permission>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub date_taken: Option<i64>,
    pub date_uploaded: Option<i64>,
    pub filename_original: Option<String>,
    /// Web page for the photo.
    pub url: Option<String>,
    pub original_url: Option<String>,
    /// Rendition URLs keyed by `ImageSize::key()`.
    pub urls: BTreeMap<String, String>,
}

impl Photo {
    pub fn url_for(&self, size: &ImageSize) -> Option<&str> {
        self.urls.get(&size.key()).map(String::as_str)
    }

    /// The album this photo is filed under, if any.
    pub fn album(&self) -> Option<&str> {
        self.albums.first().map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPhoto {
    id: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    albums: Vec<String>,
    #[serde(default)]
    permission: Option<Permission>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    width: Option<u32>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    height: Option<u32>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    date_taken: Option<i64>,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    date_uploaded: Option<i64>,
    #[serde(default)]
    filename_original: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

impl From<RawPhoto> for Photo {
    fn from(raw: RawPhoto) -> Self {
        let mut original_url = None;
        let mut urls = BTreeMap::new();
        for (key, value) in raw.extra {
            let (Some(size), Value::String(url)) = (key.strip_prefix("path"), value) else {
                continue;
            };
            if size == "Original" {
                original_url = Some(url);
            } else if let Ok(size) = size.parse::<ImageSize>() {
                urls.insert(size.key(), url);
            }
        }

        Photo {
            id: raw.id,
            hash: raw.hash,
            title: raw.title,
            description: raw.description,
            tags: raw.tags,
            albums: raw.albums,
            permission: raw.permission,
            width: raw.width,
            height: raw.height,
            date_taken: raw.date_taken,
            date_uploaded: raw.date_uploaded,
            filename_original: raw.filename_original,
            url: raw.url,
            original_url,
            urls,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileCounts {
    #[serde(default, deserialize_with = "lenient::number")]
    pub photos: u64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub albums: u64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub tags: u64,
    /// Bytes used.
    #[serde(default, deserialize_with = "lenient::number")]
    pub storage: u64,
}

/// Account profile. `viewer` is present only when requested and differs
/// from the owner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub counts: ProfileCounts,
    #[serde(default)]
    pub viewer: Option<Box<Profile>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemVersion {
    pub api: String,
    pub system: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub filesystem: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Photo,
    Album,
    Upload,
}

/// A share or upload token, scoped to one photo or one upload session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Id of the object the token grants access to.
    pub data: String,
    #[serde(default, deserialize_with = "lenient::optional_number")]
    pub date_expires: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenValidation {
    pub valid: bool,
    #[serde(default)]
    pub token: Option<Token>,
}
