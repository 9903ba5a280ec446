//! Value types callers construct to parameterise operations.
//!
//! # Design
//! All of these are immutable once built. Optional fields follow a single rule:
//! `None` means "leave it to the server" and is never put on the wire, while
//! `Some` of an empty value is sent and means "clear this".

use std::collections::BTreeSet;
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lenient;

/// A results window. `page_size: None` uses the server default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: NonZeroU32,
    page_size: Option<NonZeroU32>,
}

impl Paging {
    /// Returns `None` unless both values are at least 1.
    pub fn new(page: u32, page_size: u32) -> Option<Self> {
        Some(Self {
            page: NonZeroU32::new(page)?,
            page_size: Some(NonZeroU32::new(page_size)?),
        })
    }

    /// Page `page` with the server's default page size.
    pub fn page(page: u32) -> Option<Self> {
        Some(Self {
            page: NonZeroU32::new(page)?,
            page_size: None,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page.get()
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size.map(NonZeroU32::get)
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string())];
        if let Some(size) = self.page_size {
            pairs.push(("pageSize", size.to_string()));
        }
        pairs
    }
}

/// One requested rendition, e.g. `200x200` or `640x960xCR` (cropped).
/// Both dimensions are non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImageSize {
    width: NonZeroU32,
    height: NonZeroU32,
    crop: bool,
}

impl ImageSize {
    /// `None` when either dimension is zero.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            width: NonZeroU32::new(width)?,
            height: NonZeroU32::new(height)?,
            crop: false,
        })
    }

    pub fn cropped(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            crop: true,
            ..Self::new(width, height)?
        })
    }

    pub fn width(&self) -> u32 {
        self.width.get()
    }

    pub fn height(&self) -> u32 {
        self.height.get()
    }

    pub fn is_cropped(&self) -> bool {
        self.crop
    }

    /// Key used both in `returnSizes` and in the `path<key>` response fields.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)?;
        if self.crop {
            write!(f, "xCR")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid image size {0:?}")]
pub struct ParseImageSizeError(String);

impl FromStr for ImageSize {
    type Err = ParseImageSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseImageSizeError(s.to_string());
        let mut parts = s.split('x');
        let width = parts.next().and_then(|w| w.parse().ok()).ok_or_else(err)?;
        let height = parts.next().and_then(|h| h.parse().ok()).ok_or_else(err)?;
        let size = match parts.next() {
            None => Self::new(width, height),
            Some("CR") => Self::cropped(width, height),
            Some(_) => return Err(err()),
        };
        if parts.next().is_some() {
            return Err(err());
        }
        size.ok_or_else(err)
    }
}

/// The renditions to include in photo responses. Empty means the server's
/// default set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnSizes(BTreeSet<ImageSize>);

impl ReturnSizes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, size: ImageSize) -> Self {
        self.0.insert(size);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageSize> {
        self.0.iter()
    }

    /// Comma-joined `returnSizes` value, `None` when empty.
    pub(crate) fn query_value(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        Some(self.0.iter().map(ImageSize::key).collect::<Vec<_>>().join(","))
    }
}

impl FromIterator<ImageSize> for ReturnSizes {
    fn from_iter<I: IntoIterator<Item = ImageSize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Visibility of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u8")]
pub enum Permission {
    Private,
    Public,
}

impl Permission {
    pub fn as_param(&self) -> &'static str {
        match self {
            Permission::Private => "0",
            Permission::Public => "1",
        }
    }
}

impl From<Permission> for u8 {
    fn from(p: Permission) -> Self {
        match p {
            Permission::Private => 0,
            Permission::Public => 1,
        }
    }
}

impl TryFrom<u8> for Permission {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Permission::Private),
            1 => Ok(Permission::Public),
            other => Err(format!("unknown permission level {other}")),
        }
    }
}

// Older servers send the level as "0"/"1".
impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level: u8 = lenient::number(deserializer)?;
        Permission::try_from(level).map_err(de::Error::custom)
    }
}

/// Descriptive fields sent along with an upload. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadMetaData {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub album: Option<String>,
    pub permission: Option<Permission>,
}

impl UploadMetaData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }
}

/// Partial update of a photo's details.
///
/// A `None` field is left unchanged on the server. `Some("")` or `Some` of an
/// empty tag set clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub permission: Option<Permission>,
}

impl PhotoUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn clear_tags(mut self) -> Self {
        self.tags = Some(BTreeSet::new());
        self
    }

    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.tags.is_none() && self.permission.is_none()
    }
}

/// Filters and options for listing photos.
///
/// When both `tags` and `album` are set the server returns the intersection.
/// `sort_by` is passed through uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoListQuery {
    pub sizes: ReturnSizes,
    pub tags: Option<BTreeSet<String>>,
    pub album: Option<String>,
    pub token: Option<String>,
    pub sort_by: Option<String>,
    pub paging: Option<Paging>,
    pub host: Option<String>,
}

impl PhotoListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sizes(mut self, sizes: ReturnSizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = Some(sort_by.into());
        self
    }

    pub fn paging(mut self, paging: Paging) -> Self {
        self.paging = Some(paging);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }
}

/// Comma-join a tag set, rejecting names that would split on the wire.
pub(crate) fn join_tags(tags: &BTreeSet<String>) -> Result<String, String> {
    if let Some(bad) = tags.iter().find(|t| t.contains(',')) {
        return Err(format!("tag {bad:?} contains a comma"));
    }
    Ok(tags.iter().map(String::as_str).collect::<Vec<_>>().join(","))
}
