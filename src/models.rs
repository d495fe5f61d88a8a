//! Core data models: content objects and their search projections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What a content object represents. Decides its directory in the file store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Note,
    Bookmark,
    Other(String),
}

impl ContentKind {
    pub fn as_str(&self) -> &str {
        match self {
            ContentKind::Note => "note",
            ContentKind::Bookmark => "bookmark",
            ContentKind::Other(name) => name,
        }
    }

    /// Directory (relative to the data dir) holding objects of this kind.
    pub fn dir_name(&self) -> String {
        match self {
            ContentKind::Note => "notes".to_string(),
            ContentKind::Bookmark => "bookmarks".to_string(),
            ContentKind::Other(name) => name.clone(),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "note" => Ok(ContentKind::Note),
            "bookmark" => Ok(ContentKind::Bookmark),
            "" => Err("content kind must not be empty".to_string()),
            other if other.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') => {
                Ok(ContentKind::Other(other.to_string()))
            }
            other => Err(format!("invalid content kind: '{}'", other)),
        }
    }
}

impl Serialize for ContentKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A stored note or bookmark. The file on disk is the source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentObject {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub kind: ContentKind,
    /// Bookmarked location, if any.
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentObject {
    /// Location of this object's file under `data_dir`.
    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        content_path(data_dir, &self.kind, self.id)
    }

    pub fn to_search_document(&self) -> SearchDocument {
        SearchDocument {
            id: self.id,
            title: self.title.clone(),
            tags: self.tags.iter().cloned().collect(),
            body: self.body.clone(),
            kind: self.kind.to_string(),
            url: self.url.clone(),
        }
    }
}

/// `<data_dir>/<kind dir>/<id>.md`
pub fn content_path(data_dir: &Path, kind: &ContentKind, id: u64) -> PathBuf {
    data_dir.join(kind.dir_name()).join(format!("{}.md", id))
}

/// Fields supplied by a caller creating a new object.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
    pub kind: ContentKind,
    pub url: Option<String>,
}

impl NewContent {
    pub fn note(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: BTreeSet::new(),
            kind: ContentKind::Note,
            url: None,
        }
    }

    pub fn bookmark(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            tags: BTreeSet::new(),
            kind: ContentKind::Bookmark,
            url: Some(url.into()),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// In-place edit of an existing object; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ContentPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    pub url: Option<Option<String>>,
}

impl ContentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.tags.is_none() && self.url.is_none()
    }

    pub fn apply(self, obj: &mut ContentObject) {
        if let Some(title) = self.title {
            obj.title = title;
        }
        if let Some(body) = self.body {
            obj.body = body;
        }
        if let Some(tags) = self.tags {
            obj.tags = tags;
        }
        if let Some(url) = self.url {
            obj.url = url;
        }
    }
}

/// The searchable projection of a [`ContentObject`], keyed by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    #[serde(skip)]
    pub id: u64,
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
}

/// One entry of a search result, in backend relevance order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub title: String,
    /// Highlighted body fragment; empty when the match was outside the body.
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Note".parse::<ContentKind>().unwrap(), ContentKind::Note);
        assert_eq!(
            "bookmark".parse::<ContentKind>().unwrap(),
            ContentKind::Bookmark
        );
        assert_eq!(
            "recipe".parse::<ContentKind>().unwrap(),
            ContentKind::Other("recipe".to_string())
        );
        assert!("../etc".parse::<ContentKind>().is_err());
        assert!("".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_path_derivation() {
        let root = Path::new("/data");
        assert_eq!(
            content_path(root, &ContentKind::Note, 7),
            PathBuf::from("/data/notes/7.md")
        );
        assert_eq!(
            content_path(root, &ContentKind::Other("recipe".into()), 12),
            PathBuf::from("/data/recipe/12.md")
        );
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let now = Utc::now();
        let mut obj = ContentObject {
            id: 1,
            title: "Old".into(),
            body: "body".into(),
            tags: ["a".to_string()].into_iter().collect(),
            kind: ContentKind::Bookmark,
            url: Some("https://example.com".into()),
            created_at: now,
            updated_at: now,
        };
        ContentPatch {
            title: Some("New".into()),
            url: Some(None),
            ..Default::default()
        }
        .apply(&mut obj);
        assert_eq!(obj.title, "New");
        assert_eq!(obj.body, "body");
        assert_eq!(obj.tags.len(), 1);
        assert_eq!(obj.url, None);
    }
}
