//! The bookmark resource: a single-owner record.
//!
//! `owner_id` is set at creation from the authenticated identity and is
//! never reassigned.

use serde::{Deserialize, Serialize};

/// A stored bookmark.
#[derive(Debug, Clone, Serialize)]
pub struct Bookmark {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
    pub updated_at: i64,
}

/// Payload for creating a bookmark. The owner comes from the identity,
/// never from the body.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBookmark {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial edit; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookmarkPatch {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl BookmarkPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.link.is_none() && self.description.is_none()
    }
}
