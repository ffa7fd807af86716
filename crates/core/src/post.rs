//! Post model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, DomainError, DomainResult, Entity, Owned, Patch, PostId, UserId};

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a post. Ownership is decided before this is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostUpdate {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub content: Patch<String>,
    #[serde(default)]
    pub category_id: Patch<CategoryId>,
}

impl Post {
    pub fn new(
        author_id: UserId,
        title: &str,
        content: Option<String>,
        category_id: Option<CategoryId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: PostId::new(),
            author_id,
            title: normalize_title(title)?,
            content,
            category_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: PostUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let PostUpdate {
            title,
            content,
            category_id,
        } = update;

        let mut next = self.clone();
        title.apply_required("title", &mut next.title)?;
        next.title = normalize_title(&next.title)?;
        content.apply_optional(&mut next.content);
        category_id.apply_optional(&mut next.category_id);
        next.updated_at = now;

        *self = next;
        Ok(())
    }
}

fn normalize_title(title: &str) -> DomainResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

impl Entity for Post {
    type Id = PostId;

    fn id(&self) -> PostId {
        self.id
    }
}

impl Owned for Post {
    fn owner_id(&self) -> UserId {
        self.author_id
    }
}
