//! Comment model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CommentId, DomainError, DomainResult, Entity, Owned, PostId, UserId};

pub const MAX_CONTENT_LEN: usize = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: PostId, user_id: UserId, content: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CommentId::new(),
            post_id,
            user_id,
            content: normalize_content(content)?,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn edit(&mut self, content: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.content = normalize_content(content)?;
        self.updated_at = now;
        Ok(())
    }
}

fn normalize_content(content: &str) -> DomainResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(DomainError::validation("comment is required"));
    }
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(DomainError::validation(format!(
            "comment must be at most {MAX_CONTENT_LEN} characters"
        )));
    }
    Ok(content.to_string())
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> CommentId {
        self.id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> UserId {
        self.user_id
    }
}
