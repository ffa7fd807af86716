//! Category model. Categories have no owner; only admins mutate them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CategoryId, DomainError, DomainResult, Entity, Patch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
}

impl Category {
    pub fn new(name: &str, description: Option<String>, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: CategoryId::new(),
            name: normalize_name(name)?,
            description,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: CategoryUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut name = self.name.clone();
        update.name.apply_required("name", &mut name)?;
        self.name = normalize_name(&name)?;
        update.description.apply_optional(&mut self.description);
        self.updated_at = now;
        Ok(())
    }

    /// Case-insensitive name comparison used for uniqueness.
    pub fn same_name(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }
}

fn normalize_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("category name is required"));
    }
    Ok(name.to_string())
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}
