//! User accounts.
//!
//! An account is its own owner: the ownership policy that guards posts and
//! comments also guards profile edits and account deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_core::{DomainError, DomainResult, Entity, Owned, Patch, UserId};

use crate::{Identity, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields a user may change about themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub first_name: Patch<String>,
    #[serde(default)]
    pub last_name: Patch<String>,
}

impl UserAccount {
    /// Self-registration always yields the `user` role.
    pub fn register(
        first_name: &str,
        last_name: &str,
        email: &str,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: UserId::new(),
            first_name: normalize_name("first_name", first_name)?,
            last_name: normalize_name("last_name", last_name)?,
            email: normalize_email(email)?,
            password_hash,
            role: Role::User,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn identity(&self) -> Identity {
        Identity {
            subject_id: self.id,
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn apply_update(&mut self, update: ProfileUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        let mut first = self.first_name.clone();
        let mut last = self.last_name.clone();
        update.first_name.apply_required("first_name", &mut first)?;
        update.last_name.apply_required("last_name", &mut last)?;

        self.first_name = normalize_name("first_name", &first)?;
        self.last_name = normalize_name("last_name", &last)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_role(&mut self, role: Role, now: DateTime<Utc>) {
        self.role = role;
        self.updated_at = now;
    }
}

/// Lowercased, trimmed email with a basic shape check.
pub fn normalize_email(email: &str) -> DomainResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(email)
}

fn normalize_name(field: &str, value: &str) -> DomainResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

impl Entity for UserAccount {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

impl Owned for UserAccount {
    fn owner_id(&self) -> UserId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserAccount {
        UserAccount::register("Alice", "Smith", "  Alice@Example.com ", "hash".into(), Utc::now()).unwrap()
    }

    #[test]
    fn register_normalizes_and_defaults_to_user_role() {
        let user = alice();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, Role::User);
    }

    #[test]
    fn register_rejects_invalid_email() {
        let result = UserAccount::register("A", "B", "invalid-email", "hash".into(), Utc::now());
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(alice()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn identity_mirrors_account() {
        let user = alice();
        let id = user.identity();
        assert_eq!(id.subject_id, user.id);
        assert_eq!(id.email, user.email);
        assert_eq!(id.role, Role::User);
    }

    #[test]
    fn profile_update_applies_set_fields_only() {
        let mut user = alice();
        user.apply_update(
            ProfileUpdate {
                last_name: Patch::Set(" Jones ".into()),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(user.first_name, "Alice");
        assert_eq!(user.last_name, "Jones");
    }
}
