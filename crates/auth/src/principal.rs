use serde::{Deserialize, Serialize};

use quill_core::UserId;

use crate::{Claims, Role};

/// The caller as seen by authorization decisions: who they are and which
/// role they hold. Derived from verified claims.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub subject_id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(subject_id: UserId, role: Role) -> Self {
        Self { subject_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&Claims> for Principal {
    fn from(claims: &Claims) -> Self {
        Self {
            subject_id: claims.subject_id,
            role: claims.role,
        }
    }
}
