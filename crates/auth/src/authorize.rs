//! Authorization policy: role gating and per-resource ownership.
//!
//! - No IO
//! - No panics
//! - Decisions are recomputed on every call (nothing is cached)

use serde::Serialize;
use thiserror::Error;

use quill_core::{Owned, UserId};

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The resource exists but the caller may not act on it.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The resource to authorize against does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Why a mutation was (or was not) allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationDecision {
    /// Caller holds the admin role; ownership is not consulted.
    AdminOverride,
    /// Caller owns the resource.
    Owner,
    /// Neither admin nor owner.
    Denied,
}

impl MutationDecision {
    pub fn is_granted(self) -> bool {
        !matches!(self, MutationDecision::Denied)
    }
}

/// Decide a mutation on a resource owned by `owner_id`.
///
/// Admin takes precedence over ownership; there is no other granting path.
pub fn decide_mutation(caller: &Principal, owner_id: UserId) -> MutationDecision {
    if caller.role == Role::Admin {
        MutationDecision::AdminOverride
    } else if caller.subject_id == owner_id {
        MutationDecision::Owner
    } else {
        MutationDecision::Denied
    }
}

/// `true` iff the caller is an admin or owns the resource.
pub fn can_mutate(caller: &Principal, owner_id: UserId) -> bool {
    decide_mutation(caller, owner_id).is_granted()
}

/// Fetch-before-authorize: `found` is the result of looking the resource up.
///
/// A missing resource yields `NotFound`, an existing one the caller may not
/// touch yields `Forbidden`. The two are never merged.
pub fn authorize_mutation<R: Owned>(
    caller: &Principal,
    found: Option<R>,
    resource: &'static str,
) -> Result<R, AuthzError> {
    let resource_value = found.ok_or(AuthzError::NotFound(resource))?;

    let decision = decide_mutation(caller, resource_value.owner_id());
    tracing::debug!(
        resource,
        subject_id = %caller.subject_id,
        role = %caller.role,
        owner_id = %resource_value.owner_id(),
        ?decision,
        "ownership decision"
    );

    if decision.is_granted() {
        Ok(resource_value)
    } else {
        Err(AuthzError::Forbidden(format!("not the owner of this {resource}")))
    }
}

/// Role gate: the caller's role must be one of `allowed`.
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(format!("role '{role}' is not permitted")))
    }
}
