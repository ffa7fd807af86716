//! `quill-auth`: signed session tokens and authorization policy.
//!
//! This crate has no HTTP or storage code: it issues and
//! verifies tokens, and answers "may this caller do that" questions. The API
//! crate wires these into request middleware.

pub mod authorize;
pub mod claims;
pub mod codec;
pub mod password;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize_mutation, can_mutate, decide_mutation, require_role, AuthzError, MutationDecision};
pub use claims::{validate_claims, Claims, Identity, TokenKind, TokenValidationError};
pub use codec::{IssuedToken, TokenCodec, TokenConfig, TokenError, TokenPair, TokenVerifier};
pub use password::{PasswordError, PasswordHasher};
pub use principal::Principal;
pub use roles::{Role, UnknownRole};
pub use user::{ProfileUpdate, UserAccount};
