//! `quill-core`: content domain building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, and the post/comment/category models.

pub mod category;
pub mod comment;
pub mod entity;
pub mod error;
pub mod id;
pub mod patch;
pub mod post;

pub use category::{Category, CategoryUpdate};
pub use comment::Comment;
pub use entity::{Entity, Owned};
pub use error::{DomainError, DomainResult};
pub use id::{CategoryId, CommentId, PostId, UserId};
pub use patch::Patch;
pub use post::{Post, PostUpdate};
