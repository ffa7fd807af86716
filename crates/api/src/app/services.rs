//! Use cases behind the HTTP routes.
//!
//! Every mutation of an owned resource follows the same shape: look the record
//! up, hand the lookup result to `authorize_mutation`, and only then apply the
//! change. Lookups happen first so a missing record is reported as not found
//! rather than forbidden.

use std::sync::Arc;

use chrono::Utc;

use quill_auth::{
    authorize_mutation, user::normalize_email, Principal, ProfileUpdate, Role, TokenCodec, TokenPair,
    PasswordHasher, UserAccount,
};
use quill_core::{
    Category, CategoryId, CategoryUpdate, Comment, CommentId, DomainError, Post, PostId, PostUpdate, UserId,
};

use crate::app::errors::ApiError;
use crate::app::store::{InMemoryStore, Store, WriteOutcome};
use crate::config::AdminSeed;

/// Input for self-registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub category_id: Option<CategoryId>,
}

pub struct AppServices {
    pub users: Arc<dyn Store<UserAccount>>,
    pub posts: Arc<dyn Store<Post>>,
    pub comments: Arc<dyn Store<Comment>>,
    pub categories: Arc<dyn Store<Category>>,
    tokens: Arc<TokenCodec>,
    hasher: PasswordHasher,
}

impl AppServices {
    /// Services over fresh in-memory stores.
    pub fn in_memory(tokens: Arc<TokenCodec>, hasher: PasswordHasher) -> Self {
        Self {
            users: Arc::new(InMemoryStore::<UserAccount>::new()),
            posts: Arc::new(InMemoryStore::<Post>::new()),
            comments: Arc::new(InMemoryStore::<Comment>::new()),
            categories: Arc::new(InMemoryStore::<Category>::new()),
            tokens,
            hasher,
        }
    }

    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    // ---------------------------------------------------------------------
    // Auth
    // ---------------------------------------------------------------------

    pub async fn register(&self, input: Registration) -> Result<(UserAccount, TokenPair), ApiError> {
        let email = normalize_email(&input.email)?;
        if self.find_by_email(&email).is_some() {
            return Err(DomainError::conflict("email is already registered").into());
        }

        let password_hash = self.hash_password(input.password).await?;
        let user = UserAccount::register(&input.first_name, &input.last_name, &email, password_hash, Utc::now())?;

        // Re-checked under the store lock: two concurrent registrations with
        // the same email must not both succeed.
        let email = user.email.clone();
        if !self.users.upsert_unless(user.clone(), &|u| u.email == email) {
            return Err(DomainError::conflict("email is already registered").into());
        }

        tracing::info!(user_id = %user.id, "user registered");
        let pair = self.tokens.issue_pair(&user.identity())?;
        Ok((user, pair))
    }

    /// A wrong password and an unknown email are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: String) -> Result<(UserAccount, TokenPair), ApiError> {
        let Ok(email) = normalize_email(email) else {
            return Err(ApiError::InvalidLogin);
        };
        let Some(user) = self.find_by_email(&email) else {
            tracing::debug!("login for unknown email");
            return Err(ApiError::InvalidLogin);
        };

        if !self.verify_password(password, user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(ApiError::InvalidLogin);
        }

        let pair = self.tokens.issue_pair(&user.identity())?;
        Ok((user, pair))
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The new tokens carry the account's current email and role, and the
    /// account must still exist.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self
            .users
            .get(&claims.subject_id)
            .ok_or_else(|| ApiError::InvalidIdentity("account no longer exists".to_string()))?;

        Ok(self.tokens.issue_pair(&user.identity())?)
    }

    /// Create or promote the bootstrap admin account.
    pub async fn seed_admin(&self, seed: &AdminSeed) -> Result<UserAccount, ApiError> {
        let email = normalize_email(&seed.email)?;
        if let Some(mut existing) = self.find_by_email(&email) {
            if existing.role != Role::Admin {
                existing.set_role(Role::Admin, Utc::now());
                self.users.replace(existing.clone());
                tracing::info!(user_id = %existing.id, "existing account promoted to admin");
            }
            return Ok(existing);
        }

        let password_hash = self.hash_password(seed.password.clone()).await?;
        let mut admin = UserAccount::register("Admin", "User", &email, password_hash, Utc::now())?;
        admin.set_role(Role::Admin, admin.created_at);
        self.users.insert(admin.clone());

        tracing::info!(user_id = %admin.id, "admin account seeded");
        Ok(admin)
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    pub fn list_users(&self) -> Vec<UserAccount> {
        self.users.list()
    }

    pub fn get_user(&self, id: UserId) -> Result<UserAccount, ApiError> {
        self.users.get(&id).ok_or(ApiError::ResourceNotFound("user"))
    }

    pub fn update_user(&self, caller: &Principal, id: UserId, update: ProfileUpdate) -> Result<UserAccount, ApiError> {
        let mut user = authorize_mutation(caller, self.users.get(&id), "user")?;
        user.apply_update(update, Utc::now())?;
        self.commit(&*self.users, user, "user")
    }

    /// Removes the account together with its posts and comments.
    pub fn delete_user(&self, caller: &Principal, id: UserId) -> Result<(), ApiError> {
        let user = authorize_mutation(caller, self.users.get(&id), "user")?;
        self.users.remove(&user.id).ok_or(ApiError::ResourceNotFound("user"))?;

        let posts = self.posts.filter(&|p| p.author_id == user.id);
        for post in &posts {
            self.delete_post_cascade(post.id);
        }
        let comments = self.comments.remove_where(&|c| c.user_id == user.id);

        tracing::info!(user_id = %user.id, posts = posts.len(), comments, "user deleted");
        Ok(())
    }

    pub fn set_role(&self, id: UserId, role: Role) -> Result<UserAccount, ApiError> {
        let mut user = self.get_user(id)?;
        user.set_role(role, Utc::now());
        let user = self.commit(&*self.users, user, "user")?;
        tracing::info!(user_id = %user.id, %role, "role changed");
        Ok(user)
    }

    // ---------------------------------------------------------------------
    // Categories (admin-only mutations, enforced by the route layer)
    // ---------------------------------------------------------------------

    pub fn list_categories(&self) -> Vec<Category> {
        self.categories.list()
    }

    pub fn get_category(&self, id: CategoryId) -> Result<Category, ApiError> {
        self.categories.get(&id).ok_or(ApiError::ResourceNotFound("category"))
    }

    pub fn create_category(&self, name: &str, description: Option<String>) -> Result<Category, ApiError> {
        let category = Category::new(name, description, Utc::now())?;
        self.store_unique_category(category)
    }

    pub fn update_category(&self, id: CategoryId, update: CategoryUpdate) -> Result<Category, ApiError> {
        let mut category = self.get_category(id)?;
        category.apply_update(update, Utc::now())?;

        let name = category.name.clone();
        match self.categories.replace_unless(category.clone(), &|c| c.same_name(&name)) {
            WriteOutcome::Written => Ok(category),
            WriteOutcome::Clash => Err(category_conflict(&name)),
            WriteOutcome::Missing => Err(ApiError::ResourceNotFound("category")),
        }
    }

    /// Posts filed under the category are kept and become uncategorised.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), ApiError> {
        self.categories.remove(&id).ok_or(ApiError::ResourceNotFound("category"))?;

        let now = Utc::now();
        for mut post in self.posts.filter(&|p| p.category_id == Some(id)) {
            post.category_id = None;
            post.updated_at = now;
            self.posts.replace(post);
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Posts
    // ---------------------------------------------------------------------

    pub fn list_posts(&self) -> Vec<Post> {
        self.posts.list()
    }

    pub fn get_post(&self, id: PostId) -> Result<Post, ApiError> {
        self.posts.get(&id).ok_or(ApiError::ResourceNotFound("post"))
    }

    pub fn posts_by_author(&self, author_id: UserId) -> Vec<Post> {
        self.posts.filter(&|p| p.author_id == author_id)
    }

    pub fn create_post(&self, caller: &Principal, input: NewPost) -> Result<Post, ApiError> {
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id)?;
        }

        let post = Post::new(caller.subject_id, &input.title, input.content, input.category_id, Utc::now())?;
        self.posts.insert(post.clone());
        tracing::info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    pub fn update_post(&self, caller: &Principal, id: PostId, update: PostUpdate) -> Result<Post, ApiError> {
        let mut post = authorize_mutation(caller, self.posts.get(&id), "post")?;
        if let quill_core::Patch::Set(category_id) = &update.category_id {
            self.ensure_category(*category_id)?;
        }

        post.apply_update(update, Utc::now())?;
        self.commit(&*self.posts, post, "post")
    }

    /// Removes the post and its comments.
    pub fn delete_post(&self, caller: &Principal, id: PostId) -> Result<(), ApiError> {
        let post = authorize_mutation(caller, self.posts.get(&id), "post")?;
        if !self.delete_post_cascade(post.id) {
            return Err(ApiError::ResourceNotFound("post"));
        }
        tracing::info!(post_id = %post.id, "post deleted");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Comments
    // ---------------------------------------------------------------------

    pub fn list_comments(&self, post_id: PostId) -> Result<Vec<Comment>, ApiError> {
        self.get_post(post_id)?;
        Ok(self.comments.filter(&|c| c.post_id == post_id))
    }

    pub fn create_comment(&self, caller: &Principal, post_id: PostId, content: &str) -> Result<Comment, ApiError> {
        self.get_post(post_id)?;

        let comment = Comment::new(post_id, caller.subject_id, content, Utc::now())?;
        self.comments.insert(comment.clone());
        Ok(comment)
    }

    pub fn update_comment(
        &self,
        caller: &Principal,
        post_id: PostId,
        comment_id: CommentId,
        content: &str,
    ) -> Result<Comment, ApiError> {
        let mut comment = authorize_mutation(caller, self.comment_under(post_id, comment_id), "comment")?;
        comment.edit(content, Utc::now())?;
        self.commit(&*self.comments, comment, "comment")
    }

    pub fn delete_comment(&self, caller: &Principal, post_id: PostId, comment_id: CommentId) -> Result<(), ApiError> {
        let comment = authorize_mutation(caller, self.comment_under(post_id, comment_id), "comment")?;
        self.comments
            .remove(&comment.id)
            .map(|_| ())
            .ok_or(ApiError::ResourceNotFound("comment"))
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn find_by_email(&self, email: &str) -> Option<UserAccount> {
        self.users.filter(&|u| u.email == email).into_iter().next()
    }

    /// A comment addressed under a post it does not belong to does not exist.
    fn comment_under(&self, post_id: PostId, comment_id: CommentId) -> Option<Comment> {
        self.comments.get(&comment_id).filter(|c| c.post_id == post_id)
    }

    fn ensure_category(&self, id: CategoryId) -> Result<(), ApiError> {
        if self.categories.get(&id).is_none() {
            return Err(DomainError::validation(format!("category {id} does not exist")).into());
        }
        Ok(())
    }

    fn store_unique_category(&self, category: Category) -> Result<Category, ApiError> {
        let name = category.name.clone();
        if !self.categories.upsert_unless(category.clone(), &|c| c.same_name(&name)) {
            return Err(category_conflict(&name));
        }
        Ok(category)
    }

    /// Write back a record fetched earlier in the same use case. The record
    /// may have been deleted concurrently, which surfaces as not found.
    fn commit<V>(&self, store: &dyn Store<V>, value: V, what: &'static str) -> Result<V, ApiError>
    where
        V: quill_core::Entity + Clone,
    {
        if store.replace(value.clone()) {
            Ok(value)
        } else {
            Err(ApiError::ResourceNotFound(what))
        }
    }

    fn delete_post_cascade(&self, id: PostId) -> bool {
        let removed = self.posts.remove(&id).is_some();
        self.comments.remove_where(&|c| c.post_id == id);
        removed
    }

    async fn hash_password(&self, password: String) -> Result<String, ApiError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| ApiError::Internal(format!("password hashing task failed: {e}")))?
            .map_err(ApiError::from)
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool, ApiError> {
        let hasher = self.hasher;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| ApiError::Internal(format!("password check task failed: {e}")))?
            .map_err(ApiError::from)
    }
}

fn category_conflict(name: &str) -> ApiError {
    DomainError::conflict(format!("category '{name}' already exists")).into()
}

#[cfg(test)]
mod tests {
    use quill_auth::TokenConfig;

    use super::*;

    fn services() -> AppServices {
        let codec = TokenCodec::new(&TokenConfig::new("access-secret", "refresh-secret")).unwrap();
        AppServices::in_memory(Arc::new(codec), PasswordHasher::new(4))
    }

    fn registration(email: &str) -> Registration {
        Registration {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password: "correct horse".into(),
        }
    }

    fn principal(user: &UserAccount) -> Principal {
        Principal::new(user.id, user.role)
    }

    #[tokio::test]
    async fn register_forces_user_role_and_rejects_duplicate_email() {
        let svc = services();
        let (user, pair) = svc.register(registration("ada@example.com")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(pair.token_type, "Bearer");

        let err = svc.register(registration("ADA@example.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_does_not_reveal_which_field_was_wrong() {
        let svc = services();
        svc.register(registration("ada@example.com")).await.unwrap();

        let wrong_pw = svc.login("ada@example.com", "nope nope".into()).await.unwrap_err();
        let unknown = svc.login("bob@example.com", "correct horse".into()).await.unwrap_err();
        assert!(matches!(wrong_pw, ApiError::InvalidLogin));
        assert!(matches!(unknown, ApiError::InvalidLogin));

        assert!(svc.login("ada@example.com", "correct horse".into()).await.is_ok());
    }

    #[tokio::test]
    async fn refresh_requires_live_account_and_refresh_token() {
        let svc = services();
        let (user, pair) = svc.register(registration("ada@example.com")).await.unwrap();

        let renewed = svc.refresh(&pair.refresh_token).unwrap();
        assert!(svc.tokens().verify_access(&renewed.access_token).is_ok());

        assert!(matches!(svc.refresh(&pair.access_token), Err(ApiError::InvalidSignature)));

        svc.delete_user(&principal(&user), user.id).unwrap();
        assert!(matches!(svc.refresh(&pair.refresh_token), Err(ApiError::InvalidIdentity(_))));
    }

    #[tokio::test]
    async fn post_mutation_is_fetch_then_authorize() {
        let svc = services();
        let (author, _) = svc.register(registration("a@example.com")).await.unwrap();
        let (other, _) = svc.register(registration("b@example.com")).await.unwrap();
        let admin = Principal::new(UserId::new(), Role::Admin);

        let post = svc
            .create_post(&principal(&author), NewPost { title: "Hello".into(), content: None, category_id: None })
            .unwrap();

        let update = PostUpdate { title: quill_core::Patch::Set("Edited".into()), ..Default::default() };
        assert!(matches!(
            svc.update_post(&principal(&other), post.id, update.clone()),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            svc.update_post(&principal(&other), PostId::new(), update.clone()),
            Err(ApiError::ResourceNotFound("post"))
        ));
        assert_eq!(svc.update_post(&principal(&author), post.id, update).unwrap().title, "Edited");

        svc.delete_post(&admin, post.id).unwrap();
        assert!(matches!(svc.get_post(post.id), Err(ApiError::ResourceNotFound(_))));
    }

    #[tokio::test]
    async fn comment_under_wrong_post_is_not_found() {
        let svc = services();
        let (user, _) = svc.register(registration("a@example.com")).await.unwrap();
        let caller = principal(&user);

        let first = svc.create_post(&caller, NewPost { title: "One".into(), content: None, category_id: None }).unwrap();
        let second = svc.create_post(&caller, NewPost { title: "Two".into(), content: None, category_id: None }).unwrap();
        let comment = svc.create_comment(&caller, first.id, "  nice  ").unwrap();
        assert_eq!(comment.content, "nice");

        assert!(matches!(
            svc.delete_comment(&caller, second.id, comment.id),
            Err(ApiError::ResourceNotFound("comment"))
        ));
        svc.delete_comment(&caller, first.id, comment.id).unwrap();
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let svc = services();
        let (user, _) = svc.register(registration("a@example.com")).await.unwrap();
        let caller = principal(&user);

        let post = svc.create_post(&caller, NewPost { title: "One".into(), content: None, category_id: None }).unwrap();
        svc.create_comment(&caller, post.id, "first").unwrap();
        svc.delete_post(&caller, post.id).unwrap();

        assert!(svc.comments.list().is_empty());
        assert!(matches!(svc.list_comments(post.id), Err(ApiError::ResourceNotFound("post"))));
    }

    #[test]
    fn category_names_are_unique_and_posts_need_existing_category() {
        let svc = services();
        let rust = svc.create_category("Rust", None).unwrap();
        assert!(matches!(svc.create_category(" rust ", None), Err(ApiError::Conflict(_))));

        let caller = Principal::new(UserId::new(), Role::User);
        let missing = NewPost { title: "t".into(), content: None, category_id: Some(CategoryId::new()) };
        assert!(matches!(svc.create_post(&caller, missing), Err(ApiError::Validation(_))));

        let post = svc
            .create_post(&caller, NewPost { title: "t".into(), content: None, category_id: Some(rust.id) })
            .unwrap();
        svc.delete_category(rust.id).unwrap();
        assert_eq!(svc.get_post(post.id).unwrap().category_id, None);
    }

    #[test]
    fn updating_a_deleted_category_does_not_bring_it_back() {
        let svc = services();
        let rust = svc.create_category("Rust", None).unwrap();
        let go = svc.create_category("Go", None).unwrap();

        let rename = |name: &str| CategoryUpdate { name: quill_core::Patch::Set(name.into()), ..Default::default() };
        assert!(matches!(svc.update_category(go.id, rename("rust")), Err(ApiError::Conflict(_))));

        // Fetched record written back after a concurrent delete.
        let mut stale = svc.get_category(rust.id).unwrap();
        svc.delete_category(rust.id).unwrap();
        stale.name = "Rust 2024".into();
        assert_eq!(svc.categories.replace_unless(stale, &|_| false), WriteOutcome::Missing);
        assert!(matches!(svc.update_category(rust.id, rename("Rust 2024")), Err(ApiError::ResourceNotFound(_))));
        assert_eq!(svc.list_categories().len(), 1);
    }

    #[tokio::test]
    async fn seed_admin_is_idempotent() {
        let svc = services();
        let seed = AdminSeed { email: "root@example.com".into(), password: "bootstrap-pw".into() };

        let first = svc.seed_admin(&seed).await.unwrap();
        let second = svc.seed_admin(&seed).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.role, Role::Admin);
        assert_eq!(svc.list_users().len(), 1);
    }
}
