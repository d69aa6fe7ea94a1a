use crate::errors::RepoError;
use crate::models::{SavedMeme, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Persists a new user. Email and username uniqueness is checked in the same
    /// atomic write; a clash yields `RepoError::Conflict` and nothing is stored.
    async fn create(&self, user: &User) -> Result<(), RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// Exact match against the stored email first, then the stored username.
    async fn find_by_email_or_username(&self, identifier: &str) -> Result<Option<User>, RepoError>;
}

/// Persistence for saved memes, keyed by (user id, external meme id).
#[async_trait]
pub trait SavedMemeRepository: Send + Sync + 'static {
    /// Every saved meme of the user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedMeme>, RepoError>;

    /// Stores the meme unless the (user, meme) pair already exists.
    /// Returns `false` without writing when it does.
    async fn insert_if_absent(&self, meme: &SavedMeme) -> Result<bool, RepoError>;

    /// Removes the (user, meme) pair. Returns `false` if there was nothing to remove.
    async fn delete_if_present(&self, user_id: Uuid, meme_id: &str) -> Result<bool, RepoError>;
}
