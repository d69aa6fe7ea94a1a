//! In-process store used for local development and tests.
//!
//! Each operation takes the write lock once, so the uniqueness checks and the
//! writes they guard are a single atomic step.

use crate::{
    domain::{SavedMemeRepository, UserRepository},
    errors::RepoError,
    models::{SavedMeme, User, sort_newest_first},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    user_ids_by_email: HashMap<String, Uuid>,
    user_ids_by_username: HashMap<String, Uuid>,
    // Kept in insertion order per user.
    saved_memes: HashMap<Uuid, Vec<SavedMeme>>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.user_ids_by_email.contains_key(&user.email)
            || tables.user_ids_by_username.contains_key(&user.username)
            || tables.users.contains_key(&user.id)
        {
            return Err(RepoError::Conflict);
        }
        tables.user_ids_by_email.insert(user.email.clone(), user.id);
        tables.user_ids_by_username.insert(user.username.clone(), user.id);
        tables.users.insert(user.id, user.clone());
        tracing::debug!(user_id = %user.id, "Memory: user stored");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email_or_username(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        let id = tables
            .user_ids_by_email
            .get(identifier)
            .or_else(|| tables.user_ids_by_username.get(identifier));
        Ok(id.and_then(|id| tables.users.get(id)).cloned())
    }
}

#[async_trait]
impl SavedMemeRepository for MemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedMeme>, RepoError> {
        let tables = self.tables.read().await;
        let mut memes: Vec<SavedMeme> = tables
            .saved_memes
            .get(&user_id)
            .cloned()
            .unwrap_or_default();
        sort_newest_first(&mut memes);
        Ok(memes)
    }

    async fn insert_if_absent(&self, meme: &SavedMeme) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let memes = tables.saved_memes.entry(meme.user_id).or_default();
        if memes.iter().any(|m| m.meme_id == meme.meme_id) {
            return Ok(false);
        }
        memes.push(meme.clone());
        Ok(true)
    }

    async fn delete_if_present(&self, user_id: Uuid, meme_id: &str) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let Some(memes) = tables.saved_memes.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = memes.len();
        memes.retain(|m| m.meme_id != meme_id);
        Ok(memes.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(email: &str, username: &str) -> User {
        User {
            id: Uuid::new_v4(),
            email: email.into(),
            username: username.into(),
            password_hash: "hash".into(),
            display_name: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
    }

    fn meme(user_id: Uuid, meme_id: &str) -> SavedMeme {
        SavedMeme {
            id: Uuid::now_v7(),
            user_id,
            meme_id: meme_id.into(),
            title: "title".into(),
            image_url: "https://i.redd.it/x.png".into(),
            source: None,
            subreddit: None,
            author: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_or_username_conflicts() {
        let store = MemoryStore::new();
        store.create(&user("a@x.com", "alice")).await.unwrap();
        assert!(matches!(store.create(&user("a@x.com", "alice2")).await, Err(RepoError::Conflict)));
        assert!(matches!(store.create(&user("b@x.com", "alice")).await, Err(RepoError::Conflict)));
        // Stored values are compared exactly.
        store.create(&user("A@x.com", "Alice")).await.unwrap();
    }

    #[tokio::test]
    async fn finds_by_either_identifier() {
        let store = MemoryStore::new();
        let alice = user("a@x.com", "alice");
        store.create(&alice).await.unwrap();
        assert_eq!(store.find_by_email_or_username("a@x.com").await.unwrap(), Some(alice.clone()));
        assert_eq!(store.find_by_email_or_username("alice").await.unwrap(), Some(alice.clone()));
        assert_eq!(store.find_by_id(alice.id).await.unwrap(), Some(alice));
        assert_eq!(store.find_by_email_or_username("bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_and_delete_are_conditional() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        assert!(store.insert_if_absent(&meme(owner, "m1")).await.unwrap());
        assert!(!store.insert_if_absent(&meme(owner, "m1")).await.unwrap());
        // Same meme id under another user is independent.
        assert!(store.insert_if_absent(&meme(Uuid::new_v4(), "m1")).await.unwrap());
        assert!(store.delete_if_present(owner, "m1").await.unwrap());
        assert!(!store.delete_if_present(owner, "m1").await.unwrap());
        assert!(store.list_for_user(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_newest_first_even_with_equal_timestamps() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let created_at = Utc::now();
        for id in ["m1", "m2", "m3"] {
            let mut item = meme(owner, id);
            item.created_at = created_at;
            store.insert_if_absent(&item).await.unwrap();
        }
        let ids: Vec<String> = store
            .list_for_user(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.meme_id)
            .collect();
        assert_eq!(ids, ["m3", "m2", "m1"]);
    }
}
