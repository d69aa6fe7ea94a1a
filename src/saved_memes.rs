//! Per-user saved-meme bookmarks with toggle semantics.

use crate::{
    domain::SavedMemeRepository,
    errors::AppError,
    models::{SavedMeme, ToggleResponse, ToggleSavedMemeRequest},
    validation::{FieldErrors, is_valid_url},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Bound on how often a toggle re-reads the state after losing a race.
const MAX_TOGGLE_ATTEMPTS: usize = 8;

/// Bookmark state of a single (user, meme) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Unsaved,
    Saved,
}

impl SaveState {
    pub fn toggled(self) -> Self {
        match self {
            SaveState::Unsaved => SaveState::Saved,
            SaveState::Saved => SaveState::Unsaved,
        }
    }
}

#[derive(Clone)]
pub struct SavedMemeService {
    repo: Arc<dyn SavedMemeRepository>,
}

impl SavedMemeService {
    pub fn new(repo: Arc<dyn SavedMemeRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<SavedMeme>, AppError> {
        Ok(self.repo.list_for_user(user_id).await?)
    }

    /// Flips the bookmark for (user, meme).
    ///
    /// The transition is applied with a conditional write. When the store
    /// refuses it, the pair was already in the target state, so that becomes the
    /// observed state and the opposite transition is applied instead.
    pub async fn toggle(&self, user_id: Uuid, request: ToggleSavedMemeRequest) -> Result<ToggleResponse, AppError> {
        validate_toggle(&request)?;

        let candidate = SavedMeme {
            id: Uuid::now_v7(),
            user_id,
            meme_id: request.meme_id,
            title: request.title,
            image_url: request.image_url,
            source: request.source,
            subreddit: request.subreddit,
            author: request.author,
            created_at: Utc::now(),
        };

        let mut observed = SaveState::Unsaved;
        for _ in 0..MAX_TOGGLE_ATTEMPTS {
            let target = observed.toggled();
            let applied = match target {
                SaveState::Saved => self.repo.insert_if_absent(&candidate).await?,
                SaveState::Unsaved => self.repo.delete_if_present(user_id, &candidate.meme_id).await?,
            };
            if applied {
                tracing::info!(%user_id, meme_id = %candidate.meme_id, state = ?target, "Saved meme toggled");
                return Ok(match target {
                    SaveState::Saved => ToggleResponse { saved: true, item: Some(candidate) },
                    SaveState::Unsaved => ToggleResponse { saved: false, item: None },
                });
            }
            observed = target;
        }

        Err(AppError::InternalServerError(format!(
            "saved meme {} for user {} kept changing during toggle",
            candidate.meme_id, user_id
        )))
    }
}

fn validate_toggle(request: &ToggleSavedMemeRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if request.meme_id.is_empty() {
        errors.add("memeId", "Meme id is required");
    }
    if request.title.is_empty() {
        errors.add("title", "Title is required");
    }
    if !is_valid_url(&request.image_url) {
        errors.add("imageUrl", "Invalid url");
    }
    if let Some(source) = &request.source {
        if !is_valid_url(source) {
            errors.add("source", "Invalid url");
        }
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn request(meme_id: &str) -> ToggleSavedMemeRequest {
        ToggleSavedMemeRequest {
            meme_id: meme_id.into(),
            title: format!("Meme {meme_id}"),
            image_url: format!("https://i.redd.it/{meme_id}.png"),
            source: Some(format!("https://reddit.com/r/memes/comments/{meme_id}")),
            subreddit: Some("memes".into()),
            author: Some("someone".into()),
        }
    }

    #[test]
    fn state_alternates() {
        assert_eq!(SaveState::Unsaved.toggled(), SaveState::Saved);
        assert_eq!(SaveState::Saved.toggled(), SaveState::Unsaved);
        assert_eq!(SaveState::Unsaved.toggled().toggled(), SaveState::Unsaved);
    }

    #[tokio::test]
    async fn second_toggle_unsaves() {
        let service = SavedMemeService::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();

        let first = service.toggle(user, request("abc")).await.unwrap();
        assert!(first.saved);
        let item = first.item.unwrap();
        assert_eq!(item.meme_id, "abc");
        assert_eq!(item.user_id, user);

        let second = service.toggle(user, request("abc")).await.unwrap();
        assert!(!second.saved);
        assert!(second.item.is_none());
        assert!(service.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_three_saves_newest_first() {
        let service = SavedMemeService::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();
        for id in ["one", "two", "three"] {
            service.toggle(user, request(id)).await.unwrap();
        }
        let ids: Vec<String> = service.list(user).await.unwrap().into_iter().map(|m| m.meme_id).collect();
        assert_eq!(ids, ["three", "two", "one"]);
    }

    #[tokio::test]
    async fn saves_are_scoped_per_user() {
        let service = SavedMemeService::new(Arc::new(MemoryStore::new()));
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        service.toggle(alice, request("abc")).await.unwrap();
        assert!(service.toggle(bob, request("abc")).await.unwrap().saved);
        assert_eq!(service.list(alice).await.unwrap().len(), 1);
        assert_eq!(service.list(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_input() {
        let service = SavedMemeService::new(Arc::new(MemoryStore::new()));
        let bad = ToggleSavedMemeRequest {
            meme_id: String::new(),
            title: String::new(),
            image_url: "not a url".into(),
            source: Some("also-not-a-url".into()),
            subreddit: None,
            author: None,
        };
        let Err(AppError::Validation(errors)) = service.toggle(Uuid::new_v4(), bad).await else {
            panic!("expected validation error");
        };
        for field in ["memeId", "title", "imageUrl", "source"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }
    }

    #[tokio::test]
    async fn concurrent_toggles_settle_by_parity() {
        let service = SavedMemeService::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.toggle(user, request("race")).await })
            })
            .collect();
        let mut saves = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().saved {
                saves += 1;
            }
        }

        // Four toggles from unsaved end unsaved, with exactly two creates winning.
        assert_eq!(saves, 2);
        assert!(service.list(user).await.unwrap().is_empty());
    }
}
