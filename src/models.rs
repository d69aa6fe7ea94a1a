use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account as stored. Deliberately not `Serialize`: responses go through [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The user fields that may leave the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMeme {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meme_id: String,
    pub title: String,
    pub image_url: String,
    pub source: Option<String>,
    pub subreddit: Option<String>,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Orders saved memes newest first. Ids are UUID v7, so they break
/// timestamp ties in creation order.
pub fn sort_newest_first(memes: &mut [SavedMeme]) {
    memes.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
}

// --- Request / response bodies ---

// Missing fields deserialize as empty strings so they surface as field errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToggleSavedMemeRequest {
    pub meme_id: String,
    pub title: String,
    pub image_url: String,
    pub source: Option<String>,
    pub subreddit: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<SavedMeme>,
}
