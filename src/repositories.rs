use crate::{
    domain::{SavedMemeRepository, UserRepository},
    errors::RepoError,
    models::{SavedMeme, User, sort_newest_first},
};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::{
    Client as DynamoDbClient,
    error::SdkError,
    operation::transact_write_items::TransactWriteItemsError,
    types::{AttributeValue, Put, TransactWriteItem},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{self, info};
use uuid::Uuid;

type Item = HashMap<String, AttributeValue>;

// Users share one table with the email/username markers that enforce uniqueness.
pub const USER_KEY: &str = "pk";
const USER_PREFIX: &str = "USER#";
const EMAIL_PREFIX: &str = "EMAIL#";
const USERNAME_PREFIX: &str = "USERNAME#";

pub const SAVED_MEME_PARTITION_KEY: &str = "user_id";
pub const SAVED_MEME_SORT_KEY: &str = "meme_id";

#[derive(Debug, Clone)]
pub struct DynamoDbUserRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbUserRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbUserRepository");
        Self { client, table_name }
    }

    async fn get_item(&self, key: String) -> Result<Option<Item>, RepoError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(USER_KEY, AttributeValue::S(key.clone()))
            .send()
            .await
            .context(format!("DynamoDB (table: {}): Failed to get item (key: {})", self.table_name, key))
            .map_err(RepoError::BackendError)?;
        Ok(resp.item)
    }

    async fn user_id_for_marker(&self, key: String) -> Result<Option<Uuid>, RepoError> {
        match self.get_item(key.clone()).await? {
            Some(item) => {
                let id = get_s(&item, "user_id")
                    .and_then(|s| Uuid::parse_str(&s).ok())
                    .ok_or_else(|| {
                        RepoError::DataCorruption(format!("marker '{}' in table '{}' has no valid user_id", key, self.table_name))
                    })?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    fn conditional_put(&self, item: Item) -> Result<TransactWriteItem, RepoError> {
        let put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression(format!("attribute_not_exists({USER_KEY})"))
            .build()
            .context("Failed to build conditional put")
            .map_err(RepoError::BackendError)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }
}

#[async_trait]
impl UserRepository for DynamoDbUserRepository {
    /// Writes the user row plus email and username markers in one transaction.
    async fn create(&self, user: &User) -> Result<(), RepoError> {
        let result = self
            .client
            .transact_write_items()
            .transact_items(self.conditional_put(user_to_item(user))?)
            .transact_items(self.conditional_put(marker_item(EMAIL_PREFIX, &user.email, user.id))?)
            .transact_items(self.conditional_put(marker_item(USERNAME_PREFIX, &user.username, user.id))?)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::debug!(user_id = %user.id, table_name = %self.table_name, "DynamoDB: User stored");
                Ok(())
            }
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if is_condition_cancellation(service_err.err()) {
                        tracing::debug!(user_id = %user.id, "DynamoDB: Email or username already taken");
                        return Err(RepoError::Conflict);
                    }
                }
                Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                    "DynamoDB (table: {}): Failed to create user (id: {})",
                    self.table_name, user.id
                ))))
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        match self.get_item(format!("{USER_PREFIX}{id}")).await? {
            Some(item) => item_to_user(&item).map(Some).ok_or_else(|| {
                tracing::error!(user_id = %id, table_name = %self.table_name, "DynamoDB: Retrieved item but failed to parse into User");
                RepoError::DataCorruption(format!("Failed to parse user {} from table '{}'", id, self.table_name))
            }),
            None => Ok(None),
        }
    }

    async fn find_by_email_or_username(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        let user_id = match self.user_id_for_marker(format!("{EMAIL_PREFIX}{identifier}")).await? {
            Some(id) => Some(id),
            None => self.user_id_for_marker(format!("{USERNAME_PREFIX}{identifier}")).await?,
        };
        match user_id {
            Some(id) => self.find_by_id(id).await,
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DynamoDbSavedMemeRepository {
    client: DynamoDbClient,
    table_name: String,
}

impl DynamoDbSavedMemeRepository {
    pub fn new(client: DynamoDbClient, table_name: String) -> Self {
        info!(%table_name, "Initializing DynamoDbSavedMemeRepository");
        Self { client, table_name }
    }
}

#[async_trait]
impl SavedMemeRepository for DynamoDbSavedMemeRepository {
    /// Queries the user's partition page by page, then orders newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SavedMeme>, RepoError> {
        let mut memes: Vec<SavedMeme> = Vec::new();
        let mut last_evaluated_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(format!("{SAVED_MEME_PARTITION_KEY} = :uid"))
                .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
                .set_exclusive_start_key(last_evaluated_key.take())
                .send()
                .await
                .context(format!("DynamoDB: Failed to query table '{}' for user {}", self.table_name, user_id))
                .map_err(RepoError::BackendError)?;

            for item in resp.items.unwrap_or_default() {
                match item_to_saved_meme(&item) {
                    Some(meme) => memes.push(meme),
                    None => {
                        let meme_id = get_s(&item, SAVED_MEME_SORT_KEY);
                        tracing::error!(item.meme_id = ?meme_id, table_name = %self.table_name, "DynamoDB: Failed to parse item into SavedMeme");
                        return Err(RepoError::DataCorruption(format!(
                            "Failed to parse saved meme {:?} of user {} in table '{}'",
                            meme_id, user_id, self.table_name
                        )));
                    }
                }
            }

            last_evaluated_key = resp.last_evaluated_key;
            if last_evaluated_key.is_none() {
                break;
            }
        }

        sort_newest_first(&mut memes);
        tracing::debug!(%user_id, count = memes.len(), "DynamoDB: Listed saved memes");
        Ok(memes)
    }

    async fn insert_if_absent(&self, meme: &SavedMeme) -> Result<bool, RepoError> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(saved_meme_to_item(meme)))
            .condition_expression(format!("attribute_not_exists({SAVED_MEME_SORT_KEY})"))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Ok(false);
                    }
                }
                Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                    "DynamoDB (table: {}): Failed to put saved meme (user: {}, meme: {})",
                    self.table_name, meme.user_id, meme.meme_id
                ))))
            }
        }
    }

    async fn delete_if_present(&self, user_id: Uuid, meme_id: &str) -> Result<bool, RepoError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(SAVED_MEME_PARTITION_KEY, AttributeValue::S(user_id.to_string()))
            .key(SAVED_MEME_SORT_KEY, AttributeValue::S(meme_id.to_string()))
            .condition_expression(format!("attribute_exists({SAVED_MEME_SORT_KEY})"))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Ok(false);
                    }
                }
                Err(RepoError::BackendError(anyhow::Error::new(e).context(format!(
                    "DynamoDB (table: {}): Failed to delete saved meme (user: {}, meme: {})",
                    self.table_name, user_id, meme_id
                ))))
            }
        }
    }
}

fn is_condition_cancellation(err: &TransactWriteItemsError) -> bool {
    match err {
        TransactWriteItemsError::TransactionCanceledException(cancelled) => cancelled
            .cancellation_reasons()
            .iter()
            .any(|reason| reason.code() == Some("ConditionalCheckFailed")),
        _ => false,
    }
}

// --- Item conversion helpers, internal to this module ---

fn get_s(item: &Item, name: &str) -> Option<String> {
    item.get(name)?.as_s().ok().cloned()
}

fn get_time(item: &Item, name: &str) -> Option<DateTime<Utc>> {
    let raw = item.get(name)?.as_s().ok()?;
    DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc))
}

fn put_opt(item: &mut Item, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        item.insert(name.to_string(), AttributeValue::S(value.clone()));
    }
}

fn marker_item(prefix: &str, value: &str, user_id: Uuid) -> Item {
    HashMap::from([
        (USER_KEY.to_string(), AttributeValue::S(format!("{prefix}{value}"))),
        ("user_id".to_string(), AttributeValue::S(user_id.to_string())),
    ])
}

fn user_to_item(user: &User) -> Item {
    let mut item = HashMap::from([
        (USER_KEY.to_string(), AttributeValue::S(format!("{USER_PREFIX}{}", user.id))),
        ("id".to_string(), AttributeValue::S(user.id.to_string())),
        ("email".to_string(), AttributeValue::S(user.email.clone())),
        ("username".to_string(), AttributeValue::S(user.username.clone())),
        ("password_hash".to_string(), AttributeValue::S(user.password_hash.clone())),
        ("created_at".to_string(), AttributeValue::S(user.created_at.to_rfc3339())),
    ]);
    put_opt(&mut item, "display_name", &user.display_name);
    put_opt(&mut item, "avatar_url", &user.avatar_url);
    item
}

fn item_to_user(item: &Item) -> Option<User> {
    Some(User {
        id: Uuid::parse_str(&get_s(item, "id")?).ok()?,
        email: get_s(item, "email")?,
        username: get_s(item, "username")?,
        password_hash: get_s(item, "password_hash")?,
        display_name: get_s(item, "display_name"),
        avatar_url: get_s(item, "avatar_url"),
        created_at: get_time(item, "created_at")?,
    })
}

fn saved_meme_to_item(meme: &SavedMeme) -> Item {
    let mut item = HashMap::from([
        (SAVED_MEME_PARTITION_KEY.to_string(), AttributeValue::S(meme.user_id.to_string())),
        (SAVED_MEME_SORT_KEY.to_string(), AttributeValue::S(meme.meme_id.clone())),
        ("id".to_string(), AttributeValue::S(meme.id.to_string())),
        ("title".to_string(), AttributeValue::S(meme.title.clone())),
        ("image_url".to_string(), AttributeValue::S(meme.image_url.clone())),
        ("created_at".to_string(), AttributeValue::S(meme.created_at.to_rfc3339())),
    ]);
    put_opt(&mut item, "source", &meme.source);
    put_opt(&mut item, "subreddit", &meme.subreddit);
    put_opt(&mut item, "author", &meme.author);
    item
}

fn item_to_saved_meme(item: &Item) -> Option<SavedMeme> {
    Some(SavedMeme {
        id: Uuid::parse_str(&get_s(item, "id")?).ok()?,
        user_id: Uuid::parse_str(&get_s(item, SAVED_MEME_PARTITION_KEY)?).ok()?,
        meme_id: get_s(item, SAVED_MEME_SORT_KEY)?,
        title: get_s(item, "title")?,
        image_url: get_s(item, "image_url")?,
        source: get_s(item, "source"),
        subreddit: get_s(item, "subreddit"),
        author: get_s(item, "author"),
        created_at: get_time(item, "created_at")?,
    })
}
