use crate::{
    AppState,
    auth::AuthService,
    aws_clients::{create_dynamodb_client, create_sdk_config},
    config::{Config, StorageBackend},
    domain::{SavedMemeRepository, UserRepository},
    memory::MemoryStore,
    repositories::{
        DynamoDbSavedMemeRepository, DynamoDbUserRepository, SAVED_MEME_PARTITION_KEY, SAVED_MEME_SORT_KEY,
        USER_KEY,
    },
    saved_memes::SavedMemeService,
    token::{TokenError, TokenService},
};
use aws_sdk_dynamodb::{
    Client as DynamoDbClient,
    error::SdkError as DynamoSdkError,
    types::{AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType},
};
use aws_smithy_types::error::operation::BuildError;
use std::sync::Arc;
use thiserror::Error;
use tracing;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Initialization error: {0}")]
    Init(String),
    #[error("Token service error: {0}")]
    Token(#[from] TokenError),
    #[error("Failed to build DynamoDB request: {0}")]
    Build(#[from] BuildError),
}

/// Wires repositories and services for the configured storage backend.
pub async fn build_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let tokens = TokenService::new(&config.jwt_secret)?;

    let (users, saved_memes): (Arc<dyn UserRepository>, Arc<dyn SavedMemeRepository>) = match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Startup: Using in-memory storage; data is lost on restart.");
            let store = Arc::new(MemoryStore::new());
            (
                store.clone() as Arc<dyn UserRepository>,
                store as Arc<dyn SavedMemeRepository>,
            )
        }
        StorageBackend::DynamoDb => {
            let sdk_config = create_sdk_config(config).await;
            let client = create_dynamodb_client(&sdk_config);
            init_resources(&client, config).await?;
            (
                Arc::new(DynamoDbUserRepository::new(client.clone(), config.users_table.clone())),
                Arc::new(DynamoDbSavedMemeRepository::new(client, config.saved_memes_table.clone())),
            )
        }
    };

    Ok(Arc::new(AppState::new(users, saved_memes, tokens, config.bcrypt_cost)))
}

/// In-memory state for tests and local runs.
pub fn memory_state(jwt_secret: &str, bcrypt_cost: u32) -> Result<Arc<AppState>, StartupError> {
    let tokens = TokenService::new(jwt_secret)?;
    let store = Arc::new(MemoryStore::new());
    Ok(Arc::new(AppState::new(store.clone(), store, tokens, bcrypt_cost)))
}

struct KeySpec<'a> {
    name: &'a str,
    key_type: KeyType,
}

/// Creates a DynamoDB table keyed by string attributes, if it doesn't exist.
async fn create_table_if_not_exists(
    client: &DynamoDbClient,
    table_name: &str,
    keys: &[KeySpec<'_>],
) -> Result<(), StartupError> {
    let mut request = client
        .create_table()
        .table_name(table_name)
        .billing_mode(BillingMode::PayPerRequest);

    for key in keys {
        request = request
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(key.name)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            )
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(key.name)
                    .key_type(key.key_type.clone())
                    .build()?,
            );
    }

    match request.send().await {
        Ok(_) => {
            tracing::info!("Startup: Table '{}' created successfully or setup initiated.", table_name);
            Ok(())
        }
        Err(e) => {
            if let DynamoSdkError::ServiceError(service_err) = &e {
                if service_err.err().is_resource_in_use_exception() {
                    tracing::info!("Startup: Table '{}' already exists, no action needed.", table_name);
                    return Ok(());
                }
                let context = format!("Startup: Service error creating DynamoDB table '{}'", table_name);
                tracing::error!("{}: {:?}", context, service_err);
                Err(StartupError::Init(format!("{}: {}", context, e)))
            } else {
                let context = format!("Startup: SDK error creating DynamoDB table '{}'", table_name);
                tracing::error!("{}: {}", context, e);
                Err(StartupError::Init(format!("{}: {}", context, e)))
            }
        }
    }
}

/// Initializes the DynamoDB tables for users and saved memes.
pub async fn init_resources(client: &DynamoDbClient, config: &Config) -> Result<(), StartupError> {
    tracing::info!("Startup: Initializing AWS resources...");
    create_table_if_not_exists(
        client,
        &config.users_table,
        &[KeySpec { name: USER_KEY, key_type: KeyType::Hash }],
    )
    .await?;
    create_table_if_not_exists(
        client,
        &config.saved_memes_table,
        &[
            KeySpec { name: SAVED_MEME_PARTITION_KEY, key_type: KeyType::Hash },
            KeySpec { name: SAVED_MEME_SORT_KEY, key_type: KeyType::Range },
        ],
    )
    .await?;
    tracing::info!("Startup: AWS resource initialization complete.");
    Ok(())
}
