use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Where users and saved memes are persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    DynamoDb,
    /// Process-local; everything is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dynamodb" => Ok(StorageBackend::DynamoDb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend '{}' (expected 'dynamodb' or 'memory')", other)),
        }
    }
}

#[derive(Clone)] // Clone needed if passed around
pub struct Config {
    pub bind_address: SocketAddr,
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub storage_backend: StorageBackend,
    // Store region as string for simplicity here, aws_clients can convert
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub aws_endpoint_url: Option<String>,
    pub users_table: String,
    pub saved_memes_table: String,
}

// Keeps the signing secret out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("jwt_secret", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("storage_backend", &self.storage_backend)
            .field("aws_region", &self.aws_region)
            .field("aws_endpoint_url", &self.aws_endpoint_url)
            .field("users_table", &self.users_table)
            .field("saved_memes_table", &self.saved_memes_table)
            .finish()
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:4000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("JWT_SECRET".into()))?;

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or_else(|| ConfigError::InvalidVar("BCRYPT_COST".into(), format!("'{}' is not between 4 and 31", raw)))?,
            None => 10,
        };

        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidVar("STORAGE_BACKEND".into(), e))?,
            None => StorageBackend::DynamoDb,
        };

        let aws_region = lookup("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string());

        // Allow overriding endpoint for localstack/testing
        let aws_endpoint_url = lookup("AWS_ENDPOINT_URL"); // Optional

        let users_table = lookup("USERS_TABLE").unwrap_or_else(|| "memogram_users".to_string());
        let saved_memes_table = lookup("SAVED_MEMES_TABLE").unwrap_or_else(|| "memogram_saved_memes".to_string());

        Ok(Config {
            bind_address,
            jwt_secret,
            bcrypt_cost,
            storage_backend,
            aws_region,
            aws_endpoint_url,
            users_table,
            saved_memes_table,
        })
    }
}
