use crate::config::Config;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_dynamodb::Client as DynamoDbClient;
use tracing;

/// SDK config for the DynamoDB backend. `AWS_ENDPOINT_URL` points it at
/// LocalStack or DynamoDB Local; credentials come from the default chain.
pub async fn create_sdk_config(config: &Config) -> SdkConfig {
    let region = Region::new(config.aws_region.clone());
    tracing::info!(
        region = %config.aws_region,
        table.users = %config.users_table,
        table.saved_memes = %config.saved_memes_table,
        "DynamoDB: Configuring client"
    );

    let mut config_loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

    if let Some(endpoint_url) = &config.aws_endpoint_url {
        tracing::info!(%endpoint_url, "DynamoDB: Using local endpoint");
        config_loader = config_loader.endpoint_url(endpoint_url);
    } else {
        tracing::debug!("DynamoDB: Using the regional AWS endpoint");
    }

    config_loader.load().await
}

/// One client is shared by both DynamoDB repositories.
pub fn create_dynamodb_client(sdk_config: &SdkConfig) -> DynamoDbClient {
    DynamoDbClient::new(sdk_config)
}
