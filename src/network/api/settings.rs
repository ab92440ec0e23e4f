use serde_json::Value;

use crate::error::ApiError;
use crate::models::Settings;
use crate::network::ApiClient;

/// Raw JSON: the server may send only some sections, which the caller
/// merges over what it already has.
pub async fn get_settings(client: &ApiClient) -> Result<Value, ApiError> {
    client.get("/settings", &[]).await
}

/// The server echoes inconsistently, so the body is ignored and the caller
/// keeps the settings it sent.
pub async fn update_settings(client: &ApiClient, settings: &Settings) -> Result<(), ApiError> {
    client
        .put::<_, Value>("/settings", settings)
        .await
        .map(|_| ())
}
