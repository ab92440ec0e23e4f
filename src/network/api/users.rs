use serde_json::Value;

use crate::error::ApiError;
use crate::models::{PasswordChange, UserProfile};
use crate::network::transport::FilePart;
use crate::network::ApiClient;

pub async fn get_profile(client: &ApiClient) -> Result<UserProfile, ApiError> {
    client.get("/users/profile", &[]).await
}

/// Returns the fields the server changed, which may be a partial profile.
pub async fn update_profile(client: &ApiClient, patch: &Value) -> Result<Value, ApiError> {
    client.put("/users/profile", patch).await
}

pub async fn change_password(client: &ApiClient, change: &PasswordChange) -> Result<(), ApiError> {
    client
        .post::<_, Value>("/users/change-password", Some(change))
        .await
        .map(|_| ())
}

/// Must be called on the upload client (`ApiClient::for_uploads`).
pub async fn upload_avatar(uploads: &ApiClient, file: FilePart) -> Result<Value, ApiError> {
    uploads.upload("/users/avatar", vec![file]).await
}
