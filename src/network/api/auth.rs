use serde_json::Value;

use crate::error::ApiError;
use crate::models::{AuthResponse, Credentials, RegisterRequest, TokenRefresh};
use crate::network::ApiClient;

pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
    client.post("/auth/login", Some(credentials)).await
}

pub async fn register(client: &ApiClient, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
    client.post("/auth/register", Some(request)).await
}

pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
    client
        .post::<Value, Value>("/auth/logout", None)
        .await
        .map(|_| ())
}

pub async fn refresh_token(client: &ApiClient) -> Result<TokenRefresh, ApiError> {
    client.post::<Value, TokenRefresh>("/auth/refresh", None).await
}
