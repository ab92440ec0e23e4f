//! Typed endpoint wrappers over [`ApiClient`].
//!
//! The three list resources (workflows, executions, agents) share their
//! CRUD surface through [`Resource`]; everything else is a plain function
//! in the module named after its path prefix.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::ApiClient;
use crate::error::ApiError;
use crate::models::{Identified, ListResponse};

pub mod agents;
pub mod auth;
pub mod executions;
pub mod settings;
pub mod stats;
pub mod users;
pub mod workflows;

/// A REST collection at `PATH` with `PATH/:id` members.
pub trait Resource {
    const PATH: &'static str;
    type Entity: DeserializeOwned + Clone + Identified;
    type Input: Serialize;

    fn item_path(id: i64) -> String {
        format!("{}/{}", Self::PATH, id)
    }
}

pub async fn list<R: Resource>(
    client: &ApiClient,
    query: &[(String, String)],
) -> Result<ListResponse<R::Entity>, ApiError> {
    client.get(R::PATH, query).await
}

pub async fn get<R: Resource>(client: &ApiClient, id: i64) -> Result<R::Entity, ApiError> {
    client.get(&R::item_path(id), &[]).await
}

pub async fn create<R: Resource>(client: &ApiClient, input: &R::Input) -> Result<R::Entity, ApiError> {
    client.post(R::PATH, Some(input)).await
}

pub async fn update<R: Resource>(
    client: &ApiClient,
    id: i64,
    input: &R::Input,
) -> Result<R::Entity, ApiError> {
    client.put(&R::item_path(id), input).await
}

/// The response body, if any, is ignored.
pub async fn delete<R: Resource>(client: &ApiClient, id: i64) -> Result<(), ApiError> {
    client.delete::<Value>(&R::item_path(id)).await.map(|_| ())
}
