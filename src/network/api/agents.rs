use serde_json::Value;

use super::Resource;
use crate::error::ApiError;
use crate::models::{Agent, AgentInput};
use crate::network::ApiClient;

/// `/agents`
pub struct Agents;

impl Resource for Agents {
    const PATH: &'static str = "/agents";
    type Entity = Agent;
    type Input = AgentInput;
}

/// Dry-run agent `id` against `input`.  The result shape is agent-defined.
pub async fn test(client: &ApiClient, id: i64, input: &Value) -> Result<Value, ApiError> {
    client
        .post(&format!("{}/test", Agents::item_path(id)), Some(input))
        .await
}
