use serde_json::Value;

use super::Resource;
use crate::error::ApiError;
use crate::models::{Execution, Workflow, WorkflowInput};
use crate::network::ApiClient;

/// `/workflows`
pub struct Workflows;

impl Resource for Workflows {
    const PATH: &'static str = "/workflows";
    type Entity = Workflow;
    type Input = WorkflowInput;
}

/// Start a run of workflow `id` with the given input parameters.
pub async fn execute(client: &ApiClient, id: i64, params: &Value) -> Result<Execution, ApiError> {
    client
        .post(&format!("{}/execute", Workflows::item_path(id)), Some(params))
        .await
}
