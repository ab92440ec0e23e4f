use serde_json::Value;

use super::Resource;
use crate::error::ApiError;
use crate::models::Execution;
use crate::network::ApiClient;

/// `/executions` (read-only apart from cancel).
pub struct Executions;

impl Resource for Executions {
    const PATH: &'static str = "/executions";
    type Entity = Execution;
    type Input = Value;
}

/// Cancel the remote execution.  Does not abort any in-flight request.
pub async fn cancel(client: &ApiClient, id: i64) -> Result<(), ApiError> {
    client
        .post::<Value, Value>(&format!("{}/cancel", Executions::item_path(id)), None)
        .await
        .map(|_| ())
}
