use crate::error::ApiError;
use crate::models::{AgentStats, DashboardStats, ExecutionStats, WorkflowStats};
use crate::network::ApiClient;

pub async fn dashboard(client: &ApiClient) -> Result<DashboardStats, ApiError> {
    client.get("/stats/dashboard", &[]).await
}

pub async fn executions(
    client: &ApiClient,
    query: &[(String, String)],
) -> Result<ExecutionStats, ApiError> {
    client.get("/stats/executions", query).await
}

pub async fn workflows(client: &ApiClient) -> Result<WorkflowStats, ApiError> {
    client.get("/stats/workflows", &[]).await
}

pub async fn agents(client: &ApiClient) -> Result<AgentStats, ApiError> {
    client.get("/stats/agents", &[]).await
}
