use std::ops::Deref;
use std::rc::Rc;

use serde_json::Value;

use super::entity::{EntityStore, Filters, ListResource};
use crate::error::ApiError;
use crate::models::{Execution, Workflow};
use crate::network::api::workflows;
use crate::network::ApiClient;

pub use crate::network::api::workflows::Workflows;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowFilters {
    pub status: String,
    pub search: String,
}

impl Filters for WorkflowFilters {
    type Item = Workflow;

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.status.is_empty() {
            params.push(("status".to_string(), self.status.clone()));
        }
        if !self.search.is_empty() {
            params.push(("search".to_string(), self.search.clone()));
        }
        params
    }

    fn matches(&self, workflow: &Workflow) -> bool {
        if !self.status.is_empty() && workflow.status != self.status {
            return false;
        }
        matches_search(&self.search, &workflow.name, workflow.description.as_deref())
    }
}

/// Case-insensitive substring match on name or description.  An empty
/// needle matches everything.
pub(crate) fn matches_search(needle: &str, name: &str, description: Option<&str>) -> bool {
    if needle.is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    name.to_lowercase().contains(&needle)
        || description
            .map(|d| d.to_lowercase().contains(&needle))
            .unwrap_or(false)
}

impl ListResource for Workflows {
    type Filters = WorkflowFilters;
    const NOUN: &'static str = "工作流";
}

/// Workflow list plus the run trigger.
pub struct WorkflowStore {
    inner: EntityStore<Workflows>,
}

impl WorkflowStore {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            inner: EntityStore::new(client),
        }
    }

    /// Start a run.  The returned execution is not added to any list.
    pub async fn execute(&self, id: i64, params: &Value) -> Result<Execution, ApiError> {
        self.inner.begin();
        match workflows::execute(self.inner.client(), id, params).await {
            Ok(execution) => {
                self.inner.finish();
                log::info!("workflow {} started execution {}", id, execution.id);
                Ok(execution)
            }
            Err(err) => Err(self.inner.fail(err, "执行工作流失败")),
        }
    }
}

impl Deref for WorkflowStore {
    type Target = EntityStore<Workflows>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
