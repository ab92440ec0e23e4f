use std::cell::{Cell, RefCell};
use std::ops::Deref;
use std::rc::Rc;

use serde_json::Value;

use super::entity::{EntityStore, Filters, ListResource};
use super::workflow::matches_search;
use crate::error::ApiError;
use crate::models::Agent;
use crate::network::api::agents;
use crate::network::ApiClient;
use crate::status::agent_type_options;

pub use crate::network::api::agents::Agents;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentFilters {
    pub agent_type: String,
    pub status: String,
    pub search: String,
}

impl Filters for AgentFilters {
    type Item = Agent;

    fn query_params(&self) -> Vec<(String, String)> {
        [
            ("type", &self.agent_type),
            ("status", &self.status),
            ("search", &self.search),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
    }

    fn matches(&self, agent: &Agent) -> bool {
        (self.agent_type.is_empty() || agent.agent_type == self.agent_type)
            && (self.status.is_empty() || agent.status == self.status)
            && matches_search(&self.search, &agent.name, agent.description.as_deref())
    }
}

impl ListResource for Agents {
    type Filters = AgentFilters;
    const NOUN: &'static str = "代理";
}

/// Agent catalogue plus the dry-run ("test") call, which has its own
/// loading flag and result slot.
pub struct AgentStore {
    inner: EntityStore<Agents>,
    test_loading: Cell<bool>,
    test_result: RefCell<Option<Value>>,
}

impl AgentStore {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            inner: EntityStore::new(client),
            test_loading: Cell::new(false),
            test_result: RefCell::new(None),
        }
    }

    pub fn test_loading(&self) -> bool {
        self.test_loading.get()
    }

    pub fn test_result(&self) -> Option<Value> {
        self.test_result.borrow().clone()
    }

    /// `(value, label)` options for the type picker.
    pub fn agent_types(&self) -> Vec<(&'static str, &'static str)> {
        agent_type_options()
    }

    pub async fn test(&self, id: i64, input: &Value) -> Result<Value, ApiError> {
        self.test_loading.set(true);
        *self.test_result.borrow_mut() = None;
        self.inner.clear_error();

        let result = agents::test(self.inner.client(), id, input).await;
        self.test_loading.set(false);
        match result {
            Ok(value) => {
                *self.test_result.borrow_mut() = Some(value.clone());
                Ok(value)
            }
            Err(err) => Err(self.inner.record_error(err, "测试代理失败")),
        }
    }
}

impl Deref for AgentStore {
    type Target = EntityStore<Agents>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
