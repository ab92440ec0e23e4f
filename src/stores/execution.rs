use std::ops::Deref;
use std::rc::Rc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::entity::{EntityStore, Filters, ListResource};
use crate::error::ApiError;
use crate::models::Execution;
use crate::network::api::executions;
use crate::network::ApiClient;
use crate::status::ExecutionStatus;

pub use crate::network::api::executions::Executions;

/// Dates are `YYYY-MM-DD`, both ends inclusive, compared in UTC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionFilters {
    pub workflow_id: Option<i64>,
    pub status: String,
    pub start_date: String,
    pub end_date: String,
}

impl Filters for ExecutionFilters {
    type Item = Execution;

    fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(id) = self.workflow_id {
            params.push(("workflow_id".to_string(), id.to_string()));
        }
        for (key, value) in [
            ("status", &self.status),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
        ] {
            if !value.is_empty() {
                params.push((key.to_string(), value.clone()));
            }
        }
        params
    }

    fn matches(&self, execution: &Execution) -> bool {
        if self.workflow_id.is_some() && execution.workflow_id != self.workflow_id {
            return false;
        }
        if !self.status.is_empty() && execution.status != self.status {
            return false;
        }

        let from = day_bound(&self.start_date, false);
        let to = day_bound(&self.end_date, true);
        if from.is_none() && to.is_none() {
            return true;
        }
        // With a date filter set, rows without a readable start time drop out.
        let Some(started) = execution.started_at.as_deref().and_then(parse_timestamp) else {
            return false;
        };
        from.map_or(true, |from| started >= from) && to.map_or(true, |to| started <= to)
    }
}

/// Start (00:00:00.000) or end (23:59:59.999) of a `YYYY-MM-DD` day.
/// Empty or unreadable input means "no bound".
fn day_bound(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let day = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        day.and_hms_milli_opt(23, 59, 59, 999)?
    } else {
        day.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

/// RFC 3339, or a naive ISO timestamp taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

impl ListResource for Executions {
    type Filters = ExecutionFilters;
    const NOUN: &'static str = "执行记录";
}

/// Execution history plus remote cancellation.
pub struct ExecutionStore {
    inner: EntityStore<Executions>,
}

impl ExecutionStore {
    pub fn new(client: Rc<ApiClient>) -> Self {
        Self {
            inner: EntityStore::new(client),
        }
    }

    /// Cancel the remote run and mark it `cancelled` locally.
    pub async fn cancel(&self, id: i64) -> Result<(), ApiError> {
        self.inner.begin();
        match executions::cancel(self.inner.client(), id).await {
            Ok(()) => {
                self.inner.patch_where(id, |execution| {
                    execution.status = ExecutionStatus::Cancelled.as_str().to_string();
                });
                self.inner.finish();
                Ok(())
            }
            Err(err) => Err(self.inner.fail(err, "取消执行失败")),
        }
    }
}

impl Deref for ExecutionStore {
    type Target = EntityStore<Executions>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::test_support::Harness;
    use futures::executor::block_on;
    use serde_json::json;

    fn execution(id: i64, started_at: Option<&str>) -> Execution {
        serde_json::from_value(json!({
            "id": id,
            "workflowId": 1,
            "status": "success",
            "startedAt": started_at
        }))
        .unwrap()
    }

    #[test]
    fn date_range_is_inclusive_in_utc() {
        let filters = ExecutionFilters {
            start_date: "2024-03-01".into(),
            end_date: "2024-03-02".into(),
            ..Default::default()
        };
        assert!(filters.matches(&execution(1, Some("2024-03-01T00:00:00Z"))));
        assert!(filters.matches(&execution(2, Some("2024-03-02T23:59:59.999Z"))));
        assert!(!filters.matches(&execution(3, Some("2024-03-03T00:00:00Z"))));
        assert!(!filters.matches(&execution(4, Some("2024-02-29T23:59:59Z"))));
        assert!(filters.matches(&execution(5, Some("2024-03-02T08:00:00+08:00"))));
        assert!(filters.matches(&execution(6, Some("2024-03-01T12:00:00"))));
        assert!(!filters.matches(&execution(7, None)));
    }

    #[test]
    fn workflow_and_status_filters() {
        let mut filters = ExecutionFilters {
            workflow_id: Some(2),
            ..Default::default()
        };
        assert!(!filters.matches(&execution(1, None)));
        filters.workflow_id = Some(1);
        filters.status = "success".into();
        assert!(filters.matches(&execution(1, None)));
        assert_eq!(
            filters.query_params(),
            vec![
                ("workflow_id".to_string(), "1".to_string()),
                ("status".to_string(), "success".to_string())
            ]
        );
        assert!(filters.is_filtered());
        assert!(!ExecutionFilters::default().is_filtered());
    }

    #[test]
    fn cancel_marks_item_and_current() {
        let h = Harness::new();
        let store = ExecutionStore::new(h.client.clone());
        h.transport.push_json(
            200,
            json!({"data": [{"id": 5, "status": "running"}, {"id": 6, "status": "running"}], "total": 2}),
        );
        block_on(store.fetch_list(&[])).unwrap();
        h.transport.push_json(200, json!({"id": 5, "status": "running"}));
        block_on(store.fetch_by_id(5)).unwrap();

        h.transport.push_json(200, json!({"message": "ok"}));
        block_on(store.cancel(5)).unwrap();

        assert_eq!(store.get_by_id(5).unwrap().status, "cancelled");
        assert_eq!(store.get_by_id(6).unwrap().status, "running");
        assert_eq!(store.current_item().unwrap().status, "cancelled");
        assert!(h.transport.last_request().unwrap().url.ends_with("/executions/5/cancel"));
    }

    #[test]
    fn failed_cancel_leaves_status() {
        let h = Harness::new();
        let store = ExecutionStore::new(h.client.clone());
        h.transport
            .push_json(200, json!({"data": [{"id": 5, "status": "running"}], "total": 1}));
        block_on(store.fetch_list(&[])).unwrap();

        h.transport.push_json(403, json!({"message": "not yours"}));
        assert!(block_on(store.cancel(5)).is_err());
        assert_eq!(store.get_by_id(5).unwrap().status, "running");
        assert_eq!(store.error().as_deref(), Some("not yours"));
    }
}
