//! Dashboard statistics.
//!
//! The dashboard endpoint returns the whole picture; the three narrower
//! endpoints return partial objects and only overwrite the fields they
//! actually carry.

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::future::join4;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{AgentStats, DashboardStats, ExecutionStats, WorkflowStats};
use crate::network::api::stats;
use crate::network::ApiClient;
use crate::scheduling::Clock;

const FALLBACK_COLOR: &str = "#9e9e9e";

#[derive(Debug, Clone, Default, PartialEq)]
struct StatsState {
    dashboard: DashboardStats,
    loading: bool,
    error: Option<String>,
    last_updated_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<u64>,
    pub background_color: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    pub border_width: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

/// Labels plus datasets, in the shape chart widgets consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<ChartDataset>,
}

/// Colour used for an execution status in charts.
pub fn execution_status_color(status: &str) -> &'static str {
    match status {
        "success" => "#4caf50",
        "failed" => "#f44336",
        "running" => "#2196f3",
        "pending" => "#ff9800",
        "cancelled" => FALLBACK_COLOR,
        _ => FALLBACK_COLOR,
    }
}

pub struct StatsStore {
    client: Rc<ApiClient>,
    clock: Rc<dyn Clock>,
    state: RefCell<StatsState>,
}

impl StatsStore {
    pub fn new(client: Rc<ApiClient>, clock: Rc<dyn Clock>) -> Self {
        Self {
            client,
            clock,
            state: RefCell::new(StatsState::default()),
        }
    }

    pub fn dashboard(&self) -> DashboardStats {
        self.state.borrow().dashboard.clone()
    }

    pub fn loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn last_updated_ms(&self) -> Option<u64> {
        self.state.borrow().last_updated_ms
    }

    fn begin(&self) {
        let mut state = self.state.borrow_mut();
        state.loading = true;
        state.error = None;
    }

    fn succeed(&self) {
        let now = self.clock.now_ms();
        let mut state = self.state.borrow_mut();
        state.loading = false;
        state.last_updated_ms = Some(now);
    }

    fn fail(&self, err: ApiError, fallback: &str) -> ApiError {
        log::error!("{}: {}", fallback, err);
        let mut state = self.state.borrow_mut();
        state.loading = false;
        state.error = Some(err.message_or(fallback));
        err
    }

    /// Wraps one load with the `loading`/`error`/`last_updated` bookkeeping.
    async fn tracked<T>(
        &self,
        load: impl std::future::Future<Output = Result<T, ApiError>>,
        fallback: &str,
    ) -> Result<T, ApiError> {
        self.begin();
        match load.await {
            Ok(value) => {
                self.succeed();
                Ok(value)
            }
            Err(err) => Err(self.fail(err, fallback)),
        }
    }

    // The `load_*` helpers only fetch and merge; callers own the flags.

    async fn load_dashboard(&self) -> Result<DashboardStats, ApiError> {
        let fresh = stats::dashboard(&self.client).await?;
        self.state.borrow_mut().dashboard = fresh.clone();
        Ok(fresh)
    }

    async fn load_executions(&self, query: &[(String, String)]) -> Result<ExecutionStats, ApiError> {
        let partial = stats::executions(&self.client, query).await?;
        let mut state = self.state.borrow_mut();
        let dashboard = &mut state.dashboard;
        if let Some(by_status) = &partial.executions_by_status {
            dashboard.executions_by_status = by_status.clone();
        }
        if let Some(trend) = &partial.execution_trend {
            dashboard.execution_trend = trend.clone();
        }
        if let Some(rate) = partial.success_rate {
            dashboard.success_rate = rate;
        }
        Ok(partial)
    }

    async fn load_workflows(&self) -> Result<WorkflowStats, ApiError> {
        let partial = stats::workflows(&self.client).await?;
        let mut state = self.state.borrow_mut();
        let dashboard = &mut state.dashboard;
        if let Some(top) = &partial.top_workflows {
            dashboard.top_workflows = top.clone();
        }
        if let Some(total) = partial.total_workflows {
            dashboard.total_workflows = total;
        }
        Ok(partial)
    }

    async fn load_agents(&self) -> Result<AgentStats, ApiError> {
        let partial = stats::agents(&self.client).await?;
        if let Some(total) = partial.total_agents {
            self.state.borrow_mut().dashboard.total_agents = total;
        }
        Ok(partial)
    }

    pub async fn fetch_dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.tracked(self.load_dashboard(), "获取仪表盘统计数据失败").await
    }

    pub async fn fetch_execution_stats(&self, query: &[(String, String)]) -> Result<ExecutionStats, ApiError> {
        self.tracked(self.load_executions(query), "获取执行统计数据失败").await
    }

    pub async fn fetch_workflow_stats(&self) -> Result<WorkflowStats, ApiError> {
        self.tracked(self.load_workflows(), "获取工作流统计数据失败").await
    }

    pub async fn fetch_agent_stats(&self) -> Result<AgentStats, ApiError> {
        self.tracked(self.load_agents(), "获取代理统计数据失败").await
    }

    /// All four requests concurrently.  `loading` stays up until every
    /// request has settled; `last_updated` moves only when all succeeded.
    /// Fails with the first error in request order.
    pub async fn fetch_all_stats(&self) -> Result<(), ApiError> {
        let all = async {
            let (dashboard, executions, workflows, agents) = join4(
                self.load_dashboard(),
                self.load_executions(&[]),
                self.load_workflows(),
                self.load_agents(),
            )
            .await;
            dashboard
                .map(|_| ())
                .and(executions.map(|_| ()))
                .and(workflows.map(|_| ()))
                .and(agents.map(|_| ()))
        };
        self.tracked(all, "获取统计数据失败").await
    }

    // ---------------- Derived views ----------------

    /// Success rate as a percentage with one decimal, e.g. `87.5%`.
    pub fn formatted_success_rate(&self) -> String {
        format!("{:.1}%", self.state.borrow().dashboard.success_rate * 100.0)
    }

    pub fn execution_trend_chart(&self) -> ChartData {
        let state = self.state.borrow();
        let trend = &state.dashboard.execution_trend;
        let line = |label: &str, data: Vec<u64>, fill: &str, stroke: &str| ChartDataset {
            label: Some(label.to_string()),
            data,
            background_color: vec![fill.to_string()],
            border_color: Some(stroke.to_string()),
            border_width: 2,
            tension: Some(0.4),
        };
        ChartData {
            labels: trend.iter().map(|p| p.date.clone()).collect(),
            datasets: vec![
                line(
                    "成功",
                    trend.iter().map(|p| p.success).collect(),
                    "rgba(76, 175, 80, 0.2)",
                    "#4caf50",
                ),
                line(
                    "失败",
                    trend.iter().map(|p| p.failed).collect(),
                    "rgba(244, 67, 54, 0.2)",
                    "#f44336",
                ),
            ],
        }
    }

    pub fn executions_by_status_chart(&self) -> ChartData {
        let state = self.state.borrow();
        let rows = &state.dashboard.executions_by_status;
        ChartData {
            labels: rows.iter().map(|r| r.status.clone()).collect(),
            datasets: vec![ChartDataset {
                label: None,
                data: rows.iter().map(|r| r.count).collect(),
                background_color: rows
                    .iter()
                    .map(|r| execution_status_color(&r.status).to_string())
                    .collect(),
                border_color: None,
                border_width: 1,
                tension: None,
            }],
        }
    }
}
