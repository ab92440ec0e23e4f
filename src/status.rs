//! Status vocabularies of the platform entities and their display badges.
//!
//! Entities keep their `status` as the raw wire string so that values the
//! console does not know yet survive a round trip.  The enums here are only
//! used to *render* them: every `format_*` function is total and falls back
//! to the raw text with the `default` badge class.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text plus CSS class of a status chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub text: String,
    pub class: &'static str,
}

impl StatusBadge {
    fn new(text: impl Into<String>, class: &'static str) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }

    fn fallback(raw: &str) -> Self {
        Self::new(raw, "default")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub const ALL: [ExecutionStatus; 5] = [
        ExecutionStatus::Pending,
        ExecutionStatus::Running,
        ExecutionStatus::Success,
        ExecutionStatus::Failed,
        ExecutionStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    pub fn badge(self) -> StatusBadge {
        match self {
            ExecutionStatus::Pending => StatusBadge::new("等待中", "info"),
            ExecutionStatus::Running => StatusBadge::new("运行中", "info"),
            ExecutionStatus::Success => StatusBadge::new("成功", "success"),
            ExecutionStatus::Failed => StatusBadge::new("失败", "error"),
            ExecutionStatus::Cancelled => StatusBadge::new("已取消", "warning"),
        }
    }

    /// Still able to change state (and therefore cancellable).
    pub fn is_active(self) -> bool {
        matches!(self, ExecutionStatus::Pending | ExecutionStatus::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Inactive,
    Error,
    Pending,
}

impl AgentStatus {
    pub const ALL: [AgentStatus; 4] = [
        AgentStatus::Active,
        AgentStatus::Inactive,
        AgentStatus::Error,
        AgentStatus::Pending,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Error => "error",
            AgentStatus::Pending => "pending",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    pub fn badge(self) -> StatusBadge {
        match self {
            AgentStatus::Active => StatusBadge::new("活跃", "success"),
            AgentStatus::Inactive => StatusBadge::new("未激活", "warning"),
            AgentStatus::Error => StatusBadge::new("错误", "error"),
            AgentStatus::Pending => StatusBadge::new("待处理", "info"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Llm,
    Function,
    Tool,
    Custom,
}

impl AgentType {
    pub const ALL: [AgentType; 4] = [
        AgentType::Llm,
        AgentType::Function,
        AgentType::Tool,
        AgentType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentType::Llm => "llm",
            AgentType::Function => "function",
            AgentType::Tool => "tool",
            AgentType::Custom => "custom",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    pub fn label(self) -> &'static str {
        match self {
            AgentType::Llm => "大语言模型",
            AgentType::Function => "函数代理",
            AgentType::Tool => "工具代理",
            AgentType::Custom => "自定义代理",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Inactive,
    Archived,
}

impl WorkflowStatus {
    pub const ALL: [WorkflowStatus; 4] = [
        WorkflowStatus::Draft,
        WorkflowStatus::Active,
        WorkflowStatus::Inactive,
        WorkflowStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Active => "active",
            WorkflowStatus::Inactive => "inactive",
            WorkflowStatus::Archived => "archived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    pub fn badge(self) -> StatusBadge {
        match self {
            WorkflowStatus::Draft => StatusBadge::new("草稿", "default"),
            WorkflowStatus::Active => StatusBadge::new("已启用", "success"),
            WorkflowStatus::Inactive => StatusBadge::new("已停用", "warning"),
            WorkflowStatus::Archived => StatusBadge::new("已归档", "info"),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(ExecutionStatus, AgentStatus, AgentType, WorkflowStatus);

// ---------------------------------------------------------------------------
// Total formatters over raw wire strings
// ---------------------------------------------------------------------------

pub fn format_execution_status(raw: &str) -> StatusBadge {
    ExecutionStatus::parse(raw)
        .map(ExecutionStatus::badge)
        .unwrap_or_else(|| StatusBadge::fallback(raw))
}

pub fn format_agent_status(raw: &str) -> StatusBadge {
    AgentStatus::parse(raw)
        .map(AgentStatus::badge)
        .unwrap_or_else(|| StatusBadge::fallback(raw))
}

pub fn format_workflow_status(raw: &str) -> StatusBadge {
    WorkflowStatus::parse(raw)
        .map(WorkflowStatus::badge)
        .unwrap_or_else(|| StatusBadge::fallback(raw))
}

pub fn format_agent_type(raw: &str) -> String {
    AgentType::parse(raw)
        .map(|t| t.label().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// `(value, label)` pairs for an agent-type picker.
pub fn agent_type_options() -> Vec<(&'static str, &'static str)> {
    AgentType::ALL.iter().map(|t| (t.as_str(), t.label())).collect()
}
