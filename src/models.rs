use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything a list store can hold: it must expose a stable numeric id.
pub trait Identified {
    fn id(&self) -> i64;
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// Decode a response body into `T`.
///
/// Some endpoints wrap their payload as `{ "status": "success", "data": T }`,
/// others return `T` directly, so the ambiguity is settled here and never
/// leaves the API layer: a `data` member holding an *object* is tried as the
/// payload first (a `data` *array* is the flat list shape), then the body
/// itself.  An empty body is treated as JSON `null`.
pub fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, serde_json::Error> {
    let trimmed = body.trim();
    let text = if trimmed.is_empty() { "null" } else { trimmed };
    let value: Value = serde_json::from_str(text)?;

    match value.get("data").filter(|data| data.is_object()).cloned() {
        Some(inner) => serde_json::from_value(inner).or_else(|_| serde_json::from_value(value)),
        None => serde_json::from_value(value),
    }
}

/// Paged list payload.  Missing `data` means an empty page, missing `total`
/// means zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Default for ListResponse<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            total: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth & users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<String>,
    /// Fields the console does not model are kept so a profile merge never
    /// drops server data.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Shallow-merge a partial profile (as returned by `PUT /users/profile`)
    /// into this one.  `id` never changes.
    pub fn merge(&mut self, patch: &Value) -> Result<(), serde_json::Error> {
        let mut current = serde_json::to_value(&*self)?;
        if let (Some(target), Some(source)) = (current.as_object_mut(), patch.as_object()) {
            for (key, value) in source {
                if key != "id" {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        *self = serde_json::from_value(current)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefresh {
    pub token: String,
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub definition: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_run_at: Option<String>,
    #[serde(default)]
    pub run_count: u64,
}

impl Identified for Workflow {
    fn id(&self) -> i64 {
        self.id
    }
}

/// Create / update payload.  Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Executions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: i64,
    #[serde(default)]
    pub workflow_id: Option<i64>,
    #[serde(default)]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub agent_id: Option<i64>,
    #[serde(default)]
    pub agent_name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub logs: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub input_data: Option<Value>,
    #[serde(default)]
    pub output_data: Option<Value>,
}

impl Identified for Execution {
    fn id(&self) -> i64 {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub agent_type: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub definition: Option<Value>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Identified for Agent {
    fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_workflows: u64,
    pub total_executions: u64,
    pub total_agents: u64,
    /// Fraction in `[0, 1]`.
    pub success_rate: f64,
    pub recent_executions: Vec<Execution>,
    pub executions_by_status: Vec<StatusCount>,
    pub execution_trend: Vec<TrendPoint>,
    pub top_workflows: Vec<Workflow>,
}

/// `GET /stats/executions` – every field optional, only present ones are
/// merged into the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionStats {
    pub executions_by_status: Option<Vec<StatusCount>>,
    pub execution_trend: Option<Vec<TrendPoint>>,
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowStats {
    pub top_workflows: Option<Vec<Workflow>>,
    pub total_workflows: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentStats {
    pub total_agents: Option<u64>,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeSettings {
    pub mode: String,
    pub color: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            mode: "light".to_string(),
            color: "blue".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutSettings {
    pub sidebar_position: String,
    pub content_width: String,
    pub compact_mode: bool,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            sidebar_position: "left".to_string(),
            content_width: "contained".to_string(),
            compact_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: ThemeSettings,
    pub language: String,
    pub date_format: String,
    pub time_format: String,
    pub timezone: String,
    pub layout: LayoutSettings,
    /// Per-channel notification preferences (`email`, `browser`, `inApp`).
    /// Kept as JSON because the console only merges and round-trips them.
    pub notifications: Value,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: ThemeSettings::default(),
            language: "zh-CN".to_string(),
            date_format: "yyyy-MM-dd".to_string(),
            time_format: "HH:mm:ss".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            layout: LayoutSettings::default(),
            notifications: serde_json::json!({
                "email": {
                    "enabled": true,
                    "frequency": "immediate",
                    "types": {
                        "workflow_completed": true,
                        "workflow_failed": true,
                        "agent_error": true,
                        "new_updates": true,
                        "security_alerts": true
                    }
                },
                "browser": {
                    "enabled": false,
                    "sound": "default",
                    "types": {
                        "workflow_completed": true,
                        "workflow_failed": true,
                        "agent_error": true,
                        "security_alerts": true
                    }
                },
                "inApp": {
                    "enabled": true,
                    "position": "top-right",
                    "types": {
                        "workflow_completed": true,
                        "workflow_failed": true,
                        "agent_error": true,
                        "security_alerts": true,
                        "new_updates": true
                    }
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_accepts_flat_and_nested_bodies() {
        let flat: ListResponse<Workflow> =
            decode_body(r#"{"data":[{"id":1,"name":"a"}],"total":9}"#).unwrap();
        assert_eq!(flat.data.len(), 1);
        assert_eq!(flat.total, 9);

        let nested: ListResponse<Workflow> = decode_body(
            r#"{"status":"success","data":{"data":[{"id":1,"name":"a"}],"total":3}}"#,
        )
        .unwrap();
        assert_eq!(nested.total, 3);

        let auth: AuthResponse = decode_body(
            r#"{"data":{"token":"t","user":{"id":1,"username":"bob","role":"user"}}}"#,
        )
        .unwrap();
        assert_eq!(auth.token, "t");
        assert_eq!(auth.user.username, "bob");
    }

    #[test]
    fn empty_page_keeps_server_total() {
        let page: ListResponse<Workflow> = decode_body(r#"{"data":[],"total":5}"#).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 5);

        let stats: DashboardStats = decode_body(
            r#"{"status":"success","data":{"totalWorkflows":4,"successRate":0.5}}"#,
        )
        .unwrap();
        assert_eq!(stats.total_workflows, 4);
        assert_eq!(stats.success_rate, 0.5);
    }

    #[test]
    fn missing_list_fields_default_to_empty() {
        let empty: ListResponse<Agent> = decode_body("{}").unwrap();
        assert!(empty.data.is_empty());
        assert_eq!(empty.total, 0);

        let unit: Value = decode_body("").unwrap();
        assert!(unit.is_null());
    }

    #[test]
    fn profile_merge_keeps_id_and_unknown_fields() {
        let mut user: UserProfile = serde_json::from_value(json!({
            "id": 3,
            "username": "carol",
            "role": "user",
            "department": "ops"
        }))
        .unwrap();

        user.merge(&json!({"id": 99, "fullName": "Carol C", "avatar": "/a.png"}))
            .unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(user.full_name, "Carol C");
        assert_eq!(user.avatar.as_deref(), Some("/a.png"));
        assert_eq!(user.extra.get("department"), Some(&json!("ops")));
    }

    #[test]
    fn agent_type_uses_wire_name() {
        let agent: Agent =
            serde_json::from_value(json!({"id": 1, "name": "x", "type": "llm"})).unwrap();
        assert_eq!(agent.agent_type, "llm");
        let input = AgentInput {
            agent_type: Some("tool".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"type": "tool"}));
    }
}
