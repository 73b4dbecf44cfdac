use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Known privileged-operation categories, plus a catch-all for types this
/// build does not recognize. Unknown types always fall back to the
/// conservative default policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ApprovalType {
    Pairing,
    TerminalCommand,
    FileOperation,
    NetworkOperation,
    ProjectMutation,
    Other(String),
}

impl ApprovalType {
    pub fn as_str(&self) -> &str {
        match self {
            ApprovalType::Pairing => "pairing",
            ApprovalType::TerminalCommand => "terminal_command",
            ApprovalType::FileOperation => "file_operation",
            ApprovalType::NetworkOperation => "network_operation",
            ApprovalType::ProjectMutation => "project_mutation",
            ApprovalType::Other(name) => name,
        }
    }
}

impl From<&str> for ApprovalType {
    fn from(value: &str) -> Self {
        match value {
            "pairing" => ApprovalType::Pairing,
            "terminal_command" => ApprovalType::TerminalCommand,
            "file_operation" => ApprovalType::FileOperation,
            "network_operation" => ApprovalType::NetworkOperation,
            "project_mutation" => ApprovalType::ProjectMutation,
            other => ApprovalType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ApprovalType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ApprovalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ApprovalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ApprovalType::from(s.as_str()))
    }
}

/// Terminal-once-set request state: only `pending` may transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Expired,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Denied => write!(f, "denied"),
            ApprovalStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A human decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Deny,
}

impl ApprovalAction {
    pub fn terminal_status(&self) -> ApprovalStatus {
        match self {
            ApprovalAction::Approve => ApprovalStatus::Approved,
            ApprovalAction::Deny => ApprovalStatus::Denied,
        }
    }
}

/// A persisted, human-resolvable record of a privileged-operation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ApprovalType,
    pub payload: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    pub fn new(
        kind: ApprovalType,
        payload: serde_json::Value,
        project_id: Option<String>,
        priority: Option<i64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            project_id,
            priority,
            status: ApprovalStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_string_roundtrip() {
        for name in [
            "pairing",
            "terminal_command",
            "file_operation",
            "network_operation",
            "project_mutation",
        ] {
            assert_eq!(ApprovalType::from(name).as_str(), name);
        }
        assert_eq!(
            ApprovalType::from("repo_sync"),
            ApprovalType::Other("repo_sync".to_string())
        );
    }

    #[test]
    fn test_type_serde_as_string() {
        let json = serde_json::to_string(&ApprovalType::TerminalCommand).unwrap();
        assert_eq!(json, r#""terminal_command""#);
        let back: ApprovalType = serde_json::from_str(r#""custom_kind""#).unwrap();
        assert_eq!(back, ApprovalType::Other("custom_kind".to_string()));
    }

    #[test]
    fn test_new_request_is_pending() {
        let request = ApprovalRequest::new(
            ApprovalType::TerminalCommand,
            serde_json::json!({"command": "ls"}),
            None,
            None,
        );
        assert!(request.is_pending());
        assert!(request.resolved_at.is_none());
    }
}
