//! Task kinds and caller identity

use serde::{Deserialize, Serialize};

/// The logical action performed by one engine call
///
/// Also used as the action kind of audit entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Create,
    Update,
    Read,
    Delete,
    Login,
    Logout,
}

impl TaskType {
    pub const ALL: [TaskType; 6] = [
        TaskType::Create,
        TaskType::Update,
        TaskType::Read,
        TaskType::Delete,
        TaskType::Login,
        TaskType::Logout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Create => "create",
            TaskType::Update => "update",
            TaskType::Read => "read",
            TaskType::Delete => "delete",
            TaskType::Login => "login",
            TaskType::Logout => "logout",
        }
    }

    /// Parse a task name, accepting the common aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "create" | "insert" => Some(TaskType::Create),
            "update" => Some(TaskType::Update),
            "read" | "get" => Some(TaskType::Read),
            "delete" | "remove" => Some(TaskType::Delete),
            "login" => Some(TaskType::Login),
            "logout" => Some(TaskType::Logout),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Identity of the caller on whose behalf a task runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl UserInfo {
    /// A user known only by id
    pub fn with_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }
}
