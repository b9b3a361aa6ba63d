//! Connected databases as reported by the database registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection status of a registered database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseStatus {
    /// Reachable and eligible for questions.
    Active,
    /// Any other status string the server reports.
    Other(String),
}

impl From<String> for DatabaseStatus {
    fn from(s: String) -> Self {
        if s == "Active" {
            DatabaseStatus::Active
        } else {
            DatabaseStatus::Other(s)
        }
    }
}

impl From<DatabaseStatus> for String {
    fn from(status: DatabaseStatus) -> Self {
        match status {
            DatabaseStatus::Active => "Active".to_string(),
            DatabaseStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for DatabaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseStatus::Active => f.write_str("Active"),
            DatabaseStatus::Other(s) => f.write_str(s),
        }
    }
}

/// A database the user has connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseRef {
    pub database_id: String,
    #[serde(default)]
    pub database_name: String,
    pub database_status: DatabaseStatus,
}

impl DatabaseRef {
    pub fn is_active(&self) -> bool {
        self.database_status == DatabaseStatus::Active
    }
}
