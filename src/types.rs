use serde::{Deserialize, Serialize};

// Canonical shared rate metadata type used across HTTP and tools layers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i32>,
    pub used: Option<i32>,
    pub reset_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// One side of a dependency edge as reported by the dependencies API.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IssueDependency {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct DependenciesResponse {
    #[serde(default)]
    pub dependencies: Vec<IssueDependency>,
}

/// Body of add/remove requests; names the blocking issue.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}
