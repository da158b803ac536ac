use crate::translations::Translations;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolAnnotations {
    pub title: String,
    #[serde(rename = "readOnlyHint")]
    pub read_only_hint: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
    pub annotations: ToolAnnotations,
}

/// The callable tool identities this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyTool {
    ListBlockedBy,
    ListBlocking,
    AddBlockedBy,
    RemoveBlockedBy,
}

impl DependencyTool {
    pub const ALL: [DependencyTool; 4] = [
        DependencyTool::ListBlockedBy,
        DependencyTool::ListBlocking,
        DependencyTool::AddBlockedBy,
        DependencyTool::RemoveBlockedBy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DependencyTool::ListBlockedBy => "issue_dependencies.list_blocked_by",
            DependencyTool::ListBlocking => "issue_dependencies.list_blocking",
            DependencyTool::AddBlockedBy => "issue_dependencies.add_blocked_by",
            DependencyTool::RemoveBlockedBy => "issue_dependencies.remove_blocked_by",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            DependencyTool::ListBlockedBy | DependencyTool::ListBlocking
        )
    }

    /// Status codes treated as success. Mutations answer 200 when the edge
    /// already exists (add) or when a body is returned (remove).
    pub fn accepted_statuses(self) -> &'static [StatusCode] {
        match self {
            DependencyTool::ListBlockedBy | DependencyTool::ListBlocking => &[StatusCode::OK],
            DependencyTool::AddBlockedBy => &[StatusCode::OK, StatusCode::CREATED],
            DependencyTool::RemoveBlockedBy => &[StatusCode::OK, StatusCode::NO_CONTENT],
        }
    }

    fn texts(self) -> (TextKey, TextKey) {
        let i = match self {
            DependencyTool::ListBlockedBy => 0,
            DependencyTool::ListBlocking => 2,
            DependencyTool::AddBlockedBy => 4,
            DependencyTool::RemoveBlockedBy => 6,
        };
        (TEXTS[i], TEXTS[i + 1])
    }

    pub fn descriptor(self, t: &Translations) -> ToolDescriptor {
        let ((title_key, title), (desc_key, desc)) = self.texts();
        let input_schema = if self.is_read_only() {
            list_schema()
        } else {
            edge_schema()
        };
        ToolDescriptor {
            name: self.name().into(),
            description: t.t(desc_key, desc),
            input_schema,
            annotations: ToolAnnotations {
                title: t.t(title_key, title),
                read_only_hint: self.is_read_only(),
            },
        }
    }
}

type TextKey = (&'static str, &'static str);

// Ordered as (title, description) per tool in `DependencyTool::ALL` order.
pub const TEXTS: [TextKey; 8] = [
    (
        "TOOL_ISSUE_DEPENDENCIES_LIST_BLOCKED_BY_TITLE",
        "List blocking issues",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_LIST_BLOCKED_BY_DESCRIPTION",
        "List issues that a given issue is blocked by.",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_LIST_BLOCKING_TITLE",
        "List blocked issues",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_LIST_BLOCKING_DESCRIPTION",
        "List issues that a given issue is blocking.",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_ADD_BLOCKED_BY_TITLE",
        "Add blocking dependency",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_ADD_BLOCKED_BY_DESCRIPTION",
        "Add a blocked-by dependency to an issue.",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_REMOVE_BLOCKED_BY_TITLE",
        "Remove blocking dependency",
    ),
    (
        "TOOL_ISSUE_DEPENDENCIES_REMOVE_BLOCKED_BY_DESCRIPTION",
        "Remove a blocked-by dependency from an issue.",
    ),
];

fn list_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "owner": {"type": "string", "description": "Repository owner (username or organization)"},
            "repo": {"type": "string", "description": "Repository name"},
            "issue_number": {"type": "number", "description": "The number of the issue"},
            "page": {"type": "number", "minimum": 1, "description": "Page number for pagination (min 1)"},
            "per_page": {"type": "number", "minimum": 1, "maximum": 100, "description": "Results per page for pagination (min 1, max 100)"}
        },
        "required": ["owner", "repo", "issue_number"]
    })
}

fn edge_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "owner": {"type": "string", "description": "Repository owner (username or organization)"},
            "repo": {"type": "string", "description": "Repository name"},
            "issue_number": {"type": "number", "description": "The number of the issue that is blocked"},
            "blocked_by_owner": {"type": "string", "description": "Repository owner of the blocking issue (defaults to same owner)"},
            "blocked_by_repo": {"type": "string", "description": "Repository name of the blocking issue (defaults to same repo)"},
            "blocked_by_issue_number": {"type": "number", "description": "The number of the issue that is blocking"}
        },
        "required": ["owner", "repo", "issue_number", "blocked_by_issue_number"]
    })
}

/// Descriptors for `tools/list`. Read-only mode hides the mutation tools.
pub fn tool_descriptors(t: &Translations, read_only: bool) -> Vec<ToolDescriptor> {
    DependencyTool::ALL
        .into_iter()
        .filter(|tool| !read_only || tool.is_read_only())
        .map(|tool| tool.descriptor(t))
        .collect()
}
