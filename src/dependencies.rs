//! Issue dependency tools: validate arguments, build the REST call, send it,
//! and translate the response into a tool result.

use crate::error::{ParamError, ToolError, TransportError};
use crate::http::{
    encode_path_segment, extract_rate_from_rest, map_status_to_error, ErrorInfo, RawResponse,
    RestRequest, Transport,
};
use crate::mcp::CallToolResult;
use crate::params::{self, Args, Pagination};
use crate::tools::DependencyTool;
use crate::types::{DependenciesResponse, DependencyRequest};
use log::{debug, info, warn};
use reqwest::Method;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    BlockedBy,
    Blocking,
}

impl DependencyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DependencyKind::BlockedBy => "blocked_by",
            DependencyKind::Blocking => "blocking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDependenciesInput {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub pagination: Pagination,
}

impl ListDependenciesInput {
    pub fn from_args(args: &Args) -> Result<Self, ParamError> {
        Ok(Self {
            owner: params::required_str(args, "owner")?,
            repo: params::required_str(args, "repo")?,
            issue_number: params::required_int(args, "issue_number")?,
            pagination: params::optional_pagination(args)?,
        })
    }
}

/// Arguments of add/remove. The blocking issue lives in `blocked_by_owner`/`blocked_by_repo`,
/// which fall back to the blocked issue's repository when omitted or empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdgeInput {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub blocked_by_owner: String,
    pub blocked_by_repo: String,
    pub blocked_by_issue_number: u64,
}

impl DependencyEdgeInput {
    pub fn from_args(args: &Args) -> Result<Self, ParamError> {
        let owner = params::required_str(args, "owner")?;
        let repo = params::required_str(args, "repo")?;
        let issue_number = params::required_int(args, "issue_number")?;
        let blocked_by_issue_number = params::required_int(args, "blocked_by_issue_number")?;
        let mut blocked_by_owner = params::optional_str(args, "blocked_by_owner")?;
        let mut blocked_by_repo = params::optional_str(args, "blocked_by_repo")?;

        // Defaults apply after validation so "" behaves like omission.
        if blocked_by_owner.is_empty() {
            blocked_by_owner = owner.clone();
        }
        if blocked_by_repo.is_empty() {
            blocked_by_repo = repo.clone();
        }

        Ok(Self {
            owner,
            repo,
            issue_number,
            blocked_by_owner,
            blocked_by_repo,
            blocked_by_issue_number,
        })
    }

    pub fn payload(&self) -> DependencyRequest {
        DependencyRequest {
            owner: self.blocked_by_owner.clone(),
            repo: self.blocked_by_repo.clone(),
            issue_number: self.blocked_by_issue_number,
        }
    }
}

/// A validated call, ready to be turned into a REST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List(DependencyKind, ListDependenciesInput),
    Add(DependencyEdgeInput),
    Remove(DependencyEdgeInput),
}

fn dependencies_path(owner: &str, repo: &str, issue_number: u64, kind: DependencyKind) -> String {
    format!(
        "/repos/{}/{}/issues/{}/dependencies/{}",
        encode_path_segment(owner),
        encode_path_segment(repo),
        issue_number,
        kind.as_str()
    )
}

impl Operation {
    pub fn parse(tool: DependencyTool, args: &Args) -> Result<Self, ParamError> {
        Ok(match tool {
            DependencyTool::ListBlockedBy => {
                Operation::List(DependencyKind::BlockedBy, ListDependenciesInput::from_args(args)?)
            }
            DependencyTool::ListBlocking => {
                Operation::List(DependencyKind::Blocking, ListDependenciesInput::from_args(args)?)
            }
            DependencyTool::AddBlockedBy => Operation::Add(DependencyEdgeInput::from_args(args)?),
            DependencyTool::RemoveBlockedBy => {
                Operation::Remove(DependencyEdgeInput::from_args(args)?)
            }
        })
    }

    pub fn to_request(&self) -> Result<RestRequest, serde_json::Error> {
        match self {
            Operation::List(kind, input) => {
                let mut path =
                    dependencies_path(&input.owner, &input.repo, input.issue_number, *kind);
                if input.pagination.is_requested() {
                    path.push_str(&format!(
                        "?page={}&per_page={}",
                        input.pagination.page, input.pagination.per_page
                    ));
                }
                Ok(RestRequest {
                    method: Method::GET,
                    path,
                    body: None,
                })
            }
            Operation::Add(input) | Operation::Remove(input) => {
                let method = if matches!(self, Operation::Add(_)) {
                    Method::POST
                } else {
                    Method::DELETE
                };
                Ok(RestRequest {
                    method,
                    path: dependencies_path(
                        &input.owner,
                        &input.repo,
                        input.issue_number,
                        DependencyKind::BlockedBy,
                    ),
                    body: Some(serde_json::to_value(input.payload())?),
                })
            }
        }
    }

    fn target(&self) -> String {
        let (owner, repo, n) = match self {
            Operation::List(_, i) => (&i.owner, &i.repo, i.issue_number),
            Operation::Add(i) | Operation::Remove(i) => (&i.owner, &i.repo, i.issue_number),
        };
        format!("{}/{}#{}", owner, repo, n)
    }

    fn transport_failure(&self) -> String {
        match self {
            Operation::List(kind, _) => format!("failed to list {} dependencies", kind.as_str()),
            Operation::Add(_) => "failed to add blocked_by dependency".into(),
            Operation::Remove(_) => "failed to remove blocked_by dependency".into(),
        }
    }

    fn status_failure(&self) -> &'static str {
        match self {
            Operation::List(..) => "failed to list dependencies",
            Operation::Add(_) => "failed to add dependency",
            Operation::Remove(_) => "failed to remove dependency",
        }
    }
}

/// Runs dependency tools against a [`Transport`].
pub struct DependencyService<T> {
    transport: T,
    read_only: bool,
    include_rate: bool,
}

impl<T: Transport> DependencyService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            read_only: false,
            include_rate: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn include_rate(mut self, include_rate: bool) -> Self {
        self.include_rate = include_rate;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute one tool call.
    ///
    /// Caller-input and remote failures come back as an error-flagged
    /// [`CallToolResult`]. `Err` is reserved for local faults, cancellation,
    /// and mutation attempts in read-only mode.
    pub async fn call(
        &self,
        tool: DependencyTool,
        arguments: &Value,
        cancel: &CancellationToken,
    ) -> Result<CallToolResult, ToolError> {
        if self.read_only && !tool.is_read_only() {
            return Err(ToolError::ReadOnly(tool.name()));
        }

        let op = match params::as_args(arguments).and_then(|args| Operation::parse(tool, &args)) {
            Ok(op) => op,
            Err(e) => {
                debug!("{}: invalid arguments: {}", tool.name(), e);
                return Ok(CallToolResult::invalid_params(&e));
            }
        };
        let request = op.to_request()?;
        debug!("{}: {} {}", tool.name(), request.method, request.path);

        let response = match self.transport.send(request, cancel).await {
            Ok(r) => r,
            Err(TransportError::Cancelled) => return Err(ToolError::Cancelled),
            Err(e) => {
                warn!("{}: transport failure for {}: {}", tool.name(), op.target(), e);
                let message = format!("{}: {}", op.transport_failure(), e);
                return Ok(CallToolResult::error(
                    message.clone(),
                    ErrorInfo {
                        code: "upstream_error".into(),
                        message,
                        retriable: true,
                    },
                ));
            }
        };

        let result = self.translate(tool, &op, response)?;
        if !result.is_error && !tool.is_read_only() {
            info!("{}: {} ok", tool.name(), op.target());
        }
        Ok(result)
    }

    fn translate(
        &self,
        tool: DependencyTool,
        op: &Operation,
        response: RawResponse,
    ) -> Result<CallToolResult, ToolError> {
        let RawResponse {
            status,
            headers,
            body,
        } = response;

        if !tool.accepted_statuses().contains(&status) {
            warn!("{}: {} answered {}", tool.name(), op.target(), status);
            let message = format!("{}: {}", op.status_failure(), single_line(&body));
            return Ok(CallToolResult::error(
                message,
                map_status_to_error(status, body),
            ));
        }

        let decoded = match op {
            Operation::List(..) => decode_dependencies(&body),
            Operation::Add(_) | Operation::Remove(_) => decode_object(&body),
        };
        let result = match decoded {
            Ok((text, structured)) => CallToolResult::success(text, structured),
            Err(DecodeError::Body(e)) => {
                let message = format!("{}: invalid response body: {}", op.status_failure(), e);
                return Ok(CallToolResult::error(
                    message.clone(),
                    ErrorInfo {
                        code: "server_error".into(),
                        message,
                        retriable: false,
                    },
                ));
            }
            Err(DecodeError::Marshal(e)) => return Err(ToolError::Marshal(e)),
        };

        if self.include_rate {
            Ok(result.with_rate(extract_rate_from_rest(&headers)))
        } else {
            Ok(result)
        }
    }
}

enum DecodeError {
    // The remote body did not match the expected shape.
    Body(serde_json::Error),
    // Re-encoding failed locally.
    Marshal(serde_json::Error),
}

fn decode_dependencies(body: &str) -> Result<(String, Value), DecodeError> {
    let deps: DependenciesResponse = serde_json::from_str(body).map_err(DecodeError::Body)?;
    let text = serde_json::to_string(&deps.dependencies).map_err(DecodeError::Marshal)?;
    let items = serde_json::to_value(&deps.dependencies).map_err(DecodeError::Marshal)?;
    Ok((text, serde_json::json!({ "items": items })))
}

// Empty bodies (204) decode to `null`.
fn decode_object(body: &str) -> Result<(String, Value), DecodeError> {
    let obj: Option<Map<String, Value>> = if body.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(body).map_err(DecodeError::Body)?)
    };
    let text = serde_json::to_string(&obj).map_err(DecodeError::Marshal)?;
    let item = obj.map(Value::Object).unwrap_or(Value::Null);
    Ok((text, serde_json::json!({ "item": item })))
}

/// Collapse a response body onto one line for the result text. The structured
/// error keeps the body verbatim.
fn single_line(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
