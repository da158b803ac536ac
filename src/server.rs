use crate::config::Config;
use crate::dependencies::DependencyService;
use crate::error::ToolError;
use crate::http::RestClient;
use crate::tools::{tool_descriptors, DependencyTool, PROTOCOL_VERSION};
use crate::translations::Translations;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
}

#[derive(Debug, Deserialize)]
struct Request {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;
const REQUEST_CANCELLED: i64 = -32800;

fn rpc_error(id: Option<Id>, code: i64, message: &str) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

/// How a message arrived; replies are written back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Line,
    ContentLength,
}

#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Forces read-only mode on top of `GITHUB_READ_ONLY`.
    pub read_only: bool,
}

pub struct Server {
    translations: Translations,
    read_only: bool,
    // Tool calls need a token; initialize and tools/list do not.
    service: Result<DependencyService<RestClient>, String>,
}

impl Server {
    pub fn from_env(options: &ServerOptions) -> Self {
        let translations = Translations::from_env();
        match Config::from_env() {
            Ok(cfg) => Self::new(cfg, translations, options),
            Err(e) => {
                warn!("GitHub client unavailable: {}", e);
                Self {
                    translations,
                    read_only: options.read_only || read_only_from_env(),
                    service: Err(e.to_string()),
                }
            }
        }
    }

    pub fn new(cfg: Config, translations: Translations, options: &ServerOptions) -> Self {
        let read_only = options.read_only || cfg.read_only;
        let include_rate = cfg.include_rate;
        let service = RestClient::new(cfg)
            .map(|client| {
                DependencyService::new(client)
                    .read_only(read_only)
                    .include_rate(include_rate)
            })
            .map_err(|e| e.to_string());
        Self {
            translations,
            read_only,
            service,
        }
    }

    async fn dispatch(&self, req: Request, cancel: &CancellationToken) -> Response {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id),
            "ping" => rpc_ok(req.id, serde_json::json!({})),
            "tools/list" => self.handle_tools_list(req.id),
            "tools/call" => self.handle_tools_call(req.id, req.params, cancel).await,
            other => rpc_error(req.id, METHOD_NOT_FOUND, &format!("Method not found: {}", other)),
        }
    }

    fn handle_initialize(&self, id: Option<Id>) -> Response {
        rpc_ok(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "github-deps-mcp",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Id>) -> Response {
        let tools = tool_descriptors(&self.translations, self.read_only);
        rpc_ok(id, serde_json::json!({ "tools": tools }))
    }

    async fn handle_tools_call(
        &self,
        id: Option<Id>,
        params: Value,
        cancel: &CancellationToken,
    ) -> Response {
        let Ok(call) = serde_json::from_value::<ToolCallParams>(params) else {
            return rpc_error(id, INVALID_PARAMS, "Invalid params");
        };
        let Some(tool) = DependencyTool::from_name(&call.name) else {
            return rpc_error(id, METHOD_NOT_FOUND, &format!("Tool not found: {}", call.name));
        };
        let service = match &self.service {
            Ok(s) => s,
            Err(e) => return rpc_error(id, INTERNAL_ERROR, e),
        };
        debug!("tools/call {}", tool.name());
        match service.call(tool, &call.arguments, cancel).await {
            Ok(result) => rpc_ok(id, result.into_value()),
            Err(ToolError::ReadOnly(name)) => {
                rpc_error(id, METHOD_NOT_FOUND, &format!("Tool not found: {}", name))
            }
            Err(ToolError::Cancelled) => rpc_error(id, REQUEST_CANCELLED, "Request cancelled"),
            Err(e) => rpc_error(id, INTERNAL_ERROR, &e.to_string()),
        }
    }
}

fn read_only_from_env() -> bool {
    std::env::var("GITHUB_READ_ONLY").is_ok_and(|v| crate::config::env_flag(&v))
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub async fn run_stdio_server(options: ServerOptions, shutdown: CancellationToken) -> anyhow::Result<()> {
    info!("Starting github-deps-mcp stdio server; protocol={}", PROTOCOL_VERSION);
    let server = Server::from_env(&options);
    serve(&server, io::stdin(), io::stdout(), shutdown).await
}

/// Process messages from `input` until EOF or shutdown.
pub async fn serve<R, W>(
    server: &Server,
    input: R,
    mut output: W,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(input);
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested; stopping stdio server");
                return Ok(());
            }
            msg = read_message(&mut reader) => msg?,
        };
        let Some((framing, payload)) = next else {
            debug!("stdin closed");
            return Ok(());
        };

        let parsed = payload.and_then(|text| {
            serde_json::from_str::<Request>(&text).map_err(|e| e.to_string())
        });
        let req = match parsed {
            Ok(r) => r,
            Err(e) => {
                warn!("Discarding malformed message: {}", e);
                let resp = rpc_error(None, PARSE_ERROR, &format!("Parse error: {}", e));
                write_response(&mut output, &resp, framing).await?;
                continue;
            }
        };
        debug!("Received method={}", req.method);
        if req.id.is_none() {
            // Notifications never get a reply.
            continue;
        }
        let cancel = shutdown.child_token();
        let resp = server.dispatch(req, &cancel).await;
        write_response(&mut output, &resp, framing).await?;
    }
}

/// Upper bound on a single `Content-Length` framed body.
const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

/// One framed message. The payload is `Err` when the frame was read but its
/// content cannot be decoded; the stream stays usable after it.
type Incoming = (Framing, Result<String, String>);

async fn read_message<R>(reader: &mut BufReader<R>) -> anyhow::Result<Option<Incoming>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(None);
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(text) => text.trim(),
            Err(e) => return Ok(Some((Framing::Line, Err(format!("invalid UTF-8: {}", e))))),
        };
        if line.is_empty() {
            continue;
        }
        let Some(len) = content_length(line) else {
            return Ok(Some((Framing::Line, Ok(line.to_string()))));
        };
        // Skip any remaining headers up to the blank separator line.
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                return Ok(None);
            }
            if buf.trim_ascii().is_empty() {
                break;
            }
        }
        let len = match len {
            Ok(len) => len,
            Err(e) => return Ok(Some((Framing::ContentLength, Err(e)))),
        };
        if len > MAX_MESSAGE_BYTES {
            tokio::io::copy(&mut (&mut *reader).take(len as u64), &mut tokio::io::sink()).await?;
            let reason = format!("message of {} bytes exceeds limit of {}", len, MAX_MESSAGE_BYTES);
            return Ok(Some((Framing::ContentLength, Err(reason))));
        }
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await?;
        let payload = String::from_utf8(body).map_err(|e| format!("invalid UTF-8: {}", e));
        return Ok(Some((Framing::ContentLength, payload)));
    }
}

fn content_length(header: &str) -> Option<Result<usize, String>> {
    let (name, value) = header.split_once(':')?;
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return None;
    }
    Some(
        value
            .trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid Content-Length {:?}: {}", value.trim(), e)),
    )
}

async fn write_response<W>(out: &mut W, resp: &Response, framing: Framing) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_string(resp)?;
    match framing {
        Framing::Line => {
            out.write_all(payload.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            out.write_all(header.as_bytes()).await?;
            out.write_all(payload.as_bytes()).await?;
        }
    }
    out.flush().await?;
    Ok(())
}
