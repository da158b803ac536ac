use crate::config::Config;
use crate::error::TransportError;
use crate::types::RateMeta;
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

/// A REST call relative to the configured API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

/// A fully read response. The body has been consumed, so the connection is
/// already back in the pool by the time this value exists.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Sends one request and returns the complete response.
///
/// Implementations must stop work and return [`TransportError::Cancelled`]
/// once `cancel` fires.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: RestRequest,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

pub fn build_client(cfg: &Config) -> Result<Client, TransportError> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_str(&cfg.user_agent)?);
    // Authorization header is injected per request to allow token rotation later.
    let client = Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

fn auth_header(token: &str) -> Result<HeaderValue, TransportError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Percent-encode a value for use as a single URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

pub fn map_status_to_error(status: StatusCode, message: String) -> ErrorInfo {
    let (code, retriable) = match status {
        StatusCode::BAD_REQUEST => ("bad_request", false),
        StatusCode::UNAUTHORIZED => ("unauthorized", false),
        StatusCode::FORBIDDEN => ("forbidden", false),
        StatusCode::NOT_FOUND => ("not_found", false),
        StatusCode::CONFLICT => ("conflict", false),
        StatusCode::UNPROCESSABLE_ENTITY => ("unprocessable", false),
        StatusCode::TOO_MANY_REQUESTS => ("rate_limited", true),
        s if s.is_server_error() => ("upstream_error", true),
        _ => ("server_error", false),
    };
    ErrorInfo {
        code: code.to_string(),
        message,
        retriable,
    }
}

pub fn extract_rate_from_rest(headers: &HeaderMap) -> RateMeta {
    let header_num = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<i64>().ok())
    };
    RateMeta {
        remaining: header_num("x-ratelimit-remaining").map(|v| v as i32),
        used: header_num("x-ratelimit-used").map(|v| v as i32),
        reset_at: header_num("x-ratelimit-reset")
            .and_then(|epoch| chrono::DateTime::<chrono::Utc>::from_timestamp(epoch, 0))
            .map(|dt| dt.to_rfc3339()),
    }
}

/// Authenticated GitHub REST client.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    cfg: Config,
}

impl RestClient {
    pub fn new(cfg: Config) -> Result<Self, TransportError> {
        let client = build_client(&cfg)?;
        Ok(Self { client, cfg })
    }

    async fn exchange(&self, request: RestRequest) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.cfg.api_url, request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, auth_header(&self.cfg.token)?)
            .header("X-GitHub-Api-Version", &self.cfg.api_version)
            .header(
                ACCEPT,
                HeaderValue::from_static("application/vnd.github+json"),
            );
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(|e| {
            warn!("REST {} {} error sending request: {}", request.method, url, e);
            TransportError::Request(e)
        })?;
        let status = res.status();
        let headers = res.headers().clone();
        // Reading to the end releases the connection on every status.
        let body = res.text().await?;
        debug!("REST {} {} -> {}", request.method, url, status);
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for RestClient {
    async fn send(
        &self,
        request: RestRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            res = self.exchange(request) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::DELETE, Method::GET, MockServer};

    fn test_config(base: &str) -> Config {
        Config {
            token: "t".into(),
            api_url: base.trim_end_matches('/').to_string(),
            api_version: "2022-11-28".into(),
            user_agent: "github-deps-mcp/test".into(),
            timeout_secs: 5,
            read_only: false,
            include_rate: false,
        }
    }

    #[test]
    fn error_mapping_matrix() {
        assert_eq!(
            map_status_to_error(StatusCode::BAD_REQUEST, "".into()).code,
            "bad_request"
        );
        assert_eq!(
            map_status_to_error(StatusCode::UNAUTHORIZED, "".into()).code,
            "unauthorized"
        );
        assert_eq!(
            map_status_to_error(StatusCode::FORBIDDEN, "".into()).code,
            "forbidden"
        );
        assert_eq!(
            map_status_to_error(StatusCode::NOT_FOUND, "".into()).code,
            "not_found"
        );
        assert_eq!(
            map_status_to_error(StatusCode::UNPROCESSABLE_ENTITY, "".into()).code,
            "unprocessable"
        );
        let rl = map_status_to_error(StatusCode::TOO_MANY_REQUESTS, "".into());
        assert_eq!(rl.code, "rate_limited");
        assert!(rl.retriable);
        let s5 = map_status_to_error(StatusCode::BAD_GATEWAY, "".into());
        assert_eq!(s5.code, "upstream_error");
        assert!(s5.retriable);
    }

    #[test]
    fn path_segments_are_escaped() {
        assert_eq!(encode_path_segment("octo-org"), "octo-org");
        assert_eq!(encode_path_segment("a b/c"), "a%20b%2Fc");
    }

    #[tokio::test]
    async fn sends_headers_and_reads_body() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/o/r/issues/1/dependencies/blocking")
                    .header("authorization", "Bearer t")
                    .header("x-github-api-version", "2022-11-28")
                    .header("accept", "application/vnd.github+json");
                then.status(200)
                    .header("x-ratelimit-remaining", "10")
                    .body("{\"dependencies\":[]}");
            })
            .await;
        let client = RestClient::new(test_config(&server.base_url())).unwrap();
        let res = client
            .send(
                RestRequest {
                    method: Method::GET,
                    path: "/repos/o/r/issues/1/dependencies/blocking".into(),
                    body: None,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        m.assert_async().await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, "{\"dependencies\":[]}");
        assert_eq!(extract_rate_from_rest(&res.headers).remaining, Some(10));
    }

    #[tokio::test]
    async fn delete_carries_json_body() {
        let server = MockServer::start_async().await;
        let m = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/repos/o/r/issues/2/dependencies/blocked_by")
                    .json_body(serde_json::json!({"owner":"o","repo":"r","issue_number":3}));
                then.status(204);
            })
            .await;
        let client = RestClient::new(test_config(&server.base_url())).unwrap();
        let res = client
            .send(
                RestRequest {
                    method: Method::DELETE,
                    path: "/repos/o/r/issues/2/dependencies/blocked_by".into(),
                    body: Some(serde_json::json!({"owner":"o","repo":"r","issue_number":3})),
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        m.assert_async().await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert!(res.body.is_empty());
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_sending() {
        let client = RestClient::new(test_config("http://127.0.0.1:9")).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = client
            .send(
                RestRequest {
                    method: Method::GET,
                    path: "/".into(),
                    body: None,
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_aborts_request_in_flight() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200)
                    .delay(Duration::from_secs(5))
                    .body("{\"dependencies\":[]}");
            })
            .await;
        let client = RestClient::new(test_config(&server.base_url())).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let started = std::time::Instant::now();
        let err = client
            .send(
                RestRequest {
                    method: Method::GET,
                    path: "/slow".into(),
                    body: None,
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn connection_failure_is_a_request_error() {
        // Port 9 (discard) is not expected to accept HTTP connections.
        let client = RestClient::new(test_config("http://127.0.0.1:9")).unwrap();
        let err = client
            .send(
                RestRequest {
                    method: Method::GET,
                    path: "/".into(),
                    body: None,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)));
    }
}
