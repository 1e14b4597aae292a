//! 反向代理
//!
//! 每个入站请求随机（或按注入的策略）选一个存活 worker，原样转发
//! method、路径、请求头和请求体，再把上游的状态码、响应头和响应体原样返回。
//! 不做超时、重试或会话亲和：同一个客户端的前后请求可能落到不同 worker 上。

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use super::pool::WorkerPool;
use super::selector::TargetSelector;

/// 逐跳头部不原样转发，由 HTTP 客户端/服务端重新生成；`Host` 保持客户端原值
const HOP_BY_HOP: [&str; 5] = [
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("没有可用的 worker")]
    NoWorkers,
    #[error("读取请求体失败: {0}")]
    Body(#[from] axum::Error),
    #[error("转发到端口 {port} 失败: {source}")]
    Upstream {
        port: u16,
        #[source]
        source: reqwest::Error,
    },
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error!("Proxy error: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, "Proxy error").into_response()
    }
}

#[derive(Clone)]
pub struct ProxyState {
    pool: Arc<WorkerPool>,
    selector: Arc<dyn TargetSelector>,
    client: reqwest::Client,
    upstream_host: String,
}

impl ProxyState {
    pub fn new(
        pool: Arc<WorkerPool>,
        selector: Arc<dyn TargetSelector>,
        upstream_host: impl Into<String>,
    ) -> anyhow::Result<Self> {
        // 不读取系统代理环境变量，只转发到本机 worker
        let client = reqwest::Client::builder().no_proxy().build()?;

        Ok(Self {
            pool,
            selector,
            client,
            upstream_host: upstream_host.into(),
        })
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

async fn forward_request(state: &ProxyState, req: Request) -> Result<Response, ProxyError> {
    let ports = state.pool.snapshot();
    let port = state.selector.choose(&ports).ok_or(ProxyError::NoWorkers)?;

    let (parts, body) = req.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("http://{}:{}{}", state.upstream_host, port, path);
    debug!("{} {} -> worker {}", parts.method, path, port);

    let body: Bytes = axum::body::to_bytes(body, usize::MAX).await?;

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);

    let upstream = state
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|source| ProxyError::Upstream { port, source })?;

    let status = upstream.status();
    let mut response_headers = upstream.headers().clone();
    strip_hop_by_hop(&mut response_headers);

    let bytes = upstream
        .bytes()
        .await
        .map_err(|source| ProxyError::Upstream { port, source })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

async fn forward(State(state): State<ProxyState>, req: Request) -> Response {
    match forward_request(&state, req).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// 构建代理应用：所有路径、所有方法都走转发
pub fn proxy_app(state: ProxyState) -> Router {
    Router::new()
        .fallback(forward)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_hop_by_hop_keeps_host() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("users.example:4000"));
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("upgrade", HeaderValue::from_static("websocket"));
        headers.insert("content-length", HeaderValue::from_static("12"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 3);
        assert_eq!(headers["host"], "users.example:4000");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["x-request-id"], "abc");
    }
}
