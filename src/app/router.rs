//! 路由
//!
//! `resolve` 是无状态的纯函数：给定 method 和 path，返回匹配的路由或 `None`。
//! `build_app` 把它挂到 axum 的 fallback 上，并套上日志、追踪和 panic 兜底。
//! 请求体不设大小上限。

use std::any::Any;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{Method, Uri},
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use super::users::{handler, AppState};
use crate::core::{error::ApiError, middleware::request_logging_middleware};

const USERS_PATH: &str = "/api/users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    List,
    Create,
    Get(String),
    Update(String),
    Delete(String),
}

/// 匹配规则（按优先级）：
/// `GET /api/users`、`POST /api/users`，
/// 以及 `/api/users/<token>` 上的 GET / PUT / DELETE，
/// 其中 token 由一个或多个字母、数字或连字符组成，原样传给 handler。
pub fn resolve(method: &Method, path: &str) -> Option<Route> {
    if path == USERS_PATH {
        return match *method {
            Method::GET => Some(Route::List),
            Method::POST => Some(Route::Create),
            _ => None,
        };
    }

    let token = path.strip_prefix(USERS_PATH)?.strip_prefix('/')?;
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return None;
    }

    let id = token.to_string();
    match *method {
        Method::GET => Some(Route::Get(id)),
        Method::PUT => Some(Route::Update(id)),
        Method::DELETE => Some(Route::Delete(id)),
        _ => None,
    }
}

/// 所有请求的统一入口：请求体先完整读取，再进入 handler
async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri, body: Bytes) -> Response {
    match resolve(&method, uri.path()) {
        Some(Route::List) => handler::list_users(&state).into_response(),
        Some(Route::Create) => handler::create_user(&state, &body).into_response(),
        Some(Route::Get(id)) => handler::get_user(&state, &id).into_response(),
        Some(Route::Update(id)) => handler::update_user(&state, &id, &body).into_response(),
        Some(Route::Delete(id)) => handler::delete_user(&state, &id).into_response(),
        None => {
            let path = uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.path().to_string());
            ApiError::RouteNotFound {
                method: method.to_string(),
                path,
            }
            .into_response()
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!("请求处理发生 panic: {}", detail);
    ApiError::Internal(detail).into_response()
}

/// 构建 worker 的 HTTP 应用
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}
