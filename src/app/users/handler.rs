//! 用户处理器
//!
//! 把 `UserService` 的结果转换成 HTTP 响应。路由匹配在 `app::router` 中完成，
//! 这里拿到的 id 是路径中的原样片段，合法性由 service 校验。

use axum::{http::StatusCode, response::Json};
use tracing::debug;

use super::{model::User, service::UserService};
use crate::core::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
}

impl AppState {
    pub fn new(user_service: UserService) -> Self {
        Self { user_service }
    }
}

pub fn list_users(state: &AppState) -> Json<Vec<User>> {
    Json(state.user_service.list_users())
}

pub fn get_user(state: &AppState, id: &str) -> Result<Json<User>, ApiError> {
    let user = state.user_service.get_user(id)?;
    Ok(Json(user))
}

pub fn create_user(state: &AppState, body: &[u8]) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.create_user(body)?;
    debug!("创建用户 {} (pid {})", user.id, std::process::id());
    Ok((StatusCode::CREATED, Json(user)))
}

pub fn update_user(state: &AppState, id: &str, body: &[u8]) -> Result<Json<User>, ApiError> {
    let user = state.user_service.update_user(id, body)?;
    debug!("更新用户 {}", user.id);
    Ok(Json(user))
}

pub fn delete_user(state: &AppState, id: &str) -> Result<StatusCode, ApiError> {
    state.user_service.delete_user(id)?;
    debug!("删除用户 {}", id);
    Ok(StatusCode::NO_CONTENT)
}
