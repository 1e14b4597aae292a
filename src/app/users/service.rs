//! 用户业务服务
//!
//! 纯请求/响应逻辑，存储通过构造函数注入。请求体在调用前已经完整读取，
//! 因此"校验前置条件 -> 修改存储"之间没有挂起点。

use std::sync::Arc;

use uuid::Uuid;

use super::model::{parse_user_id, User, UserPayload};
use super::store::UserStore;
use crate::core::error::ApiError;

#[derive(Clone)]
pub struct UserService {
    store: Arc<UserStore>,
}

impl UserService {
    pub fn new(store: Arc<UserStore>) -> Self {
        Self { store }
    }

    pub fn list_users(&self) -> Vec<User> {
        self.store.list()
    }

    pub fn get_user(&self, raw_id: &str) -> Result<User, ApiError> {
        let id = parse_user_id(raw_id)?;
        self.store.get(&id).ok_or(ApiError::NotFound)
    }

    pub fn create_user(&self, body: &[u8]) -> Result<User, ApiError> {
        let payload = UserPayload::from_body(body)?;

        let user = payload.into_user(Uuid::new_v4());
        self.store.put(user.id, user.clone());

        Ok(user)
    }

    /// 整体替换：id 不变，其余字段全部取自新的请求体
    pub fn update_user(&self, raw_id: &str, body: &[u8]) -> Result<User, ApiError> {
        let id = parse_user_id(raw_id)?;
        if !self.store.contains(&id) {
            return Err(ApiError::NotFound);
        }

        let user = UserPayload::from_body(body)?.into_user(id);
        self.store.put(id, user.clone());

        Ok(user)
    }

    pub fn delete_user(&self, raw_id: &str) -> Result<(), ApiError> {
        let id = parse_user_id(raw_id)?;
        if !self.store.delete(&id) {
            return Err(ApiError::NotFound);
        }
        Ok(())
    }
}
