//! 用户数据模型

use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::{Uuid, Variant};

use crate::core::error::ApiError;

/// 用户记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub age: Number,
    pub hobbies: Vec<String>,
}

/// 创建 / 更新用户请求，两者共用同一套字段（整体替换，不支持部分更新）
///
/// `age` 接受任意 JSON 数字，原样保存和回显
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub username: String,
    pub age: Number,
    pub hobbies: Vec<String>,
}

impl UserPayload {
    /// 解析请求体
    ///
    /// 先按 JSON 解析（失败即 `MalformedBody`），再校验字段形状
    /// （失败即 `InvalidPayload`），这样两类错误可以区分。
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|_| ApiError::MalformedBody)?;

        let payload: UserPayload =
            serde_json::from_value(value).map_err(|_| ApiError::InvalidPayload)?;

        if payload.username.is_empty() {
            return Err(ApiError::InvalidPayload);
        }

        Ok(payload)
    }

    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            username: self.username,
            age: self.age,
            hobbies: self.hobbies,
        }
    }
}

/// 校验并解析路径中的用户 id
///
/// 只接受带连字符的 36 位标准格式；版本号须为 1-8 且 variant 为 RFC 4122，
/// nil 与 max 两个特殊值除外。
pub fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    if raw.len() != 36 {
        return Err(ApiError::InvalidIdentifier);
    }

    let id = Uuid::try_parse(raw).map_err(|_| ApiError::InvalidIdentifier)?;

    if id.is_nil() || id == Uuid::from_u128(u128::MAX) {
        return Ok(id);
    }

    let version_ok = (1..=8).contains(&id.get_version_num());
    if !version_ok || id.get_variant() != Variant::RFC4122 {
        return Err(ApiError::InvalidIdentifier);
    }

    Ok(id)
}
