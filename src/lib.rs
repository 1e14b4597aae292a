//! # 多进程用户服务
//!
//! 主进程派生若干 worker 进程，每个 worker 在独立端口上提供 `/api/users`
//! 的增删改查，数据只保存在各自进程的内存中；主进程在基础端口上运行一个
//! 反向代理，把每个请求随机转发给某个 worker。
//!
//! - `app`：路由、用户模型、存储与处理器
//! - `worker`：worker 监听器
//! - `cluster`：主进程、进程守护、worker 选择与反向代理
//! - `infrastructure`：配置与日志

pub mod app;
pub mod cluster;
pub mod core;
pub mod infrastructure;
pub mod worker;

pub use crate::core::error::ApiError;
pub use app::users::{User, UserPayload, UserService, UserStore};
pub use cluster::Role;
pub use infrastructure::config::{Config, ConfigError};
