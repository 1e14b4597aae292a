//! 多进程分发层：主进程派生 worker，并把请求随机转发给其中之一。
//!
//! 每个 worker 拥有独立的存储，分发时不做任何亲和，因此在一个 worker 上
//! 创建的用户在另一个 worker 上查不到。这是现有分发方式的已知缺陷，
//! 修复需要共享存储或按 key 亲和路由。

pub mod pool;
pub mod primary;
pub mod proxy;
pub mod selector;
pub mod supervisor;

pub use pool::WorkerPool;
pub use proxy::{proxy_app, ProxyError, ProxyState};
pub use selector::{RandomSelector, RoundRobinSelector, TargetSelector};
pub use supervisor::Supervisor;

/// 进程角色，启动时确定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// 派生 worker 并运行代理
    Primary,
    /// 被主进程派生，在指定端口上运行 worker
    Worker { port: u16 },
    /// 不派生子进程，直接在基础端口上运行一个 worker
    Single { port: u16 },
}

impl Role {
    pub fn select(worker_port: Option<u16>, single: bool, base_port: u16) -> Self {
        match worker_port {
            Some(port) => Role::Worker { port },
            None if single => Role::Single { port: base_port },
            None => Role::Primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_selection() {
        assert_eq!(Role::select(Some(4003), false, 4000), Role::Worker { port: 4003 });
        assert_eq!(Role::select(Some(4003), true, 4000), Role::Worker { port: 4003 });
        assert_eq!(Role::select(None, true, 4000), Role::Single { port: 4000 });
        assert_eq!(Role::select(None, false, 4000), Role::Primary);
    }
}
