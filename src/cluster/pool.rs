//! 存活 worker 端口集合
//!
//! 子进程启动后加入，退出后移除，代理只从这里挑选目标。

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct WorkerPool {
    ports: RwLock<BTreeSet<u16>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports<I: IntoIterator<Item = u16>>(ports: I) -> Self {
        Self {
            ports: RwLock::new(ports.into_iter().collect()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<u16>> {
        self.ports.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<u16>> {
        self.ports.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, port: u16) {
        self.write().insert(port);
    }

    pub fn remove(&self, port: u16) {
        self.write().remove(&port);
    }

    /// 按端口升序返回当前存活的端口
    pub fn snapshot(&self) -> Vec<u16> {
        self.read().iter().copied().collect()
    }
}
