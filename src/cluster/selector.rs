//! worker 选择策略
//!
//! 代理只依赖 `TargetSelector`，替换策略不影响转发逻辑。

use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait TargetSelector: Send + Sync {
    /// 从存活端口中选一个；为空时返回 `None`
    fn choose(&self, ports: &[u16]) -> Option<u16>;
}

/// 均匀随机选择（默认策略）
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl TargetSelector for RandomSelector {
    fn choose(&self, ports: &[u16]) -> Option<u16> {
        ports.choose(&mut rand::thread_rng()).copied()
    }
}

/// 轮询选择
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TargetSelector for RoundRobinSelector {
    fn choose(&self, ports: &[u16]) -> Option<u16> {
        if ports.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % ports.len();
        Some(ports[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_stays_within_ports() {
        let ports = [4001, 4002, 4003];
        let selector = RandomSelector;
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let port = selector.choose(&ports).unwrap();
            assert!(ports.contains(&port));
            seen.insert(port);
        }
        // 500 次抽样应当覆盖全部端口
        assert_eq!(seen.len(), ports.len());
    }

    #[test]
    fn test_round_robin_cycles() {
        let ports = [4001, 4002, 4003];
        let selector = RoundRobinSelector::new();
        let picked: Vec<u16> = (0..6).filter_map(|_| selector.choose(&ports)).collect();
        assert_eq!(picked, vec![4001, 4002, 4003, 4001, 4002, 4003]);
    }

    #[test]
    fn test_empty_ports() {
        assert_eq!(RandomSelector.choose(&[]), None);
        assert_eq!(RoundRobinSelector::new().choose(&[]), None);
    }
}
