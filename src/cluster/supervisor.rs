//! worker 进程管理
//!
//! 为每个端口派生一个子进程，子进程通过 `WORKER_PORT` 得知自己的端口。
//! 子进程退出后在同一端口上重新派生；旧进程内存中的数据随之丢失。
//!
//! 子进程的 stdin 是一根管道，写端由守护任务持有。主进程无论以何种方式退出，
//! 写端都会关闭，worker 读到 EOF 后自行退出。

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::pool::WorkerPool;
use crate::infrastructure::config::WORKER_PORT_ENV;

/// 派生失败或子进程过早退出后的重试间隔
const SPAWN_RETRY_DELAY: Duration = Duration::from_secs(1);

/// 存活时间短于此值的子进程视为启动失败（例如端口被占用）
const MIN_UPTIME: Duration = Duration::from_secs(1);

pub struct Supervisor {
    program: PathBuf,
    args: Vec<OsString>,
    pool: Arc<WorkerPool>,
    retry_delay: Duration,
    restarts: AtomicU64,
}

impl Supervisor {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>, pool: Arc<WorkerPool>) -> Self {
        Self {
            program: program.into(),
            args,
            pool,
            retry_delay: SPAWN_RETRY_DELAY,
            restarts: AtomicU64::new(0),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// 以当前可执行文件作为 worker 程序
    pub fn current_exe(pool: Arc<WorkerPool>) -> Result<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, Vec::new(), pool))
    }

    /// 累计重启次数
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }

    fn spawn_worker(&self, port: u16) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .env(WORKER_PORT_ENV, port.to_string())
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    /// 守护单个端口上的 worker，永不返回；任务被取消时子进程随之被杀掉
    pub async fn supervise(self: Arc<Self>, port: u16) {
        let mut first = true;

        loop {
            let mut child = match self.spawn_worker(port) {
                Ok(child) => child,
                Err(e) => {
                    error!("端口 {} 的 worker 派生失败: {}，{:?} 后重试", port, e, self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };

            if !first {
                self.restarts.fetch_add(1, Ordering::Relaxed);
            }
            first = false;

            // 管道写端存活到子进程退出为止
            let _lifeline = child.stdin.take();
            let started = Instant::now();
            let pid = child.id().unwrap_or_default();
            self.pool.insert(port);
            info!("Worker {} 已派生，端口 {}", pid, port);

            match child.wait().await {
                Ok(status) => warn!("Worker {} (端口 {}) 已退出: {}", pid, port, status),
                Err(e) => error!("等待 worker {} (端口 {}) 失败: {}", pid, port, e),
            }

            self.pool.remove(port);

            if started.elapsed() < MIN_UPTIME {
                warn!(
                    "Worker {} (端口 {}) 启动后很快退出，{:?} 后重试",
                    pid, port, self.retry_delay
                );
                tokio::time::sleep(self.retry_delay).await;
            }
            info!("在端口 {} 上重新派生 worker", port);
        }
    }

    /// 为每个端口启动一个守护任务
    pub fn start(self: &Arc<Self>, ports: &[u16]) -> Vec<JoinHandle<()>> {
        ports
            .iter()
            .map(|&port| tokio::spawn(Arc::clone(self).supervise(port)))
            .collect()
    }
}
