//! 主进程
//!
//! 派生 N 个 worker（端口 base+1 ..= base+N），在 base 端口上运行反向代理，
//! 收到 Ctrl+C 或 SIGTERM 后停止代理并杀掉所有子进程。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use super::pool::WorkerPool;
use super::proxy::{proxy_app, ProxyState};
use super::selector::{RandomSelector, TargetSelector};
use super::supervisor::Supervisor;
use crate::infrastructure::config::Config;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("监听 Ctrl+C 失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("收到停止信号，正在关闭主进程...");
}

/// 运行主进程，使用默认的随机选择策略
pub async fn run(config: &Config) -> Result<()> {
    run_with_selector(config, Arc::new(RandomSelector)).await
}

pub async fn run_with_selector(config: &Config, selector: Arc<dyn TargetSelector>) -> Result<()> {
    let base_port = config.server.port;
    let ports = config.worker_ports();

    info!("Primary {} is running", std::process::id());
    info!("派生 {} 个 worker，端口 {:?}", ports.len(), ports);

    let pool = Arc::new(WorkerPool::new());
    let supervisor = Arc::new(Supervisor::current_exe(Arc::clone(&pool))?);
    let handles = supervisor.start(&ports);

    let state = ProxyState::new(pool, selector, config.server.upstream_host.clone())?;
    let listener = TcpListener::bind((config.server.bind_address.as_str(), base_port))
        .await
        .with_context(|| format!("无法绑定到端口 {}", base_port))?;
    info!("Load balancer listening on port {}", base_port);

    let served = axum::serve(listener, proxy_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // 取消守护任务会 drop 子进程句柄，kill_on_drop 负责结束子进程
    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }
    info!("主进程已安全关闭，共重启 worker {} 次", supervisor.restarts());

    served.context("代理服务异常退出")
}
