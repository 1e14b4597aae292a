use std::future::Future;

use anyhow::Result;
use tokio::runtime::Builder;
use tracing::info;

use user_cluster::cluster::{self, Role};
use user_cluster::infrastructure::{config, logging, Config};
use user_cluster::worker;

/// worker 进程使用单线程事件循环，存储操作不会交错
fn run_worker<F>(config: &Config, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(worker::run(&config.server.bind_address, port, shutdown))
}

fn main() -> Result<()> {
    // 初始化配置系统
    let config = config::load_config()?;

    // 初始化安全的多进程日志系统
    logging::init_logging(&config.logging)?;

    let single = std::env::args().skip(1).any(|arg| arg == "--single");
    let role = Role::select(config::worker_port_from_env()?, single, config.server.port);

    match role {
        Role::Worker { port } => run_worker(&config, port, async {
            worker::wait_for_eof(tokio::io::stdin()).await;
            info!("主进程已退出，worker 随之关闭");
        }),
        Role::Single { port } => {
            info!("单进程模式，不派生 worker，端口 {}", port);
            run_worker(&config, port, async {
                let _ = tokio::signal::ctrl_c().await;
                info!("收到停止信号，正在关闭...");
            })
        }
        Role::Primary => Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(cluster::primary::run(&config)),
    }
}
