//! Worker 监听器
//!
//! 绑定一个端口，持有本进程独享的 `UserStore`，把每个请求交给路由。

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::app::build_app;
use crate::app::users::{AppState, UserService, UserStore};

/// 创建一个拥有全新空存储的 worker 应用
pub fn worker_app() -> Router {
    let store = Arc::new(UserStore::new());
    build_app(AppState::new(UserService::new(store)))
}

/// 一直读到 EOF 或读错误为止
///
/// 主进程持有 worker stdin 管道的写端，读到 EOF 说明主进程已经不在了。
pub async fn wait_for_eof<R: AsyncRead + Unpin>(mut reader: R) {
    let mut buf = [0u8; 64];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => return,
            Ok(_) => continue,
            Err(e) => {
                warn!("读取主进程管道失败: {}", e);
                return;
            }
        }
    }
}

/// 在已绑定的 listener 上运行 worker，直到 `shutdown` 完成或出错
pub async fn serve_until<F>(listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Worker {} 已启动，监听端口 {}", std::process::id(), addr.port());

    axum::serve(listener, worker_app())
        .with_graceful_shutdown(shutdown)
        .await
        .context("worker 服务异常退出")?;

    info!("Worker {} 已停止", std::process::id());
    Ok(())
}

/// 在已绑定的 listener 上运行 worker，直到出错
pub async fn serve(listener: TcpListener) -> Result<()> {
    serve_until(listener, std::future::pending()).await
}

/// 绑定 `bind_address:port` 并运行 worker
pub async fn run<F>(bind_address: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("无效的监听地址: {}:{}", bind_address, port))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("无法绑定到端口 {}", port))?;

    serve_until(listener, shutdown).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_wait_for_eof_returns_when_writer_closes() {
        let (mut writer, reader) = tokio::io::duplex(16);
        let waiter = tokio::spawn(wait_for_eof(reader));

        writer.write_all(b"ignored").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(writer);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("写端关闭后应当返回")
            .unwrap();
    }

    #[tokio::test]
    async fn test_serve_until_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, async {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("收到关闭信号后应当退出")
            .unwrap();
        assert!(result.is_ok());
    }
}
