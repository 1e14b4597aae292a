//! 日志基础设施
//!
//! 主进程和所有 worker 进程写同一个按日期命名的日志文件，
//! 每次写入都持有文件排他锁，保证多进程下日志行不交错。

use anyhow::Result;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::config::LoggingConfig;

/// 安全的多进程文件写入器
pub struct SafeFileWriter {
    file: Arc<File>,
}

impl SafeFileWriter {
    pub fn new(path: PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // 追加模式下每次 write 都落在文件末尾
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            file: Arc::new(file),
        })
    }
}

impl Write for SafeFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock_exclusive()?;

        let result = (&*self.file).write_all(buf).and_then(|_| (&*self.file).flush());

        self.file.unlock()?;

        result.map(|_| buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // 已在 write 中处理
        Ok(())
    }
}

impl Clone for SafeFileWriter {
    fn clone(&self) -> Self {
        Self {
            file: Arc::clone(&self.file),
        }
    }
}

impl<'a> MakeWriter<'a> for SafeFileWriter {
    type Writer = SafeFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// 当天日志文件路径：`<log_path>/<file_prefix>.<YYYY-MM-DD>.log`
pub fn log_file_path(config: &LoggingConfig) -> PathBuf {
    let date_str = chrono::Local::now().format("%Y-%m-%d").to_string();
    config
        .log_path
        .join(format!("{}.{}.log", config.file_prefix, date_str))
}

/// 初始化日志系统
///
/// 文件层始终开启；控制台层由 `console_output` 控制。
/// 日志级别取配置值，`RUST_LOG` 存在时以它为准。
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let safe_writer = SafeFileWriter::new(log_file_path(config))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info,hyper=warn", config.level)));

    let console_layer = config
        .console_output
        .then(|| fmt::layer().with_writer(io::stdout).with_ansi(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(safe_writer)
                .with_ansi(false)
                .with_target(false)
                .with_thread_ids(true),
        )
        .with(console_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_safe_writer_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("test.log");

        let mut a = SafeFileWriter::new(path.clone()).unwrap();
        let mut b = a.clone();
        a.write_all(b"first\n").unwrap();
        b.write_all(b"second\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_log_file_path() {
        let config = LoggingConfig {
            log_path: PathBuf::from("/tmp/logs"),
            file_prefix: "svc".to_string(),
            ..LoggingConfig::default()
        };
        let path = log_file_path(&config);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(path.starts_with("/tmp/logs"));
        assert!(name.starts_with("svc."));
        assert!(name.ends_with(".log"));
    }
}
