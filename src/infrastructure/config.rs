//! 配置加载
//!
//! 加载顺序：`.env` -> TOML 配置文件（不存在则用默认值）-> 环境变量覆盖 -> 校验。

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// worker 进程从这个环境变量得知自己的端口，同时也是角色判定依据
pub const WORKER_PORT_ENV: &str = "WORKER_PORT";

/// 系统配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 基础端口：主进程的代理监听这里，worker 占用 port+1 ..= port+N
    pub port: u16,
    /// 绑定地址
    pub bind_address: String,
    /// 代理转发的目标主机
    pub upstream_host: String,
    /// worker 数量，0 表示按 CPU 数自动计算
    pub workers: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志文件目录
    pub log_path: PathBuf,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 是否启用控制台输出
    pub console_output: bool,
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            bind_address: "127.0.0.1".to_string(),
            upstream_host: "127.0.0.1".to_string(),
            workers: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("./logs"),
            file_prefix: "user-cluster".to_string(),
            console_output: true,
            level: "info".to_string(),
        }
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("文件读取错误: {0}")]
    FileRead(String),
    #[error("配置解析错误: {0}")]
    Parse(String),
    #[error("环境变量 {key} 无效: {reason}")]
    Env { key: String, reason: String },
    #[error("配置验证错误: {0}")]
    Validation(String),
}

impl Config {
    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 便于测试时注入，正式运行时传入 `std::env::var`。
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        if let Some(port) = parse_var(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(workers) = parse_var(&lookup, "WORKERS")? {
            self.server.workers = workers;
        }
        if let Ok(level) = lookup("LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Ok(dir) = lookup("LOG_DIR") {
            self.logging.log_path = PathBuf::from(dir);
        }
        Ok(())
    }

    /// 实际使用的 worker 数量：可用并行度减一，最少 1 个
    pub fn worker_count(&self) -> usize {
        if self.server.workers > 0 {
            return self.server.workers;
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.saturating_sub(1).max(1)
    }

    /// worker 端口：从 port+1 开始连续分配
    pub fn worker_ports(&self) -> Vec<u16> {
        let base = self.server.port;
        (1..=self.worker_count())
            .filter_map(|i| u16::try_from(i).ok().and_then(|i| base.checked_add(i)))
            .collect()
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("端口必须大于0".to_string()));
        }
        if self.server.bind_address.is_empty() {
            return Err(ConfigError::Validation("绑定地址不能为空".to_string()));
        }
        if self.server.upstream_host.is_empty() {
            return Err(ConfigError::Validation("转发目标主机不能为空".to_string()));
        }

        let last = self.server.port as usize + self.worker_count();
        if last > u16::MAX as usize {
            return Err(ConfigError::Validation(format!(
                "worker 端口超出范围: {} + {}",
                self.server.port,
                self.worker_count()
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "无效的日志级别: {}，有效值: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| ConfigError::Env {
            key: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(None),
    }
}

/// 读取当前进程被分配到的 worker 端口；未设置说明是主进程
pub fn worker_port_from_env() -> Result<Option<u16>, ConfigError> {
    let port: Option<u16> = parse_var(&|key: &str| env::var(key), WORKER_PORT_ENV)?;
    match port {
        Some(0) => Err(ConfigError::Env {
            key: WORKER_PORT_ENV.to_string(),
            reason: "端口必须大于0".to_string(),
        }),
        other => Ok(other),
    }
}

/// 从文件、`.env` 和环境变量加载配置
pub fn load_config() -> Result<Config, ConfigError> {
    // .env 不存在不算错误
    let _ = dotenvy::dotenv();

    let config_paths = ["config.toml", "./config/config.toml"];

    let mut config = match config_paths.iter().find(|p| Path::new(p).exists()) {
        Some(path) => Config::load_from_file(path)?,
        None => Config::default(),
    };

    config.apply_env(|key| env::var(key))?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.workers, 0);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_worker_ports_are_sequential() {
        let mut config = Config::default();
        config.server.port = 5000;
        config.server.workers = 3;
        assert_eq!(config.worker_ports(), vec![5001, 5002, 5003]);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(lookup_from(&[("PORT", "4100"), ("WORKERS", "2"), ("LOG_LEVEL", "DEBUG")]))
            .unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.server.workers, 2);
        assert_eq!(config.logging.level, "debug");

        let err = config.apply_env(lookup_from(&[("PORT", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { .. }));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.port = u16::MAX;
        config.server.workers = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 4500\nworkers = 4\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.server.port, 4500);
        assert_eq!(config.server.workers, 4);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.logging.file_prefix, "user-cluster");

        fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
