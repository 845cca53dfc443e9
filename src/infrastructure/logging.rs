//! 日志系统配置模块
//! 支持结构化日志、日志级别配置和按天轮转的文件日志

use std::path::Path;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::config::LoggingConfig;

/// 初始化日志系统
///
/// 返回的 WorkerGuard 必须由调用方持有到进程退出，否则文件日志会丢失
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if !config.enable_file_logging {
        if config.format == "json" {
            Registry::default()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        } else {
            Registry::default().with(filter).with(fmt::layer()).init();
        }
        return Ok(None);
    }

    let log_dir = config
        .log_file_path
        .as_deref()
        .map(Path::new)
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("./logs"));
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, "app.log");
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    if config.format == "json" {
        let file_layer = fmt::layer().json().with_writer(non_blocking_appender);
        let stdout_layer = fmt::layer().json();
        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(stdout_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_ansi(true);
        Registry::default()
            .with(filter)
            .with(file_layer)
            .with(stdout_layer)
            .init();
    }

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use crate::config::LoggingConfig;

    #[test]
    fn test_logging_config() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "json".to_string(),
            enable_file_logging: false,
            log_file_path: None,
        };

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, "json");
    }
}
