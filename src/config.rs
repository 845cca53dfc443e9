//! 配置管理模块
//! 支持从环境变量和配置文件加载配置

use std::path::Path;

use anyhow::{Context, Result};
use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub bitnob: BitnobConfig,
    pub explorer: ExplorerConfig,
    pub bitcoin: BitcoinConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub enable_file_logging: bool,
    pub log_file_path: Option<String>,
}

/// Bitnob 服务商配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitnobConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

/// 公共区块链浏览器回退配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Bitcoin 网络配置
///
/// 网络在启动时解析一次，作为显式值注入派生引擎与地址编码器，
/// 运行期间不再读取环境变量
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinConfig {
    pub network: String, // "mainnet" or "testnet"
    pub wallet_enc_key: String,
}

impl BitcoinConfig {
    pub fn network(&self) -> Result<Network> {
        match self.network.as_str() {
            "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            other => anyhow::bail!("BTC_NETWORK must be 'mainnet' or 'testnet', got '{}'", other),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://postgres@localhost:5432/satsvault".into()),
            max_connections: std::env::var("DB_MAX_CONNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            min_connections: std::env::var("DB_MIN_CONNS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            acquire_timeout_secs: std::env::var("DB_ACQ_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4000".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".into()),
            enable_file_logging: std::env::var("LOG_FILE_ENABLED")
                .ok()
                .map(|v| v == "1")
                .unwrap_or(false),
            log_file_path: std::env::var("LOG_FILE_PATH").ok(),
        }
    }
}

impl Default for BitnobConfig {
    fn default() -> Self {
        Self {
            api_url: std::env::var("BITNOB_API_URL")
                .unwrap_or_else(|_| "https://sandboxapi.bitnob.co/api/v1".into()),
            api_key: std::env::var("BITNOB_API_KEY").unwrap_or_default(),
            timeout_secs: std::env::var("BITNOB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("EXPLORER_API_URL")
                .unwrap_or_else(|_| "https://blockchain.info".into()),
            timeout_secs: std::env::var("EXPLORER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        }
    }
}

impl Default for BitcoinConfig {
    fn default() -> Self {
        // BTC_NETWORK 显式优先；未设置时按环境推断（生产=主网，其余=测试网）
        let network = std::env::var("BTC_NETWORK").unwrap_or_else(|_| {
            let env = std::env::var("APP_ENV").unwrap_or_default();
            if env == "production" {
                "mainnet".into()
            } else {
                "testnet".into()
            }
        });
        Self {
            network,
            wallet_enc_key: std::env::var("WALLET_ENC_KEY").unwrap_or_default(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database: DatabaseConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            bitnob: BitnobConfig::default(),
            explorer: ExplorerConfig::default(),
            bitcoin: BitcoinConfig::default(),
        })
    }

    /// 从配置文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: Config =
            toml::from_str(&content).with_context(|| "Failed to parse config file as TOML")?;

        Ok(config)
    }

    /// 从环境变量和配置文件合并加载（配置文件优先级更高）
    pub fn from_env_and_file<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = Self::from_env()?;

        if let Some(path) = path {
            if path.as_ref().exists() {
                config = Self::from_file(path)?;
            }
        }

        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("postgres://")
            && !self.database.url.starts_with("postgresql://")
        {
            anyhow::bail!("DATABASE_URL must start with postgres:// or postgresql://");
        }

        self.bitcoin.network()?;

        if self.bitcoin.wallet_enc_key.is_empty() {
            anyhow::bail!("WALLET_ENC_KEY must be set");
        }
        if self.bitcoin.wallet_enc_key.len() < 32 {
            anyhow::bail!("WALLET_ENC_KEY must be at least 32 characters");
        }

        if self.bitnob.api_url.is_empty() {
            anyhow::bail!("BITNOB_API_URL must not be empty");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("LOG_LEVEL must be one of: {:?}", valid_levels);
        }

        if self.logging.format != "json" && self.logging.format != "text" {
            anyhow::bail!("LOG_FORMAT must be 'json' or 'text'");
        }

        Ok(())
    }
}
