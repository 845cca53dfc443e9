//! Bitnob 服务商网关
//!
//! 组合式设计：一个配置好的 HTTP 客户端注入各能力方法，
//! 余额查询、钱包管理和汇率查询共用同一请求/错误处理

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::config::BitnobConfig;
use crate::service::balance_resolver::{BalanceSource, SourcedBalance};

/// 服务商调用错误
///
/// 区分传输层失败与上游业务拒绝，余额回退链据此决定日志内容
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },
}

/// Bitnob 地址余额响应（BTC 计价）
#[derive(Debug, Clone, Deserialize)]
pub struct BitnobBalance {
    #[serde(default)]
    pub success: bool,
    pub balance: Decimal,
    #[serde(default)]
    pub confirmed_balance: Option<Decimal>,
    #[serde(default)]
    pub unconfirmed_balance: Option<Decimal>,
}

pub struct BitnobClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BitnobClient {
    pub fn new(config: &BitnobConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ProviderError> {
        tracing::debug!("Bitnob request: GET {}", path);
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ProviderError> {
        tracing::debug!("Bitnob request: POST {}", path);
        let response = self
            .http
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        Self::check_status(response).await
    }

    async fn check_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| "provider request rejected".to_string());

        Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        })
    }

    // ===== 地址余额 =====

    /// GET /addresses/{address}/balance
    pub async fn address_balance(&self, address: &str) -> Result<BitnobBalance, ProviderError> {
        let response = self
            .get(&format!("/addresses/{}/balance", address))
            .await?;
        let body: BitnobBalance = response.json().await?;

        if !body.success {
            return Err(ProviderError::Api {
                status: 200,
                message: "balance lookup unsuccessful".to_string(),
            });
        }
        Ok(body)
    }

    // ===== 服务商托管钱包 =====

    /// POST /wallets/create-new-crypto-wallet
    pub async fn create_crypto_wallet(
        &self,
        coin: &str,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .post(
                "/wallets/create-new-crypto-wallet",
                &serde_json::json!({ "coin": coin }),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// GET /wallets
    pub async fn list_wallets(&self) -> Result<serde_json::Value, ProviderError> {
        let response = self.get("/wallets").await?;
        Ok(response.json().await?)
    }

    /// GET /wallets/crypto-wallet/{coin}
    pub async fn wallet_by_coin(&self, coin: &str) -> Result<serde_json::Value, ProviderError> {
        let response = self.get(&format!("/wallets/crypto-wallet/{}", coin)).await?;
        Ok(response.json().await?)
    }

    // ===== 汇率 =====

    /// GET /wallets/payout/rate/{currency}
    pub async fn payout_rate(&self, currency: &str) -> Result<serde_json::Value, ProviderError> {
        let response = self
            .get(&format!("/wallets/payout/rate/{}", currency))
            .await?;
        Ok(response.json().await?)
    }

    /// GET /wallets/payout/rates
    pub async fn payout_rates(&self) -> Result<serde_json::Value, ProviderError> {
        let response = self.get("/wallets/payout/rates").await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl BalanceSource for BitnobClient {
    fn source_tag(&self) -> &'static str {
        "bitnob"
    }

    async fn address_balance(&self, address: &str) -> Result<SourcedBalance, ProviderError> {
        let balance = BitnobClient::address_balance(self, address).await?;
        Ok(SourcedBalance {
            confirmed: balance.confirmed_balance.unwrap_or(balance.balance),
            unconfirmed: balance.unconfirmed_balance.unwrap_or(Decimal::ZERO),
        })
    }
}
