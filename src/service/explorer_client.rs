//! 公共区块链浏览器余额回退客户端（blockchain.info）
//!
//! 服务商余额接口不可用时的第二层数据源，返回值从聪换算为 BTC

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::config::ExplorerConfig;
use crate::service::balance_resolver::{BalanceSource, SourcedBalance};
use crate::service::bitnob_client::ProviderError;

const SATS_PER_BTC: i64 = 100_000_000;

/// blockchain.info /rawaddr/{address} 响应（仅取所需字段）
#[derive(Debug, Deserialize)]
struct RawAddrResponse {
    final_balance: u64,
}

pub struct ExplorerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ExplorerClient {
    pub fn new(config: &ExplorerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 查询地址余额，返回聪
    pub async fn final_balance_sats(&self, address: &str) -> Result<u64, ProviderError> {
        let url = format!("{}/rawaddr/{}", self.base_url, address);
        tracing::debug!("Explorer request: GET {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: "explorer request rejected".to_string(),
            });
        }

        let body: RawAddrResponse = response.json().await?;
        Ok(body.final_balance)
    }
}

#[async_trait]
impl BalanceSource for ExplorerClient {
    fn source_tag(&self) -> &'static str {
        "blockchain.info"
    }

    async fn address_balance(&self, address: &str) -> Result<SourcedBalance, ProviderError> {
        let sats = self.final_balance_sats(address).await?;
        // 聪 → BTC（8 位精度）
        let confirmed = Decimal::from(sats) / Decimal::from(SATS_PER_BTC);
        Ok(SourcedBalance {
            confirmed,
            unconfirmed: Decimal::ZERO,
        })
    }
}
