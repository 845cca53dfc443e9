//! 余额解析策略
//!
//! 按序尝试数据源（服务商 → 公共浏览器），首个成功者即生效并持久化；
//! 全部失败时回退到数据库存量并注明数据可能过期

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::repository::BtcAddressRepository;
use crate::service::bitnob_client::ProviderError;

/// 单个数据源返回的余额（BTC 计价）
#[derive(Debug, Clone, Copy)]
pub struct SourcedBalance {
    pub confirmed: Decimal,
    pub unconfirmed: Decimal,
}

/// 余额数据源
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// 响应里的 source 标签
    fn source_tag(&self) -> &'static str;

    async fn address_balance(&self, address: &str) -> Result<SourcedBalance, ProviderError>;
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ResolvedBalance {
    pub confirmed_balance: Decimal,
    pub unconfirmed_balance: Decimal,
    pub source: String,
    pub note: Option<String>,
}

impl ResolvedBalance {
    pub fn total(&self) -> Decimal {
        self.confirmed_balance + self.unconfirmed_balance
    }
}

pub struct BalanceResolver {
    sources: Vec<Arc<dyn BalanceSource>>,
    addresses: Arc<dyn BtcAddressRepository>,
}

impl BalanceResolver {
    pub fn new(
        sources: Vec<Arc<dyn BalanceSource>>,
        addresses: Arc<dyn BtcAddressRepository>,
    ) -> Self {
        Self { sources, addresses }
    }

    /// 逐层解析余额
    ///
    /// 单层失败只记日志不外抛；仅当所有在线数据源都失败且数据库读取
    /// 也失败时才向调用方返回错误
    pub async fn resolve(&self, address: &str) -> Result<ResolvedBalance> {
        for source in &self.sources {
            match self.try_source(source.as_ref(), address).await {
                Ok(resolved) => return Ok(resolved),
                Err(err) => {
                    tracing::warn!(
                        source = source.source_tag(),
                        "Balance source failed, falling through to next tier: {}",
                        err
                    );
                }
            }
        }

        // 在线数据源耗尽：返回数据库存量
        let stored = self.addresses.find_by_address(address).await?;
        let (confirmed, unconfirmed) = stored
            .map(|a| (a.confirmed_balance, a.unconfirmed_balance))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        Ok(ResolvedBalance {
            confirmed_balance: confirmed,
            unconfirmed_balance: unconfirmed,
            source: "database".to_string(),
            note: Some("Balance from database - API services unavailable".to_string()),
        })
    }

    async fn try_source(
        &self,
        source: &dyn BalanceSource,
        address: &str,
    ) -> Result<ResolvedBalance> {
        let balance = source.address_balance(address).await?;

        self.addresses
            .update_balance(address, balance.confirmed, balance.unconfirmed)
            .await?;

        Ok(ResolvedBalance {
            confirmed_balance: balance.confirmed,
            unconfirmed_balance: balance.unconfirmed,
            source: source.source_tag().to_string(),
            note: None,
        })
    }
}
