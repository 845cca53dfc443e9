//! 汇率服务
//!
//! 通过 Bitnob payout 汇率接口查询汇率并做跨币种换算；
//! 所有汇率都相对 USD，换算时先换入 USD 再换出

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::service::bitnob_client::{BitnobClient, ProviderError};

#[derive(Debug, Error)]
pub enum CurrencyServiceError {
    #[error("One or both currencies are not supported")]
    UnsupportedCurrency,
    #[error("unexpected rates payload: {0}")]
    MalformedRates(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// 换算结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConversionResult {
    pub amount: Decimal,
    pub from: String,
    pub to: String,
    pub from_rate: Decimal,
    pub to_rate: Decimal,
    pub converted_amount: Decimal,
    pub rate: Decimal,
}

pub struct CurrencyService {
    bitnob: Arc<BitnobClient>,
}

impl CurrencyService {
    pub fn new(bitnob: Arc<BitnobClient>) -> Self {
        Self { bitnob }
    }

    /// 单币种 payout 汇率（服务商响应透传）
    pub async fn payout_rate(&self, currency: &str) -> Result<serde_json::Value, ProviderError> {
        self.bitnob.payout_rate(currency).await
    }

    /// 完整汇率表（服务商响应透传）
    pub async fn exchange_rates(&self) -> Result<serde_json::Value, ProviderError> {
        self.bitnob.payout_rates().await
    }

    /// 跨币种换算
    pub async fn convert(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<ConversionResult, CurrencyServiceError> {
        let rates = self.bitnob.payout_rates().await?;
        convert_with_table(amount, from, to, &rates)
    }
}

/// 基于汇率表做换算；与网络调用解耦便于测试
pub(crate) fn convert_with_table(
    amount: Decimal,
    from: &str,
    to: &str,
    rates: &serde_json::Value,
) -> Result<ConversionResult, CurrencyServiceError> {
    let table = rates.get("data").unwrap_or(rates);

    let from_upper = from.to_uppercase();
    let to_upper = to.to_uppercase();

    let from_rate = rate_field(table, &from_upper, "sellRate")
        .ok_or(CurrencyServiceError::UnsupportedCurrency)?;
    let to_rate =
        rate_field(table, &to_upper, "buyRate").ok_or(CurrencyServiceError::UnsupportedCurrency)?;

    if from_rate.is_zero() {
        return Err(CurrencyServiceError::MalformedRates(format!(
            "zero sell rate for {}",
            from_upper
        )));
    }

    // 先换入 USD，再换出目标币种
    let amount_in_usd = amount / from_rate;
    let converted_amount = amount_in_usd * to_rate;

    Ok(ConversionResult {
        amount,
        from: from_upper,
        to: to_upper,
        from_rate,
        to_rate,
        converted_amount,
        rate: to_rate / from_rate,
    })
}

/// 从汇率表取字段，字符串和数字两种表示都接受
fn rate_field(table: &serde_json::Value, currency: &str, key: &str) -> Option<Decimal> {
    match table.get(currency)?.get(key)? {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        _ => None,
    }
}
