// 交易记录数据访问 Repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

// ============ 领域模型 ============

/// 交易状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxnStatus {
    Pending,
    Completed,
    Failed,
}

impl TxnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnStatus::Pending => "pending",
            TxnStatus::Completed => "completed",
            TxnStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for TxnStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TxnStatus::Pending),
            "completed" => Ok(TxnStatus::Completed),
            "failed" => Ok(TxnStatus::Failed),
            other => anyhow::bail!("Unknown transaction status: {}", other),
        }
    }
}

/// 交易方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    Send,
    Receive,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Send => "send",
            TxnType::Receive => "receive",
        }
    }
}

impl std::str::FromStr for TxnType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "send" => Ok(TxnType::Send),
            "receive" => Ok(TxnType::Receive),
            other => anyhow::bail!("Unknown transaction type: {}", other),
        }
    }
}

/// 交易记录领域模型（账目记录，不涉及广播/签名）
#[derive(Debug, Clone)]
pub struct Transaction {
    pub txn_id: Uuid,
    pub wallet_id: Uuid,
    pub txn_amount: Decimal,
    pub currency: String,
    pub txn_status: TxnStatus,
    pub txn_type: TxnType,
    /// 服务商侧交易 ID
    pub reference: String,
    pub to_address: Option<String>,
    pub from_address: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    txn_id: Uuid,
    wallet_id: Uuid,
    txn_amount: Decimal,
    currency: String,
    txn_status: String,
    txn_type: String,
    reference: String,
    to_address: Option<String>,
    from_address: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = anyhow::Error;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Transaction {
            txn_id: row.txn_id,
            wallet_id: row.wallet_id,
            txn_amount: row.txn_amount,
            currency: row.currency,
            txn_status: row.txn_status.parse()?,
            txn_type: row.txn_type.parse()?,
            reference: row.reference,
            to_address: row.to_address,
            from_address: row.from_address,
            confirmed_at: row.confirmed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 创建交易记录参数
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub wallet_id: Uuid,
    pub txn_amount: Decimal,
    pub currency: String,
    pub txn_type: TxnType,
    pub reference: String,
    pub to_address: Option<String>,
    pub from_address: Option<String>,
}

// ============ Repository Trait ============

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, params: NewTransaction) -> Result<Transaction>;

    async fn list(&self) -> Result<Vec<Transaction>>;

    async fn find_by_id(&self, txn_id: Uuid) -> Result<Option<Transaction>>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>>;

    /// 更新交易状态；交易不存在时返回 None
    async fn update_status(
        &self,
        txn_id: Uuid,
        status: TxnStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Transaction>>;
}

// ============ PostgreSQL 实现 ============

pub struct PgTransactionRepository {
    pool: PgPool,
}

impl PgTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn insert(&self, params: NewTransaction) -> Result<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "INSERT INTO transaction (txn_id, wallet_id, txn_amount, currency, txn_status,
                                      txn_type, reference, to_address, from_address)
             VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(params.wallet_id)
        .bind(params.txn_amount)
        .bind(&params.currency)
        .bind(params.txn_type.as_str())
        .bind(&params.reference)
        .bind(&params.to_address)
        .bind(&params.from_address)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn list(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT * FROM transaction ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn find_by_id(&self, txn_id: Uuid) -> Result<Option<Transaction>> {
        let row =
            sqlx::query_as::<_, TransactionRow>("SELECT * FROM transaction WHERE txn_id = $1")
                .bind(txn_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Transaction>> {
        let row =
            sqlx::query_as::<_, TransactionRow>("SELECT * FROM transaction WHERE reference = $1")
                .bind(reference)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Transaction::try_from).transpose()
    }

    async fn update_status(
        &self,
        txn_id: Uuid,
        status: TxnStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            "UPDATE transaction
             SET txn_status = $1, confirmed_at = $2, updated_at = now()
             WHERE txn_id = $3
             RETURNING *",
        )
        .bind(status.as_str())
        .bind(confirmed_at)
        .bind(txn_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
    }
}
