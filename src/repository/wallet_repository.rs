// 钱包数据访问 Repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

// ============ 领域模型 ============

/// 钱包领域模型，与 wallet 表一一对应
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Wallet {
    pub wallet_id: Uuid,
    pub user_id: Uuid,
    pub wallet_type: String,
    pub balance: Decimal,
    pub currency: String,
    /// 主地址（创建钱包时的第一个地址）
    pub wallet_address: String,
    pub wallet_status: String,
    /// 批量生成的助记词密文（nonce || ciphertext）
    pub encrypted_mnemonic: Option<Vec<u8>>,
    /// 一次性导出时间；非空表示已导出
    pub mnemonic_revealed_at: Option<DateTime<Utc>>,
    /// 从钱包种子继续派生时的下一个地址索引
    pub next_address_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 创建钱包参数
#[derive(Debug, Clone)]
pub struct NewWallet {
    pub user_id: Uuid,
    /// 首个地址作为钱包主地址
    pub wallet_address: String,
    /// 批量生成时随钱包一并写入的助记词密文
    pub encrypted_mnemonic: Option<Vec<u8>>,
    /// 钱包种子的下一个派生索引；批量生成后指向批次末尾的下一位
    pub next_address_index: i64,
}

// ============ Repository Trait ============

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// 根据用户查询钱包（每个用户至多一个 BTC 钱包）
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>>;

    /// 预留下一个派生索引（原子自增），返回预留到的索引
    async fn reserve_address_index(&self, wallet_id: Uuid) -> Result<i64>;

    /// 一次性导出助记词密文：仅当存在且从未导出过时返回，并记录导出时间
    async fn take_mnemonic_for_reveal(&self, wallet_id: Uuid) -> Result<Option<Vec<u8>>>;
}

// ============ PostgreSQL 实现 ============

pub struct PgWalletRepository {
    pool: PgPool,
}

impl PgWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRepository for PgWalletRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        let row = sqlx::query_as::<_, Wallet>("SELECT * FROM wallet WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn reserve_address_index(&self, wallet_id: Uuid) -> Result<i64> {
        // RETURNING 读到的是自增后的值，减一得到本次预留的索引
        let (index,): (i64,) = sqlx::query_as(
            "UPDATE wallet
             SET next_address_index = next_address_index + 1, updated_at = now()
             WHERE wallet_id = $1
             RETURNING next_address_index - 1",
        )
        .bind(wallet_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(index)
    }

    async fn take_mnemonic_for_reveal(&self, wallet_id: Uuid) -> Result<Option<Vec<u8>>> {
        let row: Option<(Option<Vec<u8>>,)> = sqlx::query_as(
            "UPDATE wallet
             SET mnemonic_revealed_at = now(), updated_at = now()
             WHERE wallet_id = $1
               AND encrypted_mnemonic IS NOT NULL
               AND mnemonic_revealed_at IS NULL
             RETURNING encrypted_mnemonic",
        )
        .bind(wallet_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|(ciphertext,)| ciphertext))
    }
}
