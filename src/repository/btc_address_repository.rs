// BTC 地址数据访问 Repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::AddressType;
use crate::repository::wallet_repository::{NewWallet, Wallet};

// ============ 领域模型 ============

/// 地址状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum AddressStatus {
    #[default]
    Active,
    Inactive,
    Compromised,
    Archived,
}

impl AddressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressStatus::Active => "active",
            AddressStatus::Inactive => "inactive",
            AddressStatus::Compromised => "compromised",
            AddressStatus::Archived => "archived",
        }
    }
}

impl std::str::FromStr for AddressStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(AddressStatus::Active),
            "inactive" => Ok(AddressStatus::Inactive),
            "compromised" => Ok(AddressStatus::Compromised),
            "archived" => Ok(AddressStatus::Archived),
            other => anyhow::bail!("Unknown address status: {}", other),
        }
    }
}

/// BTC 地址领域模型
#[derive(Debug, Clone)]
pub struct BtcAddress {
    pub address_id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Uuid,
    pub address: String,
    pub address_type: AddressType,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    /// BIP44/49/84 派生路径；导入地址为 None
    pub derivation_path: Option<String>,
    pub label: Option<String>,
    pub confirmed_balance: Decimal,
    pub unconfirmed_balance: Decimal,
    pub is_used: bool,
    pub is_change: bool,
    pub is_imported: bool,
    pub watch_only: bool,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_balance_update: Option<DateTime<Utc>>,
    pub transaction_count: i32,
    pub metadata: serde_json::Value,
    pub status: AddressStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BtcAddress {
    /// 总余额 = 已确认 + 未确认（派生值，不落库）
    pub fn total_balance(&self) -> Decimal {
        self.confirmed_balance + self.unconfirmed_balance
    }
}

/// 数据库行，枚举列以文本形式读出后再转成强类型
#[derive(Debug, sqlx::FromRow)]
struct BtcAddressRow {
    address_id: Uuid,
    user_id: Uuid,
    wallet_id: Uuid,
    address: String,
    address_type: String,
    public_key: Option<String>,
    private_key: Option<String>,
    derivation_path: Option<String>,
    label: Option<String>,
    confirmed_balance: Decimal,
    unconfirmed_balance: Decimal,
    is_used: bool,
    is_change: bool,
    is_imported: bool,
    watch_only: bool,
    is_active: bool,
    last_used_at: Option<DateTime<Utc>>,
    last_balance_update: Option<DateTime<Utc>>,
    transaction_count: i32,
    metadata: serde_json::Value,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BtcAddressRow> for BtcAddress {
    type Error = anyhow::Error;

    fn try_from(row: BtcAddressRow) -> Result<Self> {
        Ok(BtcAddress {
            address_id: row.address_id,
            user_id: row.user_id,
            wallet_id: row.wallet_id,
            address: row.address,
            address_type: row.address_type.parse()?,
            public_key: row.public_key,
            private_key: row.private_key,
            derivation_path: row.derivation_path,
            label: row.label,
            confirmed_balance: row.confirmed_balance,
            unconfirmed_balance: row.unconfirmed_balance,
            is_used: row.is_used,
            is_change: row.is_change,
            is_imported: row.is_imported,
            watch_only: row.watch_only,
            is_active: row.is_active,
            last_used_at: row.last_used_at,
            last_balance_update: row.last_balance_update,
            transaction_count: row.transaction_count,
            metadata: row.metadata,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 创建地址参数；wallet_id 由仓库在事务内补齐
#[derive(Debug, Clone)]
pub struct NewBtcAddress {
    pub user_id: Uuid,
    pub address: String,
    pub address_type: AddressType,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub derivation_path: Option<String>,
    pub label: Option<String>,
    pub is_imported: bool,
    pub watch_only: bool,
}

// ============ Repository Trait ============

#[async_trait]
pub trait BtcAddressRepository: Send + Sync {
    /// 根据地址字符串查询
    async fn find_by_address(&self, address: &str) -> Result<Option<BtcAddress>>;

    /// 地址连同所属钱包一并查询
    async fn find_with_wallet(&self, address: &str) -> Result<Option<(BtcAddress, Wallet)>>;

    /// 原子单元：按 user_id 条件插入钱包（已存在则复用），并在同一事务内写入一批地址
    async fn create_with_wallet(
        &self,
        wallet: NewWallet,
        addresses: Vec<NewBtcAddress>,
    ) -> Result<(Wallet, Vec<BtcAddress>)>;

    /// 持久化余额刷新结果
    async fn update_balance(
        &self,
        address: &str,
        confirmed: Decimal,
        unconfirmed: Decimal,
    ) -> Result<()>;
}

// ============ PostgreSQL 实现 ============

pub struct PgBtcAddressRepository {
    pool: PgPool,
}

impl PgBtcAddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BtcAddressRepository for PgBtcAddressRepository {
    async fn find_by_address(&self, address: &str) -> Result<Option<BtcAddress>> {
        let row =
            sqlx::query_as::<_, BtcAddressRow>("SELECT * FROM btc_addresses WHERE address = $1")
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;
        row.map(BtcAddress::try_from).transpose()
    }

    async fn find_with_wallet(&self, address: &str) -> Result<Option<(BtcAddress, Wallet)>> {
        let row =
            sqlx::query_as::<_, BtcAddressRow>("SELECT * FROM btc_addresses WHERE address = $1")
                .bind(address)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let wallet = sqlx::query_as::<_, Wallet>("SELECT * FROM wallet WHERE wallet_id = $1")
            .bind(row.wallet_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(Some((BtcAddress::try_from(row)?, wallet)))
    }

    async fn create_with_wallet(
        &self,
        wallet: NewWallet,
        addresses: Vec<NewBtcAddress>,
    ) -> Result<(Wallet, Vec<BtcAddress>)> {
        let mut tx = self.pool.begin().await?;

        // 条件插入：user_id 冲突时复用已有钱包。DO UPDATE 保证 RETURNING
        // 总能返回行；助记词密文只在尚未存储时写入，不覆盖已有值；
        // 派生索引只前进不后退
        let wallet_row = sqlx::query_as::<_, Wallet>(
            "INSERT INTO wallet (wallet_id, user_id, wallet_type, balance, currency, wallet_address, wallet_status, encrypted_mnemonic, next_address_index)
             VALUES ($1, $2, 'BTC', 0, 'BTC', $3, 'isActive', $4, $5)
             ON CONFLICT (user_id) DO UPDATE
                 SET encrypted_mnemonic = COALESCE(wallet.encrypted_mnemonic, EXCLUDED.encrypted_mnemonic),
                     next_address_index = GREATEST(wallet.next_address_index, EXCLUDED.next_address_index),
                     updated_at = now()
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(wallet.user_id)
        .bind(&wallet.wallet_address)
        .bind(&wallet.encrypted_mnemonic)
        .bind(wallet.next_address_index)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(addresses.len());
        for new_address in addresses {
            let row = sqlx::query_as::<_, BtcAddressRow>(
                "INSERT INTO btc_addresses (address_id, user_id, wallet_id, address, address_type,
                                            public_key, private_key, derivation_path, label,
                                            is_imported, watch_only)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                 RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(new_address.user_id)
            .bind(wallet_row.wallet_id)
            .bind(&new_address.address)
            .bind(new_address.address_type.as_str())
            .bind(&new_address.public_key)
            .bind(&new_address.private_key)
            .bind(&new_address.derivation_path)
            .bind(&new_address.label)
            .bind(new_address.is_imported)
            .bind(new_address.watch_only)
            .fetch_one(&mut *tx)
            .await?;
            created.push(BtcAddress::try_from(row)?);
        }

        tx.commit().await?;
        Ok((wallet_row, created))
    }

    async fn update_balance(
        &self,
        address: &str,
        confirmed: Decimal,
        unconfirmed: Decimal,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE btc_addresses
             SET confirmed_balance = $1, unconfirmed_balance = $2,
                 last_balance_update = now(), updated_at = now()
             WHERE address = $3",
        )
        .bind(confirmed)
        .bind(unconfirmed)
        .bind(address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
