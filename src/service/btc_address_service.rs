//! BTC 地址生命周期服务
//!
//! 负责地址生成（单个/批量）、导入、校验、详情与余额刷新，
//! 独占用户-钱包-地址三者之间的创建与变更

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::address_encoder::InspectedAddress;
use crate::domain::{encode_address, inspect_address, AddressType, KeyDerivationEngine};
use crate::infrastructure::encryption::{decrypt_data, encrypt_data, EncryptionKey};
use crate::repository::{
    BtcAddress, BtcAddressRepository, NewBtcAddress, NewWallet, Wallet, WalletRepository,
};
use crate::service::balance_resolver::{BalanceResolver, ResolvedBalance};

/// 生成新地址时的种子来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SeedSource {
    /// 每次调用生成全新助记词；不同调用产生的地址彼此无派生关系
    #[default]
    Fresh,
    /// 从钱包存储的批量助记词继续派生下一个索引
    Wallet,
}

#[derive(Debug, Error)]
pub enum AddressServiceError {
    #[error("Invalid BTC address")]
    InvalidAddress,
    #[error("Unsupported address type")]
    UnsupportedAddressType,
    #[error("Address already exists")]
    AddressAlreadyExists,
    #[error("Address not found")]
    AddressNotFound,
    #[error("Wallet not found")]
    WalletNotFound,
    #[error("No wallet seed stored for this user")]
    NoStoredSeed,
    #[error("Wallet mnemonic already revealed")]
    MnemonicAlreadyRevealed,
    #[error("Private key required unless watch_only is set")]
    MissingPrivateKey,
    #[error("Batch count must be between 1 and 10")]
    InvalidBatchCount,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// 生成单个地址参数
#[derive(Debug, Clone)]
pub struct GenerateAddress {
    pub user_id: Uuid,
    pub address_type: AddressType,
    pub label: Option<String>,
    pub derivation_path: Option<String>,
    pub seed_source: SeedSource,
}

/// 导入地址参数
#[derive(Debug, Clone)]
pub struct ImportAddress {
    pub user_id: Uuid,
    pub address: String,
    pub private_key: Option<String>,
    pub label: Option<String>,
    pub watch_only: bool,
}

/// 批量生成结果
#[derive(Debug)]
pub struct GeneratedBatch {
    pub wallet: Wallet,
    pub addresses: Vec<BtcAddress>,
    pub start_index: u32,
}

/// 收款二维码载荷
pub fn qr_code_data(address: &str) -> String {
    format!("bitcoin:{}", address)
}

pub struct BtcAddressService {
    engine: KeyDerivationEngine,
    wallets: Arc<dyn WalletRepository>,
    addresses: Arc<dyn BtcAddressRepository>,
    resolver: BalanceResolver,
    mnemonic_key: EncryptionKey,
}

impl BtcAddressService {
    pub fn new(
        engine: KeyDerivationEngine,
        wallets: Arc<dyn WalletRepository>,
        addresses: Arc<dyn BtcAddressRepository>,
        resolver: BalanceResolver,
        mnemonic_key: EncryptionKey,
    ) -> Self {
        Self {
            engine,
            wallets,
            addresses,
            resolver,
            mnemonic_key,
        }
    }

    pub fn network(&self) -> bitcoin::Network {
        self.engine.network()
    }

    /// 生成一个新地址；用户没有钱包时顺带创建（首地址即主地址）
    pub async fn generate(
        &self,
        request: GenerateAddress,
    ) -> Result<BtcAddress, AddressServiceError> {
        let (mnemonic, path) = match request.seed_source {
            SeedSource::Fresh => {
                let mnemonic = self.engine.generate_mnemonic()?;
                let path = request
                    .derivation_path
                    .clone()
                    .unwrap_or_else(|| self.engine.default_path(request.address_type, 0));
                (mnemonic, path)
            }
            SeedSource::Wallet => {
                let wallet = self
                    .wallets
                    .find_by_user(request.user_id)
                    .await?
                    .ok_or(AddressServiceError::NoStoredSeed)?;
                let ciphertext = wallet
                    .encrypted_mnemonic
                    .as_deref()
                    .ok_or(AddressServiceError::NoStoredSeed)?;

                let phrase = Zeroizing::new(
                    String::from_utf8(decrypt_data(ciphertext, &self.mnemonic_key)?)
                        .context("Stored mnemonic is not valid UTF-8")?,
                );
                let mnemonic = self.engine.parse_mnemonic(&phrase)?;

                let index = self.wallets.reserve_address_index(wallet.wallet_id).await?;
                let path = self.engine.default_path(request.address_type, index as u32);
                (mnemonic, path)
            }
        };

        let key = self.engine.derive(&mnemonic, &path)?;
        let encoded = encode_address(&key.public_key, request.address_type, self.engine.network())?;

        let label = request
            .label
            .unwrap_or_else(|| format!("BTC Address {}", Utc::now().timestamp_millis()));

        let (_, mut created) = self
            .addresses
            .create_with_wallet(
                NewWallet {
                    user_id: request.user_id,
                    wallet_address: encoded.address.clone(),
                    encrypted_mnemonic: None,
                    next_address_index: 0,
                },
                vec![NewBtcAddress {
                    user_id: request.user_id,
                    address: encoded.address,
                    address_type: request.address_type,
                    public_key: Some(hex::encode(&key.public_key)),
                    private_key: Some(hex::encode(&key.private_key)),
                    derivation_path: Some(path),
                    label: Some(label),
                    is_imported: false,
                    watch_only: false,
                }],
            )
            .await?;

        created
            .pop()
            .context("Repository returned no created address")
            .map_err(AddressServiceError::Internal)
    }

    /// 批量生成：整个批次共享一个新助记词，索引从 start_index 连续递增
    ///
    /// 助记词不以明文返回：加密后随钱包落库，由一次性导出接口取回
    pub async fn generate_multiple(
        &self,
        user_id: Uuid,
        count: u32,
        address_type: AddressType,
        start_index: u32,
    ) -> Result<GeneratedBatch, AddressServiceError> {
        if !(1..=10).contains(&count) {
            return Err(AddressServiceError::InvalidBatchCount);
        }

        let mnemonic = self.engine.generate_mnemonic()?;

        let mut batch = Vec::with_capacity(count as usize);
        let mut first_address = String::new();
        for i in 0..count {
            let index = start_index + i;
            let path = self.engine.default_path(address_type, index);
            let key = self.engine.derive(&mnemonic, &path)?;
            let encoded = encode_address(&key.public_key, address_type, self.engine.network())?;

            if first_address.is_empty() {
                first_address = encoded.address.clone();
            }

            batch.push(NewBtcAddress {
                user_id,
                address: encoded.address,
                address_type,
                public_key: Some(hex::encode(&key.public_key)),
                private_key: Some(hex::encode(&key.private_key)),
                derivation_path: Some(path),
                label: Some(format!("BTC Address {}", index)),
                is_imported: false,
                watch_only: false,
            });
        }

        let phrase = Zeroizing::new(mnemonic.to_string());
        let ciphertext = encrypt_data(phrase.as_bytes(), &self.mnemonic_key)?;

        let (wallet, addresses) = self
            .addresses
            .create_with_wallet(
                NewWallet {
                    user_id,
                    wallet_address: first_address,
                    encrypted_mnemonic: Some(ciphertext),
                    // 批次占用 start_index..start_index+count，后续
                    // 钱包种子派生从批次末尾继续
                    next_address_index: i64::from(start_index + count),
                },
                batch,
            )
            .await?;

        Ok(GeneratedBatch {
            wallet,
            addresses,
            start_index,
        })
    }

    /// 校验地址格式；纯函数，格式错误不报错而是 is_valid=false
    pub fn validate(&self, address: &str) -> InspectedAddress {
        inspect_address(address)
    }

    /// 导入外部地址
    pub async fn import(&self, request: ImportAddress) -> Result<BtcAddress, AddressServiceError> {
        let inspected = inspect_address(&request.address);
        if !inspected.is_valid {
            return Err(AddressServiceError::InvalidAddress);
        }
        let address_type = inspected
            .address_type
            .ok_or(AddressServiceError::UnsupportedAddressType)?;

        // 全局唯一：同一地址不允许二次入库
        if self
            .addresses
            .find_by_address(&request.address)
            .await?
            .is_some()
        {
            return Err(AddressServiceError::AddressAlreadyExists);
        }

        // watch_only 时丢弃传入的私钥，保证 watch_only ⟺ 无私钥
        let private_key = if request.watch_only {
            None
        } else {
            request.private_key
        };
        if !request.watch_only && private_key.is_none() {
            return Err(AddressServiceError::MissingPrivateKey);
        }

        let label = request
            .label
            .unwrap_or_else(|| format!("Imported BTC Address {}", Utc::now().timestamp_millis()));

        let (_, mut created) = self
            .addresses
            .create_with_wallet(
                NewWallet {
                    user_id: request.user_id,
                    wallet_address: request.address.clone(),
                    encrypted_mnemonic: None,
                    next_address_index: 0,
                },
                vec![NewBtcAddress {
                    user_id: request.user_id,
                    address: request.address,
                    address_type,
                    public_key: None,
                    private_key,
                    derivation_path: None,
                    label: Some(label),
                    is_imported: true,
                    watch_only: request.watch_only,
                }],
            )
            .await?;

        created
            .pop()
            .context("Repository returned no created address")
            .map_err(AddressServiceError::Internal)
    }

    /// 地址详情（连同所属钱包）
    pub async fn get_details(
        &self,
        address: &str,
    ) -> Result<(BtcAddress, Wallet), AddressServiceError> {
        self.addresses
            .find_with_wallet(address)
            .await?
            .ok_or(AddressServiceError::AddressNotFound)
    }

    /// 余额刷新：委托给余额解析策略
    pub async fn balance(&self, address: &str) -> Result<ResolvedBalance, AddressServiceError> {
        if !inspect_address(address).is_valid {
            return Err(AddressServiceError::InvalidAddress);
        }
        Ok(self.resolver.resolve(address).await?)
    }

    /// 一次性导出批量生成时存储的助记词
    pub async fn reveal_mnemonic(
        &self,
        user_id: Uuid,
    ) -> Result<(Uuid, Zeroizing<String>), AddressServiceError> {
        let wallet = self
            .wallets
            .find_by_user(user_id)
            .await?
            .ok_or(AddressServiceError::WalletNotFound)?;

        if wallet.encrypted_mnemonic.is_none() {
            return Err(AddressServiceError::NoStoredSeed);
        }
        if wallet.mnemonic_revealed_at.is_some() {
            return Err(AddressServiceError::MnemonicAlreadyRevealed);
        }

        // 并发导出时只有一个调用方拿到密文，其余落到 None
        let ciphertext = self
            .wallets
            .take_mnemonic_for_reveal(wallet.wallet_id)
            .await?
            .ok_or(AddressServiceError::MnemonicAlreadyRevealed)?;

        let phrase = Zeroizing::new(
            String::from_utf8(decrypt_data(&ciphertext, &self.mnemonic_key)?)
                .context("Stored mnemonic is not valid UTF-8")?,
        );

        Ok((wallet.wallet_id, phrase))
    }
}
