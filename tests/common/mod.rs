//! 测试公用：内存版仓库与静态余额数据源
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use satsvault::domain::KeyDerivationEngine;
use satsvault::infrastructure::encryption::EncryptionKey;
use satsvault::repository::{
    AddressStatus, BtcAddress, BtcAddressRepository, NewBtcAddress, NewWallet, Wallet,
    WalletRepository,
};
use satsvault::service::balance_resolver::{BalanceResolver, BalanceSource, SourcedBalance};
use satsvault::service::bitnob_client::ProviderError;
use satsvault::service::btc_address_service::BtcAddressService;

pub const TEST_ENC_KEY: &str = "test-encryption-key-32-characters!!";

/// 共享内存存储：wallet 按 wallet_id、地址按地址字符串索引
#[derive(Default)]
pub struct MemStore {
    pub wallets: Mutex<HashMap<Uuid, Wallet>>,
    pub addresses: Mutex<HashMap<String, BtcAddress>>,
}

impl MemStore {
    pub fn wallet_for_user(&self, user_id: Uuid) -> Option<Wallet> {
        self.wallets
            .lock()
            .unwrap()
            .values()
            .find(|w| w.user_id == user_id)
            .cloned()
    }

    pub fn address(&self, address: &str) -> Option<BtcAddress> {
        self.addresses.lock().unwrap().get(address).cloned()
    }

    pub fn address_count(&self) -> usize {
        self.addresses.lock().unwrap().len()
    }
}

pub struct MemWalletRepository(pub Arc<MemStore>);

#[async_trait]
impl WalletRepository for MemWalletRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self.0.wallet_for_user(user_id))
    }

    async fn reserve_address_index(&self, wallet_id: Uuid) -> Result<i64> {
        let mut wallets = self.0.wallets.lock().unwrap();
        let wallet = wallets
            .get_mut(&wallet_id)
            .ok_or_else(|| anyhow::anyhow!("wallet not found"))?;
        let index = wallet.next_address_index;
        wallet.next_address_index += 1;
        Ok(index)
    }

    async fn take_mnemonic_for_reveal(&self, wallet_id: Uuid) -> Result<Option<Vec<u8>>> {
        let mut wallets = self.0.wallets.lock().unwrap();
        let Some(wallet) = wallets.get_mut(&wallet_id) else {
            return Ok(None);
        };
        if wallet.encrypted_mnemonic.is_none() || wallet.mnemonic_revealed_at.is_some() {
            return Ok(None);
        }
        wallet.mnemonic_revealed_at = Some(Utc::now());
        Ok(wallet.encrypted_mnemonic.clone())
    }
}

pub struct MemBtcAddressRepository(pub Arc<MemStore>);

fn make_wallet(params: &NewWallet) -> Wallet {
    Wallet {
        wallet_id: Uuid::new_v4(),
        user_id: params.user_id,
        wallet_type: "BTC".into(),
        balance: Decimal::ZERO,
        currency: "BTC".into(),
        wallet_address: params.wallet_address.clone(),
        wallet_status: "isActive".into(),
        encrypted_mnemonic: params.encrypted_mnemonic.clone(),
        mnemonic_revealed_at: None,
        next_address_index: params.next_address_index,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[async_trait]
impl BtcAddressRepository for MemBtcAddressRepository {
    async fn find_by_address(&self, address: &str) -> Result<Option<BtcAddress>> {
        Ok(self.0.address(address))
    }

    async fn find_with_wallet(&self, address: &str) -> Result<Option<(BtcAddress, Wallet)>> {
        let Some(row) = self.0.address(address) else {
            return Ok(None);
        };
        let wallet = self
            .0
            .wallets
            .lock()
            .unwrap()
            .get(&row.wallet_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("wallet not found for address"))?;
        Ok(Some((row, wallet)))
    }

    async fn create_with_wallet(
        &self,
        wallet: NewWallet,
        addresses: Vec<NewBtcAddress>,
    ) -> Result<(Wallet, Vec<BtcAddress>)> {
        let wallet_row = {
            let mut wallets = self.0.wallets.lock().unwrap();
            if let Some(existing) = wallets.values_mut().find(|w| w.user_id == wallet.user_id) {
                if existing.encrypted_mnemonic.is_none() {
                    existing.encrypted_mnemonic = wallet.encrypted_mnemonic.clone();
                }
                existing.next_address_index =
                    existing.next_address_index.max(wallet.next_address_index);
                existing.clone()
            } else {
                let row = make_wallet(&wallet);
                wallets.insert(row.wallet_id, row.clone());
                row
            }
        };

        let mut created = Vec::with_capacity(addresses.len());
        let mut map = self.0.addresses.lock().unwrap();
        for new_address in addresses {
            if map.contains_key(&new_address.address) {
                anyhow::bail!("duplicate address: {}", new_address.address);
            }
            let row = BtcAddress {
                address_id: Uuid::new_v4(),
                user_id: new_address.user_id,
                wallet_id: wallet_row.wallet_id,
                address: new_address.address.clone(),
                address_type: new_address.address_type,
                public_key: new_address.public_key,
                private_key: new_address.private_key,
                derivation_path: new_address.derivation_path,
                label: new_address.label,
                confirmed_balance: Decimal::ZERO,
                unconfirmed_balance: Decimal::ZERO,
                is_used: false,
                is_change: false,
                is_imported: new_address.is_imported,
                watch_only: new_address.watch_only,
                is_active: true,
                last_used_at: None,
                last_balance_update: None,
                transaction_count: 0,
                metadata: serde_json::json!({}),
                status: AddressStatus::Active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            map.insert(row.address.clone(), row.clone());
            created.push(row);
        }
        Ok((wallet_row, created))
    }

    async fn update_balance(
        &self,
        address: &str,
        confirmed: Decimal,
        unconfirmed: Decimal,
    ) -> Result<()> {
        if let Some(row) = self.0.addresses.lock().unwrap().get_mut(address) {
            row.confirmed_balance = confirmed;
            row.unconfirmed_balance = unconfirmed;
            row.last_balance_update = Some(Utc::now());
        }
        Ok(())
    }
}

/// 总是成功的静态余额数据源
pub struct StaticBalanceSource {
    pub tag: &'static str,
    pub confirmed: Decimal,
    pub unconfirmed: Decimal,
}

#[async_trait]
impl BalanceSource for StaticBalanceSource {
    fn source_tag(&self) -> &'static str {
        self.tag
    }

    async fn address_balance(&self, _address: &str) -> Result<SourcedBalance, ProviderError> {
        Ok(SourcedBalance {
            confirmed: self.confirmed,
            unconfirmed: self.unconfirmed,
        })
    }
}

/// 总是失败的余额数据源（模拟服务商不可用）
pub struct FailingBalanceSource {
    pub tag: &'static str,
}

#[async_trait]
impl BalanceSource for FailingBalanceSource {
    fn source_tag(&self) -> &'static str {
        self.tag
    }

    async fn address_balance(&self, _address: &str) -> Result<SourcedBalance, ProviderError> {
        Err(ProviderError::Api {
            status: 503,
            message: "service unavailable".to_string(),
        })
    }
}

/// 构造挂接内存仓库的地址服务
pub fn service_with_sources(
    network: bitcoin::Network,
    sources: Vec<Arc<dyn BalanceSource>>,
) -> (BtcAddressService, Arc<MemStore>) {
    let store = Arc::new(MemStore::default());
    let wallets = Arc::new(MemWalletRepository(store.clone()));
    let addresses: Arc<dyn BtcAddressRepository> =
        Arc::new(MemBtcAddressRepository(store.clone()));
    let resolver = BalanceResolver::new(sources, addresses.clone());

    let service = BtcAddressService::new(
        KeyDerivationEngine::new(network),
        wallets,
        addresses,
        resolver,
        EncryptionKey::from_config(TEST_ENC_KEY).unwrap(),
    );
    (service, store)
}

pub fn service(network: bitcoin::Network) -> (BtcAddressService, Arc<MemStore>) {
    service_with_sources(network, Vec::new())
}
