use std::sync::Arc;

use anyhow::Result;
use bitcoin::Network;

use crate::{
    config::Config,
    domain::KeyDerivationEngine,
    infrastructure::{db::PgPool, encryption::EncryptionKey},
    repository::{
        BtcAddressRepository, PgBtcAddressRepository, PgTransactionRepository,
        PgWalletRepository, TransactionRepository, WalletRepository,
    },
    service::{
        balance_resolver::{BalanceResolver, BalanceSource},
        bitnob_client::BitnobClient,
        btc_address_service::BtcAddressService,
        currency_service::CurrencyService,
        explorer_client::ExplorerClient,
        transaction_service::TransactionService,
    },
};

/// 应用状态
/// 所有共享资源在启动时构造一次，此后只读
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub network: Network,
    pub bitnob: Arc<BitnobClient>,
    pub address_service: Arc<BtcAddressService>,
    pub currency_service: Arc<CurrencyService>,
    pub transaction_service: Arc<TransactionService>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(pool: PgPool, config: Arc<Config>) -> Result<Self> {
        let network = config.bitcoin.network()?;

        let bitnob = Arc::new(BitnobClient::new(&config.bitnob)?);
        let explorer = Arc::new(ExplorerClient::new(&config.explorer)?);

        let wallets: Arc<dyn WalletRepository> =
            Arc::new(PgWalletRepository::new(pool.clone()));
        let addresses: Arc<dyn BtcAddressRepository> =
            Arc::new(PgBtcAddressRepository::new(pool.clone()));
        let transactions: Arc<dyn TransactionRepository> =
            Arc::new(PgTransactionRepository::new(pool.clone()));

        // 余额回退链：服务商 → 公共浏览器 → 数据库存量
        let resolver = BalanceResolver::new(
            vec![
                bitnob.clone() as Arc<dyn BalanceSource>,
                explorer as Arc<dyn BalanceSource>,
            ],
            addresses.clone(),
        );

        let mnemonic_key = EncryptionKey::from_config(&config.bitcoin.wallet_enc_key)?;

        let address_service = Arc::new(BtcAddressService::new(
            KeyDerivationEngine::new(network),
            wallets,
            addresses,
            resolver,
            mnemonic_key,
        ));
        let currency_service = Arc::new(CurrencyService::new(bitnob.clone()));
        let transaction_service = Arc::new(TransactionService::new(transactions));

        Ok(Self {
            pool,
            config,
            network,
            bitnob,
            address_service,
            currency_service,
            transaction_service,
        })
    }
}
