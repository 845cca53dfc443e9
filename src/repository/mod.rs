pub mod btc_address_repository;
pub mod transaction_repository;
pub mod wallet_repository;

pub use btc_address_repository::{
    AddressStatus, BtcAddress, BtcAddressRepository, NewBtcAddress, PgBtcAddressRepository,
};
pub use transaction_repository::{
    NewTransaction, PgTransactionRepository, Transaction, TransactionRepository, TxnStatus,
    TxnType,
};
pub use wallet_repository::{NewWallet, PgWalletRepository, Wallet, WalletRepository};
