pub mod balance_resolver;
pub mod bitnob_client;
pub mod btc_address_service;
pub mod currency_service;
pub mod explorer_client;
pub mod transaction_service;

pub use balance_resolver::{BalanceResolver, BalanceSource, ResolvedBalance, SourcedBalance};
pub use bitnob_client::{BitnobClient, ProviderError};
pub use btc_address_service::{AddressServiceError, BtcAddressService, SeedSource};
pub use currency_service::{CurrencyService, CurrencyServiceError};
pub use explorer_client::ExplorerClient;
pub use transaction_service::{TransactionService, TransactionServiceError};
