//! 余额回退链集成测试
//!
//! 服务商 → 公共浏览器 → 数据库存量，逐层回退并持久化

mod common;

use std::sync::Arc;

use bitcoin::Network;
use rust_decimal::Decimal;
use uuid::Uuid;

use common::{service_with_sources, FailingBalanceSource, StaticBalanceSource};
use satsvault::domain::AddressType;
use satsvault::service::balance_resolver::BalanceSource;
use satsvault::service::btc_address_service::{
    AddressServiceError, GenerateAddress, SeedSource,
};

fn btc(sats: u64) -> Decimal {
    Decimal::from(sats) / Decimal::from(100_000_000u64)
}

async fn generated_address(
    service: &satsvault::service::btc_address_service::BtcAddressService,
) -> String {
    service
        .generate(GenerateAddress {
            user_id: Uuid::new_v4(),
            address_type: AddressType::NativeSegwit,
            label: None,
            derivation_path: None,
            seed_source: SeedSource::Fresh,
        })
        .await
        .unwrap()
        .address
}

#[tokio::test]
async fn test_provider_tier_wins_when_available() {
    let sources: Vec<Arc<dyn BalanceSource>> = vec![
        Arc::new(StaticBalanceSource {
            tag: "bitnob",
            confirmed: btc(150_000),
            unconfirmed: btc(5_000),
        }),
        Arc::new(StaticBalanceSource {
            tag: "blockchain.info",
            confirmed: btc(999),
            unconfirmed: Decimal::ZERO,
        }),
    ];
    let (service, store) = service_with_sources(Network::Bitcoin, sources);
    let address = generated_address(&service).await;

    let resolved = service.balance(&address).await.unwrap();

    assert_eq!(resolved.source, "bitnob");
    assert!(resolved.note.is_none());
    assert_eq!(resolved.confirmed_balance, btc(150_000));
    assert_eq!(resolved.unconfirmed_balance, btc(5_000));
    assert_eq!(resolved.total(), btc(155_000));

    // 成功层的结果被持久化
    let stored = store.address(&address).unwrap();
    assert_eq!(stored.confirmed_balance, btc(150_000));
    assert!(stored.last_balance_update.is_some());
}

#[tokio::test]
async fn test_explorer_tier_used_when_provider_fails() {
    let sources: Vec<Arc<dyn BalanceSource>> = vec![
        Arc::new(FailingBalanceSource { tag: "bitnob" }),
        Arc::new(StaticBalanceSource {
            tag: "blockchain.info",
            confirmed: btc(54_321),
            unconfirmed: Decimal::ZERO,
        }),
    ];
    let (service, store) = service_with_sources(Network::Bitcoin, sources);
    let address = generated_address(&service).await;

    let resolved = service.balance(&address).await.unwrap();

    assert_eq!(resolved.source, "blockchain.info");
    assert_eq!(resolved.confirmed_balance, Decimal::new(54_321, 8));

    // 浏览器层的换算结果同样落库
    let stored = store.address(&address).unwrap();
    assert_eq!(stored.confirmed_balance, btc(54_321));
}

#[tokio::test]
async fn test_database_tier_when_all_sources_fail() {
    let sources: Vec<Arc<dyn BalanceSource>> = vec![
        Arc::new(FailingBalanceSource { tag: "bitnob" }),
        Arc::new(FailingBalanceSource { tag: "blockchain.info" }),
    ];
    let (service, store) = service_with_sources(Network::Bitcoin, sources);
    let address = generated_address(&service).await;

    // 预置一份历史余额
    {
        let mut addresses = store.addresses.lock().unwrap();
        let row = addresses.get_mut(&address).unwrap();
        row.confirmed_balance = btc(70_000);
        row.unconfirmed_balance = btc(1_000);
    }

    let resolved = service.balance(&address).await.unwrap();

    assert_eq!(resolved.source, "database");
    assert_eq!(resolved.confirmed_balance, btc(70_000));
    assert_eq!(resolved.unconfirmed_balance, btc(1_000));
    assert!(resolved
        .note
        .as_deref()
        .is_some_and(|note| note.contains("unavailable")));
}

#[tokio::test]
async fn test_database_tier_returns_zero_for_untracked_address() {
    let sources: Vec<Arc<dyn BalanceSource>> =
        vec![Arc::new(FailingBalanceSource { tag: "bitnob" })];
    let (service, _) = service_with_sources(Network::Bitcoin, sources);

    let resolved = service
        .balance("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4")
        .await
        .unwrap();

    assert_eq!(resolved.source, "database");
    assert_eq!(resolved.confirmed_balance, Decimal::ZERO);
}

#[tokio::test]
async fn test_balance_rejects_malformed_address() {
    let (service, _) = service_with_sources(Network::Bitcoin, Vec::new());

    let err = service
        .balance("thisisnotabitcoinaddressatall")
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::InvalidAddress));
}
