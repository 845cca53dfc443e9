//! 地址生命周期集成测试
//!
//! 覆盖生成（单个/批量/钱包种子续派）、导入、详情与助记词一次性导出

mod common;

use bitcoin::Network;
use uuid::Uuid;

use common::service;
use satsvault::domain::{encode_address, AddressType, KeyDerivationEngine};
use satsvault::service::btc_address_service::{
    qr_code_data, AddressServiceError, GenerateAddress, ImportAddress, SeedSource,
};

fn generate_request(user_id: Uuid) -> GenerateAddress {
    GenerateAddress {
        user_id,
        address_type: AddressType::NativeSegwit,
        label: None,
        derivation_path: None,
        seed_source: SeedSource::Fresh,
    }
}

#[tokio::test]
async fn test_generate_creates_wallet_with_first_address_as_primary() {
    let (service, store) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    let address = service.generate(generate_request(user_id)).await.unwrap();

    assert!(address.address.starts_with("bc1"));
    assert_eq!(address.derivation_path.as_deref(), Some("m/84'/0'/0'/0/0"));
    assert!(address.public_key.is_some());
    assert!(!address.is_imported);

    // 首地址成为钱包主地址
    let wallet = store.wallet_for_user(user_id).unwrap();
    assert_eq!(wallet.wallet_address, address.address);
    assert_eq!(wallet.wallet_status, "isActive");

    // 第二次生成不再新建钱包
    let second = service.generate(generate_request(user_id)).await.unwrap();
    let wallet_after = store.wallet_for_user(user_id).unwrap();
    assert_eq!(wallet_after.wallet_id, wallet.wallet_id);
    assert_eq!(wallet_after.wallet_address, address.address);
    assert_ne!(second.address, address.address);
}

#[tokio::test]
async fn test_generated_address_validates_with_same_type() {
    let (service, _) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    for address_type in [
        AddressType::Legacy,
        AddressType::Segwit,
        AddressType::NativeSegwit,
    ] {
        let address = service
            .generate(GenerateAddress {
                user_id,
                address_type,
                label: None,
                derivation_path: None,
                seed_source: SeedSource::Fresh,
            })
            .await
            .unwrap();

        let inspected = service.validate(&address.address);
        assert!(inspected.is_valid);
        assert_eq!(inspected.address_type, Some(address_type));
    }
}

#[tokio::test]
async fn test_generate_with_custom_derivation_path() {
    let (service, _) = service(Network::Bitcoin);

    let address = service
        .generate(GenerateAddress {
            user_id: Uuid::new_v4(),
            address_type: AddressType::NativeSegwit,
            label: Some("cold storage".to_string()),
            derivation_path: Some("m/84'/0'/0'/0/42".to_string()),
            seed_source: SeedSource::Fresh,
        })
        .await
        .unwrap();

    assert_eq!(address.derivation_path.as_deref(), Some("m/84'/0'/0'/0/42"));
    assert_eq!(address.label.as_deref(), Some("cold storage"));
}

#[tokio::test]
async fn test_qr_code_payload_format() {
    let (service, _) = service(Network::Bitcoin);
    let address = service
        .generate(generate_request(Uuid::new_v4()))
        .await
        .unwrap();

    assert_eq!(
        qr_code_data(&address.address),
        format!("bitcoin:{}", address.address)
    );
}

#[tokio::test]
async fn test_generate_multiple_sequential_indices() {
    let (service, store) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    let batch = service
        .generate_multiple(user_id, 5, AddressType::NativeSegwit, 10)
        .await
        .unwrap();

    assert_eq!(batch.addresses.len(), 5);
    for (i, address) in batch.addresses.iter().enumerate() {
        let expected_path = format!("m/84'/0'/0'/0/{}", 10 + i);
        assert_eq!(address.derivation_path.as_deref(), Some(expected_path.as_str()));
    }

    // 批内地址两两不同
    let mut unique: Vec<&str> = batch.addresses.iter().map(|a| a.address.as_str()).collect();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);

    // 助记词加密落库，派生索引推进到批次末尾
    let wallet = store.wallet_for_user(user_id).unwrap();
    assert!(wallet.encrypted_mnemonic.is_some());
    assert_eq!(wallet.next_address_index, 15);
}

#[tokio::test]
async fn test_generate_multiple_count_out_of_range_rejected() {
    let (service, store) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    let err = service
        .generate_multiple(user_id, 15, AddressType::NativeSegwit, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::InvalidBatchCount));

    let err = service
        .generate_multiple(user_id, 0, AddressType::NativeSegwit, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::InvalidBatchCount));

    // 拒绝发生在任何派生之前，不留半成品
    assert_eq!(store.address_count(), 0);
    assert!(store.wallet_for_user(user_id).is_none());
}

#[tokio::test]
async fn test_generate_from_wallet_seed_continues_after_batch() {
    let (service, store) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    service
        .generate_multiple(user_id, 3, AddressType::NativeSegwit, 0)
        .await
        .unwrap();

    // 从钱包种子继续：索引从批次末尾开始
    let next = service
        .generate(GenerateAddress {
            user_id,
            address_type: AddressType::NativeSegwit,
            label: None,
            derivation_path: None,
            seed_source: SeedSource::Wallet,
        })
        .await
        .unwrap();
    assert_eq!(next.derivation_path.as_deref(), Some("m/84'/0'/0'/0/3"));

    let after = service
        .generate(GenerateAddress {
            user_id,
            address_type: AddressType::NativeSegwit,
            label: None,
            derivation_path: None,
            seed_source: SeedSource::Wallet,
        })
        .await
        .unwrap();
    assert_eq!(after.derivation_path.as_deref(), Some("m/84'/0'/0'/0/4"));
    assert_ne!(after.address, next.address);

    assert_eq!(store.wallet_for_user(user_id).unwrap().next_address_index, 5);
}

#[tokio::test]
async fn test_generate_from_wallet_seed_without_stored_seed_rejected() {
    let (service, _) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    // 单个生成不存种子
    service.generate(generate_request(user_id)).await.unwrap();

    let err = service
        .generate(GenerateAddress {
            user_id,
            address_type: AddressType::NativeSegwit,
            label: None,
            derivation_path: None,
            seed_source: SeedSource::Wallet,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::NoStoredSeed));
}

#[tokio::test]
async fn test_import_and_duplicate_rejected() {
    let (service, store) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    let imported = service
        .import(ImportAddress {
            user_id,
            address: "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string(),
            private_key: None,
            label: Some("donations".to_string()),
            watch_only: true,
        })
        .await
        .unwrap();

    assert!(imported.is_imported);
    assert!(imported.derivation_path.is_none());
    assert_eq!(imported.address_type, AddressType::NativeSegwit);

    // 地址全局唯一：重复导入被拒绝且不产生写入
    let err = service
        .import(ImportAddress {
            user_id: Uuid::new_v4(),
            address: "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4".to_string(),
            private_key: None,
            label: None,
            watch_only: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::AddressAlreadyExists));
    assert_eq!(store.address_count(), 1);
}

#[tokio::test]
async fn test_import_watch_only_discards_private_key() {
    let (service, store) = service(Network::Bitcoin);

    let imported = service
        .import(ImportAddress {
            user_id: Uuid::new_v4(),
            address: "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string(),
            private_key: Some("deadbeef".repeat(8)),
            label: None,
            watch_only: true,
        })
        .await
        .unwrap();

    // watch_only ⟺ 无私钥
    assert!(imported.watch_only);
    assert!(imported.private_key.is_none());
    let stored = store.address(&imported.address).unwrap();
    assert!(stored.private_key.is_none());
}

#[tokio::test]
async fn test_import_without_private_key_requires_watch_only() {
    let (service, _) = service(Network::Bitcoin);

    let err = service
        .import(ImportAddress {
            user_id: Uuid::new_v4(),
            address: "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa".to_string(),
            private_key: None,
            label: None,
            watch_only: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::MissingPrivateKey));
}

#[tokio::test]
async fn test_import_invalid_address_rejected() {
    let (service, store) = service(Network::Bitcoin);

    let err = service
        .import(ImportAddress {
            user_id: Uuid::new_v4(),
            address: "thisisnotabitcoinaddressatall".to_string(),
            private_key: None,
            label: None,
            watch_only: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::InvalidAddress));
    assert_eq!(store.address_count(), 0);
}

#[tokio::test]
async fn test_get_details_joins_wallet() {
    let (service, _) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    let generated = service.generate(generate_request(user_id)).await.unwrap();

    let (address, wallet) = service.get_details(&generated.address).await.unwrap();
    assert_eq!(address.address_id, generated.address_id);
    assert_eq!(wallet.user_id, user_id);
    assert_eq!(wallet.wallet_status, "isActive");

    let err = service
        .get_details("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4")
        .await
        .unwrap_err();
    assert!(matches!(err, AddressServiceError::AddressNotFound));
}

#[tokio::test]
async fn test_reveal_mnemonic_only_once_and_rederives_batch() {
    let (service, _) = service(Network::Bitcoin);
    let user_id = Uuid::new_v4();

    let batch = service
        .generate_multiple(user_id, 2, AddressType::NativeSegwit, 0)
        .await
        .unwrap();

    let (wallet_id, phrase) = service.reveal_mnemonic(user_id).await.unwrap();
    assert_eq!(wallet_id, batch.wallet.wallet_id);
    assert_eq!(phrase.split_whitespace().count(), 12);

    // 导出的助记词能复现批次首地址
    let engine = KeyDerivationEngine::new(Network::Bitcoin);
    let mnemonic = engine.parse_mnemonic(&phrase).unwrap();
    let key = engine.derive(&mnemonic, "m/84'/0'/0'/0/0").unwrap();
    let encoded =
        encode_address(&key.public_key, AddressType::NativeSegwit, Network::Bitcoin).unwrap();
    assert_eq!(encoded.address, batch.addresses[0].address);

    // 二次导出被拒绝
    let err = service.reveal_mnemonic(user_id).await.unwrap_err();
    assert!(matches!(err, AddressServiceError::MnemonicAlreadyRevealed));
}

#[tokio::test]
async fn test_reveal_mnemonic_error_cases() {
    let (service, _) = service(Network::Bitcoin);

    // 未知用户
    let err = service.reveal_mnemonic(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AddressServiceError::WalletNotFound));

    // 有钱包但没有存储种子（单个生成）
    let user_id = Uuid::new_v4();
    service.generate(generate_request(user_id)).await.unwrap();
    let err = service.reveal_mnemonic(user_id).await.unwrap_err();
    assert!(matches!(err, AddressServiceError::NoStoredSeed));
}

#[tokio::test]
async fn test_testnet_network_paths_and_prefixes() {
    let (service, _) = service(Network::Testnet);

    let address = service
        .generate(generate_request(Uuid::new_v4()))
        .await
        .unwrap();

    assert!(address.address.starts_with("tb1"));
    assert_eq!(address.derivation_path.as_deref(), Some("m/84'/1'/0'/0/0"));

    let inspected = service.validate(&address.address);
    assert!(inspected.is_valid);
    assert_eq!(
        inspected.network,
        satsvault::domain::InferredNetwork::Testnet
    );
}
