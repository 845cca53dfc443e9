//! 密钥派生引擎
//!
//! 从 BIP39 助记词生成种子，按 BIP32 层级路径派生地址密钥

use anyhow::{Context, Result};
use bip39::{Language, Mnemonic};
use bitcoin::Network;
use coins_bip32::path::DerivationPath;

use crate::domain::address_encoder::AddressType;

/// 派生结果
#[derive(Debug, Clone)]
pub struct DerivedKey {
    /// 压缩公钥（33 字节）
    pub public_key: Vec<u8>,
    /// 私钥（32 字节，仅用于加密存储）
    pub private_key: Vec<u8>,
}

/// 密钥派生引擎
///
/// 网络参数在构造时注入，调用过程中不读取任何全局状态，
/// 因此同一进程内所有派生共享同一网络
#[derive(Debug, Clone, Copy)]
pub struct KeyDerivationEngine {
    network: Network,
}

impl KeyDerivationEngine {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// 生成新的 12 词 BIP39 助记词（128 位系统熵）
    pub fn generate_mnemonic(&self) -> Result<Mnemonic> {
        use rand::RngCore;

        let mut entropy = [0u8; 16];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        Mnemonic::from_entropy_in(Language::English, &entropy)
            .context("Failed to generate mnemonic")
    }

    /// 解析已有助记词
    pub fn parse_mnemonic(&self, phrase: &str) -> Result<Mnemonic> {
        Mnemonic::parse_in(Language::English, phrase).context("Invalid mnemonic")
    }

    /// 按地址类型构造默认派生路径
    ///
    /// purpose: legacy=44' / segwit=49' / native_segwit=84'，
    /// coin type: 主网 0' / 测试网 1'，account 固定 0'，change 固定 0
    pub fn default_path(&self, address_type: AddressType, index: u32) -> String {
        let purpose = match address_type {
            AddressType::Legacy => 44,
            AddressType::Segwit => 49,
            AddressType::NativeSegwit => 84,
        };
        format!("m/{}'/{}'/0'/0/{}", purpose, self.coin_type(), index)
    }

    /// BIP44 coin type
    pub fn coin_type(&self) -> u32 {
        match self.network {
            Network::Bitcoin => 0,
            _ => 1,
        }
    }

    /// 从助记词种子在指定路径派生密钥
    pub fn derive(&self, mnemonic: &Mnemonic, path: &str) -> Result<DerivedKey> {
        use coins_bip32::prelude::*;
        use k256::ecdsa::SigningKey;

        // 生成种子
        let seed = mnemonic.to_seed("");

        // 解析派生路径
        let derivation_path = path
            .parse::<DerivationPath>()
            .context("Invalid derivation path")?;

        // 从种子派生密钥
        let master_key =
            XPriv::root_from_seed(&seed, None).context("Failed to derive master key")?;

        let derived_key = master_key
            .derive_path(&derivation_path)
            .context("Failed to derive key")?;

        // XPriv 实现 AsRef<SigningKey>
        let signing_key: &SigningKey = derived_key.as_ref();
        let private_key_bytes = signing_key.to_bytes();
        let verifying_key = signing_key.verifying_key();
        let public_key_bytes = verifying_key.to_encoded_point(true); // 压缩格式

        Ok(DerivedKey {
            public_key: public_key_bytes.as_bytes().to_vec(),
            private_key: private_key_bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_default_path_by_address_type() {
        let engine = KeyDerivationEngine::new(Network::Bitcoin);
        assert_eq!(engine.default_path(AddressType::Legacy, 0), "m/44'/0'/0'/0/0");
        assert_eq!(engine.default_path(AddressType::Segwit, 0), "m/49'/0'/0'/0/0");
        assert_eq!(
            engine.default_path(AddressType::NativeSegwit, 7),
            "m/84'/0'/0'/0/7"
        );

        let testnet = KeyDerivationEngine::new(Network::Testnet);
        assert_eq!(
            testnet.default_path(AddressType::NativeSegwit, 0),
            "m/84'/1'/0'/0/0"
        );
    }

    #[test]
    fn test_bip84_test_vector() {
        // BIP84 标准测试向量：第一个接收地址的公钥
        let engine = KeyDerivationEngine::new(Network::Bitcoin);
        let mnemonic = engine.parse_mnemonic(TEST_MNEMONIC).unwrap();

        let key = engine.derive(&mnemonic, "m/84'/0'/0'/0/0").unwrap();

        assert_eq!(
            hex::encode(&key.public_key),
            "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c"
        );
        assert_eq!(key.private_key.len(), 32);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let engine = KeyDerivationEngine::new(Network::Bitcoin);
        let mnemonic = engine.parse_mnemonic(TEST_MNEMONIC).unwrap();

        let a = engine.derive(&mnemonic, "m/44'/0'/0'/0/3").unwrap();
        let b = engine.derive(&mnemonic, "m/44'/0'/0'/0/3").unwrap();
        assert_eq!(a.public_key, b.public_key);

        let c = engine.derive(&mnemonic, "m/44'/0'/0'/0/4").unwrap();
        assert_ne!(a.public_key, c.public_key);
    }

    #[test]
    fn test_invalid_mnemonic_rejected() {
        let engine = KeyDerivationEngine::new(Network::Testnet);
        assert!(engine.parse_mnemonic("not a valid mnemonic phrase").is_err());
    }

    #[test]
    fn test_malformed_path_rejected() {
        let engine = KeyDerivationEngine::new(Network::Testnet);
        let mnemonic = engine.parse_mnemonic(TEST_MNEMONIC).unwrap();
        assert!(engine.derive(&mnemonic, "m/not/a/path").is_err());
    }

    #[test]
    fn test_generated_mnemonic_is_twelve_words() {
        let engine = KeyDerivationEngine::new(Network::Testnet);
        let mnemonic = engine.generate_mnemonic().unwrap();
        assert_eq!(mnemonic.word_count(), 12);
    }
}
