//! 地址编码器
//!
//! (公钥, 地址类型, 网络) → 链上地址字符串，纯函数，无持久化副作用

use anyhow::{Context, Result};
use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network, PublicKey};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 地址类型，对应 BIP44/49/84 三种编码
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Legacy,
    Segwit,
    #[default]
    NativeSegwit,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Legacy => "legacy",
            AddressType::Segwit => "segwit",
            AddressType::NativeSegwit => "native_segwit",
        }
    }
}

impl std::str::FromStr for AddressType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "legacy" => Ok(AddressType::Legacy),
            "segwit" => Ok(AddressType::Segwit),
            "native_segwit" => Ok(AddressType::NativeSegwit),
            other => anyhow::bail!("Unknown address type: {}", other),
        }
    }
}

impl std::fmt::Display for AddressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 从地址前缀推断的网络
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InferredNetwork {
    Mainnet,
    Testnet,
    Unknown,
}

/// 编码结果：地址字符串 + 内部编码标签
#[derive(Debug, Clone)]
pub struct EncodedAddress {
    pub address: String,
    pub encoding: &'static str,
}

/// 将压缩公钥编码为指定类型的 Bitcoin 地址
pub fn encode_address(
    public_key: &[u8],
    address_type: AddressType,
    network: Network,
) -> Result<EncodedAddress> {
    let secp_pubkey = bitcoin::secp256k1::PublicKey::from_slice(public_key)
        .context("Invalid secp256k1 public key")?;
    let pubkey = PublicKey::new(secp_pubkey);

    let (address, encoding) = match address_type {
        AddressType::Legacy => (Address::p2pkh(&pubkey, network).to_string(), "P2PKH"),
        AddressType::Segwit => (
            Address::p2shwpkh(&pubkey, network)
                .context("Failed to create P2SH-P2WPKH address")?
                .to_string(),
            "P2SH-P2WPKH",
        ),
        AddressType::NativeSegwit => (
            Address::p2wpkh(&pubkey, network)
                .context("Failed to create P2WPKH address")?
                .to_string(),
            "P2WPKH",
        ),
    };

    Ok(EncodedAddress { address, encoding })
}

/// 地址解析结果
#[derive(Debug, Clone)]
pub struct InspectedAddress {
    pub is_valid: bool,
    pub address_type: Option<AddressType>,
    pub network: InferredNetwork,
}

impl InspectedAddress {
    fn invalid() -> Self {
        Self {
            is_valid: false,
            address_type: None,
            network: InferredNetwork::Unknown,
        }
    }
}

/// 解析地址字符串并推断类型与网络
///
/// 永不失败：格式错误的输入返回 is_valid=false
pub fn inspect_address(address: &str) -> InspectedAddress {
    let parsed = match address.parse::<Address<NetworkUnchecked>>() {
        Ok(parsed) => parsed.assume_checked(),
        Err(_) => return InspectedAddress::invalid(),
    };

    let address_type = match parsed.address_type() {
        Some(bitcoin::AddressType::P2pkh) => Some(AddressType::Legacy),
        Some(bitcoin::AddressType::P2sh) => Some(AddressType::Segwit),
        Some(bitcoin::AddressType::P2wpkh) | Some(bitcoin::AddressType::P2wsh) => {
            Some(AddressType::NativeSegwit)
        }
        _ => None,
    };

    let network = if address.starts_with("bc1") {
        InferredNetwork::Mainnet
    } else if address.starts_with("tb1") {
        InferredNetwork::Testnet
    } else {
        InferredNetwork::Unknown
    };

    InspectedAddress {
        is_valid: true,
        address_type,
        network,
    }
}
