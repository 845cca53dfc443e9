//! AES-256-GCM 加密/解密模块
//! 用于助记词等敏感数据的加密存储

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// 加密数据
///
/// 返回 nonce (12字节) || ciphertext
pub fn encrypt_data(data: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| anyhow!("Invalid key: {}", e))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| anyhow!("Encryption failed: {}", e))?;

    let mut result = nonce.to_vec();
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// 解密数据（输入为 nonce || ciphertext）
pub fn decrypt_data(encrypted: &[u8], key: &EncryptionKey) -> Result<Vec<u8>> {
    if encrypted.len() < 12 {
        return Err(anyhow!("Encrypted data too short"));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| anyhow!("Invalid key: {}", e))?;

    let nonce = Nonce::from_slice(&encrypted[..12]);
    let ciphertext = &encrypted[12..];

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| anyhow!("Decryption failed: {}", e))
}

/// 加密密钥（Zeroize 保护）
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    key: [u8; 32],
}

impl EncryptionKey {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.key
    }

    /// 从配置值构造密钥
    ///
    /// 64 位 hex 字符串直接解码；其余情况要求至少 32 字符并做 SHA-256 规约
    pub fn from_config(value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(anyhow!("Encryption key is empty"));
        }

        if value.len() == 64 {
            if let Ok(decoded) = hex::decode(value) {
                let mut key = [0u8; 32];
                key.copy_from_slice(&decoded);
                return Ok(Self::new(key));
            }
        }

        if value.len() < 32 {
            return Err(anyhow!("Encryption key must be at least 32 characters"));
        }

        let digest = Sha256::digest(value.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Ok(Self::new(key))
    }
}
