//! 领域层：密钥派生与地址编码

pub mod address_encoder;
pub mod derivation;

pub use address_encoder::{encode_address, inspect_address, AddressType, InferredNetwork};
pub use derivation::{DerivedKey, KeyDerivationEngine};
