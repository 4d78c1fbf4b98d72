//! 地址推导
//!
//! 调用者凭证 -> 账户地址，以及 (创建者, nonce) -> 合约地址。
//! 两个推导都是纯函数：相同输入必然得到相同地址，部署前即可预测合约地址。

use alloy_primitives::{keccak256, Address, B256};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// 地址解析错误
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("caller credential unavailable: {0}")]
    Credential(String),

    #[error("empty caller credential")]
    EmptyCredential,
}

/// 地址解析器
pub trait AddressResolver {
    /// 将调用者凭证转换为账户地址
    fn identity_to_address(&self, credential: &[u8]) -> Result<Address, ResolveError>;

    /// 计算新合约地址
    fn new_contract_address(&self, caller: &Address, nonce: &B256) -> Address {
        contract_address(caller, nonce)
    }
}

/// 默认解析器：keccak256(凭证) 的后 20 字节
#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakResolver;

impl AddressResolver for KeccakResolver {
    fn identity_to_address(&self, credential: &[u8]) -> Result<Address, ResolveError> {
        if credential.is_empty() {
            return Err(ResolveError::EmptyCredential);
        }
        Ok(Address::from_word(keccak256(credential)))
    }
}

/// 交易 nonce：sha256(tx_id || caller)
///
/// 不持久化、不递增，同一交易内可重复计算
pub fn tx_nonce(caller: &Address, tx_id: &str) -> B256 {
    let mut hasher = Sha256::new();
    hasher.update(tx_id.as_bytes());
    hasher.update(caller.as_slice());
    B256::from_slice(&hasher.finalize())
}

/// 合约地址：keccak256(caller || nonce) 的后 20 字节
pub fn contract_address(caller: &Address, nonce: &B256) -> Address {
    let mut buf = [0u8; 52];
    buf[..20].copy_from_slice(caller.as_slice());
    buf[20..].copy_from_slice(nonce.as_slice());
    Address::from_word(keccak256(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_identity_to_address() {
        let resolver = KeccakResolver;
        let a = resolver.identity_to_address(b"Org1MSP:user1").unwrap();
        let b = resolver.identity_to_address(b"Org1MSP:user1").unwrap();
        let c = resolver.identity_to_address(b"Org1MSP:user2").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(matches!(
            resolver.identity_to_address(b""),
            Err(ResolveError::EmptyCredential)
        ));
    }

    #[test]
    fn test_nonce_deterministic() {
        let caller = address!("0742d35Cc6634C0532925a3b844Bc9e7595f0bEb");
        let other = address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

        assert_eq!(tx_nonce(&caller, "tx-1"), tx_nonce(&caller, "tx-1"));
        assert_ne!(tx_nonce(&caller, "tx-1"), tx_nonce(&caller, "tx-2"));
        assert_ne!(tx_nonce(&caller, "tx-1"), tx_nonce(&other, "tx-1"));
    }

    #[test]
    fn test_contract_address_deterministic() {
        let caller = address!("0742d35Cc6634C0532925a3b844Bc9e7595f0bEb");
        let nonce = tx_nonce(&caller, "tx-1");

        let first = KeccakResolver.new_contract_address(&caller, &nonce);
        let second = contract_address(&caller, &nonce);
        assert_eq!(first, second);
        assert_ne!(first, Address::ZERO);

        let other_nonce = tx_nonce(&caller, "tx-2");
        assert_ne!(first, contract_address(&caller, &other_nonce));
    }
}
