//! 世界状态键

use alloy_primitives::{Address, U256};

/// 账户键：小写十六进制地址（40 字符）
pub fn account_key(address: &Address) -> String {
    hex::encode(address)
}

/// 存储槽键：账户键 + 64 字符小写十六进制槽位
pub fn storage_key(address: &Address, slot: U256) -> String {
    let mut key = account_key(address);
    key.push_str(&hex::encode(slot.to_be_bytes::<32>()));
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_keys_are_lowercase_and_disjoint() {
        let addr = address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");

        let key = account_key(&addr);
        assert_eq!(key, "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");

        let slot = storage_key(&addr, U256::from(1));
        assert_eq!(slot.len(), 40 + 64);
        assert!(slot.starts_with(&key));
        assert!(slot.ends_with("01"));
    }
}
