//! Hashing utilities for the swapper
//!
//! Keccak256 for proxy slot derivation, pair addresses and storage roots.

use crate::types::{Address, Hash, Slot, B256, U256};
use sha3::{Digest, Keccak256};

/// Compute Keccak256 hash of arbitrary data
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    B256::from_slice(&hasher.finalize())
}

/// Hash a serializable struct
///
/// Uses bincode for deterministic serialization before hashing.
pub fn hash_struct<T: serde::Serialize>(value: &T) -> Hash {
    let bytes = bincode::serialize(value).expect("serialization should not fail");
    keccak256(&bytes)
}

/// Hash multiple values together
///
/// Concatenates all byte slices and hashes the result.
pub fn hash_concat(values: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for value in values {
        hasher.update(value);
    }
    B256::from_slice(&hasher.finalize())
}

/// Derive an EIP-1967 style slot: `keccak256(label) - 1`
///
/// The subtraction keeps the slot out of reach of any known preimage.
pub fn eip1967_slot(label: &str) -> Slot {
    U256::from_be_bytes(keccak256(label.as_bytes()).0) - U256::from(1u8)
}

/// Deterministic pair address for two tokens under a factory
///
/// Token order does not matter.
pub fn pair_address(factory: Address, token_a: Address, token_b: Address) -> Address {
    let (token0, token1) = sort_tokens(token_a, token_b);
    let salt = hash_concat(&[token0.as_slice(), token1.as_slice()]);
    let hash = hash_concat(&[&[0xffu8], factory.as_slice(), salt.as_slice()]);
    Address::from_word(hash)
}

/// Order two tokens the way pair keys are stored
pub fn sort_tokens(token_a: Address, token_b: Address) -> (Address, Address) {
    if token_a < token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak256_empty() {
        let hash = keccak256(&[]);
        assert_eq!(
            hex::encode(hash),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_eip1967_implementation_slot() {
        let slot = eip1967_slot("eip1967.proxy.implementation");
        assert_eq!(
            hex::encode(slot.to_be_bytes::<32>()),
            "360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc"
        );
    }

    #[test]
    fn test_eip1967_admin_slot() {
        let slot = eip1967_slot("eip1967.proxy.admin");
        assert_eq!(
            hex::encode(slot.to_be_bytes::<32>()),
            "b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103"
        );
    }

    #[test]
    fn test_pair_address_order_independent() {
        let factory = Address::repeat_byte(0xFA);
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);

        assert_eq!(pair_address(factory, a, b), pair_address(factory, b, a));
        assert_ne!(pair_address(factory, a, b), Address::ZERO);
    }

    #[test]
    fn test_pair_address_depends_on_factory() {
        let a = Address::repeat_byte(0x01);
        let b = Address::repeat_byte(0x02);

        assert_ne!(
            pair_address(Address::repeat_byte(0xFA), a, b),
            pair_address(Address::repeat_byte(0xFB), a, b)
        );
    }

    #[test]
    fn test_hash_struct() {
        #[derive(serde::Serialize)]
        struct TestStruct {
            a: u64,
            b: u64,
        }

        let s1 = TestStruct { a: 1, b: 2 };
        let s2 = TestStruct { a: 1, b: 2 };
        let s3 = TestStruct { a: 2, b: 1 };

        assert_eq!(hash_struct(&s1), hash_struct(&s2));
        assert_ne!(hash_struct(&s1), hash_struct(&s3));
    }

    #[test]
    fn test_hash_concat() {
        let h1 = hash_concat(&[b"hello", b"world"]);
        let h2 = keccak256(b"helloworld");
        assert_eq!(h1, h2);
    }
}
