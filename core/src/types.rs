//! Core type definitions for the swapper
//!
//! Uses alloy-primitives for Ethereum-compatible types.

pub use alloy_primitives::{Address, B256, U256};

/// 32-byte hash (Keccak256 output)
pub type Hash = B256;

/// Storage slot key
pub type Slot = U256;

/// Wei amount (for clarity in value transfers)
pub type Wei = U256;

/// Token amount in the token's smallest unit
pub type TokenAmount = U256;

/// One unit of a 18-decimals asset (1 ether in wei)
pub const ONE_ETHER: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Encode an address as a right-aligned storage word
pub fn address_to_word(address: Address) -> U256 {
    U256::from_be_bytes(address.into_word().0)
}

/// Decode a right-aligned storage word back into an address
///
/// The upper 12 bytes are ignored.
pub fn word_to_address(word: U256) -> Address {
    let bytes = word.to_be_bytes::<32>();
    Address::from_slice(&bytes[12..])
}
