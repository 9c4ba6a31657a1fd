//! Slot-addressed proxy storage
//!
//! The storage unit outlives any logic implementation: logic code only ever
//! receives a reference to it. Uses BTreeMap for deterministic iteration order.

use crate::errors::Result;
use crate::hashing::hash_struct;
use crate::types::{address_to_word, word_to_address, Address, Hash, Slot, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Word storage keyed by slot
///
/// Unset slots read as zero; writing zero clears the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyStorage {
    /// Storage slots (key -> value)
    slots: BTreeMap<Slot, U256>,
}

impl ProxyStorage {
    /// Create a new empty storage unit
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a storage slot value
    pub fn set_storage(&mut self, slot: Slot, value: U256) {
        if value.is_zero() {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, value);
        }
    }

    /// Get a storage slot value
    pub fn get_storage(&self, slot: &Slot) -> U256 {
        self.slots.get(slot).copied().unwrap_or(U256::ZERO)
    }

    /// Store an address as a right-aligned word
    pub fn set_address(&mut self, slot: Slot, address: Address) {
        self.set_storage(slot, address_to_word(address));
    }

    /// Read an address slot
    pub fn get_address(&self, slot: &Slot) -> Address {
        word_to_address(self.get_storage(slot))
    }

    /// Store a boolean flag
    pub fn set_bool(&mut self, slot: Slot, value: bool) {
        self.set_storage(slot, U256::from(value as u8));
    }

    /// Read a boolean flag
    pub fn get_bool(&self, slot: &Slot) -> bool {
        !self.get_storage(slot).is_zero()
    }

    /// Number of non-zero slots
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterate non-zero slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&Slot, &U256)> {
        self.slots.iter()
    }

    /// Compute a commitment to the full slot contents
    pub fn compute_storage_root(&self) -> Hash {
        hash_struct(&self.slots)
    }

    /// Encode storage as a compact binary snapshot
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode storage from a binary snapshot
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}
