//! Configuration layout shared by every logic implementation
//!
//! Slots 0..=3 belong to the swapper configuration. Any future logic version
//! must keep these slots and their meaning unchanged.

use crate::storage::ProxyStorage;
use crate::types::{Address, Slot};
use alloy_primitives::uint;
use serde::{Deserialize, Serialize};

/// One-shot initialization flag
pub const INITIALIZED: Slot = uint!(0_U256);

/// Market (router) address passed to `initialize`
pub const MARKET_REGISTRY: Slot = uint!(1_U256);

/// Factory reported by the market at initialization
pub const MARKET_FACTORY: Slot = uint!(2_U256);

/// Wrapped native token used as the trading pivot
pub const REFERENCE_ASSET: Slot = uint!(3_U256);

/// Decoded swapper configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapperState {
    pub initialized: bool,
    pub market_registry: Address,
    pub market_factory: Address,
    pub reference_asset: Address,
}

impl SwapperState {
    /// Configuration as written by a successful `initialize`
    pub fn configured(
        market_registry: Address,
        market_factory: Address,
        reference_asset: Address,
    ) -> Self {
        Self {
            initialized: true,
            market_registry,
            market_factory,
            reference_asset,
        }
    }

    /// Read the configuration out of storage
    pub fn load(storage: &ProxyStorage) -> Self {
        Self {
            initialized: storage.get_bool(&INITIALIZED),
            market_registry: storage.get_address(&MARKET_REGISTRY),
            market_factory: storage.get_address(&MARKET_FACTORY),
            reference_asset: storage.get_address(&REFERENCE_ASSET),
        }
    }

    /// Write the configuration into storage
    pub fn store(&self, storage: &mut ProxyStorage) {
        storage.set_bool(INITIALIZED, self.initialized);
        storage.set_address(MARKET_REGISTRY, self.market_registry);
        storage.set_address(MARKET_FACTORY, self.market_factory);
        storage.set_address(REFERENCE_ASSET, self.reference_asset);
    }

    pub fn is_initialized(storage: &ProxyStorage) -> bool {
        storage.get_bool(&INITIALIZED)
    }
}
