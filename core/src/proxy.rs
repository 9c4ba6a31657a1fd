//! Upgradeable proxy
//!
//! Owns the storage unit and forwards every call to the current logic. Proxy
//! bookkeeping (admin, implementation id) sits in EIP-1967 slots, far away
//! from the configuration layout the logic uses.
//!
//! State-changing calls are atomic: storage, ledger and market are restored
//! when the delegated call fails.

use crate::engine::{Environment, SwapEngine, SwapperLogic};
use crate::errors::{Result, SwapperError};
use crate::hashing::hash_concat;
use crate::ledger::Ledger;
use crate::market::Market;
use crate::receipt::{Quote, SwapReceipt};
use crate::request::{CallContext, SwapRequest};
use crate::state::SwapperState;
use crate::storage::ProxyStorage;
use crate::types::{Address, Hash, Slot, TokenAmount, U256};
use alloy_primitives::uint;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// `keccak256("eip1967.proxy.implementation") - 1`
pub const IMPLEMENTATION_SLOT: Slot =
    uint!(0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc_U256);

/// `keccak256("eip1967.proxy.admin") - 1`
pub const ADMIN_SLOT: Slot =
    uint!(0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103_U256);

pub struct SwapperProxy {
    address: Address,
    storage: ProxyStorage,
    implementation: Arc<dyn SwapperLogic>,
}

impl SwapperProxy {
    /// Proxy with fresh storage; `initialize` must be called before use
    pub fn new(address: Address, admin: Address, logic: Arc<dyn SwapperLogic>) -> Self {
        let mut storage = ProxyStorage::new();
        storage.set_address(ADMIN_SLOT, admin);
        storage.set_storage(
            IMPLEMENTATION_SLOT,
            U256::from_be_bytes(logic.implementation_id().0),
        );
        Self {
            address,
            storage,
            implementation: logic,
        }
    }

    /// Deploy and initialize in one step
    pub fn deploy(
        address: Address,
        admin: Address,
        logic: Arc<dyn SwapperLogic>,
        market: &dyn Market,
    ) -> Result<Self> {
        let mut proxy = Self::new(address, admin, logic);
        proxy.initialize(market)?;
        Ok(proxy)
    }

    /// Reattach existing storage to its logic
    ///
    /// Fails if the storage records a different implementation.
    pub fn from_parts(
        address: Address,
        storage: ProxyStorage,
        logic: Arc<dyn SwapperLogic>,
    ) -> Result<Self> {
        let recorded = Hash::from(storage.get_storage(&IMPLEMENTATION_SLOT).to_be_bytes::<32>());
        let expected = logic.implementation_id();
        if recorded != expected {
            return Err(SwapperError::ImplementationMismatch { recorded, expected });
        }
        Ok(Self {
            address,
            storage,
            implementation: logic,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn storage(&self) -> &ProxyStorage {
        &self.storage
    }

    pub fn admin(&self) -> Address {
        self.storage.get_address(&ADMIN_SLOT)
    }

    /// Implementation id recorded in storage
    pub fn implementation(&self) -> Hash {
        Hash::from(self.storage.get_storage(&IMPLEMENTATION_SLOT).to_be_bytes::<32>())
    }

    pub fn logic(&self) -> &dyn SwapperLogic {
        self.implementation.as_ref()
    }

    /// Decoded configuration
    pub fn state(&self) -> SwapperState {
        SwapperState::load(&self.storage)
    }

    pub fn is_initialized(&self) -> bool {
        SwapperState::is_initialized(&self.storage)
    }

    pub fn initialize(&mut self, market: &dyn Market) -> Result<()> {
        let logic = Arc::clone(&self.implementation);
        let snapshot = self.storage.clone();
        logic.initialize(&mut self.storage, market).map_err(|err| {
            self.storage = snapshot;
            SwapperError::from(err)
        })
    }

    pub fn is_token_swappable(&self, market: &dyn Market, token: Address) -> Result<bool> {
        self.ensure_market(market)?;
        Ok(self
            .implementation
            .is_token_swappable(&self.storage, market, token))
    }

    pub fn get_amounts_out(
        &self,
        market: &dyn Market,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Result<Quote> {
        self.ensure_market(market)?;
        Ok(self
            .implementation
            .get_amounts_out(&self.storage, market, amount_in, path))
    }

    /// Swap the value attached to `ctx` into `token`, delivered to the caller
    pub fn swap_ether_to_token<M: Market + Clone>(
        &mut self,
        market: &mut M,
        ledger: &mut Ledger,
        ctx: CallContext,
        token: Address,
        minimum_output: TokenAmount,
    ) -> Result<SwapReceipt> {
        self.ensure_market(&*market)?;

        let storage_snapshot = self.storage.clone();
        let market_snapshot = market.clone();
        let ledger_snapshot = ledger.clone();

        let result = self.delegate_swap(&mut *market, &mut *ledger, ctx, token, minimum_output);
        if result.is_err() {
            self.storage = storage_snapshot;
            *market = market_snapshot;
            *ledger = ledger_snapshot;
        }
        result
    }

    fn delegate_swap(
        &mut self,
        market: &mut dyn Market,
        ledger: &mut Ledger,
        ctx: CallContext,
        token: Address,
        minimum_output: TokenAmount,
    ) -> Result<SwapReceipt> {
        ledger.transfer_native(ctx.caller, self.address, ctx.value)?;

        let request = SwapRequest::from_call(&ctx, token, minimum_output);
        let env = Environment {
            this: self.address,
            market,
            ledger,
        };
        let logic = Arc::clone(&self.implementation);
        Ok(logic.swap_ether_to_token(&mut self.storage, env, &request)?)
    }

    /// Replace the logic; storage is left untouched apart from the
    /// implementation slot
    pub fn upgrade_to(&mut self, caller: Address, logic: Arc<dyn SwapperLogic>) -> Result<()> {
        let admin = self.admin();
        if caller != admin {
            return Err(SwapperError::Unauthorized { caller, admin });
        }

        let previous = self.implementation();
        let next = logic.implementation_id();
        self.storage
            .set_storage(IMPLEMENTATION_SLOT, U256::from_be_bytes(next.0));
        self.implementation = logic;

        info!(
            proxy = %self.address,
            %previous,
            %next,
            name = self.implementation.name(),
            version = self.implementation.version(),
            "proxy upgraded"
        );
        Ok(())
    }

    pub fn get_reference_asset(&self) -> Address {
        self.implementation.reference_asset(&self.storage)
    }

    pub fn get_market_registry(&self) -> Address {
        self.implementation.market_registry(&self.storage)
    }

    pub fn get_market_address(&self) -> Address {
        self.implementation.market_address(&self.storage)
    }

    pub fn get_market_factory(&self) -> Address {
        self.implementation.market_factory(&self.storage)
    }

    /// Calls must reach an initialized proxy through the market it was configured with
    fn ensure_market(&self, market: &dyn Market) -> Result<()> {
        if !self.is_initialized() {
            return Err(SwapperError::NotInitialized);
        }
        let expected = self.get_market_registry();
        if market.address() != expected {
            return Err(SwapperError::UnknownMarket {
                expected,
                actual: market.address(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for SwapperProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapperProxy")
            .field("address", &self.address)
            .field("storage", &self.storage)
            .field(
                "implementation",
                &format_args!("{}@{}", self.implementation.name(), self.implementation.version()),
            )
            .finish()
    }
}

/// Builder for deploying a proxy
pub struct DeploymentBuilder {
    address: Option<Address>,
    admin: Address,
    logic: Arc<dyn SwapperLogic>,
}

impl DeploymentBuilder {
    /// Create a new builder using the current swap logic
    pub fn new() -> Self {
        Self {
            address: None,
            admin: Address::ZERO,
            logic: Arc::new(SwapEngine::new()),
        }
    }

    /// Set the proxy address; defaults to one derived from the admin
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Set the upgrade admin
    pub fn with_admin(mut self, admin: Address) -> Self {
        self.admin = admin;
        self
    }

    /// Set the logic implementation
    pub fn with_logic(mut self, logic: Arc<dyn SwapperLogic>) -> Self {
        self.logic = logic;
        self
    }

    /// Proxy address this builder will deploy at
    pub fn address(&self) -> Address {
        self.address.unwrap_or_else(|| {
            Address::from_word(hash_concat(&[self.admin.as_slice(), b"ether-swapper.proxy"]))
        })
    }

    /// Deploy without initializing
    pub fn build(self) -> SwapperProxy {
        SwapperProxy::new(self.address(), self.admin, self.logic)
    }

    /// Deploy and initialize against `market`
    pub fn deploy(self, market: &dyn Market) -> Result<SwapperProxy> {
        SwapperProxy::deploy(self.address(), self.admin, self.logic, market)
    }
}

impl Default for DeploymentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
