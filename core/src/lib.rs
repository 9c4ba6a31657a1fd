//! # Ether Swapper Core
//!
//! Upgradeable swapper that converts native value into a chosen token through
//! an external exchange router.
//!
//! It is designed to:
//! - **Reject tokens without a market** before touching the router
//! - **Tell empty markets apart from slippage**: each has its own error
//! - **Survive logic upgrades**: configuration lives in proxy storage, not in
//!   the logic
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  SwapperProxy   │ ── storage, admin, implementation slot
//! └────────┬────────┘
//!          │ delegates (&mut ProxyStorage)
//!          ▼
//! ┌─────────────────┐
//! │   SwapEngine    │ ── swappable? → quote → liquidity → slippage → fill
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  MarketOracle   │ ── missing market = false, failed quote = 0
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  dyn Market     │ ── router + factory (constant-product or scripted)
//! └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ether_swapper_core::prelude::*;
//!
//! let mut proxy = DeploymentBuilder::new().with_admin(admin).deploy(&market)?;
//!
//! let quote = proxy.get_amounts_out(&market, ONE_ETHER, &[weth, token])?;
//! let receipt = proxy.swap_ether_to_token(
//!     &mut market,
//!     &mut ledger,
//!     CallContext::new(trader).with_value(ONE_ETHER),
//!     token,
//!     quote.amount_out(),
//! )?;
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (Address, Hash, U256)
//! - [`errors`] - Error types and Result alias
//! - [`hashing`] - Keccak256, proxy slots and pair addresses
//! - [`storage`] - Slot-addressed proxy storage
//! - [`state`] - Configuration layout
//! - [`ledger`] - Native and token balances
//! - [`market`] - Router capability and its implementations
//! - [`oracle`] - Swappability and quoting conventions
//! - [`request`] / [`receipt`] - Per-call input and output types
//! - [`engine`] - Swap logic
//! - [`proxy`] - Upgradeable proxy

pub mod engine;
pub mod errors;
pub mod hashing;
pub mod ledger;
pub mod market;
pub mod oracle;
pub mod proxy;
pub mod receipt;
pub mod request;
pub mod state;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use engine::{Environment, SwapEngine, SwapEngineV2, SwapperLogic};
pub use errors::{LedgerError, MarketError, Result, SwapError, SwapperError};
pub use hashing::{eip1967_slot, keccak256, pair_address};
pub use ledger::Ledger;
pub use market::{ConstantProductMarket, Market, ScriptedMarket};
pub use oracle::MarketOracle;
pub use proxy::{DeploymentBuilder, SwapperProxy};
pub use receipt::{Quote, SwapReceipt};
pub use request::{CallContext, SwapRequest};
pub use state::SwapperState;
pub use storage::ProxyStorage;
pub use types::{Address, Hash, TokenAmount, Wei, ONE_ETHER, U256};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Address, CallContext, ConstantProductMarket, DeploymentBuilder, Hash, Ledger, Market,
        ProxyStorage, Quote, Result, ScriptedMarket, SwapEngine, SwapEngineV2, SwapError, SwapReceipt,
        SwapperError, SwapperLogic, SwapperProxy, SwapperState, TokenAmount, Wei, ONE_ETHER, U256,
    };
}
