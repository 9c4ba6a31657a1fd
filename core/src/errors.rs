/*
Error types for the swapper
Swap outcomes, router failures, ledger failures and proxy misuse each get their own enum.
*/

use crate::types::{Address, Hash, U256};
use thiserror::Error;

/// Failures of the swap logic
///
/// Closed set: callers branch on the kind to decide whether a retry makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SwapError {
    /// No market exists between the token and the reference asset
    #[error("not a valid swap token: {0}")]
    InvalidSwapToken(Address),

    /// A market exists but yields no output for the requested input
    #[error("not enough liquidity in pool for {0}")]
    InsufficientLiquidity(Address),

    /// The trade could not be filled at or above the caller's floor
    #[error("swap failed: minimum output {minimum_output} not met")]
    SwapFailed { minimum_output: U256 },

    /// `initialize` was called on already configured storage
    #[error("already initialized")]
    AlreadyInitialized,
}

/// Failures reported by a market (router) implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("insufficient input amount")]
    InsufficientInputAmount,

    #[error("insufficient liquidity")]
    InsufficientLiquidity,

    #[error("insufficient output amount: got {actual}, need {minimum}")]
    InsufficientOutputAmount { actual: U256, minimum: U256 },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("pair not found: {0} / {1}")]
    PairNotFound(Address, Address),

    #[error("arithmetic overflow")]
    Overflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Balance bookkeeping failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient native balance for {account}: need {needed}, have {available}")]
    InsufficientNativeBalance {
        account: Address,
        needed: U256,
        available: U256,
    },

    #[error("insufficient {token} balance for {account}: need {needed}, have {available}")]
    InsufficientTokenBalance {
        token: Address,
        account: Address,
        needed: U256,
        available: U256,
    },

    #[error("balance overflow for {0}")]
    Overflow(Address),
}

/// Errors surfaced by the proxy to its callers
#[derive(Debug, Error)]
pub enum SwapperError {
    #[error(transparent)]
    Swap(#[from] SwapError),

    /// A logic call arrived before `initialize`
    #[error("proxy storage is not initialized")]
    NotInitialized,

    /// The market handed to the proxy is not the one it was initialized with
    #[error("unknown market {actual}, proxy is configured for {expected}")]
    UnknownMarket { expected: Address, actual: Address },

    /// Stored implementation id does not match the logic being attached
    #[error("implementation mismatch: storage records {recorded}, logic is {expected}")]
    ImplementationMismatch { recorded: Hash, expected: Hash },

    /// Upgrade attempted by someone other than the admin
    #[error("caller {caller} is not the proxy admin {admin}")]
    Unauthorized { caller: Address, admin: Address },

    /// The caller cannot cover the attached value
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl SwapperError {
    /// The swap outcome, when this error came from the swap logic
    pub fn swap_error(&self) -> Option<SwapError> {
        match self {
            SwapperError::Swap(err) => Some(*err),
            _ => None,
        }
    }
}

/// Result type for proxy operations
pub type Result<T> = core::result::Result<T, SwapperError>;

impl From<bincode::Error> for SwapperError {
    fn from(err: bincode::Error) -> Self {
        SwapperError::SerializationError(err.to_string())
    }
}
