//! Market (router) capability
//!
//! The swapper never prices or settles trades itself. It talks to a market
//! through this trait, which mirrors the subset of a Uniswap-V2 style
//! router and factory the swap logic needs.

pub mod constant_product;
pub mod scripted;

pub use constant_product::{get_amount_out, ConstantProductMarket, Pool};
pub use scripted::{ScriptedMarket, ScriptedPool};

use crate::errors::MarketError;
use crate::ledger::Ledger;
use crate::types::{Address, TokenAmount, Wei, U256};

/// External exchange: registry lookups, quoting and execution
pub trait Market {
    /// Address the market (router) is deployed at
    fn address(&self) -> Address;

    /// Pair registry the market routes through
    fn factory(&self) -> Address;

    /// Wrapped native token accepted as path input for native swaps
    fn reference_asset(&self) -> Address;

    /// Registered pair for two tokens, if any
    fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address>;

    /// Per-hop output amounts for `amount_in` along `path`
    fn get_amounts_out(
        &self,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Result<Vec<TokenAmount>, MarketError>;

    /// Swap the attached native `value` (paid by `payer`) along `path`,
    /// delivering the final token to `to`
    ///
    /// Must fail without delivering anything when the realized output is
    /// below `amount_out_min`.
    fn swap_exact_eth_for_tokens(
        &mut self,
        ledger: &mut Ledger,
        payer: Address,
        value: Wei,
        amount_out_min: TokenAmount,
        path: &[Address],
        to: Address,
    ) -> Result<Vec<TokenAmount>, MarketError>;
}

/// Check that `path` is usable for a native-input swap on `market`
pub fn validate_native_path(market: &dyn Market, path: &[Address]) -> Result<(), MarketError> {
    if path.len() < 2 {
        return Err(MarketError::InvalidPath(format!(
            "expected at least 2 hops, got {}",
            path.len()
        )));
    }
    if path[0] != market.reference_asset() {
        return Err(MarketError::InvalidPath(format!(
            "path must start at {}, got {}",
            market.reference_asset(),
            path[0]
        )));
    }
    Ok(())
}

/// Final amount of a per-hop amount list
pub fn final_amount(amounts: &[TokenAmount]) -> TokenAmount {
    amounts.last().copied().unwrap_or(U256::ZERO)
}
