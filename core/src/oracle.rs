//! Market oracle
//!
//! Turns router answers into the swapper's conventions: missing markets are a
//! `false`, failed quotes are a final amount of zero. Nothing here errors.

use crate::market::Market;
use crate::receipt::Quote;
use crate::types::{Address, TokenAmount};
use tracing::debug;

/// Read-only view of a market pivoting on `reference_asset`
pub struct MarketOracle<'m> {
    market: &'m dyn Market,
    reference_asset: Address,
}

impl<'m> MarketOracle<'m> {
    pub fn new(market: &'m dyn Market, reference_asset: Address) -> Self {
        Self {
            market,
            reference_asset,
        }
    }

    /// Whether the registry knows a pair between `token` and the reference asset
    pub fn is_token_swappable(&self, token: Address) -> bool {
        self.market.get_pair(token, self.reference_asset).is_some()
    }

    /// Native-input path to `token`
    pub fn path_to(&self, token: Address) -> [Address; 2] {
        [self.reference_asset, token]
    }

    /// Per-hop amounts for `amount_in` along `path`
    ///
    /// A router failure yields a quote whose final amount is zero. Paths
    /// shorter than two hops are quoted as `[amount_in, 0]`.
    pub fn quote(&self, amount_in: TokenAmount, path: &[Address]) -> Quote {
        match self.market.get_amounts_out(amount_in, path) {
            Ok(amounts) => Quote::new(amounts),
            Err(err) => {
                debug!(%amount_in, hops = path.len(), error = %err, "quote unavailable");
                Quote::unavailable(amount_in, path.len().max(2))
            }
        }
    }
}
