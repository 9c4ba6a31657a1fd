//! Quote and swap result types
//!
//! Both live only for the duration of one call and are never persisted.

use crate::market::final_amount;
use crate::types::{Address, TokenAmount, Wei, U256};
use serde::{Deserialize, Serialize};

/// Per-hop amounts a market would produce for an input along a path
///
/// The first element is the input, the last is the obtainable output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    amounts: Vec<TokenAmount>,
}

impl Quote {
    pub fn new(amounts: Vec<TokenAmount>) -> Self {
        Self { amounts }
    }

    /// Quote for a path the market cannot serve: input followed by zeros
    pub fn unavailable(amount_in: TokenAmount, hops: usize) -> Self {
        let mut amounts = vec![U256::ZERO; hops.max(1)];
        amounts[0] = amount_in;
        Self { amounts }
    }

    pub fn amounts(&self) -> &[TokenAmount] {
        &self.amounts
    }

    pub fn into_amounts(self) -> Vec<TokenAmount> {
        self.amounts
    }

    pub fn amount_in(&self) -> TokenAmount {
        self.amounts.first().copied().unwrap_or(U256::ZERO)
    }

    pub fn amount_out(&self) -> TokenAmount {
        final_amount(&self.amounts)
    }

    /// Whether the market would produce nothing
    pub fn is_zero(&self) -> bool {
        self.amount_out().is_zero()
    }
}

/// Result of a settled swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    /// Account that paid and received the tokens
    pub caller: Address,
    /// Token delivered
    pub token: Address,
    /// Native value spent
    pub amount_in: Wei,
    /// Tokens delivered to the caller
    pub amount_out: TokenAmount,
    /// Per-hop amounts as settled by the market
    pub amounts: Vec<TokenAmount>,
}

impl SwapReceipt {
    pub fn new(caller: Address, token: Address, amounts: Vec<TokenAmount>) -> Self {
        let quote = Quote::new(amounts);
        Self {
            caller,
            token,
            amount_in: quote.amount_in(),
            amount_out: quote.amount_out(),
            amounts: quote.into_amounts(),
        }
    }

    /// Whether the delivered amount honours a floor
    pub fn meets(&self, minimum_output: TokenAmount) -> bool {
        self.amount_out >= minimum_output
    }
}
