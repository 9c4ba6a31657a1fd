//! Deterministic market double
//!
//! Quotes and execution results are scripted per token, so the swap logic's
//! branch order can be driven without pool math. Execution output may be set
//! lower than the quote to reproduce price movement between quote and fill.

use super::{validate_native_path, Market};
use crate::errors::MarketError;
use crate::hashing::pair_address;
use crate::ledger::Ledger;
use crate::types::{Address, TokenAmount, Wei, U256};
use std::collections::BTreeMap;

/// Scripted behaviour of one reference-asset/token pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedPool {
    /// Output reported by `get_amounts_out`, regardless of input size
    pub quoted_output: TokenAmount,
    /// Output realized at execution; `None` fills at the quote
    pub execution_output: Option<TokenAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedMarket {
    address: Address,
    factory: Address,
    reference_asset: Address,
    pools: BTreeMap<Address, ScriptedPool>,
    executions: usize,
}

impl ScriptedMarket {
    pub fn new(address: Address, factory: Address, reference_asset: Address) -> Self {
        Self {
            address,
            factory,
            reference_asset,
            pools: BTreeMap::new(),
            executions: 0,
        }
    }

    /// List `token` with a fixed quote that also fills at the quote
    pub fn with_pool(mut self, token: Address, quoted_output: TokenAmount) -> Self {
        self.pools.insert(
            token,
            ScriptedPool {
                quoted_output,
                execution_output: None,
            },
        );
        self
    }

    /// List `token` with a pool that cannot produce any output
    pub fn with_empty_pool(self, token: Address) -> Self {
        self.with_pool(token, U256::ZERO)
    }

    /// List `token` with a quote that fills at a different amount
    pub fn with_price_drift(
        mut self,
        token: Address,
        quoted_output: TokenAmount,
        execution_output: TokenAmount,
    ) -> Self {
        self.pools.insert(
            token,
            ScriptedPool {
                quoted_output,
                execution_output: Some(execution_output),
            },
        );
        self
    }

    /// Number of swaps that reached settlement
    pub fn executions(&self) -> usize {
        self.executions
    }

    fn scripted_pool(&self, path: &[Address]) -> Result<&ScriptedPool, MarketError> {
        validate_native_path(self, path)?;
        if path.len() != 2 {
            return Err(MarketError::InvalidPath(
                "scripted market only serves single-hop paths".to_string(),
            ));
        }
        self.pools
            .get(&path[1])
            .ok_or(MarketError::PairNotFound(path[0], path[1]))
    }
}

impl Market for ScriptedMarket {
    fn address(&self) -> Address {
        self.address
    }

    fn factory(&self) -> Address {
        self.factory
    }

    fn reference_asset(&self) -> Address {
        self.reference_asset
    }

    fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
        let token = if token_a == self.reference_asset {
            token_b
        } else if token_b == self.reference_asset {
            token_a
        } else {
            return None;
        };
        self.pools
            .contains_key(&token)
            .then(|| pair_address(self.factory, token_a, token_b))
    }

    fn get_amounts_out(
        &self,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Result<Vec<TokenAmount>, MarketError> {
        let pool = self.scripted_pool(path)?;
        if amount_in.is_zero() {
            return Err(MarketError::InsufficientInputAmount);
        }
        if pool.quoted_output.is_zero() {
            return Err(MarketError::InsufficientLiquidity);
        }
        Ok(vec![amount_in, pool.quoted_output])
    }

    fn swap_exact_eth_for_tokens(
        &mut self,
        ledger: &mut Ledger,
        payer: Address,
        value: Wei,
        amount_out_min: TokenAmount,
        path: &[Address],
        to: Address,
    ) -> Result<Vec<TokenAmount>, MarketError> {
        self.get_amounts_out(value, path)?;
        let pool = *self.scripted_pool(path)?;
        let realized = pool.execution_output.unwrap_or(pool.quoted_output);
        if realized < amount_out_min {
            return Err(MarketError::InsufficientOutputAmount {
                actual: realized,
                minimum: amount_out_min,
            });
        }

        ledger.transfer_native(payer, self.address, value)?;
        ledger.mint(path[1], to, realized)?;
        self.executions += 1;
        Ok(vec![value, realized])
    }
}
