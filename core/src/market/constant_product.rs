//! In-memory constant-product market
//!
//! Router and factory in one: pairs are registered under deterministic
//! addresses, priced with `x * y = k` and a 0.3% input fee, and settled
//! against a [`Ledger`].

use super::{final_amount, validate_native_path, Market};
use crate::errors::MarketError;
use crate::hashing::{pair_address, sort_tokens};
use crate::ledger::Ledger;
use crate::types::{Address, TokenAmount, Wei, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Fee numerator applied to the input amount (out of 1000)
const FEE_NUMERATOR: u64 = 997;
const FEE_DENOMINATOR: u64 = 1000;

/// Output for a single hop given the pair reserves
///
/// Fails on zero input or on an empty side of the pool, like the router does.
pub fn get_amount_out(
    amount_in: TokenAmount,
    reserve_in: TokenAmount,
    reserve_out: TokenAmount,
) -> Result<TokenAmount, MarketError> {
    if amount_in.is_zero() {
        return Err(MarketError::InsufficientInputAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(MarketError::InsufficientLiquidity);
    }
    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(FEE_NUMERATOR))
        .ok_or(MarketError::Overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or(MarketError::Overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .and_then(|r| r.checked_add(amount_in_with_fee))
        .ok_or(MarketError::Overflow)?;
    Ok(numerator / denominator)
}

/// A registered pair and its reserves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: TokenAmount,
    pub reserve1: TokenAmount,
}

impl Pool {
    /// Empty pool for two tokens (stored in sorted order)
    pub fn new(token_a: Address, token_b: Address) -> Self {
        let (token0, token1) = sort_tokens(token_a, token_b);
        Self {
            token0,
            token1,
            reserve0: U256::ZERO,
            reserve1: U256::ZERO,
        }
    }

    /// Reserves oriented as (input side, output side)
    pub fn reserves_for(&self, token_in: Address) -> (TokenAmount, TokenAmount) {
        if token_in == self.token0 {
            (self.reserve0, self.reserve1)
        } else {
            (self.reserve1, self.reserve0)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reserve0.is_zero() || self.reserve1.is_zero()
    }

    fn deposit(&mut self, token: Address, amount: TokenAmount) -> Result<(), MarketError> {
        let reserve = if token == self.token0 {
            &mut self.reserve0
        } else {
            &mut self.reserve1
        };
        *reserve = reserve.checked_add(amount).ok_or(MarketError::Overflow)?;
        Ok(())
    }

    /// Apply a settled trade to the reserves
    fn apply_swap(
        &mut self,
        token_in: Address,
        amount_in: TokenAmount,
        amount_out: TokenAmount,
    ) -> Result<(), MarketError> {
        let (reserve_in, reserve_out) = if token_in == self.token0 {
            (&mut self.reserve0, &mut self.reserve1)
        } else {
            (&mut self.reserve1, &mut self.reserve0)
        };
        if amount_out >= *reserve_out {
            return Err(MarketError::InsufficientLiquidity);
        }
        *reserve_in = reserve_in
            .checked_add(amount_in)
            .ok_or(MarketError::Overflow)?;
        *reserve_out -= amount_out;
        Ok(())
    }
}

/// Uniswap-V2 style router with its own pair registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantProductMarket {
    address: Address,
    factory: Address,
    reference_asset: Address,
    /// Pools indexed by pair address
    pools: BTreeMap<Address, Pool>,
}

impl ConstantProductMarket {
    pub fn new(address: Address, factory: Address, reference_asset: Address) -> Self {
        Self {
            address,
            factory,
            reference_asset,
            pools: BTreeMap::new(),
        }
    }

    /// Register a pair without liquidity; returns the pair address
    ///
    /// Registering an existing pair is a no-op.
    pub fn create_pair(&mut self, token_a: Address, token_b: Address) -> Address {
        let pair = pair_address(self.factory, token_a, token_b);
        self.pools
            .entry(pair)
            .or_insert_with(|| Pool::new(token_a, token_b));
        pair
    }

    /// Deposit liquidity into a pair, registering it if needed
    ///
    /// The deposited tokens are minted to the pair in `ledger`.
    pub fn add_liquidity(
        &mut self,
        ledger: &mut Ledger,
        token_a: Address,
        token_b: Address,
        amount_a: TokenAmount,
        amount_b: TokenAmount,
    ) -> Result<Address, MarketError> {
        let pair = self.create_pair(token_a, token_b);
        ledger.mint(token_a, pair, amount_a)?;
        ledger.mint(token_b, pair, amount_b)?;

        let pool = self
            .pools
            .get_mut(&pair)
            .ok_or(MarketError::PairNotFound(token_a, token_b))?;
        pool.deposit(token_a, amount_a)?;
        pool.deposit(token_b, amount_b)?;
        Ok(pair)
    }

    pub fn pool(&self, token_a: Address, token_b: Address) -> Option<&Pool> {
        self.pools.get(&pair_address(self.factory, token_a, token_b))
    }

    /// Reserves oriented as (`token_a` side, `token_b` side)
    pub fn reserves(&self, token_a: Address, token_b: Address) -> Option<(TokenAmount, TokenAmount)> {
        self.pool(token_a, token_b).map(|pool| pool.reserves_for(token_a))
    }

    pub fn pools(&self) -> impl Iterator<Item = (&Address, &Pool)> {
        self.pools.iter()
    }

    fn pool_for_hop(&self, token_in: Address, token_out: Address) -> Result<&Pool, MarketError> {
        self.pool(token_in, token_out)
            .ok_or(MarketError::PairNotFound(token_in, token_out))
    }
}

impl Market for ConstantProductMarket {
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
        let pair = pair_address(self.factory, token_a, token_b);
        self.pools.contains_key(&pair).then_some(pair)
    }

    fn get_amounts_out(
        &self,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Result<Vec<TokenAmount>, MarketError> {
        if path.len() < 2 {
            return Err(MarketError::InvalidPath(format!(
                "expected at least 2 hops, got {}",
                path.len()
            )));
        }

        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        for hop in path.windows(2) {
            let pool = self.pool_for_hop(hop[0], hop[1])?;
            let (reserve_in, reserve_out) = pool.reserves_for(hop[0]);
            let previous = amounts[amounts.len() - 1];
            amounts.push(get_amount_out(previous, reserve_in, reserve_out)?);
        }
        Ok(amounts)
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
        validate_native_path(&*self, path)?;

        let amounts = self.get_amounts_out(value, path)?;
        let amount_out = final_amount(&amounts);
        if amount_out < amount_out_min {
            return Err(MarketError::InsufficientOutputAmount {
                actual: amount_out,
                minimum: amount_out_min,
            });
        }

        // Wrap the attached value and hand it to the first pair
        let first_pair = pair_address(self.factory, path[0], path[1]);
        ledger.transfer_native(payer, self.address, value)?;
        ledger.mint(self.reference_asset, first_pair, value)?;

        for (i, hop) in path.windows(2).enumerate() {
            let pair = pair_address(self.factory, hop[0], hop[1]);
            let pool = self
                .pools
                .get_mut(&pair)
                .ok_or(MarketError::PairNotFound(hop[0], hop[1]))?;
            pool.apply_swap(hop[0], amounts[i], amounts[i + 1])?;

            let recipient = match path.get(i + 2) {
                Some(next) => pair_address(self.factory, hop[1], *next),
                None => to,
            };
            ledger.transfer_token(hop[1], pair, recipient, amounts[i + 1])?;
        }

        debug!(
            value = %value,
            amount_out = %amount_out,
            hops = path.len() - 1,
            "constant-product swap settled"
        );
        Ok(amounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ONE_ETHER;

    fn ether(n: u64) -> U256 {
        U256::from(n) * ONE_ETHER
    }

    fn setup() -> (ConstantProductMarket, Ledger, Address, Address) {
        let weth = Address::repeat_byte(0xEE);
        let token = Address::repeat_byte(0xCC);
        let mut ledger = Ledger::new();
        let mut market =
            ConstantProductMarket::new(Address::repeat_byte(0xAA), Address::repeat_byte(0xFA), weth);
        market
            .add_liquidity(&mut ledger, weth, token, ether(100), ether(100_000))
            .unwrap();
        (market, ledger, weth, token)
    }

    #[test]
    fn test_get_amount_out_formula() {
        let out = get_amount_out(
            U256::from(1000u64),
            U256::from(1_000_000u64),
            U256::from(1_000_000u64),
        )
        .unwrap();
        assert_eq!(out, U256::from(996u64));
    }

    #[test]
    fn test_get_amount_out_rejects_zero() {
        assert_eq!(
            get_amount_out(U256::ZERO, U256::from(1u64), U256::from(1u64)),
            Err(MarketError::InsufficientInputAmount)
        );
        assert_eq!(
            get_amount_out(U256::from(1u64), U256::ZERO, U256::from(1u64)),
            Err(MarketError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_get_amount_out_overflow() {
        assert_eq!(
            get_amount_out(U256::MAX, U256::from(1u64), U256::from(1u64)),
            Err(MarketError::Overflow)
        );
    }

    #[test]
    fn test_get_amounts_out_deep_pool() {
        let (market, _, weth, token) = setup();

        let amounts = market.get_amounts_out(ONE_ETHER, &[weth, token]).unwrap();

        assert_eq!(amounts[0], ONE_ETHER);
        assert_eq!(
            amounts[1],
            U256::from(987_158_034_397_061_298_850u128)
        );
    }

    #[test]
    fn test_get_pair() {
        let (mut market, _, weth, token) = setup();
        let unlisted = Address::repeat_byte(0x99);

        assert!(market.get_pair(token, weth).is_some());
        assert!(market.get_pair(weth, unlisted).is_none());

        let pair = market.create_pair(weth, unlisted);
        assert_eq!(market.get_pair(unlisted, weth), Some(pair));
    }

    #[test]
    fn test_empty_pool_quotes_fail() {
        let (mut market, _, weth, _) = setup();
        let shallow = Address::repeat_byte(0x55);
        market.create_pair(weth, shallow);

        assert_eq!(
            market.get_amounts_out(ONE_ETHER, &[weth, shallow]),
            Err(MarketError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_missing_pair() {
        let (market, _, weth, _) = setup();
        let unlisted = Address::repeat_byte(0x99);

        assert_eq!(
            market.get_amounts_out(ONE_ETHER, &[weth, unlisted]),
            Err(MarketError::PairNotFound(weth, unlisted))
        );
    }

    #[test]
    fn test_swap_settles_and_moves_reserves() {
        let (mut market, mut ledger, weth, token) = setup();
        let trader = Address::repeat_byte(0x01);
        ledger.fund_native(trader, ether(5)).unwrap();

        let quoted = market.get_amounts_out(ONE_ETHER, &[weth, token]).unwrap();
        let amounts = market
            .swap_exact_eth_for_tokens(
                &mut ledger,
                trader,
                ONE_ETHER,
                quoted[1],
                &[weth, token],
                trader,
            )
            .unwrap();

        assert_eq!(amounts, quoted);
        assert_eq!(ledger.token_balance(&token, &trader), quoted[1]);
        assert_eq!(ledger.native_balance(&trader), ether(4));
        assert_eq!(
            market.reserves(weth, token),
            Some((ether(101), ether(100_000) - quoted[1]))
        );

        // Same input now buys less
        let requote = market.get_amounts_out(ONE_ETHER, &[weth, token]).unwrap();
        assert!(requote[1] < quoted[1]);
    }

    #[test]
    fn test_swap_enforces_minimum() {
        let (mut market, mut ledger, weth, token) = setup();
        let trader = Address::repeat_byte(0x01);
        ledger.fund_native(trader, ether(5)).unwrap();

        let quoted = market.get_amounts_out(ONE_ETHER, &[weth, token]).unwrap();
        let err = market
            .swap_exact_eth_for_tokens(
                &mut ledger,
                trader,
                ONE_ETHER,
                quoted[1] + U256::from(1u64),
                &[weth, token],
                trader,
            )
            .unwrap_err();

        assert!(matches!(err, MarketError::InsufficientOutputAmount { .. }));
        assert_eq!(ledger.native_balance(&trader), ether(5));
        assert_eq!(ledger.token_balance(&token, &trader), U256::ZERO);
    }

    #[test]
    fn test_swap_rejects_foreign_path_start() {
        let (mut market, mut ledger, weth, token) = setup();
        let trader = Address::repeat_byte(0x01);
        ledger.fund_native(trader, ether(5)).unwrap();

        let err = market
            .swap_exact_eth_for_tokens(&mut ledger, trader, ONE_ETHER, U256::ZERO, &[token, weth], trader)
            .unwrap_err();

        assert!(matches!(err, MarketError::InvalidPath(_)));
    }

    #[test]
    fn test_two_hop_quote() {
        let (mut market, mut ledger, weth, token) = setup();
        let other = Address::repeat_byte(0xDD);
        market
            .add_liquidity(&mut ledger, token, other, ether(100_000), ether(100_000))
            .unwrap();

        let amounts = market
            .get_amounts_out(ONE_ETHER, &[weth, token, other])
            .unwrap();

        assert_eq!(amounts.len(), 3);
        assert!(amounts[2] > U256::ZERO);
        assert!(amounts[2] < amounts[1]);
    }
}
