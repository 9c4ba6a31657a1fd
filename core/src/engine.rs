//! Swap logic
//!
//! The logic unit owns no state: every call receives the proxy's storage and
//! the market it should talk to. Replacing the logic therefore never touches
//! the configuration layout in [`crate::state`].

use crate::errors::SwapError;
use crate::hashing::keccak256;
use crate::ledger::Ledger;
use crate::market::Market;
use crate::oracle::MarketOracle;
use crate::receipt::{Quote, SwapReceipt};
use crate::request::SwapRequest;
use crate::state::SwapperState;
use crate::storage::ProxyStorage;
use crate::types::{Address, Hash, TokenAmount};
use tracing::{debug, info};

/// Mutable world a state-changing call runs against
pub struct Environment<'a> {
    /// Address of the proxy the call was made on; holds the attached value
    pub this: Address,
    pub market: &'a mut dyn Market,
    pub ledger: &'a mut Ledger,
}

/// Behaviour the proxy delegates to
///
/// Implementations must keep the slot layout of [`SwapperState`]. The
/// accessors read that layout directly and are shared by every version.
pub trait SwapperLogic: Send + Sync {
    /// Implementation name, stable across versions
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str;

    /// Identifier recorded in the proxy's implementation slot
    fn implementation_id(&self) -> Hash {
        keccak256(format!("{}@{}", self.name(), self.version()).as_bytes())
    }

    /// One-shot configuration of fresh storage against `market`
    fn initialize(&self, storage: &mut ProxyStorage, market: &dyn Market) -> Result<(), SwapError>;

    fn is_token_swappable(&self, storage: &ProxyStorage, market: &dyn Market, token: Address) -> bool;

    fn get_amounts_out(
        &self,
        storage: &ProxyStorage,
        market: &dyn Market,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Quote;

    fn swap_ether_to_token(
        &self,
        storage: &mut ProxyStorage,
        env: Environment<'_>,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, SwapError>;

    fn reference_asset(&self, storage: &ProxyStorage) -> Address {
        SwapperState::load(storage).reference_asset
    }

    fn market_registry(&self, storage: &ProxyStorage) -> Address {
        SwapperState::load(storage).market_registry
    }

    /// Same value as [`SwapperLogic::market_registry`]
    fn market_address(&self, storage: &ProxyStorage) -> Address {
        self.market_registry(storage)
    }

    fn market_factory(&self, storage: &ProxyStorage) -> Address {
        SwapperState::load(storage).market_factory
    }
}

/// Native-to-token swapper with liquidity and slippage guards
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapEngine;

impl SwapEngine {
    pub const NAME: &'static str = "swap-engine";
    pub const VERSION: &'static str = "1";

    pub fn new() -> Self {
        Self
    }
}

impl SwapperLogic for SwapEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn version(&self) -> &'static str {
        Self::VERSION
    }

    fn initialize(&self, storage: &mut ProxyStorage, market: &dyn Market) -> Result<(), SwapError> {
        if SwapperState::is_initialized(storage) {
            return Err(SwapError::AlreadyInitialized);
        }

        let state = SwapperState::configured(
            market.address(),
            market.factory(),
            market.reference_asset(),
        );
        state.store(storage);

        info!(
            market = %state.market_registry,
            factory = %state.market_factory,
            reference_asset = %state.reference_asset,
            "swapper initialized"
        );
        Ok(())
    }

    fn is_token_swappable(&self, storage: &ProxyStorage, market: &dyn Market, token: Address) -> bool {
        MarketOracle::new(market, self.reference_asset(storage)).is_token_swappable(token)
    }

    fn get_amounts_out(
        &self,
        storage: &ProxyStorage,
        market: &dyn Market,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Quote {
        MarketOracle::new(market, self.reference_asset(storage)).quote(amount_in, path)
    }

    /// Swappability, then quote, then liquidity, then slippage, then execution.
    /// Reordering these changes which error a bad request reports.
    fn swap_ether_to_token(
        &self,
        storage: &mut ProxyStorage,
        env: Environment<'_>,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, SwapError> {
        let reference_asset = self.reference_asset(storage);
        let token = request.target_token;
        let path = request.path(reference_asset);

        let quote = {
            let oracle = MarketOracle::new(&*env.market, reference_asset);
            if !oracle.is_token_swappable(token) {
                debug!(%token, "no market for token");
                return Err(SwapError::InvalidSwapToken(token));
            }
            oracle.quote(request.input_amount, &path)
        };

        let expected = quote.amount_out();
        if expected.is_zero() {
            debug!(%token, input = %request.input_amount, "market cannot fill input");
            return Err(SwapError::InsufficientLiquidity(token));
        }
        if expected < request.minimum_output {
            debug!(%token, %expected, minimum = %request.minimum_output, "quote below floor");
            return Err(SwapError::SwapFailed {
                minimum_output: request.minimum_output,
            });
        }

        // The market re-checks the floor at fill time
        let amounts = env
            .market
            .swap_exact_eth_for_tokens(
                env.ledger,
                env.this,
                request.input_amount,
                request.minimum_output,
                &path,
                request.caller,
            )
            .map_err(|err| {
                debug!(%token, error = %err, "market rejected fill");
                SwapError::SwapFailed {
                    minimum_output: request.minimum_output,
                }
            })?;

        let receipt = SwapReceipt::new(request.caller, token, amounts);
        if !receipt.meets(request.minimum_output) {
            debug!(%token, delivered = %receipt.amount_out, minimum = %request.minimum_output, "market settled below floor");
            return Err(SwapError::SwapFailed {
                minimum_output: request.minimum_output,
            });
        }
        info!(
            caller = %receipt.caller,
            %token,
            amount_in = %receipt.amount_in,
            amount_out = %receipt.amount_out,
            "swapped ether to token"
        );
        Ok(receipt)
    }
}

/// Second release of the engine
///
/// Same slot layout and swap rules as [`SwapEngine`] under a new
/// implementation id, so a deployed proxy can be moved onto it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwapEngineV2;

impl SwapEngineV2 {
    pub const VERSION: &'static str = "2";

    pub fn new() -> Self {
        Self
    }
}

impl SwapperLogic for SwapEngineV2 {
    fn name(&self) -> &'static str {
        SwapEngine::NAME
    }

    fn version(&self) -> &'static str {
        Self::VERSION
    }

    fn initialize(&self, storage: &mut ProxyStorage, market: &dyn Market) -> Result<(), SwapError> {
        SwapEngine.initialize(storage, market)
    }

    fn is_token_swappable(&self, storage: &ProxyStorage, market: &dyn Market, token: Address) -> bool {
        SwapEngine.is_token_swappable(storage, market, token)
    }

    fn get_amounts_out(
        &self,
        storage: &ProxyStorage,
        market: &dyn Market,
        amount_in: TokenAmount,
        path: &[Address],
    ) -> Quote {
        SwapEngine.get_amounts_out(storage, market, amount_in, path)
    }

    fn swap_ether_to_token(
        &self,
        storage: &mut ProxyStorage,
        env: Environment<'_>,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, SwapError> {
        SwapEngine.swap_ether_to_token(storage, env, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::ScriptedMarket;
    use crate::types::{ONE_ETHER, U256};

    const ROUTER: Address = Address::repeat_byte(0xAA);
    const FACTORY: Address = Address::repeat_byte(0xFA);
    const WETH: Address = Address::repeat_byte(0xEE);
    const DEEP: Address = Address::repeat_byte(0xCC);
    const EMPTY: Address = Address::repeat_byte(0x55);
    const DRIFTING: Address = Address::repeat_byte(0x77);
    const UNLISTED: Address = Address::repeat_byte(0x99);
    const THIS: Address = Address::repeat_byte(0x5A);
    const TRADER: Address = Address::repeat_byte(0x01);

    fn setup() -> (ProxyStorage, ScriptedMarket, Ledger) {
        let market = ScriptedMarket::new(ROUTER, FACTORY, WETH)
            .with_pool(DEEP, U256::from(950u64))
            .with_empty_pool(EMPTY)
            .with_price_drift(DRIFTING, U256::from(950u64), U256::from(940u64));
        let mut storage = ProxyStorage::new();
        SwapEngine.initialize(&mut storage, &market).unwrap();

        // Value already moved onto the proxy, as the proxy does before delegating
        let mut ledger = Ledger::new();
        ledger.fund_native(THIS, ONE_ETHER).unwrap();
        (storage, market, ledger)
    }

    fn swap(
        storage: &mut ProxyStorage,
        market: &mut ScriptedMarket,
        ledger: &mut Ledger,
        token: Address,
        minimum_output: u64,
    ) -> Result<SwapReceipt, SwapError> {
        let request = SwapRequest::new(TRADER, ONE_ETHER, token, U256::from(minimum_output));
        let env = Environment {
            this: THIS,
            market,
            ledger,
        };
        SwapEngine.swap_ether_to_token(storage, env, &request)
    }

    #[test]
    fn test_initialize_reads_market() {
        let (storage, _, _) = setup();

        assert_eq!(SwapEngine.reference_asset(&storage), WETH);
        assert_eq!(SwapEngine.market_registry(&storage), ROUTER);
        assert_eq!(SwapEngine.market_address(&storage), ROUTER);
        assert_eq!(SwapEngine.market_factory(&storage), FACTORY);
    }

    #[test]
    fn test_initialize_twice_fails() {
        let (mut storage, _, _) = setup();
        let other = ScriptedMarket::new(Address::repeat_byte(0xAB), FACTORY, Address::repeat_byte(0xEF));

        assert_eq!(
            SwapEngine.initialize(&mut storage, &other),
            Err(SwapError::AlreadyInitialized)
        );
        assert_eq!(SwapEngine.reference_asset(&storage), WETH);
        assert_eq!(SwapEngine.market_registry(&storage), ROUTER);
    }

    #[test]
    fn test_swap_at_quote_succeeds() {
        let (mut storage, mut market, mut ledger) = setup();

        let receipt = swap(&mut storage, &mut market, &mut ledger, DEEP, 950).unwrap();

        assert_eq!(receipt.amounts, vec![ONE_ETHER, U256::from(950u64)]);
        assert_eq!(ledger.token_balance(&DEEP, &TRADER), U256::from(950u64));
        assert_eq!(ledger.token_balance(&DEEP, &THIS), U256::ZERO);
        assert_eq!(ledger.native_balance(&THIS), U256::ZERO);
    }

    #[test]
    fn test_swap_above_quote_fails_before_execution() {
        let (mut storage, mut market, mut ledger) = setup();

        let err = swap(&mut storage, &mut market, &mut ledger, DEEP, 951).unwrap_err();

        assert_eq!(
            err,
            SwapError::SwapFailed {
                minimum_output: U256::from(951u64)
            }
        );
        assert_eq!(market.executions(), 0);
    }

    #[test]
    fn test_unlisted_token_rejected_regardless_of_floor() {
        let (mut storage, mut market, mut ledger) = setup();

        for floor in [0u64, 1, 1_000_000] {
            let err = swap(&mut storage, &mut market, &mut ledger, UNLISTED, floor).unwrap_err();
            assert_eq!(err, SwapError::InvalidSwapToken(UNLISTED));
        }
    }

    #[test]
    fn test_empty_pool_reports_liquidity() {
        let (mut storage, mut market, mut ledger) = setup();

        // Liquidity is checked before slippage, so a high floor does not change the kind
        for floor in [0u64, 1_000_000] {
            let err = swap(&mut storage, &mut market, &mut ledger, EMPTY, floor).unwrap_err();
            assert_eq!(err, SwapError::InsufficientLiquidity(EMPTY));
        }
    }

    #[test]
    fn test_price_movement_at_fill_fails() {
        let (mut storage, mut market, mut ledger) = setup();

        let err = swap(&mut storage, &mut market, &mut ledger, DRIFTING, 950).unwrap_err();

        assert!(matches!(err, SwapError::SwapFailed { .. }));
        assert_eq!(ledger.token_balance(&DRIFTING, &TRADER), U256::ZERO);
    }

    #[test]
    fn test_price_movement_within_floor_succeeds() {
        let (mut storage, mut market, mut ledger) = setup();

        let receipt = swap(&mut storage, &mut market, &mut ledger, DRIFTING, 940).unwrap();
        assert_eq!(receipt.amount_out, U256::from(940u64));
    }

    /// Settles at whatever price it finds, ignoring the caller's floor
    struct FloorlessMarket(ScriptedMarket);

    impl Market for FloorlessMarket {
        fn address(&self) -> Address {
            self.0.address()
        }
        fn factory(&self) -> Address {
            self.0.factory()
        }
        fn reference_asset(&self) -> Address {
            self.0.reference_asset()
        }
        fn get_pair(&self, token_a: Address, token_b: Address) -> Option<Address> {
            self.0.get_pair(token_a, token_b)
        }
        fn get_amounts_out(
            &self,
            amount_in: TokenAmount,
            path: &[Address],
        ) -> Result<Vec<TokenAmount>, crate::errors::MarketError> {
            self.0.get_amounts_out(amount_in, path)
        }
        fn swap_exact_eth_for_tokens(
            &mut self,
            ledger: &mut Ledger,
            payer: Address,
            value: crate::types::Wei,
            _amount_out_min: TokenAmount,
            path: &[Address],
            to: Address,
        ) -> Result<Vec<TokenAmount>, crate::errors::MarketError> {
            self.0
                .swap_exact_eth_for_tokens(ledger, payer, value, U256::ZERO, path, to)
        }
    }

    #[test]
    fn test_settlement_below_floor_fails() {
        let (mut storage, market, mut ledger) = setup();
        let mut market = FloorlessMarket(market);
        let request = SwapRequest::new(TRADER, ONE_ETHER, DRIFTING, U256::from(950u64));
        let env = Environment {
            this: THIS,
            market: &mut market,
            ledger: &mut ledger,
        };

        let err = SwapEngine
            .swap_ether_to_token(&mut storage, env, &request)
            .unwrap_err();

        assert_eq!(
            err,
            SwapError::SwapFailed {
                minimum_output: U256::from(950u64)
            }
        );
    }

    #[test]
    fn test_get_amounts_out_passthrough() {
        let (storage, market, _) = setup();

        let quote = SwapEngine.get_amounts_out(&storage, &market, ONE_ETHER, &[WETH, DEEP]);
        assert_eq!(quote.amounts(), &[ONE_ETHER, U256::from(950u64)]);

        let quote = SwapEngine.get_amounts_out(&storage, &market, ONE_ETHER, &[WETH, UNLISTED]);
        assert_eq!(quote.amounts(), &[ONE_ETHER, U256::ZERO]);
    }

    #[test]
    fn test_implementation_id_tracks_version() {
        assert_ne!(SwapEngine.implementation_id(), SwapEngineV2.implementation_id());
        assert_eq!(SwapEngineV2.name(), SwapEngine.name());
        assert_eq!(SwapEngine.implementation_id(), SwapEngine::new().implementation_id());
    }
}
