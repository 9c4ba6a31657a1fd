//! Scenario files: a market, a ledger and at most one deployed proxy

use anyhow::{anyhow, bail, Context, Result};
use ether_swapper_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Logic implementations the host can deploy or upgrade to
const KNOWN_LOGIC: &[&str] = &["swap-engine@1", "swap-engine@2"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Proxy address
    pub proxy: Address,
    /// `name@version` of the logic behind the proxy
    pub implementation: String,
    pub storage: ProxyStorage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub market: ConstantProductMarket,
    pub ledger: Ledger,
    /// Human names for addresses ("weth", "trader", ...)
    #[serde(default)]
    pub labels: BTreeMap<String, Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Deployment>,
}

/// `name@version` label of a logic unit
pub fn logic_label(logic: &dyn SwapperLogic) -> String {
    format!("{}@{}", logic.name(), logic.version())
}

/// Resolve a `name@version` label to its logic
pub fn logic_for(label: &str) -> Result<Arc<dyn SwapperLogic>> {
    match label {
        "swap-engine@1" => Ok(Arc::new(SwapEngine::new())),
        "swap-engine@2" => Ok(Arc::new(SwapEngineV2::new())),
        other => bail!(
            "Unknown implementation {:?} (known: {})",
            other,
            KNOWN_LOGIC.join(", ")
        ),
    }
}

impl Scenario {
    pub fn new(market: ConstantProductMarket, ledger: Ledger) -> Self {
        Self {
            market,
            ledger,
            labels: BTreeMap::new(),
            deployment: None,
        }
    }

    /// Demo world: one deep pool, one registered pair without liquidity and
    /// one token with no pair at all
    pub fn sample() -> Result<Self> {
        let router = Address::repeat_byte(0xAA);
        let factory = Address::repeat_byte(0xFA);
        let weth = Address::repeat_byte(0xEE);
        let deep = Address::repeat_byte(0xCC);
        let empty = Address::repeat_byte(0x55);
        let unlisted = Address::repeat_byte(0x99);
        let trader = Address::repeat_byte(0x01);
        let admin = Address::repeat_byte(0xAD);

        let mut ledger = Ledger::new();
        let mut market = ConstantProductMarket::new(router, factory, weth);
        market.add_liquidity(
            &mut ledger,
            weth,
            deep,
            U256::from(100u64) * ONE_ETHER,
            U256::from(100_000u64) * ONE_ETHER,
        )?;
        market.create_pair(weth, empty);
        ledger.fund_native(trader, U256::from(10u64) * ONE_ETHER)?;

        let mut scenario = Self::new(market, ledger);
        for (name, address) in [
            ("router", router),
            ("factory", factory),
            ("weth", weth),
            ("deep", deep),
            ("empty", empty),
            ("unlisted", unlisted),
            ("trader", trader),
            ("admin", admin),
        ] {
            scenario.labels.insert(name.to_string(), address);
        }
        Ok(scenario)
    }

    /// Accept either a label or a hex address
    pub fn resolve(&self, name: &str) -> Result<Address> {
        match self.labels.get(name) {
            Some(address) => Ok(*address),
            None => crate::io::parse_address(name)
                .with_context(|| format!("{:?} is neither a label nor an address", name)),
        }
    }

    /// Deploy and initialize a proxy against the scenario's market
    pub fn deploy(&mut self, admin: Address, implementation: &str) -> Result<SwapperProxy> {
        if self.deployment.is_some() {
            bail!("Scenario already holds a deployment");
        }
        let logic = logic_for(implementation)?;
        let proxy = DeploymentBuilder::new()
            .with_admin(admin)
            .with_logic(logic)
            .deploy(&self.market)?;

        info!(proxy = %proxy.address(), %admin, implementation, "proxy deployed");
        self.record(&proxy);
        Ok(proxy)
    }

    /// Rebuild the deployed proxy from its stored slots
    pub fn attach(&self) -> Result<SwapperProxy> {
        let deployment = self
            .deployment
            .as_ref()
            .ok_or_else(|| anyhow!("No proxy deployed in this scenario; run `deploy` first"))?;
        let logic = logic_for(&deployment.implementation)?;
        let proxy = SwapperProxy::from_parts(deployment.proxy, deployment.storage.clone(), logic)?;
        Ok(proxy)
    }

    /// Store the proxy's current storage and implementation
    pub fn record(&mut self, proxy: &SwapperProxy) {
        self.deployment = Some(Deployment {
            proxy: proxy.address(),
            implementation: logic_label(proxy.logic()),
            storage: proxy.storage().clone(),
        });
    }

    pub fn fund(&mut self, account: Address, amount: Wei) -> Result<()> {
        self.ledger.fund_native(account, amount)?;
        Ok(())
    }

    /// Run a swap through the deployed proxy and record the resulting storage
    pub fn swap(
        &mut self,
        caller: Address,
        value: Wei,
        token: Address,
        minimum_output: TokenAmount,
    ) -> Result<SwapReceipt> {
        let mut proxy = self.attach()?;
        let receipt = proxy.swap_ether_to_token(
            &mut self.market,
            &mut self.ledger,
            CallContext::new(caller).with_value(value),
            token,
            minimum_output,
        )?;
        self.record(&proxy);
        Ok(receipt)
    }

    pub fn upgrade(&mut self, caller: Address, implementation: &str) -> Result<()> {
        let mut proxy = self.attach()?;
        proxy.upgrade_to(caller, logic_for(implementation)?)?;
        self.record(&proxy);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed() -> Scenario {
        let mut scenario = Scenario::sample().unwrap();
        let admin = scenario.resolve("admin").unwrap();
        scenario.deploy(admin, "swap-engine@1").unwrap();
        scenario
    }

    #[test]
    fn test_sample_world() {
        let scenario = Scenario::sample().unwrap();
        let weth = scenario.resolve("weth").unwrap();
        let deep = scenario.resolve("deep").unwrap();
        let empty = scenario.resolve("empty").unwrap();

        assert!(scenario.market.reserves(weth, deep).is_some());
        assert_eq!(
            scenario.market.reserves(weth, empty),
            Some((U256::ZERO, U256::ZERO))
        );
        assert!(scenario.deployment.is_none());
    }

    #[test]
    fn test_resolve_label_or_address() {
        let scenario = Scenario::sample().unwrap();
        assert_eq!(scenario.resolve("trader").unwrap(), Address::repeat_byte(0x01));
        assert_eq!(
            scenario
                .resolve("0x0202020202020202020202020202020202020202")
                .unwrap(),
            Address::repeat_byte(0x02)
        );
        assert!(scenario.resolve("nobody").is_err());
    }

    #[test]
    fn test_deploy_records_storage() {
        let scenario = deployed();
        let deployment = scenario.deployment.as_ref().unwrap();

        assert_eq!(deployment.implementation, "swap-engine@1");
        let proxy = scenario.attach().unwrap();
        assert!(proxy.is_initialized());
        assert_eq!(proxy.get_market_address(), scenario.market.address());
    }

    #[test]
    fn test_deploy_twice_rejected() {
        let mut scenario = deployed();
        assert!(scenario.deploy(Address::repeat_byte(0xAD), "swap-engine@1").is_err());
    }

    #[test]
    fn test_unknown_implementation() {
        let mut scenario = Scenario::sample().unwrap();
        let err = scenario
            .deploy(Address::repeat_byte(0xAD), "swap-engine@9")
            .unwrap_err();
        assert!(err.to_string().contains("swap-engine@9"));
    }

    #[test]
    fn test_swap_updates_balances() {
        let mut scenario = deployed();
        let trader = scenario.resolve("trader").unwrap();
        let deep = scenario.resolve("deep").unwrap();

        let receipt = scenario.swap(trader, ONE_ETHER, deep, U256::ZERO).unwrap();

        assert!(receipt.amount_out > U256::ZERO);
        assert_eq!(scenario.ledger.token_balance(&deep, &trader), receipt.amount_out);
        assert_eq!(
            scenario.ledger.native_balance(&trader),
            U256::from(9u64) * ONE_ETHER
        );
    }

    #[test]
    fn test_failed_swap_leaves_scenario_unchanged() {
        let mut scenario = deployed();
        let trader = scenario.resolve("trader").unwrap();
        let empty = scenario.resolve("empty").unwrap();
        let ledger = scenario.ledger.clone();

        let err = scenario.swap(trader, ONE_ETHER, empty, U256::ZERO).unwrap_err();

        let swap_error = err
            .downcast_ref::<SwapperError>()
            .and_then(|e| e.swap_error());
        assert!(matches!(swap_error, Some(SwapError::InsufficientLiquidity(t)) if t == empty));
        assert_eq!(scenario.ledger, ledger);
    }

    #[test]
    fn test_upgrade_keeps_configuration() {
        let mut scenario = deployed();
        let admin = scenario.resolve("admin").unwrap();
        let trader = scenario.resolve("trader").unwrap();
        let before = scenario.attach().unwrap();

        scenario.upgrade(admin, "swap-engine@2").unwrap();

        let after = scenario.attach().unwrap();
        assert_eq!(scenario.deployment.as_ref().unwrap().implementation, "swap-engine@2");
        assert_ne!(after.implementation(), before.implementation());
        assert_eq!(after.address(), before.address());
        assert_eq!(after.state(), before.state());
        assert!(scenario.upgrade(trader, "swap-engine@1").is_err());
    }

    #[test]
    fn test_swap_after_upgrade() {
        let mut scenario = deployed();
        let admin = scenario.resolve("admin").unwrap();
        let trader = scenario.resolve("trader").unwrap();
        let deep = scenario.resolve("deep").unwrap();
        scenario.upgrade(admin, "swap-engine@2").unwrap();

        let receipt = scenario.swap(trader, ONE_ETHER, deep, U256::ZERO).unwrap();

        assert_eq!(scenario.ledger.token_balance(&deep, &trader), receipt.amount_out);
        assert_eq!(scenario.deployment.as_ref().unwrap().implementation, "swap-engine@2");
    }
}
