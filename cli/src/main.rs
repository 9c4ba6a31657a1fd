//! Ether Swapper host CLI
//!
//! Deploys a swapper proxy into a scenario file and drives quotes, swaps and
//! upgrades against it.

mod config;
mod io;
mod scenario;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::SwapperConfig;
use ether_swapper_core::prelude::*;
use scenario::{logic_label, Scenario};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const BPS_DENOMINATOR: u64 = 10_000;

#[derive(Parser)]
#[command(name = "ether-swapper")]
#[command(about = "Upgradeable native-to-token swapper over a constant-product market")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides config and SWAPPER_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample scenario file
    Sample {
        /// Path to save the scenario
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Deploy and initialize a proxy in a scenario
    Deploy {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Proxy admin (label or address); defaults to the configured deployer
        #[arg(long)]
        admin: Option<String>,

        /// Logic implementation as name@version
        #[arg(long, default_value = "swap-engine@1")]
        implementation: String,
    },

    /// Credit native value to an account
    Fund {
        #[arg(short, long)]
        scenario: PathBuf,

        #[arg(long)]
        account: String,

        /// Amount in ether
        #[arg(long)]
        amount: String,
    },

    /// Check whether a token has a market
    Check {
        #[arg(short, long)]
        scenario: PathBuf,

        #[arg(long)]
        token: String,
    },

    /// Quote native value into a token
    Quote {
        #[arg(short, long)]
        scenario: PathBuf,

        #[arg(long)]
        token: String,

        /// Amount in ether
        #[arg(long)]
        amount: String,
    },

    /// Swap native value into a token
    Swap {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Paying account (label or address)
        #[arg(long)]
        from: String,

        #[arg(long)]
        token: String,

        /// Amount in ether
        #[arg(long)]
        amount: String,

        /// Minimum output in token units (18 decimals); derived from the quote when absent
        #[arg(long)]
        min: Option<String>,

        /// Slippage tolerance applied to the quote when --min is absent
        #[arg(long, default_value_t = 50)]
        slippage_bps: u64,
    },

    /// Point the proxy at another logic implementation
    Upgrade {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Calling account; defaults to the configured deployer
        #[arg(long)]
        caller: Option<String>,

        #[arg(long, default_value = "swap-engine@2")]
        implementation: String,
    },

    /// Print the deployment's configuration and the market's pools
    Inspect {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Write a bincode snapshot of the proxy storage
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Compare the proxy storage against an earlier snapshot
        #[arg(long)]
        compare: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SwapperConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    init_tracing(&config.log_level);
    config.log_summary();

    match cli.command {
        Commands::Sample { output } => {
            cmd_sample(output)?;
        }
        Commands::Deploy {
            scenario,
            admin,
            implementation,
        } => {
            cmd_deploy(&config, scenario, admin, implementation).await?;
        }
        Commands::Fund {
            scenario,
            account,
            amount,
        } => {
            cmd_fund(scenario, account, amount)?;
        }
        Commands::Check { scenario, token } => {
            cmd_check(&config, scenario, token).await?;
        }
        Commands::Quote {
            scenario,
            token,
            amount,
        } => {
            cmd_quote(&config, scenario, token, amount).await?;
        }
        Commands::Swap {
            scenario,
            from,
            token,
            amount,
            min,
            slippage_bps,
        } => {
            cmd_swap(&config, scenario, from, token, amount, min, slippage_bps).await?;
        }
        Commands::Upgrade {
            scenario,
            caller,
            implementation,
        } => {
            cmd_upgrade(&config, scenario, caller, implementation).await?;
        }
        Commands::Inspect {
            scenario,
            snapshot,
            compare,
        } => {
            cmd_inspect(scenario, snapshot, compare)?;
        }
    }

    Ok(())
}

/// RUST_LOG wins over the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load(path: &Path) -> Result<Scenario> {
    io::load_scenario_json(path).context(format!("Failed to load scenario from {:?}", path))
}

/// The configured market, when set, must be the one in the scenario
fn check_market(config: &SwapperConfig, scenario: &Scenario) -> Result<()> {
    if let Some(expected) = config.market {
        let actual = scenario.market.address();
        if expected != actual {
            bail!("Scenario market {} does not match configured market {}", actual, expected);
        }
    }
    Ok(())
}

/// Explicit account, else configured deployer, else the scenario's "admin" label
fn admin_account(config: &SwapperConfig, scenario: &Scenario, explicit: Option<String>) -> Result<Address> {
    match (explicit, config.deployer) {
        (Some(name), _) => scenario.resolve(&name),
        (None, Some(deployer)) => Ok(deployer),
        (None, None) => scenario.resolve("admin"),
    }
}

fn cmd_sample(output_path: PathBuf) -> Result<()> {
    println!("Generating sample scenario...");

    let scenario = Scenario::sample()?;
    io::save_scenario_json(&scenario, &output_path)?;

    println!("Sample scenario saved to {:?}", output_path);
    for (name, address) in &scenario.labels {
        println!("  {:<9} {}", name, address);
    }

    Ok(())
}

async fn cmd_deploy(
    config: &SwapperConfig,
    scenario_path: PathBuf,
    admin: Option<String>,
    implementation: String,
) -> Result<()> {
    println!("Ether Swapper Deploy");
    println!("====================");

    let mut scenario = load(&scenario_path)?;
    check_market(config, &scenario)?;
    let admin = admin_account(config, &scenario, admin)?;

    let proxy = scenario.deploy(admin, &implementation)?;
    io::save_scenario_json(&scenario, &scenario_path)?;

    println!("Proxy deployed at {}", proxy.address());
    println!("  Admin: {}", proxy.admin());
    println!("  Implementation: {} ({})", implementation, io::format_hash(&proxy.implementation()));
    println!("  Reference asset: {}", proxy.get_reference_asset());
    println!("  Market: {}", proxy.get_market_address());
    println!("  Factory: {}", proxy.get_market_factory());
    if let Some(url) = &config.rpc_url {
        println!("  Network: {}", url);
    }

    Ok(())
}

fn cmd_fund(scenario_path: PathBuf, account: String, amount: String) -> Result<()> {
    let mut scenario = load(&scenario_path)?;
    let account = scenario.resolve(&account)?;
    let amount = io::parse_amount(&amount)?;

    scenario.fund(account, amount)?;
    io::save_scenario_json(&scenario, &scenario_path)?;

    println!(
        "Funded {} with {} ETH (balance {} ETH)",
        account,
        io::format_amount(amount),
        io::format_amount(scenario.ledger.native_balance(&account))
    );
    Ok(())
}

async fn cmd_check(config: &SwapperConfig, scenario_path: PathBuf, token: String) -> Result<()> {
    let scenario = load(&scenario_path)?;
    check_market(config, &scenario)?;
    let token = scenario.resolve(&token)?;

    let proxy = scenario.attach()?;
    if proxy.is_token_swappable(&scenario.market, token)? {
        println!("✓ {} has a market", token);
    } else {
        println!("✗ {} has no market", token);
    }
    Ok(())
}

async fn cmd_quote(
    config: &SwapperConfig,
    scenario_path: PathBuf,
    token: String,
    amount: String,
) -> Result<()> {
    let scenario = load(&scenario_path)?;
    check_market(config, &scenario)?;
    let token = scenario.resolve(&token)?;
    let amount = io::parse_amount(&amount)?;

    let proxy = scenario.attach()?;
    let path = [proxy.get_reference_asset(), token];
    let quote = proxy.get_amounts_out(&scenario.market, amount, &path)?;

    if quote.is_zero() {
        println!("No liquidity for {}", token);
    }
    println!("Quote: {}", io::format_quote(&quote));
    Ok(())
}

/// `quote * (10_000 - bps) / 10_000`
fn apply_slippage(quoted: TokenAmount, slippage_bps: u64) -> Result<TokenAmount> {
    if slippage_bps > BPS_DENOMINATOR {
        bail!("Slippage of {} bps exceeds 100%", slippage_bps);
    }
    Ok(quoted * U256::from(BPS_DENOMINATOR - slippage_bps) / U256::from(BPS_DENOMINATOR))
}

async fn cmd_swap(
    config: &SwapperConfig,
    scenario_path: PathBuf,
    from: String,
    token: String,
    amount: String,
    min: Option<String>,
    slippage_bps: u64,
) -> Result<()> {
    println!("Ether Swapper Swap");
    println!("==================");

    let mut scenario = load(&scenario_path)?;
    check_market(config, &scenario)?;
    let caller = scenario.resolve(&from)?;
    let token = scenario.resolve(&token)?;
    let value = io::parse_amount(&amount)?;

    let minimum_output = match min {
        Some(min) => io::parse_amount(&min)?,
        None => {
            let proxy = scenario.attach()?;
            let path = [proxy.get_reference_asset(), token];
            let quote = proxy.get_amounts_out(&scenario.market, value, &path)?;
            let minimum = apply_slippage(quote.amount_out(), slippage_bps)?;
            debug!(quoted = %quote.amount_out(), %minimum, slippage_bps, "derived minimum output");
            minimum
        }
    };

    match scenario.swap(caller, value, token, minimum_output) {
        Ok(receipt) => {
            io::save_scenario_json(&scenario, &scenario_path)?;
            println!("✓ Swap settled");
            println!("{}", io::format_receipt(&receipt));
            println!(
                "  Token balance: {}",
                io::format_amount(scenario.ledger.token_balance(&token, &caller))
            );
        }
        Err(err) => {
            warn!(%caller, %token, "swap reverted");
            println!("✗ Swap reverted: {}", err);
            return Err(err);
        }
    }

    Ok(())
}

async fn cmd_upgrade(
    config: &SwapperConfig,
    scenario_path: PathBuf,
    caller: Option<String>,
    implementation: String,
) -> Result<()> {
    let mut scenario = load(&scenario_path)?;
    check_market(config, &scenario)?;
    let caller = admin_account(config, &scenario, caller)?;

    let before = scenario.attach()?.state();
    scenario.upgrade(caller, &implementation)?;
    let proxy = scenario.attach()?;
    io::save_scenario_json(&scenario, &scenario_path)?;

    println!("Proxy {} now runs {}", proxy.address(), logic_label(proxy.logic()));
    println!("  Implementation: {}", io::format_hash(&proxy.implementation()));
    if proxy.state() == before {
        println!("  Configuration unchanged");
    } else {
        println!("  Configuration changed!");
    }
    Ok(())
}

fn cmd_inspect(
    scenario_path: PathBuf,
    snapshot: Option<PathBuf>,
    compare: Option<PathBuf>,
) -> Result<()> {
    let scenario = load(&scenario_path)?;

    println!("Market {}", scenario.market.address());
    println!("  Factory: {}", scenario.market.factory());
    println!("  Reference asset: {}", scenario.market.reference_asset());
    for (pair, pool) in scenario.market.pools() {
        println!(
            "  Pair {}: {} {} / {} {}{}",
            pair,
            io::format_amount(pool.reserve0),
            pool.token0,
            io::format_amount(pool.reserve1),
            pool.token1,
            if pool.is_empty() { " (no liquidity)" } else { "" },
        );
    }

    let Some(deployment) = &scenario.deployment else {
        println!("No proxy deployed");
        return Ok(());
    };

    let proxy = scenario.attach()?;
    let state = proxy.state();
    println!("Proxy {} ({})", proxy.address(), deployment.implementation);
    println!("  Admin: {}", proxy.admin());
    println!("  Implementation: {}", io::format_hash(&proxy.implementation()));
    println!("  Initialized: {}", state.initialized);
    println!("  Reference asset: {}", proxy.get_reference_asset());
    println!("  Market registry: {}", proxy.get_market_registry());
    println!("  Market address: {}", proxy.get_market_address());
    println!("  Market factory: {}", proxy.get_market_factory());
    println!("  Storage slots: {}", proxy.storage().slot_count());
    for (slot, value) in proxy.storage().iter() {
        println!("    {:#x} = {:#x}", slot, value);
    }
    println!("  Storage root: {}", io::format_hash(&proxy.storage().compute_storage_root()));

    if let Some(path) = compare {
        let earlier = io::deserialize_storage(&io::load_bytes(&path)?)
            .context(format!("Failed to load snapshot from {:?}", path))?;
        let changed = changed_slots(&earlier, proxy.storage());
        if changed.is_empty() {
            println!("✓ Storage matches snapshot {:?}", path);
        } else {
            println!("✗ Storage differs from snapshot {:?}", path);
            for slot in changed {
                println!(
                    "    {:#x}: {:#x} -> {:#x}",
                    slot,
                    earlier.get_storage(&slot),
                    proxy.storage().get_storage(&slot)
                );
            }
        }
    }

    if let Some(path) = snapshot {
        let bytes = io::serialize_storage(proxy.storage())?;
        io::save_bytes(&bytes, &path)?;
        println!("Storage snapshot written to {:?}", path);
    }

    Ok(())
}

/// Slots whose value differs between two storage units
fn changed_slots(earlier: &ProxyStorage, current: &ProxyStorage) -> Vec<U256> {
    let mut slots: Vec<U256> = earlier
        .iter()
        .chain(current.iter())
        .map(|(slot, _)| *slot)
        .filter(|slot| earlier.get_storage(slot) != current.get_storage(slot))
        .collect();
    slots.sort();
    slots.dedup();
    slots
}
