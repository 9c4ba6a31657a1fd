//! I/O utilities for the host
//!
//! Scenario files are JSON; storage snapshots are bincode.

use crate::scenario::Scenario;
use anyhow::{Context, Result};
use ether_swapper_core::prelude::*;
use alloy_primitives::utils::{format_ether, parse_ether};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Save a scenario to a JSON file
pub fn save_scenario_json<P: AsRef<Path>>(scenario: &Scenario, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(scenario)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a scenario from a JSON file
pub fn load_scenario_json<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let json = fs::read_to_string(path)?;
    let scenario: Scenario = serde_json::from_str(&json)?;
    Ok(scenario)
}

/// Encode proxy storage for a snapshot file
pub fn serialize_storage(storage: &ProxyStorage) -> Result<Vec<u8>> {
    bincode::serialize(storage).context("Failed to serialize ProxyStorage")
}

/// Decode a storage snapshot
pub fn deserialize_storage(data: &[u8]) -> Result<ProxyStorage> {
    bincode::deserialize(data).context("Failed to deserialize ProxyStorage")
}

/// Save binary data to a file
pub fn save_bytes<P: AsRef<Path>>(data: &[u8], path: P) -> Result<()> {
    fs::write(path, data)?;
    Ok(())
}

/// Load binary data from a file
pub fn load_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let data = fs::read(path)?;
    Ok(data)
}

pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).with_context(|| format!("Invalid address: {}", value))
}

/// Parse a decimal ether amount ("1.5") into wei
pub fn parse_amount(value: &str) -> Result<U256> {
    parse_ether(value.trim()).with_context(|| format!("Invalid ether amount: {}", value))
}

pub fn format_amount(amount: U256) -> String {
    format_ether(amount)
}

/// Format a hash as a hex string
pub fn format_hash(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash.as_slice()))
}

/// Format a quote for display
pub fn format_quote(quote: &Quote) -> String {
    let amounts: Vec<String> = quote.amounts().iter().map(|a| format_amount(*a)).collect();
    format!("[{}]", amounts.join(", "))
}

/// Format a receipt for display
pub fn format_receipt(receipt: &SwapReceipt) -> String {
    format!(
        "SwapReceipt {{\n  \
         caller: {},\n  \
         token: {},\n  \
         amount_in: {},\n  \
         amount_out: {}\n\
         }}",
        receipt.caller,
        receipt.token,
        format_amount(receipt.amount_in),
        format_amount(receipt.amount_out),
    )
}
