//! Native-value and token balances
//!
//! Stands in for account balances and ERC20 balance tables of the chain the
//! swapper runs on.

use crate::errors::LedgerError;
use crate::types::{Address, TokenAmount, Wei, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    /// Native balances indexed by account
    native: BTreeMap<Address, Wei>,
    /// Token balances indexed by token, then holder
    tokens: BTreeMap<Address, BTreeMap<Address, TokenAmount>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn native_balance(&self, account: &Address) -> Wei {
        self.native.get(account).copied().unwrap_or(U256::ZERO)
    }

    pub fn token_balance(&self, token: &Address, holder: &Address) -> TokenAmount {
        self.tokens
            .get(token)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Credit native value out of thin air (genesis allocation)
    pub fn fund_native(&mut self, account: Address, amount: Wei) -> Result<(), LedgerError> {
        let balance = self.native.entry(account).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(account))?;
        Ok(())
    }

    pub fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: Wei,
    ) -> Result<(), LedgerError> {
        let available = self.native_balance(&from);
        if available < amount {
            return Err(LedgerError::InsufficientNativeBalance {
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .native_balance(&to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(to))?;
        self.native.insert(from, available - amount);
        self.native.insert(to, credited);
        Ok(())
    }

    pub fn mint(
        &mut self,
        token: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        let balance = self.tokens.entry(token).or_default().entry(to).or_default();
        *balance = balance.checked_add(amount).ok_or(LedgerError::Overflow(to))?;
        Ok(())
    }

    pub fn transfer_token(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: TokenAmount,
    ) -> Result<(), LedgerError> {
        let available = self.token_balance(&token, &from);
        if available < amount {
            return Err(LedgerError::InsufficientTokenBalance {
                token,
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .token_balance(&token, &to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(to))?;
        let holders = self.tokens.entry(token).or_default();
        holders.insert(from, available - amount);
        holders.insert(to, credited);
        Ok(())
    }
}
