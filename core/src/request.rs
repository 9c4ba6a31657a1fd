//! Call context and swap request types
//!
//! A request lives for one call; it is resolved against the path
//! `[reference_asset, target_token]`.

use crate::types::{Address, TokenAmount, Wei, U256};
use serde::{Deserialize, Serialize};

/// Who is calling and how much native value is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Caller address (msg.sender)
    pub caller: Address,
    /// Attached native value (msg.value)
    pub value: Wei,
}

impl CallContext {
    /// A call without attached value
    pub fn new(caller: Address) -> Self {
        Self {
            caller,
            value: U256::ZERO,
        }
    }

    /// Attach native value
    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }
}

/// One native-to-token swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    /// Account paying and receiving
    pub caller: Address,
    /// Native value to swap
    pub input_amount: Wei,
    /// Token to receive
    pub target_token: Address,
    /// Floor on acceptable output
    pub minimum_output: TokenAmount,
}

impl SwapRequest {
    pub fn new(
        caller: Address,
        input_amount: Wei,
        target_token: Address,
        minimum_output: TokenAmount,
    ) -> Self {
        Self {
            caller,
            input_amount,
            target_token,
            minimum_output,
        }
    }

    /// Build from a call context
    pub fn from_call(ctx: &CallContext, target_token: Address, minimum_output: TokenAmount) -> Self {
        Self::new(ctx.caller, ctx.value, target_token, minimum_output)
    }

    /// Path through the pivot asset
    pub fn path(&self, reference_asset: Address) -> [Address; 2] {
        [reference_asset, self.target_token]
    }
}
