//! Structural-change and zap notifications.
//!
//! One event per state-changing call, recorded in order on the orchestrator.
//! This is the contract-event analog: callers and tests consume them through
//! [`crate::Zap::events`] / [`crate::Zap::take_events`].

use alloy_primitives::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ZapEvent {
    TokenAdded {
        token: Address,
        /// true when the token was learned from a factory sync rather than
        /// registered explicitly by the owner
        auto_discovered: bool,
    },
    TokenRemoved {
        token: Address,
    },
    IntermediateTokenAdded {
        token: Address,
    },
    IntermediateTokenRemoved {
        token: Address,
    },
    PoolAdded {
        pool: Address,
        auto_discovered: bool,
    },
    PoolRemoved {
        pool: Address,
    },
    PresetPathSet {
        from: Address,
        to: Address,
        path: Vec<Address>,
        auto_calculated: bool,
    },
    PresetPathRemoved {
        from: Address,
        to: Address,
    },
    /// Factory sync progress: first and last factory index ingested by the call.
    PoolsSynced {
        start: usize,
        end: usize,
    },
    ZapIn {
        pool: Address,
        amount_in: U256,
        shares: U256,
    },
    ZapInToken {
        from_token: Address,
        target: Address,
        amount_in: U256,
        amount_out: U256,
    },
    ZapOut {
        from_pool: Address,
        target: Address,
        amount_in: U256,
        amount_out: U256,
    },
    BalanceWithdrawn {
        asset: Address,
        amount: U256,
    },
}
