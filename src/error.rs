//! Error taxonomy for the zap engine.
//!
//! Every failure is a synchronous abort with a machine-checkable reason;
//! nothing is retried internally. A failed call performs no partial commit:
//! the engine's own registries are only mutated after all checks pass, and
//! host-side mutations are covered by the host's all-or-nothing call
//! semantics.

use alloy_primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZapError {
    // ----- input errors -----
    #[error("zap: given amount should be > 0")]
    ZeroAmount,
    #[error("zap: from and to are the same asset")]
    IdenticalAssets,
    #[error("zap: {0} is not a registered token")]
    NotAToken(Address),
    #[error("zap: {0} is not a known liquidity pool")]
    NotAPool(Address),

    // ----- not-found errors -----
    #[error("registry: {0} is already registered")]
    AlreadyRegistered(Address),
    #[error("registry: {0} is not registered")]
    NotRegistered(Address),
    #[error("registry: index {index} out of bounds (length {len})")]
    OutOfBounds { index: usize, len: usize },
    #[error("pools: {0} is not a known pool")]
    UnknownPool(Address),
    #[error("exchange: {0} is not a pair")]
    UnknownPair(Address),

    // ----- routing errors -----
    #[error("routing: no route from {from} to {to}")]
    NoRoute { from: Address, to: Address },

    // ----- slippage, propagated unchanged from the router -----
    #[error("router: output {got} below minimum {min}")]
    Slippage { got: U256, min: U256 },

    // ----- authorization -----
    #[error("zap: caller {0} is not the owner")]
    NotOwner(Address),

    // ----- host-side failures surfaced through the collaborator boundary -----
    #[error("token: insufficient balance of {token} for {owner}")]
    InsufficientBalance { token: Address, owner: Address },
    #[error("token: insufficient allowance on {token} from {owner}")]
    InsufficientAllowance { token: Address, owner: Address },
    #[error("pair {0}: insufficient liquidity")]
    InsufficientLiquidity(Address),
    #[error("router: deadline expired")]
    Expired,
}
