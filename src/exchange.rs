//! External collaborator boundary: the constant-product AMM venue.
//!
//! The engine never implements the AMM itself; it drives it through this
//! trait. The methods mirror the four collaborator interfaces exactly:
//! fungible token (`transfer`/`transferFrom`/`approve`/`balanceOf`), pair
//! (`token0`/`token1`/reserves/LP-share supply), factory (`allPairsLength`/
//! `allPairs`/`getPair`), and router (`swapExactTokensForTokens`/
//! `addLiquidity`/`removeLiquidity`), plus the wrapped-native deposit and
//! withdraw surface.
//!
//! Calls are serialized and run to completion; atomicity of a failed call is
//! the host's concern, not the trait implementor's bookkeeping problem here.

use alloy_primitives::{Address, U256};

use crate::error::ZapError;

/// Sentinel identifier for the native coin (the zero address).
pub const NATIVE: Address = Address::ZERO;

pub trait Exchange {
    // ----- fungible token interface -----

    fn balance_of(&self, token: Address, owner: Address) -> U256;
    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;
    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), ZapError>;
    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ZapError>;
    /// Spender-mediated pull; fails on missing allowance or balance.
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ZapError>;

    // ----- pair interface (the pair address doubles as its LP share token) -----

    fn token0(&self, pair: Address) -> Result<Address, ZapError>;
    fn token1(&self, pair: Address) -> Result<Address, ZapError>;
    fn reserves(&self, pair: Address) -> Result<(U256, U256), ZapError>;
    fn total_supply(&self, pair: Address) -> Result<U256, ZapError>;

    // ----- factory interface -----

    fn all_pairs_length(&self) -> usize;
    fn all_pairs(&self, index: usize) -> Result<Address, ZapError>;
    /// `getPair(a, b)`, order-insensitive; None when the pair was never created.
    fn factory_pool_for(&self, a: Address, b: Address) -> Option<Address>;

    // ----- router interface -----

    /// Address tokens must be approved to before router pulls.
    fn router_address(&self) -> Address;
    fn swap_exact_tokens_for_tokens(
        &mut self,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>, ZapError>;
    /// Returns (amount_a_used, amount_b_used, liquidity_minted).
    #[allow(clippy::too_many_arguments)]
    fn add_liquidity(
        &mut self,
        caller: Address,
        token_a: Address,
        token_b: Address,
        amount_a_desired: U256,
        amount_b_desired: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
    ) -> Result<(U256, U256, U256), ZapError>;
    /// Returns (amount_a, amount_b) paid out.
    #[allow(clippy::too_many_arguments)]
    fn remove_liquidity(
        &mut self,
        caller: Address,
        token_a: Address,
        token_b: Address,
        liquidity: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: u64,
    ) -> Result<(U256, U256), ZapError>;

    // ----- native coin and its wrapped form -----

    fn wrapped_native(&self) -> Address;
    fn native_balance_of(&self, owner: Address) -> U256;
    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ZapError>;
    /// Deposit native coin into the wrapped-native token.
    fn wrap_native(&mut self, owner: Address, amount: U256) -> Result<(), ZapError>;
    fn unwrap_native(&mut self, owner: Address, amount: U256) -> Result<(), ZapError>;

    /// Current host time, compared against router deadlines.
    fn timestamp(&self) -> u64;
}
