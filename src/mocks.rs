//! In-memory constant-product venue for tests and demos.
//!
//! A complete [`Exchange`] implementation: fungible-token ledger with
//! allowances, native-coin ledger, wrapped-native deposit/withdraw, a factory
//! with an ordered pair list, and a router that swaps and mints through the
//! same formulas in [`crate::math`] that the estimator uses. A pair's address
//! doubles as its LP share token in the ledger.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::error::ZapError;
use crate::exchange::{Exchange, NATIVE};
use crate::math;
use crate::registry::canonical_pair;
use crate::zap::Zap;

#[derive(Debug, Clone)]
pub struct PairState {
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    pub total_supply: U256,
}

#[derive(Debug, Clone)]
pub struct MockExchange {
    router: Address,
    wrapped_native: Address,
    now: u64,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    native: HashMap<Address, U256>,
    pairs: HashMap<Address, PairState>,
    all_pairs: Vec<Address>,
    pair_by_tokens: HashMap<(Address, Address), Address>,
}

impl MockExchange {
    pub fn new(wrapped_native: Address) -> Self {
        Self {
            router: Address::repeat_byte(0xee),
            wrapped_native,
            now: 1_700_000_000,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            native: HashMap::new(),
            pairs: HashMap::new(),
            all_pairs: Vec::new(),
            pair_by_tokens: HashMap::new(),
        }
    }

    // ----- test fixture surface -----

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn set_timestamp(&mut self, now: u64) {
        self.now = now;
    }

    pub fn mint(&mut self, token: Address, to: Address, amount: U256) {
        *self.balances.entry((token, to)).or_default() += amount;
    }

    pub fn mint_native(&mut self, to: Address, amount: U256) {
        *self.native.entry(to).or_default() += amount;
    }

    /// Register a pair in the factory. Deterministic address derived from the
    /// creation index, so fixtures are reproducible.
    pub fn create_pair(&mut self, a: Address, b: Address) -> Result<Address, ZapError> {
        if a == b {
            return Err(ZapError::IdenticalAssets);
        }
        let key = canonical_pair(a, b);
        if let Some(&existing) = self.pair_by_tokens.get(&key) {
            return Err(ZapError::AlreadyRegistered(existing));
        }
        let pair = Self::pair_address(self.all_pairs.len());
        self.pairs.insert(
            pair,
            PairState {
                token0: key.0,
                token1: key.1,
                reserve0: U256::ZERO,
                reserve1: U256::ZERO,
                total_supply: U256::ZERO,
            },
        );
        self.all_pairs.push(pair);
        self.pair_by_tokens.insert(key, pair);
        Ok(pair)
    }

    /// Seed a pair with reserves directly, minting the corresponding LP
    /// shares to `to`. Convenience wrapper over mint + approve + addLiquidity.
    pub fn seed_pair(
        &mut self,
        a: Address,
        b: Address,
        amount_a: U256,
        amount_b: U256,
        to: Address,
    ) -> Result<Address, ZapError> {
        let pair = match self.pair_by_tokens.get(&canonical_pair(a, b)) {
            Some(&pair) => pair,
            None => self.create_pair(a, b)?,
        };
        self.mint(a, to, amount_a);
        self.mint(b, to, amount_b);
        let router = self.router;
        self.approve(a, to, router, U256::MAX)?;
        self.approve(b, to, router, U256::MAX)?;
        let deadline = self.now;
        self.add_liquidity(
            to,
            a,
            b,
            amount_a,
            amount_b,
            U256::ZERO,
            U256::ZERO,
            to,
            deadline,
        )?;
        Ok(pair)
    }

    pub fn pair_state(&self, pair: Address) -> Option<&PairState> {
        self.pairs.get(&pair)
    }

    fn pair_address(index: usize) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = 0xfa;
        bytes[18..20].copy_from_slice(&((index as u16) + 1).to_be_bytes());
        Address::from(bytes)
    }

    // ----- internal ledger plumbing -----

    fn balance(&self, token: Address, owner: Address) -> U256 {
        self.balances
            .get(&(token, owner))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn debit(&mut self, token: Address, owner: Address, amount: U256) -> Result<(), ZapError> {
        let held = self.balance(token, owner);
        if held < amount {
            return Err(ZapError::InsufficientBalance { token, owner });
        }
        self.balances.insert((token, owner), held - amount);
        Ok(())
    }

    fn credit(&mut self, token: Address, owner: Address, amount: U256) {
        *self.balances.entry((token, owner)).or_default() += amount;
    }

    fn spend_allowance(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), ZapError> {
        let allowed = self
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO);
        if allowed < amount {
            return Err(ZapError::InsufficientAllowance { token, owner });
        }
        if allowed != U256::MAX {
            self.allowances
                .insert((token, owner, spender), allowed - amount);
        }
        Ok(())
    }

    fn check_deadline(&self, deadline: u64) -> Result<(), ZapError> {
        if self.now > deadline {
            return Err(ZapError::Expired);
        }
        Ok(())
    }

    fn pair_for(&self, x: Address, y: Address) -> Result<Address, ZapError> {
        self.pair_by_tokens
            .get(&canonical_pair(x, y))
            .copied()
            .ok_or(ZapError::NoRoute { from: x, to: y })
    }

    /// Single constant-product hop: pull nothing (the caller's ledger moves
    /// are handled by the router entry point), just rotate the reserves.
    fn swap_hop(&mut self, pair: Address, token_in: Address, amount_in: U256) -> Result<U256, ZapError> {
        let state = self
            .pairs
            .get_mut(&pair)
            .ok_or(ZapError::UnknownPair(pair))?;
        let (reserve_in, reserve_out) = if token_in == state.token0 {
            (state.reserve0, state.reserve1)
        } else {
            (state.reserve1, state.reserve0)
        };
        if reserve_in.is_zero() || reserve_out.is_zero() {
            return Err(ZapError::InsufficientLiquidity(pair));
        }
        let out = math::get_amount_out(amount_in, reserve_in, reserve_out);
        if out.is_zero() {
            return Err(ZapError::InsufficientLiquidity(pair));
        }
        if token_in == state.token0 {
            state.reserve0 += amount_in;
            state.reserve1 -= out;
        } else {
            state.reserve1 += amount_in;
            state.reserve0 -= out;
        }
        Ok(out)
    }
}

impl Exchange for MockExchange {
    fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.balance(token, owner)
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), ZapError> {
        self.allowances.insert((token, owner, spender), amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ZapError> {
        self.debit(token, from, amount)?;
        self.credit(token, to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ZapError> {
        self.spend_allowance(token, from, spender, amount)?;
        self.transfer(token, from, to, amount)
    }

    fn token0(&self, pair: Address) -> Result<Address, ZapError> {
        self.pairs
            .get(&pair)
            .map(|p| p.token0)
            .ok_or(ZapError::UnknownPair(pair))
    }

    fn token1(&self, pair: Address) -> Result<Address, ZapError> {
        self.pairs
            .get(&pair)
            .map(|p| p.token1)
            .ok_or(ZapError::UnknownPair(pair))
    }

    fn reserves(&self, pair: Address) -> Result<(U256, U256), ZapError> {
        self.pairs
            .get(&pair)
            .map(|p| (p.reserve0, p.reserve1))
            .ok_or(ZapError::UnknownPair(pair))
    }

    fn total_supply(&self, pair: Address) -> Result<U256, ZapError> {
        self.pairs
            .get(&pair)
            .map(|p| p.total_supply)
            .ok_or(ZapError::UnknownPair(pair))
    }

    fn all_pairs_length(&self) -> usize {
        self.all_pairs.len()
    }

    fn all_pairs(&self, index: usize) -> Result<Address, ZapError> {
        self.all_pairs
            .get(index)
            .copied()
            .ok_or(ZapError::OutOfBounds {
                index,
                len: self.all_pairs.len(),
            })
    }

    fn factory_pool_for(&self, a: Address, b: Address) -> Option<Address> {
        self.pair_by_tokens.get(&canonical_pair(a, b)).copied()
    }

    fn router_address(&self) -> Address {
        self.router
    }

    fn swap_exact_tokens_for_tokens(
        &mut self,
        caller: Address,
        amount_in: U256,
        amount_out_min: U256,
        path: &[Address],
        to: Address,
        deadline: u64,
    ) -> Result<Vec<U256>, ZapError> {
        self.check_deadline(deadline)?;
        if path.len() < 2 {
            return Err(ZapError::NoRoute {
                from: path.first().copied().unwrap_or(NATIVE),
                to: path.last().copied().unwrap_or(NATIVE),
            });
        }
        let router = self.router;
        self.spend_allowance(path[0], caller, router, amount_in)?;
        self.debit(path[0], caller, amount_in)?;
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        let mut held = amount_in;
        for hop in path.windows(2) {
            let pair = self.pair_for(hop[0], hop[1])?;
            held = self.swap_hop(pair, hop[0], held)?;
            amounts.push(held);
        }
        if held < amount_out_min {
            return Err(ZapError::Slippage {
                got: held,
                min: amount_out_min,
            });
        }
        self.credit(path[path.len() - 1], to, held);
        Ok(amounts)
    }

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
    ) -> Result<(U256, U256, U256), ZapError> {
        self.check_deadline(deadline)?;
        let pair = self.pair_for(token_a, token_b)?;
        let state = &self.pairs[&pair];
        let a_is_0 = token_a == state.token0;
        let (reserve_a, reserve_b) = if a_is_0 {
            (state.reserve0, state.reserve1)
        } else {
            (state.reserve1, state.reserve0)
        };
        let (amount_a, amount_b) =
            math::optimal_add_amounts(amount_a_desired, amount_b_desired, reserve_a, reserve_b);
        if amount_a < amount_a_min {
            return Err(ZapError::Slippage {
                got: amount_a,
                min: amount_a_min,
            });
        }
        if amount_b < amount_b_min {
            return Err(ZapError::Slippage {
                got: amount_b,
                min: amount_b_min,
            });
        }
        let router = self.router;
        self.spend_allowance(token_a, caller, router, amount_a)?;
        self.spend_allowance(token_b, caller, router, amount_b)?;
        self.debit(token_a, caller, amount_a)?;
        self.debit(token_b, caller, amount_b)?;

        let state = self.pairs.get_mut(&pair).expect("pair checked above");
        let (amount0, amount1) = if a_is_0 {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };
        let minted = math::liquidity_minted(
            amount0,
            amount1,
            state.reserve0,
            state.reserve1,
            state.total_supply,
        );
        if minted.is_zero() {
            return Err(ZapError::InsufficientLiquidity(pair));
        }
        let first_mint = state.total_supply.is_zero();
        state.reserve0 += amount0;
        state.reserve1 += amount1;
        state.total_supply += minted;
        if first_mint {
            // the permanently locked floor
            state.total_supply += U256::from(math::MINIMUM_LIQUIDITY);
        }
        self.credit(pair, to, minted);
        Ok((amount_a, amount_b, minted))
    }

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
    ) -> Result<(U256, U256), ZapError> {
        self.check_deadline(deadline)?;
        let pair = self.pair_for(token_a, token_b)?;
        let router = self.router;
        self.spend_allowance(pair, caller, router, liquidity)?;
        self.debit(pair, caller, liquidity)?;
        let state = self.pairs.get_mut(&pair).expect("pair checked above");
        let (amount0, amount1) =
            math::remove_amounts(liquidity, state.reserve0, state.reserve1, state.total_supply);
        state.reserve0 -= amount0;
        state.reserve1 -= amount1;
        state.total_supply -= liquidity;
        let a_is_0 = token_a == state.token0;
        let (amount_a, amount_b) = if a_is_0 {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };
        if amount_a < amount_a_min {
            return Err(ZapError::Slippage {
                got: amount_a,
                min: amount_a_min,
            });
        }
        if amount_b < amount_b_min {
            return Err(ZapError::Slippage {
                got: amount_b,
                min: amount_b_min,
            });
        }
        self.credit(token_a, to, amount_a);
        self.credit(token_b, to, amount_b);
        Ok((amount_a, amount_b))
    }

    fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    fn native_balance_of(&self, owner: Address) -> U256 {
        self.native.get(&owner).copied().unwrap_or(U256::ZERO)
    }

    fn transfer_native(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ZapError> {
        let held = self.native_balance_of(from);
        if held < amount {
            return Err(ZapError::InsufficientBalance {
                token: NATIVE,
                owner: from,
            });
        }
        self.native.insert(from, held - amount);
        *self.native.entry(to).or_default() += amount;
        Ok(())
    }

    fn wrap_native(&mut self, owner: Address, amount: U256) -> Result<(), ZapError> {
        let held = self.native_balance_of(owner);
        if held < amount {
            return Err(ZapError::InsufficientBalance {
                token: NATIVE,
                owner,
            });
        }
        self.native.insert(owner, held - amount);
        self.credit(self.wrapped_native, owner, amount);
        Ok(())
    }

    fn unwrap_native(&mut self, owner: Address, amount: U256) -> Result<(), ZapError> {
        self.debit(self.wrapped_native, owner, amount)?;
        *self.native.entry(owner).or_default() += amount;
        Ok(())
    }

    fn timestamp(&self) -> u64 {
        self.now
    }
}

/// Engine plus venue with all-or-nothing call semantics, the way a real host
/// runs the engine: on an error the pre-call state of both is restored.
pub struct Sandbox {
    pub zap: Zap,
    pub exchange: MockExchange,
}

impl Sandbox {
    pub fn new(zap: Zap, exchange: MockExchange) -> Self {
        Self { zap, exchange }
    }

    pub fn call<T>(
        &mut self,
        f: impl FnOnce(&mut Zap, &mut MockExchange) -> Result<T, ZapError>,
    ) -> Result<T, ZapError> {
        let zap_snapshot = self.zap.clone();
        let exchange_snapshot = self.exchange.clone();
        match f(&mut self.zap, &mut self.exchange) {
            Ok(v) => Ok(v),
            Err(e) => {
                self.zap = zap_snapshot;
                self.exchange = exchange_snapshot;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_word(U256::from(n).into())
    }

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn swap_moves_reserves_and_pays_the_recipient() {
        let (a, b, lp_owner, trader) = (addr(1), addr(2), addr(50), addr(51));
        let mut ex = MockExchange::new(addr(9));
        let pair = ex.seed_pair(a, b, u(1_000_000), u(1_000_000), lp_owner).unwrap();
        ex.mint(a, trader, u(1000));
        let router = ex.router_address();
        ex.approve(a, trader, router, U256::MAX).unwrap();
        let deadline = ex.now();
        let amounts = ex
            .swap_exact_tokens_for_tokens(trader, u(1000), U256::ZERO, &[a, b], trader, deadline)
            .unwrap();
        assert_eq!(amounts.len(), 2);
        let expected = math::get_amount_out(u(1000), u(1_000_000), u(1_000_000));
        assert_eq!(amounts[1], expected);
        assert_eq!(ex.balance_of(b, trader), expected);
        assert_eq!(ex.balance_of(a, trader), U256::ZERO);
        let state = ex.pair_state(pair).unwrap();
        assert_eq!(state.reserve0 + state.reserve1, u(2_000_000) + u(1000) - expected);
    }

    #[test]
    fn expired_deadline_rejects_the_swap() {
        let (a, b, owner) = (addr(1), addr(2), addr(50));
        let mut ex = MockExchange::new(addr(9));
        ex.seed_pair(a, b, u(1_000_000), u(1_000_000), owner).unwrap();
        ex.mint(a, owner, u(1000));
        let deadline = ex.now() - 1;
        let err = ex
            .swap_exact_tokens_for_tokens(owner, u(1000), U256::ZERO, &[a, b], owner, deadline)
            .unwrap_err();
        assert_eq!(err, ZapError::Expired);
    }

    #[test]
    fn first_mint_locks_the_minimum_liquidity_floor() {
        let (a, b, owner) = (addr(1), addr(2), addr(50));
        let mut ex = MockExchange::new(addr(9));
        let pair = ex.seed_pair(a, b, u(4_000_000), u(1_000_000), owner).unwrap();
        // sqrt(4e6 * 1e6) = 2e6, minus the locked floor
        assert_eq!(ex.balance_of(pair, owner), u(2_000_000 - 1000));
        assert_eq!(ex.total_supply(pair).unwrap(), u(2_000_000));
    }

    #[test]
    fn remove_liquidity_pays_out_proportionally() {
        let (a, b, owner) = (addr(1), addr(2), addr(50));
        let mut ex = MockExchange::new(addr(9));
        let pair = ex.seed_pair(a, b, u(1_000_000), u(4_000_000), owner).unwrap();
        let shares = ex.balance_of(pair, owner);
        let router = ex.router_address();
        ex.approve(pair, owner, router, U256::MAX).unwrap();
        let deadline = ex.now();
        let half = shares / u(2);
        let (out_a, out_b) = ex
            .remove_liquidity(owner, a, b, half, U256::ZERO, U256::ZERO, owner, deadline)
            .unwrap();
        // burning half the owner's shares of a 2e6-supply pool
        assert_eq!(out_a, half * u(1_000_000) / u(2_000_000));
        assert_eq!(out_b, half * u(4_000_000) / u(2_000_000));
        assert_eq!(ex.balance_of(a, owner), out_a);
        assert_eq!(ex.balance_of(b, owner), out_b);
    }

    #[test]
    fn transfer_from_requires_an_allowance() {
        let (t, from, spender, to) = (addr(1), addr(50), addr(51), addr(52));
        let mut ex = MockExchange::new(addr(9));
        ex.mint(t, from, u(100));
        let err = ex.transfer_from(t, spender, from, to, u(10)).unwrap_err();
        assert_eq!(
            err,
            ZapError::InsufficientAllowance { token: t, owner: from }
        );
        ex.approve(t, from, spender, u(10)).unwrap();
        ex.transfer_from(t, spender, from, to, u(10)).unwrap();
        assert_eq!(ex.balance_of(t, to), u(10));
        assert_eq!(ex.allowance(t, from, spender), U256::ZERO);
    }

    #[test]
    fn wrap_and_unwrap_round_trip_the_native_ledger() {
        let owner = addr(50);
        let wnative = addr(9);
        let mut ex = MockExchange::new(wnative);
        ex.mint_native(owner, u(500));
        ex.wrap_native(owner, u(200)).unwrap();
        assert_eq!(ex.native_balance_of(owner), u(300));
        assert_eq!(ex.balance_of(wnative, owner), u(200));
        ex.unwrap_native(owner, u(200)).unwrap();
        assert_eq!(ex.native_balance_of(owner), u(500));
        assert_eq!(ex.balance_of(wnative, owner), U256::ZERO);
    }
}
