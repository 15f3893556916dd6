//! Read-only zap estimation.
//!
//! Simulates a zap against a local copy of the pool reserves, using the same
//! formulas from [`crate::math`] and the same operation order as execution.
//! That parity is the whole point: an estimate is valid as a `min_out` bound
//! only if, with unchanged venue state, execution produces exactly the
//! estimated amount. In particular, when a swap leg trades through the target
//! pool itself, the simulated add sees the post-swap reserves just like the
//! real router does.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};

use crate::error::ZapError;
use crate::exchange::{Exchange, NATIVE};
use crate::math;
use crate::zap::Zap;

/// Predicted shape of a zap into an LP position: the hub the route goes
/// through, the full hop sequence feeding each constituent leg (a
/// single-element path means the leg is held, not swapped), and the leg
/// amounts presented to the liquidity add before its proportional trim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZapInLpEstimate {
    pub intermediate: Address,
    pub path0: Vec<Address>,
    pub path1: Vec<Address>,
    pub amount0: U256,
    pub amount1: U256,
}

pub struct Estimator<'a, E: Exchange> {
    zap: &'a Zap,
    exchange: &'a E,
}

impl<'a, E: Exchange> Estimator<'a, E> {
    pub fn new(zap: &'a Zap, exchange: &'a E) -> Self {
        Self { zap, exchange }
    }

    /// The resolved token-to-token path and the per-hop amounts along it,
    /// index 0 of the amounts being the input amount.
    pub fn token_to_token_amounts_out(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(Vec<Address>, Vec<U256>), ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        let path = self.zap.path_for_token_to_token(from, to)?;
        let mut sim = Sim::new(self.exchange);
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount);
        let mut held = amount;
        for hop in path.windows(2) {
            held = sim.swap_hop(hop[0], hop[1], held)?;
            amounts.push(held);
        }
        Ok((path, amounts))
    }

    /// Route shape and leg amounts for zapping `amount` of `from` into
    /// `pool`, without running the final liquidity add.
    pub fn zap_in_to_lp(
        &self,
        from: Address,
        pool: Address,
        amount: U256,
    ) -> Result<ZapInLpEstimate, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        let mut sim = Sim::new(self.exchange);
        let (estimate, _) = self.simulate_provide(&mut sim, from, pool, amount)?;
        Ok(estimate)
    }

    /// Shares minted by a native-coin zap into `pool`, end to end. Wrapping
    /// is 1:1, so the simulation starts from the wrapped-native asset.
    pub fn zap_in_shares(&self, pool: Address, amount: U256) -> Result<U256, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        let mut sim = Sim::new(self.exchange);
        let (_, shares) =
            self.simulate_provide(&mut sim, self.zap.wrapped_native(), pool, amount)?;
        Ok(shares)
    }

    /// Output of `zap_in_token`: LP shares when `target` is a known pool,
    /// the swapped token amount otherwise.
    pub fn zap_in_token_amount(
        &self,
        from_token: Address,
        target: Address,
        amount: U256,
    ) -> Result<U256, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        if from_token == NATIVE || !self.zap.is_token(from_token) {
            return Err(ZapError::NotAToken(from_token));
        }
        if self.zap.is_pool(target) {
            let mut sim = Sim::new(self.exchange);
            let (_, shares) = self.simulate_provide(&mut sim, from_token, target, amount)?;
            Ok(shares)
        } else {
            if target == from_token {
                return Err(ZapError::IdenticalAssets);
            }
            let (_, amounts) = self.token_to_token_amounts_out(from_token, target, amount)?;
            Ok(amounts.last().copied().unwrap_or(amount))
        }
    }

    /// Output of `zap_out`: total target amount (token or native) or total
    /// shares of the target pool.
    pub fn zap_out_amount(
        &self,
        from_pool: Address,
        target: Address,
        amount: U256,
    ) -> Result<U256, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        let (p0, p1) = self
            .zap
            .pool_constituents(from_pool)
            .ok_or(ZapError::NotAPool(from_pool))?;
        if from_pool == target {
            return Err(ZapError::IdenticalAssets);
        }
        let mut sim = Sim::new(self.exchange);
        let (a0, a1) = sim.remove(from_pool, amount)?;

        if self.zap.is_pool(target) {
            let mut shares_total = U256::ZERO;
            for (c, withdrawn) in [(p0, a0), (p1, a1)] {
                let (_, shares) = self.simulate_provide(&mut sim, c, target, withdrawn)?;
                shares_total += shares;
            }
            Ok(shares_total)
        } else {
            let out_asset = if target == NATIVE {
                self.zap.wrapped_native()
            } else {
                target
            };
            let mut total = U256::ZERO;
            for (c, withdrawn) in [(p0, a0), (p1, a1)] {
                total += if c == out_asset {
                    withdrawn
                } else {
                    let path = self.zap.path_for_token_to_token(c, out_asset)?;
                    sim.swap_path(&path, withdrawn)?
                };
            }
            Ok(total)
        }
    }

    /// The shared provide-liquidity simulation, mirroring execution: route
    /// `from` to the hub, then either the fee-aware one-sided split (hub is a
    /// constituent) or the half split (p0 leg first).
    fn simulate_provide(
        &self,
        sim: &mut Sim<'_, E>,
        from: Address,
        pool: Address,
        amount: U256,
    ) -> Result<(ZapInLpEstimate, U256), ZapError> {
        let (p0, p1) = self
            .zap
            .pool_constituents(pool)
            .ok_or(ZapError::NotAPool(pool))?;
        let hub = self
            .zap
            .suitable_intermediate_for_token_to_pool(from, pool)?;
        let (base_path, held) = if hub == from {
            (vec![from], amount)
        } else {
            let path = self.zap.path_for_token_to_token(from, hub)?;
            let held = sim.swap_path(&path, amount)?;
            (path, held)
        };

        let (path0, path1, leg0, leg1) = if hub == p0 || hub == p1 {
            let (r0, r1) = sim.reserves(pool)?;
            let reserve_in = if hub == p0 { r0 } else { r1 };
            let other = if hub == p0 { p1 } else { p0 };
            let swap_amount = math::optimal_swap_in(held, reserve_in);
            let out = sim.swap_hop(hub, other, swap_amount)?;
            let mut swapped_path = base_path.clone();
            swapped_path.push(other);
            if hub == p0 {
                (base_path, swapped_path, held - swap_amount, out)
            } else {
                (swapped_path, base_path, out, held - swap_amount)
            }
        } else {
            let half = held / U256::from(2);
            let mut path0 = base_path.clone();
            path0.push(p0);
            let mut path1 = base_path;
            path1.push(p1);
            let out0 = sim.swap_hop(hub, p0, half)?;
            let out1 = sim.swap_hop(hub, p1, held - half)?;
            (path0, path1, out0, out1)
        };

        let shares = sim.add(pool, p0, leg0, leg1)?;
        let estimate = ZapInLpEstimate {
            intermediate: hub,
            path0,
            path1,
            amount0: leg0,
            amount1: leg1,
        };
        Ok((estimate, shares))
    }
}

/// Local reserve book: pair state loaded lazily from the venue, then mutated
/// by the simulation only.
struct Sim<'a, E: Exchange> {
    exchange: &'a E,
    book: HashMap<Address, PairBook>,
}

#[derive(Clone)]
struct PairBook {
    token0: Address,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
}

impl<'a, E: Exchange> Sim<'a, E> {
    fn new(exchange: &'a E) -> Self {
        Self {
            exchange,
            book: HashMap::new(),
        }
    }

    fn load(&mut self, pair: Address) -> Result<&mut PairBook, ZapError> {
        if !self.book.contains_key(&pair) {
            let token0 = self.exchange.token0(pair)?;
            let (reserve0, reserve1) = self.exchange.reserves(pair)?;
            let total_supply = self.exchange.total_supply(pair)?;
            self.book.insert(
                pair,
                PairBook {
                    token0,
                    reserve0,
                    reserve1,
                    total_supply,
                },
            );
        }
        Ok(self.book.get_mut(&pair).expect("just inserted"))
    }

    fn reserves(&mut self, pair: Address) -> Result<(U256, U256), ZapError> {
        let state = self.load(pair)?;
        Ok((state.reserve0, state.reserve1))
    }

    fn pair_for(&self, x: Address, y: Address) -> Result<Address, ZapError> {
        self.exchange
            .factory_pool_for(x, y)
            .ok_or(ZapError::NoRoute { from: x, to: y })
    }

    fn swap_hop(&mut self, token_in: Address, token_out: Address, amount_in: U256) -> Result<U256, ZapError> {
        let pair = self.pair_for(token_in, token_out)?;
        let state = self.load(pair)?;
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

    fn swap_path(&mut self, path: &[Address], amount_in: U256) -> Result<U256, ZapError> {
        let mut held = amount_in;
        for hop in path.windows(2) {
            held = self.swap_hop(hop[0], hop[1], held)?;
        }
        Ok(held)
    }

    /// Mirror of the router's addLiquidity: proportional trim, mint, reserve
    /// update. `p0` orients the legs against the pair's token0.
    fn add(
        &mut self,
        pool: Address,
        p0: Address,
        leg0: U256,
        leg1: U256,
    ) -> Result<U256, ZapError> {
        let state = self.load(pool)?;
        let oriented = p0 == state.token0;
        let (d0, d1) = if oriented { (leg0, leg1) } else { (leg1, leg0) };
        let (a0, a1) = math::optimal_add_amounts(d0, d1, state.reserve0, state.reserve1);
        let minted = math::liquidity_minted(a0, a1, state.reserve0, state.reserve1, state.total_supply);
        if minted.is_zero() {
            return Err(ZapError::InsufficientLiquidity(pool));
        }
        let first_mint = state.total_supply.is_zero();
        state.reserve0 += a0;
        state.reserve1 += a1;
        state.total_supply += minted;
        if first_mint {
            state.total_supply += U256::from(math::MINIMUM_LIQUIDITY);
        }
        Ok(minted)
    }

    /// Mirror of removeLiquidity: proportional payout, burn. More shares
    /// than the pool has issued cannot be burned, so such an estimate is
    /// rejected here rather than wrapping the U256 reserve math.
    fn remove(&mut self, pool: Address, liquidity: U256) -> Result<(U256, U256), ZapError> {
        let state = self.load(pool)?;
        if state.total_supply.is_zero() || liquidity > state.total_supply {
            return Err(ZapError::InsufficientLiquidity(pool));
        }
        let (a0, a1) =
            math::remove_amounts(liquidity, state.reserve0, state.reserve1, state.total_supply);
        state.reserve0 -= a0;
        state.reserve1 -= a1;
        state.total_supply -= liquidity;
        Ok((a0, a1))
    }
}
