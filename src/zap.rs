//! The zap orchestrator.
//!
//! Owns the registries and the preset-path store, and sequences swaps and
//! liquidity calls against the external venue to realize a zap. Per call the
//! flow is validate -> route -> swap -> settle; any failure aborts the whole
//! call (the host provides all-or-nothing semantics, and the engine itself
//! never mutates routing state after the resolution reads that informed the
//! external calls of the same invocation).
//!
//! After every successful transactional call the engine's own holdings of
//! every asset it touched are swept back to the caller, so it retains no
//! residual balance across calls.

use alloy_primitives::{Address, U256};
use tracing::{debug, info};

use crate::config::ZapConfig;
use crate::error::ZapError;
use crate::events::ZapEvent;
use crate::exchange::{Exchange, NATIVE};
use crate::math;
use crate::registry::{AddressList, PoolRegistry};
use crate::routing::{PathResolver, PresetPaths};

#[derive(Debug, Clone)]
pub struct Zap {
    address: Address,
    owner: Address,
    wrapped_native: Address,
    auto_sync_page: usize,
    tokens: AddressList,
    intermediates: AddressList,
    pools: PoolRegistry,
    presets: PresetPaths,
    events: Vec<ZapEvent>,
}

impl Zap {
    pub fn new(config: &ZapConfig) -> Self {
        let mut intermediates = AddressList::new();
        // the wrapped-native asset is always the first hub
        intermediates
            .add(config.wrapped_native)
            .expect("fresh list cannot contain the wrapped native");
        Self {
            address: config.engine_address,
            owner: config.owner,
            wrapped_native: config.wrapped_native,
            auto_sync_page: config.auto_sync_page,
            tokens: AddressList::new(),
            intermediates,
            pools: PoolRegistry::new(),
            presets: PresetPaths::default(),
            events: Vec::new(),
        }
    }

    // ----- identity and notifications -----

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn wrapped_native(&self) -> Address {
        self.wrapped_native
    }

    pub fn events(&self) -> &[ZapEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ZapEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: ZapEvent) {
        self.events.push(event);
    }

    fn ensure_owner(&self, caller: Address) -> Result<(), ZapError> {
        if caller != self.owner {
            return Err(ZapError::NotOwner(caller));
        }
        Ok(())
    }

    // ----- queries -----

    pub fn token_list_length(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_at(&self, i: usize) -> Result<Address, ZapError> {
        self.tokens.get(i)
    }

    pub fn is_token(&self, asset: Address) -> bool {
        self.tokens.contains(asset)
    }

    /// 1-based registry slot, 0 when not registered.
    pub fn token_position(&self, asset: Address) -> usize {
        self.tokens.position(asset)
    }

    pub fn intermediate_list_length(&self) -> usize {
        self.intermediates.len()
    }

    pub fn intermediate_at(&self, i: usize) -> Result<Address, ZapError> {
        self.intermediates.get(i)
    }

    pub fn is_intermediate(&self, asset: Address) -> bool {
        self.intermediates.contains(asset)
    }

    pub fn intermediate_position(&self, asset: Address) -> usize {
        self.intermediates.position(asset)
    }

    pub fn is_pool(&self, addr: Address) -> bool {
        self.pools.is_known_pool(addr)
    }

    pub fn pool_for(&self, x: Address, y: Address) -> Option<Address> {
        self.pools.pool_for(x, y)
    }

    pub fn pool_constituents(&self, pool: Address) -> Option<(Address, Address)> {
        self.pools.constituents(pool)
    }

    pub fn preset_path(&self, from: Address, to: Address) -> Option<Vec<Address>> {
        self.presets.get(from, to).map(|p| p.to_vec())
    }

    pub fn last_fetched_pair_index(&self) -> Option<usize> {
        self.pools.last_fetched_pair_index()
    }

    /// Live factory lookup, bypassing the synced registry.
    pub fn factory_pool_for<E: Exchange>(&self, ex: &E, x: Address, y: Address) -> Option<Address> {
        ex.factory_pool_for(x, y)
    }

    pub fn pool_exists_in_factory<E: Exchange>(&self, ex: &E, x: Address, y: Address) -> bool {
        ex.factory_pool_for(x, y).is_some()
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(&self.pools, &self.intermediates, &self.presets)
    }

    pub fn path_for_token_to_token(
        &self,
        from: Address,
        to: Address,
    ) -> Result<Vec<Address>, ZapError> {
        self.resolver().path_for_token_to_token(from, to)
    }

    pub fn auto_path_with_intermediate(
        &self,
        from: Address,
        to: Address,
    ) -> Result<Vec<Address>, ZapError> {
        self.resolver().auto_path_with_intermediate(from, to)
    }

    pub fn suitable_intermediate_for_token_to_pool(
        &self,
        from: Address,
        pool: Address,
    ) -> Result<Address, ZapError> {
        let (p0, p1) = self
            .pools
            .constituents(pool)
            .ok_or(ZapError::NotAPool(pool))?;
        self.resolver()
            .suitable_intermediate_for_token_to_pool(from, p0, p1)
    }

    // ----- administrative entry points (owner only) -----

    pub fn add_token(&mut self, caller: Address, token: Address) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        self.tokens.add(token)?;
        info!(%token, "token registered");
        self.emit(ZapEvent::TokenAdded {
            token,
            auto_discovered: false,
        });
        Ok(())
    }

    pub fn remove_token(&mut self, caller: Address, token: Address) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        self.tokens.remove(token)?;
        info!(%token, "token removed");
        self.emit(ZapEvent::TokenRemoved { token });
        Ok(())
    }

    pub fn add_intermediate_token(
        &mut self,
        caller: Address,
        token: Address,
    ) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        self.intermediates.add(token)?;
        info!(%token, "intermediate token registered");
        self.emit(ZapEvent::IntermediateTokenAdded { token });
        Ok(())
    }

    pub fn remove_intermediate_token(
        &mut self,
        caller: Address,
        token: Address,
    ) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        self.intermediates.remove(token)?;
        info!(%token, "intermediate token removed");
        self.emit(ZapEvent::IntermediateTokenRemoved { token });
        Ok(())
    }

    /// Recognize a single pool without going through the factory sync.
    pub fn register_pool<E: Exchange>(
        &mut self,
        caller: Address,
        ex: &E,
        pool: Address,
    ) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        if self.pools.is_known_pool(pool) {
            return Err(ZapError::AlreadyRegistered(pool));
        }
        let t0 = ex.token0(pool)?;
        let t1 = ex.token1(pool)?;
        self.pools.insert(pool, t0, t1);
        self.emit(ZapEvent::PoolAdded {
            pool,
            auto_discovered: false,
        });
        self.register_constituents(t0, t1);
        Ok(())
    }

    pub fn deregister_pool(&mut self, caller: Address, pool: Address) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        self.pools.remove(pool)?;
        info!(%pool, "pool removed");
        self.emit(ZapEvent::PoolRemoved { pool });
        Ok(())
    }

    pub fn set_preset_path(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        path: Vec<Address>,
    ) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        self.presets.set(from, to, path.clone());
        self.emit(ZapEvent::PresetPathSet {
            from,
            to,
            path,
            auto_calculated: false,
        });
        Ok(())
    }

    /// Store the route the resolver would compute today (ignoring presets) as
    /// an explicit preset.
    pub fn set_preset_path_auto(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
    ) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        let path = if self.pools.pool_for(from, to).is_some() {
            vec![from, to]
        } else {
            self.resolver().auto_path_with_intermediate(from, to)?
        };
        self.presets.set(from, to, path.clone());
        self.emit(ZapEvent::PresetPathSet {
            from,
            to,
            path,
            auto_calculated: true,
        });
        Ok(())
    }

    pub fn remove_preset_path(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
    ) -> Result<(), ZapError> {
        self.ensure_owner(caller)?;
        if self.presets.remove(from, to) {
            self.emit(ZapEvent::PresetPathRemoved { from, to });
        }
        Ok(())
    }

    /// Recover balances the engine holds outside a zap (stray transfers).
    /// Amount 0 withdraws the entire balance; the native sentinel withdraws
    /// native coin.
    pub fn withdraw_balance<E: Exchange>(
        &mut self,
        caller: Address,
        ex: &mut E,
        asset: Address,
        amount: U256,
    ) -> Result<U256, ZapError> {
        self.ensure_owner(caller)?;
        let held = if asset == NATIVE {
            ex.native_balance_of(self.address)
        } else {
            ex.balance_of(asset, self.address)
        };
        let amount = if amount.is_zero() { held } else { amount };
        if asset == NATIVE {
            ex.transfer_native(self.address, caller, amount)?;
        } else {
            ex.transfer(asset, self.address, caller, amount)?;
        }
        info!(%asset, %amount, "stray balance withdrawn");
        self.emit(ZapEvent::BalanceWithdrawn { asset, amount });
        Ok(amount)
    }

    // ----- factory synchronization -----

    /// Best-effort catch-up from the cursor, bounded by the configured page.
    pub fn sync_pools<E: Exchange>(&mut self, ex: &E) -> Result<(), ZapError> {
        let start = self.pools.next_sync_start();
        self.sync_pools_range(ex, start, self.auto_sync_page)
    }

    /// Explicit paginated catch-up: ingest up to `max_count` factory entries
    /// starting at `start`. Idempotent over overlapping ranges; a no-op
    /// (cursor untouched, no notification) when `start` is past the factory's
    /// current total.
    pub fn sync_pools_range<E: Exchange>(
        &mut self,
        ex: &E,
        start: usize,
        max_count: usize,
    ) -> Result<(), ZapError> {
        let total = ex.all_pairs_length();
        if start >= total || max_count == 0 {
            return Ok(());
        }
        // start < total here, so the clamped end never underflows
        let end = start.saturating_add(max_count).min(total) - 1;
        for i in start..=end {
            let pool = ex.all_pairs(i)?;
            if self.pools.is_known_pool(pool) {
                continue;
            }
            let t0 = ex.token0(pool)?;
            let t1 = ex.token1(pool)?;
            self.pools.insert(pool, t0, t1);
            debug!(%pool, index = i, "pool ingested from factory");
            self.emit(ZapEvent::PoolAdded {
                pool,
                auto_discovered: true,
            });
            self.register_constituents(t0, t1);
        }
        self.pools.advance_cursor(end);
        info!(start, end, "factory sync advanced");
        self.emit(ZapEvent::PoolsSynced { start, end });
        Ok(())
    }

    fn register_constituents(&mut self, t0: Address, t1: Address) {
        for token in [t0, t1] {
            if !self.tokens.contains(token) {
                // fresh address, cannot already be present
                let _ = self.tokens.add(token);
                self.emit(ZapEvent::TokenAdded {
                    token,
                    auto_discovered: true,
                });
            }
        }
    }

    // ----- transactional entry points -----

    /// Native coin in, LP shares of `target_pool` out.
    pub fn zap_in<E: Exchange>(
        &mut self,
        ex: &mut E,
        caller: Address,
        target_pool: Address,
        min_shares: U256,
        amount: U256,
        deadline: u64,
    ) -> Result<U256, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        let (p0, p1) = self
            .pools
            .constituents(target_pool)
            .ok_or(ZapError::NotAPool(target_pool))?;
        let wnative = self.wrapped_native;
        // routing state is read in full before any external call
        let hub = self
            .resolver()
            .suitable_intermediate_for_token_to_pool(wnative, p0, p1)?;
        let hub_path = if hub == wnative {
            None
        } else {
            Some(self.resolver().path_for_token_to_token(wnative, hub)?)
        };

        ex.transfer_native(caller, self.address, amount)?;
        ex.wrap_native(self.address, amount)?;
        let held = match &hub_path {
            Some(path) => self.swap_along_path(ex, path, amount, U256::ZERO, deadline)?,
            None => amount,
        };
        let shares =
            self.provide_liquidity(ex, caller, hub, held, target_pool, p0, p1, min_shares, deadline)?;
        self.sweep(ex, caller, &[wnative, hub, p0, p1])?;
        debug!(pool = %target_pool, %amount, %shares, "zap-in settled");
        self.emit(ZapEvent::ZapIn {
            pool: target_pool,
            amount_in: amount,
            shares,
        });
        Ok(shares)
    }

    /// Registered token in, either another token or LP shares out.
    #[allow(clippy::too_many_arguments)]
    pub fn zap_in_token<E: Exchange>(
        &mut self,
        ex: &mut E,
        caller: Address,
        from_token: Address,
        amount: U256,
        target: Address,
        min_out: U256,
        deadline: u64,
    ) -> Result<U256, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        if from_token == NATIVE || !self.tokens.contains(from_token) {
            return Err(ZapError::NotAToken(from_token));
        }

        let out = if let Some((p0, p1)) = self.pools.constituents(target) {
            let hub = self
                .resolver()
                .suitable_intermediate_for_token_to_pool(from_token, p0, p1)?;
            let hub_path = if hub == from_token {
                None
            } else {
                Some(self.resolver().path_for_token_to_token(from_token, hub)?)
            };
            ex.transfer_from(from_token, self.address, caller, self.address, amount)?;
            let held = match &hub_path {
                Some(path) => self.swap_along_path(ex, path, amount, U256::ZERO, deadline)?,
                None => amount,
            };
            let shares =
                self.provide_liquidity(ex, caller, hub, held, target, p0, p1, min_out, deadline)?;
            self.sweep(ex, caller, &[from_token, hub, p0, p1])?;
            shares
        } else {
            if target == from_token {
                return Err(ZapError::IdenticalAssets);
            }
            let path = self.resolver().path_for_token_to_token(from_token, target)?;
            ex.transfer_from(from_token, self.address, caller, self.address, amount)?;
            let out = self.swap_along_path(ex, &path, amount, min_out, deadline)?;
            ex.transfer(target, self.address, caller, out)?;
            self.sweep(ex, caller, &[from_token])?;
            out
        };
        debug!(from = %from_token, %target, %amount, %out, "zap-in-token settled");
        self.emit(ZapEvent::ZapInToken {
            from_token,
            target,
            amount_in: amount,
            amount_out: out,
        });
        Ok(out)
    }

    /// LP shares in; a token, the native coin, or another pool's shares out.
    #[allow(clippy::too_many_arguments)]
    pub fn zap_out<E: Exchange>(
        &mut self,
        ex: &mut E,
        caller: Address,
        from_pool: Address,
        amount: U256,
        target: Address,
        min_out: U256,
        deadline: u64,
    ) -> Result<U256, ZapError> {
        if amount.is_zero() {
            return Err(ZapError::ZeroAmount);
        }
        let (p0, p1) = self
            .pools
            .constituents(from_pool)
            .ok_or(ZapError::NotAPool(from_pool))?;
        if from_pool == target {
            return Err(ZapError::IdenticalAssets);
        }
        let wnative = self.wrapped_native;

        // resolve every route before touching balances
        let target_pool = self.pools.constituents(target);
        let mut exit_paths: Vec<Option<Vec<Address>>> = Vec::with_capacity(2);
        let mut hubs: Vec<(Address, Option<Vec<Address>>)> = Vec::with_capacity(2);
        for c in [p0, p1] {
            match (target_pool, target) {
                (Some((q0, q1)), _) => {
                    let hub = self
                        .resolver()
                        .suitable_intermediate_for_token_to_pool(c, q0, q1)?;
                    let path = if hub == c {
                        None
                    } else {
                        Some(self.resolver().path_for_token_to_token(c, hub)?)
                    };
                    hubs.push((hub, path));
                }
                (None, t) => {
                    let out_asset = if t == NATIVE { wnative } else { t };
                    if c == out_asset {
                        exit_paths.push(None);
                    } else {
                        exit_paths.push(Some(
                            self.resolver().path_for_token_to_token(c, out_asset)?,
                        ));
                    }
                }
            }
        }

        ex.transfer_from(from_pool, self.address, caller, self.address, amount)?;
        self.approve_router(ex, from_pool, amount)?;
        let (a0, a1) = ex.remove_liquidity(
            self.address,
            p0,
            p1,
            amount,
            U256::ZERO,
            U256::ZERO,
            self.address,
            deadline,
        )?;

        let out = if let Some((q0, q1)) = target_pool {
            let mut shares_total = U256::ZERO;
            let mut touched = vec![p0, p1, q0, q1];
            for ((c, withdrawn), (hub, hub_path)) in
                [(p0, a0), (p1, a1)].into_iter().zip(hubs.into_iter())
            {
                let held = match &hub_path {
                    Some(path) => self.swap_along_path(ex, path, withdrawn, U256::ZERO, deadline)?,
                    None => withdrawn,
                };
                debug_assert!(hub_path.is_some() || hub == c);
                shares_total += self.provide_liquidity(
                    ex, caller, hub, held, target, q0, q1, U256::ZERO, deadline,
                )?;
                touched.push(hub);
            }
            if shares_total < min_out {
                return Err(ZapError::Slippage {
                    got: shares_total,
                    min: min_out,
                });
            }
            self.sweep(ex, caller, &touched)?;
            shares_total
        } else {
            let out_asset = if target == NATIVE { wnative } else { target };
            let mut total = U256::ZERO;
            for ((c, withdrawn), path) in
                [(p0, a0), (p1, a1)].into_iter().zip(exit_paths.into_iter())
            {
                total += match &path {
                    Some(path) => self.swap_along_path(ex, path, withdrawn, U256::ZERO, deadline)?,
                    None => {
                        debug_assert_eq!(c, out_asset);
                        withdrawn
                    }
                };
            }
            if total < min_out {
                return Err(ZapError::Slippage {
                    got: total,
                    min: min_out,
                });
            }
            if target == NATIVE {
                ex.unwrap_native(self.address, total)?;
                ex.transfer_native(self.address, caller, total)?;
            } else {
                ex.transfer(target, self.address, caller, total)?;
            }
            self.sweep(ex, caller, &[p0, p1, out_asset])?;
            total
        };
        debug!(from = %from_pool, %target, %amount, %out, "zap-out settled");
        self.emit(ZapEvent::ZapOut {
            from_pool,
            target,
            amount_in: amount,
            amount_out: out,
        });
        Ok(out)
    }

    // ----- internal swap / liquidity plumbing -----

    /// Swap `amount_in` along `path` with the engine as recipient, returning
    /// the final hop's output. A single-element path is a no-op.
    fn swap_along_path<E: Exchange>(
        &self,
        ex: &mut E,
        path: &[Address],
        amount_in: U256,
        min_out: U256,
        deadline: u64,
    ) -> Result<U256, ZapError> {
        if path.len() < 2 {
            return Ok(amount_in);
        }
        self.approve_router(ex, path[0], amount_in)?;
        let amounts = ex.swap_exact_tokens_for_tokens(
            self.address,
            amount_in,
            min_out,
            path,
            self.address,
            deadline,
        )?;
        Ok(amounts.last().copied().unwrap_or(amount_in))
    }

    /// Turn `amount` of `hub` into liquidity of `pool` ({p0, p1}), minting
    /// shares to `to`. When the hub is a constituent, swap the fee-aware
    /// optimal portion to the other side; otherwise split in half and swap
    /// each half to one side (p0 leg first; the estimator replays this
    /// order). Unused leg remainders stay with the engine for the caller's
    /// sweep.
    #[allow(clippy::too_many_arguments)]
    fn provide_liquidity<E: Exchange>(
        &self,
        ex: &mut E,
        to: Address,
        hub: Address,
        amount: U256,
        pool: Address,
        p0: Address,
        p1: Address,
        min_shares: U256,
        deadline: u64,
    ) -> Result<U256, ZapError> {
        let (leg0, leg1) = if hub == p0 || hub == p1 {
            let (r0, r1) = ex.reserves(pool)?;
            let (reserve_in, other) = if hub == p0 { (r0, p1) } else { (r1, p0) };
            let swap_amount = math::optimal_swap_in(amount, reserve_in);
            let out = self.swap_along_path(ex, &[hub, other], swap_amount, U256::ZERO, deadline)?;
            if hub == p0 {
                (amount - swap_amount, out)
            } else {
                (out, amount - swap_amount)
            }
        } else {
            let half = amount / U256::from(2);
            let out0 = self.swap_along_path(ex, &[hub, p0], half, U256::ZERO, deadline)?;
            let out1 =
                self.swap_along_path(ex, &[hub, p1], amount - half, U256::ZERO, deadline)?;
            (out0, out1)
        };
        self.approve_router(ex, p0, leg0)?;
        self.approve_router(ex, p1, leg1)?;
        let (_used0, _used1, shares) = ex.add_liquidity(
            self.address,
            p0,
            p1,
            leg0,
            leg1,
            U256::ZERO,
            U256::ZERO,
            to,
            deadline,
        )?;
        if shares < min_shares {
            return Err(ZapError::Slippage {
                got: shares,
                min: min_shares,
            });
        }
        Ok(shares)
    }

    fn approve_router<E: Exchange>(
        &self,
        ex: &mut E,
        token: Address,
        amount: U256,
    ) -> Result<(), ZapError> {
        let router = ex.router_address();
        if ex.allowance(token, self.address, router) < amount {
            ex.approve(token, self.address, router, U256::MAX)?;
        }
        Ok(())
    }

    /// Return the engine's entire holding of each touched asset to `to`.
    fn sweep<E: Exchange>(
        &self,
        ex: &mut E,
        to: Address,
        assets: &[Address],
    ) -> Result<(), ZapError> {
        let mut seen: Vec<Address> = Vec::with_capacity(assets.len());
        for &asset in assets {
            if asset == NATIVE || seen.contains(&asset) {
                continue;
            }
            seen.push(asset);
            let held = ex.balance_of(asset, self.address);
            if !held.is_zero() {
                ex.transfer(asset, self.address, to, held)?;
            }
        }
        Ok(())
    }
}
