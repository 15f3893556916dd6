//! Path resolution over the registries.
//!
//! Pure reads: the resolver never mutates registry state, which is what
//! keeps mid-zap external calls unable to observe inconsistent routing data.
//!
//! Hub selection is deliberately a first-match linear scan over the
//! intermediate registry in registration order, with no path-length or liquidity
//! comparison across candidates. Downstream behavior depends on this exact
//! tie-break; do not "improve" it into a shortest-path search.

use std::collections::HashMap;

use alloy_primitives::Address;
use tracing::debug;

use crate::error::ZapError;
use crate::registry::{AddressList, PoolRegistry};

/// Admin-set route overrides: `(from, to) -> hop sequence`, directional.
/// A preset takes precedence over any auto-computed path.
#[derive(Debug, Clone, Default)]
pub struct PresetPaths {
    map: HashMap<(Address, Address), Vec<Address>>,
}

impl PresetPaths {
    pub fn get(&self, from: Address, to: Address) -> Option<&[Address]> {
        self.map.get(&(from, to)).map(|p| p.as_slice())
    }

    pub fn set(&mut self, from: Address, to: Address, path: Vec<Address>) {
        self.map.insert((from, to), path);
    }

    /// Returns whether a path was present.
    pub fn remove(&mut self, from: Address, to: Address) -> bool {
        self.map.remove(&(from, to)).is_some()
    }
}

/// Read-only view over the three routing inputs.
pub struct PathResolver<'a> {
    pub pools: &'a PoolRegistry,
    pub intermediates: &'a AddressList,
    pub presets: &'a PresetPaths,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        pools: &'a PoolRegistry,
        intermediates: &'a AddressList,
        presets: &'a PresetPaths,
    ) -> Self {
        Self {
            pools,
            intermediates,
            presets,
        }
    }

    /// Hop sequence from `from` to `to`:
    /// preset (verbatim) > direct pool > first qualifying hub > NoRoute.
    pub fn path_for_token_to_token(
        &self,
        from: Address,
        to: Address,
    ) -> Result<Vec<Address>, ZapError> {
        if from == to {
            return Err(ZapError::IdenticalAssets);
        }
        if let Some(preset) = self.presets.get(from, to) {
            debug!(%from, %to, "using preset path");
            return Ok(preset.to_vec());
        }
        if self.pools.pool_for(from, to).is_some() {
            return Ok(vec![from, to]);
        }
        self.auto_path_with_intermediate(from, to)
    }

    /// The hub scan alone: first intermediate (registration order, skipping
    /// the endpoints themselves) bridging `from` and `to`, ignoring any
    /// direct pool or preset.
    pub fn auto_path_with_intermediate(
        &self,
        from: Address,
        to: Address,
    ) -> Result<Vec<Address>, ZapError> {
        if from == to {
            return Err(ZapError::IdenticalAssets);
        }
        for hub in self.intermediates.iter() {
            if hub == from || hub == to {
                continue;
            }
            if self.pools.pool_for(from, hub).is_some() && self.pools.pool_for(hub, to).is_some() {
                return Ok(vec![from, hub, to]);
            }
        }
        Err(ZapError::NoRoute { from, to })
    }

    /// The single hub a zap into the pool `{p0, p1}` should route through:
    /// the upstream asset that can reach both constituents. `from` itself
    /// wins when it already is a constituent; otherwise the first hub `m`
    /// with pools `{from,m}`, `{m,p0}` and `{m,p1}`, a leg being trivially
    /// satisfied when `m` equals that leg's other endpoint (so a registered
    /// hub can serve as its own intermediate and split straight into the two
    /// sides).
    pub fn suitable_intermediate_for_token_to_pool(
        &self,
        from: Address,
        p0: Address,
        p1: Address,
    ) -> Result<Address, ZapError> {
        if from == p0 || from == p1 {
            return Ok(from);
        }
        // A constituent that happens to be a registered hub gets no shortcut
        // here: like any other candidate it needs the direct `{from, hub}`
        // pool, since the from-leg is always a single hop.
        for hub in self.intermediates.iter() {
            if self.reachable(from, hub) && self.reachable(hub, p0) && self.reachable(hub, p1) {
                return Ok(hub);
            }
        }
        Err(ZapError::NoRoute { from, to: p0 })
    }

    fn reachable(&self, x: Address, y: Address) -> bool {
        x == y || self.pools.pool_for(x, y).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_word(alloy_primitives::U256::from(n).into())
    }

    /// Pools {W,A},{W,B},{W,C},{A,B},{V,C}; hubs [W,V] in registration order.
    fn fixture() -> (PoolRegistry, AddressList, PresetPaths) {
        let (w, v, a, b, c) = (addr(1), addr(2), addr(3), addr(4), addr(5));
        let mut pools = PoolRegistry::new();
        pools.insert(addr(101), w, a);
        pools.insert(addr(102), w, b);
        pools.insert(addr(103), w, c);
        pools.insert(addr(104), a, b);
        pools.insert(addr(105), v, c);
        let mut hubs = AddressList::new();
        hubs.add(w).unwrap();
        hubs.add(v).unwrap();
        (pools, hubs, PresetPaths::default())
    }

    #[test]
    fn identical_assets_never_resolve() {
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        assert_eq!(
            r.path_for_token_to_token(addr(3), addr(3)),
            Err(ZapError::IdenticalAssets)
        );
    }

    #[test]
    fn direct_pool_wins_over_hubs() {
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        assert_eq!(
            r.path_for_token_to_token(addr(3), addr(4)).unwrap(),
            vec![addr(3), addr(4)]
        );
    }

    #[test]
    fn first_registered_hub_wins_even_when_a_later_one_is_closer() {
        // C -> A: no direct pool; W qualifies ({C,W} and {W,A}) and is tried
        // before V, so the answer is [C, W, A] regardless of V's pools.
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        assert_eq!(
            r.path_for_token_to_token(addr(5), addr(3)).unwrap(),
            vec![addr(5), addr(1), addr(3)]
        );
    }

    #[test]
    fn preset_path_is_returned_verbatim() {
        let (pools, hubs, mut presets) = fixture();
        let detour = vec![addr(5), addr(2), addr(1), addr(3)];
        presets.set(addr(5), addr(3), detour.clone());
        let r = PathResolver::new(&pools, &hubs, &presets);
        assert_eq!(r.path_for_token_to_token(addr(5), addr(3)).unwrap(), detour);
    }

    #[test]
    fn hub_scan_skips_the_endpoints() {
        // W -> C has a direct pool, but the scan itself must not return
        // [W, W, C]; force the scan path and check it skips `from`.
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        // auto path ignores the direct pool and scans hubs: W skipped (from),
        // V fails ({W,V} missing) -> NoRoute
        assert_eq!(
            r.auto_path_with_intermediate(addr(1), addr(5)),
            Err(ZapError::NoRoute {
                from: addr(1),
                to: addr(5)
            })
        );
    }

    #[test]
    fn no_route_when_no_hub_bridges() {
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        let orphan = addr(9);
        assert_eq!(
            r.path_for_token_to_token(orphan, addr(3)),
            Err(ZapError::NoRoute {
                from: orphan,
                to: addr(3)
            })
        );
    }

    #[test]
    fn suitable_intermediate_prefers_a_constituent_input() {
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        // zapping A into pool {A,B}: no hub needed
        assert_eq!(
            r.suitable_intermediate_for_token_to_pool(addr(3), addr(3), addr(4))
                .unwrap(),
            addr(3)
        );
    }

    #[test]
    fn suitable_intermediate_requires_all_three_legs() {
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        // C into pool {A,B}: W has {C,W}, {W,A}, {W,B} -> W
        assert_eq!(
            r.suitable_intermediate_for_token_to_pool(addr(5), addr(3), addr(4))
                .unwrap(),
            addr(1)
        );
        // V into pool {A,B}: V has no pool to W, and {V,A}/{V,B} missing
        assert_eq!(
            r.suitable_intermediate_for_token_to_pool(addr(2), addr(3), addr(4)),
            Err(ZapError::NoRoute {
                from: addr(2),
                to: addr(3)
            })
        );
    }

    #[test]
    fn a_registered_hub_splits_straight_into_both_sides() {
        // W into pool {A,B}: W is itself the first hub, {W,A} and {W,B} exist
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        assert_eq!(
            r.suitable_intermediate_for_token_to_pool(addr(1), addr(3), addr(4))
                .unwrap(),
            addr(1)
        );
    }

    #[test]
    fn suitable_intermediate_leg_waived_when_hub_is_a_constituent() {
        let (pools, hubs, presets) = fixture();
        let r = PathResolver::new(&pools, &hubs, &presets);
        // A into pool {W,B}: hub W is itself p0, legs {A,W} and {W,B} exist
        assert_eq!(
            r.suitable_intermediate_for_token_to_pool(addr(3), addr(1), addr(4))
                .unwrap(),
            addr(1)
        );
    }
}
