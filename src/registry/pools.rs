//! Known-pool registry and the resumable factory sync cursor.
//!
//! A pool is only *known* once it has been ingested from the factory (or
//! registered directly by the owner); the factory may always hold pools the
//! engine has not learned about yet. Pairs are keyed in canonical order so
//! `{A,B}` and `{B,A}` resolve to the same entry.

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::error::ZapError;
use crate::registry::AddressList;

/// Canonical (numeric) ordering of an unordered token pair.
pub fn canonical_pair(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    by_pair: HashMap<(Address, Address), Address>,
    constituents: HashMap<Address, (Address, Address)>,
    pools: AddressList,
    /// Factory index of the last ingested pool; None until the first sync.
    /// Monotonically non-decreasing, never reset.
    last_fetched_pair_index: Option<usize>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known_pool(&self, pool: Address) -> bool {
        self.constituents.contains_key(&pool)
    }

    pub fn pool_for(&self, x: Address, y: Address) -> Option<Address> {
        self.by_pair.get(&canonical_pair(x, y)).copied()
    }

    /// Constituents in canonical order; None for unknown pools.
    pub fn constituents(&self, pool: Address) -> Option<(Address, Address)> {
        self.constituents.get(&pool).copied()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.pools.iter()
    }

    /// Insert a pool with its constituents. Returns false (and changes
    /// nothing) when the pool is already known, which is what makes
    /// overlapping sync ranges idempotent.
    pub fn insert(&mut self, pool: Address, token_x: Address, token_y: Address) -> bool {
        if self.is_known_pool(pool) {
            return false;
        }
        let pair = canonical_pair(token_x, token_y);
        self.by_pair.insert(pair, pool);
        self.constituents.insert(pool, pair);
        // the pool cannot already be in the list if it was not in the map
        self.pools
            .add(pool)
            .expect("pool list and constituent map out of sync");
        true
    }

    pub fn remove(&mut self, pool: Address) -> Result<(), ZapError> {
        let pair = self
            .constituents
            .remove(&pool)
            .ok_or(ZapError::UnknownPool(pool))?;
        self.by_pair.remove(&pair);
        self.pools.remove(pool)?;
        Ok(())
    }

    pub fn last_fetched_pair_index(&self) -> Option<usize> {
        self.last_fetched_pair_index
    }

    /// Factory index the automatic sync resumes from: the last ingested index
    /// (re-read, harmless thanks to idempotence) or 0 before the first sync.
    pub fn next_sync_start(&self) -> usize {
        self.last_fetched_pair_index.unwrap_or(0)
    }

    /// Advance the cursor to `end`, never letting it regress.
    pub fn advance_cursor(&mut self, end: usize) {
        self.last_fetched_pair_index = Some(match self.last_fetched_pair_index {
            Some(current) => current.max(end),
            None => end,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_word(alloy_primitives::U256::from(n).into())
    }

    #[test]
    fn pair_lookup_is_order_insensitive() {
        let mut reg = PoolRegistry::new();
        assert!(reg.insert(addr(10), addr(2), addr(1)));
        assert_eq!(reg.pool_for(addr(1), addr(2)), Some(addr(10)));
        assert_eq!(reg.pool_for(addr(2), addr(1)), Some(addr(10)));
        assert_eq!(reg.constituents(addr(10)), Some((addr(1), addr(2))));
    }

    #[test]
    fn duplicate_insert_is_a_no_op() {
        let mut reg = PoolRegistry::new();
        assert!(reg.insert(addr(10), addr(1), addr(2)));
        assert!(!reg.insert(addr(10), addr(1), addr(2)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_unknown_pool_fails() {
        let mut reg = PoolRegistry::new();
        assert_eq!(reg.remove(addr(10)), Err(ZapError::UnknownPool(addr(10))));
        reg.insert(addr(10), addr(1), addr(2));
        reg.remove(addr(10)).unwrap();
        assert!(!reg.is_known_pool(addr(10)));
        assert_eq!(reg.pool_for(addr(1), addr(2)), None);
    }

    #[test]
    fn cursor_starts_unset_and_never_regresses() {
        let mut reg = PoolRegistry::new();
        assert_eq!(reg.last_fetched_pair_index(), None);
        assert_eq!(reg.next_sync_start(), 0);
        reg.advance_cursor(5);
        assert_eq!(reg.last_fetched_pair_index(), Some(5));
        reg.advance_cursor(2);
        assert_eq!(reg.last_fetched_pair_index(), Some(5));
        assert_eq!(reg.next_sync_start(), 5);
    }
}
