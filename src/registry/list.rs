//! Swap-delete ordered address set.
//!
//! A growable list plus a map from address to 1-based slot (0 / absent means
//! "not present", which keeps "not registered" distinct from "registered at
//! position 0"). Removal copies the last element into the freed slot, so it
//! is O(1) but the moved element changes position; registry order carries no
//! meaning beyond enumerability and callers must not rely on stable slots.

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::error::ZapError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList {
    slots: Vec<Address>,
    /// 1-based slot per address; invariant: index[a] == i > 0 => slots[i-1] == a
    index: HashMap<Address, usize>,
}

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, addr: Address) -> bool {
        self.index.contains_key(&addr)
    }

    /// 1-based position, or 0 when absent.
    pub fn position(&self, addr: Address) -> usize {
        self.index.get(&addr).copied().unwrap_or(0)
    }

    pub fn get(&self, i: usize) -> Result<Address, ZapError> {
        self.slots.get(i).copied().ok_or(ZapError::OutOfBounds {
            index: i,
            len: self.slots.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.slots.iter().copied()
    }

    pub fn add(&mut self, addr: Address) -> Result<(), ZapError> {
        if self.contains(addr) {
            return Err(ZapError::AlreadyRegistered(addr));
        }
        self.slots.push(addr);
        self.index.insert(addr, self.slots.len());
        Ok(())
    }

    pub fn remove(&mut self, addr: Address) -> Result<(), ZapError> {
        let idx = match self.index.remove(&addr) {
            Some(i) => i,
            None => return Err(ZapError::NotRegistered(addr)),
        };
        let last = self.slots.len();
        if idx != last {
            let moved = self.slots[last - 1];
            self.slots[idx - 1] = moved;
            self.index.insert(moved, idx);
        }
        self.slots.pop();
        Ok(())
    }
}
