//! Fluids embedded in block states.
//!
//! Before the flattening, water and lava were ordinary blocks, and later versions allowed some
//! blocks to be "waterlogged". Storages that keep fluids in a separate layer split such states
//! into a block component and a fluid component. A [`FluidRegistry`] performs that split for one
//! registry, and guarantees it can be undone exactly.

use crate::{BlockError, StateId};
use std::collections::{hash_map::Entry, HashMap};

/// Extracts, strips and recombines the fluid component of runtime ids.
///
/// For every runtime id `b` with `extract_fluid(b) != 0`,
/// `add_fluid(strip_fluid(b), extract_fluid(b)) == Some(b)`.
pub trait FluidRegistry: Send + Sync {
    /// Returns the runtime id of the fluid contained in the given state, or `0` if it contains
    /// none.
    fn extract_fluid(&self, runtime_id: StateId) -> StateId;

    /// Returns the given state without its fluid. States without fluid are returned unchanged.
    fn strip_fluid(&self, runtime_id: StateId) -> StateId;

    /// Combines a state with a fluid, or returns `None` if the combination does not exist.
    /// Adding fluid `0` returns the state unchanged.
    fn add_fluid(&self, runtime_id: StateId, fluid: StateId) -> Option<StateId>;
}

/// A registry whose states never contain fluid.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFluids;

impl FluidRegistry for NoFluids {
    fn extract_fluid(&self, _runtime_id: StateId) -> StateId {
        0
    }

    fn strip_fluid(&self, runtime_id: StateId) -> StateId {
        runtime_id
    }

    fn add_fluid(&self, runtime_id: StateId, fluid: StateId) -> Option<StateId> {
        if fluid == 0 {
            Some(runtime_id)
        } else {
            None
        }
    }
}

/// A table-driven fluid registry built from `(filled, drained, fluid)` triples.
#[derive(Clone, Debug, Default)]
pub struct MappedFluids {
    split: HashMap<StateId, (StateId, StateId)>,
    merge: HashMap<(StateId, StateId), StateId>,
}

impl MappedFluids {
    /// Starts an empty table.
    pub fn builder() -> MappedFluidsBuilder {
        MappedFluidsBuilder::default()
    }

    /// The number of states containing fluid.
    pub fn len(&self) -> usize {
        self.split.len()
    }

    /// Returns whether no state contains fluid.
    pub fn is_empty(&self) -> bool {
        self.split.is_empty()
    }
}

impl FluidRegistry for MappedFluids {
    fn extract_fluid(&self, runtime_id: StateId) -> StateId {
        self.split
            .get(&runtime_id)
            .map(|&(_, fluid)| fluid)
            .unwrap_or(0)
    }

    fn strip_fluid(&self, runtime_id: StateId) -> StateId {
        self.split
            .get(&runtime_id)
            .map(|&(drained, _)| drained)
            .unwrap_or(runtime_id)
    }

    fn add_fluid(&self, runtime_id: StateId, fluid: StateId) -> Option<StateId> {
        if fluid == 0 {
            return Some(runtime_id);
        }

        self.merge.get(&(runtime_id, fluid)).copied()
    }
}

/// Collects the mappings of a [`MappedFluids`] table.
#[derive(Clone, Debug, Default)]
pub struct MappedFluidsBuilder {
    table: MappedFluids,
}

impl MappedFluidsBuilder {
    /// Declares that `filled` is `drained` combined with `fluid`.
    ///
    /// Fails if `fluid` is `0`, if `filled` was already declared differently, or if the pair
    /// `(drained, fluid)` already combines into another state.
    pub fn map(&mut self, filled: StateId, drained: StateId, fluid: StateId) -> Result<&mut Self, BlockError> {
        if fluid == 0 {
            return Err(BlockError::construction(format!(
                "State {} cannot contain fluid 0",
                filled
            )));
        }

        let existing = self.table.split.get(&filled).copied();
        if let Some(existing) = existing {
            if existing == (drained, fluid) {
                return Ok(self);
            }

            return Err(BlockError::construction(format!(
                "State {} splits into both {:?} and {:?}",
                filled,
                existing,
                (drained, fluid)
            )));
        }

        match self.table.merge.entry((drained, fluid)) {
            Entry::Occupied(entry) =>
                return Err(BlockError::construction(format!(
                    "State {} with fluid {} combines into both {} and {}",
                    drained,
                    fluid,
                    entry.get(),
                    filled
                ))),
            Entry::Vacant(entry) => {
                entry.insert(filled);
            }
        }

        self.table.split.insert(filled, (drained, fluid));
        Ok(self)
    }

    /// Finishes the table.
    pub fn build(&mut self) -> MappedFluids {
        std::mem::take(&mut self.table)
    }
}

/// Recombines a state split by [`FluidRegistry::strip_fluid`] and
/// [`FluidRegistry::extract_fluid`].
pub fn merge_fluid(fluids: &dyn FluidRegistry, block: StateId, fluid: StateId) -> Result<StateId, BlockError> {
    fluids.add_fluid(block, fluid).ok_or_else(|| {
        BlockError::invalid(format!(
            "State {} cannot contain fluid {}",
            block, fluid
        ))
    })
}
