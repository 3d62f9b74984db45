use crate::StateId;

/// A bidirectional table between compact indices and the runtime ids of the states a storage
/// uses. Holds at most `2^bits` states.
#[derive(Debug)]
pub(crate) struct Palette {
    index_to_state: Vec<StateId>,
    // Sorted by runtime id for binary searches
    state_to_index: Vec<(StateId, u16)>,
    bits: u32,
}

impl Palette {
    pub(crate) fn new(bits: u32) -> Self {
        debug_assert!(bits <= 16, "Palette indices are at most 16 bits wide");

        Palette {
            index_to_state: Vec::new(),
            state_to_index: Vec::new(),
            bits,
        }
    }

    pub(crate) fn singleton(state: StateId, bits: u32) -> Self {
        let mut palette = Self::new(bits);
        palette.insert(state);
        palette
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        debug_assert!(
            self.state_to_index.len() == self.index_to_state.len(),
            "State-to-index and index-to-state maps are not the same size"
        );

        self.index_to_state.len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        1 << self.bits
    }

    #[inline]
    pub(crate) fn bits(&self) -> u32 {
        self.bits
    }

    pub(crate) fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.index_to_state.iter().copied()
    }

    #[inline]
    pub(crate) fn state_for(&self, index: usize) -> Option<StateId> {
        self.index_to_state.get(index).copied()
    }

    #[inline]
    pub(crate) fn index_of(&self, state: StateId) -> Option<usize> {
        self.state_to_index
            .binary_search_by_key(&state, |&(s, _)| s)
            .ok()
            .map(|position| self.state_to_index[position].1 as usize)
    }

    pub(crate) fn insert(&mut self, state: StateId) -> InsertionResult {
        // Grab the position at which the state will be inserted in the state-to-index map
        let position = match self
            .state_to_index
            .binary_search_by_key(&state, |&(s, _)| s)
        {
            Ok(position) =>
                return InsertionResult::AlreadyInPalette {
                    index: self.state_to_index[position].1 as usize,
                },
            Err(position) => position,
        };

        if self.len() >= self.capacity() {
            return InsertionResult::Full;
        }

        let index = self.index_to_state.len();
        self.index_to_state.push(state);
        self.state_to_index.insert(position, (state, index as u16));

        InsertionResult::Inserted { index }
    }

    /// A copy of this palette with a different width, built by re-inserting every state in
    /// index order so that indices are preserved.
    pub(crate) fn rebuilt(&self, bits: u32) -> Palette {
        debug_assert!(self.len() <= 1 << bits);

        let mut palette = Palette::new(bits);
        for state in self.states() {
            palette.insert(state);
        }
        palette
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum InsertionResult {
    AlreadyInPalette { index: usize },
    Inserted { index: usize },
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_fixes_indices() {
        let mut palette = Palette::singleton(0, 2);

        assert_eq!(palette.insert(40), InsertionResult::Inserted { index: 1 });
        assert_eq!(palette.insert(7), InsertionResult::Inserted { index: 2 });
        assert_eq!(palette.insert(40), InsertionResult::AlreadyInPalette { index: 1 });
        assert_eq!(palette.index_of(7), Some(2));
        assert_eq!(palette.state_for(1), Some(40));
        assert_eq!(palette.index_of(8), None);
    }

    #[test]
    fn full_palette_rejects_new_states() {
        let mut palette = Palette::singleton(0, 1);
        palette.insert(5);

        assert_eq!(palette.insert(6), InsertionResult::Full);
        assert_eq!(palette.insert(5), InsertionResult::AlreadyInPalette { index: 1 });
        assert_eq!(palette.len(), 2);

        let mut grown = palette.rebuilt(2);
        assert_eq!(grown.capacity(), 4);
        assert_eq!(grown.index_of(5), Some(1));
        assert_eq!(grown.insert(6), InsertionResult::Inserted { index: 2 });
    }
}
