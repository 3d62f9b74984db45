use super::{
    bits::PackedArray,
    cell_index,
    palette::{InsertionResult, Palette},
    pool::{ArrayPool, WORD_POOL},
    BlockStorage,
    SECTION_VOLUME,
};
use crate::{registry::BlockRegistry, BlockError, StateId};
use byteorder::{BigEndian, ByteOrder};
use indexmap::IndexMap;
use log::debug;
use qblocks_util::{math::bits_for_count, Identifier};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use std::{
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// The width of a fresh storage's indices.
pub const MIN_BITS_PER_BLOCK: u32 = 4;
/// The widest palette. Growing past it switches to storing runtime ids directly.
pub const MAX_PALETTE_BITS: u32 = 12;
/// The narrowest width used when storing runtime ids directly.
pub const MIN_DIRECT_BITS: u32 = MAX_PALETTE_BITS + 1;
/// The widest entries a storage supports.
pub const MAX_BITS_PER_BLOCK: u32 = 32;

// A full palette can address every cell
const_assert!(1 << MAX_PALETTE_BITS == SECTION_VOLUME);

/// One state of a palette decoded from upstream data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// The identifier of the state's block type.
    #[serde(rename = "Name")]
    pub identifier: Identifier,
    /// The value of each trait as text. Traits that are absent take their default value.
    #[serde(rename = "Properties", default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, String>,
}

impl PaletteEntry {
    /// Creates an entry without explicit trait values.
    pub fn new(identifier: Identifier) -> Self {
        PaletteEntry {
            identifier,
            properties: IndexMap::new(),
        }
    }

    /// Adds a trait value.
    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_owned(), value.to_owned());
        self
    }
}

enum Encoding {
    Paletted(Palette),
    Direct,
}

/// Palette-compressed storage for one section layer.
///
/// Starts with a single palette entry, the registry's air, at 4 bits per cell. Writing a state
/// that does not fit in a full palette widens every index by one bit; once a 12-bit palette is
/// full the storage stores runtime ids directly instead.
pub struct FlattenedStorage {
    registry: Arc<dyn BlockRegistry>,
    pool: ArrayPool<u64>,
    data: PackedArray,
    encoding: Encoding,
}

impl FlattenedStorage {
    /// Creates a storage filled with air.
    pub fn new(registry: Arc<dyn BlockRegistry>) -> Self {
        Self::with_pool(registry, WORD_POOL.clone())
    }

    /// Creates a storage filled with air whose buffers come from the given pool.
    pub fn with_pool(registry: Arc<dyn BlockRegistry>, pool: ArrayPool<u64>) -> Self {
        let air = registry.air().runtime_id();
        let data = PackedArray::new(&pool, MIN_BITS_PER_BLOCK);

        FlattenedStorage {
            registry,
            pool,
            data,
            encoding: Encoding::Paletted(Palette::singleton(air, MIN_BITS_PER_BLOCK)),
        }
    }

    /// Imports a section layer decoded from upstream data: its palette and its packed indices.
    ///
    /// The width of the indices is the larger of 4 and the number of bits needed to address the
    /// palette. Unknown states, a word count that does not match that width, and indices
    /// outside of the palette are all invalid.
    pub fn from_packed(
        registry: Arc<dyn BlockRegistry>,
        palette: &[PaletteEntry],
        words: &[u64],
    ) -> Result<Self, BlockError>
    {
        if palette.is_empty() || palette.len() > SECTION_VOLUME {
            return Err(BlockError::invalid(format!(
                "Palettes hold between 1 and {} entries, got {}",
                SECTION_VOLUME,
                palette.len()
            )));
        }

        let bits = MIN_BITS_PER_BLOCK.max(bits_for_count(palette.len() as u64));
        let raw = PackedArray::from_words(&WORD_POOL, bits, words)?;

        // Upstream palettes may repeat a state, so indices are remapped rather than copied
        let mut resolved = Palette::new(bits);
        let mut remap = Vec::with_capacity(palette.len());
        for entry in palette {
            let properties = entry
                .properties
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_str()))
                .collect::<Vec<_>>();
            let runtime_id = registry
                .state_from_properties(&entry.identifier, &properties)?
                .runtime_id();

            match resolved.insert(runtime_id) {
                InsertionResult::AlreadyInPalette { index } | InsertionResult::Inserted { index } =>
                    remap.push(index as u32),
                InsertionResult::Full => return Err(BlockError::CapacityExceeded { bits }),
            }
        }

        if let Some(index) = raw.iter().find(|&index| index as usize >= remap.len()) {
            return Err(BlockError::invalid(format!(
                "Index {} is outside of a palette with {} entries",
                index,
                remap.len()
            )));
        }

        let pool = WORD_POOL.clone();
        let data = raw.remapped(&pool, bits, |index| remap[index as usize]);

        Ok(FlattenedStorage {
            registry,
            pool,
            data,
            encoding: Encoding::Paletted(resolved),
        })
    }

    /// Like [`from_packed`](FlattenedStorage::from_packed), with the words given as big-endian
    /// bytes.
    pub fn from_packed_bytes(
        registry: Arc<dyn BlockRegistry>,
        palette: &[PaletteEntry],
        bytes: &[u8],
    ) -> Result<Self, BlockError>
    {
        if bytes.len() % 8 != 0 {
            return Err(BlockError::invalid(format!(
                "Packed data of {} bytes is not made of whole words",
                bytes.len()
            )));
        }

        let mut words = vec![0u64; bytes.len() / 8];
        BigEndian::read_u64_into(bytes, &mut words);
        Self::from_packed(registry, palette, &words)
    }

    /// The current width of each cell's entry.
    #[inline]
    pub fn bits_per_block(&self) -> u32 {
        self.data.bits()
    }

    /// Returns whether runtime ids are stored directly rather than through a palette.
    #[inline]
    pub fn is_direct(&self) -> bool {
        matches!(self.encoding, Encoding::Direct)
    }

    /// The number of distinct states in the palette, or `None` for direct storage.
    pub fn palette_len(&self) -> Option<usize> {
        match &self.encoding {
            Encoding::Paletted(palette) => Some(palette.len()),
            Encoding::Direct => None,
        }
    }

    /// The number of cells holding something other than air.
    pub fn non_air_count(&self) -> usize {
        let air = self.registry.air().runtime_id();
        let air_entry = match &self.encoding {
            Encoding::Paletted(palette) => match palette.index_of(air) {
                Some(index) => index as u32,
                None => return SECTION_VOLUME,
            },
            Encoding::Direct => air,
        };

        self.data.iter().filter(|&entry| entry != air_entry).count()
    }

    // Widens the storage so that `incoming` can be written
    fn grow(&mut self, incoming: StateId) -> Result<(), BlockError> {
        let bits = self.data.bits();

        let (data, encoding) = match &self.encoding {
            Encoding::Paletted(palette) if palette.bits() < MAX_PALETTE_BITS => {
                let grown = palette.rebuilt(palette.bits() + 1);
                let data = self.data.remapped(&self.pool, grown.bits(), |entry| {
                    palette
                        .state_for(entry as usize)
                        .and_then(|state| grown.index_of(state))
                        .unwrap_or(0) as u32
                });

                debug!(
                    "Grew palette from {} to {} bits per block ({} states)",
                    bits,
                    grown.bits(),
                    grown.len()
                );
                (data, Encoding::Paletted(grown))
            }
            Encoding::Paletted(palette) => {
                let new_bits = self.direct_bits(incoming);
                if new_bits > MAX_BITS_PER_BLOCK {
                    return Err(BlockError::CapacityExceeded { bits });
                }

                let air = self.registry.air().runtime_id();
                let data = self.data.remapped(&self.pool, new_bits, |entry| {
                    palette.state_for(entry as usize).unwrap_or(air)
                });

                debug!(
                    "Switched from a {}-bit palette to {}-bit runtime ids",
                    bits, new_bits
                );
                (data, Encoding::Direct)
            }
            Encoding::Direct => {
                let new_bits = self.direct_bits(incoming).max(bits + 1);
                if new_bits > MAX_BITS_PER_BLOCK {
                    return Err(BlockError::CapacityExceeded { bits });
                }

                debug!("Widened runtime ids from {} to {} bits", bits, new_bits);
                (self.data.remapped(&self.pool, new_bits, |entry| entry), Encoding::Direct)
            }
        };

        // Dropping the old array returns it to the pool
        self.data = data;
        self.encoding = encoding;
        Ok(())
    }

    fn direct_bits(&self, incoming: StateId) -> u32 {
        let max = self.registry.max_runtime_id().max(incoming) as u64;
        MIN_DIRECT_BITS.max(bits_for_count(max + 1))
    }
}

impl BlockStorage for FlattenedStorage {
    fn registry(&self) -> &Arc<dyn BlockRegistry> {
        &self.registry
    }

    fn block_runtime_id(&self, x: usize, y: usize, z: usize) -> Result<StateId, BlockError> {
        let entry = self.data.get(cell_index(x, y, z));
        match &self.encoding {
            Encoding::Paletted(palette) => palette.state_for(entry as usize).ok_or_else(|| {
                BlockError::invalid(format!(
                    "Index {} is outside of a palette with {} entries",
                    entry,
                    palette.len()
                ))
            }),
            Encoding::Direct => Ok(entry),
        }
    }

    fn set_block_runtime_id(&mut self, x: usize, y: usize, z: usize, runtime_id: StateId) -> Result<(), BlockError> {
        let index = cell_index(x, y, z);
        if !self.registry.contains_runtime_id(runtime_id) {
            return Err(BlockError::UnknownRuntimeId(runtime_id));
        }

        loop {
            let entry = match &mut self.encoding {
                Encoding::Paletted(palette) => match palette.insert(runtime_id) {
                    InsertionResult::AlreadyInPalette { index } | InsertionResult::Inserted { index } =>
                        Some(index as u32),
                    InsertionResult::Full => None,
                },
                Encoding::Direct if runtime_id <= self.data.max_value() => Some(runtime_id),
                Encoding::Direct => None,
            };

            match entry {
                Some(entry) => {
                    self.data.set(index, entry);
                    return Ok(());
                }
                None => self.grow(runtime_id)?,
            }
        }
    }

    fn clone_storage(&self) -> Box<dyn BlockStorage> {
        Box::new(self.clone())
    }
}

impl Clone for FlattenedStorage {
    fn clone(&self) -> Self {
        FlattenedStorage {
            registry: self.registry.clone(),
            pool: self.pool.clone(),
            data: self.data.clone(),
            encoding: match &self.encoding {
                Encoding::Paletted(palette) => Encoding::Paletted(palette.rebuilt(palette.bits())),
                Encoding::Direct => Encoding::Direct,
            },
        }
    }
}

impl Debug for FlattenedStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlattenedStorage")
            .field("registry", &self.registry.id())
            .field("bits_per_block", &self.data.bits())
            .field("palette_len", &self.palette_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{values::*, BlockState, Trait},
        registry::GlobalBlockRegistry,
        storage::cells,
    };

    fn registry_with(count: usize) -> (Arc<GlobalBlockRegistry>, Vec<BlockState>) {
        let global = GlobalBlockRegistry::new();
        let mut states = Vec::new();
        let mut i = 0;
        while states.len() < count {
            let ty = global
                .register(
                    Identifier::minecraft(&format!("block_{}", i)),
                    &[WOOD_TYPE.erase(), POWER.erase()],
                )
                .unwrap();
            states.extend(ty.states());
            i += 1;
        }
        states.truncate(count);
        (global, states)
    }

    #[test]
    fn fresh_storage_is_air() {
        let (global, _) = registry_with(0);
        let storage = FlattenedStorage::new(global.clone());

        assert_eq!(storage.bits_per_block(), MIN_BITS_PER_BLOCK);
        assert_eq!(storage.palette_len(), Some(1));
        assert_eq!(storage.non_air_count(), 0);
        assert_eq!(storage.block_state(3, 4, 5).unwrap(), global.air());
    }

    #[test]
    fn palette_grows_one_bit_at_a_time() {
        let (global, states) = registry_with(40);
        let mut storage = FlattenedStorage::new(global);

        for (i, state) in states.iter().enumerate() {
            storage.set_block_state(i % 16, 0, i / 16, state).unwrap();
        }

        // Air plus 40 states needs 6 bits
        assert_eq!(storage.bits_per_block(), 6);
        assert_eq!(storage.palette_len(), Some(41));
        for (i, state) in states.iter().enumerate() {
            assert_eq!(&storage.block_state(i % 16, 0, i / 16).unwrap(), state);
        }
        assert_eq!(storage.non_air_count(), 40);
    }

    #[test]
    fn full_palette_switches_to_direct() {
        let (global, states) = registry_with(SECTION_VOLUME - 1);
        let mut storage = FlattenedStorage::new(global.clone());

        // Cell 0 keeps air, which with the other states fills a 12-bit palette
        for ((x, y, z), state) in cells().skip(1).zip(states.iter()) {
            storage.set_block_state(x, y, z, state).unwrap();
        }
        assert_eq!(storage.bits_per_block(), MAX_PALETTE_BITS);
        assert_eq!(storage.palette_len(), Some(SECTION_VOLUME));
        assert!(!storage.is_direct());

        let extra = global
            .register(Identifier::minecraft("extra"), &[])
            .unwrap()
            .default_state();
        storage.set_block_state(0, 0, 0, &extra).unwrap();

        assert!(storage.is_direct());
        assert_eq!(storage.palette_len(), None);
        assert_eq!(storage.bits_per_block(), MIN_DIRECT_BITS);
        assert_eq!(storage.block_state(0, 0, 0).unwrap(), extra);
        for ((x, y, z), state) in cells().skip(1).zip(states.iter()) {
            assert_eq!(&storage.block_state(x, y, z).unwrap(), state);
        }
        assert_eq!(storage.non_air_count(), SECTION_VOLUME);

        storage.set_block_state(5, 5, 5, &global.air()).unwrap();
        assert_eq!(storage.non_air_count(), SECTION_VOLUME - 1);
    }

    #[test]
    fn unknown_states_rejected() {
        let (global, _) = registry_with(0);
        let mut storage = FlattenedStorage::new(global.clone());

        assert!(matches!(
            storage.set_block_runtime_id(0, 0, 0, 99),
            Err(BlockError::UnknownRuntimeId(99))
        ));

        let other = GlobalBlockRegistry::new();
        assert!(storage.set_block_state(0, 0, 0, &other.air()).is_err());
    }

    #[test]
    fn clones_are_deep() {
        let (global, states) = registry_with(3);
        let mut storage = FlattenedStorage::new(global);
        storage.set_block_state(1, 1, 1, &states[0]).unwrap();

        let mut copy = storage.clone();
        copy.set_block_state(1, 1, 1, &states[1]).unwrap();
        copy.set_block_state(2, 2, 2, &states[2]).unwrap();

        assert_eq!(storage.block_state(1, 1, 1).unwrap(), states[0]);
        assert_eq!(storage.non_air_count(), 1);
        assert_eq!(copy.block_state(1, 1, 1).unwrap(), states[1]);
        assert_eq!(copy.palette_len(), Some(4));
    }

    #[test]
    fn import_packed_palette() {
        let global = GlobalBlockRegistry::new();
        let log = global
            .register(Identifier::minecraft("log"), &[WOOD_TYPE.erase(), AXIS.erase()])
            .unwrap();

        let palette = vec![
            PaletteEntry::new(Identifier::minecraft("air")),
            PaletteEntry::new(Identifier::minecraft("log"))
                .with_property("wood_type", "birch")
                .with_property("axis", "x"),
            // Repeated states are merged
            PaletteEntry::new(Identifier::minecraft("air")),
        ];
        let mut words = vec![0u64; 256];
        // Cell 1 holds the log, cell 2 the repeated air
        words[0] = 1 << 4 | 2 << 8;

        let storage = FlattenedStorage::from_packed(global.clone(), &palette, &words).unwrap();
        let birch = log
            .default_state()
            .with_trait(&*WOOD_TYPE, WoodType::Birch)
            .unwrap()
            .with_trait(&*AXIS, Axis::X)
            .unwrap();

        assert_eq!(storage.block_state(1, 0, 0).unwrap(), birch);
        assert_eq!(storage.block_state(2, 0, 0).unwrap(), global.air());
        assert_eq!(storage.palette_len(), Some(2));
        assert_eq!(storage.non_air_count(), 1);

        let mut bytes = Vec::new();
        for word in &words {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        let from_bytes = FlattenedStorage::from_packed_bytes(global.clone(), &palette, &bytes).unwrap();
        assert_eq!(from_bytes.block_state(1, 0, 0).unwrap(), birch);
    }

    #[test]
    fn import_rejects_bad_data() {
        let global = GlobalBlockRegistry::new();
        let air = [PaletteEntry::new(Identifier::minecraft("air"))];

        assert!(FlattenedStorage::from_packed(global.clone(), &air, &[0; 255])
            .unwrap_err()
            .is_invalid_value());
        assert!(FlattenedStorage::from_packed(global.clone(), &[], &[0; 256]).is_err());
        assert!(FlattenedStorage::from_packed(global.clone(), &air, &[5; 256]).is_err());
        assert!(FlattenedStorage::from_packed(
            global.clone(),
            &[PaletteEntry::new(Identifier::minecraft("missing"))],
            &[0; 256]
        )
        .is_err());
        assert!(FlattenedStorage::from_packed_bytes(global, &air, &[0; 7]).is_err());
    }

    #[test]
    fn palette_entries_parse_upstream_names() {
        let entry: PaletteEntry =
            serde_json::from_str(r#"{ "Name": "minecraft:log", "Properties": { "axis": "z" } }"#).unwrap();

        assert_eq!(entry.identifier, Identifier::minecraft("log"));
        assert_eq!(entry.properties["axis"], "z");
    }
}
