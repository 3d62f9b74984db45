use super::{tables::RegistryTables, BlockRegistry, GlobalBlockRegistry};
use crate::{block::AnyTrait, StateId};
use log::warn;
use qblocks_util::Identifier;
use std::{collections::HashMap, sync::Arc};

/// Maps runtime ids between a version registry and the global registry.
///
/// Conversion is lossy: ids without an equivalent on the other side convert to air. Global ids
/// registered after the converter was built also convert to air.
pub struct RegistryConverter {
    global: Option<Arc<GlobalBlockRegistry>>,
    to_global: Box<[StateId]>,
    from_global: Box<[StateId]>,
    version_air: StateId,
}

impl RegistryConverter {
    /// The converter of the global registry itself, which leaves ids unchanged.
    pub(crate) fn identity() -> Self {
        RegistryConverter {
            global: None,
            to_global: Box::new([]),
            from_global: Box::new([]),
            version_air: 0,
        }
    }

    /// Builds the tables for a version registry. `global_names` maps a version identifier to the
    /// global identifier it converts to, and `trait_names` renames version traits to global ones.
    pub(crate) fn build(
        version: &RegistryTables,
        global: &Arc<GlobalBlockRegistry>,
        global_names: &HashMap<Identifier, Identifier>,
        trait_names: &HashMap<Identifier, HashMap<String, String>>,
    ) -> Self
    {
        let version_air = version
            .block_type(&Identifier::minecraft("air"))
            .map(|air| air.default_state().runtime_id())
            .unwrap_or(0);
        let mut to_global = vec![0; version.runtime_id_limit()];
        let mut from_global: Vec<Option<(StateId, bool)>> = vec![None; global.max_runtime_id() as usize + 1];

        for ty in version.types() {
            let global_name = global_names.get(ty.identifier()).unwrap_or(ty.identifier());
            let global_type = match global.block_type(global_name) {
                Ok(global_type) => global_type,
                Err(_) => {
                    warn!(
                        "{} has no global equivalent {}, converting it to air",
                        ty.identifier(),
                        global_name
                    );
                    continue;
                }
            };
            let renames = trait_names.get(ty.identifier());

            // Map each version trait to the position of the global trait it carries its value to
            let positions = ty
                .traits()
                .iter()
                .map(|t| {
                    let name = renames
                        .and_then(|renames| renames.get(t.trait_name()))
                        .map(String::as_str)
                        .unwrap_or(t.trait_name());
                    global_type.trait_position(name)
                })
                .collect::<Vec<_>>();

            for state in ty.states() {
                let mut target = global_type.default_state();
                for (position, (_, text)) in positions.iter().zip(state.encoded_properties()) {
                    let global_trait = match position {
                        Some(position) => &global_type.traits()[*position],
                        None => continue,
                    };
                    // Values the global trait cannot represent keep its default
                    if let Ok(index) = global_trait.decode_index(&text) {
                        if let Ok(next) = target.with_trait_index(global_trait.trait_name(), index) {
                            target = next;
                        }
                    }
                }

                let version_id = state.runtime_id();
                let global_id = target.runtime_id();
                to_global[version_id as usize] = global_id;

                // Several version states may share a global state; prefer the default one
                if let Some(slot) = from_global.get_mut(global_id as usize) {
                    let replace = match *slot {
                        None => true,
                        Some((_, was_default)) => !was_default && state.is_default(),
                    };
                    if replace {
                        *slot = Some((version_id, state.is_default()));
                    }
                }
            }
        }

        RegistryConverter {
            global: Some(global.clone()),
            to_global: to_global.into_boxed_slice(),
            from_global: from_global
                .into_iter()
                .map(|slot| slot.map(|(id, _)| id).unwrap_or(version_air))
                .collect(),
            version_air,
        }
    }

    /// Returns whether this converter leaves ids unchanged.
    #[inline]
    pub fn is_identity(&self) -> bool {
        self.global.is_none()
    }

    /// The global registry ids are converted to, or `None` for the global registry's own
    /// converter.
    #[inline]
    pub fn global(&self) -> Option<&Arc<GlobalBlockRegistry>> {
        self.global.as_ref()
    }

    /// Converts a runtime id of the owning registry to a global runtime id.
    #[inline]
    pub fn to_global(&self, runtime_id: StateId) -> StateId {
        if self.is_identity() {
            runtime_id
        } else {
            self.to_global.get(runtime_id as usize).copied().unwrap_or(0)
        }
    }

    /// Converts a global runtime id to a runtime id of the owning registry.
    #[inline]
    pub fn from_global(&self, runtime_id: StateId) -> StateId {
        if self.is_identity() {
            runtime_id
        } else {
            self.from_global
                .get(runtime_id as usize)
                .copied()
                .unwrap_or(self.version_air)
        }
    }
}
