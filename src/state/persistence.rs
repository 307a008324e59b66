//! Save data.
//!
//! Only progression survives a save: instance slots, runtime states and
//! runeword progress. Rate limiters and traps are caches and start empty
//! after a load.
//!
//! The blob is bincode with a leading version number.

use im::HashMap as ImHashMap;
use serde::{Deserialize, Serialize};

use crate::affixes::InstanceAffixSlots;
use crate::core::{InstanceKey, PersistError};
use crate::runeword::RunewordProgress;

use super::runtime::RuntimeStates;

/// Current save format version.
pub const SAVE_VERSION: u32 = 1;

#[derive(Deserialize)]
struct SaveHeader {
    version: u32,
}

/// Everything persisted across a save/load boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub instance_slots: ImHashMap<InstanceKey, InstanceAffixSlots>,
    pub runtime_states: RuntimeStates,
    pub runeword_progress: ImHashMap<InstanceKey, RunewordProgress>,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            instance_slots: ImHashMap::new(),
            runtime_states: RuntimeStates::new(),
            runeword_progress: ImHashMap::new(),
        }
    }
}

impl SaveData {
    /// Encode to bytes.
    pub fn encode(&self) -> Result<Vec<u8>, PersistError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from bytes, rejecting other versions before touching the body.
    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        let header: SaveHeader = bincode::deserialize(bytes)?;
        if header.version != SAVE_VERSION {
            return Err(PersistError::Version {
                found: header.version,
                expected: SAVE_VERSION,
            });
        }
        Ok(bincode::deserialize(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AffixToken, FormId};

    #[test]
    fn test_encode_decode() {
        let key = InstanceKey::new(FormId::new(0x300), 7);
        let token = AffixToken::from_id("saved");
        let mut data = SaveData::default();
        data.instance_slots.insert(key, InstanceAffixSlots::with_primary(token));
        data.runtime_states.ensure(key, token).evolution_xp = 12;
        data.runeword_progress.insert(key, RunewordProgress::start(AffixToken::from_id("rw")));

        let bytes = data.encode().unwrap();
        let back = SaveData::decode(&bytes).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_rejects_other_version() {
        let data = SaveData {
            version: 99,
            ..Default::default()
        };
        let bytes = data.encode().unwrap();
        assert!(matches!(
            SaveData::decode(&bytes),
            Err(PersistError::Version { found: 99, expected: SAVE_VERSION })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(SaveData::decode(&[1, 2]), Err(PersistError::Codec(_))));
    }
}
