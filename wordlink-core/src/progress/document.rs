//! Versioned on-disk progress document.
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "levels": {
//!     "level_1": {
//!       "sections": {
//!         "section_1_1": {
//!           "isUnlocked": true,
//!           "slots": { "slot_1_1_1": "<word id>", "slot_1_1_2": null },
//!           "availableWords": []
//!         }
//!       },
//!       "inventory": ["<word id>"],
//!       "solutions": ["Apple,Sky"],
//!       "completed": true
//!     }
//!   },
//!   "tutorials": { "mainCompleted": true, "sectionCompleted": false, "hintCompleted": false }
//! }
//! ```
//!
//! Documents without `schemaVersion` come from the unversioned layout that
//! stored whole word objects; they are migrated on read. Newer versions are
//! refused rather than guessed at.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordlinkError};
use crate::types::{LevelId, SectionId, SlotId, TutorialFlags, Word, WordId};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// The full persisted progress document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    /// Layout version; always [`SCHEMA_VERSION`] when written.
    pub schema_version: u32,
    /// Per-level records.
    #[serde(default)]
    pub levels: BTreeMap<LevelId, LevelRecord>,
    /// Global tutorial flags.
    #[serde(default)]
    pub tutorials: TutorialFlags,
}

impl Default for ProgressDocument {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            levels: BTreeMap::new(),
            tutorials: TutorialFlags::default(),
        }
    }
}

/// Persisted state of one level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelRecord {
    /// Per-section records.
    #[serde(default)]
    pub sections: BTreeMap<SectionId, SectionRecord>,
    /// Inventory word ids, in display order.
    #[serde(default)]
    pub inventory: Vec<WordId>,
    /// Distinct solution signatures.
    #[serde(default)]
    pub solutions: Vec<String>,
    /// Whether the level was ever completed.
    #[serde(default)]
    pub completed: bool,
}

/// Persisted state of one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    /// Whether the section was unlocked.
    #[serde(default)]
    pub is_unlocked: bool,
    /// Slot id → placed word id.
    #[serde(default)]
    pub slots: BTreeMap<SlotId, Option<WordId>>,
    /// Word ids still held back by the section.
    #[serde(default)]
    pub available_words: Vec<WordId>,
}

impl ProgressDocument {
    /// Serialize to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Serialization`] if encoding fails.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| WordlinkError::Serialization(e.to_string()))
    }

    /// Parse JSON bytes, migrating the unversioned layout.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::SchemaVersion`] for any version other than
    /// [`SCHEMA_VERSION`], or [`WordlinkError::Serialization`] if the bytes
    /// are not a recognisable document.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| WordlinkError::Serialization(e.to_string()))?;

        let Some(version) = value.get("schemaVersion") else {
            let legacy: LegacyDocument = serde_json::from_value(value)
                .map_err(|e| WordlinkError::Serialization(format!("unversioned document: {e}")))?;
            return Ok(legacy.migrate());
        };

        let found = version
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| WordlinkError::Serialization("schemaVersion is not an integer".into()))?;
        if found != SCHEMA_VERSION {
            return Err(WordlinkError::SchemaVersion {
                found,
                expected: SCHEMA_VERSION,
            });
        }

        serde_json::from_value(value).map_err(|e| WordlinkError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Unversioned layout
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct LegacyDocument {
    #[serde(default)]
    levels: BTreeMap<LevelId, LegacyLevel>,
    #[serde(default)]
    tutorials: LegacyTutorials,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyLevel {
    #[serde(default)]
    sections: BTreeMap<SectionId, LegacySection>,
    #[serde(default)]
    inventory: Vec<Word>,
    #[serde(default)]
    solutions: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySection {
    #[serde(default)]
    is_unlocked: bool,
    #[serde(default)]
    slots: BTreeMap<SlotId, LegacySlot>,
    #[serde(default)]
    available_words: Vec<Word>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySlot {
    #[serde(default)]
    current_word: Option<Word>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyTutorials {
    #[serde(default)]
    main_tutorial_completed: bool,
    #[serde(default)]
    section_tutorial_completed: bool,
    #[serde(default)]
    hint_tutorial_completed: bool,
}

impl LegacyDocument {
    fn migrate(self) -> ProgressDocument {
        let levels = self
            .levels
            .into_iter()
            .map(|(id, level)| {
                let sections = level
                    .sections
                    .into_iter()
                    .map(|(sid, section)| {
                        let record = SectionRecord {
                            is_unlocked: section.is_unlocked,
                            slots: section
                                .slots
                                .into_iter()
                                .map(|(slot, s)| (slot, s.current_word.map(|w| w.id)))
                                .collect(),
                            available_words: section
                                .available_words
                                .into_iter()
                                .map(|w| w.id)
                                .collect(),
                        };
                        (sid, record)
                    })
                    .collect();
                let record = LevelRecord {
                    sections,
                    inventory: level.inventory.into_iter().map(|w| w.id).collect(),
                    completed: !level.solutions.is_empty(),
                    solutions: level.solutions,
                };
                (id, record)
            })
            .collect();

        ProgressDocument {
            schema_version: SCHEMA_VERSION,
            levels,
            tutorials: TutorialFlags {
                main_completed: self.tutorials.main_tutorial_completed,
                section_completed: self.tutorials.section_tutorial_completed,
                hint_completed: self.tutorials.hint_tutorial_completed,
            },
        }
    }
}
