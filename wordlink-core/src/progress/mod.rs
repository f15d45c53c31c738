//! Progress Store: the mutable half of the game.
//!
//! The content graph says what a level looks like; the store says where each
//! word currently sits, which sections are open and which solutions have been
//! found. [`LevelState`] mirrors the shape of its [`LevelDef`] index-for-index
//! (section `i` of the state is section `i` of the definition), which the
//! placement engine and cascade rely on.
//!
//! Every word of a loaded level lives in exactly one of: the level inventory,
//! one section's `available_words`, or one slot.

pub mod document;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::content::LevelDef;
use crate::error::{Result, WordlinkError};
use crate::types::{LevelId, SectionId, SlotId, TutorialFlags, Word, WordId};

pub use document::{LevelRecord, ProgressDocument, SCHEMA_VERSION, SectionRecord};

/// Where a word currently lives inside a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordLocation {
    /// Position in the level inventory.
    Inventory(usize),
    /// Still held back by a locked section.
    Available {
        /// Section index.
        section: usize,
        /// Position within that section's `available_words`.
        index: usize,
    },
    /// Placed in a slot.
    Slot {
        /// Section index.
        section: usize,
        /// Slot index within the section.
        slot: usize,
    },
}

/// A slot and the word the player put there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotState {
    /// Slot id, matching the content graph.
    pub id: SlotId,
    /// The placed word, if any.
    pub word: Option<Word>,
}

/// Mutable state of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionState {
    /// Section id, matching the content graph.
    pub id: SectionId,
    /// Whether the player can see and fill this section.
    pub is_unlocked: bool,
    /// Slots in display order.
    pub slots: Vec<SlotState>,
    /// Words not yet released into the inventory.
    pub available_words: Vec<Word>,
}

/// Mutable state of one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelState {
    /// Level id, matching the content graph.
    pub id: LevelId,
    /// Sections, index-aligned with the level definition.
    pub sections: Vec<SectionState>,
    /// Words the player can place.
    pub inventory: Vec<Word>,
    /// Distinct solution signatures found so far, in discovery order.
    pub solutions: Vec<String>,
    /// Whether the level has ever been completed.
    pub completed: bool,
    /// Whether the current arrangement is a full solution.
    pub currently_complete: bool,
}

impl LevelState {
    /// Whether the player can enter this level.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.sections.first().is_some_and(|s| s.is_unlocked)
    }

    /// Every location currently holding word `id`.
    #[must_use]
    pub fn locations_of(&self, id: &WordId) -> Vec<WordLocation> {
        let mut found = Vec::new();
        for (i, word) in self.inventory.iter().enumerate() {
            if &word.id == id {
                found.push(WordLocation::Inventory(i));
            }
        }
        for (si, section) in self.sections.iter().enumerate() {
            for (i, word) in section.available_words.iter().enumerate() {
                if &word.id == id {
                    found.push(WordLocation::Available { section: si, index: i });
                }
            }
            for (k, slot) in section.slots.iter().enumerate() {
                if slot.word.as_ref().is_some_and(|w| &w.id == id) {
                    found.push(WordLocation::Slot { section: si, slot: k });
                }
            }
        }
        found
    }

    /// The word stored at `location`, if the location is valid and occupied.
    #[must_use]
    pub fn word_at(&self, location: WordLocation) -> Option<&Word> {
        match location {
            WordLocation::Inventory(i) => self.inventory.get(i),
            WordLocation::Available { section, index } => self
                .sections
                .get(section)
                .and_then(|s| s.available_words.get(index)),
            WordLocation::Slot { section, slot } => self
                .sections
                .get(section)
                .and_then(|s| s.slots.get(slot))
                .and_then(|s| s.word.as_ref()),
        }
    }

    /// Remove and return the word at `location`.
    pub(crate) fn take(&mut self, location: WordLocation) -> Option<Word> {
        match location {
            WordLocation::Inventory(i) => {
                (i < self.inventory.len()).then(|| self.inventory.remove(i))
            }
            WordLocation::Available { section, index } => {
                let words = &mut self.sections.get_mut(section)?.available_words;
                (index < words.len()).then(|| words.remove(index))
            }
            WordLocation::Slot { section, slot } => {
                self.sections.get_mut(section)?.slots.get_mut(slot)?.word.take()
            }
        }
    }

    /// Append `word` to the inventory unless a word with the same id is there.
    ///
    /// Returns `true` if the word was inserted.
    pub(crate) fn add_to_inventory(&mut self, word: Word) -> bool {
        if self.inventory.iter().any(|w| w.id == word.id) {
            return false;
        }
        self.inventory.push(word);
        true
    }

    /// Texts of every slot in section/slot order; `None` for empty slots.
    pub fn slot_texts(&self) -> impl Iterator<Item = Option<&str>> {
        self.sections
            .iter()
            .flat_map(|s| s.slots.iter())
            .map(|slot| slot.word.as_ref().map(|w| w.text.as_str()))
    }

    /// Check that every word of `def` is held exactly once and nothing else is held.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::WordMisplaced`] for the first word found zero or
    /// several times, or [`WordlinkError::UnknownWord`] for a word that is not
    /// part of the level.
    pub fn verify_word_locations(&self, def: &LevelDef) -> Result<()> {
        let mut counts: HashMap<&WordId, usize> = HashMap::new();
        let held = self
            .inventory
            .iter()
            .chain(self.sections.iter().flat_map(|s| s.available_words.iter()))
            .chain(
                self.sections
                    .iter()
                    .flat_map(|s| s.slots.iter().filter_map(|k| k.word.as_ref())),
            );
        for word in held {
            if def.word(&word.id).is_none() {
                return Err(WordlinkError::UnknownWord {
                    level: self.id.clone(),
                    word: word.id.clone(),
                });
            }
            *counts.entry(&word.id).or_default() += 1;
        }
        for word in def.all_words() {
            let count = counts.get(&word.id).copied().unwrap_or(0);
            if count != 1 {
                return Err(WordlinkError::WordMisplaced {
                    word: word.id.clone(),
                    count,
                });
            }
        }
        Ok(())
    }

    /// Persistable record of this level.
    #[must_use]
    pub fn to_record(&self) -> LevelRecord {
        LevelRecord {
            sections: self
                .sections
                .iter()
                .map(|s| {
                    let record = SectionRecord {
                        is_unlocked: s.is_unlocked,
                        slots: s
                            .slots
                            .iter()
                            .map(|k| (k.id.clone(), k.word.as_ref().map(|w| w.id.clone())))
                            .collect(),
                        available_words: s.available_words.iter().map(|w| w.id.clone()).collect(),
                    };
                    (s.id.clone(), record)
                })
                .collect(),
            inventory: self.inventory.iter().map(|w| w.id.clone()).collect(),
            solutions: self.solutions.clone(),
            completed: self.completed,
        }
    }
}

/// All loaded levels plus the global tutorial flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressStore {
    /// Loaded levels by id.
    pub levels: BTreeMap<LevelId, LevelState>,
    /// One-time tutorial flags.
    pub tutorials: TutorialFlags,
}

impl ProgressStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A loaded level.
    #[must_use]
    pub fn level(&self, id: &LevelId) -> Option<&LevelState> {
        self.levels.get(id)
    }

    /// Snapshot of the whole store as a persistable document.
    #[must_use]
    pub fn to_document(&self) -> ProgressDocument {
        ProgressDocument {
            schema_version: SCHEMA_VERSION,
            levels: self
                .levels
                .iter()
                .map(|(id, level)| (id.clone(), level.to_record()))
                .collect(),
            tutorials: self.tutorials,
        }
    }
}
