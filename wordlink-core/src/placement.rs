//! Placement Engine: moving one word between inventory and slots.
//!
//! A placement names a word and where it should go. The word's current
//! location is always found by id; the optional source slot the UI passes
//! along is checked against it first. Every reference is validated before
//! anything moves, so a rejected placement leaves the level exactly as it was.
//!
//! Moving into an occupied slot displaces its word: back into the source slot
//! (a swap) when the placement names one that really held the moved word,
//! otherwise into the inventory.

use tracing::debug;

use crate::content::LevelDef;
use crate::error::{Result, WordlinkError};
use crate::progress::{LevelState, WordLocation};
use crate::types::{LevelId, SectionId, SlotId, Word, WordId};

/// A `(section, slot)` pair naming one slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotRef {
    /// Section the slot belongs to.
    pub section: SectionId,
    /// The slot.
    pub slot: SlotId,
}

impl SlotRef {
    /// Build a slot reference.
    #[must_use]
    pub fn new(section: impl Into<SectionId>, slot: impl Into<SlotId>) -> Self {
        Self {
            section: section.into(),
            slot: slot.into(),
        }
    }
}

/// Where a word should end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Back into the level inventory.
    Inventory,
    /// Into a specific slot.
    Slot(SlotRef),
}

/// A request to move one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Level being played.
    pub level: LevelId,
    /// Word to move.
    pub word: WordId,
    /// Destination.
    pub target: Target,
    /// Slot the UI believes the word is dragged from, if any.
    pub source: Option<SlotRef>,
}

impl Placement {
    /// Move `word` into `slot` of `section`.
    #[must_use]
    pub fn to_slot(
        level: impl Into<LevelId>,
        word: impl Into<WordId>,
        section: impl Into<SectionId>,
        slot: impl Into<SlotId>,
    ) -> Self {
        Self {
            level: level.into(),
            word: word.into(),
            target: Target::Slot(SlotRef::new(section, slot)),
            source: None,
        }
    }

    /// Move `word` back to the inventory.
    #[must_use]
    pub fn to_inventory(level: impl Into<LevelId>, word: impl Into<WordId>) -> Self {
        Self {
            level: level.into(),
            word: word.into(),
            target: Target::Inventory,
            source: None,
        }
    }

    /// Attach the slot the word is dragged from.
    #[must_use]
    pub fn from_slot(mut self, section: impl Into<SectionId>, slot: impl Into<SlotId>) -> Self {
        self.source = Some(SlotRef::new(section, slot));
        self
    }
}

/// Where a displaced word went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Displaced {
    /// Into the inventory.
    ToInventory(WordId),
    /// Swapped into the slot the moved word came from.
    ToSlot(WordId, SlotRef),
}

/// What a placement did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementEffect {
    /// `false` when the word was already where it was asked to go.
    pub changed: bool,
    /// The word pushed out of the target slot, if any.
    pub displaced: Option<Displaced>,
}

/// Validate and apply `placement` to `state`.
///
/// # Errors
///
/// Returns an invalid-reference error (unknown section, slot or word, or a
/// locked target section unless `allow_locked` is set) without touching
/// `state`, or [`WordlinkError::WordMisplaced`] if the word is not held
/// exactly once.
pub fn apply(
    def: &LevelDef,
    state: &mut LevelState,
    placement: &Placement,
    allow_locked: bool,
) -> Result<PlacementEffect> {
    let target = match &placement.target {
        Target::Inventory => None,
        Target::Slot(slot_ref) => Some(resolve_slot(def, slot_ref)?),
    };
    if let Some((section, _)) = target {
        if !allow_locked && !state.sections[section].is_unlocked {
            return Err(WordlinkError::SectionLocked {
                level: def.id.clone(),
                section: def.sections[section].id.clone(),
            });
        }
    }
    if def.word(&placement.word).is_none() {
        return Err(WordlinkError::UnknownWord {
            level: def.id.clone(),
            word: placement.word.clone(),
        });
    }

    let (current, from_source) = locate(def, state, placement)?;

    match target {
        None => {
            if matches!(current, WordLocation::Inventory(_)) {
                return Ok(PlacementEffect::default());
            }
            let word = take(state, current, &placement.word)?;
            state.add_to_inventory(word);
            debug!(level = %def.id, word = %placement.word, from = ?current, "Word returned to inventory");
            Ok(PlacementEffect {
                changed: true,
                displaced: None,
            })
        }
        Some((section, slot)) => {
            if current == (WordLocation::Slot { section, slot }) {
                return Ok(PlacementEffect::default());
            }
            let word = take(state, current, &placement.word)?;
            let previous = state.sections[section].slots[slot].word.replace(word);

            let swap_into = match current {
                WordLocation::Slot { section: s, slot: k } if from_source => Some((s, k)),
                _ => None,
            };
            let displaced = previous.map(|old| match swap_into {
                Some((from_section, from_slot)) => {
                    let id = old.id.clone();
                    state.sections[from_section].slots[from_slot].word = Some(old);
                    Displaced::ToSlot(
                        id,
                        SlotRef {
                            section: def.sections[from_section].id.clone(),
                            slot: def.sections[from_section].slots[from_slot].id.clone(),
                        },
                    )
                }
                None => {
                    let id = old.id.clone();
                    state.add_to_inventory(old);
                    Displaced::ToInventory(id)
                }
            });

            debug!(
                level = %def.id,
                word = %placement.word,
                section = %def.sections[section].id,
                slot = %def.sections[section].slots[slot].id,
                displaced = ?displaced,
                "Word placed"
            );
            Ok(PlacementEffect {
                changed: true,
                displaced,
            })
        }
    }
}

fn resolve_slot(def: &LevelDef, slot_ref: &SlotRef) -> Result<(usize, usize)> {
    let section = def
        .section_index(&slot_ref.section)
        .ok_or_else(|| WordlinkError::UnknownSection {
            level: def.id.clone(),
            section: slot_ref.section.clone(),
        })?;
    let slot = def.sections[section]
        .slot_index(&slot_ref.slot)
        .ok_or_else(|| WordlinkError::UnknownSlot {
            section: slot_ref.section.clone(),
            slot: slot_ref.slot.clone(),
        })?;
    Ok((section, slot))
}

/// Find the word, trying the caller's source hint before a full scan.
///
/// The flag is `true` only when the source slot really holds the word.
fn locate(
    def: &LevelDef,
    state: &LevelState,
    placement: &Placement,
) -> Result<(WordLocation, bool)> {
    let hinted = placement
        .source
        .as_ref()
        .and_then(|source| resolve_slot(def, source).ok())
        .map(|(section, slot)| WordLocation::Slot { section, slot })
        .filter(|&loc| state.word_at(loc).is_some_and(|w| w.id == placement.word));

    if let Some(location) = hinted {
        return Ok((location, true));
    }

    let locations = state.locations_of(&placement.word);
    match locations.as_slice() {
        [only] => Ok((*only, false)),
        _ => Err(WordlinkError::WordMisplaced {
            word: placement.word.clone(),
            count: locations.len(),
        }),
    }
}

fn take(state: &mut LevelState, location: WordLocation, id: &WordId) -> Result<Word> {
    state.take(location).ok_or_else(|| WordlinkError::WordMisplaced {
        word: id.clone(),
        count: 0,
    })
}
