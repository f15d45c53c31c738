//! Unlock Cascade: opening sections as earlier ones are solved.
//!
//! Sections unlock strictly in order. Section `i + 1` opens once sections
//! `0..=i` are *simultaneously* correct; opening it releases its authored
//! words into the inventory. Unlocks are monotonic: breaking an earlier
//! section later stops further progress but never re-locks anything.
//!
//! The cascade is a pure function of slot contents and the hint dictionary,
//! so running it twice without an intervening placement changes nothing.

use tracing::info;

use crate::content::{LevelDef, SectionDef};
use crate::progress::{LevelState, SectionState, WordLocation};
use crate::solution;
use crate::types::{HintDictionary, LevelId, SectionId};

/// What a cascade pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Sections opened during this pass, in order.
    pub unlocked_sections: Vec<SectionId>,
    /// Whether every section is open and correct right now.
    pub level_complete: bool,
    /// Signature recorded by this pass, if it was new.
    pub new_solution: Option<String>,
    /// Set when this pass completed the level for the first time.
    pub first_completion: bool,
    /// Next level opened as a consequence, filled in by the engine.
    pub unlocked_level: Option<LevelId>,
}

impl CascadeReport {
    /// Whether the pass changed anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.unlocked_sections.is_empty()
            && self.new_solution.is_none()
            && !self.first_completion
            && self.unlocked_level.is_none()
    }
}

/// Whether every slot of a section holds a word its hint accepts.
#[must_use]
pub fn section_correct(hints: &HintDictionary, def: &SectionDef, state: &SectionState) -> bool {
    def.slots.iter().zip(&state.slots).all(|(slot, held)| {
        held.word.as_ref().is_some_and(|word| {
            hints
                .get(&slot.hint)
                .is_some_and(|hint| hint.accepts(&word.text))
        })
    })
}

/// Whether every section is open and correct.
#[must_use]
pub fn level_complete(hints: &HintDictionary, def: &LevelDef, state: &LevelState) -> bool {
    state.sections.iter().all(|s| s.is_unlocked)
        && def
            .sections
            .iter()
            .zip(&state.sections)
            .all(|(d, s)| section_correct(hints, d, s))
}

/// Run the cascade for one level, then the solution tracker.
pub fn run(hints: &HintDictionary, def: &LevelDef, state: &mut LevelState) -> CascadeReport {
    let mut report = CascadeReport::default();

    for i in 0..def.sections.len().saturating_sub(1) {
        if !section_correct(hints, &def.sections[i], &state.sections[i]) {
            break;
        }
        if !state.sections[i + 1].is_unlocked {
            unlock_section(def, state, i + 1);
            report.unlocked_sections.push(def.sections[i + 1].id.clone());
        }
    }

    let outcome = solution::track(hints, def, state);
    report.level_complete = outcome.complete;
    report.new_solution = outcome.new_signature;
    report.first_completion = outcome.first_completion;
    report
}

/// Open section `index` and move its still-held words into the inventory.
///
/// Words are taken from the canonical content, so a word that already left
/// the section (placed early, or released by an older build) stays put.
/// Returns `false` if the section was already open.
pub fn unlock_section(def: &LevelDef, state: &mut LevelState, index: usize) -> bool {
    if state.sections[index].is_unlocked {
        return false;
    }
    state.sections[index].is_unlocked = true;

    let mut released = 0usize;
    for word in &def.sections[index].words {
        let held = state
            .locations_of(&word.id)
            .into_iter()
            .find(|loc| matches!(loc, WordLocation::Available { .. }));
        if let Some(word) = held.and_then(|location| state.take(location)) {
            state.add_to_inventory(word);
            released += 1;
        }
    }
    // Open sections never hold words back.
    let leftovers = std::mem::take(&mut state.sections[index].available_words);
    for word in leftovers {
        state.add_to_inventory(word);
    }

    info!(
        level = %def.id,
        section = %def.sections[index].id,
        released,
        "Section unlocked"
    );
    true
}
