//! Reconciler: merge saved progress onto the current content.
//!
//! Content ships updates; saves do not. Loading a level therefore starts from
//! the bootstrap shape of the *current* content and overlays whatever the
//! saved record still makes sense for:
//!
//! 1. slot contents, then held-back words, then the inventory, each word id
//!    accepted at most once and only if the level still defines it;
//! 2. every canonical word nothing claimed goes where bootstrap would put it
//!    (its section's inventory if that section is open, otherwise held back);
//! 3. open sections never hold words back, so leftovers move to the inventory.
//!
//! Sections the save does not mention come out locked (or open, if bootstrap
//! opens them), so new content shows up without corrupting old progress.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::content::LevelDef;
use crate::progress::{LevelRecord, LevelState, SectionState, SlotState};
use crate::types::{Word, WordId};

/// Fresh state for `def`: the first section open iff `first_unlocked`, its
/// words in the inventory, every other section locked with its words held back.
#[must_use]
pub fn bootstrap(def: &LevelDef, first_unlocked: bool) -> LevelState {
    let mut inventory = Vec::new();
    let sections = def
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let is_unlocked = i == 0 && first_unlocked;
            let available_words = if is_unlocked {
                inventory.extend(section.words.iter().cloned());
                Vec::new()
            } else {
                section.words.clone()
            };
            SectionState {
                id: section.id.clone(),
                is_unlocked,
                slots: empty_slots(def, i),
                available_words,
            }
        })
        .collect();

    LevelState {
        id: def.id.clone(),
        sections,
        inventory,
        solutions: Vec::new(),
        completed: false,
        currently_complete: false,
    }
}

/// Rebuild `def`'s state from an optional saved `record`.
///
/// Never fails: ids the content no longer knows are dropped, words the save
/// does not mention fall back to their bootstrap position.
#[must_use]
pub fn reconcile(def: &LevelDef, record: Option<&LevelRecord>, first_unlocked: bool) -> LevelState {
    let Some(record) = record else {
        return bootstrap(def, first_unlocked);
    };

    let mut claimed: HashSet<WordId> = HashSet::new();
    let mut dropped = 0usize;
    let mut claim = |id: &WordId, claimed: &mut HashSet<WordId>| -> Option<Word> {
        match def.word(id) {
            Some(word) if claimed.insert(id.clone()) => Some(word.clone()),
            Some(_) => None,
            None => {
                dropped += 1;
                None
            }
        }
    };

    let mut sections: Vec<SectionState> = def
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| SectionState {
            id: section.id.clone(),
            is_unlocked: i == 0 && first_unlocked,
            slots: empty_slots(def, i),
            available_words: Vec::new(),
        })
        .collect();

    // Slot contents first: a placed word is the strongest statement a save makes.
    for (section, def_section) in sections.iter_mut().zip(&def.sections) {
        let Some(saved) = record.sections.get(&def_section.id) else {
            continue;
        };
        section.is_unlocked |= saved.is_unlocked;
        for slot in &mut section.slots {
            if let Some(Some(word_id)) = saved.slots.get(&slot.id) {
                slot.word = claim(word_id, &mut claimed);
            }
        }
    }

    for (section, def_section) in sections.iter_mut().zip(&def.sections) {
        let Some(saved) = record.sections.get(&def_section.id) else {
            continue;
        };
        for word_id in &saved.available_words {
            if let Some(word) = claim(word_id, &mut claimed) {
                section.available_words.push(word);
            }
        }
    }

    let mut inventory = Vec::new();
    for word_id in &record.inventory {
        if let Some(word) = claim(word_id, &mut claimed) {
            inventory.push(word);
        }
    }

    // Anything unclaimed goes back where bootstrap would have put it.
    for (i, def_section) in def.sections.iter().enumerate() {
        for word in &def_section.words {
            if claimed.contains(&word.id) {
                continue;
            }
            if sections[i].is_unlocked {
                inventory.push(word.clone());
            } else {
                sections[i].available_words.push(word.clone());
            }
        }
    }

    for section in sections.iter_mut().filter(|s| s.is_unlocked) {
        inventory.append(&mut section.available_words);
    }

    if dropped > 0 {
        warn!(level = %def.id, dropped, "Dropped stale word ids from saved progress");
    }

    let mut solutions: Vec<String> = Vec::with_capacity(record.solutions.len());
    for signature in &record.solutions {
        if !solutions.contains(signature) {
            solutions.push(signature.clone());
        }
    }

    let state = LevelState {
        id: def.id.clone(),
        sections,
        inventory,
        completed: record.completed || !solutions.is_empty(),
        solutions,
        currently_complete: false,
    };
    debug!(
        level = %def.id,
        inventory = state.inventory.len(),
        solutions = state.solutions.len(),
        "Reconciled saved level"
    );
    debug_assert!(state.verify_word_locations(def).is_ok());
    state
}

fn empty_slots(def: &LevelDef, section: usize) -> Vec<SlotState> {
    def.sections[section]
        .slots
        .iter()
        .map(|slot| SlotState {
            id: slot.id.clone(),
            word: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentGraph;
    use crate::content::tests::two_level_json;
    use crate::progress::SectionRecord;
    use crate::types::SlotId;

    fn def() -> LevelDef {
        ContentGraph::from_json(two_level_json()).expect("load").levels[0].clone()
    }

    #[test]
    fn bootstrap_opens_first_section_only() {
        let def = def();
        let state = bootstrap(&def, true);
        assert!(state.sections[0].is_unlocked);
        assert!(!state.sections[1].is_unlocked);
        let texts: Vec<_> = state.inventory.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["Apple", "Sky"]);
        assert!(state.sections[0].available_words.is_empty());
        state.verify_word_locations(&def).expect("valid");
    }

    #[test]
    fn bootstrap_of_gated_level_holds_everything_back() {
        let def = def();
        let state = bootstrap(&def, false);
        assert!(!state.is_unlocked());
        assert!(state.inventory.is_empty());
        assert_eq!(state.sections[0].available_words.len(), 2);
        state.verify_word_locations(&def).expect("valid");
    }

    #[test]
    fn missing_record_bootstraps() {
        let def = def();
        assert_eq!(reconcile(&def, None, true), bootstrap(&def, true));
    }

    #[test]
    fn saved_slots_and_flags_are_restored() {
        let def = def();
        let apple = def.sections[0].words[0].clone();
        let sky = def.sections[0].words[1].clone();
        let mut record = LevelRecord {
            inventory: vec![sky.id.clone()],
            solutions: vec!["Apple,Sky".into(), "Apple,Sky".into()],
            ..LevelRecord::default()
        };
        record.sections.insert(
            def.sections[0].id.clone(),
            SectionRecord {
                is_unlocked: true,
                slots: [(def.sections[0].slots[0].id.clone(), Some(apple.id.clone()))].into(),
                available_words: vec![],
            },
        );
        record.sections.insert(
            def.sections[1].id.clone(),
            SectionRecord {
                is_unlocked: true,
                ..SectionRecord::default()
            },
        );

        let state = reconcile(&def, Some(&record), true);
        assert_eq!(state.sections[0].slots[0].word.as_ref(), Some(&apple));
        assert!(state.sections[1].is_unlocked);
        assert_eq!(state.inventory, vec![sky]);
        assert_eq!(state.solutions, vec!["Apple,Sky".to_string()]);
        assert!(state.completed);
        state.verify_word_locations(&def).expect("valid");
    }

    #[test]
    fn stale_ids_are_dropped_and_slot_reads_empty() {
        let def = def();
        let mut record = LevelRecord {
            inventory: vec![WordId::from("gone-1")],
            ..LevelRecord::default()
        };
        record.sections.insert(
            def.sections[0].id.clone(),
            SectionRecord {
                is_unlocked: true,
                slots: [(def.sections[0].slots[0].id.clone(), Some(WordId::from("gone-2")))].into(),
                available_words: vec![],
            },
        );

        let state = reconcile(&def, Some(&record), true);
        assert!(state.sections[0].slots[0].word.is_none());
        assert_eq!(state.inventory.len(), 2, "canonical words fall back to the inventory");
        state.verify_word_locations(&def).expect("valid");
    }

    #[test]
    fn duplicated_ids_in_save_are_claimed_once() {
        let def = def();
        let apple = def.sections[0].words[0].clone();
        let mut record = LevelRecord {
            inventory: vec![apple.id.clone(), apple.id.clone()],
            ..LevelRecord::default()
        };
        record.sections.insert(
            def.sections[0].id.clone(),
            SectionRecord {
                is_unlocked: true,
                slots: [(def.sections[0].slots[0].id.clone(), Some(apple.id.clone()))].into(),
                available_words: vec![],
            },
        );

        let state = reconcile(&def, Some(&record), true);
        assert_eq!(state.sections[0].slots[0].word.as_ref(), Some(&apple));
        assert_eq!(state.inventory.len(), 1);
        state.verify_word_locations(&def).expect("valid");
    }

    #[test]
    fn sections_missing_from_save_stay_locked() {
        let def = def();
        let mut record = LevelRecord::default();
        record.sections.insert(
            def.sections[0].id.clone(),
            SectionRecord {
                is_unlocked: true,
                ..SectionRecord::default()
            },
        );
        let state = reconcile(&def, Some(&record), true);
        assert!(!state.sections[1].is_unlocked);
    }

    #[test]
    fn unknown_slot_ids_in_save_are_ignored() {
        let def = def();
        let apple = def.sections[0].words[0].clone();
        let mut record = LevelRecord::default();
        record.sections.insert(
            def.sections[0].id.clone(),
            SectionRecord {
                is_unlocked: true,
                slots: [(SlotId::from("slot_9_9_9"), Some(apple.id.clone()))].into(),
                available_words: vec![],
            },
        );
        let state = reconcile(&def, Some(&record), true);
        assert!(state.inventory.contains(&apple));
        state.verify_word_locations(&def).expect("valid");
    }

    #[test]
    fn words_held_by_an_open_section_are_released() {
        let def = def();
        let apple = def.sections[0].words[0].clone();
        let mut record = LevelRecord::default();
        record.sections.insert(
            def.sections[0].id.clone(),
            SectionRecord {
                is_unlocked: true,
                slots: Default::default(),
                available_words: vec![apple.id.clone()],
            },
        );
        let state = reconcile(&def, Some(&record), true);
        assert!(state.sections[0].available_words.is_empty());
        assert!(state.inventory.contains(&apple));
    }
}
