//! Content Loader: authored levels into the canonical content graph.
//!
//! The graph is immutable once built. It owns the positional ids of every
//! level, section and slot, the baked id of every word, the hint dictionary
//! and the decoration map. Validation happens here so the rest of the engine
//! can assume every slot's hint exists and every word id is unique per level.

pub mod raw;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{Result, WordlinkError};
use crate::types::{Hint, HintDictionary, HintId, LevelId, SectionId, SlotId, Word, WordId};

pub use raw::{RawContent, RawLevel, RawSection, RawWord, bake_word_ids, derive_word_id};

/// A slot as authored: its id and the hint it displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDef {
    /// Positional slot id.
    pub id: SlotId,
    /// Hint shown on the slot.
    pub hint: HintId,
}

/// A section as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDef {
    /// Positional section id.
    pub id: SectionId,
    /// Display name.
    pub name: String,
    /// Slots in display order.
    pub slots: Vec<SlotDef>,
    /// Words this section introduces when it unlocks.
    pub words: Vec<Word>,
    /// Default unlock state: only the first section of the first level.
    pub is_unlocked: bool,
}

impl SectionDef {
    /// Position of `slot` within this section.
    #[must_use]
    pub fn slot_index(&self, slot: &SlotId) -> Option<usize> {
        self.slots.iter().position(|s| &s.id == slot)
    }
}

/// A level as authored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelDef {
    /// Positional level id.
    pub id: LevelId,
    /// Display name.
    pub name: String,
    /// Sections in unlock order; never empty.
    pub sections: Vec<SectionDef>,
    words: HashMap<WordId, (usize, usize)>,
}

impl LevelDef {
    /// Position of `section` within this level.
    #[must_use]
    pub fn section_index(&self, section: &SectionId) -> Option<usize> {
        self.sections.iter().position(|s| &s.id == section)
    }

    /// Look up a word of this level by id.
    #[must_use]
    pub fn word(&self, id: &WordId) -> Option<&Word> {
        self.words
            .get(id)
            .map(|&(section, index)| &self.sections[section].words[index])
    }

    /// Every word of the level, in section/authoring order.
    pub fn all_words(&self) -> impl Iterator<Item = &Word> {
        self.sections.iter().flat_map(|s| s.words.iter())
    }

    /// Total number of words authored for this level.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Total number of slots across all sections.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.sections.iter().map(|s| s.slots.len()).sum()
    }
}

/// The canonical, validated content graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGraph {
    /// Levels in play order.
    pub levels: Vec<LevelDef>,
    /// Global hint dictionary.
    pub hints: HintDictionary,
    /// Word text → decoration.
    pub word_emojis: BTreeMap<String, String>,
}

impl ContentGraph {
    /// Build and validate the graph from authored content.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Content`] if a slot references an unknown
    /// hint, a level has no sections, or a word id repeats within a level.
    pub fn from_raw(raw: RawContent) -> Result<Self> {
        let RawContent {
            levels: raw_levels,
            hints,
            word_emojis,
        } = raw;

        let mut levels = Vec::with_capacity(raw_levels.len());
        for (li, raw_level) in raw_levels.into_iter().enumerate() {
            levels.push(build_level(li, raw_level, &hints)?);
        }

        let graph = Self {
            levels,
            hints,
            word_emojis,
        };
        info!(
            levels = graph.levels.len(),
            hints = graph.hints.len(),
            words = graph.levels.iter().map(LevelDef::word_count).sum::<usize>(),
            "Content graph loaded"
        );
        Ok(graph)
    }

    /// Parse a JSON content document and build the graph.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Content`] on malformed JSON or invalid content.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawContent = serde_json::from_str(json)
            .map_err(|e| WordlinkError::Content(format!("malformed content document: {e}")))?;
        Self::from_raw(raw)
    }

    /// Read and build the graph from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Io`] if the file cannot be read, otherwise as
    /// [`ContentGraph::from_json`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a level by id, with its position.
    #[must_use]
    pub fn level(&self, id: &LevelId) -> Option<(usize, &LevelDef)> {
        self.levels.iter().enumerate().find(|(_, l)| &l.id == id)
    }

    /// The level following `id`, if any.
    #[must_use]
    pub fn next_level(&self, id: &LevelId) -> Option<&LevelDef> {
        let (index, _) = self.level(id)?;
        self.levels.get(index + 1)
    }

    /// Look up a hint.
    #[must_use]
    pub fn hint(&self, id: &HintId) -> Option<&Hint> {
        self.hints.get(id)
    }

    /// Decoration for `text`, preferring the hint-specific one when given.
    #[must_use]
    pub fn emoji_for(&self, hint: Option<&HintId>, text: &str) -> Option<&str> {
        hint.and_then(|h| self.hint(h))
            .and_then(|h| h.emojis.get(text))
            .or_else(|| self.word_emojis.get(text))
            .map(String::as_str)
    }
}

fn build_level(li: usize, raw: RawLevel, hints: &HintDictionary) -> Result<LevelDef> {
    let id = LevelId::at(li);
    if raw.sections.is_empty() {
        return Err(WordlinkError::Content(format!("level {id} has no sections")));
    }

    let mut sections = Vec::with_capacity(raw.sections.len());
    let mut words = HashMap::new();

    for (si, raw_section) in raw.sections.iter().enumerate() {
        let section_id = SectionId::at(li, si);

        let mut slots = Vec::with_capacity(raw_section.slots.len());
        for (ki, hint) in raw_section.slots.iter().enumerate() {
            if !hints.contains_key(hint) {
                return Err(WordlinkError::Content(format!(
                    "slot {} references unknown hint \"{hint}\"",
                    SlotId::at(li, si, ki)
                )));
            }
            slots.push(SlotDef {
                id: SlotId::at(li, si, ki),
                hint: hint.clone(),
            });
        }

        let mut section_words = Vec::with_capacity(raw_section.words.len());
        for (wi, raw_word) in raw_section.words.iter().enumerate() {
            let word = raw_word.resolve(li, si, wi);
            if words.insert(word.id.clone(), (si, wi)).is_some() {
                return Err(WordlinkError::Content(format!(
                    "duplicate word id {} in level {id}",
                    word.id
                )));
            }
            section_words.push(word);
        }

        sections.push(SectionDef {
            id: section_id,
            name: raw_section
                .name
                .clone()
                .unwrap_or_else(|| format!("Section {}", si + 1)),
            slots,
            words: section_words,
            is_unlocked: li == 0 && si == 0,
        });
    }

    let level = LevelDef {
        id,
        name: raw.name.unwrap_or_else(|| format!("Level {}", li + 1)),
        sections,
        words,
    };
    if level.slot_count() > level.word_count() {
        warn!(
            level = %level.id,
            slots = level.slot_count(),
            words = level.word_count(),
            "Level has more slots than words and can never be completed"
        );
    }
    Ok(level)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two levels: a two-section colour level and a one-section follow-up.
    pub(crate) fn two_level_json() -> &'static str {
        r#"{
            "levels": [
                { "name": "Colours", "sections": [
                    { "slots": ["Red"], "words": ["Apple", "Sky"] },
                    { "slots": ["Blue"], "words": [] }
                ]},
                { "sections": [
                    { "slots": ["Red", "Blue"], "words": ["Strawberry", "Sea"] }
                ]}
            ],
            "hints": {
                "Red": { "accepts": ["Apple", "Strawberry"], "emojis": { "Apple": "🍎" } },
                "Blue": { "accepts": ["Sky", "Sea"] }
            },
            "wordEmojis": { "Apple": "🍏", "Sea": "🌊" }
        }"#
    }

    #[test]
    fn assigns_positional_ids_and_defaults() {
        let graph = ContentGraph::from_json(two_level_json()).expect("load");
        assert_eq!(graph.levels.len(), 2);

        let level = &graph.levels[0];
        assert_eq!(level.id.as_str(), "level_1");
        assert_eq!(level.name, "Colours");
        assert_eq!(level.sections[1].id.as_str(), "section_1_2");
        assert_eq!(level.sections[1].slots[0].id.as_str(), "slot_1_2_1");
        assert_eq!(level.sections[0].name, "Section 1");
        assert_eq!(graph.levels[1].name, "Level 2");
    }

    #[test]
    fn only_first_section_of_first_level_is_unlocked() {
        let graph = ContentGraph::from_json(two_level_json()).expect("load");
        assert!(graph.levels[0].sections[0].is_unlocked);
        assert!(!graph.levels[0].sections[1].is_unlocked);
        assert!(!graph.levels[1].sections[0].is_unlocked);
    }

    #[test]
    fn words_are_indexed_by_id() {
        let graph = ContentGraph::from_json(two_level_json()).expect("load");
        let level = &graph.levels[0];
        let sky = level.sections[0].words[1].clone();
        assert_eq!(level.word(&sky.id), Some(&sky));
        assert_eq!(level.word_count(), 2);
        assert_eq!(level.slot_count(), 2);
    }

    #[test]
    fn ids_are_stable_across_loads() {
        let a = ContentGraph::from_json(two_level_json()).expect("load");
        let b = ContentGraph::from_json(two_level_json()).expect("load");
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_hint_fails_loudly() {
        let err = ContentGraph::from_json(
            r#"{ "levels": [{ "sections": [{ "slots": ["Green"], "words": ["Kiwi"] }] }], "hints": {} }"#,
        )
        .expect_err("should fail");
        assert!(matches!(err, WordlinkError::Content(msg) if msg.contains("Green")));
    }

    #[test]
    fn duplicate_word_id_fails_loudly() {
        let err = ContentGraph::from_json(
            r#"{
                "levels": [{ "sections": [
                    { "slots": [], "words": [{ "id": "w1", "text": "Kiwi" }] },
                    { "slots": [], "words": [{ "id": "w1", "text": "Dog" }] }
                ]}],
                "hints": {}
            }"#,
        )
        .expect_err("should fail");
        assert!(matches!(err, WordlinkError::Content(msg) if msg.contains("w1")));
    }

    #[test]
    fn level_without_sections_is_rejected() {
        let err = ContentGraph::from_json(r#"{ "levels": [{ "sections": [] }] }"#)
            .expect_err("should fail");
        assert!(matches!(err, WordlinkError::Content(_)));
    }

    #[test]
    fn malformed_json_is_a_content_error() {
        let err = ContentGraph::from_json("{ not json").expect_err("should fail");
        assert!(matches!(err, WordlinkError::Content(_)));
    }

    #[test]
    fn emoji_prefers_hint_specific_decoration() {
        let graph = ContentGraph::from_json(two_level_json()).expect("load");
        let red = HintId::from("Red");
        assert_eq!(graph.emoji_for(Some(&red), "Apple"), Some("🍎"));
        assert_eq!(graph.emoji_for(None, "Apple"), Some("🍏"));
        assert_eq!(graph.emoji_for(Some(&red), "Sea"), Some("🌊"));
        assert_eq!(graph.emoji_for(None, "Kiwi"), None);
    }

    #[test]
    fn level_with_more_slots_than_words_still_loads() {
        let json = r#"{
            "levels": [{ "sections": [{ "slots": ["Red", "Red"], "words": ["Apple"] }] }],
            "hints": { "Red": { "accepts": ["Apple"] } }
        }"#;
        let graph = ContentGraph::from_json(json).expect("load");
        assert_eq!(graph.levels[0].slot_count(), 2);
        assert_eq!(graph.levels[0].word_count(), 1);
    }

    #[test]
    fn next_level_follows_content_order() {
        let graph = ContentGraph::from_json(two_level_json()).expect("load");
        let first = graph.levels[0].id.clone();
        let second = graph.levels[1].id.clone();
        assert_eq!(graph.next_level(&first).map(|l| &l.id), Some(&second));
        assert!(graph.next_level(&second).is_none());
    }
}
