//! Authored content as it appears on disk, and the id-baking build step.
//!
//! Designers write words as plain strings. Before shipping, [`bake_word_ids`]
//! replaces each with a `{ "id", "text" }` object. Ids are UUID v5 over the
//! word's position and text, so re-running the step on unchanged content
//! produces the same ids and saved progress keeps resolving.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{HintDictionary, HintId, Word, WordId};

/// Namespace for word-id derivation. Changing it orphans every save.
const WORD_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c9e_52d4_4b8a_9e07_d2c1_7f40_b3a5);

/// The full authored content document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContent {
    /// Levels in play order.
    pub levels: Vec<RawLevel>,
    /// Global hint dictionary.
    #[serde(default)]
    pub hints: HintDictionary,
    /// Word text → decoration, passed through untouched.
    #[serde(default)]
    pub word_emojis: BTreeMap<String, String>,
}

/// One authored level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLevel {
    /// Display name; defaults to "Level N".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Sections in unlock order.
    pub sections: Vec<RawSection>,
}

/// One authored section: its slots (hint references) and the words it introduces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSection {
    /// Display name; defaults to "Section N".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hint ids, one per slot, in display order.
    pub slots: Vec<HintId>,
    /// Words introduced when this section unlocks.
    #[serde(default)]
    pub words: Vec<RawWord>,
}

/// A word as authored: either plain text or already carrying a baked id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawWord {
    /// Plain text, id not yet assigned.
    Text(String),
    /// Text with a baked id.
    Baked(Word),
}

impl RawWord {
    /// Resolve to a [`Word`], deriving the positional id for plain text.
    #[must_use]
    pub fn resolve(&self, level: usize, section: usize, index: usize) -> Word {
        match self {
            Self::Text(text) => Word {
                id: derive_word_id(level, section, index, text),
                text: text.clone(),
            },
            Self::Baked(word) => word.clone(),
        }
    }
}

/// Deterministic id for the word at `index` of section `section` in level `level`.
#[must_use]
pub fn derive_word_id(level: usize, section: usize, index: usize, text: &str) -> WordId {
    let name = format!("{level}/{section}/{index}/{text}");
    WordId(Uuid::new_v5(&WORD_ID_NAMESPACE, name.as_bytes()).to_string())
}

/// Replace every plain-text word with a baked `{id, text}` entry.
///
/// Already-baked words keep their ids. Returns how many words were baked.
pub fn bake_word_ids(content: &mut RawContent) -> usize {
    let mut baked = 0;
    for (li, level) in content.levels.iter_mut().enumerate() {
        for (si, section) in level.sections.iter_mut().enumerate() {
            for (wi, word) in section.words.iter_mut().enumerate() {
                if let RawWord::Text(_) = word {
                    *word = RawWord::Baked(word.resolve(li, si, wi));
                    baked += 1;
                }
            }
        }
    }
    baked
}
