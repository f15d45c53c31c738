//! Core type definitions shared by every part of the engine.
//!
//! Identifiers are string newtypes: level, section and slot ids are derived
//! from content position (`level_1`, `section_1_2`, `slot_1_2_3`), word ids
//! are baked into the content once and never regenerated.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Borrow the raw id string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a level (`level_<n>`).
    LevelId
);
string_id!(
    /// Identifier of a section (`section_<level>_<n>`).
    SectionId
);
string_id!(
    /// Identifier of a slot (`slot_<level>_<section>_<n>`).
    SlotId
);
string_id!(
    /// Stable identifier of one word occurrence in the content.
    WordId
);
string_id!(
    /// Key into the hint dictionary; also the hint's display text.
    HintId
);

impl LevelId {
    /// Id of the level at `index` (0-based) in content order.
    #[must_use]
    pub fn at(index: usize) -> Self {
        Self(format!("level_{}", index + 1))
    }
}

impl SectionId {
    /// Id of section `section` (0-based) inside level `level` (0-based).
    #[must_use]
    pub fn at(level: usize, section: usize) -> Self {
        Self(format!("section_{}_{}", level + 1, section + 1))
    }
}

impl SlotId {
    /// Id of slot `slot` inside section `section` of level `level`, all 0-based.
    #[must_use]
    pub fn at(level: usize, section: usize, slot: usize) -> Self {
        Self(format!("slot_{}_{}_{}", level + 1, section + 1, slot + 1))
    }
}

// ---------------------------------------------------------------------------
// Words & Hints
// ---------------------------------------------------------------------------

/// An immutable word tile. Only its location ever changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    /// Stable id of this occurrence.
    pub id: WordId,
    /// Display text, also the key matched against hints.
    pub text: String,
}

impl Word {
    /// Create a word from an id and its text.
    #[must_use]
    pub fn new(id: impl Into<WordId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.text, self.id)
    }
}

/// A hint and the word texts it accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    /// Word texts considered correct for this hint.
    pub accepts: Vec<String>,
    /// Optional per-hint decorations, keyed by word text.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub emojis: BTreeMap<String, String>,
}

impl Hint {
    /// Build a hint accepting the given texts.
    #[must_use]
    pub fn accepting<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepts: texts.into_iter().map(Into::into).collect(),
            emojis: BTreeMap::new(),
        }
    }

    /// Whether `text` is an accepted answer.
    #[must_use]
    pub fn accepts(&self, text: &str) -> bool {
        self.accepts.iter().any(|a| a == text)
    }
}

/// Global hint dictionary shared by every level.
pub type HintDictionary = BTreeMap<HintId, Hint>;

// ---------------------------------------------------------------------------
// Tutorials
// ---------------------------------------------------------------------------

/// One-time tutorial overlays whose completion is remembered across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TutorialKind {
    /// The first-launch walkthrough.
    Main,
    /// Shown when a second section first unlocks.
    Section,
    /// Explains how hints accept several words.
    Hint,
}

/// Process-wide tutorial completion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorialFlags {
    /// Main tutorial finished.
    #[serde(default)]
    pub main_completed: bool,
    /// Section tutorial finished.
    #[serde(default)]
    pub section_completed: bool,
    /// Hint tutorial finished.
    #[serde(default)]
    pub hint_completed: bool,
}

impl TutorialFlags {
    /// Mark `kind` as completed. Returns `true` if the flag changed.
    pub fn complete(&mut self, kind: TutorialKind) -> bool {
        let flag = match kind {
            TutorialKind::Main => &mut self.main_completed,
            TutorialKind::Section => &mut self.section_completed,
            TutorialKind::Hint => &mut self.hint_completed,
        };
        let changed = !*flag;
        *flag = true;
        changed
    }

    /// Whether `kind` has been completed.
    #[must_use]
    pub fn is_completed(&self, kind: TutorialKind) -> bool {
        match kind {
            TutorialKind::Main => self.main_completed,
            TutorialKind::Section => self.section_completed,
            TutorialKind::Hint => self.hint_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_ids_are_one_based() {
        assert_eq!(LevelId::at(0).as_str(), "level_1");
        assert_eq!(SectionId::at(0, 1).as_str(), "section_1_2");
        assert_eq!(SlotId::at(2, 0, 4).as_str(), "slot_3_1_5");
    }

    #[test]
    fn hint_matches_exact_text() {
        let hint = Hint::accepting(["Apple", "Strawberry"]);
        assert!(hint.accepts("Apple"));
        assert!(!hint.accepts("apple"));
        assert!(!hint.accepts("Kiwi"));
    }

    #[test]
    fn tutorial_completion_reports_change_once() {
        let mut flags = TutorialFlags::default();
        assert!(flags.complete(TutorialKind::Hint));
        assert!(!flags.complete(TutorialKind::Hint));
        assert!(flags.is_completed(TutorialKind::Hint));
        assert!(!flags.is_completed(TutorialKind::Main));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let json = serde_json::to_string(&WordId::from("w1")).expect("serialize");
        assert_eq!(json, "\"w1\"");
    }
}
