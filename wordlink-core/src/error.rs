//! Error types for the wordlink core library.

use thiserror::Error;

use crate::types::{LevelId, SectionId, SlotId, WordId};

/// Top-level error type for all wordlink operations.
#[derive(Error, Debug)]
pub enum WordlinkError {
    /// Authored content is malformed or internally inconsistent.
    #[error("Invalid content: {0}")]
    Content(String),

    /// A level id that does not exist in the loaded content graph.
    #[error("Unknown level: {0}")]
    UnknownLevel(LevelId),

    /// A level that exists in content but has not been loaded yet.
    #[error("Level not loaded: {0}")]
    LevelNotLoaded(LevelId),

    /// A section id that does not belong to the given level.
    #[error("Unknown section {section} in level {level}")]
    UnknownSection {
        /// Level that was searched.
        level: LevelId,
        /// The offending section id.
        section: SectionId,
    },

    /// A slot id that does not belong to the given section.
    #[error("Unknown slot {slot} in section {section}")]
    UnknownSlot {
        /// Section that was searched.
        section: SectionId,
        /// The offending slot id.
        slot: SlotId,
    },

    /// A word id that is not part of the given level.
    #[error("Unknown word {word} in level {level}")]
    UnknownWord {
        /// Level that was searched.
        level: LevelId,
        /// The offending word id.
        word: WordId,
    },

    /// A placement targeted a slot in a section the player cannot see yet.
    #[error("Section {section} of level {level} is locked")]
    SectionLocked {
        /// Level containing the section.
        level: LevelId,
        /// The locked section.
        section: SectionId,
    },

    /// The word could not be found in exactly one location.
    #[error("Word {word} is held in {count} locations (expected exactly one)")]
    WordMisplaced {
        /// The word whose location is ambiguous.
        word: WordId,
        /// How many locations currently hold it.
        count: usize,
    },

    /// Persisted progress was written by an incompatible schema.
    #[error("Unsupported progress schema version {found} (expected {expected})")]
    SchemaVersion {
        /// Version found in the document.
        found: u32,
        /// Version this build understands.
        expected: u32,
    },

    /// Persisted bytes failed an integrity check.
    #[error("Corrupt save data: {0}")]
    Corrupt(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WordlinkError {
    /// Whether the error comes from a bad id supplied by the caller.
    ///
    /// These are rejected without touching state and should not be retried.
    #[must_use]
    pub fn is_invalid_reference(&self) -> bool {
        matches!(
            self,
            Self::UnknownLevel(_)
                | Self::LevelNotLoaded(_)
                | Self::UnknownSection { .. }
                | Self::UnknownSlot { .. }
                | Self::UnknownWord { .. }
                | Self::SectionLocked { .. }
        )
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, WordlinkError>;
