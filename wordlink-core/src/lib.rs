//! # Wordlink Core Library
//!
//! Progression engine for word-association puzzles: players fill slots, each
//! showing a hint, with words drawn from an inventory, and correct sections
//! unlock the next ones.
//!
//! - **Content**: authored levels turned into a validated graph with stable ids
//! - **Progress**: where every word sits, which sections are open, solutions found
//! - **Reconcile**: saved progress merged onto possibly updated content
//! - **Placement**: moving one word, with displacement and swap rules
//! - **Cascade**: sections unlocking in order as earlier ones become correct
//! - **Solution**: distinct full arrangements, counted once each
//! - **Engine**: the command surface tying it together, with persistence
//!
//! ## Word Location Invariant
//!
//! After every engine command, each word of a loaded level is held by exactly
//! one of: the level inventory, one section's held-back words, or one slot.

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cascade;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod placement;
pub mod progress;
pub mod reconcile;
pub mod solution;
pub mod types;

pub use cascade::CascadeReport;
pub use config::WordlinkConfig;
pub use content::ContentGraph;
pub use engine::{GameEngine, LevelSummary, PlaceOutcome};
pub use error::WordlinkError;
pub use placement::{Placement, SlotRef, Target};
pub use progress::{LevelState, ProgressStore};
pub use types::*;
