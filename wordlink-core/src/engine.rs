//! The game engine: the only owner of mutable progress.
//!
//! The UI issues commands (load a level, place a word, reset) and reads
//! snapshots back. Every command runs to completion synchronously:
//!
//! ```text
//! place_word → placement::apply → cascade::run → solution::track → save
//! ```
//!
//! Saving is best-effort. A failed write never rolls back in-memory state;
//! the error is kept in [`GameEngine::last_save_error`] and the next
//! successful save (or [`GameEngine::flush`]) writes the full snapshot again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cascade::{self, CascadeReport};
use crate::config::{BackendKind, PersistenceConfig, WordlinkConfig};
use crate::content::ContentGraph;
use crate::error::{Result, WordlinkError};
use crate::persistence::{MemoryBackend, ProgressBackend, open_backend};
use crate::placement::{self, Placement, PlacementEffect};
use crate::progress::{LevelRecord, LevelState, ProgressDocument, ProgressStore};
use crate::reconcile::{bootstrap, reconcile};
use crate::types::{LevelId, TutorialFlags, TutorialKind};

/// Result of a successful [`GameEngine::place_word`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceOutcome {
    /// What the placement itself did.
    pub effect: PlacementEffect,
    /// What the follow-up cascade changed.
    pub cascade: CascadeReport,
}

/// One row of a level selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelSummary {
    /// Level id.
    pub id: LevelId,
    /// Display name.
    pub name: String,
    /// Whether the level can be entered.
    pub unlocked: bool,
    /// Whether the level has ever been completed.
    pub completed: bool,
    /// Whether the current arrangement solves it.
    pub currently_complete: bool,
    /// Number of distinct solutions found.
    pub solutions: usize,
}

/// Progression engine for one player profile.
pub struct GameEngine {
    content: Arc<ContentGraph>,
    config: WordlinkConfig,
    store: ProgressStore,
    /// Records read at startup for levels not loaded yet.
    saved: BTreeMap<LevelId, LevelRecord>,
    backend: Box<dyn ProgressBackend>,
    dirty: bool,
    last_save_error: Option<String>,
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("levels", &self.content.levels.len())
            .field("loaded", &self.store.levels.len())
            .field("dirty", &self.dirty)
            .field("last_save_error", &self.last_save_error)
            .finish_non_exhaustive()
    }
}

impl GameEngine {
    /// Create an engine over `content`, restoring whatever `backend` holds.
    ///
    /// Unreadable or incompatible saves are logged and ignored; the engine
    /// then starts from a fresh bootstrap.
    #[must_use]
    pub fn open(
        content: Arc<ContentGraph>,
        backend: Box<dyn ProgressBackend>,
        config: WordlinkConfig,
    ) -> Self {
        let document = read_document(backend.as_ref());
        info!(
            levels = content.levels.len(),
            saved_levels = document.levels.len(),
            sequential = config.progression.sequential_levels,
            "Game engine opened"
        );
        Self {
            content,
            config,
            store: ProgressStore {
                levels: BTreeMap::new(),
                tutorials: document.tutorials,
            },
            saved: document.levels,
            backend,
            dirty: false,
            last_save_error: None,
        }
    }

    /// Load content and open the backend named by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::Content`] for invalid content, or a storage
    /// error if the backend cannot be opened.
    pub fn from_config(config: &WordlinkConfig) -> Result<Self> {
        let content = ContentGraph::from_file(&config.content.path)?;
        let backend = open_backend(&config.persistence)?;
        Ok(Self::open(Arc::new(content), backend, config.clone()))
    }

    /// An engine that keeps progress in memory only.
    #[must_use]
    pub fn in_memory(content: ContentGraph) -> Self {
        let config = WordlinkConfig {
            persistence: PersistenceConfig {
                backend: BackendKind::Memory,
                ..PersistenceConfig::default()
            },
            ..WordlinkConfig::default()
        };
        Self::open(Arc::new(content), Box::new(MemoryBackend::new()), config)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Bring a level into the store, reconciling any saved record against
    /// the current content and running the cascade once.
    ///
    /// Loading an already loaded level returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::UnknownLevel`] if `id` is not in the content.
    pub fn load_level(&mut self, id: &LevelId) -> Result<&LevelState> {
        let index = self.level_index(id)?;
        if let Some(mut report) = self.ensure_loaded(index) {
            if report.first_completion {
                report.unlocked_level = self.unlock_next_level(index);
            }
            if !report.is_empty() {
                self.persist();
            }
        }
        self.store
            .levels
            .get(id)
            .ok_or_else(|| WordlinkError::LevelNotLoaded(id.clone()))
    }

    /// Move one word and re-evaluate the level.
    ///
    /// # Errors
    ///
    /// Returns an invalid-reference error without changing anything if the
    /// level is unknown or not loaded, the level is still locked, or the
    /// placement names an unknown section, slot or word.
    pub fn place_word(&mut self, placement: &Placement) -> Result<PlaceOutcome> {
        let index = self.level_index(&placement.level)?;
        let content = Arc::clone(&self.content);
        let def = &content.levels[index];
        let allow_locked = self.config.progression.allow_locked_targets;

        let state = self
            .store
            .levels
            .get_mut(&def.id)
            .ok_or_else(|| WordlinkError::LevelNotLoaded(def.id.clone()))?;
        if !allow_locked && !state.is_unlocked() {
            return Err(WordlinkError::SectionLocked {
                level: def.id.clone(),
                section: def.sections[0].id.clone(),
            });
        }

        let effect = placement::apply(def, state, placement, allow_locked)?;
        let mut report = cascade::run(&content.hints, def, state);
        if report.first_completion {
            report.unlocked_level = self.unlock_next_level(index);
        }

        if effect.changed || !report.is_empty() {
            self.persist();
        }
        Ok(PlaceOutcome {
            effect,
            cascade: report,
        })
    }

    /// Re-run the cascade and solution tracker without moving anything.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::UnknownLevel`] or [`WordlinkError::LevelNotLoaded`].
    pub fn check_unlocks(&mut self, id: &LevelId) -> Result<CascadeReport> {
        let index = self.level_index(id)?;
        let content = Arc::clone(&self.content);
        let def = &content.levels[index];
        let state = self
            .store
            .levels
            .get_mut(id)
            .ok_or_else(|| WordlinkError::LevelNotLoaded(id.clone()))?;

        let mut report = cascade::run(&content.hints, def, state);
        if report.first_completion {
            report.unlocked_level = self.unlock_next_level(index);
        }
        if !report.is_empty() {
            self.persist();
        }
        Ok(report)
    }

    /// Put a level back into its bootstrap arrangement.
    ///
    /// Found solutions, the completed flag and access to the level survive.
    ///
    /// # Errors
    ///
    /// Returns [`WordlinkError::UnknownLevel`] if `id` is not in the content.
    pub fn reset_level(&mut self, id: &LevelId) -> Result<()> {
        let index = self.level_index(id)?;
        self.ensure_loaded(index);
        let content = Arc::clone(&self.content);
        let def = &content.levels[index];

        let Some(old) = self.store.levels.remove(id) else {
            return Err(WordlinkError::LevelNotLoaded(id.clone()));
        };
        let mut state = bootstrap(def, old.is_unlocked() || self.bootstrap_unlocked(index));
        state.solutions = old.solutions;
        state.completed = old.completed;
        cascade::run(&content.hints, def, &mut state);
        self.store.levels.insert(id.clone(), state);

        info!(level = %id, "Level reset");
        self.persist();
        Ok(())
    }

    /// Forget every level and tutorial flag.
    ///
    /// Backends that support it take a rotating backup first. Levels must be
    /// loaded again afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup fails; nothing is cleared in that case.
    pub fn reset_all(&mut self) -> Result<()> {
        self.backend.backup()?;

        self.store = ProgressStore::new();
        self.saved.clear();
        match self.backend.clear() {
            Ok(()) => {
                self.dirty = false;
                self.last_save_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to clear saved progress");
                self.dirty = true;
                self.last_save_error = Some(e.to_string());
            }
        }
        info!("All progress reset");
        Ok(())
    }

    /// Mark a tutorial as seen. Returns `true` if it was not seen before.
    pub fn complete_tutorial(&mut self, kind: TutorialKind) -> bool {
        let changed = self.store.tutorials.complete(kind);
        if changed {
            debug!(tutorial = ?kind, "Tutorial completed");
            self.persist();
        }
        changed
    }

    /// Write pending changes now.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the write fails; the engine stays dirty.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        match self.write_snapshot() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.last_save_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// A loaded level.
    #[must_use]
    pub fn level(&self, id: &LevelId) -> Option<&LevelState> {
        self.store.level(id)
    }

    /// Every loaded level plus tutorial flags.
    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Tutorial flags.
    #[must_use]
    pub fn tutorials(&self) -> TutorialFlags {
        self.store.tutorials
    }

    /// The content graph.
    #[must_use]
    pub fn content(&self) -> &Arc<ContentGraph> {
        &self.content
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &WordlinkConfig {
        &self.config
    }

    /// Message of the last failed save, cleared by the next successful one.
    #[must_use]
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    /// Whether there are changes not yet written.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// One summary per content level, loaded or not.
    #[must_use]
    pub fn level_summaries(&self) -> Vec<LevelSummary> {
        self.content
            .levels
            .iter()
            .enumerate()
            .map(|(index, def)| {
                let mut summary = LevelSummary {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    unlocked: self.bootstrap_unlocked(index),
                    completed: false,
                    currently_complete: false,
                    solutions: 0,
                };
                if let Some(state) = self.store.levels.get(&def.id) {
                    summary.unlocked = state.is_unlocked();
                    summary.completed = state.completed;
                    summary.currently_complete = state.currently_complete;
                    summary.solutions = state.solutions.len();
                } else if let Some(record) = self.saved.get(&def.id) {
                    let distinct: BTreeSet<&String> = record.solutions.iter().collect();
                    summary.unlocked |= record
                        .sections
                        .get(&def.sections[0].id)
                        .is_some_and(|s| s.is_unlocked);
                    summary.completed = record.completed || !distinct.is_empty();
                    summary.solutions = distinct.len();
                }
                summary
            })
            .collect()
    }

    /// Snapshot of everything that would be saved right now.
    ///
    /// Saved records of levels not loaded this session are carried over;
    /// records of levels the content no longer has are dropped.
    #[must_use]
    pub fn to_document(&self) -> ProgressDocument {
        let mut document = self.store.to_document();
        for (id, record) in &self.saved {
            if self.content.level(id).is_some() && !document.levels.contains_key(id) {
                document.levels.insert(id.clone(), record.clone());
            }
        }
        document
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn level_index(&self, id: &LevelId) -> Result<usize> {
        self.content
            .level(id)
            .map(|(index, _)| index)
            .ok_or_else(|| WordlinkError::UnknownLevel(id.clone()))
    }

    /// Whether level `index` opens on its own, ignoring any saved flag.
    ///
    /// With sequential levels, only content marked unlocked or a completed
    /// predecessor opens a level.
    fn bootstrap_unlocked(&self, index: usize) -> bool {
        if !self.config.progression.sequential_levels
            || self.content.levels[index].sections[0].is_unlocked
        {
            return true;
        }
        let Some(previous) = index.checked_sub(1).map(|i| &self.content.levels[i].id) else {
            return true;
        };
        match self.store.levels.get(previous) {
            Some(state) => state.completed,
            None => self
                .saved
                .get(previous)
                .is_some_and(|r| r.completed || !r.solutions.is_empty()),
        }
    }

    /// Reconcile level `index` into the store if it is not there yet.
    fn ensure_loaded(&mut self, index: usize) -> Option<CascadeReport> {
        let content = Arc::clone(&self.content);
        let def = &content.levels[index];
        if self.store.levels.contains_key(&def.id) {
            return None;
        }

        let first_unlocked = self.bootstrap_unlocked(index);
        let mut state = reconcile(def, self.saved.get(&def.id), first_unlocked);
        let report = cascade::run(&content.hints, def, &mut state);
        debug!(
            level = %def.id,
            unlocked = state.is_unlocked(),
            from_save = self.saved.contains_key(&def.id),
            "Level loaded"
        );
        self.store.levels.insert(def.id.clone(), state);
        Some(report)
    }

    /// Open the level after `index` if sequential gating kept it shut.
    fn unlock_next_level(&mut self, index: usize) -> Option<LevelId> {
        if !self.config.progression.sequential_levels {
            return None;
        }
        let content = Arc::clone(&self.content);
        let next = content.next_level(&content.levels[index].id)?;

        let was_unlocked = match self.store.levels.get(&next.id) {
            Some(state) => state.is_unlocked(),
            None => self
                .saved
                .get(&next.id)
                .and_then(|r| r.sections.get(&next.sections[0].id))
                .is_some_and(|s| s.is_unlocked),
        };
        if was_unlocked {
            return None;
        }

        match self.store.levels.get_mut(&next.id) {
            Some(state) => {
                cascade::unlock_section(next, state, 0);
            }
            None => {
                self.ensure_loaded(index + 1);
            }
        }
        info!(level = %next.id, "Level unlocked");
        Some(next.id.clone())
    }

    fn persist(&mut self) {
        self.dirty = true;
        if self.config.persistence.autosave {
            if let Err(e) = self.write_snapshot() {
                warn!(error = %e, "Failed to save progress; keeping in-memory state");
                self.last_save_error = Some(e.to_string());
            }
        }
    }

    fn write_snapshot(&mut self) -> Result<()> {
        let start = Instant::now();
        let bytes = self.to_document().encode()?;
        self.backend.write(&bytes)?;
        self.dirty = false;
        self.last_save_error = None;
        debug!(
            bytes = bytes.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Progress saved"
        );
        Ok(())
    }
}

/// Read and decode the saved document, falling back to an empty one.
fn read_document(backend: &dyn ProgressBackend) -> ProgressDocument {
    let bytes = match backend.read() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return ProgressDocument::default(),
        Err(e) => {
            warn!(error = %e, "Could not read saved progress; starting fresh");
            return ProgressDocument::default();
        }
    };
    match ProgressDocument::decode(&bytes) {
        Ok(document) => document,
        Err(e) => {
            warn!(error = %e, "Saved progress is unusable; starting fresh");
            ProgressDocument::default()
        }
    }
}
