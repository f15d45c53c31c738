//! Solution Tracker: counting distinct full arrangements.
//!
//! A level can usually be solved more than one way. Each time every slot is
//! simultaneously correct the arrangement is serialized into a signature
//! (slot texts in section/slot order, comma-joined) and appended to the
//! level's history if it is new. History only grows.

use tracing::info;

use crate::cascade::level_complete;
use crate::content::LevelDef;
use crate::progress::LevelState;
use crate::types::HintDictionary;

/// Separator between slot texts in a signature.
pub const SIGNATURE_SEPARATOR: &str = ",";

/// Result of one tracking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionOutcome {
    /// Whether the level is currently complete.
    pub complete: bool,
    /// The signature, if it was recorded for the first time.
    pub new_signature: Option<String>,
    /// Whether this pass completed the level for the first time ever.
    pub first_completion: bool,
}

/// Signature of the current arrangement, or `None` if any slot is empty.
#[must_use]
pub fn signature(state: &LevelState) -> Option<String> {
    let texts: Option<Vec<&str>> = state.slot_texts().collect();
    texts.map(|t| t.join(SIGNATURE_SEPARATOR))
}

/// Record the current arrangement if it completes the level.
pub fn track(hints: &HintDictionary, def: &LevelDef, state: &mut LevelState) -> SolutionOutcome {
    if !level_complete(hints, def, state) {
        state.currently_complete = false;
        return SolutionOutcome::default();
    }
    state.currently_complete = true;

    let mut outcome = SolutionOutcome {
        complete: true,
        ..SolutionOutcome::default()
    };

    let novel = signature(state).filter(|sig| !state.solutions.contains(sig));
    if let Some(sig) = novel {
        state.solutions.push(sig.clone());
        info!(
            level = %state.id,
            solution = %sig,
            found = state.solutions.len(),
            "New solution found"
        );
        outcome.new_signature = Some(sig);
    }

    if !state.completed {
        state.completed = true;
        outcome.first_completion = true;
    }
    outcome
}
