//! # Trajectory execution module
//!
//! Trajectory execution owns the sequence of longitudinal manoeuvres making
//! up a trajectory and steps the active one every control cycle.
//!
//! When a sequence is loaded each manoeuvre is planned in turn, starting at
//! the end distance of the one before it, so the sequence covers a continuous
//! interval of the route. On each cycle the vehicle's distance along the route
//! is compared with the active manoeuvre's end distance, once it has been
//! passed the manoeuvre is retired and the next one becomes active.
//!
//! Any error from a manoeuvre aborts the whole sequence. No fallback command
//! is issued, it's up to the owner to replan or bring the vehicle to a safe
//! stop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::Params;
pub use state::*;
use crate::mnvr::MnvrError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during trajectory execution.
#[derive(Debug, thiserror::Error)]
pub enum TrajExecError {
    /// A sequence is already loaded. This error occurs when attempting to start a new sequence
    /// before the current one has finished.
    #[error("Attempted to load a manoeuvre sequence while one is already loaded")]
    SequenceAlreadyLoaded,

    /// Attempted to load a sequence without any manoeuvres in it.
    #[error("Attempted to load empty manoeuvre sequence")]
    EmptySequence,

    /// One of the manoeuvres in the sequence could not be planned. The sequence is not loaded.
    #[error("Could not plan manoeuvre {index} of the sequence: {source}")]
    PlanFailed {
        index: usize,
        #[source]
        source: MnvrError,
    },

    /// The active manoeuvre failed to execute. The sequence has been aborted.
    #[error("Manoeuvre {index} failed during execution, sequence aborted: {source}")]
    MnvrFailed {
        index: usize,
        #[source]
        source: MnvrError,
    },

    /// The executor is in the executing mode but there is no sequence loaded.
    #[error("No manoeuvre sequence has been set")]
    NoSequence,
}
