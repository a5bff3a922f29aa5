//! Trajectory execution parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory execution
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// If true the executable sleeps to keep the cycle period in real time,
    /// otherwise cycles are run back to back.
    pub realtime: bool,

    /// Maximum number of cycles to run before giving up on the sequence.
    pub max_num_cycles: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.1,
            realtime: false,
            max_num_cycles: 10_000,
        }
    }
}
