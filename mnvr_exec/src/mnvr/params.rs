//! Manoeuvre parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::AccParams;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default fraction of the maximum acceleration used while holding a steady
/// speed.
pub const DEFAULT_STEADY_SPEED_ACCEL_FACTOR: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters shared by all manoeuvres
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// ACC override parameters
    pub acc: AccParams,

    /// Fraction of the manoeuvre's maximum acceleration that a steady speed
    /// manoeuvre uses as its acceleration ceiling.
    ///
    /// Only slight corrections are expected while holding a speed, so a
    /// milder ceiling than the vehicle's limit is used. Must be in (0, 1].
    pub steady_speed_accel_factor: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            acc: AccParams::default(),
            steady_speed_accel_factor: DEFAULT_STEADY_SPEED_ACCEL_FACTOR,
        }
    }
}
