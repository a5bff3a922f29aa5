//! # Longitudinal manoeuvre module
//!
//! A manoeuvre is a bounded segment of longitudinal vehicle behaviour. It is
//! valid over an interval of distance along the route, `[start, end]`, and
//! inside that interval it drives the vehicle towards a target speed.
//!
//! Every manoeuvre follows the same lifecycle:
//!
//! 1. Construction - the manoeuvre is unplanned and must be configured using
//!    the variant's setters (target speed, maximum acceleration, etc.).
//! 2. `plan` - binds the inputs and command sink collaborators, records the
//!    start distance and computes the end distance.
//! 3. `execute_time_step` - called once per control cycle while the vehicle
//!    is inside the manoeuvre's bounds. Each call issues exactly one
//!    [`SpeedCmd`] to the sink.
//!
//! A step executed outside of the bounds is an error and issues no command.
//! The manoeuvre never clamps, retries or substitutes a command, the owner
//! must abort or replan.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod acc;
mod base;
mod params;
mod speed_change;
mod steady_speed;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use acc::*;
pub use base::*;
pub use params::Params;
pub use speed_change::*;
pub use steady_speed::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command issued to the vehicle's longitudinal controller.
///
/// The controller shall track `speed_ms` without exceeding `max_accel_mss` in
/// magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedCmd {
    /// Commanded speed.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Magnitude of the acceleration ceiling to apply while tracking the
    /// commanded speed.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Source of the vehicle state used by the manoeuvres.
///
/// All functions are pure reads.
pub trait MnvrInputs {
    /// Distance travelled along the planned route since its start.
    ///
    /// Units: meters
    fn dist_from_route_start_m(&self) -> f64;

    /// Current speed of the vehicle.
    ///
    /// Units: meters/second
    fn current_speed_ms(&self) -> f64;

    /// Gap to the vehicle in front, or `None` if no vehicle is detected.
    ///
    /// Units: meters
    fn front_vehicle_dist_m(&self) -> Option<f64> {
        None
    }

    /// Speed of the vehicle in front, or `None` if no vehicle is detected.
    ///
    /// Units: meters/second
    fn front_vehicle_speed_ms(&self) -> Option<f64> {
        None
    }
}

/// Receiver of the speed commands issued by manoeuvres.
///
/// The sink is shared by every manoeuvre of a trajectory, so it is only ever
/// borrowed immutably. Implementations needing to record the command shall
/// use interior mutability.
pub trait GuidCmdSink {
    /// Set the command to be tracked by the vehicle.
    fn set_command(&self, cmd: SpeedCmd);
}

/// The lifecycle shared by all longitudinal manoeuvres.
///
/// Implementors provide read access to their [`MnvrBase`], the
/// `plan`/`execute_time_step` pair and `reset`. The base only exposes its
/// mutating and command issuing functions inside this crate, so every command
/// goes through a variant's `execute_time_step`.
pub trait LongMnvr<'a> {
    /// Plan the manoeuvre to start at the given distance along the route.
    ///
    /// Binds the collaborators for the rest of the manoeuvre's life. Fails if
    /// the manoeuvre is already planned or is missing configuration.
    fn plan(
        &mut self,
        inputs: &'a dyn MnvrInputs,
        sink: &'a dyn GuidCmdSink,
        start_dist_m: f64,
    ) -> Result<(), MnvrError>;

    /// Execute one control cycle of the manoeuvre, issuing one command.
    fn execute_time_step(&mut self) -> Result<(), MnvrError>;

    /// Shared manoeuvre data.
    fn base(&self) -> &MnvrBase<'a>;

    /// Return the manoeuvre to the unplanned state, releasing the
    /// collaborators. Configuration is kept.
    fn reset(&mut self);

    /// Set the end distance of the planned manoeuvre.
    ///
    /// Only manoeuvres with no intrinsic length support this.
    fn override_end_dist(&mut self, _end_dist_m: f64) -> Result<(), MnvrError> {
        Err(MnvrError::EndOverrideUnsupported(self.kind()))
    }

    fn kind(&self) -> MnvrKind {
        self.base().kind()
    }

    fn is_planned(&self) -> bool {
        self.base().is_planned()
    }

    fn start_dist_m(&self) -> f64 {
        self.base().start_dist_m()
    }

    fn end_dist_m(&self) -> f64 {
        self.base().end_dist_m()
    }
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The types of longitudinal manoeuvre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MnvrKind {
    SteadySpeed,
    SpeedUp,
    SlowDown,
}

/// Lifecycle state of a manoeuvre.
///
/// There is no distinct executing state, a planned manoeuvre may be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnvrState {
    Unplanned,
    Planned,
}

/// Errors which can occur while configuring, planning or executing a
/// manoeuvre.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MnvrError {
    // ---- CONFIGURATION ----
    #[error("{0} manoeuvre has no target speed set")]
    MissingTargetSpeed(MnvrKind),

    #[error("{0} manoeuvre has no start speed set")]
    MissingStartSpeed(MnvrKind),

    #[error("{0} manoeuvre has no maximum acceleration set")]
    MissingMaxAccel(MnvrKind),

    #[error("{mnvr} manoeuvre maximum acceleration must be positive and finite, found {max_accel_mss:?}")]
    InvalidMaxAccel { mnvr: MnvrKind, max_accel_mss: f64 },

    #[error("{mnvr} manoeuvre acceleration factor must be in (0, 1], found {factor:?}")]
    InvalidAccelFactor { mnvr: MnvrKind, factor: f64 },

    #[error("{mnvr} manoeuvre cannot change speed from {start_speed_ms:?} m/s to {target_speed_ms:?} m/s")]
    InvalidSpeedChange {
        mnvr: MnvrKind,
        start_speed_ms: f64,
        target_speed_ms: f64,
    },

    #[error("{0} manoeuvre is already planned, it must be reset before planning again")]
    AlreadyPlanned(MnvrKind),

    #[error("{0} manoeuvre has not been planned")]
    NotPlanned(MnvrKind),

    #[error("{0} manoeuvre does not support overriding its end distance")]
    EndOverrideUnsupported(MnvrKind),

    // ---- BOUNDS ----
    #[error(
        "{mnvr} manoeuvre attempted to execute at distance {dist_m:?} m, outside of its \
        bounds [{start_dist_m:?}, {end_dist_m:?}] m"
    )]
    OutOfBounds {
        mnvr: MnvrKind,
        dist_m: f64,
        start_dist_m: f64,
        end_dist_m: f64,
    },

    // ---- VALUES ----
    #[error("Target speed must be non-negative and finite, found {0:?} m/s")]
    InvalidTargetSpeed(f64),

    #[error("Start speed must be non-negative and finite, found {0:?} m/s")]
    InvalidStartSpeed(f64),

    #[error("Start distance must be non-negative and finite, found {0:?} m")]
    InvalidStartDist(f64),

    #[error("Manoeuvre length must be non-negative and finite, found {0:?} m")]
    InvalidLength(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl std::fmt::Display for MnvrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl MnvrError {
    /// The manoeuvre was not configured or planned correctly.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            MnvrError::MissingTargetSpeed(_)
                | MnvrError::MissingStartSpeed(_)
                | MnvrError::MissingMaxAccel(_)
                | MnvrError::InvalidMaxAccel { .. }
                | MnvrError::InvalidAccelFactor { .. }
                | MnvrError::InvalidSpeedChange { .. }
                | MnvrError::AlreadyPlanned(_)
                | MnvrError::NotPlanned(_)
                | MnvrError::EndOverrideUnsupported(_)
        )
    }

    /// The manoeuvre was executed outside of its bounds.
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, MnvrError::OutOfBounds { .. })
    }

    /// A value given to the manoeuvre was invalid.
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            MnvrError::InvalidTargetSpeed(_)
                | MnvrError::InvalidStartSpeed(_)
                | MnvrError::InvalidStartDist(_)
                | MnvrError::InvalidLength(_)
        )
    }
}

/// Check that a speed is usable as a command, i.e. finite and non-negative.
pub(crate) fn is_valid_speed(speed_ms: f64) -> bool {
    speed_ms.is_finite() && speed_ms >= 0.0
}

// ---------------------------------------------------------------------------
// TEST DOUBLES
// ---------------------------------------------------------------------------
