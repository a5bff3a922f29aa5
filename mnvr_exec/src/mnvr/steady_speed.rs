//! # Steady speed manoeuvre
//!
//! Holds the vehicle at a target speed. A steady speed has no length of its
//! own, so once planned it spans zero distance (`start == end`). The owner
//! gives it a length by calling `override_end_dist`, which is how gaps
//! between other manoeuvres in a trajectory are filled.
//!
//! Even though the intent is to continue the current speed a target speed
//! must be configured, the vehicle's actual speed may never have settled on
//! the target of the previous manoeuvre.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::*;
use super::params::DEFAULT_STEADY_SPEED_ACCEL_FACTOR;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A steady speed manoeuvre.
pub struct SteadySpeed<'a> {
    base: MnvrBase<'a>,

    /// Fraction of the maximum acceleration used as the command ceiling.
    accel_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> SteadySpeed<'a> {
    /// Create an unconfigured steady speed manoeuvre with default parameters.
    pub fn new() -> Self {
        Self {
            base: MnvrBase::new(MnvrKind::SteadySpeed, AccOverride::default()),
            accel_factor: DEFAULT_STEADY_SPEED_ACCEL_FACTOR,
        }
    }

    /// Create an unconfigured steady speed manoeuvre using the given
    /// parameters.
    pub fn from_params(params: &Params) -> Self {
        Self {
            base: MnvrBase::new(MnvrKind::SteadySpeed, AccOverride::new(params.acc)),
            accel_factor: params.steady_speed_accel_factor,
        }
    }

    pub fn set_target_speed(&mut self, speed_ms: f64) -> Result<(), MnvrError> {
        self.base.set_target_speed(speed_ms)
    }

    pub fn set_max_accel(&mut self, max_accel_mss: f64) -> Result<(), MnvrError> {
        self.base.set_max_accel(max_accel_mss)
    }

    pub fn accel_factor(&self) -> f64 {
        self.accel_factor
    }
}

impl<'a> Default for SteadySpeed<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> LongMnvr<'a> for SteadySpeed<'a> {
    fn plan(
        &mut self,
        inputs: &'a dyn MnvrInputs,
        sink: &'a dyn GuidCmdSink,
        start_dist_m: f64,
    ) -> Result<(), MnvrError> {
        if !(self.accel_factor > 0.0 && self.accel_factor <= 1.0) {
            return Err(MnvrError::InvalidAccelFactor {
                mnvr: MnvrKind::SteadySpeed,
                factor: self.accel_factor,
            });
        }

        // The base leaves both bounds at the start distance, which is the
        // length we want
        self.base.plan(inputs, sink, start_dist_m)?;

        debug!(
            "SteadySpeed planned at {:.2} m, target {:?} m/s",
            start_dist_m,
            self.base.target_speed_ms()
        );

        Ok(())
    }

    fn execute_time_step(&mut self) -> Result<(), MnvrError> {
        self.base.check_bounds()?;

        let cmd_ms = self.base.acc_override(self.base.planned_target_speed_ms()?)?;
        let max_accel_mss = self.accel_factor * self.base.planned_max_accel_mss()?;

        self.base.issue(cmd_ms, max_accel_mss)?;

        Ok(())
    }

    fn base(&self) -> &MnvrBase<'a> {
        &self.base
    }

    fn reset(&mut self) {
        self.base.reset()
    }

    fn override_end_dist(&mut self, end_dist_m: f64) -> Result<(), MnvrError> {
        self.base.set_end_dist(end_dist_m)
    }
}
