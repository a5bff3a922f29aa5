//! Data and checks shared by every manoeuvre

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};

// Internal
use super::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state common to all manoeuvres.
///
/// Variants embed a `MnvrBase` and build their `plan` and
/// `execute_time_step` out of its functions. Outside of this crate the base
/// is read only, commands can't be issued around the bounds check:
///
/// ```compile_fail
/// use mnvr_lib::mnvr::{LongMnvr, SteadySpeed};
///
/// fn bypass(m: &SteadySpeed) {
///     m.base().issue(-5.0, 100.0).ok();
/// }
/// ```
pub struct MnvrBase<'a> {
    kind: MnvrKind,
    state: MnvrState,

    inputs: Option<&'a dyn MnvrInputs>,
    sink: Option<&'a dyn GuidCmdSink>,

    /// Distance along the route at which the manoeuvre becomes valid.
    ///
    /// Units: meters
    start_dist_m: f64,

    /// Distance along the route at which the manoeuvre stops being valid.
    ///
    /// Units: meters
    end_dist_m: f64,

    /// Expected speed of the vehicle at the start of the manoeuvre.
    ///
    /// Units: meters/second
    start_speed_ms: Option<f64>,

    /// Speed to reach and hold by the end of the manoeuvre.
    ///
    /// Units: meters/second
    target_speed_ms: Option<f64>,

    /// Maximum magnitude of acceleration the manoeuvre may command.
    ///
    /// Units: meters/second^2
    max_accel_mss: Option<f64>,

    acc: AccOverride,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> MnvrBase<'a> {
    /// Create a new unplanned manoeuvre base.
    pub(crate) fn new(kind: MnvrKind, acc: AccOverride) -> Self {
        Self {
            kind,
            state: MnvrState::Unplanned,
            inputs: None,
            sink: None,
            start_dist_m: 0.0,
            end_dist_m: 0.0,
            start_speed_ms: None,
            target_speed_ms: None,
            max_accel_mss: None,
            acc,
        }
    }

    pub fn kind(&self) -> MnvrKind {
        self.kind
    }

    pub fn state(&self) -> MnvrState {
        self.state
    }

    pub fn is_planned(&self) -> bool {
        self.state == MnvrState::Planned
    }

    pub fn start_dist_m(&self) -> f64 {
        self.start_dist_m
    }

    pub fn end_dist_m(&self) -> f64 {
        self.end_dist_m
    }

    pub fn start_speed_ms(&self) -> Option<f64> {
        self.start_speed_ms
    }

    pub fn target_speed_ms(&self) -> Option<f64> {
        self.target_speed_ms
    }

    pub fn max_accel_mss(&self) -> Option<f64> {
        self.max_accel_mss
    }

    // ---- CONFIGURATION ----

    /// Set the expected start speed. Only allowed before planning.
    pub(crate) fn set_start_speed(&mut self, speed_ms: f64) -> Result<(), MnvrError> {
        self.check_unplanned()?;
        self.start_speed_ms = Some(speed_ms);
        Ok(())
    }

    /// Set the target speed. Only allowed before planning.
    pub(crate) fn set_target_speed(&mut self, speed_ms: f64) -> Result<(), MnvrError> {
        self.check_unplanned()?;
        self.target_speed_ms = Some(speed_ms);
        Ok(())
    }

    /// Set the maximum acceleration. Only allowed before planning.
    pub(crate) fn set_max_accel(&mut self, max_accel_mss: f64) -> Result<(), MnvrError> {
        self.check_unplanned()?;
        self.max_accel_mss = Some(max_accel_mss);
        Ok(())
    }

    // ---- LIFECYCLE ----

    /// Plan the base part of the manoeuvre.
    ///
    /// Validates the configuration shared by all manoeuvres, binds the
    /// collaborators and sets both bounds to `start_dist_m`. Variants then
    /// move the end distance as they need.
    pub(crate) fn plan(
        &mut self,
        inputs: &'a dyn MnvrInputs,
        sink: &'a dyn GuidCmdSink,
        start_dist_m: f64,
    ) -> Result<(), MnvrError> {
        self.check_unplanned()?;

        if !start_dist_m.is_finite() || start_dist_m < 0.0 {
            return Err(MnvrError::InvalidStartDist(start_dist_m));
        }

        let target_speed_ms = self
            .target_speed_ms
            .ok_or(MnvrError::MissingTargetSpeed(self.kind))?;
        if !is_valid_speed(target_speed_ms) {
            return Err(MnvrError::InvalidTargetSpeed(target_speed_ms));
        }

        let max_accel_mss = self
            .max_accel_mss
            .ok_or(MnvrError::MissingMaxAccel(self.kind))?;
        if !max_accel_mss.is_finite() || max_accel_mss <= 0.0 {
            return Err(MnvrError::InvalidMaxAccel {
                mnvr: self.kind,
                max_accel_mss,
            });
        }

        self.inputs = Some(inputs);
        self.sink = Some(sink);
        self.start_dist_m = start_dist_m;
        self.end_dist_m = start_dist_m;
        self.state = MnvrState::Planned;

        Ok(())
    }

    /// Set the end distance of a planned manoeuvre.
    ///
    /// No check is made on the value, the caller shall give an end distance no
    /// less than the start distance.
    pub(crate) fn set_end_dist(&mut self, end_dist_m: f64) -> Result<(), MnvrError> {
        if !self.is_planned() {
            return Err(MnvrError::NotPlanned(self.kind));
        }

        self.end_dist_m = end_dist_m;

        debug!(
            "{} manoeuvre bounds set to [{:.2}, {:.2}] m",
            self.kind, self.start_dist_m, self.end_dist_m
        );

        Ok(())
    }

    /// Release the collaborators and return to the unplanned state.
    pub(crate) fn reset(&mut self) {
        self.inputs = None;
        self.sink = None;
        self.start_dist_m = 0.0;
        self.end_dist_m = 0.0;
        self.state = MnvrState::Unplanned;
    }

    // ---- EXECUTION ----

    /// Check that the vehicle is within the manoeuvre's bounds, returning the
    /// current distance along the route.
    pub(crate) fn check_bounds(&self) -> Result<f64, MnvrError> {
        let inputs = self.inputs()?;
        let dist_m = inputs.dist_from_route_start_m();

        // Written so that a NaN distance also fails
        if !(dist_m >= self.start_dist_m && dist_m <= self.end_dist_m) {
            warn!(
                "{} manoeuvre out of bounds at {:?} m, bounds [{:?}, {:?}] m",
                self.kind, dist_m, self.start_dist_m, self.end_dist_m
            );
            return Err(MnvrError::OutOfBounds {
                mnvr: self.kind,
                dist_m,
                start_dist_m: self.start_dist_m,
                end_dist_m: self.end_dist_m,
            });
        }

        Ok(dist_m)
    }

    /// Apply the ACC override to the given target speed.
    pub(crate) fn acc_override(&self, target_speed_ms: f64) -> Result<f64, MnvrError> {
        let inputs = self.inputs()?;
        self.acc.get_cmd_speed(target_speed_ms, inputs)
    }

    /// Issue a command to the sink.
    pub(crate) fn issue(&self, speed_ms: f64, max_accel_mss: f64) -> Result<SpeedCmd, MnvrError> {
        let sink = self.sink.ok_or(MnvrError::NotPlanned(self.kind))?;

        let cmd = SpeedCmd {
            speed_ms,
            max_accel_mss,
        };

        trace!("{} manoeuvre issuing {:?}", self.kind, cmd);
        sink.set_command(cmd);

        Ok(cmd)
    }

    /// Planned target speed.
    pub(crate) fn planned_target_speed_ms(&self) -> Result<f64, MnvrError> {
        self.check_planned()?;
        self.target_speed_ms
            .ok_or(MnvrError::MissingTargetSpeed(self.kind))
    }

    /// Planned maximum acceleration.
    pub(crate) fn planned_max_accel_mss(&self) -> Result<f64, MnvrError> {
        self.check_planned()?;
        self.max_accel_mss
            .ok_or(MnvrError::MissingMaxAccel(self.kind))
    }

    fn inputs(&self) -> Result<&'a dyn MnvrInputs, MnvrError> {
        self.inputs.ok_or(MnvrError::NotPlanned(self.kind))
    }

    fn check_planned(&self) -> Result<(), MnvrError> {
        match self.state {
            MnvrState::Planned => Ok(()),
            MnvrState::Unplanned => Err(MnvrError::NotPlanned(self.kind)),
        }
    }

    fn check_unplanned(&self) -> Result<(), MnvrError> {
        match self.state {
            MnvrState::Unplanned => Ok(()),
            MnvrState::Planned => Err(MnvrError::AlreadyPlanned(self.kind)),
        }
    }
}
