//! # Speed change manoeuvres
//!
//! [`SpeedUp`] and [`SlowDown`] take the vehicle from a start speed to a
//! target speed at the manoeuvre's maximum acceleration. The length of the
//! manoeuvre is the distance needed to make that change at constant
//! acceleration:
//!
//! ```text
//! length = |v_target^2 - v_start^2| / (2 * max_accel)
//! ```
//!
//! On every step the target speed, passed through the ACC override, is
//! commanded with the full acceleration ceiling, the longitudinal controller
//! then ramps the vehicle's speed along the planned profile.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use super::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Increase speed from the start speed to the target speed.
pub struct SpeedUp<'a>(SpeedChange<'a>);

/// Decrease speed from the start speed to the target speed.
pub struct SlowDown<'a>(SpeedChange<'a>);

/// Implementation shared by both speed change directions.
struct SpeedChange<'a> {
    base: MnvrBase<'a>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> SpeedChange<'a> {
    fn new(kind: MnvrKind, acc: AccOverride) -> Self {
        Self {
            base: MnvrBase::new(kind, acc),
        }
    }

    fn set_speeds(&mut self, start_speed_ms: f64, target_speed_ms: f64) -> Result<(), MnvrError> {
        self.base.set_start_speed(start_speed_ms)?;
        self.base.set_target_speed(target_speed_ms)
    }

    fn plan(
        &mut self,
        inputs: &'a dyn MnvrInputs,
        sink: &'a dyn GuidCmdSink,
        start_dist_m: f64,
    ) -> Result<(), MnvrError> {
        self.base.plan(inputs, sink, start_dist_m)?;

        // Undo the base plan if the speed change itself isn't valid, so the
        // manoeuvre is left unplanned
        match self.get_length_m() {
            Ok(length_m) => self.base.set_end_dist(start_dist_m + length_m),
            Err(e) => {
                self.base.reset();
                Err(e)
            }
        }
    }

    /// Distance required to change speed.
    fn get_length_m(&self) -> Result<f64, MnvrError> {
        let kind = self.base.kind();

        let start_speed_ms = self
            .base
            .start_speed_ms()
            .ok_or(MnvrError::MissingStartSpeed(kind))?;
        if !is_valid_speed(start_speed_ms) {
            return Err(MnvrError::InvalidStartSpeed(start_speed_ms));
        }

        // Both validated by the base plan
        let target_speed_ms = self.base.planned_target_speed_ms()?;
        let max_accel_mss = self.base.planned_max_accel_mss()?;

        let direction_ok = match kind {
            MnvrKind::SpeedUp => target_speed_ms > start_speed_ms,
            MnvrKind::SlowDown => target_speed_ms < start_speed_ms,
            MnvrKind::SteadySpeed => false,
        };
        if !direction_ok {
            return Err(MnvrError::InvalidSpeedChange {
                mnvr: kind,
                start_speed_ms,
                target_speed_ms,
            });
        }

        let length_m =
            (target_speed_ms.powi(2) - start_speed_ms.powi(2)).abs() / (2.0 * max_accel_mss);

        debug!(
            "{} from {:.2} m/s to {:.2} m/s at {:.2} m/s^2 needs {:.2} m",
            kind, start_speed_ms, target_speed_ms, max_accel_mss, length_m
        );

        Ok(length_m)
    }

    fn execute_time_step(&mut self) -> Result<(), MnvrError> {
        self.base.check_bounds()?;

        let cmd_ms = self.base.acc_override(self.base.planned_target_speed_ms()?)?;
        let max_accel_mss = self.base.planned_max_accel_mss()?;

        self.base.issue(cmd_ms, max_accel_mss)?;

        Ok(())
    }
}

macro_rules! impl_speed_change {
    ($name:ident, $kind:expr) => {
        impl<'a> $name<'a> {
            /// Create an unconfigured manoeuvre with default parameters.
            pub fn new() -> Self {
                Self(SpeedChange::new($kind, AccOverride::default()))
            }

            /// Create an unconfigured manoeuvre using the given parameters.
            pub fn from_params(params: &Params) -> Self {
                Self(SpeedChange::new($kind, AccOverride::new(params.acc)))
            }

            /// Set the expected speed at the start of the manoeuvre and the
            /// speed to reach by its end.
            pub fn set_speeds(
                &mut self,
                start_speed_ms: f64,
                target_speed_ms: f64,
            ) -> Result<(), MnvrError> {
                self.0.set_speeds(start_speed_ms, target_speed_ms)
            }

            pub fn set_max_accel(&mut self, max_accel_mss: f64) -> Result<(), MnvrError> {
                self.0.base.set_max_accel(max_accel_mss)
            }
        }

        impl<'a> Default for $name<'a> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<'a> LongMnvr<'a> for $name<'a> {
            fn plan(
                &mut self,
                inputs: &'a dyn MnvrInputs,
                sink: &'a dyn GuidCmdSink,
                start_dist_m: f64,
            ) -> Result<(), MnvrError> {
                self.0.plan(inputs, sink, start_dist_m)
            }

            fn execute_time_step(&mut self) -> Result<(), MnvrError> {
                self.0.execute_time_step()
            }

            fn base(&self) -> &MnvrBase<'a> {
                &self.0.base
            }

            fn reset(&mut self) {
                self.0.base.reset()
            }
        }
    };
}

impl_speed_change!(SpeedUp, MnvrKind::SpeedUp);
impl_speed_change!(SlowDown, MnvrKind::SlowDown);

#[cfg(test)]
mod test {
    use super::*;
    use crate::mnvr::test_util::{TestInputs, TestSink};

    #[test]
    fn test_speed_up_length() {
        let inputs = TestInputs::at(10.0);
        let sink = TestSink::default();
        let mut m = SpeedUp::new();
        m.set_speeds(5.0, 15.0).unwrap();
        m.set_max_accel(2.0).unwrap();

        m.plan(&inputs, &sink, 10.0).unwrap();

        // (225 - 25) / 4 = 50
        assert_eq!(m.start_dist_m(), 10.0);
        assert_eq!(m.end_dist_m(), 60.0);
        assert_eq!(m.kind(), MnvrKind::SpeedUp);
    }

    #[test]
    fn test_slow_down_execute() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut m = SlowDown::new();
        m.set_speeds(20.0, 0.0).unwrap();
        m.set_max_accel(4.0).unwrap();

        m.plan(&inputs, &sink, 0.0).unwrap();
        assert_eq!(m.end_dist_m(), 50.0);

        inputs.dist_m.set(25.0);
        m.execute_time_step().unwrap();

        // Full acceleration ceiling for speed changes
        assert_eq!(
            sink.last(),
            Some(SpeedCmd {
                speed_ms: 0.0,
                max_accel_mss: 4.0
            })
        );

        inputs.dist_m.set(50.5);
        assert!(m.execute_time_step().unwrap_err().is_bounds_error());
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn test_wrong_direction() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();

        let mut up = SpeedUp::new();
        up.set_speeds(15.0, 10.0).unwrap();
        up.set_max_accel(1.0).unwrap();
        assert!(matches!(
            up.plan(&inputs, &sink, 0.0),
            Err(MnvrError::InvalidSpeedChange { .. })
        ));
        assert!(!up.is_planned());

        let mut down = SlowDown::new();
        down.set_speeds(10.0, 10.0).unwrap();
        down.set_max_accel(1.0).unwrap();
        assert!(matches!(
            down.plan(&inputs, &sink, 0.0),
            Err(MnvrError::InvalidSpeedChange { .. })
        ));
    }

    #[test]
    fn test_missing_and_invalid_start_speed() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();

        let mut m = SpeedUp::new();
        m.0.base.set_target_speed(10.0).unwrap();
        m.set_max_accel(1.0).unwrap();
        assert_eq!(
            m.plan(&inputs, &sink, 0.0),
            Err(MnvrError::MissingStartSpeed(MnvrKind::SpeedUp))
        );

        let mut m = SpeedUp::new();
        m.set_speeds(-1.0, 10.0).unwrap();
        m.set_max_accel(1.0).unwrap();
        assert_eq!(
            m.plan(&inputs, &sink, 0.0),
            Err(MnvrError::InvalidStartSpeed(-1.0))
        );
    }

    #[test]
    fn test_speed_change_not_overridable() {
        let inputs = TestInputs::at(0.0);
        let sink = TestSink::default();
        let mut m = SpeedUp::new();
        m.set_speeds(0.0, 10.0).unwrap();
        m.set_max_accel(1.0).unwrap();
        m.plan(&inputs, &sink, 0.0).unwrap();

        assert_eq!(
            m.override_end_dist(500.0),
            Err(MnvrError::EndOverrideUnsupported(MnvrKind::SpeedUp))
        );
        assert_eq!(m.end_dist_m(), 50.0);
    }
}
