//! # Adaptive cruise control override
//!
//! The ACC override converts the target speed of a manoeuvre into the speed
//! that is actually commanded. With a clear road ahead the target speed is
//! commanded unchanged. When a vehicle in front is closer than the desired
//! gap the commanded speed is pulled down towards that vehicle's speed,
//! proportionally to how far inside the desired gap we are.
//!
//! The desired gap follows a constant time gap policy with a standstill
//! minimum:
//!
//! ```text
//! gap_des = max(standstill_gap_m, time_gap_s * current_speed_ms)
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::{Deserialize, Serialize};

// Internal
use super::{is_valid_speed, MnvrError, MnvrInputs};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the ACC override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccParams {
    /// Time gap to keep to the vehicle in front.
    ///
    /// Units: seconds
    pub time_gap_s: f64,

    /// Minimum gap to keep to the vehicle in front, regardless of speed.
    ///
    /// Units: meters
    pub standstill_gap_m: f64,

    /// Upper limit on any commanded speed.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,
}

/// The ACC override control law.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AccOverride {
    params: AccParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for AccParams {
    fn default() -> Self {
        Self {
            time_gap_s: 1.5,
            standstill_gap_m: 5.0,
            max_speed_ms: 35.0,
        }
    }
}

impl AccOverride {
    pub fn new(params: AccParams) -> Self {
        Self { params }
    }

    /// Desired gap to the vehicle in front at the given speed.
    pub fn desired_gap_m(&self, current_speed_ms: f64) -> f64 {
        self.params
            .standstill_gap_m
            .max(self.params.time_gap_s * current_speed_ms)
    }

    /// Compute the speed to command in order to track `target_speed_ms`.
    ///
    /// The result is finite, non-negative and no greater than either the
    /// target speed or the maximum speed parameter. A front vehicle reported
    /// with a non-finite gap or speed gives a command of zero.
    pub fn get_cmd_speed(
        &self,
        target_speed_ms: f64,
        inputs: &dyn MnvrInputs,
    ) -> Result<f64, MnvrError> {
        if !is_valid_speed(target_speed_ms) {
            return Err(MnvrError::InvalidTargetSpeed(target_speed_ms));
        }

        let mut cmd_ms = target_speed_ms;

        // Only override when both the gap and the speed of the front vehicle
        // are known
        if let (Some(gap_m), Some(front_speed_ms)) =
            (inputs.front_vehicle_dist_m(), inputs.front_vehicle_speed_ms())
        {
            if !gap_m.is_finite() || !front_speed_ms.is_finite() {
                warn!(
                    "Front vehicle reading invalid (gap {:?} m, speed {:?} m/s), commanding stop",
                    gap_m, front_speed_ms
                );
                return Ok(0.0);
            }

            let gap_des_m = self.desired_gap_m(inputs.current_speed_ms());

            if gap_m < gap_des_m {
                let follow_ms = front_speed_ms * (gap_m / gap_des_m);
                cmd_ms = cmd_ms.min(follow_ms);

                trace!(
                    "ACC override active: gap {:.2} m < {:.2} m, following at {:.2} m/s",
                    gap_m,
                    gap_des_m,
                    follow_ms
                );
            }
        }

        Ok(cmd_ms.min(self.params.max_speed_ms).max(0.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mnvr::test_util::TestInputs;

    #[test]
    fn test_clear_road() {
        let acc = AccOverride::default();
        let inputs = TestInputs::at(10.0);

        assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(20.0));
        assert_eq!(acc.get_cmd_speed(0.0, &inputs), Ok(0.0));

        // Limited by the maximum speed
        assert_eq!(acc.get_cmd_speed(50.0, &inputs), Ok(35.0));
    }

    #[test]
    fn test_invalid_target() {
        let acc = AccOverride::default();
        let inputs = TestInputs::at(10.0);

        assert_eq!(
            acc.get_cmd_speed(-5.0, &inputs),
            Err(MnvrError::InvalidTargetSpeed(-5.0))
        );
        assert!(acc.get_cmd_speed(f64::INFINITY, &inputs).is_err());
        assert!(acc.get_cmd_speed(f64::NAN, &inputs).is_err());
    }

    #[test]
    fn test_front_vehicle() {
        let acc = AccOverride::new(AccParams {
            time_gap_s: 2.0,
            standstill_gap_m: 5.0,
            max_speed_ms: 35.0,
        });
        let inputs = TestInputs::at(10.0);
        inputs.speed_ms.set(20.0);

        // Desired gap is 40 m. Front vehicle far away, no override.
        inputs.front.set(Some((60.0, 10.0)));
        assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(20.0));

        // Inside the desired gap, follow at half the front speed
        inputs.front.set(Some((20.0, 10.0)));
        assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(5.0));

        // Never above the target
        inputs.front.set(Some((30.0, 30.0)));
        assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(20.0));

        // Never negative
        inputs.front.set(Some((20.0, -4.0)));
        assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(0.0));

        // Stopped vehicle close ahead
        inputs.front.set(Some((2.0, 0.0)));
        assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(0.0));
    }

    #[test]
    fn test_invalid_front_vehicle_stops() {
        let acc = AccOverride::default();
        let inputs = TestInputs::at(10.0);
        inputs.speed_ms.set(20.0);

        for front in [
            (2.0, f64::NAN),
            (f64::NAN, 0.0),
            (200.0, f64::INFINITY),
            (f64::INFINITY, 20.0),
            (f64::NEG_INFINITY, 20.0),
        ]
        .iter()
        {
            inputs.front.set(Some(*front));
            assert_eq!(acc.get_cmd_speed(20.0, &inputs), Ok(0.0), "front {:?}", front);
        }

        // Invalid target speed is still reported first
        inputs.front.set(Some((f64::NAN, f64::NAN)));
        assert!(acc.get_cmd_speed(-1.0, &inputs).is_err());
    }

    #[test]
    fn test_standstill_gap() {
        let acc = AccOverride::default();
        assert_eq!(acc.desired_gap_m(0.0), 5.0);
        assert_eq!(acc.desired_gap_m(10.0), 15.0);
    }
}
