//! Drive description used to build manoeuvre sequences from parameter files

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use crate::{
    mnvr::{self, MnvrError, SlowDown, SpeedUp, SteadySpeed},
    traj_exec::SeqItem,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// One manoeuvre of a drive.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "type")]
pub enum DriveMnvr {
    SpeedUp {
        start_speed_ms: f64,
        target_speed_ms: f64,
        max_accel_mss: f64,
    },
    SteadySpeed {
        target_speed_ms: f64,
        max_accel_mss: f64,
        length_m: f64,
    },
    SlowDown {
        start_speed_ms: f64,
        target_speed_ms: f64,
        max_accel_mss: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveMnvr {
    /// Build the configured, unplanned manoeuvre.
    pub fn to_seq_item<'a>(&self, params: &mnvr::Params) -> Result<SeqItem<'a>, MnvrError> {
        Ok(match *self {
            DriveMnvr::SpeedUp {
                start_speed_ms,
                target_speed_ms,
                max_accel_mss,
            } => {
                let mut m = SpeedUp::from_params(params);
                m.set_speeds(start_speed_ms, target_speed_ms)?;
                m.set_max_accel(max_accel_mss)?;
                SeqItem::new(Box::new(m))
            }
            DriveMnvr::SteadySpeed {
                target_speed_ms,
                max_accel_mss,
                length_m,
            } => {
                let mut m = SteadySpeed::from_params(params);
                m.set_target_speed(target_speed_ms)?;
                m.set_max_accel(max_accel_mss)?;
                SeqItem::with_length(Box::new(m), length_m)
            }
            DriveMnvr::SlowDown {
                start_speed_ms,
                target_speed_ms,
                max_accel_mss,
            } => {
                let mut m = SlowDown::from_params(params);
                m.set_speeds(start_speed_ms, target_speed_ms)?;
                m.set_max_accel(max_accel_mss)?;
                SeqItem::new(Box::new(m))
            }
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Build a manoeuvre sequence from a drive description.
pub fn build_sequence<'a>(
    drive: &[DriveMnvr],
    params: &mnvr::Params,
) -> Result<Vec<SeqItem<'a>>, MnvrError> {
    drive.iter().map(|d| d.to_seq_item(params)).collect()
}
