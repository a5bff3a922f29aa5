//! # Simulated vehicle
//!
//! A point mass model of the vehicle's longitudinal motion, standing in for
//! both the localisation inputs and the longitudinal controller. The vehicle
//! tracks the last commanded speed, changing its speed by no more than the
//! commanded acceleration ceiling, and integrates its distance along the
//! route.
//!
//! Optionally a front vehicle travelling at constant speed can be simulated
//! to exercise the ACC override.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod drive;
pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cell::Cell;

// Internal
pub use drive::*;
pub use params::*;
use crate::mnvr::{GuidCmdSink, MnvrInputs, SpeedCmd};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The simulated vehicle.
///
/// Uses interior mutability so that the vehicle can be shared as both the
/// inputs and the command sink of the manoeuvres.
#[derive(Debug)]
pub struct SimVehicle {
    dist_m: Cell<f64>,
    speed_ms: Cell<f64>,

    /// Position along the route of the front vehicle's rear
    front_pos_m: Cell<Option<f64>>,
    front_speed_ms: Option<f64>,

    cmd: Cell<Option<SpeedCmd>>,
    num_cmds: Cell<u64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimVehicle {
    pub fn new(params: &Params) -> Self {
        let front = params.front_vehicle.as_ref();

        Self {
            dist_m: Cell::new(params.init_dist_m),
            speed_ms: Cell::new(params.init_speed_ms),
            front_pos_m: Cell::new(front.map(|f| params.init_dist_m + f.init_gap_m)),
            front_speed_ms: front.map(|f| f.speed_ms),
            cmd: Cell::new(None),
            num_cmds: Cell::new(0),
        }
    }

    /// Advance the simulation by `dt_s` seconds.
    pub fn step(&self, dt_s: f64) {
        let v0 = self.speed_ms.get();

        let v1 = match self.cmd.get() {
            Some(cmd) => {
                let max_dv = cmd.max_accel_mss * dt_s;
                (v0 + (cmd.speed_ms - v0).max(-max_dv).min(max_dv)).max(0.0)
            }
            None => v0,
        };

        self.speed_ms.set(v1);
        self.dist_m.set(self.dist_m.get() + 0.5 * (v0 + v1) * dt_s);

        if let (Some(pos_m), Some(speed_ms)) = (self.front_pos_m.get(), self.front_speed_ms) {
            self.front_pos_m.set(Some(pos_m + speed_ms * dt_s));
        }
    }

    /// The last command received.
    pub fn last_cmd(&self) -> Option<SpeedCmd> {
        self.cmd.get()
    }

    /// Total number of commands received.
    pub fn num_cmds(&self) -> u64 {
        self.num_cmds.get()
    }

    /// True if the vehicle is stationary and has been commanded to stay so.
    pub fn is_stopped(&self) -> bool {
        self.speed_ms.get() <= 0.0
            && self.cmd.get().map_or(false, |c| c.speed_ms <= 0.0)
    }
}

impl MnvrInputs for SimVehicle {
    fn dist_from_route_start_m(&self) -> f64 {
        self.dist_m.get()
    }

    fn current_speed_ms(&self) -> f64 {
        self.speed_ms.get()
    }

    fn front_vehicle_dist_m(&self) -> Option<f64> {
        self.front_pos_m.get().map(|p| p - self.dist_m.get())
    }

    fn front_vehicle_speed_ms(&self) -> Option<f64> {
        self.front_speed_ms
    }
}

impl GuidCmdSink for SimVehicle {
    fn set_command(&self, cmd: SpeedCmd) {
        self.cmd.set(Some(cmd));
        self.num_cmds.set(self.num_cmds.get() + 1);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        mnvr,
        traj_exec::{self, TrajExec},
    };

    fn params() -> Params {
        Params {
            init_dist_m: 0.0,
            init_speed_ms: 0.0,
            front_vehicle: None,
            drive: vec![],
        }
    }

    #[test]
    fn test_acceleration_limited() {
        let v = SimVehicle::new(&params());
        v.set_command(SpeedCmd {
            speed_ms: 10.0,
            max_accel_mss: 2.0,
        });

        v.step(1.0);
        assert_eq!(v.current_speed_ms(), 2.0);
        assert_eq!(v.dist_from_route_start_m(), 1.0);

        for _ in 0..10 {
            v.step(1.0);
        }
        assert_eq!(v.current_speed_ms(), 10.0);
        assert_eq!(v.num_cmds(), 1);
    }

    #[test]
    fn test_front_vehicle_gap() {
        let mut p = params();
        p.front_vehicle = Some(FrontVehicleParams {
            init_gap_m: 30.0,
            speed_ms: 5.0,
        });
        let v = SimVehicle::new(&p);

        assert_eq!(v.front_vehicle_dist_m(), Some(30.0));
        v.step(2.0);
        assert_eq!(v.front_vehicle_dist_m(), Some(40.0));
        assert_eq!(v.front_vehicle_speed_ms(), Some(5.0));
    }

    #[test]
    fn test_drive_sequence() {
        let mut p = params();
        p.drive = vec![
            DriveMnvr::SpeedUp {
                start_speed_ms: 0.0,
                target_speed_ms: 10.0,
                max_accel_mss: 2.0,
            },
            DriveMnvr::SteadySpeed {
                target_speed_ms: 10.0,
                max_accel_mss: 2.0,
                length_m: 50.0,
            },
            DriveMnvr::SlowDown {
                start_speed_ms: 10.0,
                target_speed_ms: 0.0,
                max_accel_mss: 2.0,
            },
        ];

        let vehicle = SimVehicle::new(&p);
        let mut te = TrajExec::new(traj_exec::Params::default(), &vehicle, &vehicle);
        let seq = build_sequence(&p.drive, &mnvr::Params::default()).unwrap();
        te.begin_sequence(seq, vehicle.dist_from_route_start_m())
            .unwrap();

        let dt_s = te.params().cycle_period_s;
        let mut finished = false;

        for _ in 0..te.params().max_num_cycles {
            let report = te.proc().unwrap();
            if report.sequence_finished {
                finished = true;
                break;
            }
            if vehicle.is_stopped() {
                finished = te.finish_at_stop();
                break;
            }
            vehicle.step(dt_s);
        }

        // Ends around the end of the slow down at 100 m, allowing for the one
        // cycle lag between command and response
        assert!(finished);
        let dist_m = vehicle.dist_from_route_start_m();
        assert!(dist_m > 99.0 && dist_m < 101.5, "Ended at {} m", dist_m);
        assert_eq!(
            vehicle.last_cmd(),
            Some(SpeedCmd {
                speed_ms: 0.0,
                max_accel_mss: 2.0
            })
        );
        assert_eq!(te.mode(), traj_exec::TrajExecMode::Off);
    }

    #[test]
    fn test_stopped_behind_front_vehicle() {
        let mut p = params();
        p.front_vehicle = Some(FrontVehicleParams {
            init_gap_m: 30.0,
            speed_ms: 0.0,
        });
        p.drive = vec![
            DriveMnvr::SpeedUp {
                start_speed_ms: 0.0,
                target_speed_ms: 10.0,
                max_accel_mss: 2.0,
            },
            DriveMnvr::SteadySpeed {
                target_speed_ms: 10.0,
                max_accel_mss: 2.0,
                length_m: 50.0,
            },
            DriveMnvr::SlowDown {
                start_speed_ms: 10.0,
                target_speed_ms: 0.0,
                max_accel_mss: 2.0,
            },
        ];

        let vehicle = SimVehicle::new(&p);
        let mut te = TrajExec::new(traj_exec::Params::default(), &vehicle, &vehicle);
        let seq = build_sequence(&p.drive, &mnvr::Params::default()).unwrap();
        te.begin_sequence(seq, vehicle.dist_from_route_start_m())
            .unwrap();

        let dt_s = te.params().cycle_period_s;
        let mut stopped_index = None;

        for _ in 0..te.params().max_num_cycles {
            let report = te.proc().unwrap();
            assert!(!report.sequence_finished);
            if vehicle.is_stopped() {
                stopped_index = report.mnvr_index;
                break;
            }
            vehicle.step(dt_s);
        }

        // Held back by the stopped vehicle before the final slow down, which
        // starts at 75 m
        assert!(stopped_index.map_or(false, |i| i < 2), "{:?}", stopped_index);
        assert!(vehicle.dist_from_route_start_m() < 75.0);
        assert!(!te.finish_at_stop());
        assert_eq!(te.mode(), traj_exec::TrajExecMode::Executing);

        te.abort_sequence();
        assert_eq!(te.mode(), traj_exec::TrajExecMode::Off);
    }
}
