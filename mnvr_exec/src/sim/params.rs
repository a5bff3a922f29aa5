//! Simulation parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::DriveMnvr;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulated drive
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Params {
    /// Initial distance along the route.
    ///
    /// Units: meters
    pub init_dist_m: f64,

    /// Initial speed of the vehicle.
    ///
    /// Units: meters/second
    pub init_speed_ms: f64,

    /// The vehicle in front, if any.
    #[serde(default)]
    pub front_vehicle: Option<FrontVehicleParams>,

    /// The manoeuvres to drive, in order.
    pub drive: Vec<DriveMnvr>,
}

/// A vehicle ahead travelling at constant speed
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct FrontVehicleParams {
    /// Initial gap between the vehicles.
    ///
    /// Units: meters
    pub init_gap_m: f64,

    /// Units: meters/second
    pub speed_ms: f64,
}
