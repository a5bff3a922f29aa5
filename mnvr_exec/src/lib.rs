//! # Longitudinal manoeuvre library.
//!
//! This library provides the manoeuvre execution core of the guidance stack,
//! converting desired speed profiles into bounded speed commands for the
//! vehicle's longitudinal controller.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Manoeuvre module - the manoeuvre lifecycle, ACC override and manoeuvre variants
pub mod mnvr;

/// Trajectory execution module - plans and steps sequences of manoeuvres
pub mod traj_exec;

/// Simulation module - a point mass vehicle for exercising the manoeuvres
pub mod sim;
