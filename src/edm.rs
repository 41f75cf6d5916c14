//! This module defines the record kinds handled by the hit filter: reconstructed planar tracker hits,
//! simulated tracker hits (raw energy deposits) and the weighted relations linking the two.
//!
//! Records are plain data aggregates. They intentionally do not implement `Clone`; copies are made
//! with the explicit functions in [`crate::duplicate`].

use serde::{Deserialize, Serialize};

/// Marker trait for record kinds that can be stored in a [`crate::event::Collection`].
pub trait Record: std::fmt::Debug + 'static {
    /// Type name reported for collections of this record kind.
    const TYPE_NAME: &'static str;
}

/// Opaque handle to the MC particle that produced a simulated hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct McParticleId(pub u64);

/// A reconstructed tracker hit measured on a planar sensor.
///
/// # Fields
/// - `cell_id0`, `cell_id1`: Encoded sensor/channel identifier.
/// - `hit_type`: Type code assigned by the digitizer.
/// - `position`: Hit position in mm, relative to the interaction point.
/// - `cov_matrix`: Packed lower triangle of the position covariance matrix (xx, yx, yy, zx, zy, zz).
/// - `dedx`, `edep`, `edep_error`: Energy loss and deposited energy (GeV).
/// - `time`: Recorded hit time in ns.
/// - `quality`: Quality bit field.
/// - `u`, `v`: Measurement directions (theta, phi) in rad.
/// - `du`, `dv`: Measurement resolutions along `u` and `v` in mm.
/// - `raw_hits`: Indices of the constituent hits in the associated constituents collection.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerHitPlane {
    pub cell_id0: i32,
    pub cell_id1: i32,
    pub hit_type: i32,
    pub position: [f64; 3],
    pub cov_matrix: [f32; 6],
    pub dedx: f32,
    pub edep: f32,
    pub edep_error: f32,
    pub time: f32,
    pub quality: i32,
    pub u: [f32; 2],
    pub v: [f32; 2],
    pub du: f32,
    pub dv: f32,
    #[serde(default)]
    pub raw_hits: Vec<usize>,
}

impl Record for TrackerHitPlane {
    const TYPE_NAME: &'static str = "TrackerHitPlane";
}

/// A simulated energy deposit in a tracker sensor.
///
/// # Fields
/// - `cell_id0`, `cell_id1`: Encoded sensor/channel identifier.
/// - `position`: Deposit position in mm.
/// - `momentum`: Momentum of the particle at the deposit, in GeV.
/// - `path_length`: Path length of the particle inside the sensitive volume, in mm.
/// - `edep`: Deposited energy (GeV).
/// - `time`: Simulated time in ns.
/// - `quality`: Quality bit field (overlay, produced by secondary, ...).
/// - `mc_particle`: The particle that produced this deposit, if known.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTrackerHit {
    pub cell_id0: i32,
    pub cell_id1: i32,
    pub position: [f64; 3],
    pub momentum: [f32; 3],
    pub path_length: f32,
    pub edep: f32,
    pub time: f32,
    pub quality: i32,
    #[serde(default)]
    pub mc_particle: Option<McParticleId>,
}

impl Record for SimTrackerHit {
    const TYPE_NAME: &'static str = "SimTrackerHit";
}

/// A weighted link from a hit (`from`, index into the hit collection) to a simulated deposit
/// (`to`, index into the deposit collection).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LcRelation {
    pub from: usize,
    pub to: usize,
    pub weight: f32,
}

impl Record for LcRelation {
    const TYPE_NAME: &'static str = "LCRelation";
}
