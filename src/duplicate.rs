//! Field-by-field duplication of records.
//!
//! Every attribute is listed explicitly through exhaustive destructuring, so adding a field to a
//! record kind fails to compile here until the copy handles it.

use crate::edm::{SimTrackerHit, TrackerHitPlane};

/// Makes an independent copy of a `TrackerHitPlane`.
///
/// The constituent links (`raw_hits`) are not copied: they point into the input constituents
/// collection and are re-linked by the caller when constituents are propagated.
pub fn copy_tracker_hit_plane(hit: &TrackerHitPlane) -> TrackerHitPlane {
    let TrackerHitPlane {
        cell_id0,
        cell_id1,
        hit_type,
        position,
        cov_matrix,
        dedx,
        edep,
        edep_error,
        time,
        quality,
        u,
        v,
        du,
        dv,
        raw_hits: _,
    } = hit;

    TrackerHitPlane {
        cell_id0: *cell_id0,
        cell_id1: *cell_id1,
        hit_type: *hit_type,
        position: *position,
        cov_matrix: *cov_matrix,
        dedx: *dedx,
        edep: *edep,
        edep_error: *edep_error,
        time: *time,
        quality: *quality,
        u: *u,
        v: *v,
        du: *du,
        dv: *dv,
        raw_hits: Vec::new(),
    }
}

/// Makes an independent copy of a `SimTrackerHit`, including its MC particle link.
pub fn copy_sim_tracker_hit(hit: &SimTrackerHit) -> SimTrackerHit {
    let SimTrackerHit {
        cell_id0,
        cell_id1,
        position,
        momentum,
        path_length,
        edep,
        time,
        quality,
        mc_particle,
    } = hit;

    SimTrackerHit {
        cell_id0: *cell_id0,
        cell_id1: *cell_id1,
        position: *position,
        momentum: *momentum,
        path_length: *path_length,
        edep: *edep,
        time: *time,
        quality: *quality,
        mc_particle: *mc_particle,
    }
}
