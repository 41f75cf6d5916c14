//! Time-of-flight correction of hit times.
//!
//! Positions are in mm and times in ns. The interaction point is assumed to sit at the origin.

use crate::edm::TrackerHitPlane;

/// Speed of light in mm/ns.
pub const SPEED_OF_LIGHT_MM_PER_NS: f64 = 299.792_458;

/// Time needed to cover `distance` (mm) at `beta * c`, in ns.
pub fn time_of_flight(distance: f64, beta: f64) -> f64 {
    distance / (beta * SPEED_OF_LIGHT_MM_PER_NS)
}

/// Distance of a position from the origin.
pub fn path_length(position: &[f64; 3]) -> f64 {
    position.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Hit time with the flight time from the origin subtracted.
///
/// A hit at the origin keeps its recorded time. `beta` is expected in (0, 1]; it is validated
/// once when the processor is initialised.
pub fn corrected_time(hit: &TrackerHitPlane, beta: f64) -> f64 {
    hit.time as f64 - time_of_flight(path_length(&hit.position), beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn hit_at(position: [f64; 3], time: f32) -> TrackerHitPlane {
        TrackerHitPlane {
            position,
            time,
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_at_300_mm_moving_at_c() {
        let hit = hit_at([0.0, 0.0, 300.0], 5.0);
        let t = corrected_time(&hit, 1.0);
        assert_abs_diff_eq!(t, 5.0 - 300.0 / 299.792458, epsilon = 1e-12);
        assert_abs_diff_eq!(t, 3.9994, epsilon = 1e-4);
    }

    #[test]
    fn test_origin_keeps_recorded_time() {
        let hit = hit_at([0.0, 0.0, 0.0], 2.5);
        assert_eq!(corrected_time(&hit, 0.3), 2.5);
    }

    #[test]
    fn test_path_length_uses_all_three_coordinates() {
        assert_abs_diff_eq!(path_length(&[3.0, 4.0, 12.0]), 13.0, epsilon = 1e-12);
    }

    #[test]
    fn test_monotonic_in_time_and_beta() {
        let position = [100.0, -50.0, 800.0];
        let mut previous = f64::NEG_INFINITY;
        for time in [-3.0_f32, 0.0, 0.5, 7.0, 42.0] {
            let t = corrected_time(&hit_at(position, time), 0.8);
            assert!(t >= previous);
            previous = t;
        }

        // a slower particle needs longer to reach the hit, so less time is left after correction
        let hit = hit_at(position, 1.0);
        let mut previous = f64::INFINITY;
        for beta in [1.0, 0.9, 0.5, 0.25, 0.1] {
            let t = corrected_time(&hit, beta);
            assert!(t <= previous);
            previous = t;
        }
    }
}
