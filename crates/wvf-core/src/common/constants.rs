//! Shared numeric constants for the wavefront kernels.
//!
//! Unit scale factors live here so the pupil, SCE and PSF code never carry
//! ad hoc literals for nm/um/mm conversions.

pub const PI: f64 = std::f64::consts::PI;
pub const PI2: f64 = 2.0 * PI;
pub const NM_PER_UM: f64 = 1_000.0;
pub const UM_PER_MM: f64 = 1_000.0;
pub const NM_PER_MM: f64 = NM_PER_UM * UM_PER_MM;
pub const ARCMIN_PER_RADIAN: f64 = 180.0 * 60.0 / PI;

/// Number of OSA/ANSI coefficients addressed by the phase polynomial (j = 0..=64).
pub const MAX_ZERNIKE_COEFFICIENTS: usize = 65;
/// First OSA index entering the phase sum; piston, tip and tilt are skipped.
pub const FIRST_PHASE_TERM: usize = 3;
pub const MAX_RADIAL_ORDER: usize = 10;
/// OSA index of the defocus term Z(2, 0).
pub const DEFOCUS_INDEX: usize = 4;

#[cfg(test)]
mod tests {
    use super::{
        ARCMIN_PER_RADIAN, DEFOCUS_INDEX, FIRST_PHASE_TERM, MAX_RADIAL_ORDER,
        MAX_ZERNIKE_COEFFICIENTS, NM_PER_MM, NM_PER_UM, PI, PI2, UM_PER_MM,
    };

    #[test]
    fn constants_match_expected_relationships() {
        assert!((PI2 - 2.0 * PI).abs() <= f64::EPSILON);
        assert_eq!(NM_PER_MM, NM_PER_UM * UM_PER_MM);
        assert!((ARCMIN_PER_RADIAN * PI - 10_800.0).abs() <= 1.0e-9);
    }

    #[test]
    fn zernike_index_constants_are_consistent() {
        // j = 64 is the last index with n <= 10 that fits in 65 coefficients.
        assert_eq!(MAX_ZERNIKE_COEFFICIENTS, 65);
        assert!(FIRST_PHASE_TERM < DEFOCUS_INDEX);
        assert!((MAX_RADIAL_ORDER * (MAX_RADIAL_ORDER + 3)) / 2 >= MAX_ZERNIKE_COEFFICIENTS - 1);
    }
}
