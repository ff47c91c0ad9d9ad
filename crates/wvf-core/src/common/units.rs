//! Length and vergence conversions used at the parameter boundary.
//!
//! Zernike coefficients are in micrometres, pupil geometry in millimetres and
//! wavelengths in nanometres.

use super::constants::{NM_PER_MM, NM_PER_UM};

pub fn nm_to_um(nanometers: f64) -> f64 {
    nanometers / NM_PER_UM
}

pub fn nm_to_mm(nanometers: f64) -> f64 {
    nanometers / NM_PER_MM
}

/// Defocus Zernike coefficient (um) equivalent to `diopters` of spherical
/// vergence over a pupil of `pupil_diameter_mm`.
pub fn defocus_diopters_to_microns(diopters: f64, pupil_diameter_mm: f64) -> f64 {
    diopters * pupil_diameter_mm * pupil_diameter_mm / (16.0 * 3.0_f64.sqrt())
}

/// Spherical vergence equivalent to a defocus coefficient, the inverse of
/// [`defocus_diopters_to_microns`].
pub fn defocus_microns_to_diopters(microns: f64, pupil_diameter_mm: f64) -> f64 {
    microns * 16.0 * 3.0_f64.sqrt() / (pupil_diameter_mm * pupil_diameter_mm)
}

#[cfg(test)]
mod tests {
    use super::{defocus_diopters_to_microns, defocus_microns_to_diopters, nm_to_mm, nm_to_um};

    #[test]
    fn wavelength_conversions_use_expected_scales() {
        assert_eq!(nm_to_um(550.0), 0.55);
        assert_eq!(nm_to_um(450.0), 0.45);
        assert!((nm_to_mm(550.0) - 5.5e-4).abs() <= 1.0e-18);
    }

    #[test]
    fn defocus_conversion_matches_paraxial_relation() {
        // W(r) = D r^2 / 2 maps onto c4 * sqrt(3) * (2 rho^2 - 1) with c4 = D R^2 / (4 sqrt 3).
        let microns = defocus_diopters_to_microns(1.0, 6.0);
        assert!((microns - 9.0 / (4.0 * 3.0_f64.sqrt())).abs() <= 1.0e-12);

        let diopters = defocus_microns_to_diopters(microns, 6.0);
        assert!((diopters - 1.0).abs() <= 1.0e-12);
        assert_eq!(defocus_diopters_to_microns(0.0, 3.0), 0.0);
    }
}
