//! OSA/ANSI Zernike basis on the unit disk.
//!
//! Terms are generated from the closed-form radial sum
//!
//! `R_n^m(rho) = sum_k (-1)^k (n-k)! / (k! ((n+m)/2-k)! ((n-m)/2-k)!) rho^(n-2k)`
//!
//! with normalization `sqrt(n+1)` for `m == 0` and `sqrt(2(n+1))` otherwise.
//! Negative `m` pairs with `sin(|m| theta)`, positive `m` with `cos(m theta)`.

use crate::common::constants::{
    DEFOCUS_INDEX, FIRST_PHASE_TERM, MAX_RADIAL_ORDER, MAX_ZERNIKE_COEFFICIENTS,
};
use crate::common::units::defocus_diopters_to_microns;
use std::sync::LazyLock;

/// Largest radial order the factorial table supports without overflow.
const MAX_SUPPORTED_ORDER: usize = 20;

const _: () = assert!(MAX_ZERNIKE_COEFFICIENTS <= osa_index_upper_bound(MAX_SUPPORTED_ORDER));

static PHASE_TERMS: LazyLock<Vec<ZernikeTerm>> = LazyLock::new(|| {
    (FIRST_PHASE_TERM..MAX_ZERNIKE_COEFFICIENTS)
        .map(|osa_index| {
            ZernikeTerm::for_osa_index(osa_index)
                .expect("OSA indices below MAX_ZERNIKE_COEFFICIENTS fit the factorial table")
        })
        .collect()
});

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZernikeError {
    #[error("Zernike coefficient vector has {count} entries, at most {max} are supported")]
    TooManyCoefficients { count: usize, max: usize },
    #[error("Zernike coefficient {index} is not finite: {value}")]
    NonFiniteCoefficient { index: usize, value: f64 },
    #[error("OSA index {index} is outside the supported range 0..{max}")]
    IndexOutOfRange { index: usize, max: usize },
    #[error("no Zernike polynomial for radial order {n} and azimuthal frequency {m}")]
    InvalidOrder { n: usize, m: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Azimuthal {
    Radial,
    Cosine,
    Sine,
}

impl Azimuthal {
    pub const fn for_frequency(m: i32) -> Self {
        if m == 0 {
            Self::Radial
        } else if m > 0 {
            Self::Cosine
        } else {
            Self::Sine
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Radial => "1",
            Self::Cosine => "cos",
            Self::Sine => "sin",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZernikeTerm {
    pub osa_index: usize,
    pub radial_order: usize,
    pub azimuthal_frequency: i32,
    pub azimuthal: Azimuthal,
    pub normalization: f64,
    /// `(power, coefficient)` pairs in decreasing power of `rho`.
    pub radial_coefficients: Vec<(usize, f64)>,
}

impl ZernikeTerm {
    pub fn for_osa_index(osa_index: usize) -> Result<Self, ZernikeError> {
        let max_index = osa_index_upper_bound(MAX_SUPPORTED_ORDER);
        if osa_index >= max_index {
            return Err(ZernikeError::IndexOutOfRange {
                index: osa_index,
                max: max_index,
            });
        }

        let (n, m) = radial_order_and_frequency(osa_index);
        let normalization = if m == 0 {
            ((n + 1) as f64).sqrt()
        } else {
            (2.0 * (n + 1) as f64).sqrt()
        };

        Ok(Self {
            osa_index,
            radial_order: n,
            azimuthal_frequency: m,
            azimuthal: Azimuthal::for_frequency(m),
            normalization,
            radial_coefficients: radial_coefficients(n, m)?,
        })
    }

    pub fn radial(&self, rho: f64) -> f64 {
        self.radial_coefficients
            .iter()
            .map(|&(power, coefficient)| coefficient * rho.powi(power as i32))
            .sum()
    }

    pub fn angular(&self, theta: f64) -> f64 {
        let frequency = self.azimuthal_frequency.unsigned_abs() as f64;
        match self.azimuthal {
            Azimuthal::Radial => 1.0,
            Azimuthal::Cosine => (frequency * theta).cos(),
            Azimuthal::Sine => (frequency * theta).sin(),
        }
    }

    pub fn evaluate(&self, rho: f64, theta: f64) -> f64 {
        self.normalization * self.radial(rho) * self.angular(theta)
    }

    /// Evaluates the term from precomputed powers and harmonics of one sample.
    pub fn evaluate_sample(&self, sample: &PolarSample) -> f64 {
        let radial: f64 = self
            .radial_coefficients
            .iter()
            .map(|&(power, coefficient)| coefficient * sample.powers[power])
            .sum();
        let harmonic = self.azimuthal_frequency.unsigned_abs() as usize;
        let angular = match self.azimuthal {
            Azimuthal::Radial => 1.0,
            Azimuthal::Cosine => sample.cosines[harmonic],
            Azimuthal::Sine => sample.sines[harmonic],
        };

        self.normalization * radial * angular
    }

    /// Human-readable closed form, e.g. `sqrt(3) * (2 r^2 - 1)`.
    pub fn describe(&self) -> String {
        let mut polynomial = String::new();
        for (position, &(power, coefficient)) in self.radial_coefficients.iter().enumerate() {
            let magnitude = coefficient.abs();
            if position == 0 {
                if coefficient < 0.0 {
                    polynomial.push('-');
                }
            } else {
                polynomial.push_str(if coefficient < 0.0 { " - " } else { " + " });
            }

            let show_magnitude = magnitude != 1.0 || power == 0;
            if show_magnitude {
                polynomial.push_str(&format!("{magnitude}"));
            }
            match power {
                0 => {}
                1 => polynomial.push_str(if show_magnitude { " r" } else { "r" }),
                _ => {
                    if show_magnitude {
                        polynomial.push(' ');
                    }
                    polynomial.push_str(&format!("r^{power}"));
                }
            }
        }

        let normalization_squared = self.normalization * self.normalization;
        let mut rendered = format!("sqrt({}) * ", normalization_squared.round());
        if self.radial_coefficients.len() > 1 {
            rendered.push_str(&format!("({polynomial})"));
        } else {
            rendered.push_str(&polynomial);
        }

        if self.azimuthal != Azimuthal::Radial {
            rendered.push_str(&format!(
                " * {}({} t)",
                self.azimuthal.as_str(),
                self.azimuthal_frequency.unsigned_abs()
            ));
        }

        rendered
    }
}

/// Powers of `rho` and harmonics of `theta` shared by every term at one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarSample {
    pub rho: f64,
    pub theta: f64,
    powers: [f64; MAX_RADIAL_ORDER + 1],
    cosines: [f64; MAX_RADIAL_ORDER + 1],
    sines: [f64; MAX_RADIAL_ORDER + 1],
}

impl PolarSample {
    pub fn new(rho: f64, theta: f64) -> Self {
        let mut powers = [1.0; MAX_RADIAL_ORDER + 1];
        let mut cosines = [1.0; MAX_RADIAL_ORDER + 1];
        let mut sines = [0.0; MAX_RADIAL_ORDER + 1];
        for order in 1..=MAX_RADIAL_ORDER {
            powers[order] = rho.powi(order as i32);
            let angle = order as f64 * theta;
            cosines[order] = angle.cos();
            sines[order] = angle.sin();
        }

        Self {
            rho,
            theta,
            powers,
            cosines,
            sines,
        }
    }
}

/// Fixed-length OSA coefficient vector in micrometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZernikeCoefficients {
    values: [f64; MAX_ZERNIKE_COEFFICIENTS],
}

impl Default for ZernikeCoefficients {
    fn default() -> Self {
        Self::zeros()
    }
}

impl ZernikeCoefficients {
    pub const fn zeros() -> Self {
        Self {
            values: [0.0; MAX_ZERNIKE_COEFFICIENTS],
        }
    }

    /// Pads `values` with zeros up to the full 65-entry vector.
    pub fn from_slice(values: &[f64]) -> Result<Self, ZernikeError> {
        if values.len() > MAX_ZERNIKE_COEFFICIENTS {
            return Err(ZernikeError::TooManyCoefficients {
                count: values.len(),
                max: MAX_ZERNIKE_COEFFICIENTS,
            });
        }

        let mut coefficients = Self::zeros();
        for (index, &value) in values.iter().enumerate() {
            coefficients.set(index, value)?;
        }

        Ok(coefficients)
    }

    pub fn get(&self, osa_index: usize) -> Option<f64> {
        self.values.get(osa_index).copied()
    }

    pub fn set(&mut self, osa_index: usize, value: f64) -> Result<(), ZernikeError> {
        if !value.is_finite() {
            return Err(ZernikeError::NonFiniteCoefficient {
                index: osa_index,
                value,
            });
        }

        let slot = self
            .values
            .get_mut(osa_index)
            .ok_or(ZernikeError::IndexOutOfRange {
                index: osa_index,
                max: MAX_ZERNIKE_COEFFICIENTS,
            })?;
        *slot = value;
        Ok(())
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Adds the defocus (OSA j = 4) equivalent of `diopters` over the given pupil.
    pub fn add_defocus_diopters(&mut self, diopters: f64, pupil_diameter_mm: f64) {
        self.values[DEFOCUS_INDEX] += defocus_diopters_to_microns(diopters, pupil_diameter_mm);
    }

    /// True when every coefficient entering the phase sum is zero.
    pub fn is_aberration_free(&self) -> bool {
        self.values[FIRST_PHASE_TERM..]
            .iter()
            .all(|value| *value == 0.0)
    }
}

pub fn osa_index(n: usize, m: i32) -> Option<usize> {
    let n_i64 = n as i64;
    let m_i64 = i64::from(m);
    if m_i64.abs() > n_i64 || (n_i64 - m_i64).rem_euclid(2) != 0 {
        return None;
    }

    usize::try_from((n_i64 * (n_i64 + 2) + m_i64) / 2).ok()
}

pub fn radial_order_and_frequency(osa_index: usize) -> (usize, i32) {
    let mut n = 0usize;
    while (n + 1) * (n + 2) / 2 <= osa_index {
        n += 1;
    }

    let m = 2 * osa_index as i64 - (n * (n + 2)) as i64;
    (n, m as i32)
}

pub fn radial_coefficients(n: usize, m: i32) -> Result<Vec<(usize, f64)>, ZernikeError> {
    let m_abs = m.unsigned_abs() as usize;
    if n > MAX_SUPPORTED_ORDER || m_abs > n || (n - m_abs) % 2 != 0 {
        return Err(ZernikeError::InvalidOrder { n, m });
    }

    let half_sum = (n + m_abs) / 2;
    let half_difference = (n - m_abs) / 2;
    let mut coefficients = Vec::with_capacity(half_difference + 1);
    for k in 0..=half_difference {
        let magnitude = factorial(n - k)
            / (factorial(k) * factorial(half_sum - k) * factorial(half_difference - k));
        let signed = if k % 2 == 0 {
            magnitude as f64
        } else {
            -(magnitude as f64)
        };
        coefficients.push((n - 2 * k, signed));
    }

    Ok(coefficients)
}

/// Phase-polynomial terms, OSA j = 3 through 64.
pub fn zernike_term_table() -> &'static [ZernikeTerm] {
    &PHASE_TERMS
}

pub fn zernike_value(osa_index: usize, rho: f64, theta: f64) -> Result<f64, ZernikeError> {
    if let Some(term) = zernike_term_table()
        .iter()
        .find(|term| term.osa_index == osa_index)
    {
        return Ok(term.evaluate(rho, theta));
    }

    Ok(ZernikeTerm::for_osa_index(osa_index)?.evaluate(rho, theta))
}

/// Wavefront (um) at normalized radius `rho` and angle `theta`.
pub fn phase_at(coefficients: &ZernikeCoefficients, rho: f64, theta: f64) -> f64 {
    phase_at_sample(coefficients, &PolarSample::new(rho, theta))
}

pub fn phase_at_sample(coefficients: &ZernikeCoefficients, sample: &PolarSample) -> f64 {
    let mut phase = 0.0;
    for term in zernike_term_table() {
        let coefficient = coefficients.values[term.osa_index];
        if coefficient != 0.0 {
            phase += coefficient * term.evaluate_sample(sample);
        }
    }

    phase
}

const fn osa_index_upper_bound(max_order: usize) -> usize {
    (max_order + 1) * (max_order + 2) / 2
}

fn factorial(value: usize) -> u64 {
    (1..=value as u64).product()
}

#[cfg(test)]
mod tests {
    use super::{
        osa_index, phase_at, radial_coefficients, radial_order_and_frequency, zernike_term_table,
        zernike_value, Azimuthal, PolarSample, ZernikeCoefficients, ZernikeError, ZernikeTerm,
    };
    use crate::common::constants::{FIRST_PHASE_TERM, MAX_ZERNIKE_COEFFICIENTS, PI, PI2};

    #[test]
    fn osa_indexing_matches_standard_ordering() {
        let known = [
            (0, (0, 0)),
            (1, (1, -1)),
            (2, (1, 1)),
            (3, (2, -2)),
            (4, (2, 0)),
            (5, (2, 2)),
            (7, (3, -1)),
            (8, (3, 1)),
            (12, (4, 0)),
            (24, (6, 0)),
            (40, (8, 0)),
            (55, (10, -10)),
            (60, (10, 0)),
            (64, (10, 8)),
        ];

        for (index, expected) in known {
            assert_eq!(radial_order_and_frequency(index), expected, "j={index}");
        }

        for index in 0..66 {
            let (n, m) = radial_order_and_frequency(index);
            assert_eq!(osa_index(n, m), Some(index), "round trip for j={index}");
        }

        assert_eq!(osa_index(2, 1), None);
        assert_eq!(osa_index(2, -4), None);
    }

    #[test]
    fn radial_coefficients_match_closed_forms() {
        assert_eq!(
            radial_coefficients(4, 0).expect("R_4^0"),
            vec![(4, 6.0), (2, -6.0), (0, 1.0)]
        );
        assert_eq!(
            radial_coefficients(3, -1).expect("R_3^1"),
            vec![(3, 3.0), (1, -2.0)]
        );
        assert_eq!(
            radial_coefficients(10, 0).expect("R_10^0"),
            vec![
                (10, 252.0),
                (8, -630.0),
                (6, 560.0),
                (4, -210.0),
                (2, 30.0),
                (0, -1.0)
            ]
        );
        assert_eq!(
            radial_coefficients(10, 8).expect("R_10^8"),
            vec![(10, 10.0), (8, -9.0)]
        );
        assert_eq!(
            radial_coefficients(3, 0),
            Err(ZernikeError::InvalidOrder { n: 3, m: 0 })
        );
    }

    #[test]
    fn table_covers_osa_three_through_sixty_four() {
        let table = zernike_term_table();
        assert_eq!(table.len(), MAX_ZERNIKE_COEFFICIENTS - FIRST_PHASE_TERM);
        assert_eq!(table.len(), 62);
        assert_eq!(table.first().map(|term| term.osa_index), Some(3));
        assert_eq!(table.last().map(|term| term.osa_index), Some(64));
        assert!(table.iter().all(|term| term.radial_order <= 10));
        assert!(
            table
                .windows(2)
                .all(|pair| pair[1].osa_index == pair[0].osa_index + 1)
        );
    }

    #[test]
    fn every_radial_polynomial_is_one_at_the_rim() {
        for term in zernike_term_table() {
            let rim = term.radial(1.0);
            assert!(
                (rim - 1.0).abs() <= 1.0e-12,
                "R for j={} at rho=1 was {rim}",
                term.osa_index
            );
        }
    }

    #[test]
    fn table_matches_literal_closed_form_expressions() {
        type Literal = fn(f64, f64) -> f64;
        let literals: [(usize, Literal); 14] = [
            (3, |r: f64, t: f64| 6.0_f64.sqrt() * r.powi(2) * (2.0 * t).sin()),
            (4, |r: f64, _: f64| 3.0_f64.sqrt() * (2.0 * r.powi(2) - 1.0)),
            (5, |r: f64, t: f64| 6.0_f64.sqrt() * r.powi(2) * (2.0 * t).cos()),
            (6, |r: f64, t: f64| 8.0_f64.sqrt() * r.powi(3) * (3.0 * t).sin()),
            (7, |r: f64, t: f64| 8.0_f64.sqrt() * (3.0 * r.powi(3) - 2.0 * r) * t.sin()),
            (8, |r: f64, t: f64| 8.0_f64.sqrt() * (3.0 * r.powi(3) - 2.0 * r) * t.cos()),
            (
                11,
                |r: f64, t: f64| 10.0_f64.sqrt() * (4.0 * r.powi(4) - 3.0 * r.powi(2)) * (2.0 * t).sin(),
            ),
            (
                12,
                |r: f64, _: f64| 5.0_f64.sqrt() * (6.0 * r.powi(4) - 6.0 * r.powi(2) + 1.0),
            ),
            (
                17,
                |r: f64, t: f64| {
                    12.0_f64.sqrt()
                        * (10.0 * r.powi(5) - 12.0 * r.powi(3) + 3.0 * r)
                        * t.sin()
                },
            ),
            (
                24,
                |r: f64, _: f64| {
                    7.0_f64.sqrt()
                        * (20.0 * r.powi(6) - 30.0 * r.powi(4) + 12.0 * r.powi(2) - 1.0)
                },
            ),
            (
                40,
                |r: f64, _: f64| {
                    3.0 * (70.0 * r.powi(8) - 140.0 * r.powi(6) + 90.0 * r.powi(4)
                        - 20.0 * r.powi(2)
                        + 1.0)
                },
            ),
            (
                56,
                |r: f64, t: f64| 22.0_f64.sqrt() * (10.0 * r.powi(10) - 9.0 * r.powi(8)) * (8.0 * t).sin(),
            ),
            (
                60,
                |r: f64, _: f64| {
                    11.0_f64.sqrt()
                        * (252.0 * r.powi(10) - 630.0 * r.powi(8) + 560.0 * r.powi(6)
                            - 210.0 * r.powi(4)
                            + 30.0 * r.powi(2)
                            - 1.0)
                },
            ),
            (
                64,
                |r: f64, t: f64| 22.0_f64.sqrt() * (10.0 * r.powi(10) - 9.0 * r.powi(8)) * (8.0 * t).cos(),
            ),
        ];

        let samples = [(0.0, 0.0), (0.3, 1.1), (0.55, -2.4), (0.8, 0.25), (1.0, PI)];
        for (index, literal) in literals {
            for (rho, theta) in samples {
                let expected = literal(rho, theta);
                let actual = zernike_value(index, rho, theta).expect("term exists");
                let sample_value = zernike_term_table()[index - 3]
                    .evaluate_sample(&PolarSample::new(rho, theta));
                for (label, value) in [("evaluate", actual), ("evaluate_sample", sample_value)] {
                    assert!(
                        (value - expected).abs() <= 1.0e-12 * expected.abs().max(1.0),
                        "{label} j={index} rho={rho} theta={theta}: expected {expected}, got {value}"
                    );
                }
            }
        }
    }

    #[test]
    fn terms_are_orthonormal_over_the_unit_disk() {
        // Angular integrals are exact for uniform sampling; radial ones are done analytically.
        const ANGULAR_SAMPLES: usize = 64;
        let table = zernike_term_table();
        for lhs in table {
            for rhs in table {
                let mut angular = 0.0;
                for sample in 0..ANGULAR_SAMPLES {
                    let theta = PI2 * sample as f64 / ANGULAR_SAMPLES as f64;
                    angular += lhs.angular(theta) * rhs.angular(theta);
                }
                angular *= PI2 / ANGULAR_SAMPLES as f64;

                let mut radial = 0.0;
                for &(p, a) in &lhs.radial_coefficients {
                    for &(q, b) in &rhs.radial_coefficients {
                        radial += a * b / (p + q + 2) as f64;
                    }
                }

                let inner = lhs.normalization * rhs.normalization * radial * angular / PI;
                let expected = if lhs.osa_index == rhs.osa_index {
                    1.0
                } else {
                    0.0
                };
                assert!(
                    (inner - expected).abs() <= 1.0e-9,
                    "<Z{}, Z{}> = {inner}",
                    lhs.osa_index,
                    rhs.osa_index
                );
            }
        }
    }

    #[test]
    fn coefficient_vector_pads_and_validates() {
        let coefficients = ZernikeCoefficients::from_slice(&[0.0, 0.1, 0.2, 0.3]).expect("pad");
        assert_eq!(coefficients.as_slice().len(), 65);
        assert_eq!(coefficients.get(3), Some(0.3));
        assert_eq!(coefficients.get(64), Some(0.0));
        assert_eq!(coefficients.get(65), None);

        let too_long = vec![0.0; 66];
        assert_eq!(
            ZernikeCoefficients::from_slice(&too_long),
            Err(ZernikeError::TooManyCoefficients { count: 66, max: 65 })
        );

        let error = ZernikeCoefficients::from_slice(&[0.0, f64::NAN]).expect_err("nan");
        assert!(matches!(
            error,
            ZernikeError::NonFiniteCoefficient { index: 1, .. }
        ));

        let mut coefficients = ZernikeCoefficients::zeros();
        assert!(coefficients.set(65, 1.0).is_err());
    }

    #[test]
    fn piston_tip_and_tilt_never_enter_the_phase() {
        let coefficients =
            ZernikeCoefficients::from_slice(&[5.0, -3.0, 2.0]).expect("coefficients");
        assert!(coefficients.is_aberration_free());
        for (rho, theta) in [(0.0, 0.0), (0.4, 0.7), (1.0, -1.3)] {
            assert_eq!(phase_at(&coefficients, rho, theta), 0.0);
        }
    }

    #[test]
    fn phase_sums_weighted_terms() {
        let mut values = vec![0.0; 13];
        values[4] = 0.25;
        values[12] = -0.1;
        let coefficients = ZernikeCoefficients::from_slice(&values).expect("coefficients");

        let (rho, theta) = (0.6, 0.9);
        let expected = 0.25 * 3.0_f64.sqrt() * (2.0 * rho * rho - 1.0)
            - 0.1 * 5.0_f64.sqrt() * (6.0 * rho.powi(4) - 6.0 * rho * rho + 1.0);
        let actual = phase_at(&coefficients, rho, theta);
        assert!((actual - expected).abs() <= 1.0e-14);
    }

    #[test]
    fn defocus_helper_adds_to_osa_four() {
        let mut coefficients = ZernikeCoefficients::zeros();
        coefficients.add_defocus_diopters(1.0, 4.0);
        let expected = 16.0 / (16.0 * 3.0_f64.sqrt());
        assert!((coefficients.get(4).expect("defocus") - expected).abs() <= 1.0e-15);
        assert!(!coefficients.is_aberration_free());
    }

    #[test]
    fn term_descriptions_render_closed_forms() {
        let defocus = ZernikeTerm::for_osa_index(4).expect("defocus");
        assert_eq!(defocus.azimuthal, Azimuthal::Radial);
        assert_eq!(defocus.describe(), "sqrt(3) * (2 r^2 - 1)");

        let astigmatism = ZernikeTerm::for_osa_index(3).expect("astigmatism");
        assert_eq!(astigmatism.describe(), "sqrt(6) * r^2 * sin(2 t)");

        let coma = ZernikeTerm::for_osa_index(8).expect("coma");
        assert_eq!(coma.describe(), "sqrt(8) * (3 r^3 - 2 r) * cos(1 t)");

        assert!(matches!(
            ZernikeTerm::for_osa_index(231),
            Err(ZernikeError::IndexOutOfRange { index: 231, .. })
        ));
    }
}
