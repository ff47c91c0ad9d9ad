//! Point-spread function from a computed pupil function.
//!
//! The PSF is `|FFT2(pupil)|^2`, shifted so the zero-frequency sample lands at
//! index `N / 2` on both axes, divided by `illuminated_pixel_count^2`. With that
//! divisor an unapodized aberration-free pupil peaks at exactly one, so the peak
//! of an aberrated PSF is its Strehl ratio.

use crate::common::constants::ARCMIN_PER_RADIAN;
use crate::common::units::nm_to_mm;
use crate::domain::{GridAxis, RealGrid, WvfError};
use crate::pupil::PupilFunctionOutput;
use num_complex::Complex64;
use rustfft::FftPlanner;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PsfError {
    #[error("pupil function has no illuminated pixels")]
    EmptyAperture,
    #[error("pupil function grid must be square, got {rows}x{cols}")]
    NonSquareGrid { rows: usize, cols: usize },
}

impl From<PsfError> for WvfError {
    fn from(error: PsfError) -> Self {
        let placeholder = match error {
            PsfError::EmptyAperture => "RUN.PSF_EMPTY_APERTURE",
            PsfError::NonSquareGrid { .. } => "RUN.PSF_GRID_SHAPE",
        };
        WvfError::computation(placeholder, error.to_string())
    }
}

pub trait PsfTransform {
    fn transform(&self, pupil: &PupilFunctionOutput) -> Result<PointSpreadFunction, PsfError>;
}

/// Dense two-dimensional FFT transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct FftPsfTransform;

impl PsfTransform for FftPsfTransform {
    fn transform(&self, pupil: &PupilFunctionOutput) -> Result<PointSpreadFunction, PsfError> {
        let field = &pupil.pupil_function;
        let (rows, cols) = (field.nrows(), field.ncols());
        if rows != cols {
            return Err(PsfError::NonSquareGrid { rows, cols });
        }

        if pupil.illuminated_pixel_count == 0 {
            return Err(PsfError::EmptyAperture);
        }

        let pixels = rows;
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(pixels);

        // Row-major buffer: transform along ny, transpose, transform along nx.
        let mut buffer = vec![Complex64::new(0.0, 0.0); pixels * pixels];
        for nx in 0..pixels {
            for ny in 0..pixels {
                buffer[nx * pixels + ny] = field[(nx, ny)];
            }
        }
        fft.process(&mut buffer);

        let mut transposed = vec![Complex64::new(0.0, 0.0); pixels * pixels];
        for nx in 0..pixels {
            for ny in 0..pixels {
                transposed[ny * pixels + nx] = buffer[nx * pixels + ny];
            }
        }
        fft.process(&mut transposed);

        let normalization = (pupil.illuminated_pixel_count as f64).powi(2);
        let half = pixels / 2;
        let mut intensity = RealGrid::zeros(pixels, pixels);
        for ky in 0..pixels {
            for kx in 0..pixels {
                let value = transposed[ky * pixels + kx].norm_sqr() / normalization;
                intensity[((kx + half) % pixels, (ky + half) % pixels)] = value;
            }
        }

        let psf = PointSpreadFunction {
            intensity,
            wavelength_nm: pupil.wavelength_nm,
            field_size_mm: pupil.field_size_mm,
        };
        debug!(
            pixels,
            peak = psf.peak(),
            spacing_arcmin = psf.sample_spacing_arcmin(),
            "point-spread function computed"
        );

        Ok(psf)
    }
}

/// Strehl-normalized PSF sampled on the angular grid conjugate to the pupil grid.
#[derive(Debug, Clone)]
pub struct PointSpreadFunction {
    intensity: RealGrid,
    wavelength_nm: f64,
    field_size_mm: f64,
}

impl PointSpreadFunction {
    pub fn intensity(&self) -> &RealGrid {
        &self.intensity
    }

    pub fn pixels(&self) -> usize {
        self.intensity.nrows()
    }

    pub fn wavelength_nm(&self) -> f64 {
        self.wavelength_nm
    }

    /// Index of the zero-angle sample on both axes.
    pub fn center_index(&self) -> usize {
        self.pixels() / 2
    }

    pub fn center_value(&self) -> f64 {
        let center = self.center_index();
        self.intensity[(center, center)]
    }

    pub fn peak(&self) -> f64 {
        let pixels = self.pixels();
        let mut peak = f64::NEG_INFINITY;
        for kx in 0..pixels {
            for ky in 0..pixels {
                peak = peak.max(self.intensity[(kx, ky)]);
            }
        }
        peak
    }

    pub fn total(&self) -> f64 {
        let pixels = self.pixels();
        let mut total = 0.0;
        for kx in 0..pixels {
            for ky in 0..pixels {
                total += self.intensity[(kx, ky)];
            }
        }
        total
    }

    /// Slice through the center. [`GridAxis::Row`] fixes the first index.
    pub fn cross_section(&self, axis: GridAxis) -> Vec<f64> {
        let center = self.center_index();
        (0..self.pixels())
            .map(|index| match axis {
                GridAxis::Row => self.intensity[(center, index)],
                GridAxis::Column => self.intensity[(index, center)],
            })
            .collect()
    }

    pub fn sample_spacing_arcmin(&self) -> f64 {
        nm_to_mm(self.wavelength_nm) / self.field_size_mm * ARCMIN_PER_RADIAN
    }

    pub fn angular_positions_arcmin(&self) -> Vec<f64> {
        let spacing = self.sample_spacing_arcmin();
        let center = self.center_index() as f64;
        (0..self.pixels())
            .map(|index| (index as f64 - center) * spacing)
            .collect()
    }
}

pub fn compute_psf(pupil: &PupilFunctionOutput) -> Result<PointSpreadFunction, PsfError> {
    FftPsfTransform.transform(pupil)
}
