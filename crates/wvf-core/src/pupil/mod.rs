mod model;
mod validation;

pub use model::{
    PupilEvaluation, PupilFunctionComputation, PupilFunctionOutput, WavefrontParameters,
};

use crate::common::constants::PI2;
use crate::common::units::nm_to_um;
use crate::domain::{ComplexGrid, RealGrid, WvfResult};
use crate::numerics::{phase_at_sample, PolarSample};
use crate::sce::amplitude_grid;
use num_complex::Complex64;
use tracing::{debug, warn};
use validation::validate_parameters;

pub trait PupilFunctionApi {
    /// Computes the pupil function into `params.output` and returns the phase
    /// and amplitude grids. On error `params` is left untouched.
    fn compute(&self, params: &mut WavefrontParameters) -> WvfResult<PupilFunctionComputation>;
}

/// Stateless pupil-function evaluator; one instance can serve any number of callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PupilFunctionEngine;

impl PupilFunctionEngine {
    pub fn evaluate(&self, params: &WavefrontParameters) -> WvfResult<PupilEvaluation> {
        let inputs = validate_parameters(params)?;
        for warning in &inputs.warnings {
            warn!(placeholder = warning.placeholder(), "{}", warning.message());
        }

        let pixels = inputs.grid.pixels();
        let positions = inputs.grid.positions_mm();
        let wavelength_um = nm_to_um(inputs.wavelength_nm);
        let amplitude = amplitude_grid(&inputs.grid, inputs.sce);

        let mut phase_um = RealGrid::zeros(pixels, pixels);
        let mut pupil_function = ComplexGrid::zeros(pixels, pixels);
        let mut illuminated_pixel_count = 0usize;
        let mut apodized_area_sum = 0.0;

        for (nx, &xpos) in positions.iter().enumerate() {
            for (ny, &ypos) in positions.iter().enumerate() {
                let norm_radius = (xpos * xpos + ypos * ypos).sqrt() / inputs.measured_radius_mm;
                if norm_radius > inputs.aperture_ratio {
                    continue;
                }

                let sample = PolarSample::new(norm_radius, ypos.atan2(xpos));
                let phase = phase_at_sample(&inputs.coefficients, &sample);
                let value = Complex64::from_polar(amplitude[(nx, ny)], -PI2 * phase / wavelength_um);

                phase_um[(nx, ny)] = phase;
                pupil_function[(nx, ny)] = value;
                illuminated_pixel_count += 1;
                apodized_area_sum += value.norm();
            }
        }

        debug!(
            pixels,
            wavelength_nm = inputs.wavelength_nm,
            aperture_ratio = inputs.aperture_ratio,
            apodized = inputs.sce.is_some(),
            illuminated_pixel_count,
            apodized_area_sum,
            "pupil function evaluated"
        );

        Ok(PupilEvaluation {
            output: PupilFunctionOutput {
                pupil_function,
                illuminated_pixel_count,
                apodized_area_sum,
                wavelength_nm: inputs.wavelength_nm,
                field_size_mm: inputs.grid.field_size_mm(),
            },
            phase_um,
            amplitude,
            warnings: inputs.warnings,
        })
    }
}

impl PupilFunctionApi for PupilFunctionEngine {
    fn compute(&self, params: &mut WavefrontParameters) -> WvfResult<PupilFunctionComputation> {
        let evaluation = self.evaluate(params)?;
        params.output = Some(evaluation.output);

        Ok(PupilFunctionComputation {
            phase_um: evaluation.phase_um,
            amplitude: evaluation.amplitude,
            warnings: evaluation.warnings,
        })
    }
}
