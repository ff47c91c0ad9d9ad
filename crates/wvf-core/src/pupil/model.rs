use crate::domain::{ComplexGrid, ComputeWarning, RealGrid};
use crate::sce::SceParams;

/// Input/output bundle for one pupil-function computation.
///
/// Coefficients are OSA-ordered (index `j` is OSA `j`) and in micrometres.
/// `output` is filled in by [`super::PupilFunctionApi::compute`] and replaced
/// on every call, so the same bundle can be reused across subjects.
#[derive(Debug, Clone)]
pub struct WavefrontParameters {
    pub zernike_coefficients_um: Vec<f64>,
    pub measured_pupil_diameter_mm: f64,
    pub calculated_pupil_diameter_mm: f64,
    pub wavelengths_nm: Vec<f64>,
    pub field_sample_pixels: usize,
    pub field_size_mm: f64,
    pub sce: Option<SceParams>,
    pub output: Option<PupilFunctionOutput>,
}

impl WavefrontParameters {
    pub fn new(
        zernike_coefficients_um: Vec<f64>,
        measured_pupil_diameter_mm: f64,
        calculated_pupil_diameter_mm: f64,
        wavelength_nm: f64,
        field_sample_pixels: usize,
        field_size_mm: f64,
    ) -> Self {
        Self::with_wavelength_sequence(
            zernike_coefficients_um,
            measured_pupil_diameter_mm,
            calculated_pupil_diameter_mm,
            vec![wavelength_nm],
            field_sample_pixels,
            field_size_mm,
        )
    }

    /// Bundle carrying the wavelengths as supplied. Only the first entry is
    /// used; a longer sequence raises a precision warning at compute time
    /// and an empty one is a configuration error.
    pub fn with_wavelength_sequence(
        zernike_coefficients_um: Vec<f64>,
        measured_pupil_diameter_mm: f64,
        calculated_pupil_diameter_mm: f64,
        wavelengths_nm: Vec<f64>,
        field_sample_pixels: usize,
        field_size_mm: f64,
    ) -> Self {
        Self {
            zernike_coefficients_um,
            measured_pupil_diameter_mm,
            calculated_pupil_diameter_mm,
            wavelengths_nm,
            field_sample_pixels,
            field_size_mm,
            sce: None,
            output: None,
        }
    }

    pub fn with_sce(mut self, sce: Option<SceParams>) -> Self {
        self.sce = sce;
        self
    }
}

/// Pupil function and the pixel statistics the PSF normalization needs.
#[derive(Debug, Clone)]
pub struct PupilFunctionOutput {
    pub pupil_function: ComplexGrid,
    pub illuminated_pixel_count: usize,
    pub apodized_area_sum: f64,
    /// Wavelength actually used, after any sequence truncation.
    pub wavelength_nm: f64,
    pub field_size_mm: f64,
}

impl PupilFunctionOutput {
    pub fn pixels(&self) -> usize {
        self.pupil_function.nrows()
    }
}

/// Everything [`super::PupilFunctionEngine::evaluate`] produces.
///
/// `phase_um` holds the wavefront in micrometres and is zero outside the
/// aperture; `amplitude` is the apodization over the whole grid.
#[derive(Debug, Clone)]
pub struct PupilEvaluation {
    pub output: PupilFunctionOutput,
    pub phase_um: RealGrid,
    pub amplitude: RealGrid,
    pub warnings: Vec<ComputeWarning>,
}

/// Grids returned from an in-place computation; the pupil function itself
/// lives on the parameter bundle.
#[derive(Debug, Clone)]
pub struct PupilFunctionComputation {
    pub phase_um: RealGrid,
    pub amplitude: RealGrid,
    pub warnings: Vec<ComputeWarning>,
}
