use super::WavefrontParameters;
use crate::domain::{ComputeWarning, SampleGrid, WvfError, WvfResult};
use crate::numerics::{ZernikeCoefficients, ZernikeError};
use crate::sce::{SceError, SceParams};

pub(super) struct ValidatedInputs<'a> {
    pub(super) coefficients: ZernikeCoefficients,
    pub(super) grid: SampleGrid,
    pub(super) wavelength_nm: f64,
    pub(super) measured_radius_mm: f64,
    pub(super) aperture_ratio: f64,
    pub(super) sce: Option<(&'a SceParams, f64)>,
    pub(super) warnings: Vec<ComputeWarning>,
}

/// Checks every precondition before any grid is allocated.
pub(super) fn validate_parameters(params: &WavefrontParameters) -> WvfResult<ValidatedInputs<'_>> {
    let measured = params.measured_pupil_diameter_mm;
    let calculated = params.calculated_pupil_diameter_mm;

    if !measured.is_finite() || measured <= 0.0 {
        return Err(WvfError::configuration(
            "CONFIG.PUPIL_DIAMETER",
            format!("measured pupil diameter must be positive, got {measured} mm"),
        ));
    }

    if !calculated.is_finite() || calculated <= 0.0 {
        return Err(WvfError::configuration(
            "CONFIG.PUPIL_DIAMETER",
            format!("calculated pupil diameter must be positive, got {calculated} mm"),
        ));
    }

    if calculated > measured {
        return Err(WvfError::configuration(
            "CONFIG.PUPIL_DIAMETER",
            format!(
                "calculated pupil diameter {calculated} mm exceeds measured pupil diameter {measured} mm"
            ),
        ));
    }

    let coefficients = ZernikeCoefficients::from_slice(&params.zernike_coefficients_um)
        .map_err(zernike_configuration_error)?;

    let (wavelength_nm, warnings) = resolve_wavelength(&params.wavelengths_nm)?;
    let grid = SampleGrid::new(params.field_sample_pixels, params.field_size_mm)?;

    let sce = match params.sce.as_ref() {
        Some(sce) if !sce.is_inactive() => {
            let rho = sce
                .rho_for_wavelength(wavelength_nm)
                .map_err(sce_configuration_error)?;
            Some((sce, rho))
        }
        _ => None,
    };

    Ok(ValidatedInputs {
        coefficients,
        grid,
        wavelength_nm,
        measured_radius_mm: measured / 2.0,
        aperture_ratio: calculated / measured,
        sce,
        warnings,
    })
}

fn resolve_wavelength(wavelengths_nm: &[f64]) -> WvfResult<(f64, Vec<ComputeWarning>)> {
    let Some(&wavelength_nm) = wavelengths_nm.first() else {
        return Err(WvfError::configuration(
            "CONFIG.WAVELENGTH",
            "no wavelength supplied",
        ));
    };

    if !wavelength_nm.is_finite() || wavelength_nm <= 0.0 {
        return Err(WvfError::configuration(
            "CONFIG.WAVELENGTH",
            format!("wavelength must be positive, got {wavelength_nm} nm"),
        ));
    }

    let mut warnings = Vec::new();
    if wavelengths_nm.len() > 1 {
        warnings.push(ComputeWarning::precision(
            "PRECISION.WAVELENGTH_SEQUENCE",
            format!(
                "{} wavelengths supplied; computing only the first ({wavelength_nm} nm)",
                wavelengths_nm.len()
            ),
        ));
    }

    Ok((wavelength_nm, warnings))
}

fn zernike_configuration_error(error: ZernikeError) -> WvfError {
    let placeholder = match error {
        ZernikeError::TooManyCoefficients { .. } => "CONFIG.ZERNIKE_LENGTH",
        _ => "CONFIG.ZERNIKE_VALUE",
    };
    WvfError::configuration(placeholder, error.to_string())
}

fn sce_configuration_error(error: SceError) -> WvfError {
    let placeholder = match error {
        SceError::MissingWavelength { .. } => "CONFIG.SCE_WAVELENGTH",
        _ => "CONFIG.SCE",
    };
    WvfError::configuration(placeholder, error.to_string())
}
