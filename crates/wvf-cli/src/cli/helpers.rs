use super::CliError;
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::path::Path;
use wvf_core::common::constants::DEFOCUS_INDEX;
use wvf_core::common::units::defocus_microns_to_diopters;
use wvf_core::domain::{ComputeWarning, GridAxis, WvfError};
use wvf_core::io::load_run_config;
use wvf_core::pupil::{PupilFunctionOutput, WavefrontParameters};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PupilSummary {
    pub(super) wavelength_nm: f64,
    pub(super) field_sample_pixels: usize,
    pub(super) field_size_mm: f64,
    /// OSA j = 4 after defocus folding, as vergence over the measured pupil.
    pub(super) defocus_diopters: f64,
    pub(super) illuminated_pixel_count: usize,
    pub(super) apodized_area_sum: f64,
    pub(super) apodized: bool,
    pub(super) warnings: Vec<String>,
}

impl PupilSummary {
    pub(super) fn new(
        params: &WavefrontParameters,
        output: &PupilFunctionOutput,
        warnings: &[ComputeWarning],
    ) -> Self {
        let defocus_um = params
            .zernike_coefficients_um
            .get(DEFOCUS_INDEX)
            .copied()
            .unwrap_or(0.0);
        Self {
            wavelength_nm: output.wavelength_nm,
            field_sample_pixels: output.pixels(),
            field_size_mm: output.field_size_mm,
            defocus_diopters: defocus_microns_to_diopters(
                defocus_um,
                params.measured_pupil_diameter_mm,
            ),
            illuminated_pixel_count: output.illuminated_pixel_count,
            apodized_area_sum: output.apodized_area_sum,
            apodized: params.sce.as_ref().is_some_and(|sce| !sce.is_inactive()),
            warnings: warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Full grids for external plotting, rows indexed by `nx`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PupilGridDump {
    pub(super) positions_mm: Vec<f64>,
    pub(super) real: Vec<Vec<f64>>,
    pub(super) imag: Vec<Vec<f64>>,
    pub(super) phase_um: Vec<Vec<f64>>,
    pub(super) amplitude: Vec<Vec<f64>>,
}

pub(super) fn grid_rows(pixels: usize, value: impl Fn(usize, usize) -> f64) -> Vec<Vec<f64>> {
    (0..pixels)
        .map(|nx| (0..pixels).map(|ny| value(nx, ny)).collect())
        .collect()
}

pub(super) fn load_parameters(config_path: &Path) -> Result<WavefrontParameters, CliError> {
    let config = load_run_config(config_path).map_err(WvfError::from)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(config.to_parameters(base_dir).map_err(WvfError::from)?)
}

pub(super) fn pupil_output(params: &WavefrontParameters) -> Result<&PupilFunctionOutput, CliError> {
    params.output.as_ref().ok_or_else(|| {
        CliError::Compute(WvfError::internal(
            "SYS.PUPIL_OUTPUT",
            "pupil computation returned without storing its output",
        ))
    })
}

pub(super) fn parse_axis(value: &str) -> Result<GridAxis, String> {
    GridAxis::from_name(value)
        .ok_or_else(|| format!("unknown axis '{value}' (expected 'row' or 'column')"))
}

pub(super) fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }

    let rendered = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize '{}'", path.display()))?;
    fs::write(path, rendered).with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}
