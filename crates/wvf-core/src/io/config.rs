//! JSON run configuration describing a single pupil/PSF computation.
//!
//! ```json
//! {
//!   "coefficients": { "file": "subjects.txt", "subject": 1 },
//!   "measuredPupilMm": 6.0,
//!   "calculatedPupilMm": 3.0,
//!   "wavelengthNm": 550,
//!   "defocusDiopters": 0.0,
//!   "fieldSamplePixels": 201,
//!   "fieldSizeMm": 16.0,
//!   "sce": "none"
//! }
//! ```

use super::coefficients::{load_coefficient_table, CoefficientFileError};
use crate::domain::WvfError;
use crate::numerics::{ZernikeCoefficients, ZernikeError};
use crate::pupil::WavefrontParameters;
use crate::sce::{SceError, SceModel, SceParams};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoefficientSource {
    Inline(Vec<f64>),
    File { file: PathBuf, subject: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WavelengthSpec {
    Single(f64),
    Sequence(Vec<f64>),
}

impl WavelengthSpec {
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Self::Single(wavelength) => vec![*wavelength],
            Self::Sequence(wavelengths) => wavelengths.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SceSpec {
    Preset(String),
    Explicit(SceParams),
}

impl SceSpec {
    pub fn resolve(&self) -> Result<Option<SceParams>, SceError> {
        match self {
            Self::Preset(name) => Ok(SceModel::from_name(name)?.params()),
            Self::Explicit(params) => {
                SceParams::new(params.x0_mm, params.y0_mm, params.rho.clone()).map(Some)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    #[serde(default = "default_coefficients")]
    pub coefficients: CoefficientSource,
    pub measured_pupil_mm: f64,
    pub calculated_pupil_mm: f64,
    pub wavelength_nm: WavelengthSpec,
    #[serde(default)]
    pub defocus_diopters: f64,
    pub field_sample_pixels: usize,
    pub field_size_mm: f64,
    #[serde(default)]
    pub sce: Option<SceSpec>,
}

fn default_coefficients() -> CoefficientSource {
    CoefficientSource::Inline(Vec::new())
}

#[derive(Debug, thiserror::Error)]
pub enum RunConfigError {
    #[error("failed to read run configuration '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse run configuration '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("defocus must be finite, got {value} D")]
    InvalidDefocus { value: f64 },
    #[error(transparent)]
    Coefficients(#[from] CoefficientFileError),
    #[error(transparent)]
    Zernike(#[from] ZernikeError),
    #[error(transparent)]
    Sce(#[from] SceError),
}

impl From<RunConfigError> for WvfError {
    fn from(error: RunConfigError) -> Self {
        let message = error.to_string();
        match error {
            RunConfigError::Read { .. } => WvfError::io_system("IO.CONFIG_READ", message),
            RunConfigError::Parse { .. } => WvfError::configuration("CONFIG.RUN_FORMAT", message),
            RunConfigError::InvalidDefocus { .. } => {
                WvfError::configuration("CONFIG.DEFOCUS", message)
            }
            RunConfigError::Coefficients(inner) => WvfError::from(inner),
            RunConfigError::Zernike(ZernikeError::TooManyCoefficients { .. }) => {
                WvfError::configuration("CONFIG.ZERNIKE_LENGTH", message)
            }
            RunConfigError::Zernike(_) => WvfError::configuration("CONFIG.ZERNIKE_VALUE", message),
            RunConfigError::Sce(_) => WvfError::configuration("CONFIG.SCE", message),
        }
    }
}

impl RunConfig {
    pub fn from_json_str(source: &str, origin: impl AsRef<Path>) -> Result<Self, RunConfigError> {
        serde_json::from_str(source).map_err(|source| RunConfigError::Parse {
            path: origin.as_ref().to_path_buf(),
            source,
        })
    }

    /// Builds the parameter bundle. Relative coefficient paths resolve against
    /// `base_dir`; defocus is folded into OSA j = 4 over the measured pupil.
    pub fn to_parameters(&self, base_dir: &Path) -> Result<WavefrontParameters, RunConfigError> {
        let supplied = match &self.coefficients {
            CoefficientSource::Inline(values) => values.clone(),
            CoefficientSource::File { file, subject } => {
                let path = if file.is_absolute() {
                    file.clone()
                } else {
                    base_dir.join(file)
                };
                load_coefficient_table(path)?.subject(*subject)?.to_vec()
            }
        };

        if !self.defocus_diopters.is_finite() {
            return Err(RunConfigError::InvalidDefocus {
                value: self.defocus_diopters,
            });
        }

        let zernike_coefficients_um = if self.defocus_diopters == 0.0 {
            supplied
        } else {
            let mut coefficients = ZernikeCoefficients::from_slice(&supplied)?;
            coefficients.add_defocus_diopters(self.defocus_diopters, self.measured_pupil_mm);
            coefficients.as_slice().to_vec()
        };

        let sce = match &self.sce {
            Some(spec) => spec.resolve()?,
            None => None,
        };

        Ok(WavefrontParameters::with_wavelength_sequence(
            zernike_coefficients_um,
            self.measured_pupil_mm,
            self.calculated_pupil_mm,
            self.wavelength_nm.to_vec(),
            self.field_sample_pixels,
            self.field_size_mm,
        )
        .with_sce(sce))
    }
}

pub fn load_run_config(path: impl AsRef<Path>) -> Result<RunConfig, RunConfigError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| RunConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    RunConfig::from_json_str(&source, path)
}
