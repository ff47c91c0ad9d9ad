//! Stiles-Crawford apodization of the pupil amplitude.
//!
//! The amplitude at pupil position `(x, y)` is `10^(-rho * ((x-x0)^2 + (y-y0)^2))`
//! with `rho` taken from a wavelength table by exact match. The peak sits at
//! `(x0, y0)`, which is generally off the optical axis.

use crate::domain::SampleGrid;
use faer::Mat;
use serde::{Deserialize, Serialize};

/// Peak offset of the population-average model, in mm from the pupil centre.
pub const POPULATION_AVERAGE_X0_MM: f64 = 0.47;
pub const POPULATION_AVERAGE_Y0_MM: f64 = 0.20;

/// Population-average decay rate (log10 units, mm^-2) tabulated every 10 nm.
const POPULATION_AVERAGE_RHO: [(f64, f64); 31] = [
    (400.0, 0.0600),
    (410.0, 0.0587),
    (420.0, 0.0574),
    (430.0, 0.0561),
    (440.0, 0.0548),
    (450.0, 0.0535),
    (460.0, 0.0522),
    (470.0, 0.0509),
    (480.0, 0.0496),
    (490.0, 0.0483),
    (500.0, 0.0471),
    (510.0, 0.0460),
    (520.0, 0.0450),
    (530.0, 0.0442),
    (540.0, 0.0436),
    (550.0, 0.0433),
    (560.0, 0.0433),
    (570.0, 0.0436),
    (580.0, 0.0441),
    (590.0, 0.0448),
    (600.0, 0.0456),
    (610.0, 0.0465),
    (620.0, 0.0474),
    (630.0, 0.0483),
    (640.0, 0.0492),
    (650.0, 0.0501),
    (660.0, 0.0510),
    (670.0, 0.0519),
    (680.0, 0.0528),
    (690.0, 0.0537),
    (700.0, 0.0546),
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceError {
    #[error("SCE table entry {index} has invalid wavelength {wavelength_nm} nm")]
    InvalidWavelength { index: usize, wavelength_nm: f64 },
    #[error("SCE table entry for {wavelength_nm} nm has invalid rho {rho}; rho must be finite and non-negative")]
    InvalidRho { wavelength_nm: f64, rho: f64 },
    #[error("SCE table lists {wavelength_nm} nm more than once")]
    DuplicateWavelength { wavelength_nm: f64 },
    #[error("SCE offset ({x0_mm}, {y0_mm}) mm is not finite")]
    InvalidOffset { x0_mm: f64, y0_mm: f64 },
    #[error("SCE table has no entry for {wavelength_nm} nm (available: {available:?})")]
    MissingWavelength {
        wavelength_nm: f64,
        available: Vec<f64>,
    },
    #[error("unknown SCE preset '{0}' (expected 'none' or 'population_average')")]
    UnknownPreset(String),
}

/// Wavelength (nm) to rho lookup. Lookups require an exact wavelength match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SceRhoEntry>", into = "Vec<SceRhoEntry>")]
pub struct SceRhoTable {
    entries: Vec<SceRhoEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceRhoEntry {
    pub wavelength_nm: f64,
    pub rho: f64,
}

impl SceRhoTable {
    pub fn new(entries: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, SceError> {
        let entries = entries
            .into_iter()
            .map(|(wavelength_nm, rho)| SceRhoEntry { wavelength_nm, rho })
            .collect::<Vec<_>>();
        Self::try_from(entries)
    }

    pub fn rho_for_wavelength(&self, wavelength_nm: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.wavelength_nm == wavelength_nm)
            .map(|entry| entry.rho)
    }

    pub fn wavelengths_nm(&self) -> Vec<f64> {
        self.entries.iter().map(|entry| entry.wavelength_nm).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_all_zero(&self) -> bool {
        self.entries.iter().all(|entry| entry.rho == 0.0)
    }

    pub fn entries(&self) -> &[SceRhoEntry] {
        &self.entries
    }
}

impl TryFrom<Vec<SceRhoEntry>> for SceRhoTable {
    type Error = SceError;

    fn try_from(entries: Vec<SceRhoEntry>) -> Result<Self, Self::Error> {
        for (index, entry) in entries.iter().enumerate() {
            if !entry.wavelength_nm.is_finite() || entry.wavelength_nm <= 0.0 {
                return Err(SceError::InvalidWavelength {
                    index,
                    wavelength_nm: entry.wavelength_nm,
                });
            }

            if !entry.rho.is_finite() || entry.rho < 0.0 {
                return Err(SceError::InvalidRho {
                    wavelength_nm: entry.wavelength_nm,
                    rho: entry.rho,
                });
            }

            if entries[..index]
                .iter()
                .any(|previous| previous.wavelength_nm == entry.wavelength_nm)
            {
                return Err(SceError::DuplicateWavelength {
                    wavelength_nm: entry.wavelength_nm,
                });
            }
        }

        Ok(Self { entries })
    }
}

impl From<SceRhoTable> for Vec<SceRhoEntry> {
    fn from(table: SceRhoTable) -> Self {
        table.entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceParams {
    pub x0_mm: f64,
    pub y0_mm: f64,
    pub rho: SceRhoTable,
}

impl SceParams {
    pub fn new(x0_mm: f64, y0_mm: f64, rho: SceRhoTable) -> Result<Self, SceError> {
        if !x0_mm.is_finite() || !y0_mm.is_finite() {
            return Err(SceError::InvalidOffset { x0_mm, y0_mm });
        }

        Ok(Self { x0_mm, y0_mm, rho })
    }

    /// True when the parameters leave the amplitude uniformly at one.
    pub fn is_inactive(&self) -> bool {
        self.rho.is_empty() || self.rho.is_all_zero()
    }

    pub fn rho_for_wavelength(&self, wavelength_nm: f64) -> Result<f64, SceError> {
        self.rho
            .rho_for_wavelength(wavelength_nm)
            .ok_or_else(|| SceError::MissingWavelength {
                wavelength_nm,
                available: self.rho.wavelengths_nm(),
            })
    }

    pub fn amplitude_at(&self, rho: f64, x_mm: f64, y_mm: f64) -> f64 {
        let dx = x_mm - self.x0_mm;
        let dy = y_mm - self.y0_mm;
        10.0_f64.powf(-rho * (dx * dx + dy * dy))
    }
}

/// Named SCE parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceModel {
    #[default]
    None,
    PopulationAverage,
}

impl SceModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PopulationAverage => "population_average",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, SceError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(Self::None),
            "population_average" | "population-average" | "average" => {
                Ok(Self::PopulationAverage)
            }
            _ => Err(SceError::UnknownPreset(name.to_string())),
        }
    }

    pub fn params(self) -> Option<SceParams> {
        match self {
            Self::None => None,
            Self::PopulationAverage => Some(SceParams {
                x0_mm: POPULATION_AVERAGE_X0_MM,
                y0_mm: POPULATION_AVERAGE_Y0_MM,
                rho: SceRhoTable {
                    entries: POPULATION_AVERAGE_RHO
                        .iter()
                        .map(|&(wavelength_nm, rho)| SceRhoEntry { wavelength_nm, rho })
                        .collect(),
                },
            }),
        }
    }
}

/// Amplitude grid indexed `(nx, ny)`; rows follow `x`, columns follow `y`.
///
/// `rho == None` means the apodization is inactive and every sample is one.
pub fn amplitude_grid(grid: &SampleGrid, sce: Option<(&SceParams, f64)>) -> Mat<f64> {
    let pixels = grid.pixels();
    let mut amplitude = Mat::<f64>::zeros(pixels, pixels);
    let positions = grid.positions_mm();

    for nx in 0..pixels {
        for ny in 0..pixels {
            amplitude[(nx, ny)] = match sce {
                Some((params, rho)) => params.amplitude_at(rho, positions[nx], positions[ny]),
                None => 1.0,
            };
        }
    }

    amplitude
}
