pub mod errors;

pub use errors::{
    ComputeWarning, Severity, WarningKind, WvfError, WvfErrorCategory, WvfResult, EXIT_OK,
    EXIT_REGRESSION_MISMATCH,
};

use faer::Mat;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Real-valued sample grid indexed `(nx, ny)`.
pub type RealGrid = Mat<f64>;
/// Complex-valued sample grid indexed `(nx, ny)`.
pub type ComplexGrid = Mat<Complex64>;

/// Square sampling grid in the pupil plane.
///
/// Sample `index` sits at `index * spacing - field_size / 2`, so index `N / 2`
/// is the optical axis for even `N` and the grid is not symmetric about zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleGrid {
    pixels: usize,
    field_size_mm: f64,
}

impl SampleGrid {
    pub fn new(pixels: usize, field_size_mm: f64) -> WvfResult<Self> {
        if pixels == 0 {
            return Err(WvfError::configuration(
                "CONFIG.FIELD_SAMPLES",
                "field sample count must be positive",
            ));
        }

        if !field_size_mm.is_finite() || field_size_mm <= 0.0 {
            return Err(WvfError::configuration(
                "CONFIG.FIELD_SIZE",
                format!("field size must be a positive finite length in mm, got {field_size_mm}"),
            ));
        }

        Ok(Self {
            pixels,
            field_size_mm,
        })
    }

    pub const fn pixels(&self) -> usize {
        self.pixels
    }

    pub const fn field_size_mm(&self) -> f64 {
        self.field_size_mm
    }

    pub fn spacing_mm(&self) -> f64 {
        self.field_size_mm / self.pixels as f64
    }

    pub fn position_mm(&self, index: usize) -> f64 {
        index as f64 * self.spacing_mm() - self.field_size_mm / 2.0
    }

    pub fn positions_mm(&self) -> Vec<f64> {
        (0..self.pixels).map(|index| self.position_mm(index)).collect()
    }

    pub const fn sample_count(&self) -> usize {
        self.pixels * self.pixels
    }
}

/// Orientation of a one-dimensional slice through a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridAxis {
    /// Fixed first index at the center, varying second index (`y`).
    #[default]
    Row,
    /// Fixed second index at the center, varying first index (`x`).
    Column,
}

impl GridAxis {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "row" | "y" => Some(Self::Row),
            "column" | "col" | "x" => Some(Self::Column),
            _ => None,
        }
    }
}

impl Display for GridAxis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
