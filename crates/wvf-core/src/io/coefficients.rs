//! Flat-text Zernike coefficient tables: one OSA term per row, one subject per
//! column. Values are micrometres, separated by commas and/or whitespace.
//! `#` and `%` start a comment that runs to the end of the line.

use crate::common::constants::MAX_ZERNIKE_COEFFICIENTS;
use crate::domain::WvfError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CoefficientFileError {
    #[error("failed to read coefficient file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}, column {column}: '{token}' is not a finite number")]
    InvalidNumber {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("line {line} has {found} values but earlier rows have {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("coefficient table has {rows} rows; at most {max} Zernike terms are supported")]
    TooManyRows { rows: usize, max: usize },
    #[error("coefficient table contains no values")]
    Empty,
    #[error("subject {subject} requested but the table has {subjects} subject column(s)")]
    SubjectOutOfRange { subject: usize, subjects: usize },
}

impl From<CoefficientFileError> for WvfError {
    fn from(error: CoefficientFileError) -> Self {
        match error {
            CoefficientFileError::Read { .. } => {
                WvfError::io_system("IO.COEFFICIENT_READ", error.to_string())
            }
            CoefficientFileError::SubjectOutOfRange { .. } => {
                WvfError::configuration("CONFIG.SUBJECT", error.to_string())
            }
            CoefficientFileError::TooManyRows { .. } => {
                WvfError::configuration("CONFIG.ZERNIKE_LENGTH", error.to_string())
            }
            _ => WvfError::configuration("CONFIG.COEFFICIENT_FILE", error.to_string()),
        }
    }
}

/// Parsed coefficient table, stored subject-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    subjects: Vec<Vec<f64>>,
}

impl CoefficientTable {
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    pub fn term_count(&self) -> usize {
        self.subjects.first().map_or(0, Vec::len)
    }

    /// Coefficients for the 1-based `subject` column.
    pub fn subject(&self, subject: usize) -> Result<&[f64], CoefficientFileError> {
        subject
            .checked_sub(1)
            .and_then(|index| self.subjects.get(index))
            .map(Vec::as_slice)
            .ok_or(CoefficientFileError::SubjectOutOfRange {
                subject,
                subjects: self.subjects.len(),
            })
    }
}

pub fn load_coefficient_table(
    path: impl AsRef<Path>,
) -> Result<CoefficientTable, CoefficientFileError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| CoefficientFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_coefficient_table(&source)
}

pub fn parse_coefficient_table(source: &str) -> Result<CoefficientTable, CoefficientFileError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (line_index, raw_line) in source.lines().enumerate() {
        let line_number = line_index + 1;
        let content = raw_line
            .split(['#', '%'])
            .next()
            .unwrap_or_default();

        let mut row = Vec::new();
        for (column_index, token) in content
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|token| !token.is_empty())
            .enumerate()
        {
            let value = token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| CoefficientFileError::InvalidNumber {
                    line: line_number,
                    column: column_index + 1,
                    token: token.to_string(),
                })?;
            row.push(value);
        }

        if row.is_empty() {
            continue;
        }

        if let Some(first) = rows.first()
            && first.len() != row.len()
        {
            return Err(CoefficientFileError::RaggedRow {
                line: line_number,
                expected: first.len(),
                found: row.len(),
            });
        }

        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CoefficientFileError::Empty);
    }

    if rows.len() > MAX_ZERNIKE_COEFFICIENTS {
        return Err(CoefficientFileError::TooManyRows {
            rows: rows.len(),
            max: MAX_ZERNIKE_COEFFICIENTS,
        });
    }

    let subject_count = rows[0].len();
    let subjects = (0..subject_count)
        .map(|column| rows.iter().map(|row| row[column]).collect())
        .collect();

    Ok(CoefficientTable { subjects })
}
