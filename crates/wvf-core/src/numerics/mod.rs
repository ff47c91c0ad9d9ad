pub mod zernike;

pub use zernike::{
    osa_index, phase_at, phase_at_sample, radial_coefficients, radial_order_and_frequency,
    zernike_term_table, zernike_value, Azimuthal, PolarSample, ZernikeCoefficients, ZernikeError,
    ZernikeTerm,
};

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TOLERANCE_POLICY_PATH: &str = "tasks/psf-tolerance-policy.json";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NumericTolerance {
    #[serde(rename = "absTol")]
    pub abs_tol: f64,
    #[serde(rename = "relTol")]
    pub rel_tol: f64,
    #[serde(rename = "relativeFloor")]
    pub relative_floor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyToleranceComparison {
    pub abs_diff: f64,
    pub rel_diff: f64,
    pub passes: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TolerancePolicy {
    #[serde(rename = "policyVersion")]
    pub policy_version: String,
    #[serde(rename = "defaultTolerance")]
    pub default_tolerance: NumericTolerance,
    #[serde(default)]
    pub categories: Vec<ToleranceCategory>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToleranceCategory {
    pub id: String,
    #[serde(rename = "caseGlobs", default)]
    pub case_globs: Vec<String>,
    pub tolerance: NumericTolerance,
}

#[derive(Debug, thiserror::Error)]
pub enum TolerancePolicyError {
    #[error("failed to read tolerance policy '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse tolerance policy '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("tolerance category '{category_id}' has invalid case glob '{pattern}': {source}")]
    InvalidGlob {
        category_id: String,
        pattern: String,
        source: globset::Error,
    },
}

/// Tolerance to apply to one regression case, with the category it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedTolerance {
    pub category_id: Option<String>,
    pub tolerance: NumericTolerance,
}

/// Tolerance policy with its case globs compiled; first matching category wins.
pub struct CompiledTolerancePolicy {
    default_tolerance: NumericTolerance,
    categories: Vec<CompiledCategory>,
}

struct CompiledCategory {
    id: String,
    tolerance: NumericTolerance,
    matchers: Vec<GlobMatcher>,
}

impl TolerancePolicy {
    pub fn compile(&self) -> Result<CompiledTolerancePolicy, TolerancePolicyError> {
        let mut categories = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let mut matchers = Vec::with_capacity(category.case_globs.len());
            for pattern in &category.case_globs {
                let matcher = Glob::new(pattern)
                    .map_err(|source| TolerancePolicyError::InvalidGlob {
                        category_id: category.id.clone(),
                        pattern: pattern.clone(),
                        source,
                    })?
                    .compile_matcher();
                matchers.push(matcher);
            }

            categories.push(CompiledCategory {
                id: category.id.clone(),
                tolerance: category.tolerance,
                matchers,
            });
        }

        Ok(CompiledTolerancePolicy {
            default_tolerance: self.default_tolerance,
            categories,
        })
    }
}

impl CompiledTolerancePolicy {
    pub fn resolve(&self, case_id: &str) -> ResolvedTolerance {
        for category in &self.categories {
            if category
                .matchers
                .iter()
                .any(|matcher| matcher.is_match(case_id))
            {
                return ResolvedTolerance {
                    category_id: Some(category.id.clone()),
                    tolerance: category.tolerance,
                };
            }
        }

        ResolvedTolerance {
            category_id: None,
            tolerance: self.default_tolerance,
        }
    }
}

pub fn load_tolerance_policy(
    policy_path: impl AsRef<Path>,
) -> Result<TolerancePolicy, TolerancePolicyError> {
    let policy_path = policy_path.as_ref();
    let source = fs::read_to_string(policy_path).map_err(|source| TolerancePolicyError::Read {
        path: policy_path.to_path_buf(),
        source,
    })?;
    parse_tolerance_policy(&source, policy_path)
}

pub fn parse_tolerance_policy(
    source: &str,
    origin: impl AsRef<Path>,
) -> Result<TolerancePolicy, TolerancePolicyError> {
    serde_json::from_str(source).map_err(|source| TolerancePolicyError::Parse {
        path: origin.as_ref().to_path_buf(),
        source,
    })
}

pub fn compare_with_policy_tolerance(
    baseline: f64,
    actual: f64,
    tolerance: NumericTolerance,
) -> PolicyToleranceComparison {
    let abs_diff = (actual - baseline).abs();
    let rel_denominator = baseline.abs().max(tolerance.relative_floor);
    let rel_diff = abs_diff / rel_denominator;
    let passes = abs_diff <= tolerance.abs_tol || abs_diff <= tolerance.rel_tol * rel_denominator;

    PolicyToleranceComparison {
        abs_diff,
        rel_diff,
        passes,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        compare_with_policy_tolerance, load_tolerance_policy, parse_tolerance_policy,
        NumericTolerance, TolerancePolicyError, TOLERANCE_POLICY_PATH,
    };
    use std::path::Path;

    const INLINE_POLICY: &str = r#"{
        "policyVersion": "test",
        "defaultTolerance": { "absTol": 1e-12, "relTol": 1e-6, "relativeFloor": 1e-12 },
        "categories": [
            {
                "id": "sce_cases",
                "caseGlobs": ["*-sce"],
                "tolerance": { "absTol": 1e-10, "relTol": 1e-5, "relativeFloor": 1e-12 }
            },
            {
                "id": "short_wavelength",
                "caseGlobs": ["*-450nm-*", "*-450nm"],
                "tolerance": { "absTol": 1e-11, "relTol": 5e-6, "relativeFloor": 1e-12 }
            }
        ]
    }"#;

    #[test]
    fn compare_with_policy_tolerance_uses_baseline_relative_scale() {
        let tolerance = NumericTolerance {
            abs_tol: 1.0e-9,
            rel_tol: 0.1,
            relative_floor: 1.0e-12,
        };
        let comparison = compare_with_policy_tolerance(2.0, 2.19, tolerance);
        assert!((comparison.abs_diff - 0.19).abs() < 1.0e-12);
        assert!((comparison.rel_diff - 0.095).abs() < 1.0e-12);
        assert!(comparison.passes);

        let failing = compare_with_policy_tolerance(1.0, 1.0 + 2.0e-6, tolerance_for_psf());
        assert!(!failing.passes);
    }

    #[test]
    fn compiled_policy_resolves_first_matching_category() {
        let policy = parse_tolerance_policy(INLINE_POLICY, "<inline>").expect("policy parses");
        let compiled = policy.compile().expect("globs compile");

        let sce = compiled.resolve("subject1-450nm-3mm-sce");
        assert_eq!(sce.category_id.as_deref(), Some("sce_cases"));
        assert_eq!(sce.tolerance.rel_tol, 1.0e-5);

        let short = compiled.resolve("subject2-450nm-5mm");
        assert_eq!(short.category_id.as_deref(), Some("short_wavelength"));

        let fallback = compiled.resolve("subject1-550nm-3mm");
        assert_eq!(fallback.category_id, None);
        assert_eq!(fallback.tolerance, policy.default_tolerance);
    }

    #[test]
    fn invalid_glob_is_reported_with_category() {
        let source = INLINE_POLICY.replace("*-sce", "[");
        let policy = parse_tolerance_policy(&source, "<inline>").expect("policy parses");
        match policy.compile() {
            Err(TolerancePolicyError::InvalidGlob {
                category_id,
                pattern,
                ..
            }) => {
                assert_eq!(category_id, "sce_cases");
                assert_eq!(pattern, "[");
            }
            Err(other) => panic!("expected InvalidGlob, got {other:?}"),
            Ok(_) => panic!("expected InvalidGlob, got a compiled policy"),
        }
    }

    #[test]
    fn load_tolerance_policy_reads_workspace_policy() {
        let workspace_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let policy = load_tolerance_policy(workspace_root.join(TOLERANCE_POLICY_PATH))
            .expect("policy should load");

        assert_eq!(policy.default_tolerance, tolerance_for_psf());
        assert!(policy.compile().is_ok());
    }

    fn tolerance_for_psf() -> NumericTolerance {
        NumericTolerance {
            abs_tol: 1.0e-12,
            rel_tol: 1.0e-6,
            relative_floor: 1.0e-12,
        }
    }
}
