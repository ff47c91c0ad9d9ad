//! PSF cross-section regression against stored reference arrays.
//!
//! A manifest lists cases; each case is a run configuration plus a reference
//! file and the slice orientation. Relative paths in the manifest resolve
//! against the manifest's directory. Each sample is compared with the policy
//! tolerance resolved for the case id.

use crate::domain::{GridAxis, WvfError, WvfResult};
use crate::io::{load_cross_section, write_cross_section, RunConfig};
use crate::numerics::{
    compare_with_policy_tolerance, load_tolerance_policy, CompiledTolerancePolicy,
    NumericTolerance, TolerancePolicyError, TOLERANCE_POLICY_PATH,
};
use crate::psf::{FftPsfTransform, PsfTransform};
use crate::pupil::{PupilFunctionApi, PupilFunctionEngine};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const DEFAULT_MANIFEST_PATH: &str = "tasks/psf-regression-manifest.json";
pub const DEFAULT_REPORT_PATH: &str = "artifacts/regression/psf-report.json";

#[derive(Debug, Clone)]
pub struct RegressionRunnerConfig {
    pub manifest_path: PathBuf,
    pub policy_path: PathBuf,
    pub report_path: Option<PathBuf>,
    /// Overwrite the reference files with the computed cross-sections instead
    /// of comparing against them.
    pub write_references: bool,
}

impl Default for RegressionRunnerConfig {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::from(DEFAULT_MANIFEST_PATH),
            policy_path: PathBuf::from(TOLERANCE_POLICY_PATH),
            report_path: Some(PathBuf::from(DEFAULT_REPORT_PATH)),
            write_references: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionManifest {
    #[serde(default)]
    pub cases: Vec<RegressionCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionCase {
    pub id: String,
    pub reference: PathBuf,
    #[serde(default)]
    pub axis: GridAxis,
    #[serde(flatten)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegressionRunReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub wrote_references: bool,
    pub manifest_path: String,
    pub policy_path: String,
    pub policy_version: String,
    pub case_count: usize,
    pub passed_case_count: usize,
    pub failed_case_count: usize,
    pub cases: Vec<CaseRegressionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseRegressionReport {
    pub case_id: String,
    pub passed: bool,
    pub reference_path: String,
    pub axis: GridAxis,
    pub tolerance_category: Option<String>,
    pub tolerance: NumericTolerance,
    pub sample_count: usize,
    pub failed_sample_count: usize,
    pub max_abs_diff: f64,
    pub max_rel_diff: f64,
    pub first_failure_index: Option<usize>,
    pub peak: Option<f64>,
    pub warnings: Vec<String>,
    pub reason: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegressionError {
    #[error("failed to read manifest '{}': {source}", path.display())]
    ReadManifest {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse manifest '{}': {source}", path.display())]
    ParseManifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("manifest lists case '{id}' more than once")]
    DuplicateCase { id: String },
    #[error(transparent)]
    Policy(#[from] TolerancePolicyError),
    #[error("failed to create report directory '{}': {source}", path.display())]
    ReportDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize report '{}': {source}", path.display())]
    SerializeReport {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write report '{}': {source}", path.display())]
    WriteReport {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<RegressionError> for WvfError {
    fn from(error: RegressionError) -> Self {
        let message = error.to_string();
        match error {
            RegressionError::ReadManifest { .. } => {
                WvfError::io_system("IO.REGRESSION_MANIFEST", message)
            }
            RegressionError::ParseManifest { .. } | RegressionError::DuplicateCase { .. } => {
                WvfError::configuration("CONFIG.REGRESSION_MANIFEST", message)
            }
            RegressionError::Policy(TolerancePolicyError::Read { .. }) => {
                WvfError::io_system("IO.TOLERANCE_POLICY", message)
            }
            RegressionError::Policy(_) => {
                WvfError::configuration("CONFIG.TOLERANCE_POLICY", message)
            }
            RegressionError::ReportDirectory { .. } | RegressionError::WriteReport { .. } => {
                WvfError::io_system("IO.REGRESSION_REPORT", message)
            }
            RegressionError::SerializeReport { .. } => {
                WvfError::internal("SYS.REGRESSION_REPORT", message)
            }
        }
    }
}

pub fn run_regression(config: &RegressionRunnerConfig) -> WvfResult<RegressionRunReport> {
    run_regression_with(config, &PupilFunctionEngine, &FftPsfTransform)
}

pub fn run_regression_with<E, T>(
    config: &RegressionRunnerConfig,
    engine: &E,
    transform: &T,
) -> WvfResult<RegressionRunReport>
where
    E: PupilFunctionApi,
    T: PsfTransform,
{
    let manifest = load_manifest(&config.manifest_path)?;
    let policy = load_tolerance_policy(&config.policy_path).map_err(RegressionError::from)?;
    let compiled = policy.compile().map_err(RegressionError::from)?;
    let base_dir = config
        .manifest_path
        .parent()
        .map_or_else(PathBuf::new, Path::to_path_buf);

    let mut case_reports = Vec::with_capacity(manifest.cases.len());
    for case in &manifest.cases {
        let report = run_case(case, &base_dir, &compiled, config, engine, transform);
        info!(
            case = %report.case_id,
            passed = report.passed,
            max_abs_diff = report.max_abs_diff,
            max_rel_diff = report.max_rel_diff,
            "regression case finished"
        );
        case_reports.push(report);
    }

    let case_count = case_reports.len();
    let passed_case_count = case_reports.iter().filter(|case| case.passed).count();
    let failed_case_count = case_count.saturating_sub(passed_case_count);

    let report = RegressionRunReport {
        generated_at_unix_seconds: current_unix_timestamp_seconds(),
        passed: failed_case_count == 0,
        wrote_references: config.write_references,
        manifest_path: normalize_path(&config.manifest_path),
        policy_path: normalize_path(&config.policy_path),
        policy_version: policy.policy_version.clone(),
        case_count,
        passed_case_count,
        failed_case_count,
        cases: case_reports,
    };

    if let Some(report_path) = &config.report_path {
        write_report_file(report_path, &report)?;
    }

    Ok(report)
}

pub fn render_human_summary(report: &RegressionRunReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Regression status: {status}"));
    lines.push(format!(
        "Cases: {} total ({} passed, {} failed), policy {}",
        report.case_count, report.passed_case_count, report.failed_case_count, report.policy_version
    ));
    if report.wrote_references {
        lines.push("Reference files were rewritten from the computed cross-sections".to_string());
    }

    for case in &report.cases {
        let case_status = if case.passed { "PASS" } else { "FAIL" };
        let category = case.tolerance_category.as_deref().unwrap_or("default");
        lines.push(format!(
            "Case {}: {} ({} samples, {} failed, max_abs={:.3e}, max_rel={:.3e}, tolerance={})",
            case.case_id,
            case_status,
            case.sample_count,
            case.failed_sample_count,
            case.max_abs_diff,
            case.max_rel_diff,
            category
        ));

        if let Some(reason) = &case.reason {
            lines.push(format!("  reason: {reason}"));
        }
    }

    lines.join("\n")
}

pub fn load_manifest(manifest_path: &Path) -> Result<RegressionManifest, RegressionError> {
    let content =
        fs::read_to_string(manifest_path).map_err(|source| RegressionError::ReadManifest {
            path: manifest_path.to_path_buf(),
            source,
        })?;
    let manifest: RegressionManifest =
        serde_json::from_str(&content).map_err(|source| RegressionError::ParseManifest {
            path: manifest_path.to_path_buf(),
            source,
        })?;

    let mut seen = BTreeSet::new();
    for case in &manifest.cases {
        if !seen.insert(case.id.as_str()) {
            return Err(RegressionError::DuplicateCase {
                id: case.id.clone(),
            });
        }
    }

    Ok(manifest)
}

fn run_case<E, T>(
    case: &RegressionCase,
    base_dir: &Path,
    policy: &CompiledTolerancePolicy,
    config: &RegressionRunnerConfig,
    engine: &E,
    transform: &T,
) -> CaseRegressionReport
where
    E: PupilFunctionApi,
    T: PsfTransform,
{
    let resolved = policy.resolve(&case.id);
    let reference_path = base_dir.join(&case.reference);
    let mut report = CaseRegressionReport {
        case_id: case.id.clone(),
        passed: false,
        reference_path: normalize_path(&reference_path),
        axis: case.axis,
        tolerance_category: resolved.category_id,
        tolerance: resolved.tolerance,
        sample_count: 0,
        failed_sample_count: 0,
        max_abs_diff: 0.0,
        max_rel_diff: 0.0,
        first_failure_index: None,
        peak: None,
        warnings: Vec::new(),
        reason: None,
    };

    let computed = match compute_cross_section(case, base_dir, engine, transform) {
        Ok(computed) => computed,
        Err(error) => {
            warn!(case = %case.id, "{}", error.diagnostic_line());
            report.reason = Some(format!("Computation error: {error}"));
            return report;
        }
    };
    report.peak = Some(computed.peak);
    report.warnings = computed.warnings;

    if config.write_references {
        let header = vec![
            format!("case: {}", case.id),
            format!("axis: {}", case.axis),
            format!("peak: {:.16E}", computed.peak),
        ];
        if let Err(error) = write_cross_section(
            &reference_path,
            &header,
            &computed.positions_arcmin,
            &computed.values,
        ) {
            report.reason = Some(format!("Reference write error: {error}"));
            return report;
        }
        report.sample_count = computed.values.len();
        report.passed = true;
        return report;
    }

    let reference = match load_cross_section(&reference_path) {
        Ok(reference) => reference,
        Err(error) => {
            report.reason = Some(format!("Missing reference cross-section: {error}"));
            return report;
        }
    };

    if reference.len() != computed.values.len() {
        report.reason = Some(format!(
            "Reference has {} samples but the computed cross-section has {}",
            reference.len(),
            computed.values.len()
        ));
        return report;
    }

    report.sample_count = reference.len();
    for (index, (&baseline, &actual)) in reference.iter().zip(&computed.values).enumerate() {
        let comparison = compare_with_policy_tolerance(baseline, actual, report.tolerance);
        report.max_abs_diff = report.max_abs_diff.max(comparison.abs_diff);
        report.max_rel_diff = report.max_rel_diff.max(comparison.rel_diff);
        if !comparison.passes {
            report.failed_sample_count += 1;
            report.first_failure_index.get_or_insert(index);
        }
    }

    report.passed = report.failed_sample_count == 0;
    if let Some(index) = report.first_failure_index {
        report.reason = Some(format!(
            "{} sample(s) outside tolerance, first at index {}",
            report.failed_sample_count, index
        ));
    }

    report
}

struct ComputedCrossSection {
    positions_arcmin: Vec<f64>,
    values: Vec<f64>,
    peak: f64,
    warnings: Vec<String>,
}

fn compute_cross_section<E, T>(
    case: &RegressionCase,
    base_dir: &Path,
    engine: &E,
    transform: &T,
) -> WvfResult<ComputedCrossSection>
where
    E: PupilFunctionApi,
    T: PsfTransform,
{
    let mut params = case.run.to_parameters(base_dir)?;
    let computation = engine.compute(&mut params)?;
    let output = params.output.as_ref().ok_or_else(|| {
        WvfError::internal(
            "SYS.PUPIL_OUTPUT",
            "pupil computation returned without storing its output",
        )
    })?;
    let psf = transform.transform(output)?;

    Ok(ComputedCrossSection {
        positions_arcmin: psf.angular_positions_arcmin(),
        values: psf.cross_section(case.axis),
        peak: psf.peak(),
        warnings: computation
            .warnings
            .iter()
            .map(|warning| warning.diagnostic_line())
            .collect(),
    })
}

fn write_report_file(report_path: &Path, report: &RegressionRunReport) -> WvfResult<()> {
    if let Some(parent_dir) = report_path.parent()
        && !parent_dir.as_os_str().is_empty()
    {
        fs::create_dir_all(parent_dir).map_err(|source| RegressionError::ReportDirectory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let report_json =
        serde_json::to_string_pretty(report).map_err(|source| RegressionError::SerializeReport {
            path: report_path.to_path_buf(),
            source,
        })?;
    fs::write(report_path, report_json).map_err(|source| RegressionError::WriteReport {
        path: report_path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
