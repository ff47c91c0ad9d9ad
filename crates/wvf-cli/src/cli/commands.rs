use super::CliError;
use super::helpers::{
    grid_rows, load_parameters, parse_axis, pupil_output, write_json_file, PupilGridDump,
    PupilSummary,
};
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;
use wvf_core::common::constants::MAX_ZERNIKE_COEFFICIENTS;
use wvf_core::domain::{GridAxis, SampleGrid, WvfError, EXIT_OK, EXIT_REGRESSION_MISMATCH};
use wvf_core::io::write_cross_section;
use wvf_core::numerics::{zernike_term_table, TOLERANCE_POLICY_PATH};
use wvf_core::psf::{FftPsfTransform, PsfTransform};
use wvf_core::pupil::{PupilFunctionApi, PupilFunctionEngine};
use wvf_core::regression::{
    render_human_summary, run_regression, RegressionRunnerConfig, DEFAULT_MANIFEST_PATH,
    DEFAULT_REPORT_PATH,
};

#[derive(clap::Args)]
pub(super) struct PupilArgs {
    /// Run configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Also write the summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Write the full pupil, phase and amplitude grids as JSON
    #[arg(long)]
    grid: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct PsfArgs {
    /// Run configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Cross-section output path
    #[arg(long, default_value = "psf.dat")]
    output: PathBuf,

    /// Slice orientation: row fixes the first (x) index, column the second
    #[arg(long, default_value = "row", value_parser = parse_axis)]
    axis: GridAxis,
}

#[derive(clap::Args)]
pub(super) struct ZernikeArgs {
    /// Highest OSA index to print
    #[arg(long, default_value_t = MAX_ZERNIKE_COEFFICIENTS - 1)]
    max_index: usize,
}

#[derive(clap::Args)]
pub(super) struct RegressionArgs {
    /// Regression case manifest path
    #[arg(long, default_value = DEFAULT_MANIFEST_PATH)]
    manifest: PathBuf,

    /// Numeric tolerance policy path
    #[arg(long, default_value = TOLERANCE_POLICY_PATH)]
    policy: PathBuf,

    /// JSON report output path
    #[arg(long, default_value = DEFAULT_REPORT_PATH)]
    report: PathBuf,

    /// Rewrite the reference files from the computed cross-sections
    #[arg(long)]
    write_references: bool,
}

impl RegressionArgs {
    fn into_config(self) -> RegressionRunnerConfig {
        RegressionRunnerConfig {
            manifest_path: self.manifest,
            policy_path: self.policy,
            report_path: Some(self.report),
            write_references: self.write_references,
        }
    }
}

pub(super) fn run_pupil_command(args: PupilArgs) -> Result<i32, CliError> {
    let mut params = load_parameters(&args.config)?;
    let computation = PupilFunctionEngine.compute(&mut params)?;

    let output = pupil_output(&params)?;
    let summary = PupilSummary::new(&params, output, &computation.warnings);
    let rendered = serde_json::to_string_pretty(&summary).context("failed to render summary")?;
    println!("{rendered}");

    if let Some(path) = &args.summary {
        write_json_file(path, &summary)?;
    }

    if let Some(path) = &args.grid {
        let pixels = output.pixels();
        let grid = SampleGrid::new(pixels, output.field_size_mm)?;
        let dump = PupilGridDump {
            positions_mm: grid.positions_mm(),
            real: grid_rows(pixels, |nx, ny| output.pupil_function[(nx, ny)].re),
            imag: grid_rows(pixels, |nx, ny| output.pupil_function[(nx, ny)].im),
            phase_um: grid_rows(pixels, |nx, ny| computation.phase_um[(nx, ny)]),
            amplitude: grid_rows(pixels, |nx, ny| computation.amplitude[(nx, ny)]),
        };
        write_json_file(path, &dump)?;
    }

    Ok(EXIT_OK)
}

pub(super) fn run_psf_command(args: PsfArgs) -> Result<i32, CliError> {
    let mut params = load_parameters(&args.config)?;
    let computation = PupilFunctionEngine.compute(&mut params)?;

    let output = pupil_output(&params)?;
    let psf = FftPsfTransform
        .transform(output)
        .map_err(WvfError::from)?;
    let values = psf.cross_section(args.axis);
    let header = vec![
        format!("config: {}", args.config.display()),
        format!("wavelength_nm: {}", psf.wavelength_nm()),
        format!("axis: {}", args.axis),
        format!("peak: {:.16E}", psf.peak()),
        format!("illuminated_pixel_count: {}", output.illuminated_pixel_count),
    ];
    write_cross_section(
        &args.output,
        &header,
        &psf.angular_positions_arcmin(),
        &values,
    )?;
    info!(
        output = %args.output.display(),
        axis = %args.axis,
        peak = psf.peak(),
        "cross-section written"
    );

    println!("Peak (Strehl ratio): {:.6}", psf.peak());
    println!(
        "Sample spacing: {:.6} arcmin over {} samples",
        psf.sample_spacing_arcmin(),
        psf.pixels()
    );
    println!("Cross-section ({}): {}", args.axis, args.output.display());
    Ok(EXIT_OK)
}

pub(super) fn run_zernike_command(args: ZernikeArgs) -> Result<i32, CliError> {
    if args.max_index >= MAX_ZERNIKE_COEFFICIENTS {
        return Err(CliError::Usage(format!(
            "--max-index must be below {MAX_ZERNIKE_COEFFICIENTS}, got {}",
            args.max_index
        )));
    }

    println!("{:>3} {:>3} {:>4}  expression", "j", "n", "m");
    for term in zernike_term_table()
        .iter()
        .filter(|term| term.osa_index <= args.max_index)
    {
        println!(
            "{:>3} {:>3} {:>4}  {}",
            term.osa_index,
            term.radial_order,
            term.azimuthal_frequency,
            term.describe()
        );
    }

    Ok(EXIT_OK)
}

pub(super) fn run_regression_command(args: RegressionArgs) -> Result<i32, CliError> {
    let config = args.into_config();
    let report = run_regression(&config)?;
    println!("{}", render_human_summary(&report));
    if let Some(report_path) = &config.report_path {
        println!("JSON report: {}", report_path.display());
    }

    if report.passed {
        Ok(EXIT_OK)
    } else {
        Ok(EXIT_REGRESSION_MISMATCH)
    }
}
