mod commands;
mod helpers;

use clap::Parser;
use wvf_core::domain::{WvfError, EXIT_OK};

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let wvf_error = error.as_wvf_error();
            eprintln!("{}", wvf_error.diagnostic_line());
            eprintln!("{}", wvf_error.fatal_exit_line());
            wvf_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("wvf-rs".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(EXIT_OK)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "wvf-rs",
    version,
    about = "Eye pupil function and PSF from Zernike wavefront coefficients"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Compute the pupil function for a run configuration
    Pupil(commands::PupilArgs),
    /// Compute the PSF and write a cross-section through its center
    Psf(commands::PsfArgs),
    /// Print the Zernike term table used by the phase sum
    Zernike(commands::ZernikeArgs),
    /// Compare PSF cross-sections against stored references
    Regression(commands::RegressionArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Pupil(args) => commands::run_pupil_command(args),
        CliCommand::Psf(args) => commands::run_psf_command(args),
        CliCommand::Zernike(args) => commands::run_zernike_command(args),
        CliCommand::Regression(args) => commands::run_regression_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(WvfError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<WvfError> for CliError {
    fn from(error: WvfError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    pub fn as_wvf_error(&self) -> WvfError {
        match self {
            Self::Usage(message) => WvfError::configuration("CONFIG.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => WvfError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
