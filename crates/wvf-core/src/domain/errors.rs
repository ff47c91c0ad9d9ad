use std::error::Error;
use std::fmt::{Display, Formatter};

pub type WvfResult<T> = Result<T, WvfError>;

/// Exit status of a command that completed, warnings included.
pub const EXIT_OK: i32 = 0;
/// Exit status of a regression run where at least one case missed its reference.
pub const EXIT_REGRESSION_MISMATCH: i32 = 1;

/// Whether a diagnostic stopped the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Fatal failure classes. Each owns the process exit code the CLI returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WvfErrorCategory {
    /// A precondition on the inputs failed before any grid was computed:
    /// pupil sizes, coefficient count, wavelength, grid shape, SCE lookup,
    /// or malformed input files.
    ConfigurationError,
    /// An input or output file could not be read or written.
    IoSystemError,
    /// Inputs were accepted but the computation cannot produce a result,
    /// e.g. an aperture with no illuminated samples.
    ComputationError,
    /// Broken internal invariant.
    InternalError,
}

impl WvfErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::ConfigurationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ConfigurationError => "ConfigurationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

fn render_diagnostic(severity: Severity, placeholder: &str, message: &str) -> String {
    format!("{}: [{}] {}", severity.label(), placeholder, message)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WvfError {
    category: WvfErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl WvfError {
    pub fn new(
        category: WvfErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WvfErrorCategory::ConfigurationError, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WvfErrorCategory::IoSystemError, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WvfErrorCategory::ComputationError, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(WvfErrorCategory::InternalError, placeholder, message)
    }

    pub const fn category(&self) -> WvfErrorCategory {
        self.category
    }

    pub const fn severity(&self) -> Severity {
        Severity::Error
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        render_diagnostic(self.severity(), self.placeholder, &self.message)
    }

    pub fn fatal_exit_line(&self) -> String {
        format!("FATAL EXIT CODE: {}", self.exit_code())
    }
}

impl Display for WvfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.name(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for WvfError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Input was narrowed to what one computation supports, e.g. a
    /// wavelength sequence truncated to its first entry.
    Precision,
}

impl WarningKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Precision => "PrecisionWarning",
        }
    }
}

/// Non-fatal condition raised during a computation. The computation still
/// produces a result using the documented fallback, and the CLI exits with
/// [`EXIT_OK`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeWarning {
    kind: WarningKind,
    placeholder: &'static str,
    message: String,
}

impl ComputeWarning {
    pub fn precision(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Precision,
            placeholder,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> WarningKind {
        self.kind
    }

    pub const fn severity(&self) -> Severity {
        Severity::Warning
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn diagnostic_line(&self) -> String {
        render_diagnostic(self.severity(), self.placeholder, &self.message)
    }
}

impl Display for ComputeWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.kind.name(),
            self.placeholder,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ComputeWarning, Severity, WarningKind, WvfError, WvfErrorCategory, EXIT_OK,
        EXIT_REGRESSION_MISMATCH,
    };

    #[test]
    fn fatal_categories_own_distinct_exit_codes() {
        let cases = [
            (WvfErrorCategory::ConfigurationError, 2),
            (WvfErrorCategory::IoSystemError, 3),
            (WvfErrorCategory::ComputationError, 4),
            (WvfErrorCategory::InternalError, 5),
        ];

        for (category, exit_code) in cases {
            assert_eq!(category.exit_code(), exit_code, "{}", category.name());
            assert_ne!(category.exit_code(), EXIT_OK);
            assert_ne!(category.exit_code(), EXIT_REGRESSION_MISMATCH);
        }
    }

    #[test]
    fn configuration_error_renders_diagnostic_lines() {
        let error = WvfError::configuration(
            "CONFIG.PUPIL_DIAMETER",
            "calculated pupil 6 mm exceeds measured pupil 5 mm",
        );

        assert_eq!(error.severity(), Severity::Error);
        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [CONFIG.PUPIL_DIAMETER] calculated pupil 6 mm exceeds measured pupil 5 mm"
        );
        assert_eq!(error.fatal_exit_line(), "FATAL EXIT CODE: 2");
        assert_eq!(
            error.to_string(),
            "ConfigurationError [CONFIG.PUPIL_DIAMETER] calculated pupil 6 mm exceeds measured pupil 5 mm"
        );
    }

    #[test]
    fn precision_warning_shares_the_diagnostic_format() {
        let warning = ComputeWarning::precision(
            "PRECISION.WAVELENGTH_SEQUENCE",
            "using 550 nm of [550, 450]",
        );

        assert_eq!(warning.kind(), WarningKind::Precision);
        assert_eq!(warning.severity(), Severity::Warning);
        assert_eq!(
            warning.diagnostic_line(),
            "WARNING: [PRECISION.WAVELENGTH_SEQUENCE] using 550 nm of [550, 450]"
        );
        assert_eq!(
            warning.to_string(),
            "PrecisionWarning [PRECISION.WAVELENGTH_SEQUENCE] using 550 nm of [550, 450]"
        );
    }
}
