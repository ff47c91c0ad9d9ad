pub mod coefficients;
pub mod config;
pub mod output;

pub use coefficients::{
    load_coefficient_table, parse_coefficient_table, CoefficientFileError, CoefficientTable,
};
pub use config::{
    load_run_config, CoefficientSource, RunConfig, RunConfigError, SceSpec, WavelengthSpec,
};
pub use output::{
    load_cross_section, parse_cross_section, render_cross_section, write_cross_section,
};
