//! Two-column PSF cross-section files: angle (arcmin) and normalized intensity.

use crate::domain::{WvfError, WvfResult};
use std::fs;
use std::path::Path;

pub fn render_cross_section(header: &[String], positions_arcmin: &[f64], values: &[f64]) -> String {
    let mut lines = Vec::with_capacity(header.len() + values.len() + 1);
    for line in header {
        lines.push(format!("# {line}"));
    }
    lines.push("# columns: angle_arcmin psf".to_string());

    for (position, value) in positions_arcmin.iter().zip(values) {
        lines.push(format!("{position:>24.16E} {value:>24.16E}"));
    }

    let mut contents = lines.join("\n");
    contents.push('\n');
    contents
}

pub fn write_cross_section(
    path: &Path,
    header: &[String],
    positions_arcmin: &[f64],
    values: &[f64],
) -> WvfResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| {
            WvfError::io_system(
                "IO.OUTPUT_DIRECTORY",
                format!(
                    "failed to create output directory '{}': {}",
                    parent.display(),
                    source
                ),
            )
        })?;
    }

    fs::write(path, render_cross_section(header, positions_arcmin, values)).map_err(|source| {
        WvfError::io_system(
            "IO.OUTPUT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}

/// Reads the last column of every non-comment row.
pub fn parse_cross_section(source: &str, origin: &Path) -> WvfResult<Vec<f64>> {
    let mut values = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some(token) = trimmed.split_whitespace().last() else {
            continue;
        };
        let value = token.parse::<f64>().map_err(|_| {
            WvfError::configuration(
                "CONFIG.REFERENCE_FORMAT",
                format!(
                    "'{}' line {}: '{}' is not a number",
                    origin.display(),
                    index + 1,
                    token
                ),
            )
        })?;
        values.push(value);
    }

    Ok(values)
}

pub fn load_cross_section(path: &Path) -> WvfResult<Vec<f64>> {
    let source = fs::read_to_string(path).map_err(|source| {
        WvfError::io_system(
            "IO.REFERENCE_READ",
            format!("failed to read '{}': {}", path.display(), source),
        )
    })?;
    parse_cross_section(&source, path)
}

#[cfg(test)]
mod tests {
    use super::{load_cross_section, parse_cross_section, render_cross_section, write_cross_section};
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn rendered_values_read_back_exactly() {
        let values = [1.0, 0.123_456_789_012_345_67, 3.0e-9];
        let positions = [-0.5, 0.0, 0.5];
        let rendered = render_cross_section(&["case: demo".to_string()], &positions, &values);

        assert!(rendered.starts_with("# case: demo\n# columns: angle_arcmin psf\n"));
        let parsed = parse_cross_section(&rendered, Path::new("<inline>")).expect("parses");
        assert_eq!(parsed, values);
    }

    #[test]
    fn single_column_files_are_accepted() {
        let parsed = parse_cross_section("# ref\n1.5\n\n2.5\n", Path::new("<inline>"))
            .expect("parses");
        assert_eq!(parsed, vec![1.5, 2.5]);

        let error = parse_cross_section("1.0 x\n", Path::new("ref.dat")).expect_err("bad value");
        assert_eq!(error.placeholder(), "CONFIG.REFERENCE_FORMAT");
    }

    #[test]
    fn write_creates_parent_directories() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("nested").join("psf.dat");
        write_cross_section(&path, &[], &[0.0, 1.0], &[0.25, 0.75]).expect("written");

        assert_eq!(load_cross_section(&path).expect("read back"), vec![0.25, 0.75]);
        let missing = load_cross_section(&temp.path().join("missing.dat")).expect_err("missing");
        assert_eq!(missing.placeholder(), "IO.REFERENCE_READ");
    }
}
