use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Marker preceding the converged total energy in an oracle log.
pub const ENERGY_MARKER: &str = "Extrapolated:";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Log file not found: {path}")]
    MissingInputFile { path: PathBuf },

    #[error("No '{marker}' energy line found in {origin}", marker = ENERGY_MARKER)]
    MissingEnergyMarker { origin: String },

    #[error("Line {line}: '{value}' is not a valid energy")]
    InvalidEnergyValue { line: usize, value: String },

    #[error("Failed to read {path}: {origin}")]
    Io { path: PathBuf, origin: io::Error },
}

/// Extracts the authoritative total energy from oracle log text.
///
/// A line is a candidate when, after trimming, it starts with
/// [`ENERGY_MARKER`]; the next whitespace-separated token is the energy in eV.
/// Oracles print intermediate values before the final one, so the last
/// candidate wins.
///
/// # Errors
///
/// Returns [`ExtractionError::MissingEnergyMarker`] if no candidate line exists,
/// and [`ExtractionError::InvalidEnergyValue`] if a candidate's value does not
/// parse as a number.
pub fn extract_energy(text: &str) -> Result<f64, ExtractionError> {
    extract_energy_from(text, "log text")
}

fn extract_energy_from(text: &str, origin: &str) -> Result<f64, ExtractionError> {
    let mut energy = None;
    for (number, line) in text.lines().enumerate() {
        let Some(rest) = line.trim().strip_prefix(ENERGY_MARKER) else {
            continue;
        };
        let token = rest.split_whitespace().next().unwrap_or("");
        let value = token
            .parse::<f64>()
            .map_err(|_| ExtractionError::InvalidEnergyValue {
                line: number + 1,
                value: token.to_string(),
            })?;
        energy = Some(value);
    }
    energy.ok_or_else(|| ExtractionError::MissingEnergyMarker {
        origin: origin.to_string(),
    })
}

/// Reads an oracle log from disk and extracts its final energy.
pub fn read_energy_from_log(path: &Path) -> Result<f64, ExtractionError> {
    if !path.exists() {
        return Err(ExtractionError::MissingInputFile {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|e| ExtractionError::Io {
        path: path.to_path_buf(),
        origin: e,
    })?;
    extract_energy_from(&text, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn last_marker_wins() {
        let log = "\
SCF iteration 1
Extrapolated:  -110.5
Free energy:   -110.4
   Extrapolated:  -112.28
Done
";
        assert_eq!(extract_energy(log).unwrap(), -112.28);
    }

    #[test]
    fn marker_must_start_the_line() {
        let log = "Energy (Extrapolated: -3.0)\nExtrapolated: -4.0\n";
        assert_eq!(extract_energy(log).unwrap(), -4.0);
    }

    #[test]
    fn missing_marker_is_an_error() {
        let err = extract_energy("Free energy: -1.0\n").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingEnergyMarker { .. }));
    }

    #[test]
    fn unparsable_value_reports_the_line() {
        let err = extract_energy("Extrapolated: -1.0\nExtrapolated: n/a\n").unwrap_err();
        match err {
            ExtractionError::InvalidEnergyValue { line, value } => {
                assert_eq!(line, 2);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            extract_energy("Extrapolated:\n"),
            Err(ExtractionError::InvalidEnergyValue { line: 1, .. })
        ));
    }

    #[test]
    fn reads_log_files_and_reports_missing_ones() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Extrapolated: -7.25").unwrap();
        assert_eq!(read_energy_from_log(file.path()).unwrap(), -7.25);

        let missing = file.path().with_extension("absent");
        assert!(matches!(
            read_energy_from_log(&missing),
            Err(ExtractionError::MissingInputFile { .. })
        ));
    }
}
