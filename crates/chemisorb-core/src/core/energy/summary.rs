use super::adsorption::AdsorptionEnergy;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Line {line}: expected '<key> <value>', found '{content}'")]
    Malformed { line: usize, content: String },

    #[error("Failed to access summary file {path}: {origin}")]
    Io { path: PathBuf, origin: io::Error },
}

/// A small key/value report of the energies behind an adsorption energy.
///
/// One entry per line, the key left-aligned in an 8-character column followed by
/// the value in its shortest exact decimal form:
///
/// ```text
/// E_slab   -1234.5
/// E_COgas  -14.8
/// E_slabCO -1251.3
/// E_ads    -2.0
/// ```
///
/// An energy built on an unconverged relaxation adds an `unconverged` flag
/// (`unconverged_<site>` in multi-site reports) with value 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryReport {
    entries: Vec<(String, f64)>,
}

impl SummaryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The report for one site variant, with keys named after the adsorbate.
    pub fn for_site(adsorbate: &str, energy: &AdsorptionEnergy) -> Self {
        let mut report = Self::new();
        report.push("E_slab", energy.bare);
        report.push(&format!("E_{}gas", adsorbate), energy.gas);
        report.push(&format!("E_slab{}", adsorbate), energy.complex);
        report.push("E_ads", energy.value);
        if !energy.converged {
            report.push("unconverged", 1.0);
        }
        report
    }

    /// A report covering several site variants sharing one slab and gas reference.
    ///
    /// Per-site keys carry the site name as a suffix, e.g. `E_ads_bridge`.
    pub fn for_sites<'a>(adsorbate: &str, energies: impl IntoIterator<Item = &'a AdsorptionEnergy>) -> Self {
        let mut report = Self::new();
        for (n, energy) in energies.into_iter().enumerate() {
            if n == 0 {
                report.push("E_slab", energy.bare);
                report.push(&format!("E_{}gas", adsorbate), energy.gas);
            }
            report.push(&format!("E_slab{}_{}", adsorbate, energy.site), energy.complex);
            report.push(&format!("E_ads_{}", energy.site), energy.value);
            if !energy.converged {
                report.push(&format!("unconverged_{}", energy.site), 1.0);
            }
        }
        report
    }

    /// Sets `key`, replacing an earlier value under the same key.
    pub fn push(&mut self, key: &str, value: f64) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), SummaryError> {
        fs::write(path, self.to_string()).map_err(|e| SummaryError::Io {
            path: path.to_path_buf(),
            origin: e,
        })
    }

    pub fn read_from_path(path: &Path) -> Result<Self, SummaryError> {
        fs::read_to_string(path)
            .map_err(|e| SummaryError::Io {
                path: path.to_path_buf(),
                origin: e,
            })?
            .parse()
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{:<8} {}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for SummaryReport {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut report = Self::new();
        for (n, line) in s.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let malformed = || SummaryError::Malformed {
                line: n + 1,
                content: line.to_string(),
            };
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(malformed());
            };
            let value: f64 = value.parse().map_err(|_| malformed())?;
            report.push(key, value);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::energy::adsorption::adsorption_energy_from_values;
    use crate::core::geometry::sites::SiteKind;

    #[test]
    fn site_report_uses_fixed_column_layout() {
        let e = adsorption_energy_from_values(SiteKind::OnTop, -110.0, -100.0, -8.0);
        let text = SummaryReport::for_site("CO", &e).to_string();
        assert_eq!(text, "E_slab   -100\nE_COgas  -8\nE_slabCO -110\nE_ads    -2\n");
    }

    #[test]
    fn report_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("energies_summary.txt");
        let sites = [
            adsorption_energy_from_values(SiteKind::OnTop, -1251.123456789, -1234.5, -14.8),
            adsorption_energy_from_values(SiteKind::Bridge, -1251.5, -1234.5, -14.8),
        ];
        let report = SummaryReport::for_sites("CO", &sites);
        report.write_to_path(&path).unwrap();
        let back = SummaryReport::read_from_path(&path).unwrap();
        assert_eq!(back, report);
        assert_eq!(back.get("E_slabCO_on-top"), Some(-1251.123456789));
        assert_eq!(back.get("E_slab"), Some(-1234.5));
    }

    #[test]
    fn unconverged_sites_are_flagged() {
        let converged = adsorption_energy_from_values(SiteKind::OnTop, -110.0, -100.0, -8.0);
        let unconverged = AdsorptionEnergy {
            site: SiteKind::Bridge,
            converged: false,
            ..converged
        };

        let report = SummaryReport::for_sites("CO", &[converged, unconverged]);
        assert_eq!(report.get("unconverged_bridge"), Some(1.0));
        assert_eq!(report.get("unconverged_on-top"), None);

        let single = SummaryReport::for_site("CO", &unconverged);
        assert!(single.to_string().ends_with("unconverged 1\n"));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            "E_slab -1.0\nE_ads\n".parse::<SummaryReport>(),
            Err(SummaryError::Malformed { line: 2, .. })
        ));
        assert!("E_ads x".parse::<SummaryReport>().is_err());
    }
}
