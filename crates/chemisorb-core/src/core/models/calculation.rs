use super::structure::AtomicStructure;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The named options an oracle run is configured with.
///
/// The pipeline treats these as opaque keys. It never interprets them beyond
/// checking that two results being differenced were produced with matching values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OracleConfig {
    /// Basis or discretisation mode (e.g., "pw" for plane waves).
    pub method: String,
    /// Exchange-correlation functional (e.g., "PBE").
    pub xc: String,
    /// Basis cutoff in eV.
    pub cutoff: f64,
    /// Monkhorst-Pack k-point grid.
    pub kpts: [u32; 3],
    /// Fermi-Dirac smearing width in eV.
    pub smearing: f64,
    /// Whether the oracle may exploit symmetry.
    pub symmetry: bool,
    /// Additional opaque options forwarded to the oracle.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            method: "pw".to_string(),
            xc: "PBE".to_string(),
            cutoff: 400.0,
            kpts: [4, 4, 1],
            smearing: 0.1,
            symmetry: false,
            extra: BTreeMap::new(),
        }
    }
}

impl OracleConfig {
    /// Returns a copy with a different k-point grid.
    pub fn with_kpts(&self, kpts: [u32; 3]) -> Self {
        Self {
            kpts,
            ..self.clone()
        }
    }

    /// Lists the options that differ between `self` and `other`.
    ///
    /// # Arguments
    ///
    /// * `other` - The configuration to compare against.
    /// * `compare_kpts` - Whether the k-point grids must also agree.
    ///
    /// # Return
    ///
    /// The names of mismatched options, empty when the configurations are compatible.
    pub fn mismatched_fields(&self, other: &OracleConfig, compare_kpts: bool) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.method != other.method {
            fields.push("method");
        }
        if self.xc != other.xc {
            fields.push("xc");
        }
        if (self.cutoff - other.cutoff).abs() > 1e-9 {
            fields.push("cutoff");
        }
        if (self.smearing - other.smearing).abs() > 1e-12 {
            fields.push("smearing");
        }
        if compare_kpts && self.kpts != other.kpts {
            fields.push("kpts");
        }
        if self.symmetry != other.symmetry {
            fields.push("symmetry");
        }
        if self.extra != other.extra {
            fields.push("extra");
        }
        fields
    }
}

/// Where a calculation result came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// The stage or run label that produced the result (e.g., "clean-slab").
    pub label: String,
    /// The oracle configuration, when known. Energies recovered from external
    /// text logs carry no configuration.
    pub config: Option<OracleConfig>,
    /// Fingerprint of the exact structure that was evaluated.
    pub structure_fingerprint: Option<u64>,
}

/// The outcome of one oracle evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    /// Total energy in eV.
    pub energy: f64,
    /// Per-atom forces in eV/Angstrom, if the oracle computed them.
    pub forces: Option<Vec<Vector3<f64>>>,
    /// Whether the geometry behind this result is converged. Cleared when a
    /// relaxation runs out of steps before reaching its force threshold.
    pub converged: bool,
    pub provenance: Provenance,
}

impl CalculationResult {
    /// Creates a result for a structure evaluated with a known configuration.
    pub fn evaluated(
        label: &str,
        structure: &AtomicStructure,
        config: &OracleConfig,
        energy: f64,
        forces: Option<Vec<Vector3<f64>>>,
    ) -> Self {
        Self {
            energy,
            forces,
            converged: true,
            provenance: Provenance {
                label: label.to_string(),
                config: Some(config.clone()),
                structure_fingerprint: Some(structure.fingerprint()),
            },
        }
    }

    /// Creates a result from an energy recovered from an external log.
    pub fn from_log_energy(label: &str, energy: f64) -> Self {
        Self {
            energy,
            forces: None,
            converged: true,
            provenance: Provenance {
                label: label.to_string(),
                config: None,
                structure_fingerprint: None,
            },
        }
    }

    /// Returns the largest force norm among atoms not listed as fixed.
    ///
    /// Returns `None` when the result has no forces.
    pub fn max_force(&self, fixed: impl Fn(usize) -> bool) -> Option<f64> {
        self.forces.as_ref().map(|forces| {
            forces
                .iter()
                .enumerate()
                .filter(|(i, _)| !fixed(*i))
                .map(|(_, f)| f.norm())
                .fold(0.0, f64::max)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_configs_have_no_mismatch() {
        let a = OracleConfig::default();
        assert!(a.mismatched_fields(&a.clone(), true).is_empty());
    }

    #[test]
    fn kpts_mismatch_is_reported_only_on_request() {
        let slab = OracleConfig::default();
        let gas = slab.with_kpts([1, 1, 1]);
        assert!(slab.mismatched_fields(&gas, false).is_empty());
        assert_eq!(slab.mismatched_fields(&gas, true), vec!["kpts"]);
    }

    #[test]
    fn electronic_settings_mismatch_is_reported() {
        let a = OracleConfig::default();
        let b = OracleConfig {
            cutoff: 500.0,
            xc: "RPBE".to_string(),
            symmetry: true,
            ..OracleConfig::default()
        };
        assert_eq!(a.mismatched_fields(&b, false), vec!["xc", "cutoff", "symmetry"]);
    }

    #[test]
    fn symmetry_usage_must_agree() {
        let a = OracleConfig::default();
        let b = OracleConfig {
            symmetry: true,
            ..OracleConfig::default()
        };
        assert_eq!(a.mismatched_fields(&b, true), vec!["symmetry"]);
    }

    #[test]
    fn max_force_skips_fixed_atoms() {
        let result = CalculationResult {
            energy: -1.0,
            forces: Some(vec![Vector3::new(3.0, 4.0, 0.0), Vector3::new(0.0, 0.0, 1.0)]),
            converged: true,
            provenance: Provenance {
                label: "test".into(),
                config: None,
                structure_fingerprint: None,
            },
        };
        assert_eq!(result.max_force(|_| false), Some(5.0));
        assert_eq!(result.max_force(|i| i == 0), Some(1.0));
        assert_eq!(CalculationResult::from_log_energy("log", 0.0).max_force(|_| false), None);
    }
}
