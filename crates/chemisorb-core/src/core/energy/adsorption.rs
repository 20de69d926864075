use crate::core::geometry::sites::SiteKind;
use crate::core::models::calculation::CalculationResult;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Energies come from incompatible oracle configurations (differing: {})", fields.join(", "))]
    InconsistentConfiguration { fields: Vec<String> },
}

/// An adsorption energy and the three total energies it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsorptionEnergy {
    pub site: SiteKind,
    /// `complex - bare - gas` in eV; negative means binding is exothermic.
    pub value: f64,
    pub complex: f64,
    pub bare: f64,
    pub gas: f64,
    /// Whether all three energies come from converged geometries.
    pub converged: bool,
}

impl AdsorptionEnergy {
    #[inline]
    pub fn is_exothermic(&self) -> bool {
        self.value < 0.0
    }
}

/// Computes `E_ads = E_complex - E_bare - E_gas` from raw energies.
pub fn adsorption_energy_from_values(site: SiteKind, complex: f64, bare: f64, gas: f64) -> AdsorptionEnergy {
    AdsorptionEnergy {
        site,
        value: complex - bare - gas,
        complex,
        bare,
        gas,
        converged: true,
    }
}

/// Computes an adsorption energy from three oracle results.
///
/// All three results must share method, functional, cutoff, smearing and
/// extra options. The complex and the bare slab must also share their k-point
/// grid; the gas-phase reference is a non-periodic box and is expected to use a
/// different one. Results without a recorded configuration (energies recovered
/// from external logs) cannot be checked; a warning is logged and the check is
/// skipped.
///
/// # Errors
///
/// Returns [`AggregationError::InconsistentConfiguration`] listing the
/// mismatched options.
pub fn adsorption_energy(
    site: SiteKind,
    complex: &CalculationResult,
    bare: &CalculationResult,
    gas: &CalculationResult,
) -> Result<AdsorptionEnergy, AggregationError> {
    let configs = (
        complex.provenance.config.as_ref(),
        bare.provenance.config.as_ref(),
        gas.provenance.config.as_ref(),
    );
    match configs {
        (Some(c), Some(b), Some(g)) => {
            let mut fields: Vec<String> = Vec::new();
            let mut push = |names: Vec<&'static str>| {
                for name in names {
                    if !fields.iter().any(|f| f == name) {
                        fields.push(name.to_string());
                    }
                }
            };
            push(c.mismatched_fields(b, true));
            push(c.mismatched_fields(g, false));
            push(b.mismatched_fields(g, false));
            if !fields.is_empty() {
                return Err(AggregationError::InconsistentConfiguration { fields });
            }
        }
        _ => warn!(
            %site,
            complex = %complex.provenance.label,
            bare = %bare.provenance.label,
            gas = %gas.provenance.label,
            "Oracle configuration not recorded for every energy; skipping consistency check"
        ),
    }
    let converged = complex.converged && bare.converged && gas.converged;
    if !converged {
        warn!(%site, "Adsorption energy combines a result from an unconverged relaxation");
    }
    Ok(AdsorptionEnergy {
        converged,
        ..adsorption_energy_from_values(site, complex.energy, bare.energy, gas.energy)
    })
}

/// Returns the site that binds most strongly.
///
/// The most negative adsorption energy wins. Equal energies keep the earlier
/// site in [`SiteKind`] order, which the ordered map already iterates in.
pub fn rank_sites(energies: &BTreeMap<SiteKind, AdsorptionEnergy>) -> Option<SiteKind> {
    let mut best: Option<(SiteKind, f64)> = None;
    for (&site, energy) in energies {
        match best {
            Some((_, value)) if energy.value >= value => {}
            _ => best = Some((site, energy.value)),
        }
    }
    best.map(|(site, _)| site)
}

/// Returns the sites whose adsorption energy is positive.
///
/// Endothermic adsorption of a molecule that is known to bind usually points
/// to inconsistent relaxation or settings between the stages.
pub fn endothermic_sites(energies: &BTreeMap<SiteKind, AdsorptionEnergy>) -> Vec<SiteKind> {
    energies
        .values()
        .filter(|e| e.value > 0.0)
        .map(|e| e.site)
        .collect()
}
