use super::adsorption::{SLAB_RELAX_STAGE, gas_stage, site_stage};
use crate::core::energy::adsorption::{
    AdsorptionEnergy, adsorption_energy, endothermic_sites, rank_sites,
};
use crate::core::energy::extract::read_energy_from_log;
use crate::core::energy::summary::SummaryReport;
use crate::core::geometry::sites::SiteKind;
use crate::core::models::calculation::CalculationResult;
use crate::engine::context::{Artifact, PipelineContext};
use crate::engine::error::EngineError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// The oracle logs an energy comparison reads.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSet {
    pub slab: PathBuf,
    pub gas: PathBuf,
    pub sites: BTreeMap<SiteKind, PathBuf>,
}

impl LogSet {
    /// Locates the oracle logs of an earlier adsorption run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MissingInputFile`] naming the first stage whose
    /// log is missing.
    pub fn from_run(
        context: &PipelineContext,
        adsorbate_label: &str,
        variants: &[SiteKind],
    ) -> Result<Self, EngineError> {
        let log = |stage: &str| {
            context
                .existing_namespace(stage)
                .require(Artifact::OracleLog)
        };
        let mut sites = BTreeMap::new();
        for &kind in variants {
            sites.insert(kind, log(&site_stage(kind))?);
        }
        Ok(Self {
            slab: log(SLAB_RELAX_STAGE)?,
            gas: log(&gas_stage(adsorbate_label))?,
            sites,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub energies: BTreeMap<SiteKind, AdsorptionEnergy>,
    pub best_site: Option<SiteKind>,
    pub endothermic: Vec<SiteKind>,
}

impl ComparisonReport {
    pub fn summary(&self, adsorbate_label: &str) -> SummaryReport {
        SummaryReport::for_sites(adsorbate_label, self.energies.values())
    }
}

fn energy_from_log(label: &str, path: &Path) -> Result<CalculationResult, EngineError> {
    let energy = read_energy_from_log(path)?;
    info!(label, energy, path = %path.display(), "Read energy from log.");
    Ok(CalculationResult::from_log_energy(label, energy))
}

/// Computes and ranks adsorption energies from oracle text logs.
///
/// Each log contributes its last `Extrapolated:` energy. Log energies carry no
/// oracle configuration, so the settings of the three calculations behind each
/// adsorption energy cannot be cross-checked here.
#[instrument(skip_all, name = "compare_workflow")]
pub fn run(logs: &LogSet) -> Result<ComparisonReport, EngineError> {
    let bare = energy_from_log("slab", &logs.slab)?;
    let gas = energy_from_log("gas", &logs.gas)?;

    let mut energies = BTreeMap::new();
    for (&kind, path) in &logs.sites {
        let complex = energy_from_log(kind.as_str(), path)?;
        let energy = adsorption_energy(kind, &complex, &bare, &gas)?;
        info!(site = %kind, energy = energy.value, "Adsorption energy.");
        energies.insert(kind, energy);
    }

    let best_site = rank_sites(&energies);
    let endothermic = endothermic_sites(&energies);
    for site in &endothermic {
        warn!(%site, energy = energies[site].value, "Adsorption is endothermic.");
    }

    Ok(ComparisonReport {
        energies,
        best_site,
        endothermic,
    })
}
