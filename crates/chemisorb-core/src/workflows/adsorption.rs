use crate::core::builder::constraint::build_constraint;
use crate::core::builder::slab::build_slab;
use crate::core::energy::adsorption::{
    AdsorptionEnergy, adsorption_energy, endothermic_sites, rank_sites,
};
use crate::core::energy::summary::SummaryReport;
use crate::core::geometry::layers::top_layer_indices;
use crate::core::geometry::sites::{Site, SiteKind, find_site_among};
use crate::core::models::calculation::CalculationResult;
use crate::core::models::constraint::FixedAtoms;
use crate::core::models::structure::AtomicStructure;
use crate::engine::config::PipelineConfig;
use crate::engine::context::{Artifact, PipelineContext};
use crate::engine::error::EngineError;
use crate::engine::optimizer::{RelaxationDriver, single_point};
use crate::engine::oracle::OracleProvider;
use crate::engine::placement::{PlacementReport, check_placement, place_at_site, recenter};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::RelaxOutcome;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

pub const CLEAN_SLAB_STAGE: &str = "clean-slab";
pub const SLAB_RELAX_STAGE: &str = "slab-relax";

/// Namespace of the gas-phase reference, e.g. `co-gas`.
pub fn gas_stage(adsorbate_label: &str) -> String {
    format!("{}-gas", adsorbate_label.to_lowercase())
}

/// Namespace of one site variant, e.g. `site-bridge`.
pub fn site_stage(kind: SiteKind) -> String {
    format!("site-{}", kind)
}

/// Everything one site variant produced.
#[derive(Debug, Clone)]
pub struct SiteResult {
    pub site: Site,
    /// Geometry of the placement as it was handed to the optimizer.
    pub placement: PlacementReport,
    pub relaxation: RelaxOutcome,
    pub energy: AdsorptionEnergy,
    pub summary_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AdsorptionReport {
    pub adsorbate: String,
    pub clean_slab: CalculationResult,
    pub slab: RelaxOutcome,
    pub gas: CalculationResult,
    pub sites: BTreeMap<SiteKind, SiteResult>,
    /// The most strongly binding site, ties resolved in [`SiteKind`] order.
    pub best_site: Option<SiteKind>,
    /// Sites with a positive adsorption energy. Not an error, but suspicious.
    pub endothermic: Vec<SiteKind>,
    pub summary_path: PathBuf,
}

impl AdsorptionReport {
    pub fn energies(&self) -> BTreeMap<SiteKind, AdsorptionEnergy> {
        self.sites.iter().map(|(k, r)| (*k, r.energy)).collect()
    }
}

/// Runs the full adsorption pipeline.
///
/// The stages run in order, each in its own namespace under `context`:
///
/// 1. `clean-slab`: build the slab and the layer constraint, single point.
/// 2. `slab-relax`: relax the slab, restarting from the clean-slab checkpoint.
/// 3. `<adsorbate>-gas`: single point of the isolated molecule.
/// 4. `site-<kind>`: one per site variant, in parallel. Each locates its site
///    on the relaxed slab, places and centers the adsorbate, checks the
///    placement against the geometry guard before any oracle call, relaxes
///    the complex and computes its adsorption energy.
///
/// The sites are then ranked and a summary covering every site is written to
/// the root namespace.
#[instrument(skip_all, name = "adsorption_workflow")]
pub fn run<P: OracleProvider>(
    config: &PipelineConfig,
    provider: &P,
    context: &PipelineContext,
    reporter: &ProgressReporter,
) -> Result<AdsorptionReport, EngineError> {
    let adsorbate = &config.adsorbate.adsorbate;
    let label = adsorbate.label();
    info!(
        element = %config.slab.spec.element,
        facet = %config.slab.spec.facet,
        adsorbate = %label,
        output = %context.root().display(),
        "Starting adsorption workflow."
    );

    context.discard(Artifact::Summary)?;

    // === Stage 1: Clean slab ===
    reporter.report(Progress::PhaseStart { name: "Clean slab" });
    let slab = build_slab(&config.slab.spec)?;
    let constraint = build_constraint(&slab, config.slab.fixed_layers)?;
    let clean_ctx = context.namespace(CLEAN_SLAB_STAGE)?;
    let clean_artifacts = clean_ctx.relax_artifacts();
    let mut oracle = provider.create(CLEAN_SLAB_STAGE, &config.oracle, &clean_artifacts.oracle_log)?;
    let clean_slab = single_point(
        &mut oracle,
        &slab,
        &constraint,
        CLEAN_SLAB_STAGE,
        &clean_artifacts,
    )?;
    reporter.report(Progress::PhaseFinish);

    // === Stage 2: Slab relaxation ===
    reporter.report(Progress::PhaseStart { name: "Relaxing slab" });
    let relax_ctx = context.namespace(SLAB_RELAX_STAGE)?;
    let relax_artifacts = relax_ctx.relax_artifacts();
    let checkpoint = clean_ctx.require(Artifact::Checkpoint)?;
    let mut driver = RelaxationDriver::from_checkpoint(
        provider,
        SLAB_RELAX_STAGE,
        &checkpoint,
        &relax_artifacts,
        constraint.clone(),
        config.relax,
    )?;
    let slab_outcome = driver.run(&slab, SLAB_RELAX_STAGE, &relax_artifacts, reporter)?;
    let slab_outcome = require_convergence(slab_outcome, config)?;
    reporter.report(Progress::PhaseFinish);

    // === Stage 3: Gas-phase reference ===
    reporter.report(Progress::PhaseStart { name: "Gas-phase reference" });
    let gas_label = gas_stage(&label);
    let gas_ctx = context.namespace(&gas_label)?;
    let gas_artifacts = gas_ctx.relax_artifacts();
    let molecule = adsorbate.to_isolated(config.adsorbate.gas_box_size)?;
    let mut gas_oracle = provider.create(&gas_label, &config.gas_oracle, &gas_artifacts.oracle_log)?;
    let gas = single_point(
        &mut gas_oracle,
        &molecule,
        &FixedAtoms::none(),
        &gas_label,
        &gas_artifacts,
    )?;
    reporter.report(Progress::PhaseFinish);

    // === Stage 4: Site variants ===
    reporter.report(Progress::PhaseStart { name: "Site variants" });
    reporter.report(Progress::TaskStart {
        total_steps: config.sites.variants.len() as u64,
    });
    let inputs = SiteInputs {
        slab: &slab_outcome.structure,
        bare: &slab_outcome.result,
        gas: &gas,
        constraint: &constraint,
    };
    let results: Vec<SiteResult> = config
        .sites
        .variants
        .par_iter()
        .map(|&kind| {
            let result = run_site(kind, config, provider, context, &inputs, reporter);
            reporter.report(Progress::TaskIncrement);
            result
        })
        .collect::<Result<_, _>>()?;
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    // === Stage 5: Ranking ===
    let sites: BTreeMap<SiteKind, SiteResult> =
        results.into_iter().map(|r| (r.site.kind, r)).collect();
    let energies: BTreeMap<SiteKind, AdsorptionEnergy> =
        sites.iter().map(|(k, r)| (*k, r.energy)).collect();
    let best_site = rank_sites(&energies);
    let endothermic = endothermic_sites(&energies);
    for site in &endothermic {
        warn!(
            %site,
            energy = energies[site].value,
            "Adsorption is endothermic; check that every stage used consistent settings and converged."
        );
    }
    if let Some(best) = best_site {
        info!(site = %best, energy = energies[&best].value, "Most stable adsorption site.");
    }

    let summary_path = context.path(Artifact::Summary);
    SummaryReport::for_sites(&label, energies.values()).write_to_path(&summary_path)?;

    Ok(AdsorptionReport {
        adsorbate: label,
        clean_slab,
        slab: slab_outcome,
        gas,
        sites,
        best_site,
        endothermic,
        summary_path,
    })
}

/// Read-only results shared by every site variant.
struct SiteInputs<'a> {
    slab: &'a AtomicStructure,
    bare: &'a CalculationResult,
    gas: &'a CalculationResult,
    constraint: &'a FixedAtoms,
}

#[instrument(skip_all, name = "site_variant", fields(site = %kind))]
fn run_site<P: OracleProvider>(
    kind: SiteKind,
    config: &PipelineConfig,
    provider: &P,
    context: &PipelineContext,
    inputs: &SiteInputs,
    reporter: &ProgressReporter,
) -> Result<SiteResult, EngineError> {
    let stage = site_stage(kind);
    let ctx = context.namespace(&stage)?;
    let artifacts = ctx.relax_artifacts();
    let adsorbate = &config.adsorbate.adsorbate;

    let (surface, _) = top_layer_indices(inputs.slab, config.sites.layer_tolerance)?;
    let site = find_site_among(inputs.slab, kind, &surface)?;
    let height = config.sites.height(kind)?;
    let anchor_index = inputs.slab.len();
    let complex = recenter(&place_at_site(inputs.slab, adsorbate, &site, height), 2)?;
    let placement = check_placement(&complex, &site, anchor_index, &surface, &config.guard)?;
    info!(
        height = placement.height,
        min_distance = placement.min_distance,
        "Adsorbate placed."
    );

    let oracle = provider.create(&stage, &config.oracle, &artifacts.oracle_log)?;
    let mut driver = RelaxationDriver::new(oracle, inputs.constraint.clone(), config.relax);
    let relaxation = driver.run(&complex, &stage, &artifacts, reporter)?;
    let relaxation = require_convergence(relaxation, config)?;

    let energy = adsorption_energy(kind, &relaxation.result, inputs.bare, inputs.gas)?;
    let summary_path = ctx.path(Artifact::Summary);
    SummaryReport::for_site(&adsorbate.label(), &energy).write_to_path(&summary_path)?;
    info!(energy = energy.value, exothermic = energy.is_exothermic(), "Adsorption energy computed.");

    Ok(SiteResult {
        site,
        placement,
        relaxation,
        energy,
        summary_path,
    })
}

fn require_convergence(outcome: RelaxOutcome, config: &PipelineConfig) -> Result<RelaxOutcome, EngineError> {
    if config.relax.require_convergence {
        outcome.into_converged()
    } else {
        Ok(outcome)
    }
}
