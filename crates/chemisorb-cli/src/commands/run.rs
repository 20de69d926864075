use crate::cli::RunArgs;
use crate::config::{self, OracleChoice};
use crate::error::Result;
use crate::report;
use crate::utils::progress::CliProgressHandler;
use chemisorb::engine::context::PipelineContext;
use chemisorb::engine::oracle::command::CommandProvider;
use chemisorb::engine::oracle::morse::MorseProvider;
use chemisorb::engine::progress::ProgressReporter;
use chemisorb::workflows::{self, adsorption::AdsorptionReport};
use tracing::{info, warn};

pub fn run(args: RunArgs, quiet: bool) -> Result<()> {
    info!("Resolving configuration from defaults, file and CLI arguments...");
    let app_config = config::build_config(&args)?;
    let core_config = &app_config.core_config;

    let context = PipelineContext::new(&app_config.output_dir)?;
    let progress_handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Computing {} adsorption on {}({}) {}x{}x{}...",
        core_config.adsorbate.adsorbate.label(),
        core_config.slab.spec.element,
        core_config.slab.spec.facet,
        core_config.slab.spec.size[0],
        core_config.slab.spec.size[1],
        core_config.slab.spec.size[2],
    );

    let report = match &app_config.oracle {
        OracleChoice::Morse => {
            warn!("Using the built-in Morse oracle; energies are not electronic-structure results.");
            workflows::adsorption::run(
                core_config,
                &MorseProvider::default(),
                &context,
                &reporter,
            )?
        }
        OracleChoice::Command { program, args } => {
            info!(program = %program, "Using the external command oracle.");
            workflows::adsorption::run(
                core_config,
                &CommandProvider::new(program, args),
                &context,
                &reporter,
            )?
        }
    };

    print_run_report(&report);
    Ok(())
}

fn print_run_report(report: &AdsorptionReport) {
    println!();
    println!(
        "Relaxed slab: {:.4} eV after {} steps ({:?})",
        report.slab.result.energy, report.slab.steps, report.slab.status
    );
    println!("{} gas phase: {:.4} eV", report.adsorbate, report.gas.energy);
    for (kind, site) in &report.sites {
        println!(
            "  {}: placed at {:.3} Å, {:?} after {} steps (max force {:.3} eV/Å)",
            kind,
            site.placement.height,
            site.relaxation.status,
            site.relaxation.steps,
            site.relaxation.max_force
        );
    }
    report::print_energies(&report.energies(), report.best_site, &report.endothermic);
    println!("Summary written to: {}", report.summary_path.display());
}
