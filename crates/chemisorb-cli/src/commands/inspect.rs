use crate::cli::InspectArgs;
use crate::config::DefaultsConfig;
use crate::error::{CliError, Result};
use crate::report;
use chemisorb::core::io::{traits::StructureFile, xyz::XyzFile};
use chemisorb::engine::config::GeometryGuard;
use chemisorb::workflows::{self, inspect::InspectionReport};
use tracing::info;

fn inspect(args: &InspectArgs) -> Result<InspectionReport> {
    info!("Loading structure from {:?}", &args.input);
    let frames = XyzFile::read_all_from_path(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;
    let frame = frames.last().ok_or_else(|| CliError::FileParsing {
        path: args.input.clone(),
        source: anyhow::anyhow!("file contains no frames"),
    })?;
    if frames.len() > 1 {
        info!("Inspecting the last of {} frames.", frames.len());
    }

    let defaults = DefaultsConfig::default();
    let guard = GeometryGuard {
        min_height: args.min_height.unwrap_or(defaults.min_height),
        min_distance: args.min_distance.unwrap_or(defaults.min_distance),
    };

    Ok(workflows::inspect::run(
        &frame.structure,
        &args.anchor,
        &args.surface,
        &guard,
    )?)
}

pub fn run(args: InspectArgs) -> Result<()> {
    let report = inspect(&args)?;
    println!(
        "Inspecting {} above {} in {}",
        args.anchor,
        args.surface,
        args.input.display()
    );
    report::print_inspection(&report);
    Ok(())
}
