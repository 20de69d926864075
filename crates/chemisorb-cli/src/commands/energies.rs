use crate::cli::EnergiesArgs;
use crate::error::{CliError, Result};
use crate::report;
use crate::utils::parser;
use chemisorb::engine::context::PipelineContext;
use chemisorb::workflows::compare::{self, LogSet};
use std::collections::BTreeMap;
use tracing::info;

fn resolve_logs(args: &EnergiesArgs) -> Result<LogSet> {
    if let Some(run_dir) = &args.run_dir {
        let variants =
            parser::parse_sites(&args.sites).map_err(|e| CliError::Argument(e.to_string()))?;
        info!(run_dir = %run_dir.display(), "Locating oracle logs of an earlier run.");
        let context = PipelineContext::open(run_dir)?;
        return Ok(LogSet::from_run(&context, &args.adsorbate, &variants)?);
    }

    let (Some(slab), Some(gas)) = (&args.slab_log, &args.gas_log) else {
        return Err(CliError::Argument(
            "Either --run-dir or both --slab-log and --gas-log are required.".to_string(),
        ));
    };
    let mut sites = BTreeMap::new();
    for entry in &args.site_logs {
        let (kind, path) =
            parser::parse_site_log(entry).map_err(|e| CliError::Argument(e.to_string()))?;
        sites.insert(kind, path);
    }
    if sites.is_empty() {
        return Err(CliError::Argument(
            "At least one --site-log KIND=PATH is required.".to_string(),
        ));
    }
    Ok(LogSet {
        slab: slab.clone(),
        gas: gas.clone(),
        sites,
    })
}

pub fn run(args: EnergiesArgs) -> Result<()> {
    let logs = resolve_logs(&args)?;
    let comparison = compare::run(&logs)?;

    report::print_energies(
        &comparison.energies,
        comparison.best_site,
        &comparison.endothermic,
    );

    if let Some(path) = &args.summary {
        comparison
            .summary(&args.adsorbate)
            .write_to_path(path)
            .map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?;
        println!("Summary written to: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use chemisorb::core::energy::summary::SummaryReport;
    use chemisorb::core::geometry::sites::SiteKind;
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn energies_args(extra: &[&str]) -> EnergiesArgs {
        let mut args = vec!["chemisorb", "energies"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Energies(energies_args) => energies_args,
            _ => panic!("Expected 'energies' subcommand"),
        }
    }

    fn write_log(dir: &Path, name: &str, energy: f64) -> String {
        let path = dir.join(name);
        fs::write(
            &path,
            format!("iter 1\nExtrapolated:  {:.4}\nExtrapolated:  {:.4}\n", energy + 1.0, energy),
        )
        .unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn explicit_logs_produce_a_summary() {
        let dir = tempdir().unwrap();
        let slab = write_log(dir.path(), "slab.txt", -100.0);
        let gas = write_log(dir.path(), "gas.txt", -14.8);
        let top = write_log(dir.path(), "top.txt", -116.6);
        let bridge = write_log(dir.path(), "bridge.txt", -116.4);
        let summary = dir.path().join("summary.txt");

        let args = energies_args(&[
            "--slab-log",
            &slab,
            "--gas-log",
            &gas,
            "--site-log",
            &format!("on-top={}", top),
            "--site-log",
            &format!("bridge={}", bridge),
            "--summary",
            summary.to_str().unwrap(),
        ]);
        run(args).unwrap();

        let report = SummaryReport::read_from_path(&summary).unwrap();
        assert!((report.get("E_ads_on-top").unwrap() - -1.8).abs() < 1e-9);
        assert!((report.get("E_ads_bridge").unwrap() - -1.6).abs() < 1e-9);
        assert!((report.get("E_slab").unwrap() - -100.0).abs() < 1e-9);
    }

    #[test]
    fn explicit_logs_need_a_site() {
        let dir = tempdir().unwrap();
        let slab = write_log(dir.path(), "slab.txt", -100.0);
        let gas = write_log(dir.path(), "gas.txt", -14.8);
        let args = energies_args(&["--slab-log", &slab, "--gas-log", &gas]);
        assert!(matches!(resolve_logs(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn run_dir_without_logs_names_the_missing_stage() {
        let dir = tempdir().unwrap();
        let args = energies_args(&["--run-dir", dir.path().to_str().unwrap(), "--sites", "bridge"]);
        let err = resolve_logs(&args).unwrap_err();
        assert!(matches!(err, CliError::Core(_)));
        assert!(err.to_string().contains("site-bridge"));
    }

    #[test]
    fn missing_run_dir_is_not_created() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent");
        let args = energies_args(&["--run-dir", missing.to_str().unwrap()]);
        assert!(matches!(resolve_logs(&args), Err(CliError::Core(_))));
        assert!(!missing.exists());
    }

    #[test]
    fn run_dir_logs_are_located_by_stage() {
        let dir = tempdir().unwrap();
        for stage in ["slab-relax", "co-gas", "site-on-top"] {
            fs::create_dir_all(dir.path().join(stage)).unwrap();
            write_log(&dir.path().join(stage), "oracle.txt", -1.0);
        }
        let args = energies_args(&["--run-dir", dir.path().to_str().unwrap(), "--sites", "on-top"]);
        let logs = resolve_logs(&args).unwrap();
        assert_eq!(logs.sites.len(), 1);
        assert!(logs.sites[&SiteKind::OnTop].ends_with("site-on-top/oracle.txt"));
        assert!(logs.gas.ends_with("co-gas/oracle.txt"));
    }
}
