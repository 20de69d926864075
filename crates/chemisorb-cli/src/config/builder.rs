use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::{AppConfig, OracleChoice};
use crate::cli::{OracleKind, RunArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use chemisorb::core::builder::molecule::Adsorbate;
use chemisorb::core::builder::slab::{Facet, SlabSpec};
use chemisorb::core::geometry::sites::SiteKind;
use chemisorb::core::models::atom::Atom;
use chemisorb::core::models::calculation::OracleConfig;
use chemisorb::engine::config as core_config;
use clap::ValueEnum;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Resolves the final run configuration.
///
/// Each value is taken from the first source that sets it: command-line flags,
/// then `-S` overrides, then the config file, then [`DefaultsConfig`].
pub fn build_config(args: &RunArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    // --- Slab ---
    let slab_file = file_config.slab.take().unwrap_or_default();
    let element = args
        .element
        .clone()
        .or(slab_file.element)
        .unwrap_or(defaults.element);
    let facet: Facet = args
        .facet
        .clone()
        .or(slab_file.facet)
        .unwrap_or(defaults.facet)
        .parse()
        .map_err(CliError::Config)?;
    let size = match &args.size {
        Some(size) => parser::parse_size(size).map_err(|e| CliError::Argument(e.to_string()))?,
        None => slab_file.size.unwrap_or(defaults.size),
    };
    let vacuum = args.vacuum.or(slab_file.vacuum).unwrap_or(defaults.vacuum);
    let mut slab = SlabSpec::new(&element, facet, size, vacuum);
    slab.lattice_constant = slab_file.lattice_constant;
    let fixed_layers = args
        .fixed_layers
        .or(slab_file.fixed_layers)
        .unwrap_or(defaults.fixed_layers);

    // --- Adsorbate ---
    let adsorbate_file = file_config.adsorbate.take().unwrap_or_default();
    let species = adsorbate_file.species.unwrap_or(defaults.adsorbate_species);
    let bond_length = adsorbate_file.bond_length.unwrap_or(defaults.bond_length);
    let adsorbate = build_adsorbate(&species, bond_length)?;
    let gas_box_size = adsorbate_file
        .gas_box_size
        .unwrap_or(defaults.gas_box_size);

    // --- Sites ---
    let sites_file = file_config.sites.take().unwrap_or_default();
    let variants = match &args.sites {
        Some(sites) => parser::parse_sites(sites).map_err(|e| CliError::Argument(e.to_string()))?,
        None => sites_file
            .variants
            .unwrap_or_else(|| SiteKind::ALL.to_vec()),
    };
    let mut heights = BTreeMap::new();
    for (name, height) in &sites_file.heights {
        let kind = parser::parse_site(name).map_err(|e| CliError::Config(e.to_string()))?;
        heights.insert(kind, *height);
    }
    heights.entry(SiteKind::OnTop).or_insert(defaults.on_top_height);
    heights.entry(SiteKind::Bridge).or_insert(defaults.bridge_height);
    let layer_tolerance = sites_file
        .layer_tolerance
        .unwrap_or(defaults.layer_tolerance);

    // --- Guard and relaxation ---
    let guard_file = file_config.guard.take().unwrap_or_default();
    let guard = core_config::GeometryGuard {
        min_height: guard_file.min_height.unwrap_or(defaults.min_height),
        min_distance: guard_file.min_distance.unwrap_or(defaults.min_distance),
    };

    let relax_file = file_config.relax.take().unwrap_or_default();
    let relax = core_config::RelaxConfig {
        fmax: args.fmax.or(relax_file.fmax).unwrap_or(defaults.fmax),
        max_steps: args
            .max_steps
            .or(relax_file.max_steps)
            .unwrap_or(defaults.max_steps),
        max_step: relax_file.max_step.unwrap_or(defaults.max_step),
        require_convergence: !args.allow_unconverged
            && relax_file.require_convergence.unwrap_or(true),
    };

    // --- Oracle ---
    let oracle_file = file_config.oracle.take().unwrap_or_default();
    let kind = match args.oracle {
        Some(kind) => kind,
        None => {
            let name = oracle_file.kind.as_deref().unwrap_or(&defaults.oracle_kind);
            <OracleKind as ValueEnum>::from_str(name, true)
                .map_err(|_| CliError::Config(format!("Unknown oracle kind '{}'.", name)))?
        }
    };
    let oracle = match kind {
        OracleKind::Morse => OracleChoice::Morse,
        OracleKind::Command => OracleChoice::Command {
            program: args
                .oracle_program
                .clone()
                .or(oracle_file.program)
                .ok_or_else(|| {
                    CliError::Config(
                        "The 'command' oracle requires `oracle.program` or --oracle-program."
                            .to_string(),
                    )
                })?,
            args: if args.oracle_args.is_empty() {
                oracle_file.args.unwrap_or_default()
            } else {
                args.oracle_args.clone()
            },
        },
    };
    let oracle_config = OracleConfig {
        method: oracle_file.method.unwrap_or(defaults.method),
        xc: oracle_file.xc.unwrap_or(defaults.xc),
        cutoff: oracle_file.cutoff.unwrap_or(defaults.cutoff),
        kpts: oracle_file.kpts.unwrap_or(defaults.kpts),
        smearing: oracle_file.smearing.unwrap_or(defaults.smearing),
        symmetry: oracle_file.symmetry.unwrap_or(false),
        extra: oracle_file.extra,
    };

    let mut builder = core_config::PipelineConfigBuilder::new()
        .slab(slab)
        .fixed_layers(fixed_layers)
        .adsorbate(adsorbate)
        .gas_box_size(gas_box_size)
        .site_variants(variants)
        .layer_tolerance(layer_tolerance)
        .guard(guard)
        .relax(relax)
        .oracle(oracle_config)
        .gas_kpts(oracle_file.gas_kpts.unwrap_or(defaults.gas_kpts));
    for (kind, height) in heights {
        builder = builder.site_height(kind, height);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        output_dir: args.output.clone(),
        oracle,
        core_config,
    })
}

fn build_adsorbate(species: &[String], bond_length: f64) -> Result<Adsorbate> {
    let adsorbate = match species {
        [single] => Adsorbate::new(vec![Atom::new(single, Point3::origin())]),
        [anchor, partner] => Adsorbate::diatomic(anchor, partner, bond_length),
        _ => {
            return Err(CliError::Config(format!(
                "`adsorbate.species` must list one or two species, got {}.",
                species.len()
            )));
        }
    };
    adsorbate.map_err(|e| CliError::Config(e.to_string()))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid value for {}: '{}'", key, value))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) = parser::parse_key_value(kv_pair).map_err(|_| {
            CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            ))
        })?;

        match key {
            "slab.element" => {
                config.slab.get_or_insert_with(Default::default).element = Some(value.to_string());
            }
            "slab.facet" => {
                config.slab.get_or_insert_with(Default::default).facet = Some(value.to_string());
            }
            "slab.size" => {
                config.slab.get_or_insert_with(Default::default).size = Some(
                    parser::parse_size(value).map_err(|e| CliError::Config(e.to_string()))?,
                );
            }
            "slab.vacuum" => {
                config.slab.get_or_insert_with(Default::default).vacuum = Some(parse_value(key, value)?);
            }
            "slab.lattice-constant" => {
                config.slab.get_or_insert_with(Default::default).lattice_constant =
                    Some(parse_value(key, value)?);
            }
            "slab.fixed-layers" => {
                config.slab.get_or_insert_with(Default::default).fixed_layers =
                    Some(parse_value(key, value)?);
            }
            "adsorbate.bond-length" => {
                config.adsorbate.get_or_insert_with(Default::default).bond_length =
                    Some(parse_value(key, value)?);
            }
            "adsorbate.gas-box-size" => {
                config.adsorbate.get_or_insert_with(Default::default).gas_box_size =
                    Some(parse_value(key, value)?);
            }
            "sites.layer-tolerance" => {
                config.sites.get_or_insert_with(Default::default).layer_tolerance =
                    Some(parse_value(key, value)?);
            }
            "guard.min-height" => {
                config.guard.get_or_insert_with(Default::default).min_height =
                    Some(parse_value(key, value)?);
            }
            "guard.min-distance" => {
                config.guard.get_or_insert_with(Default::default).min_distance =
                    Some(parse_value(key, value)?);
            }
            "relax.fmax" => {
                config.relax.get_or_insert_with(Default::default).fmax = Some(parse_value(key, value)?);
            }
            "relax.max-steps" => {
                config.relax.get_or_insert_with(Default::default).max_steps =
                    Some(parse_value(key, value)?);
            }
            "relax.max-step" => {
                config.relax.get_or_insert_with(Default::default).max_step =
                    Some(parse_value(key, value)?);
            }
            "relax.require-convergence" => {
                config.relax.get_or_insert_with(Default::default).require_convergence =
                    Some(parse_value(key, value)?);
            }
            "oracle.kind" => {
                config.oracle.get_or_insert_with(Default::default).kind = Some(value.to_string());
            }
            "oracle.program" => {
                config.oracle.get_or_insert_with(Default::default).program = Some(value.to_string());
            }
            "oracle.method" => {
                config.oracle.get_or_insert_with(Default::default).method = Some(value.to_string());
            }
            "oracle.xc" => {
                config.oracle.get_or_insert_with(Default::default).xc = Some(value.to_string());
            }
            "oracle.cutoff" => {
                config.oracle.get_or_insert_with(Default::default).cutoff =
                    Some(parse_value(key, value)?);
            }
            "oracle.smearing" => {
                config.oracle.get_or_insert_with(Default::default).smearing =
                    Some(parse_value(key, value)?);
            }
            "oracle.symmetry" => {
                config.oracle.get_or_insert_with(Default::default).symmetry =
                    Some(parse_value(key, value)?);
            }
            _ => {
                if let Some(site) = key.strip_prefix("sites.heights.") {
                    let kind = parser::parse_site(site).map_err(|e| CliError::Config(e.to_string()))?;
                    config
                        .sites
                        .get_or_insert_with(Default::default)
                        .heights
                        .insert(kind.as_str().to_string(), parse_value(key, value)?);
                } else if let Some(option) = key.strip_prefix("oracle.extra.") {
                    config
                        .oracle
                        .get_or_insert_with(Default::default)
                        .extra
                        .insert(option.to_string(), value.to_string());
                } else {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut args = vec!["chemisorb", "run", "-o", "out"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Run(run_args) => run_args,
            _ => panic!("Expected 'run' subcommand"),
        }
    }

    fn with_config(path: &Path, extra: &[&str]) -> RunArgs {
        let mut args = vec!["-c", path.to_str().unwrap()];
        args.extend_from_slice(extra);
        run_args(&args)
    }

    #[test]
    fn defaults_describe_co_on_pt111() {
        let config = build_config(&run_args(&[])).unwrap();
        let core = &config.core_config;

        assert_eq!(config.oracle, OracleChoice::Morse);
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(core.slab.spec.element, "Pt");
        assert_eq!(core.slab.spec.facet, Facet::Fcc111);
        assert_eq!(core.slab.spec.size, [2, 2, 4]);
        assert_eq!(core.slab.fixed_layers, 2);
        assert_eq!(core.adsorbate.adsorbate.label(), "CO");
        assert_eq!(core.sites.variants, vec![SiteKind::OnTop, SiteKind::Bridge]);
        assert_eq!(core.sites.height(SiteKind::OnTop).unwrap(), 1.85);
        assert_eq!(core.sites.height(SiteKind::Bridge).unwrap(), 2.4);
        assert_eq!(core.relax.fmax, 0.05);
        assert!(core.relax.require_convergence);
        assert_eq!(core.oracle.kpts, [4, 4, 1]);
        assert_eq!(core.gas_oracle.kpts, [1, 1, 1]);
    }

    #[test]
    fn cli_args_override_file_values() {
        let path = write_config_file(
            "override.toml",
            r#"
        [slab]
        element = "Cu"
        size = [3, 3, 5]
        fixed-layers = 3

        [relax]
        fmax = 0.1 # Will be overridden

        [oracle]
        cutoff = 500.0
        kpts = [6, 6, 1]
        "#,
        );
        let args = with_config(&path, &["--fmax", "0.02", "--size", "2x2x3", "--sites", "bridge"]);
        let core = build_config(&args).unwrap().core_config;

        assert_eq!(core.slab.spec.element, "Cu");
        assert_eq!(core.slab.spec.size, [2, 2, 3]);
        assert_eq!(core.slab.fixed_layers, 3);
        assert_eq!(core.relax.fmax, 0.02);
        assert_eq!(core.sites.variants, vec![SiteKind::Bridge]);
        assert_eq!(core.oracle.cutoff, 500.0);
        assert_eq!(core.gas_oracle.cutoff, 500.0);
        assert_eq!(core.gas_oracle.kpts, [1, 1, 1]);
    }

    #[test]
    fn set_values_override_file_and_defaults() {
        let path = write_config_file(
            "set.toml",
            r#"
        [sites]
        variants = ["on-top", "bridge"]

        [sites.heights]
        bridge = 2.0 # Will be overridden by --set
        "#,
        );
        let args = with_config(
            &path,
            &[
                "-S",
                "sites.heights.bridge=2.2",
                "-S",
                "relax.require-convergence=false",
                "-S",
                "oracle.extra.ecut-wfc=45",
                "-S",
                "slab.vacuum=12.5",
            ],
        );
        let core = build_config(&args).unwrap().core_config;

        assert_eq!(core.sites.height(SiteKind::Bridge).unwrap(), 2.2);
        assert_eq!(core.sites.height(SiteKind::OnTop).unwrap(), 1.85);
        assert!(!core.relax.require_convergence);
        assert_eq!(core.oracle.extra.get("ecut-wfc").map(String::as_str), Some("45"));
        assert_eq!(core.slab.spec.vacuum, 12.5);
    }

    #[test]
    fn unsupported_set_key_is_rejected() {
        let result = build_config(&run_args(&["-S", "relax.patience=3"]));
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("relax.patience")));
    }

    #[test]
    fn unknown_file_field_is_a_parse_error() {
        let path = write_config_file("unknown.toml", "[relax]\nfmax = 0.05\npatience = 3\n");
        assert!(matches!(
            build_config(&with_config(&path, &[])),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn command_oracle_requires_a_program() {
        let result = build_config(&run_args(&["--oracle", "command"]));
        assert!(matches!(result, Err(CliError::Config(_))));

        let config = build_config(&run_args(&[
            "--oracle",
            "command",
            "--oracle-program",
            "run-dft",
            "--oracle-arg",
            "--fast",
        ]))
        .unwrap();
        assert_eq!(
            config.oracle,
            OracleChoice::Command {
                program: "run-dft".to_string(),
                args: vec!["--fast".to_string()],
            }
        );
    }
}
