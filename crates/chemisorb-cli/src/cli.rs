use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "chemisorb CLI - Adsorption energies of small molecules on periodic metal slabs, driven by an external energy/force oracle.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel site variants.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full adsorption pipeline: slab, gas-phase reference and every site variant.
    Run(RunArgs),
    /// Compute and rank adsorption energies from the oracle logs of a finished run.
    Energies(EnergiesArgs),
    /// Check the height and closest approach of an adsorbate in a structure file.
    Inspect(InspectArgs),
}

/// Which oracle evaluates energies and forces.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleKind {
    /// Built-in analytic Morse potential, for dry runs.
    Morse,
    /// An external program run once per evaluation.
    Command,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    // --- Core Arguments ---
    /// Directory receiving the artifacts of every stage.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Slab Overrides ---
    /// Override the slab element (e.g., 'Pt').
    #[arg(short, long, value_name = "SYMBOL")]
    pub element: Option<String>,

    /// Override the surface facet ('fcc111' or 'fcc100').
    #[arg(long, value_name = "FACET")]
    pub facet: Option<String>,

    /// Override the slab size as NXxNYxLAYERS (e.g., '2x2x4').
    #[arg(long, value_name = "NXxNYxL")]
    pub size: Option<String>,

    /// Override the vacuum padding on each side of the slab, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub vacuum: Option<f64>,

    /// Override the number of bottom layers held fixed.
    #[arg(long, value_name = "INT")]
    pub fixed_layers: Option<usize>,

    // --- Site Overrides ---
    /// Site variants to evaluate, comma separated (e.g., 'on-top,bridge').
    #[arg(long, value_name = "KINDS", value_delimiter = ',')]
    pub sites: Option<Vec<String>>,

    // --- Relaxation Overrides ---
    /// Override the force convergence threshold, in eV/Å.
    #[arg(long, value_name = "FLOAT")]
    pub fmax: Option<f64>,

    /// Override the maximum number of optimizer steps per relaxation.
    #[arg(long, value_name = "INT")]
    pub max_steps: Option<usize>,

    /// Accept relaxations that run out of steps instead of failing.
    #[arg(long)]
    pub allow_unconverged: bool,

    // --- Oracle Selection ---
    /// Override the oracle implementation.
    #[arg(long, value_enum, value_name = "KIND")]
    pub oracle: Option<OracleKind>,

    /// Program run by the 'command' oracle.
    #[arg(long, value_name = "PROGRAM")]
    pub oracle_program: Option<String>,

    /// Argument passed to the oracle program. Can be used multiple times.
    #[arg(long = "oracle-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub oracle_args: Vec<String>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S relax.fmax=0.02
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `energies` subcommand.
#[derive(Args, Debug)]
pub struct EnergiesArgs {
    /// Output directory of an earlier `run`; its oracle logs are located automatically.
    #[arg(short, long, value_name = "DIR", conflicts_with_all = ["slab_log", "gas_log", "site_logs"])]
    pub run_dir: Option<PathBuf>,

    /// Label of the adsorbate used by the run (names the gas-phase stage).
    #[arg(long, default_value = "CO", value_name = "LABEL")]
    pub adsorbate: String,

    /// Site variants to read from the run directory, comma separated.
    #[arg(long, value_name = "KINDS", value_delimiter = ',', default_value = "on-top,bridge")]
    pub sites: Vec<String>,

    /// Oracle log of the relaxed bare slab.
    #[arg(long, value_name = "PATH", requires = "gas_log")]
    pub slab_log: Option<PathBuf>,

    /// Oracle log of the gas-phase molecule.
    #[arg(long, value_name = "PATH", requires = "slab_log")]
    pub gas_log: Option<PathBuf>,

    /// Oracle log of one site variant as KIND=PATH. Can be used multiple times.
    #[arg(long = "site-log", value_name = "KIND=PATH")]
    pub site_logs: Vec<String>,

    /// Write the energies to a summary file.
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Extended XYZ structure to inspect. The last frame is used.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Species of the adsorbate atom bonding to the surface.
    #[arg(long, default_value = "C", value_name = "SYMBOL")]
    pub anchor: String,

    /// Species of the surface atoms.
    #[arg(long, default_value = "Pt", value_name = "SYMBOL")]
    pub surface: String,

    /// Minimum acceptable height above the top surface atom, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub min_height: Option<f64>,

    /// Minimum acceptable anchor-to-surface distance, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub min_distance: Option<f64>,
}
