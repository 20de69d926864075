use chemisorb::engine::config as core_config;
use std::path::PathBuf;

/// The oracle a run evaluates energies with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleChoice {
    Morse,
    Command { program: String, args: Vec<String> },
}

pub struct AppConfig {
    pub output_dir: PathBuf,
    pub oracle: OracleChoice,
    pub core_config: core_config::PipelineConfig,
}
