use crate::error::{CliError, Result};
use chemisorb::core::geometry::sites::SiteKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSlabConfig {
    pub element: Option<String>,
    pub facet: Option<String>,
    pub size: Option<[usize; 3]>,
    pub vacuum: Option<f64>,
    pub lattice_constant: Option<f64>,
    pub fixed_layers: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileAdsorbateConfig {
    /// Anchor species first, e.g. `["C", "O"]`.
    pub species: Option<Vec<String>>,
    pub bond_length: Option<f64>,
    pub gas_box_size: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSitesConfig {
    pub variants: Option<Vec<SiteKind>>,
    /// Placement height per site kind, keyed by name (`on-top`, `bridge`).
    #[serde(default)]
    pub heights: BTreeMap<String, f64>,
    pub layer_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileGuardConfig {
    pub min_height: Option<f64>,
    pub min_distance: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRelaxConfig {
    pub fmax: Option<f64>,
    pub max_steps: Option<usize>,
    pub max_step: Option<f64>,
    pub require_convergence: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileOracleConfig {
    /// `morse` or `command`.
    pub kind: Option<String>,
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub method: Option<String>,
    pub xc: Option<String>,
    pub cutoff: Option<f64>,
    pub kpts: Option<[u32; 3]>,
    pub gas_kpts: Option<[u32; 3]>,
    pub smearing: Option<f64>,
    pub symmetry: Option<bool>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub slab: Option<FileSlabConfig>,
    pub adsorbate: Option<FileAdsorbateConfig>,
    pub sites: Option<FileSitesConfig>,
    pub guard: Option<FileGuardConfig>,
    pub relax: Option<FileRelaxConfig>,
    pub oracle: Option<FileOracleConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
