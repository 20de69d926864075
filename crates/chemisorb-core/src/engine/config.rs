use super::placement::PlacementReport;
use crate::core::builder::molecule::Adsorbate;
use crate::core::builder::slab::SlabSpec;
use crate::core::geometry::sites::SiteKind;
use crate::core::models::calculation::OracleConfig;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// The bare slab and how many of its bottom layers stay frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct SlabConfig {
    pub spec: SlabSpec,
    pub fixed_layers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdsorbateConfig {
    pub adsorbate: Adsorbate,
    /// Edge of the non-periodic box for the gas-phase reference, in Angstroms.
    pub gas_box_size: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    /// Site variants to compute, each in its own namespace.
    pub variants: Vec<SiteKind>,
    /// Initial anchor height above the site for each variant, in Angstroms.
    pub heights: BTreeMap<SiteKind, f64>,
    /// Tolerance for top-layer membership, in Angstroms.
    pub layer_tolerance: f64,
}

impl SiteConfig {
    pub fn height(&self, kind: SiteKind) -> Result<f64, ConfigError> {
        self.heights
            .get(&kind)
            .copied()
            .ok_or(ConfigError::MissingParameter("sites.heights"))
    }
}

/// Minimum acceptable placement geometry, checked before any oracle call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryGuard {
    /// Minimum height of the anchor atom above the top surface layer.
    pub min_height: f64,
    /// Minimum distance between the anchor atom and any surface atom.
    pub min_distance: f64,
}

impl Default for GeometryGuard {
    fn default() -> Self {
        Self {
            min_height: 1.2,
            min_distance: 1.6,
        }
    }
}

impl GeometryGuard {
    /// Returns `true` if the measured placement satisfies both limits.
    pub fn accepts(&self, report: &PlacementReport) -> bool {
        report.height >= self.min_height && report.min_distance >= self.min_distance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxConfig {
    /// Convergence threshold on the largest force of a free atom, in eV/Angstrom.
    pub fmax: f64,
    pub max_steps: usize,
    /// Largest displacement of any atom in one step, in Angstroms.
    pub max_step: f64,
    /// Whether a relaxation that runs out of steps fails the stage.
    pub require_convergence: bool,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        Self {
            fmax: 0.05,
            max_steps: 200,
            max_step: 0.2,
            require_convergence: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub slab: SlabConfig,
    pub adsorbate: AdsorbateConfig,
    pub sites: SiteConfig,
    pub guard: GeometryGuard,
    pub relax: RelaxConfig,
    /// Oracle settings for the slab and every slab+adsorbate complex.
    pub oracle: OracleConfig,
    /// Oracle settings for the isolated gas-phase molecule.
    pub gas_oracle: OracleConfig,
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    slab: Option<SlabSpec>,
    fixed_layers: Option<usize>,
    adsorbate: Option<Adsorbate>,
    gas_box_size: Option<f64>,
    site_variants: Option<Vec<SiteKind>>,
    site_heights: BTreeMap<SiteKind, f64>,
    layer_tolerance: Option<f64>,
    guard: Option<GeometryGuard>,
    relax: Option<RelaxConfig>,
    oracle: Option<OracleConfig>,
    gas_kpts: Option<[u32; 3]>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slab(mut self, spec: SlabSpec) -> Self {
        self.slab = Some(spec);
        self
    }
    pub fn fixed_layers(mut self, n: usize) -> Self {
        self.fixed_layers = Some(n);
        self
    }
    pub fn adsorbate(mut self, adsorbate: Adsorbate) -> Self {
        self.adsorbate = Some(adsorbate);
        self
    }
    pub fn gas_box_size(mut self, size: f64) -> Self {
        self.gas_box_size = Some(size);
        self
    }
    pub fn site_variants(mut self, variants: Vec<SiteKind>) -> Self {
        self.site_variants = Some(variants);
        self
    }
    pub fn site_height(mut self, kind: SiteKind, height: f64) -> Self {
        self.site_heights.insert(kind, height);
        self
    }
    pub fn layer_tolerance(mut self, tolerance: f64) -> Self {
        self.layer_tolerance = Some(tolerance);
        self
    }
    pub fn guard(mut self, guard: GeometryGuard) -> Self {
        self.guard = Some(guard);
        self
    }
    pub fn relax(mut self, relax: RelaxConfig) -> Self {
        self.relax = Some(relax);
        self
    }
    pub fn oracle(mut self, config: OracleConfig) -> Self {
        self.oracle = Some(config);
        self
    }
    pub fn gas_kpts(mut self, kpts: [u32; 3]) -> Self {
        self.gas_kpts = Some(kpts);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let variants = self
            .site_variants
            .ok_or(ConfigError::MissingParameter("site_variants"))?;
        if variants.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "site_variants",
                reason: "at least one site variant is required".to_string(),
            });
        }
        for kind in &variants {
            if !self.site_heights.contains_key(kind) {
                return Err(ConfigError::InvalidParameter {
                    name: "site_heights",
                    reason: format!("no placement height for the {} site", kind),
                });
            }
        }

        let relax = self.relax.ok_or(ConfigError::MissingParameter("relax"))?;
        if !(relax.fmax > 0.0) || !(relax.max_step > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "relax",
                reason: "fmax and max_step must be positive".to_string(),
            });
        }

        let oracle = self.oracle.ok_or(ConfigError::MissingParameter("oracle"))?;
        let gas_oracle = oracle.with_kpts(
            self.gas_kpts
                .ok_or(ConfigError::MissingParameter("gas_kpts"))?,
        );

        Ok(PipelineConfig {
            slab: SlabConfig {
                spec: self.slab.ok_or(ConfigError::MissingParameter("slab"))?,
                fixed_layers: self
                    .fixed_layers
                    .ok_or(ConfigError::MissingParameter("fixed_layers"))?,
            },
            adsorbate: AdsorbateConfig {
                adsorbate: self
                    .adsorbate
                    .ok_or(ConfigError::MissingParameter("adsorbate"))?,
                gas_box_size: self
                    .gas_box_size
                    .ok_or(ConfigError::MissingParameter("gas_box_size"))?,
            },
            sites: SiteConfig {
                variants,
                heights: self.site_heights,
                layer_tolerance: self
                    .layer_tolerance
                    .ok_or(ConfigError::MissingParameter("layer_tolerance"))?,
            },
            guard: self.guard.unwrap_or_default(),
            relax,
            oracle,
            gas_oracle,
        })
    }
}
