use super::config::ConfigError;
use super::oracle::OracleError;
use crate::core::builder::BuildError;
use crate::core::energy::adsorption::AggregationError;
use crate::core::energy::extract::ExtractionError;
use crate::core::energy::summary::SummaryError;
use crate::core::geometry::GeometryError;
use crate::core::geometry::sites::SiteKind;
use crate::core::io::xyz::XyzError;
use crate::core::models::structure::StructureError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Stage '{stage}' requires {path}, which does not exist")]
    MissingInputFile { stage: String, path: PathBuf },

    #[error("No energy marker found in {origin}")]
    MissingEnergyMarker { origin: String },

    #[error(
        "Relaxation '{label}' did not converge in {steps} steps (max force {max_force:.4} eV/Å > fmax {fmax} eV/Å)"
    )]
    NonConvergence {
        label: String,
        steps: usize,
        max_force: f64,
        fmax: f64,
    },

    #[error(
        "Placement at the {site} site is too close to the surface: height {height:.3} Å (minimum {min_height}), closest approach {min_distance:.3} Å (minimum {min_allowed_distance})"
    )]
    GeometryInvalid {
        site: SiteKind,
        height: f64,
        min_distance: f64,
        min_height: f64,
        min_allowed_distance: f64,
    },

    #[error("Cannot combine energies from different oracle settings (differing: {})", fields.join(", "))]
    InconsistentConfiguration { fields: Vec<String> },

    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),

    #[error("Geometry analysis failed: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Failed to build structure: {0}")]
    Build(#[from] BuildError),

    #[error("Structure file error: {0}")]
    Xyz(#[from] XyzError),

    #[error("Oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Energy extraction failed: {0}")]
    Extraction(ExtractionError),

    #[error("Summary report error: {0}")]
    Summary(#[from] SummaryError),

    #[error("I/O error on {path}: {origin}")]
    Io {
        path: PathBuf,
        origin: std::io::Error,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, origin: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            origin,
        }
    }
}

impl From<ExtractionError> for EngineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::MissingInputFile { path } => EngineError::MissingInputFile {
                stage: "energy extraction".to_string(),
                path,
            },
            ExtractionError::MissingEnergyMarker { origin } => {
                EngineError::MissingEnergyMarker { origin }
            }
            other => EngineError::Extraction(other),
        }
    }
}

impl From<AggregationError> for EngineError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::InconsistentConfiguration { fields } => {
                EngineError::InconsistentConfiguration { fields }
            }
        }
    }
}
