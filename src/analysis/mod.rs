//! Flux analyses built on top of [`FluxProblem`](crate::optimize::FluxProblem)
use std::fmt::{Display, Formatter};

use serde::Serialize;
use thiserror::Error;

use crate::metabolic::model::GprError;
use crate::optimize::{OptimizationStatus, ProblemError};

pub mod deletion;
pub mod fba;
pub mod fva;

pub use deletion::{
    double_gene_deletion, double_reaction_deletion, single_gene_deletion,
    single_reaction_deletion, DeletionRow,
};
pub use fba::fba;
pub use fva::{flux_variability_analysis, FvaRow};

/// Errors raised while running an analysis
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("fraction_of_optimum must be between 0 and 1, got {0}")]
    InvalidFraction(f64),
    #[error("No Objective Function is set for the model.")]
    NoObjective,
    #[error("Reaction '{0}' not found in model.")]
    ReactionNotFound(String),
    #[error("Gene '{0}' not found in model.")]
    GeneNotFound(String),
    #[error("Optimization of the objective failed with status {0}")]
    OptimizationFailed(OptimizationStatus),
    #[error(transparent)]
    Problem(#[from] ProblemError),
    #[error(transparent)]
    Gpr(#[from] GprError),
}

/// Set of ids knocked out together, shown as `{a, b}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdSet(pub Vec<String>);

impl Display for IdSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.0.join(", "))
    }
}
