//! Flux balance analysis
use tracing::{debug, instrument};

use crate::metabolic::model::Model;
use crate::optimize::{FluxProblem, ProblemSolution};

/// Optimize the model's objective under its current bounds
#[instrument(skip(model), fields(model = model.id.as_deref().unwrap_or("unnamed")))]
pub fn fba(model: &Model, tolerance: f64) -> ProblemSolution {
    let solution = FluxProblem::from_model(model).solve(tolerance);
    debug!(status = %solution.status, objective = ?solution.objective_value, "FBA finished");
    solution
}
