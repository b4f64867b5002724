//! Flux variability analysis
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::analysis::AnalysisError;
use crate::metabolic::model::Model;
use crate::optimize::{FluxProblem, ObjectiveSense};

/// Flux range of a reaction at the constrained optimum
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FvaRow {
    pub reaction_id: String,
    /// `None` when the reaction could not be minimized
    pub minimum: Option<f64>,
    /// `None` when the reaction could not be maximized
    pub maximum: Option<f64>,
}

/// Compute the minimum and maximum flux of `reaction_ids` while keeping the objective
/// within `fraction_of_optimum` of its optimal value
#[instrument(skip(model, reaction_ids), fields(reactions = reaction_ids.len()))]
pub fn flux_variability_analysis(
    model: &Model,
    reaction_ids: &[String],
    fraction_of_optimum: f64,
    tolerance: f64,
) -> Result<Vec<FvaRow>, AnalysisError> {
    if !(0. ..=1.).contains(&fraction_of_optimum) {
        return Err(AnalysisError::InvalidFraction(fraction_of_optimum));
    }
    if !model.has_objective() {
        return Err(AnalysisError::NoObjective);
    }
    if let Some(missing) = reaction_ids.iter().find(|id| !model.reactions.contains_key(*id)) {
        return Err(AnalysisError::ReactionNotFound(missing.clone()));
    }

    let mut problem = FluxProblem::from_model(model);
    let optimum = problem.solve(tolerance);
    let optimum_value = match optimum.objective_value {
        Some(value) if optimum.status.has_solution() => value,
        _ => return Err(AnalysisError::OptimizationFailed(optimum.status)),
    };
    let limit = fraction_of_optimum * optimum_value;
    debug!(optimum = optimum_value, limit, "Constraining objective for FVA");
    match model.objective_sense {
        ObjectiveSense::Maximize => {
            problem.add_linear_constraint(&model.objective, Some(limit), None)?
        }
        ObjectiveSense::Minimize => {
            problem.add_linear_constraint(&model.objective, None, Some(limit))?
        }
    }

    let mut rows = Vec::with_capacity(reaction_ids.len());
    for id in reaction_ids {
        let mut coefficients = IndexMap::new();
        coefficients.insert(id.clone(), 1.);
        let mut extreme = |sense: ObjectiveSense| -> Result<Option<f64>, AnalysisError> {
            problem.set_objective(&coefficients, sense)?;
            let solution = problem.solve(tolerance);
            if !solution.status.has_solution() {
                warn!(reaction = %id, %sense, status = %solution.status, "FVA bound not found");
            }
            Ok(solution.objective_value)
        };
        let minimum = extreme(ObjectiveSense::Minimize)?;
        let maximum = extreme(ObjectiveSense::Maximize)?;
        rows.push(FvaRow {
            reaction_id: id.clone(),
            minimum,
            maximum,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-7;

    fn toy_model() -> Model {
        Model::from_json_str(include_str!("../../test_data/toy_model.json")).unwrap()
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn transport_range_at_ninety_percent() {
        let rows = flux_variability_analysis(&toy_model(), &ids(&["GLCt", "R2"]), 0.9, TOL)
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reaction_id, "GLCt");
        assert!((rows[0].minimum.unwrap() - 9.).abs() < 1e-3);
        assert!((rows[0].maximum.unwrap() - 10.).abs() < 1e-3);
        // R2 yields half the pyruvate of R1, so at most 2 units of glucose can take it
        assert!(rows[1].minimum.unwrap().abs() < 1e-3);
        assert!((rows[1].maximum.unwrap() - 2.).abs() < 1e-3);
    }

    #[test]
    fn full_optimum_pins_objective() {
        let rows = flux_variability_analysis(&toy_model(), &ids(&["BIOMASS"]), 1.0, TOL).unwrap();
        assert!((rows[0].minimum.unwrap() - 20.).abs() < 1e-3);
        assert!((rows[0].maximum.unwrap() - 20.).abs() < 1e-3);
    }

    #[test]
    fn rejects_bad_input() {
        let model = toy_model();
        assert_eq!(
            flux_variability_analysis(&model, &ids(&["GLCt"]), 1.5, TOL),
            Err(AnalysisError::InvalidFraction(1.5))
        );
        assert_eq!(
            flux_variability_analysis(&model, &ids(&["NOPE"]), 0.9, TOL),
            Err(AnalysisError::ReactionNotFound("NOPE".to_string()))
        );
        let mut no_objective = model.clone();
        no_objective.objective.clear();
        assert_eq!(
            flux_variability_analysis(&no_objective, &ids(&["GLCt"]), 0.9, TOL),
            Err(AnalysisError::NoObjective)
        );
    }
}
