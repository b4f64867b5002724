//! Single and double gene and reaction knockout simulations
use serde::Serialize;
use tracing::{debug, instrument};

use crate::analysis::{AnalysisError, IdSet};
use crate::metabolic::model::Model;
use crate::optimize::{FluxProblem, OptimizationStatus};

/// Outcome of knocking out a set of genes or reactions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletionRow {
    /// Knocked out ids
    pub ids: IdSet,
    /// Objective value after the knockout, `None` if the problem has no solution
    pub growth: Option<f64>,
    pub status: OptimizationStatus,
}

/// Which kind of entity is knocked out
#[derive(Debug, Clone, Copy)]
enum Target {
    Gene,
    Reaction,
}

/// Knock out every gene in `gene_ids` on its own
#[instrument(skip_all, fields(genes = gene_ids.len()))]
pub fn single_gene_deletion(
    model: &Model,
    gene_ids: &[String],
    tolerance: f64,
) -> Result<Vec<DeletionRow>, AnalysisError> {
    run_deletions(model, Target::Gene, singles(gene_ids), tolerance)
}

/// Knock out every unordered pair of distinct genes in `gene_ids`
#[instrument(skip_all, fields(genes = gene_ids.len()))]
pub fn double_gene_deletion(
    model: &Model,
    gene_ids: &[String],
    tolerance: f64,
) -> Result<Vec<DeletionRow>, AnalysisError> {
    run_deletions(model, Target::Gene, pairs(gene_ids), tolerance)
}

/// Knock out every reaction in `reaction_ids` on its own
#[instrument(skip_all, fields(reactions = reaction_ids.len()))]
pub fn single_reaction_deletion(
    model: &Model,
    reaction_ids: &[String],
    tolerance: f64,
) -> Result<Vec<DeletionRow>, AnalysisError> {
    run_deletions(model, Target::Reaction, singles(reaction_ids), tolerance)
}

/// Knock out every unordered pair of distinct reactions in `reaction_ids`
#[instrument(skip_all, fields(reactions = reaction_ids.len()))]
pub fn double_reaction_deletion(
    model: &Model,
    reaction_ids: &[String],
    tolerance: f64,
) -> Result<Vec<DeletionRow>, AnalysisError> {
    run_deletions(model, Target::Reaction, pairs(reaction_ids), tolerance)
}

fn singles(ids: &[String]) -> Vec<Vec<String>> {
    ids.iter().map(|id| vec![id.clone()]).collect()
}

fn pairs(ids: &[String]) -> Vec<Vec<String>> {
    let mut unique: Vec<&String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    let mut combinations = Vec::new();
    for (i, first) in unique.iter().enumerate() {
        for second in &unique[i + 1..] {
            combinations.push(vec![(*first).clone(), (*second).clone()]);
        }
    }
    combinations
}

fn run_deletions(
    model: &Model,
    target: Target,
    knockouts: Vec<Vec<String>>,
    tolerance: f64,
) -> Result<Vec<DeletionRow>, AnalysisError> {
    for id in knockouts.iter().flatten() {
        match target {
            Target::Gene if !model.genes.contains_key(id) => {
                return Err(AnalysisError::GeneNotFound(id.clone()))
            }
            Target::Reaction if !model.reactions.contains_key(id) => {
                return Err(AnalysisError::ReactionNotFound(id.clone()))
            }
            _ => {}
        }
    }

    let base = FluxProblem::from_model(model);
    let mut rows = Vec::with_capacity(knockouts.len());
    for ids in knockouts {
        let disabled = match target {
            Target::Gene => model.disabled_reactions_for_genes(&ids)?,
            Target::Reaction => ids.clone(),
        };
        let mut problem = base.clone();
        for reaction in &disabled {
            problem.set_bounds(reaction, 0., 0.)?;
        }
        let solution = problem.solve(tolerance);
        debug!(?ids, disabled = disabled.len(), status = %solution.status, "Knockout solved");
        rows.push(DeletionRow {
            ids: IdSet(ids),
            growth: solution.objective_value,
            status: solution.status,
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

    fn growth(row: &DeletionRow) -> f64 {
        row.growth.unwrap()
    }

    #[test]
    fn single_gene_knockouts() {
        let rows = single_gene_deletion(&toy_model(), &ids(&["g1", "g3", "g5"]), TOL).unwrap();
        assert_eq!(rows.len(), 3);
        // g2 still carries the transport
        assert!((growth(&rows[0]) - 20.).abs() < 1e-3);
        // R1 needs both g3 and g4
        assert!((growth(&rows[1]) - 10.).abs() < 1e-3);
        assert!((growth(&rows[2]) - 20.).abs() < 1e-3);
        assert_eq!(rows[1].ids.to_string(), "{g3}");
    }

    #[test]
    fn double_gene_knockout_blocks_transport() {
        let rows = double_gene_deletion(&toy_model(), &ids(&["g1", "g2", "g3"]), TOL).unwrap();
        let labels: Vec<String> = rows.iter().map(|r| r.ids.to_string()).collect();
        assert_eq!(labels, vec!["{g1, g2}", "{g1, g3}", "{g2, g3}"]);
        assert!(growth(&rows[0]).abs() < 1e-3);
        assert!((growth(&rows[1]) - 10.).abs() < 1e-3);
    }

    #[test]
    fn reaction_knockouts() {
        let model = toy_model();
        let single = single_reaction_deletion(&model, &ids(&["R1", "GLCt"]), TOL).unwrap();
        assert!((growth(&single[0]) - 10.).abs() < 1e-3);
        assert!(growth(&single[1]).abs() < 1e-3);

        let double = double_reaction_deletion(&model, &ids(&["R1", "R2", "R1"]), TOL).unwrap();
        assert_eq!(double.len(), 1);
        assert!(growth(&double[0]).abs() < 1e-3);
        assert_eq!(double[0].status, OptimizationStatus::Optimal);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let model = toy_model();
        assert_eq!(
            single_gene_deletion(&model, &ids(&["nope"]), TOL),
            Err(AnalysisError::GeneNotFound("nope".to_string()))
        );
        assert_eq!(
            single_reaction_deletion(&model, &ids(&["nope"]), TOL),
            Err(AnalysisError::ReactionNotFound("nope".to_string()))
        );
    }
}
