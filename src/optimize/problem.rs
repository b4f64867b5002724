//! Provides the flux balance linear program and its solution through Clarabel
use clarabel::algebra::CscMatrix;
use clarabel::solver::*;
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::metabolic::model::Model;
use crate::optimize::{ObjectiveSense, OptimizationStatus, ProblemError, ProblemSolution};

/// A linear row `lower <= sum(coef * x[index]) <= upper`
#[derive(Debug, Clone)]
struct LinearConstraint {
    terms: Vec<(usize, f64)>,
    lower: Option<f64>,
    upper: Option<f64>,
}

/// Flux balance LP: one variable per reaction, `S v = 0` for every metabolite,
/// variable bounds, optional extra linear constraints and a linear objective
#[derive(Debug, Clone)]
pub struct FluxProblem {
    /// Variable bounds keyed by reaction id, in model order
    variables: IndexMap<String, (f64, f64)>,
    /// Mass balance rows, always `= 0`
    mass_balance: Vec<Vec<(usize, f64)>>,
    /// Additional constraints
    constraints: Vec<LinearConstraint>,
    /// Objective coefficients by variable index
    objective: Vec<(usize, f64)>,
    sense: ObjectiveSense,
}

impl FluxProblem {
    // region Creation Functions

    /// Build the flux balance problem of a model, including its objective
    pub fn from_model(model: &Model) -> Self {
        let variables: IndexMap<String, (f64, f64)> = model
            .reactions
            .values()
            .map(|r| (r.id.clone(), (r.lower_bound, r.upper_bound)))
            .collect();

        let mut rows: IndexMap<&str, Vec<(usize, f64)>> = model
            .metabolites
            .keys()
            .map(|m| (m.as_str(), Vec::new()))
            .collect();
        for (index, reaction) in model.reactions.values().enumerate() {
            for (met, coef) in &reaction.metabolites {
                if *coef != 0. {
                    rows.entry(met.as_str()).or_default().push((index, *coef));
                }
            }
        }
        let mass_balance = rows.into_values().filter(|row| !row.is_empty()).collect();

        let objective = model
            .objective
            .iter()
            .filter_map(|(id, coef)| variables.get_index_of(id).map(|i| (i, *coef)))
            .collect();

        FluxProblem {
            variables,
            mass_balance,
            constraints: Vec::new(),
            objective,
            sense: model.objective_sense,
        }
    }

    // endregion Creation Functions

    // region Modification

    fn index_of(&self, id: &str) -> Result<usize, ProblemError> {
        self.variables
            .get_index_of(id)
            .ok_or_else(|| ProblemError::UnknownVariable(id.to_string()))
    }

    fn terms(&self, coefficients: &IndexMap<String, f64>) -> Result<Vec<(usize, f64)>, ProblemError> {
        coefficients
            .iter()
            .map(|(id, coef)| Ok((self.index_of(id)?, *coef)))
            .collect()
    }

    /// Change the bounds of a single variable
    pub fn set_bounds(&mut self, id: &str, lower: f64, upper: f64) -> Result<(), ProblemError> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(ProblemError::InvalidBounds {
                name: id.to_string(),
                lower,
                upper,
            });
        }
        let index = self.index_of(id)?;
        self.variables[index] = (lower, upper);
        Ok(())
    }

    /// Current bounds of a variable
    pub fn bounds(&self, id: &str) -> Option<(f64, f64)> {
        self.variables.get(id).copied()
    }

    /// Constrain `lower <= sum(coef * v) <= upper`, a `None` side is unconstrained
    pub fn add_linear_constraint(
        &mut self,
        coefficients: &IndexMap<String, f64>,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<(), ProblemError> {
        if lower.is_some_and(f64::is_nan) || upper.is_some_and(f64::is_nan) {
            return Err(ProblemError::InvalidBounds {
                name: "linear constraint".to_string(),
                lower: lower.unwrap_or(f64::NEG_INFINITY),
                upper: upper.unwrap_or(f64::INFINITY),
            });
        }
        if let (Some(l), Some(u)) = (lower, upper) {
            if l > u {
                return Err(ProblemError::InvalidBounds {
                    name: "linear constraint".to_string(),
                    lower: l,
                    upper: u,
                });
            }
        }
        let terms = self.terms(coefficients)?;
        self.constraints.push(LinearConstraint {
            terms,
            lower,
            upper,
        });
        Ok(())
    }

    /// Replace the objective
    pub fn set_objective(
        &mut self,
        coefficients: &IndexMap<String, f64>,
        sense: ObjectiveSense,
    ) -> Result<(), ProblemError> {
        if coefficients.is_empty() {
            return Err(ProblemError::EmptyObjective);
        }
        self.objective = self.terms(coefficients)?;
        self.sense = sense;
        Ok(())
    }

    // endregion Modification

    // region Solving

    /// Solve the problem with Clarabel
    ///
    /// `tolerance` is used as the solver's feasibility and gap tolerance, fluxes smaller
    /// in magnitude are reported as zero.
    pub fn solve(&self, tolerance: f64) -> ProblemSolution {
        let n = self.variables.len();
        if n == 0 {
            return ProblemSolution {
                status: OptimizationStatus::Optimal,
                objective_value: Some(0.),
                fluxes: Some(IndexMap::new()),
            };
        }

        let (a, b, cones) = self.constraint_matrix();
        let p: CscMatrix<f64> = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let mut q = vec![0.; n];
        let flip = match self.sense {
            ObjectiveSense::Maximize => -1.,
            ObjectiveSense::Minimize => 1.,
        };
        for (index, coef) in &self.objective {
            q[*index] += flip * coef;
        }

        let mut settings = DefaultSettings::default();
        settings.verbose = false;
        settings.tol_feas = tolerance;
        settings.tol_gap_abs = tolerance;
        settings.tol_gap_rel = tolerance;

        debug!(
            variables = n,
            rows = b.len(),
            "Solving flux balance problem with Clarabel"
        );
        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
        solver.solve();

        let status = convert_status(solver.solution.status);
        if !status.has_solution() {
            warn!(%status, "Flux balance problem has no solution");
            return ProblemSolution::without_values(status);
        }

        let fluxes: IndexMap<String, f64> = self
            .variables
            .keys()
            .zip(solver.solution.x.iter())
            .map(|(id, value)| {
                let value = if value.abs() < tolerance { 0. } else { *value };
                (id.clone(), value)
            })
            .collect();
        let objective_value: f64 = self
            .objective
            .iter()
            .map(|(index, coef)| coef * solver.solution.x[*index])
            .sum();
        ProblemSolution {
            status,
            objective_value: Some(objective_value),
            fluxes: Some(fluxes),
        }
    }

    /// Assemble `A x + s = b` with the zero cone rows (equalities) first, followed by the
    /// nonnegative cone rows (`<=` inequalities)
    fn constraint_matrix(&self) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
        let n = self.variables.len();
        let mut eq_rows: Vec<(Vec<(usize, f64)>, f64)> = self
            .mass_balance
            .iter()
            .map(|row| (row.clone(), 0.))
            .collect();
        let mut ineq_rows: Vec<(Vec<(usize, f64)>, f64)> = Vec::new();

        for (index, (lower, upper)) in self.variables.values().enumerate() {
            if lower == upper {
                eq_rows.push((vec![(index, 1.)], *lower));
                continue;
            }
            if upper.is_finite() {
                ineq_rows.push((vec![(index, 1.)], *upper));
            }
            if lower.is_finite() {
                ineq_rows.push((vec![(index, -1.)], -lower));
            }
        }

        for constraint in &self.constraints {
            match (constraint.lower, constraint.upper) {
                (Some(l), Some(u)) if l == u => eq_rows.push((constraint.terms.clone(), l)),
                (lower, upper) => {
                    if let Some(u) = upper.filter(|u| u.is_finite()) {
                        ineq_rows.push((constraint.terms.clone(), u));
                    }
                    if let Some(l) = lower.filter(|l| l.is_finite()) {
                        let negated = constraint.terms.iter().map(|(i, c)| (*i, -c)).collect();
                        ineq_rows.push((negated, -l));
                    }
                }
            }
        }

        let n_eq = eq_rows.len();
        let n_ineq = ineq_rows.len();
        let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
        let mut b = Vec::with_capacity(n_eq + n_ineq);
        for (row, (terms, rhs)) in eq_rows.into_iter().chain(ineq_rows).enumerate() {
            for (col, val) in terms {
                triplets.push((row, col, val));
            }
            b.push(rhs);
        }

        let mut cones = Vec::new();
        if n_eq > 0 {
            cones.push(SupportedConeT::ZeroConeT(n_eq));
        }
        if n_ineq > 0 {
            cones.push(SupportedConeT::NonnegativeConeT(n_ineq));
        }
        (csc_from_triplets(n_eq + n_ineq, n, triplets), b, cones)
    }

    // endregion Solving
}

/// Build a compressed sparse column matrix, summing duplicate entries
fn csc_from_triplets(m: usize, n: usize, mut triplets: Vec<(usize, usize, f64)>) -> CscMatrix<f64> {
    triplets.sort_by(|a, b| (a.1, a.0).cmp(&(b.1, b.0)));
    let mut colptr = vec![0usize; n + 1];
    let mut rowval: Vec<usize> = Vec::with_capacity(triplets.len());
    let mut nzval: Vec<f64> = Vec::with_capacity(triplets.len());
    let mut last: Option<(usize, usize)> = None;
    for (row, col, val) in triplets {
        if last == Some((row, col)) {
            if let Some(v) = nzval.last_mut() {
                *v += val;
            }
            continue;
        }
        rowval.push(row);
        nzval.push(val);
        colptr[col + 1] += 1;
        last = Some((row, col));
    }
    for col in 0..n {
        colptr[col + 1] += colptr[col];
    }
    CscMatrix::new(m, n, colptr, rowval, nzval)
}

fn convert_status(status: SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::NumericalError => OptimizationStatus::NumericalError,
        SolverStatus::MaxIterations
        | SolverStatus::MaxTime
        | SolverStatus::InsufficientProgress => OptimizationStatus::SolverHalted,
        _ => OptimizationStatus::Unoptimized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic::reaction::ReactionBuilder;

    const TOL: f64 = 1e-7;

    fn reaction(id: &str, mets: &[(&str, f64)], lb: f64, ub: f64) -> crate::metabolic::reaction::Reaction {
        ReactionBuilder::default()
            .id(id.to_string())
            .metabolites(mets.iter().map(|(m, c)| (m.to_string(), *c)).collect())
            .lower_bound(lb)
            .upper_bound(ub)
            .build()
            .unwrap()
    }

    /// uptake of A (max 10) -> A to 2 B -> B drain
    fn linear_pathway() -> Model {
        let mut model = Model::new_empty();
        model.add_reaction(reaction("EX_a", &[("a", 1.)], 0., 10.));
        model.add_reaction(reaction("CONV", &[("a", -1.), ("b", 2.)], 0., 1000.));
        model.add_reaction(reaction("DRAIN", &[("b", -1.)], 0., 1000.));
        model.objective.insert("DRAIN".to_string(), 1.);
        model
    }

    #[test]
    fn csc_sums_duplicates() {
        let m = csc_from_triplets(2, 2, vec![(1, 1, 1.), (0, 0, 2.), (1, 1, 3.), (0, 1, 5.)]);
        assert_eq!(m.colptr, vec![0, 1, 3]);
        assert_eq!(m.rowval, vec![0, 0, 1]);
        assert_eq!(m.nzval, vec![2., 5., 4.]);
    }

    #[test]
    fn maximize_linear_pathway() {
        let solution = FluxProblem::from_model(&linear_pathway()).solve(TOL);
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.objective_value.unwrap() - 20.).abs() < 1e-4);
        let fluxes = solution.fluxes.unwrap();
        assert!((fluxes["CONV"] - 10.).abs() < 1e-4);
    }

    #[test]
    fn minimize_objective() {
        let mut problem = FluxProblem::from_model(&linear_pathway());
        problem.set_bounds("DRAIN", 4., 1000.).unwrap();
        let mut obj = IndexMap::new();
        obj.insert("EX_a".to_string(), 1.);
        problem.set_objective(&obj, ObjectiveSense::Minimize).unwrap();
        let solution = problem.solve(TOL);
        assert!((solution.objective_value.unwrap() - 2.).abs() < 1e-4);
    }

    #[test]
    fn extra_constraint_limits_flux() {
        let mut problem = FluxProblem::from_model(&linear_pathway());
        let mut terms = IndexMap::new();
        terms.insert("CONV".to_string(), 1.);
        problem.add_linear_constraint(&terms, None, Some(3.)).unwrap();
        let solution = problem.solve(TOL);
        assert!((solution.objective_value.unwrap() - 6.).abs() < 1e-4);
    }

    #[test]
    fn infeasible_problem() {
        let mut problem = FluxProblem::from_model(&linear_pathway());
        problem.set_bounds("DRAIN", 50., 1000.).unwrap();
        let solution = problem.solve(TOL);
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.objective_value.is_none());
    }

    #[test]
    fn modification_errors() {
        let mut problem = FluxProblem::from_model(&linear_pathway());
        assert_eq!(
            problem.set_bounds("NOPE", 0., 1.),
            Err(ProblemError::UnknownVariable("NOPE".to_string()))
        );
        assert!(problem.set_bounds("CONV", 2., 1.).is_err());
        assert!(problem.set_bounds("CONV", f64::NAN, 1.).is_err());
        assert_eq!(problem.bounds("CONV"), Some((0., 1000.)));
        problem.set_bounds("CONV", 1., 4.).unwrap();
        assert_eq!(problem.bounds("CONV"), Some((1., 4.)));
        assert_eq!(problem.bounds("NOPE"), None);
        let mut terms = IndexMap::new();
        terms.insert("CONV".to_string(), 1.);
        assert!(problem.add_linear_constraint(&terms, Some(f64::NAN), None).is_err());
        assert_eq!(
            problem.set_objective(&IndexMap::new(), ObjectiveSense::Maximize),
            Err(ProblemError::EmptyObjective)
        );
    }
}
