//! Flux balance linear programs and their solutions
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod problem;

pub use problem::FluxProblem;

/// Sense of an objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ObjectiveSense {
    /// Minimize the objective
    Minimize,
    /// Maximize the objective
    #[default]
    Maximize,
}

impl ObjectiveSense {
    pub fn short_name(&self) -> &str {
        match self {
            ObjectiveSense::Maximize => "max",
            ObjectiveSense::Minimize => "min",
        }
    }
}

impl Display for ObjectiveSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

impl FromStr for ObjectiveSense {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "max" | "maximize" | "maximise" => Ok(ObjectiveSense::Maximize),
            "min" | "minimize" | "minimise" => Ok(ObjectiveSense::Minimize),
            other => Err(ProblemError::InvalidSense(other.to_string())),
        }
    }
}

/// Status of an optimization problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationStatus {
    /// Problem has not been optimized yet
    Unoptimized,
    /// Problem was solved to optimality
    Optimal,
    /// Problem was solved to reduced accuracy
    AlmostOptimal,
    /// Problem has no feasible solution
    Infeasible,
    /// Objective can be improved without limit
    Unbounded,
    /// Solver ran into numerical trouble
    NumericalError,
    /// Solver stopped early (iteration or time limit, insufficient progress)
    SolverHalted,
}

impl OptimizationStatus {
    /// Whether the solver produced a usable solution
    pub fn has_solution(&self) -> bool {
        matches!(
            self,
            OptimizationStatus::Optimal | OptimizationStatus::AlmostOptimal
        )
    }
}

impl Display for OptimizationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OptimizationStatus::Unoptimized => "unoptimized",
            OptimizationStatus::Optimal => "optimal",
            OptimizationStatus::AlmostOptimal => "almost_optimal",
            OptimizationStatus::Infeasible => "infeasible",
            OptimizationStatus::Unbounded => "unbounded",
            OptimizationStatus::NumericalError => "numerical_error",
            OptimizationStatus::SolverHalted => "solver_halted",
        };
        write!(f, "{}", name)
    }
}

/// Result of solving a [`FluxProblem`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProblemSolution {
    /// Status reported by the solver
    pub status: OptimizationStatus,
    /// Optimized value of the objective, `Some` only when the status has a solution
    pub objective_value: Option<f64>,
    /// Flux of every reaction at the optimum, keyed by reaction id
    pub fluxes: Option<IndexMap<String, f64>>,
}

impl ProblemSolution {
    /// A solution without values, used for failed solves
    pub fn without_values(status: OptimizationStatus) -> Self {
        ProblemSolution {
            status,
            objective_value: None,
            fluxes: None,
        }
    }
}

/// Errors raised while building an optimization problem
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProblemError {
    #[error("Variable '{0}' is not part of the problem")]
    UnknownVariable(String),
    #[error("Invalid bounds for '{name}': [{lower}, {upper}]")]
    InvalidBounds { name: String, lower: f64, upper: f64 },
    #[error("Invalid objective direction '{0}', use 'max' or 'min'")]
    InvalidSense(String),
    #[error("Objective has no terms")]
    EmptyObjective,
}
