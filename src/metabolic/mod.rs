//! Types describing a constraint based metabolic model: genes, metabolites, reactions
//! and the model that ties them together.

pub mod gene;
pub mod gpr_parse;
pub mod metabolite;
pub mod model;
pub mod reaction;

/// Lower flux bound given to reactions when none is specified
pub const DEFAULT_LOWER_BOUND: f64 = -1000.;
/// Upper flux bound given to reactions when none is specified
pub const DEFAULT_UPPER_BOUND: f64 = 1000.;
