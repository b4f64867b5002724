//! This module provides the Model struct for representing an entire metabolic model
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use thiserror::Error;

use crate::metabolic::gene::{Gene, GeneActivity};
use crate::metabolic::metabolite::Metabolite;
use crate::metabolic::reaction::Reaction;
use crate::optimize::ObjectiveSense;

/// Represents a Genome Scale Metabolic Model
#[derive(Clone, Debug)]
pub struct Model {
    /// Id associated with the Model
    pub id: Option<String>,
    /// Human readable name of the model
    pub name: Option<String>,
    /// Map of reaction ids to Reactions
    pub reactions: IndexMap<String, Reaction>,
    /// Map of metabolite ids to Metabolites
    pub metabolites: IndexMap<String, Metabolite>,
    /// Map of gene ids to Genes
    pub genes: IndexMap<String, Gene>,
    /// Map of reaction ids to objective function coefficients
    pub objective: IndexMap<String, f64>,
    /// Direction of the objective
    pub objective_sense: ObjectiveSense,
    /// Compartments in the model, {short name: long name}
    pub compartments: IndexMap<String, String>,
}

impl Default for Model {
    fn default() -> Self {
        Model::new_empty()
    }
}

impl Model {
    pub fn new_empty() -> Self {
        Model {
            id: None,
            name: None,
            reactions: IndexMap::new(),
            metabolites: IndexMap::new(),
            genes: IndexMap::new(),
            objective: IndexMap::new(),
            objective_sense: ObjectiveSense::Maximize,
            compartments: IndexMap::new(),
        }
    }

    //region Building

    /// Add a reaction to the model, any metabolite or gene it references which the model
    /// does not yet know about is added as well
    ///
    /// # Examples
    /// ```rust
    /// use metabolic_chat::metabolic::model::Model;
    /// use metabolic_chat::metabolic::reaction::ReactionBuilder;
    /// let mut model = Model::new_empty();
    /// let new_reaction = ReactionBuilder::default().id("new_reaction".to_string()).build().unwrap();
    /// model.add_reaction(new_reaction);
    /// assert_eq!(model.reactions.len(), 1);
    /// ```
    pub fn add_reaction(&mut self, reaction: Reaction) {
        for met in reaction.metabolite_ids() {
            if !self.metabolites.contains_key(met) {
                self.metabolites
                    .insert(met.clone(), Metabolite::new_id_only(met));
            }
        }
        if let Some(gpr) = &reaction.gpr {
            for gene in gpr.genes() {
                if !self.genes.contains_key(&gene) {
                    self.genes.insert(gene.clone(), Gene::new_id_only(&gene));
                }
            }
        }
        let id = reaction.id.clone();
        self.reactions.insert(id, reaction);
    }

    /// Add a gene to the model
    pub fn add_gene(&mut self, gene: Gene) {
        let id = gene.id.clone();
        self.genes.insert(id, gene);
    }

    /// Add a metabolite to the model
    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        let id = metabolite.id.clone();
        self.metabolites.insert(id, metabolite);
    }

    /// Replace the objective with `coefficients` and set its direction
    ///
    /// Every reaction named in `coefficients` must be part of the model.
    pub fn set_objective(
        &mut self,
        coefficients: IndexMap<String, f64>,
        sense: ObjectiveSense,
    ) -> Result<(), ModelError> {
        if let Some(missing) = coefficients
            .keys()
            .find(|id| !self.reactions.contains_key(*id))
        {
            return Err(ModelError::ReactionNotFound(missing.clone()));
        }
        self.objective = coefficients;
        self.objective_sense = sense;
        Ok(())
    }

    /// Set the flux bounds of a reaction
    pub fn set_reaction_bounds(
        &mut self,
        reaction_id: &str,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<(), ModelError> {
        if lower_bound.is_nan() || upper_bound.is_nan() || lower_bound > upper_bound {
            return Err(ModelError::InvalidBounds {
                reaction: reaction_id.to_string(),
                lower_bound,
                upper_bound,
            });
        }
        let reaction = self
            .reactions
            .get_mut(reaction_id)
            .ok_or_else(|| ModelError::ReactionNotFound(reaction_id.to_string()))?;
        reaction.lower_bound = lower_bound;
        reaction.upper_bound = upper_bound;
        Ok(())
    }

    //endregion Building

    //region Lookups

    /// Find a reaction by id, or failing that by its name (case-insensitive)
    pub fn find_reaction(&self, id_or_name: &str) -> Option<&Reaction> {
        self.reactions.get(id_or_name).or_else(|| {
            self.reactions.values().find(|r| {
                r.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(id_or_name))
            })
        })
    }

    /// Find a metabolite by id, or failing that by its name (case-insensitive)
    pub fn find_metabolite(&self, id_or_name: &str) -> Option<&Metabolite> {
        self.metabolites.get(id_or_name).or_else(|| {
            self.metabolites.values().find(|m| {
                m.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(id_or_name))
            })
        })
    }

    /// Find a gene by id, or failing that by its name (case-insensitive)
    pub fn find_gene(&self, id_or_name: &str) -> Option<&Gene> {
        self.genes.get(id_or_name).or_else(|| {
            self.genes.values().find(|g| {
                g.name
                    .as_deref()
                    .is_some_and(|n| n.eq_ignore_ascii_case(id_or_name))
            })
        })
    }

    /// Reactions in which the metabolite takes part
    pub fn reactions_for_metabolite(&self, metabolite_id: &str) -> Vec<&Reaction> {
        self.reactions
            .values()
            .filter(|r| r.metabolites.contains_key(metabolite_id))
            .collect()
    }

    /// Reactions whose GPR references the gene
    pub fn reactions_for_gene(&self, gene_id: &str) -> Vec<&Reaction> {
        self.reactions
            .values()
            .filter(|r| {
                r.gpr
                    .as_ref()
                    .is_some_and(|gpr| gpr.genes().iter().any(|g| g == gene_id))
            })
            .collect()
    }

    /// Distinct, non-empty reaction subsystems in model order
    pub fn subsystems(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.reactions
            .values()
            .filter_map(|r| r.subsystem.as_deref())
            .filter(|s| !s.is_empty() && seen.insert(*s))
            .collect()
    }

    /// Compartment long names as a quoted list, e.g. `['cytosol', 'periplasm']`
    pub fn compartment_list(&self) -> String {
        let names: Vec<String> = self
            .compartments
            .values()
            .map(|name| format!("'{}'", name))
            .collect();
        format!("[{}]", names.join(", "))
    }

    /// Objective as a linear expression string, e.g. `1.0*BIOMASS_Ecoli`
    pub fn objective_expression(&self) -> String {
        self.objective
            .iter()
            .map(|(rxn, coef)| format!("{:?}*{}", coef, rxn))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    /// Whether the model has at least one non-zero objective coefficient
    pub fn has_objective(&self) -> bool {
        self.objective.values().any(|c| *c != 0.)
    }

    //endregion Lookups
}

// region GPR Functionality
/// Representation of a Gene Protein Reaction Rule as an AST
#[derive(Clone, Debug, PartialEq)]
pub enum Gpr {
    /// Operation on one or two sub-rules (see [`GprOperation`])
    Operation(GprOperation),
    /// A terminal gene node, holding the gene id
    GeneNode(String),
}

impl Display for Gpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Gpr::Operation(GprOperation::Or { left, right }) => {
                write!(f, "({} or {})", left, right)
            }
            Gpr::Operation(GprOperation::And { left, right }) => {
                write!(f, "({} and {})", left, right)
            }
            Gpr::Operation(GprOperation::Not { val }) => write!(f, "(not {})", val),
            Gpr::GeneNode(gene) => write!(f, "{}", gene),
        }
    }
}

impl Gpr {
    /// Create a new binary operation node
    pub fn new_binary_operation(
        left: Gpr,
        operator: GprOperatorType,
        right: Gpr,
    ) -> Result<Gpr, GprError> {
        let op = match operator {
            GprOperatorType::Or => GprOperation::Or {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::And => GprOperation::And {
                left: Box::new(left),
                right: Box::new(right),
            },
            GprOperatorType::Not => return Err(GprError::InvalidBinaryOp),
        };
        Ok(Gpr::Operation(op))
    }

    /// Create a new unary operation node
    pub fn new_unary_operation(operator: GprOperatorType, operand: Gpr) -> Result<Gpr, GprError> {
        match operator {
            GprOperatorType::Not => Ok(Gpr::Operation(GprOperation::Not {
                val: Box::new(operand),
            })),
            _ => Err(GprError::InvalidUnaryOp),
        }
    }

    /// Create a new gene node
    pub fn new_gene_node(gene: &str) -> Gpr {
        Gpr::GeneNode(gene.to_string())
    }

    /// Ids of all genes referenced in the rule, in order of first appearance
    pub fn genes(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_genes(&mut out);
        out
    }

    fn collect_genes(&self, out: &mut Vec<String>) {
        match self {
            Gpr::GeneNode(gene) => {
                if !out.contains(gene) {
                    out.push(gene.clone());
                }
            }
            Gpr::Operation(GprOperation::Or { left, right })
            | Gpr::Operation(GprOperation::And { left, right }) => {
                left.collect_genes(out);
                right.collect_genes(out);
            }
            Gpr::Operation(GprOperation::Not { val }) => val.collect_genes(out),
        }
    }
}

/// Possible operations on genes
#[derive(Clone, Debug, PartialEq)]
pub enum GprOperation {
    Or { left: Box<Gpr>, right: Box<Gpr> },
    And { left: Box<Gpr>, right: Box<Gpr> },
    Not { val: Box<Gpr> },
}

/// Types of Allowed GPR Operations
pub enum GprOperatorType {
    /// Or, results in active if either left or right are active
    Or,
    /// And, results in active if both left and right are active
    And,
    /// Not, results in active if val is inactive
    Not,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum GprError {
    #[error("Invalid binary operation")]
    InvalidBinaryOp,
    #[error("Invalid unary operation")]
    InvalidUnaryOp,
    #[error("Gene '{0}' in GPR is not present in the model")]
    GeneNotFound(String),
}

// Model associated functions for working with GPRs
impl Model {
    /// Evaluate whether a GPR is active, treating every gene in `knocked_out` as inactive
    /// in addition to the genes already marked inactive in the model
    pub fn eval_gpr(
        &self,
        gpr: &Gpr,
        knocked_out: &HashSet<String>,
    ) -> Result<GeneActivity, GprError> {
        let active = match gpr {
            Gpr::Operation(GprOperation::Or { left, right }) => {
                self.eval_gpr(left, knocked_out)? == GeneActivity::Active
                    || self.eval_gpr(right, knocked_out)? == GeneActivity::Active
            }
            Gpr::Operation(GprOperation::And { left, right }) => {
                self.eval_gpr(left, knocked_out)? == GeneActivity::Active
                    && self.eval_gpr(right, knocked_out)? == GeneActivity::Active
            }
            Gpr::Operation(GprOperation::Not { val }) => {
                self.eval_gpr(val, knocked_out)? == GeneActivity::Inactive
            }
            Gpr::GeneNode(gene) => match self.genes.get(gene) {
                Some(g) => g.activity == GeneActivity::Active && !knocked_out.contains(gene),
                None => return Err(GprError::GeneNotFound(gene.clone())),
            },
        };
        Ok(if active {
            GeneActivity::Active
        } else {
            GeneActivity::Inactive
        })
    }

    /// Ids of the reactions which can no longer carry flux once the given genes are knocked out
    ///
    /// Only reactions with a GPR referencing a knocked out gene are considered, reactions
    /// without a GPR are never disabled.
    pub fn disabled_reactions_for_genes(
        &self,
        gene_ids: &[String],
    ) -> Result<Vec<String>, GprError> {
        let knocked_out: HashSet<String> = gene_ids.iter().cloned().collect();
        let mut disabled = Vec::new();
        for reaction in self.reactions.values() {
            let Some(gpr) = &reaction.gpr else {
                continue;
            };
            if !gpr.genes().iter().any(|g| knocked_out.contains(g)) {
                continue;
            }
            if self.eval_gpr(gpr, &knocked_out)? == GeneActivity::Inactive {
                disabled.push(reaction.id.clone());
            }
        }
        Ok(disabled)
    }
}

// endregion GPR Functionality

/// Errors raised when modifying a model
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Reaction '{0}' not found in model.")]
    ReactionNotFound(String),
    #[error("Invalid bounds for '{reaction}': [{lower_bound}, {upper_bound}]")]
    InvalidBounds {
        reaction: String,
        lower_bound: f64,
        upper_bound: f64,
    },
}
