//! Module providing COBRA JSON reading for Models
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::metabolic::gene::{Gene, GeneActivity};
use crate::metabolic::gpr_parse::{parse_gpr, GprParseError};
use crate::metabolic::metabolite::Metabolite;
use crate::metabolic::model::Model;
use crate::metabolic::reaction::{ReactionBuilder, ReactionBuilderError};
use crate::metabolic::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};
use crate::optimize::ObjectiveSense;

// region JSON Model
/// Represents a JSON serialized model, as exported by BiGG and cobrapy
#[derive(Deserialize)]
struct JsonModel {
    #[serde(default)]
    metabolites: Vec<JsonMetabolite>,
    #[serde(default)]
    reactions: Vec<JsonReaction>,
    #[serde(default)]
    genes: Vec<JsonGene>,
    id: Option<String>,
    name: Option<String>,
    compartments: Option<IndexMap<String, String>>,
}

#[derive(Deserialize)]
struct JsonMetabolite {
    id: String,
    name: Option<String>,
    compartment: Option<String>,
    charge: Option<i32>,
    formula: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}

#[derive(Deserialize)]
struct JsonReaction {
    id: String,
    name: Option<String>,
    #[serde(default)]
    metabolites: IndexMap<String, f64>,
    #[serde(default = "default_lower_bound")]
    lower_bound: f64,
    #[serde(default = "default_upper_bound")]
    upper_bound: f64,
    #[serde(default)]
    gene_reaction_rule: String,
    objective_coefficient: Option<f64>,
    subsystem: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}

#[derive(Deserialize)]
struct JsonGene {
    id: String,
    name: Option<String>,
    notes: Option<Value>,
    annotation: Option<Value>,
}

fn default_lower_bound() -> f64 {
    DEFAULT_LOWER_BOUND
}

fn default_upper_bound() -> f64 {
    DEFAULT_UPPER_BOUND
}
// endregion JSON Model

// region Conversions
impl From<JsonGene> for Gene {
    fn from(g: JsonGene) -> Self {
        // Notes and annotations are kept as their raw JSON text
        Self {
            id: g.id,
            name: g.name,
            activity: GeneActivity::Active,
            notes: g.notes.map(|v| v.to_string()),
            annotation: g.annotation.map(|v| v.to_string()),
        }
    }
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Self {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
            charge: m.charge.unwrap_or_default(),
            formula: m.formula,
            notes: m.notes.map(|v| v.to_string()),
            annotation: m.annotation.map(|v| v.to_string()),
        }
    }
}

impl Model {
    /// Read a COBRA JSON model from a file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Model, JsonError> {
        let model_str = fs::read_to_string(path)
            .map_err(|err| JsonError::UnableToRead(err.to_string()))?;
        Model::from_json_str(&model_str)
    }

    /// Parse a COBRA JSON model from a string
    pub fn from_json_str(model_str: &str) -> Result<Model, JsonError> {
        let json_model = serde_json::from_str::<JsonModel>(model_str)
            .map_err(|err| JsonError::UnableToParse(err.to_string()))?;
        Model::from_json(json_model)
    }

    fn from_json(json_model: JsonModel) -> Result<Self, JsonError> {
        let mut model = Model::new_empty();
        model.id = json_model.id;
        model.name = json_model.name;
        model.compartments = json_model.compartments.unwrap_or_default();

        for g in json_model.genes {
            model.add_gene(Gene::from(g));
        }
        for m in json_model.metabolites {
            model.add_metabolite(Metabolite::from(m));
        }

        let mut objective = IndexMap::new();
        for rxn in json_model.reactions {
            let gpr = parse_gpr(&rxn.gene_reaction_rule, &mut model.genes)?;
            let new_reaction = ReactionBuilder::default()
                .id(rxn.id.clone())
                .metabolites(rxn.metabolites)
                .name(rxn.name)
                .gpr(gpr)
                .lower_bound(rxn.lower_bound)
                .upper_bound(rxn.upper_bound)
                .subsystem(rxn.subsystem)
                .notes(rxn.notes.map(|v| v.to_string()))
                .annotation(rxn.annotation.map(|v| v.to_string()))
                .build()?;
            model.add_reaction(new_reaction);
            if let Some(coef) = rxn.objective_coefficient.filter(|c| *c != 0.) {
                objective.insert(rxn.id, coef);
            }
        }
        model.objective = objective;
        model.objective_sense = ObjectiveSense::Maximize;
        Ok(model)
    }
}

#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to parse a GPR rule: {0}")]
    GprParserError(#[from] GprParseError),
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Unable to build reaction: {0}")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
}

// endregion Conversions
