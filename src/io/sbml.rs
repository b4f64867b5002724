//! SBML reading on top of `rust_sbml`
//!
//! `rust_sbml` supplies the document structure (species, reactions, stoichiometry and
//! fbc flux bound parameters). The fbc gene product associations, gene products, species
//! compartments and flux objectives are read from the raw document afterwards.
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use regex::Regex;
use thiserror::Error;

use crate::metabolic::gene::{Gene, GeneActivity};
use crate::metabolic::gpr_parse::{parse_gpr, GprParseError};
use crate::metabolic::metabolite::Metabolite;
use crate::metabolic::model::Model;
use crate::metabolic::reaction::{ReactionBuilder, ReactionBuilderError};
use crate::metabolic::{DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};
use crate::optimize::ObjectiveSense;

const REACTION_PREFIX: &str = "R_";
const SPECIES_PREFIX: &str = "M_";
const GENE_PREFIX: &str = "G_";

#[derive(Error, Debug)]
pub enum SbmlError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse SBML document: {0}")]
    UnableToParse(String),
    #[error("Reaction points to {0} but it does not exist in the model parameters")]
    InconsistentModel(String),
    #[error("The parameter {0} exists but it holds no value")]
    EmptyParameter(String),
    #[error("Unable to parse a GPR rule: {0}")]
    GprParserError(#[from] GprParseError),
    #[error("Unable to build reaction: {0}")]
    UnableToBuildReaction(#[from] ReactionBuilderError),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Model {
    /// Read an SBML model from a file
    pub fn read_sbml<P: AsRef<Path>>(path: P) -> Result<Model, SbmlError> {
        let document =
            fs::read_to_string(path).map_err(|err| SbmlError::UnableToRead(err.to_string()))?;
        Model::from_sbml_str(&document)
    }

    /// Parse an SBML model from a string
    pub fn from_sbml_str(document: &str) -> Result<Model, SbmlError> {
        let sbml = rust_sbml::Model::parse(document)
            .map_err(|err| SbmlError::UnableToParse(err.to_string()))?;
        let extras = RawDocument::scan(document)?;

        let mut model = Model::new_empty();
        model.id = sbml.id.clone();
        model.name = sbml.name.clone();
        model.compartments = extras.compartments.clone();

        // gene products first so GPR parsing keeps their names
        for product in extras.gene_products.values() {
            model.add_gene(Gene {
                id: product.gene_id.clone(),
                name: product.name.clone(),
                activity: GeneActivity::Active,
                notes: None,
                annotation: None,
            });
        }

        let mut species_ids: Vec<&String> = sbml.species.keys().collect();
        species_ids.sort_by_key(|id| extras.position(&extras.species_order, id));
        for raw_id in species_ids {
            let species = &sbml.species[raw_id];
            let info = extras.species.get(raw_id.as_str());
            model.add_metabolite(Metabolite {
                id: strip_prefix(raw_id, SPECIES_PREFIX),
                name: species.name.clone(),
                compartment: info.and_then(|i| i.compartment.clone()),
                charge: info.and_then(|i| i.charge).unwrap_or_default(),
                formula: info.and_then(|i| i.formula.clone()),
                notes: None,
                annotation: None,
            });
        }

        let default_lb = parameter_or(&sbml.parameters, "cobra_default_lb", DEFAULT_LOWER_BOUND)?;
        let default_ub = parameter_or(&sbml.parameters, "cobra_default_ub", DEFAULT_UPPER_BOUND)?;

        let mut reaction_ids: Vec<&String> = sbml.reactions.keys().collect();
        reaction_ids.sort_by_key(|id| extras.position(&extras.reaction_order, id));
        for raw_id in reaction_ids {
            let reaction = &sbml.reactions[raw_id];
            let mut metabolites: IndexMap<String, f64> = IndexMap::new();
            for sref in &reaction.list_of_reactants.species_references {
                *metabolites
                    .entry(strip_prefix(&sref.species, SPECIES_PREFIX))
                    .or_insert(0.) -= sref.stoichiometry.unwrap_or(1.);
            }
            for sref in &reaction.list_of_products.species_references {
                *metabolites
                    .entry(strip_prefix(&sref.species, SPECIES_PREFIX))
                    .or_insert(0.) += sref.stoichiometry.unwrap_or(1.);
            }
            let lower_bound = match reaction.lower_bound.as_ref() {
                Some(param) => parameter_value(&sbml.parameters, param)?,
                None => default_lb,
            };
            let upper_bound = match reaction.upper_bound.as_ref() {
                Some(param) => parameter_value(&sbml.parameters, param)?,
                None => default_ub,
            };
            let gpr = match extras.gene_rules.get(raw_id.as_str()) {
                Some(rule) => parse_gpr(rule, &mut model.genes)?,
                None => None,
            };
            let new_reaction = ReactionBuilder::default()
                .id(strip_prefix(raw_id, REACTION_PREFIX))
                .name(reaction.name.clone())
                .metabolites(metabolites)
                .gpr(gpr)
                .lower_bound(lower_bound)
                .upper_bound(upper_bound)
                .build()?;
            model.add_reaction(new_reaction);
        }

        let mut objective = IndexMap::new();
        if extras.flux_objectives.is_empty() {
            for raw_id in sbml.objectives.iter().flatten() {
                objective.insert(strip_prefix(raw_id, REACTION_PREFIX), 1.);
            }
        } else {
            for (raw_id, coef) in &extras.flux_objectives {
                objective.insert(strip_prefix(raw_id, REACTION_PREFIX), *coef);
            }
        }
        objective.retain(|id, coef| *coef != 0. && model.reactions.contains_key(id));
        model.objective = objective;
        model.objective_sense = extras.objective_sense;
        Ok(model)
    }
}

fn strip_prefix(id: &str, prefix: &str) -> String {
    id.strip_prefix(prefix).unwrap_or(id).to_string()
}

fn parameter_value(
    parameters: &HashMap<String, rust_sbml::Parameter>,
    id: &str,
) -> Result<f64, SbmlError> {
    parameters
        .get(id)
        .ok_or_else(|| SbmlError::InconsistentModel(id.to_string()))?
        .value
        .ok_or_else(|| SbmlError::EmptyParameter(id.to_string()))
}

fn parameter_or(
    parameters: &HashMap<String, rust_sbml::Parameter>,
    id: &str,
    default: f64,
) -> Result<f64, SbmlError> {
    match parameters.get(id) {
        Some(_) => parameter_value(parameters, id),
        None => Ok(default),
    }
}

// region Raw document scan

#[derive(Debug, Clone)]
struct GeneProduct {
    gene_id: String,
    name: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct SpeciesInfo {
    compartment: Option<String>,
    formula: Option<String>,
    charge: Option<i32>,
}

/// Information `rust_sbml` does not expose, collected in document order
#[derive(Debug)]
struct RawDocument {
    compartments: IndexMap<String, String>,
    species: HashMap<String, SpeciesInfo>,
    species_order: Vec<String>,
    reaction_order: Vec<String>,
    gene_products: IndexMap<String, GeneProduct>,
    /// GPR strings keyed by the raw reaction id
    gene_rules: HashMap<String, String>,
    flux_objectives: Vec<(String, f64)>,
    objective_sense: ObjectiveSense,
}

impl RawDocument {
    fn scan(document: &str) -> Result<Self, SbmlError> {
        let compartment_re = Regex::new(r"<compartment\b([^>]*?)/?>")?;
        let species_re = Regex::new(r"<species\b([^>]*?)/?>")?;
        let gene_product_re = Regex::new(r"<fbc:geneProduct\b([^>]*?)/?>")?;
        let reaction_re = Regex::new(r"(?s)<reaction\b([^>]*?)(?:/>|>(.*?)</reaction>)")?;
        let association_re = Regex::new(
            r"(?s)<fbc:geneProductAssociation\b[^>]*>(.*?)</fbc:geneProductAssociation>",
        )?;
        let notes_rule_re = Regex::new(r"GENE_ASSOCIATION:\s*([^<]*)")?;
        let objective_re = Regex::new(r"(?s)<fbc:objective\b([^>]*)>(.*?)</fbc:objective>")?;
        let active_objective_re = Regex::new(r#"fbc:activeObjective="([^"]+)""#)?;
        let flux_objective_re = Regex::new(r"<fbc:fluxObjective\b([^>]*?)/?>")?;
        let gene_token_re = Regex::new(
            r"<(/?)fbc:(and|or)\b[^>]*>|<fbc:geneProductRef\b([^>]*?)/?>",
        )?;

        let mut compartments = IndexMap::new();
        for cap in compartment_re.captures_iter(document) {
            if let Some(id) = attribute(&cap[1], "id") {
                let name = attribute(&cap[1], "name").unwrap_or_else(|| id.clone());
                compartments.insert(id, name);
            }
        }

        let mut species = HashMap::new();
        let mut species_order = Vec::new();
        for cap in species_re.captures_iter(document) {
            if let Some(id) = attribute(&cap[1], "id") {
                species_order.push(id.clone());
                species.insert(
                    id,
                    SpeciesInfo {
                        compartment: attribute(&cap[1], "compartment"),
                        formula: attribute(&cap[1], "fbc:chemicalFormula"),
                        charge: attribute(&cap[1], "fbc:charge").and_then(|c| c.parse().ok()),
                    },
                );
            }
        }

        let mut gene_products = IndexMap::new();
        for cap in gene_product_re.captures_iter(document) {
            if let Some(raw_id) = attribute(&cap[1], "fbc:id") {
                let gene_id = attribute(&cap[1], "fbc:label")
                    .unwrap_or_else(|| strip_prefix(&raw_id, GENE_PREFIX));
                let name = attribute(&cap[1], "fbc:name");
                gene_products.insert(raw_id, GeneProduct { gene_id, name });
            }
        }

        let mut reaction_order = Vec::new();
        let mut gene_rules = HashMap::new();
        for cap in reaction_re.captures_iter(document) {
            let Some(id) = attribute(&cap[1], "id") else {
                continue;
            };
            reaction_order.push(id.clone());
            let Some(body) = cap.get(2).map(|m| m.as_str()) else {
                continue;
            };
            let rule = if let Some(assoc) = association_re.captures(body) {
                association_to_rule(&assoc[1], &gene_token_re, &gene_products)
            } else {
                notes_rule_re
                    .captures(body)
                    .map(|c| unescape(c[1].trim()))
            };
            if let Some(rule) = rule.filter(|r| !r.trim().is_empty()) {
                gene_rules.insert(id, rule);
            }
        }

        let active = active_objective_re
            .captures(document)
            .map(|c| c[1].to_string());
        let mut flux_objectives = Vec::new();
        let mut objective_sense = ObjectiveSense::Maximize;
        for cap in objective_re.captures_iter(document) {
            let id = attribute(&cap[1], "fbc:id");
            if active.is_some() && id != active {
                continue;
            }
            if let Some(sense) = attribute(&cap[1], "fbc:type") {
                objective_sense = sense.parse().unwrap_or(ObjectiveSense::Maximize);
            }
            for flux in flux_objective_re.captures_iter(&cap[2]) {
                if let Some(reaction) = attribute(&flux[1], "fbc:reaction") {
                    let coef = attribute(&flux[1], "fbc:coefficient")
                        .and_then(|c| c.parse().ok())
                        .unwrap_or(1.);
                    flux_objectives.push((reaction, coef));
                }
            }
            break;
        }

        Ok(RawDocument {
            compartments,
            species,
            species_order,
            reaction_order,
            gene_products,
            gene_rules,
            flux_objectives,
            objective_sense,
        })
    }

    fn position(&self, order: &[String], id: &str) -> (usize, String) {
        let index = order
            .iter()
            .position(|o| o == id)
            .unwrap_or(order.len());
        (index, id.to_string())
    }
}

/// Turn nested `fbc:and`/`fbc:or`/`fbc:geneProductRef` elements into a GPR string
fn association_to_rule(
    association: &str,
    token_re: &Regex,
    gene_products: &IndexMap<String, GeneProduct>,
) -> Option<String> {
    // each frame is (operator, operands)
    let mut stack: Vec<(&str, Vec<String>)> = vec![("", Vec::new())];
    for cap in token_re.captures_iter(association) {
        if let Some(attrs) = cap.get(3) {
            let raw = attribute(attrs.as_str(), "fbc:geneProduct")?;
            let gene = gene_products
                .get(&raw)
                .map(|g| g.gene_id.clone())
                .unwrap_or_else(|| strip_prefix(&raw, GENE_PREFIX));
            stack.last_mut()?.1.push(gene);
        } else if &cap[1] == "/" {
            let (op, operands) = stack.pop()?;
            let joined = match operands.len() {
                0 => continue,
                1 => operands.into_iter().next()?,
                _ => format!("({})", operands.join(&format!(" {} ", op))),
            };
            stack.last_mut()?.1.push(joined);
        } else {
            let op = if &cap[2] == "and" { "and" } else { "or" };
            stack.push((op, Vec::new()));
        }
    }
    let (_, mut root) = stack.pop()?;
    if root.len() == 1 {
        root.pop()
    } else {
        None
    }
}

/// Value of the attribute `name` within the attribute text of a tag
fn attribute(attrs: &str, name: &str) -> Option<String> {
    let needle = format!("{}=", name);
    let mut search = attrs;
    while let Some(idx) = search.find(&needle) {
        let preceded_by_space = idx == 0
            || search[..idx]
                .chars()
                .last()
                .is_some_and(char::is_whitespace);
        let rest = &search[idx + needle.len()..];
        if preceded_by_space {
            let quote = rest.chars().next()?;
            if quote == '"' || quote == '\'' {
                let value = &rest[1..];
                let end = value.find(quote)?;
                return Some(unescape(&value[..end]));
            }
        }
        search = rest;
    }
    None
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// endregion Raw document scan

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn attributes() {
        let attrs = r#" id="M_glc" compartment="c" fbc:chemicalFormula="C6H12O6" name="A &amp; B""#;
        assert_eq!(attribute(attrs, "id").as_deref(), Some("M_glc"));
        assert_eq!(attribute(attrs, "compartment").as_deref(), Some("c"));
        assert_eq!(
            attribute(attrs, "fbc:chemicalFormula").as_deref(),
            Some("C6H12O6")
        );
        assert_eq!(attribute(attrs, "name").as_deref(), Some("A & B"));
        assert_eq!(attribute(attrs, "charge"), None);
    }

    #[test]
    fn nested_association() {
        let re = Regex::new(r"<(/?)fbc:(and|or)\b[^>]*>|<fbc:geneProductRef\b([^>]*?)/?>").unwrap();
        let assoc = r#"
            <fbc:or>
              <fbc:and>
                <fbc:geneProductRef fbc:geneProduct="G_g3"/>
                <fbc:geneProductRef fbc:geneProduct="G_g4"/>
              </fbc:and>
              <fbc:geneProductRef fbc:geneProduct="G_g5"/>
            </fbc:or>"#;
        assert_eq!(
            association_to_rule(assoc, &re, &IndexMap::new()).as_deref(),
            Some("((g3 and g4) or g5)")
        );
    }

    #[test]
    fn read_toy_sbml() {
        let data_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("toy_model.xml");
        let model = Model::read_sbml(data_path).unwrap();
        assert_eq!(model.id.as_deref(), Some("toy_model"));
        assert_eq!(
            model.reactions.keys().collect::<Vec<_>>(),
            vec!["EX_glc", "GLCt", "R1", "R2", "BIOMASS"]
        );
        let ex = &model.reactions["EX_glc"];
        assert_eq!(ex.lower_bound, -10.);
        assert_eq!(ex.upper_bound, 1000.);
        assert_eq!(ex.metabolites.get("glc_e"), Some(&-1.));
        assert_eq!(model.reactions["R1"].metabolites.get("pyr_c"), Some(&2.));
        assert_eq!(
            model.reactions["R1"].gpr.as_ref().unwrap().to_string(),
            "(g3 and g4)"
        );
        assert_eq!(model.genes["g1"].name.as_deref(), Some("glcA"));
        assert_eq!(model.objective.get("BIOMASS"), Some(&1.));
        assert_eq!(model.objective_sense, ObjectiveSense::Maximize);
        assert_eq!(
            model.metabolites["glc_e"].compartment.as_deref(),
            Some("e")
        );
        assert_eq!(model.compartments.len(), 2);
    }

    #[test]
    fn unreadable_document() {
        assert!(Model::from_sbml_str("this is not xml").is_err());
    }
}
