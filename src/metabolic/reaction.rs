//! This module provides a struct for representing reactions
use derive_builder::Builder;
use indexmap::IndexMap;

use super::model::Gpr;

/// Represents a reaction in the metabolic model
#[derive(Builder, Debug, Clone)]
pub struct Reaction {
    /// Used to identify the reaction
    pub id: String,
    /// Metabolite stoichiometry of the reaction
    #[builder(default = "IndexMap::new()")]
    pub metabolites: IndexMap<String, f64>,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Gene Protein Reaction rule to determine if reaction is active
    #[builder(default = "None")]
    pub gpr: Option<Gpr>,
    /// Lower flux bound
    #[builder(default = "crate::metabolic::DEFAULT_LOWER_BOUND")]
    pub lower_bound: f64,
    /// Upper flux bound
    #[builder(default = "crate::metabolic::DEFAULT_UPPER_BOUND")]
    pub upper_bound: f64,
    /// Reaction subsystem
    #[builder(default = "None")]
    pub subsystem: Option<String>,
    /// Notes about the reaction
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Reaction Annotations
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Reaction {
    /// Name of the reaction, falling back to the id when the reaction is unnamed
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }

    /// Whether the reaction can carry flux in both directions
    pub fn reversible(&self) -> bool {
        self.lower_bound < 0. && self.upper_bound > 0.
    }

    /// Build a human readable reaction equation using metabolite ids
    ///
    /// # Note:
    /// The arrow reflects the bounds, `<=>` for reversible reactions, `-->` for forward only
    /// and `<--` for reverse only reactions. Coefficients of 1 are not written.
    ///
    /// # Examples
    /// ```rust
    /// use indexmap::IndexMap;
    /// use metabolic_chat::metabolic::reaction::ReactionBuilder;
    /// let mut metabolites = IndexMap::new();
    /// metabolites.insert("glc__D_c".to_string(), -1.0);
    /// metabolites.insert("pyr_c".to_string(), 2.0);
    /// let reaction = ReactionBuilder::default()
    ///     .id("GLYC".to_string())
    ///     .metabolites(metabolites)
    ///     .lower_bound(0.)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(reaction.build_reaction_string(), "glc__D_c --> 2.0 pyr_c");
    /// ```
    pub fn build_reaction_string(&self) -> String {
        let side = |sign: f64| -> String {
            self.metabolites
                .iter()
                .filter(|(_, coef)| **coef * sign > 0.)
                .map(|(met, coef)| {
                    let magnitude = coef.abs();
                    if (magnitude - 1.).abs() < f64::EPSILON {
                        met.clone()
                    } else {
                        format!("{:?} {}", magnitude, met)
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        let arrow = if self.reversible() {
            "<=>"
        } else if self.upper_bound <= 0. && self.lower_bound < 0. {
            "<--"
        } else {
            "-->"
        };
        let reactants = side(-1.);
        let products = side(1.);
        format!("{} {} {}", reactants, arrow, products)
            .trim()
            .to_string()
    }

    /// Ids of the metabolites taking part in this reaction
    pub fn metabolite_ids(&self) -> impl Iterator<Item = &String> {
        self.metabolites.keys()
    }
}
