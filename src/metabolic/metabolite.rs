//! Chemical species taking part in reactions

use derive_builder::Builder;

/// A species in one compartment of the model
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Metabolite {
    /// Unique identifier, e.g. `pyr_c`
    pub id: String,
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Short compartment id, resolved through [`Model::compartments`](crate::metabolic::model::Model)
    #[builder(default = "None")]
    pub compartment: Option<String>,
    #[builder(default = "0")]
    pub charge: i32,
    #[builder(default = "None")]
    pub formula: Option<String>,
    /// Raw notes as found in the source file
    #[builder(default = "None")]
    pub notes: Option<String>,
    /// Raw annotation as found in the source file
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Metabolite {
    /// Placeholder for a species referenced by a reaction but never declared
    pub fn new_id_only(id: &str) -> Metabolite {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: None,
            charge: 0,
            formula: None,
            notes: None,
            annotation: None,
        }
    }

    /// Name of the metabolite, falling back to the id when the metabolite is unnamed
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}
