//! Genes referenced by gene-protein-reaction rules
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// A gene of the model, knocked out by marking it inactive
#[derive(Builder, Clone, Debug, Eq, PartialEq)]
pub struct Gene {
    /// Locus tag or other unique id, e.g. `b1241`
    pub id: String,
    /// Gene symbol, e.g. `adhE`
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Whether this gene is currently active (see [`GeneActivity`])
    #[builder(default = "GeneActivity::Active")]
    pub activity: GeneActivity,
    #[builder(default = "None")]
    pub notes: Option<String>,
    #[builder(default = "None")]
    pub annotation: Option<String>,
}

impl Gene {
    /// Create a new active gene with only an id
    pub fn new_id_only(id: &str) -> Gene {
        Gene {
            id: id.to_string(),
            name: None,
            activity: GeneActivity::Active,
            notes: None,
            annotation: None,
        }
    }

    /// Name of the gene, falling back to the id when the gene is unnamed
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.id,
        }
    }
}

impl Display for Gene {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Whether a gene product is available to catalyse reactions
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
pub enum GeneActivity {
    /// Gene is considered active
    Active,
    /// Gene is considered inactive
    Inactive,
}
