//! In-process registry of loaded models, the current selection and its uploaded bounds
use std::collections::HashMap;
use std::path::Path;

use reqwest::Client;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::Config;
use crate::io::{self, BoundsRow, LoadError};
use crate::metabolic::model::Model;

/// Errors raised by the [`ModelManager`]
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("No model is currently loaded.")]
    NoModelLoaded,
    #[error("Invalid model ID.")]
    InvalidModelId,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

/// Keeps every loaded model by id and tracks which one the tools operate on
#[derive(Debug, Default)]
pub struct ModelManager {
    pub models: HashMap<String, Model>,
    pub current_model_id: Option<String>,
    /// Bounds rows uploaded for flux balance analysis
    pub bounds_data: Option<Vec<BoundsRow>>,
    /// Whether an objective is available for optimization
    pub objective: bool,
    /// Objective value of the most recent flux balance analysis
    pub last_objective_value: Option<f64>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Download a model from the public repositories and make it current
    ///
    /// A trailing `.xml` is ignored, so `e_coli_core` and `e_coli_core.xml` are the same.
    #[instrument(skip(self, client, config))]
    pub async fn load_model_by_id(
        &mut self,
        client: &Client,
        config: &Config,
        model_id: &str,
    ) -> Result<String, RegistryError> {
        let base_id = model_id
            .trim()
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let model = io::remote::fetch_model(client, config, &base_id).await?;
        Ok(self.insert_model(&base_id, model))
    }

    /// Load an SBML file, its id is the file name up to the first `.`
    pub fn load_sbml<P: AsRef<Path>>(&mut self, path: P) -> Result<String, RegistryError> {
        let model = Model::read_sbml(path.as_ref()).map_err(LoadError::from)?;
        Ok(self.insert_model(&io::model_id_from_path(path), model))
    }

    /// Load an SBML or COBRA JSON file, chosen by extension
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<String, RegistryError> {
        let model = io::load_model_file(path.as_ref())?;
        Ok(self.insert_model(&io::model_id_from_path(path), model))
    }

    /// Register a model under `model_id` and make it current
    pub fn insert_model(&mut self, model_id: &str, model: Model) -> String {
        if model.has_objective() {
            self.objective = true;
        }
        info!(
            model_id,
            reactions = model.reactions.len(),
            metabolites = model.metabolites.len(),
            genes = model.genes.len(),
            "Model registered"
        );
        self.models.insert(model_id.to_string(), model);
        self.current_model_id = Some(model_id.to_string());
        model_id.to_string()
    }

    pub fn get_current_model(&self) -> Result<&Model, RegistryError> {
        self.current_model_id
            .as_ref()
            .and_then(|id| self.models.get(id))
            .ok_or(RegistryError::NoModelLoaded)
    }

    pub fn get_current_model_mut(&mut self) -> Result<&mut Model, RegistryError> {
        match self.current_model_id.as_ref() {
            Some(id) => self.models.get_mut(id).ok_or(RegistryError::NoModelLoaded),
            None => Err(RegistryError::NoModelLoaded),
        }
    }

    pub fn set_current_model(&mut self, model_id: &str) -> Result<(), RegistryError> {
        if !self.models.contains_key(model_id) {
            return Err(RegistryError::InvalidModelId);
        }
        self.current_model_id = Some(model_id.to_string());
        Ok(())
    }

    pub fn set_bounds_data(&mut self, rows: Vec<BoundsRow>) {
        info!(rows = rows.len(), "Bounds data updated");
        self.bounds_data = Some(rows);
    }

    /// Ids of every loaded model, sorted
    pub fn model_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.models.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Multi-line summary of the current model
    pub fn stats(&self) -> Result<String, RegistryError> {
        let model = self.get_current_model()?;
        let model_id = model
            .id
            .clone()
            .or_else(|| self.current_model_id.clone())
            .unwrap_or_default();
        let objective = if model.has_objective() {
            model.objective_expression()
        } else {
            "Not Set Yet".to_string()
        };
        Ok(format!(
            "Model ID: {}\n\
             Objective Reaction: {}\n\
             Reactions Count: {}\n\
             Metabolites Count: {}\n\
             Genes Count: {}\n\
             Groups Count: {}\n\
             Compartments Count: {}\n\
             Compartments: {}\n",
            model_id,
            objective,
            model.reactions.len(),
            model.metabolites.len(),
            model.genes.len(),
            model.subsystems().len(),
            model.compartments.len(),
            model.compartment_list(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> Model {
        Model::from_json_str(include_str!("../test_data/toy_model.json")).unwrap()
    }

    #[test]
    fn empty_registry_errors() {
        let mut manager = ModelManager::new();
        assert_eq!(
            manager.get_current_model().unwrap_err().to_string(),
            "No model is currently loaded."
        );
        assert!(matches!(
            manager.set_current_model("e_coli_core"),
            Err(RegistryError::InvalidModelId)
        ));
        assert!(manager.stats().is_err());
    }

    #[test]
    fn insert_and_switch() {
        let mut manager = ModelManager::new();
        let mut no_objective = toy_model();
        no_objective.objective.clear();
        manager.insert_model("plain", no_objective);
        assert!(!manager.objective);
        manager.insert_model("toy", toy_model());
        assert!(manager.objective);
        assert_eq!(manager.current_model_id.as_deref(), Some("toy"));
        manager.set_current_model("plain").unwrap();
        assert_eq!(manager.model_ids(), vec!["plain", "toy"]);
        assert!(manager.get_current_model().unwrap().objective.is_empty());
    }

    #[test]
    fn load_local_files() {
        let mut manager = ModelManager::new();
        let id = manager.load_file("test_data/toy_model.json").unwrap();
        assert_eq!(id, "toy_model");
        let id = manager.load_sbml("test_data/toy_model.xml").unwrap();
        assert_eq!(id, "toy_model");
        assert_eq!(manager.models.len(), 1);
        assert!(matches!(
            manager.load_file("test_data/bounds.csv"),
            Err(RegistryError::Load(LoadError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn stats_text() {
        let mut manager = ModelManager::new();
        manager.insert_model("toy_model", toy_model());
        let stats = manager.stats().unwrap();
        assert!(stats.contains("Model ID: toy_model\n"));
        assert!(stats.contains("Objective Reaction: 1.0*BIOMASS\n"));
        assert!(stats.contains("Reactions Count: 5\n"));
        assert!(stats.contains("Genes Count: 5\n"));
        assert!(stats.contains("Groups Count: 4\n"));
        assert!(stats.contains("Compartments: ['cytosol', 'extracellular space']"));
    }
}
