//! Reading models and bounds tables, writing result tables, and downloading models
use std::path::Path;

use thiserror::Error;

use crate::metabolic::model::Model;

pub mod bounds;
pub mod json;
pub mod remote;
pub mod sbml;
pub mod table;

pub use bounds::{parse_bounds_csv, read_bounds_csv, BoundsError, BoundsRow};
pub use json::JsonError;
pub use sbml::SbmlError;
pub use table::write_csv;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid file format '{0}'. Expected .xml, .sbml or .json")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Sbml(#[from] SbmlError),
    #[error(transparent)]
    Json(#[from] JsonError),
}

impl LoadError {
    /// Whether the file was read but its content could not be understood
    pub fn is_parse_error(&self) -> bool {
        match self {
            LoadError::UnsupportedFormat(_) => false,
            LoadError::Sbml(SbmlError::UnableToRead(_)) | LoadError::Json(JsonError::UnableToRead(_)) => false,
            _ => true,
        }
    }
}

/// Model id derived from a file path, the file name up to its first `.`
pub fn model_id_from_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Whether the file name has an extension `load_model_file` understands
pub fn is_model_file<P: AsRef<Path>>(path: P) -> bool {
    matches!(extension(path.as_ref()).as_str(), "xml" | "sbml" | "json")
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Load a model from a local SBML (`.xml`, `.sbml`) or COBRA JSON (`.json`) file
pub fn load_model_file<P: AsRef<Path>>(path: P) -> Result<Model, LoadError> {
    let path = path.as_ref();
    match extension(path).as_str() {
        "xml" | "sbml" => Ok(Model::read_sbml(path)?),
        "json" => Ok(Model::read_json(path)?),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}
