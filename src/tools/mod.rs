// src/tools/mod.rs
//
// Tool surface exposed to the agent. Every tool takes a JSON object of arguments and
// returns a JSON value; failures are reported as `{"error": "..."}` rather than raised.

use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::Client;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::registry::ModelManager;

pub mod inspect;
pub mod simulate;

// --- Tool Context ---

/// Shared state every tool call works against
#[derive(Clone)]
pub struct ToolContext {
    pub manager: Arc<Mutex<ModelManager>>,
    pub config: Config,
    pub client: Client,
}

impl ToolContext {
    pub fn new(manager: Arc<Mutex<ModelManager>>, config: Config, client: Client) -> Self {
        Self {
            manager,
            config,
            client,
        }
    }
}

// --- Tool Table ---

/// Name, description and argument summary of a tool, as shown to the model
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Argument names with their types and defaults, `{}` when the tool takes none
    pub arguments: &'static str,
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "check_model_loaded",
        description: "Checks if a model is currently loaded in the ModelManager. Returns the model ID if loaded, otherwise an error message.",
        arguments: "{}",
    },
    ToolSpec {
        name: "get_current_model_id",
        description: "Returns the current model ID from the ModelManager.",
        arguments: "{}",
    },
    ToolSpec {
        name: "load_model",
        description: "Loads a model to be used for Analysis. It fetches a model from the BioModels or BiGG repositories.",
        arguments: r#"{"model_id": string}"#,
    },
    ToolSpec {
        name: "model_data",
        description: "Returns the metadata related to the current model: model_id, objective_reaction, reactions_count, metabolites_count, genes_count, groups_count, compartments_count, Compartments",
        arguments: "{}",
    },
    ToolSpec {
        name: "model_info",
        description: "Returns categorical data for the current model based on a query. Queries can be 'reactions', 'genes', or 'metabolites'. The number of items returned is set with 'count'.",
        arguments: r#"{"query": "reactions" | "genes" | "metabolites", "count": integer = 10}"#,
    },
    ToolSpec {
        name: "reaction_info",
        description: "Returns the metadata related to a given Reaction by Name or ID: reaction id, name, Stochiometry, GPR, lower_bound, upper_bound",
        arguments: r#"{"rxn_name": string}"#,
    },
    ToolSpec {
        name: "metabolite_info",
        description: "Returns the metadata related to a given Metabolite by ID or Name: metabolite id, name, Formula, Compartment, Total Reactions, Reactions",
        arguments: r#"{"mb_id": string}"#,
    },
    ToolSpec {
        name: "gene_info",
        description: "Returns the metadata related to a given Gene by ID or Name: gene id, name, Total Reactions, Reactions",
        arguments: r#"{"gn_id": string}"#,
    },
    ToolSpec {
        name: "run_flux_balance_analysis",
        description: "Runs Flux Balance Analysis (FBA) using the uploaded reaction bounds and the model objective. Returns the objective value and solver status.",
        arguments: "{}",
    },
    ToolSpec {
        name: "set_model_objective_value",
        description: "Sets the objective for the current metabolic model given a dictionary of reaction_id: coefficient pairs and an optional direction value ('max' or 'min').",
        arguments: r#"{"objective_dict": {reaction_id: number}, "direction": "max" | "min" = "max"}"#,
    },
    ToolSpec {
        name: "run_flux_variability_analysis",
        description: "Runs Flux Variability Analysis (FVA) on the model given a list of reaction names and a fraction of optimum value.",
        arguments: r#"{"rxn_names": [string], "fraction_of_optimum": number = 0.9}"#,
    },
    ToolSpec {
        name: "gene_knockout_simulation",
        description: "Performs single or double gene knockout simulations on the loaded metabolic model.",
        arguments: r#"{"gene_names": [string], "type": "single" | "double" = "single"}"#,
    },
    ToolSpec {
        name: "reaction_knockout_simulation",
        description: "Performs single or double reaction knockout simulations on the loaded metabolic model.",
        arguments: r#"{"reaction_names": [string], "type": "single" | "double" = "single"}"#,
    },
];

/// Look up a tool by name
pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.name == name)
}

/// One line per tool, used in the agent prompt
pub fn describe_tools() -> String {
    TOOLS
        .iter()
        .map(|t| format!("- {}: {} Arguments: {}", t.name, t.description, t.arguments))
        .collect::<Vec<_>>()
        .join("\n")
}

// --- Dispatch ---

/// Run the tool `name` with `args`, which may be `null` for tools without arguments
#[instrument(skip(ctx, args))]
pub async fn call_tool(ctx: &ToolContext, name: &str, args: Value) -> Value {
    debug!(arguments = %args, "Calling tool");
    let args = if args.is_null() { json!({}) } else { args };
    let result = match name {
        "check_model_loaded" => inspect::check_model_loaded(ctx).await,
        "get_current_model_id" => inspect::get_current_model_id(ctx).await,
        "load_model" => match parse_args(name, args) {
            Ok(a) => inspect::load_model(ctx, a).await,
            Err(e) => e,
        },
        "model_data" => inspect::model_data(ctx).await,
        "model_info" => match parse_args(name, args) {
            Ok(a) => inspect::model_info(ctx, a).await,
            Err(e) => e,
        },
        "reaction_info" => match parse_args(name, args) {
            Ok(a) => inspect::reaction_info(ctx, a).await,
            Err(e) => e,
        },
        "metabolite_info" => match parse_args(name, args) {
            Ok(a) => inspect::metabolite_info(ctx, a).await,
            Err(e) => e,
        },
        "gene_info" => match parse_args(name, args) {
            Ok(a) => inspect::gene_info(ctx, a).await,
            Err(e) => e,
        },
        "run_flux_balance_analysis" => simulate::run_fba(ctx).await,
        "set_model_objective_value" => match parse_args(name, args) {
            Ok(a) => simulate::set_model_objective(ctx, a).await,
            Err(e) => e,
        },
        "run_flux_variability_analysis" => match parse_args(name, args) {
            Ok(a) => simulate::run_fva(ctx, a).await,
            Err(e) => e,
        },
        "gene_knockout_simulation" => match parse_args(name, args) {
            Ok(a) => simulate::gene_knockout(ctx, a).await,
            Err(e) => e,
        },
        "reaction_knockout_simulation" => match parse_args(name, args) {
            Ok(a) => simulate::reaction_knockout(ctx, a).await,
            Err(e) => e,
        },
        _ => error_value(format!("Unknown tool: {}", name)),
    };
    if result.get("error").is_some() {
        warn!(result = %result, "Tool reported an error");
    }
    result
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, Value> {
    serde_json::from_value(args)
        .map_err(|e| error_value(format!("Invalid arguments for {}: {}", tool, e)))
}

// --- Lenient Numbers ---

/// Models often quote numbers, `"1"` is read the same as `1`
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        let value = match self {
            LenientNumber::Number(n) => n,
            LenientNumber::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("'{}' is not a number", text)))?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(E::custom(format!("{} is not a finite number", value)))
        }
    }
}

pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    LenientNumber::deserialize(deserializer)?.into_f64()
}

pub(crate) fn lenient_usize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value: f64 = LenientNumber::deserialize(deserializer)?.into_f64()?;
    if value < 0. || value.fract() != 0. {
        return Err(D::Error::custom(format!("{} is not a non-negative integer", value)));
    }
    Ok(value as usize)
}

pub(crate) fn lenient_f64_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<IndexMap<String, f64>, D::Error> {
    IndexMap::<String, LenientNumber>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| Ok((key, value.into_f64()?)))
        .collect()
}

/// `{"error": message}`
pub fn error_value(message: impl std::fmt::Display) -> Value {
    json!({ "error": message.to_string() })
}
