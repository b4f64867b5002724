// src/tools/simulate.rs
//
// Tools that change the optimization setup of the current model or run analyses on it.

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{error_value, lenient_f64, lenient_f64_map, ToolContext};
use crate::analysis::{self, DeletionRow};
use crate::io::write_csv;
use crate::metabolic::model::Model;
use crate::optimize::ObjectiveSense;

// --- Arguments ---

#[derive(Debug, Deserialize)]
pub struct ObjectiveArgs {
    #[serde(deserialize_with = "lenient_f64_map")]
    pub objective_dict: IndexMap<String, f64>,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "max".to_string()
}

#[derive(Debug, Deserialize)]
pub struct FvaArgs {
    pub rxn_names: Vec<String>,
    #[serde(default = "default_fraction", deserialize_with = "lenient_f64")]
    pub fraction_of_optimum: f64,
}

fn default_fraction() -> f64 {
    0.9
}

#[derive(Debug, Deserialize)]
pub struct GeneKnockoutArgs {
    pub gene_names: Vec<String>,
    #[serde(rename = "type", default = "default_knockout_type")]
    pub knockout_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionKnockoutArgs {
    pub reaction_names: Vec<String>,
    #[serde(rename = "type", default = "default_knockout_type")]
    pub knockout_type: String,
}

fn default_knockout_type() -> String {
    "single".to_string()
}

/// Run LP solves on the blocking pool, the registry lock is released by the caller first
async fn solve_blocking<T, F>(task: F) -> Result<T, String>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| format!("Solver task failed: {}", e))
}

/// Reported values keep five decimals, interior point noise sits below that
fn round_value(value: f64) -> f64 {
    let rounded = (value * 1e5).round() / 1e5;
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}

// --- Flux Balance Analysis ---

pub async fn run_fba(ctx: &ToolContext) -> Value {
    let mut manager = ctx.manager.lock().await;
    let bounds = match manager.bounds_data.clone() {
        Some(rows) if !rows.is_empty() => rows,
        _ => return error_value("No Bounds for model reactions are found."),
    };
    if !manager.objective {
        return error_value("No Objective Function is set for the model.");
    }
    let model = match manager.get_current_model_mut() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    for row in &bounds {
        if !model.reactions.contains_key(&row.reaction_id) {
            continue;
        }
        if model
            .set_reaction_bounds(&row.reaction_id, row.lower_bound, row.upper_bound)
            .is_err()
        {
            return error_value("Wrong Reaction bounds given.");
        }
    }
    let model = model.clone();
    drop(manager);

    let tolerance = ctx.config.solver_tolerance;
    let solution = match solve_blocking(move || analysis::fba(&model, tolerance)).await {
        Ok(solution) => solution,
        Err(e) => return error_value(e),
    };
    ctx.manager.lock().await.last_objective_value = solution.objective_value;
    info!(status = %solution.status, objective = ?solution.objective_value, "FBA tool finished");
    let objective_value = match solution.objective_value {
        Some(value) => format!("{:?}", round_value(value)),
        None => "None".to_string(),
    };
    json!({
        "Objective value": objective_value,
        "status": solution.status.to_string(),
    })
}

pub async fn set_model_objective(ctx: &ToolContext, args: ObjectiveArgs) -> Value {
    let mut manager = ctx.manager.lock().await;
    let sense: ObjectiveSense = match args.direction.parse() {
        Ok(sense) => sense,
        Err(e) => return error_value(e),
    };
    if args.objective_dict.is_empty() {
        return error_value("Objective dictionary is empty.");
    }
    let model = match manager.get_current_model_mut() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    if let Err(e) = model.set_objective(args.objective_dict, sense) {
        return error_value(e);
    }
    let expression = model.objective_expression();
    manager.objective = true;
    info!(objective = %expression, %sense, "Objective updated");
    json!({
        "status": "Objective set successfully.",
        "objective": expression,
        "direction": sense.short_name(),
    })
}

// --- Flux Variability Analysis ---

/// Reaction whose name contains `query` (case-insensitive), or whose id equals it
fn match_reaction_name<'a>(model: &'a Model, query: &str) -> Option<&'a str> {
    let needle = query.to_lowercase();
    model
        .reactions
        .values()
        .find(|r| {
            r.name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
        })
        .or_else(|| model.reactions.get(query))
        .map(|r| r.id.as_str())
}

pub async fn run_fva(ctx: &ToolContext, args: FvaArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    if !manager.objective {
        return error_value("No Objective Function is set for the model.");
    }
    let mut reaction_ids = Vec::with_capacity(args.rxn_names.len());
    for name in &args.rxn_names {
        match match_reaction_name(model, name) {
            Some(id) => reaction_ids.push(id.to_string()),
            None => return error_value(format!("Reaction name '{}' not found in model.", name)),
        }
    }

    let model = model.clone();
    drop(manager);

    let fraction = args.fraction_of_optimum;
    let tolerance = ctx.config.solver_tolerance;
    let (model, rows) = match solve_blocking(move || {
        let rows =
            analysis::flux_variability_analysis(&model, &reaction_ids, fraction, tolerance);
        (model, rows)
    })
    .await
    {
        Ok((model, Ok(rows))) => (model, rows),
        Ok((_, Err(e))) => return error_value(e),
        Err(e) => return error_value(e),
    };

    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let name = model
                .reactions
                .get(&row.reaction_id)
                .map(|r| r.display_name())
                .unwrap_or(row.reaction_id.as_str());
            json!({
                "Reaction Name": name,
                "Reaction ID": row.reaction_id,
                "Minimum Flux": row.minimum.map(round_value),
                "Maximum Flux": row.maximum.map(round_value),
            })
        })
        .collect();

    if records.len() <= ctx.config.preview_rows {
        return json!({
            "fraction_of_optimum": args.fraction_of_optimum,
            "fva_output": records,
        });
    }
    let path = ctx.config.output_dir.join("fva_result.csv");
    let headers = ["Reaction Name", "Reaction ID", "Minimum Flux", "Maximum Flux"];
    if let Err(e) = write_records(&path, &headers, &records) {
        return error_value(e);
    }
    json!({
        "fraction_of_optimum": args.fraction_of_optimum,
        "fva_output": records[..ctx.config.preview_rows].to_vec(),
        "message": format!(
            "FVA result has {} entries, saved to {} as CSV file.",
            records.len(),
            path.display()
        ),
    })
}

// --- Knockouts ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnockoutType {
    Single,
    Double,
}

fn parse_knockout_type(value: &str) -> Option<KnockoutType> {
    match value.trim().to_lowercase().as_str() {
        "single" => Some(KnockoutType::Single),
        "double" => Some(KnockoutType::Double),
        _ => None,
    }
}

pub async fn gene_knockout(ctx: &ToolContext, args: GeneKnockoutArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let gene_ids: Vec<String> = model
        .genes
        .values()
        .filter(|g| {
            args.gene_names
                .iter()
                .any(|n| *n == g.id || g.name.as_deref() == Some(n.as_str()))
        })
        .map(|g| g.id.clone())
        .collect();
    if gene_ids.is_empty() {
        return error_value("None of the provided genes are valid in this model.");
    }
    let Some(knockout_type) = parse_knockout_type(&args.knockout_type) else {
        return error_value("Invalid type. Choose 'single' or 'double'.");
    };
    let model = model.clone();
    drop(manager);

    let tolerance = ctx.config.solver_tolerance;
    let rows = solve_blocking(move || match knockout_type {
        KnockoutType::Single => analysis::single_gene_deletion(&model, &gene_ids, tolerance),
        KnockoutType::Double => analysis::double_gene_deletion(&model, &gene_ids, tolerance),
    })
    .await;
    match rows {
        Ok(Ok(rows)) => knockout_result(ctx, "Gene(s)", "gene_knockout_result.csv", &rows),
        Ok(Err(e)) => error_value(e),
        Err(e) => error_value(e),
    }
}

pub async fn reaction_knockout(ctx: &ToolContext, args: ReactionKnockoutArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let reaction_ids: Vec<String> = model
        .reactions
        .values()
        .filter(|r| {
            args.reaction_names
                .iter()
                .any(|n| *n == r.id || r.name.as_deref() == Some(n.as_str()))
        })
        .map(|r| r.id.clone())
        .collect();
    if reaction_ids.is_empty() {
        return error_value("None of the provided reactions are valid in this model.");
    }
    let Some(knockout_type) = parse_knockout_type(&args.knockout_type) else {
        return error_value("Invalid type. Choose 'single' or 'double'.");
    };
    let model = model.clone();
    drop(manager);

    let tolerance = ctx.config.solver_tolerance;
    let rows = solve_blocking(move || match knockout_type {
        KnockoutType::Single => {
            analysis::single_reaction_deletion(&model, &reaction_ids, tolerance)
        }
        KnockoutType::Double => {
            analysis::double_reaction_deletion(&model, &reaction_ids, tolerance)
        }
    })
    .await;
    match rows {
        Ok(Ok(rows)) => knockout_result(ctx, "Reaction(s)", "reaction_knockout_result.csv", &rows),
        Ok(Err(e)) => error_value(e),
        Err(e) => error_value(e),
    }
}

/// Rows as records, or the path of a CSV holding them when there are too many to show
fn knockout_result(
    ctx: &ToolContext,
    id_column: &str,
    file_name: &str,
    rows: &[DeletionRow],
) -> Value {
    let records: Vec<Value> = rows
        .iter()
        .map(|row| {
            let mut record = serde_json::Map::new();
            record.insert(id_column.to_string(), json!(row.ids));
            record.insert("Post-KO Growth".to_string(), json!(row.growth.map(round_value)));
            record.insert("Solver Status".to_string(), json!(row.status.to_string()));
            Value::Object(record)
        })
        .collect();
    if records.len() <= ctx.config.preview_rows {
        return Value::Array(records);
    }
    let path = ctx.config.output_dir.join(file_name);
    if let Err(e) = write_records(&path, &[id_column, "Post-KO Growth", "Solver Status"], &records) {
        return error_value(e);
    }
    json!({
        "file": path.display().to_string(),
        "note": "Too many results to display. Download CSV.",
    })
}

/// Write JSON records as CSV, one column per header
fn write_records(path: &Path, headers: &[&str], records: &[Value]) -> Result<(), String> {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| match &record[*h] {
                    Value::Null => String::new(),
                    Value::String(s) => s.clone(),
                    Value::Array(items) => items
                        .iter()
                        .map(|i| i.as_str().map(str::to_string).unwrap_or_else(|| i.to_string()))
                        .collect::<Vec<_>>()
                        .join(";"),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect();
    info!(path = %path.display(), rows = rows.len(), "Writing result table");
    write_csv(path, headers, &rows)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knockout_types() {
        assert_eq!(parse_knockout_type("single"), Some(KnockoutType::Single));
        assert_eq!(parse_knockout_type(" Double "), Some(KnockoutType::Double));
        assert_eq!(parse_knockout_type("triple"), None);
    }

    #[test]
    fn rounding_drops_noise() {
        assert_eq!(round_value(19.99999999), 20.);
        assert_eq!(round_value(-1e-9), 0.);
        assert_eq!(format!("{:?}", round_value(20.0000000004)), "20.0");
        assert_eq!(round_value(7.999999), 8.);
        assert_eq!(round_value(999.999999), 1000.);
        assert_eq!(round_value(2.000001), 2.);
        assert_eq!(round_value(0.12345), 0.12345);
    }

    #[test]
    fn name_matching() {
        let model = Model::from_json_str(include_str!("../../test_data/toy_model.json")).unwrap();
        assert_eq!(match_reaction_name(&model, "transport"), Some("GLCt"));
        assert_eq!(match_reaction_name(&model, "glycolysis"), Some("R1"));
        assert_eq!(match_reaction_name(&model, "R2"), Some("R2"));
        assert_eq!(match_reaction_name(&model, "nothing"), None);
    }
}
