// tests/tools.rs
//
// Tool calls against the toy network in test_data/: glucose uptake capped at 10,
// two routes to pyruvate and a biomass drain whose optimum is 20.

use std::sync::Arc;

use metabolic_chat::config::Config;
use metabolic_chat::io::{read_bounds_csv, BoundsRow};
use metabolic_chat::registry::ModelManager;
use metabolic_chat::tools::{call_tool, ToolContext};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::Mutex;

const TOY_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test_data/toy_model.json");
const BOUNDS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/test_data/bounds.csv");

struct Fixture {
    ctx: ToolContext,
    output: TempDir,
}

fn fixture(with_bounds: bool) -> Fixture {
    let output = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.output_dir = output.path().to_path_buf();

    let mut manager = ModelManager::new();
    manager.load_file(TOY_MODEL).unwrap();
    if with_bounds {
        manager.set_bounds_data(read_bounds_csv(BOUNDS).unwrap());
    }
    let ctx = ToolContext::new(Arc::new(Mutex::new(manager)), config, Client::new());
    Fixture { ctx, output }
}

async fn call(ctx: &ToolContext, name: &str, args: Value) -> Value {
    call_tool(ctx, name, args).await
}

/// Numeric value of a number or a numeric string
fn number(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.as_f64().unwrap(),
    }
}

fn assert_close(value: &Value, expected: f64) {
    let actual = number(value);
    assert!((actual - expected).abs() < 1e-3, "{} != {}", actual, expected);
}

#[tokio::test]
async fn model_queries() {
    let f = fixture(false);
    assert_eq!(
        call(&f.ctx, "check_model_loaded", Value::Null).await,
        json!({"response": "Model is loaded", "model_id": "toy_model"})
    );
    assert_eq!(
        call(&f.ctx, "get_current_model_id", json!({})).await,
        json!({"model_id": "toy_model"})
    );

    let data = call(&f.ctx, "model_data", Value::Null).await;
    assert_eq!(data["objective_reaction"], "1.0*BIOMASS");
    assert_eq!(data["reactions_count"], 5);
    assert_eq!(data["metabolites_count"], 3);
    assert_eq!(data["genes_count"], 5);
    assert_eq!(data["groups_count"], 4);
    assert_eq!(data["compartments_count"], 2);
    assert_eq!(data["Compartments"], "['cytosol', 'extracellular space']");

    let info = call(&f.ctx, "model_info", json!({"query": "genes", "count": 2})).await;
    assert_eq!(info, json!({"genes": ["glcA", "glcB"]}));
    let info = call(&f.ctx, "model_info", json!({"query": "genes", "count": "1"})).await;
    assert_eq!(info, json!({"genes": ["glcA"]}));
    let info = call(&f.ctx, "model_info", json!({"query": "pathways"})).await;
    assert_eq!(info, json!({"error": "Unknown query: pathways"}));
}

#[tokio::test]
async fn entity_lookups() {
    let f = fixture(false);
    let reaction = call(&f.ctx, "reaction_info", json!({"rxn_name": "GLCt"})).await;
    assert_eq!(reaction["Reaction id"], "GLCt");
    assert_eq!(reaction["GPR"], "g1 or g2");
    assert_eq!(reaction["upper_bound"], 1000.0);
    let glycolysis = call(&f.ctx, "reaction_info", json!({"rxn_name": "R1"})).await;
    assert_eq!(glycolysis["Stochiometry"], "glc_c --> 2.0 pyr_c");

    let reaction = call(&f.ctx, "reaction_info", json!({"rxn_name": "BIOMASS"})).await;
    assert_eq!(reaction["GPR"], "Not Set");

    let missing = call(&f.ctx, "reaction_info", json!({"rxn_name": "PFK"})).await;
    assert_eq!(missing, json!({"error": "Reaction 'PFK' not found in model."}));

    let metabolite = call(&f.ctx, "metabolite_info", json!({"mb_id": "pyr_c"})).await;
    assert_eq!(metabolite["Formula"], "C3H3O3");
    assert_eq!(metabolite["Total Reactions"], 3);

    let gene = call(&f.ctx, "gene_info", json!({"gn_id": "g3"})).await;
    assert_eq!(gene["Gene ID"], "g3");
    assert_eq!(gene["name"], "pfkA");
    assert_eq!(gene["Reactions"], "R1");
}

#[tokio::test]
async fn fba_needs_bounds() {
    let f = fixture(false);
    let result = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_eq!(result, json!({"error": "No Bounds for model reactions are found."}));
}

#[tokio::test]
async fn fba_with_uploaded_bounds() {
    let f = fixture(true);
    let result = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_eq!(result["status"], "optimal");
    assert!(result["Objective value"].is_string());
    assert_close(&result["Objective value"], 20.0);
    assert_eq!(f.ctx.manager.lock().await.last_objective_value.map(f64::round), Some(20.0));
}

fn bounds_row(reaction_id: &str, lower_bound: f64, upper_bound: f64) -> BoundsRow {
    BoundsRow {
        reaction_id: reaction_id.to_string(),
        lower_bound,
        upper_bound,
    }
}

#[tokio::test]
async fn fba_rejects_inverted_bounds() {
    let f = fixture(false);
    f.ctx
        .manager
        .lock()
        .await
        .set_bounds_data(vec![bounds_row("EX_glc", -10., 1000.), bounds_row("R1", 5., 1.)]);
    let result = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_eq!(result, json!({"error": "Wrong Reaction bounds given."}));
}

#[tokio::test]
async fn fba_rejects_nan_bounds() {
    let f = fixture(false);
    f.ctx
        .manager
        .lock()
        .await
        .set_bounds_data(vec![bounds_row("EX_glc", f64::NAN, f64::NAN)]);
    let result = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_eq!(result, json!({"error": "Wrong Reaction bounds given."}));

    let reaction = call(&f.ctx, "reaction_info", json!({"rxn_name": "EX_glc"})).await;
    assert_eq!(reaction["lower_bound"], -10.0);
    assert_eq!(reaction["upper_bound"], 1000.0);
}

#[tokio::test]
async fn fba_needs_an_objective() {
    let f = fixture(true);
    f.ctx.manager.lock().await.objective = false;
    let result = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_eq!(
        result,
        json!({"error": "No Objective Function is set for the model."})
    );
}

#[tokio::test]
async fn objective_can_be_changed() {
    let f = fixture(true);
    let result = call(
        &f.ctx,
        "set_model_objective_value",
        json!({"objective_dict": {"R2": 1.0}}),
    )
    .await;
    assert_eq!(result["status"], "Objective set successfully.");
    assert_eq!(result["direction"], "max");

    let fba = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_close(&fba["Objective value"], 10.0);

    let quoted = call(
        &f.ctx,
        "set_model_objective_value",
        json!({"objective_dict": {"BIOMASS": "1"}, "direction": "max"}),
    )
    .await;
    assert_eq!(quoted["objective"], "1.0*BIOMASS");
    let fba = call(&f.ctx, "run_flux_balance_analysis", Value::Null).await;
    assert_eq!(fba["Objective value"], "20.0");

    let empty = call(&f.ctx, "set_model_objective_value", json!({"objective_dict": {}})).await;
    assert_eq!(empty, json!({"error": "Objective dictionary is empty."}));
}

#[tokio::test]
async fn flux_variability() {
    let f = fixture(false);
    let result = call(
        &f.ctx,
        "run_flux_variability_analysis",
        json!({"rxn_names": ["transport", "R2"]}),
    )
    .await;
    assert_eq!(result["fraction_of_optimum"], 0.9);
    let rows = result["fva_output"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Reaction ID"], "GLCt");
    assert_eq!(rows[0]["Reaction Name"], "Glucose transport");
    assert_close(&rows[0]["Minimum Flux"], 9.0);
    assert_close(&rows[0]["Maximum Flux"], 10.0);
    assert_close(&rows[1]["Minimum Flux"], 0.0);
    assert_close(&rows[1]["Maximum Flux"], 2.0);

    let missing = call(
        &f.ctx,
        "run_flux_variability_analysis",
        json!({"rxn_names": ["ATP synthase"]}),
    )
    .await;
    assert_eq!(
        missing,
        json!({"error": "Reaction name 'ATP synthase' not found in model."})
    );
}

#[tokio::test]
async fn large_fva_results_go_to_csv() {
    let mut f = fixture(false);
    f.ctx.config.preview_rows = 2;
    let result = call(
        &f.ctx,
        "run_flux_variability_analysis",
        json!({"rxn_names": ["EX_glc", "transport", "R1"], "fraction_of_optimum": "0.9"}),
    )
    .await;
    let preview = result["fva_output"].as_array().unwrap();
    assert_eq!(preview.len(), 2);
    assert_eq!(preview[1]["Reaction ID"], "GLCt");
    assert_close(&preview[1]["Minimum Flux"], 9.0);

    let path = f.output.path().join("fva_result.csv");
    assert_eq!(
        result["message"],
        format!("FVA result has 3 entries, saved to {} as CSV file.", path.display())
    );
    let csv = std::fs::read_to_string(path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Reaction Name,Reaction ID,Minimum Flux,Maximum Flux")
    );
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[2].starts_with("Glycolysis lumped,R1,"));
}

#[tokio::test]
async fn gene_knockouts() {
    let f = fixture(false);
    let result = call(
        &f.ctx,
        "gene_knockout_simulation",
        json!({"gene_names": ["g3", "glcA", "unknown"]}),
    )
    .await;
    let rows = result.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Gene(s)"], json!(["g1"]));
    assert_close(&rows[0]["Post-KO Growth"], 20.0);
    assert_eq!(rows[1]["Gene(s)"], json!(["g3"]));
    assert_close(&rows[1]["Post-KO Growth"], 10.0);
    assert_eq!(rows[1]["Solver Status"], "optimal");

    let pair = call(
        &f.ctx,
        "gene_knockout_simulation",
        json!({"gene_names": ["g1", "g2"], "type": "double"}),
    )
    .await;
    assert_eq!(pair[0]["Gene(s)"], json!(["g1", "g2"]));
    assert_close(&pair[0]["Post-KO Growth"], 0.0);

    let invalid = call(
        &f.ctx,
        "gene_knockout_simulation",
        json!({"gene_names": ["g1"], "type": "triple"}),
    )
    .await;
    assert_eq!(invalid, json!({"error": "Invalid type. Choose 'single' or 'double'."}));

    let none = call(&f.ctx, "gene_knockout_simulation", json!({"gene_names": ["b0001"]})).await;
    assert_eq!(
        none,
        json!({"error": "None of the provided genes are valid in this model."})
    );
}

#[tokio::test]
async fn large_knockout_results_go_to_csv() {
    let f = fixture(false);
    let result = call(
        &f.ctx,
        "reaction_knockout_simulation",
        json!({"reaction_names": ["EX_glc", "GLCt", "R1", "R2", "BIOMASS"], "type": "double"}),
    )
    .await;
    assert_eq!(result["note"], "Too many results to display. Download CSV.");
    let path = f.output.path().join("reaction_knockout_result.csv");
    assert_eq!(result["file"], path.display().to_string());

    let csv = std::fs::read_to_string(path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Reaction(s),Post-KO Growth,Solver Status"));
    assert_eq!(lines.count(), 10);
}

#[tokio::test]
async fn tools_without_a_model() {
    let ctx = ToolContext::new(
        Arc::new(Mutex::new(ModelManager::new())),
        Config::default(),
        Client::new(),
    );
    for tool in ["model_data", "run_flux_balance_analysis"] {
        let result = call(&ctx, tool, Value::Null).await;
        assert!(result.get("error").is_some(), "{} should fail", tool);
    }
    let result = call(&ctx, "gene_info", json!({"gn_id": "g1"})).await;
    assert_eq!(result, json!({"error": "No model is currently loaded."}));
}
