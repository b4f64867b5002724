// src/tools/inspect.rs
//
// Tools for loading models and looking at their contents.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::{error_value, lenient_usize, ToolContext};
use crate::metabolic::model::Gpr;

// --- Arguments ---

#[derive(Debug, Deserialize)]
pub struct LoadModelArgs {
    pub model_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfoArgs {
    pub query: String,
    #[serde(default = "default_count", deserialize_with = "lenient_usize")]
    pub count: usize,
}

fn default_count() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct ReactionInfoArgs {
    pub rxn_name: String,
}

#[derive(Debug, Deserialize)]
pub struct MetaboliteInfoArgs {
    pub mb_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GeneInfoArgs {
    pub gn_id: String,
}

// --- Model Selection ---

pub async fn check_model_loaded(ctx: &ToolContext) -> Value {
    let manager = ctx.manager.lock().await;
    match manager.current_model_id.as_deref() {
        Some(id) => json!({"response": "Model is loaded", "model_id": id}),
        None => error_value("No model is currently loaded. Please load a model first."),
    }
}

pub async fn get_current_model_id(ctx: &ToolContext) -> Value {
    let manager = ctx.manager.lock().await;
    match manager.current_model_id.as_deref() {
        Some(id) => json!({ "model_id": id }),
        None => error_value("No model is currently loaded. Please load a model first."),
    }
}

pub async fn load_model(ctx: &ToolContext, args: LoadModelArgs) -> Value {
    let mut manager = ctx.manager.lock().await;
    match manager
        .load_model_by_id(&ctx.client, &ctx.config, &args.model_id)
        .await
    {
        Ok(model_id) => {
            info!(model_id = %model_id, "Model loaded by tool");
            json!({
                "response": format!("Model {} loaded successfully.", args.model_id),
                "model_id": model_id,
            })
        }
        Err(e) => error_value(e),
    }
}

// --- Model Contents ---

pub async fn model_data(ctx: &ToolContext) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let model_id = model
        .id
        .clone()
        .or_else(|| manager.current_model_id.clone())
        .unwrap_or_default();
    let objective = if model.has_objective() {
        model.objective_expression()
    } else {
        "Not Set Yet".to_string()
    };
    json!({
        "model_id": model_id,
        "objective_reaction": objective,
        "reactions_count": model.reactions.len(),
        "metabolites_count": model.metabolites.len(),
        "genes_count": model.genes.len(),
        "groups_count": model.subsystems().len(),
        "compartments_count": model.compartments.len(),
        "Compartments": model.compartment_list(),
    })
}

pub async fn model_info(ctx: &ToolContext, args: ModelInfoArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let names: Vec<&str> = match args.query.as_str() {
        "reactions" => model.reactions.values().map(|r| r.display_name()).collect(),
        "genes" => model.genes.values().map(|g| g.display_name()).collect(),
        "metabolites" => model.metabolites.values().map(|m| m.display_name()).collect(),
        other => return error_value(format!("Unknown query: {}", other)),
    };
    let names: Vec<&str> = names.into_iter().take(args.count).collect();
    let mut result = serde_json::Map::new();
    result.insert(args.query, json!(names));
    Value::Object(result)
}

/// GPR rule without the parentheses wrapping the whole expression
fn rule_string(gpr: &Gpr) -> String {
    let rule = gpr.to_string();
    match rule.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => inner.to_string(),
        None => rule,
    }
}

pub async fn reaction_info(ctx: &ToolContext, args: ReactionInfoArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let Some(reaction) = model.find_reaction(&args.rxn_name) else {
        return error_value(format!("Reaction '{}' not found in model.", args.rxn_name));
    };
    json!({
        "Reaction id": reaction.id,
        "name": reaction.name.clone().unwrap_or_default(),
        "Stochiometry": reaction.build_reaction_string(),
        "GPR": reaction.gpr.as_ref().map(rule_string).unwrap_or_else(|| "Not Set".to_string()),
        "lower_bound": reaction.lower_bound,
        "upper_bound": reaction.upper_bound,
    })
}

pub async fn metabolite_info(ctx: &ToolContext, args: MetaboliteInfoArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let Some(metabolite) = model.find_metabolite(&args.mb_id) else {
        return error_value(format!("Metabolite '{}' not found in model.", args.mb_id));
    };
    let reactions: Vec<&str> = model
        .reactions_for_metabolite(&metabolite.id)
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    json!({
        "Metabolite id": metabolite.id,
        "name": metabolite.name.clone().unwrap_or_default(),
        "Formula": metabolite.formula,
        "Compartment": metabolite.compartment,
        "Total Reactions": reactions.len(),
        "Reactions": reactions.join(", "),
    })
}

pub async fn gene_info(ctx: &ToolContext, args: GeneInfoArgs) -> Value {
    let manager = ctx.manager.lock().await;
    let model = match manager.get_current_model() {
        Ok(model) => model,
        Err(e) => return error_value(e),
    };
    let Some(gene) = model.find_gene(&args.gn_id) else {
        return error_value(format!("Gene '{}' not found in model.", args.gn_id));
    };
    let reactions: Vec<&str> = model
        .reactions_for_gene(&gene.id)
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    json!({
        "Gene ID": gene.id,
        "name": gene.name.clone().unwrap_or_default(),
        "Total Reactions": reactions.len(),
        "Reactions": reactions.join(", "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic::model::GprOperatorType;

    #[test]
    fn rule_string_drops_outer_parentheses() {
        let gpr = Gpr::new_binary_operation(
            Gpr::new_gene_node("g1"),
            GprOperatorType::Or,
            Gpr::new_gene_node("g2"),
        )
        .unwrap();
        assert_eq!(rule_string(&gpr), "g1 or g2");
        assert_eq!(rule_string(&Gpr::new_gene_node("g5")), "g5");
    }
}
