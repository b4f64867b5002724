// src/agent/react.rs
//
// Parsing of ReAct style model replies into tool calls or final answers.

use serde_json::{json, Value};

/// What the model asked for in one reply
#[derive(Debug, Clone, PartialEq)]
pub enum ReactStep {
    /// Call `tool` with `input`
    Action {
        thought: Option<String>,
        tool: String,
        input: Value,
    },
    /// Final answer to the user
    Answer {
        thought: Option<String>,
        answer: String,
    },
}

/// Parse a model reply
///
/// `Action:` / `Action Input:` blocks take precedence over `Answer:`. A bare
/// `{"name": ..., "arguments": {...}}` object is also accepted as an action (the key may be
/// `parameters` instead of `arguments`). Anything else is taken as the answer.
pub fn parse_react_output(output: &str) -> ReactStep {
    let thought = section(output, "Thought:");

    if let Some(tool) = section(output, "Action:") {
        let tool = first_line(&tool).trim_matches(|c| c == '`' || c == '"').to_string();
        let input = output
            .find("Action Input:")
            .and_then(|pos| find_first_json_object(&output[pos + "Action Input:".len()..]))
            .unwrap_or_else(|| json!({}));
        return ReactStep::Action {
            thought,
            tool,
            input,
        };
    }

    if let Some(answer) = section(output, "Answer:") {
        return ReactStep::Answer { thought, answer };
    }

    if let Some(call) = find_first_json_object(output) {
        if let Some(tool) = call.get("name").and_then(Value::as_str) {
            let input = call
                .get("arguments")
                .or_else(|| call.get("parameters"))
                .cloned()
                .unwrap_or_else(|| json!({}));
            return ReactStep::Action {
                thought,
                tool: tool.to_string(),
                input,
            };
        }
    }

    ReactStep::Answer {
        thought: None,
        answer: output.trim().to_string(),
    }
}

const MARKERS: [&str; 4] = ["Thought:", "Action:", "Action Input:", "Answer:"];

/// Text following `marker` up to the next marker at the start of a line
fn section(output: &str, marker: &str) -> Option<String> {
    let start = output.find(marker)?;
    let rest = &output[start + marker.len()..];
    let mut end = rest.len();
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if offset > 0 && MARKERS.iter().any(|m| trimmed.starts_with(m)) {
            end = offset;
            break;
        }
        offset += line.len();
    }
    let text = rest[..end].trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

/// Finds the first complete JSON object in a string, honouring nested braces and strings
fn find_first_json_object(input: &str) -> Option<Value> {
    let start = input.find('{')?;
    let bytes = input.as_bytes();
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes[start..].iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match b {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return serde_json::from_str(&input[start..start + i + 1]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_with_input() {
        let output = "Thought: I need the reaction details.\nAction: reaction_info\nAction Input: {\"rxn_name\": \"PFK\"}\n";
        assert_eq!(
            parse_react_output(output),
            ReactStep::Action {
                thought: Some("I need the reaction details.".to_string()),
                tool: "reaction_info".to_string(),
                input: json!({"rxn_name": "PFK"}),
            }
        );
    }

    #[test]
    fn action_without_input() {
        let output = "Thought: run it\nAction: `run_flux_balance_analysis`";
        match parse_react_output(output) {
            ReactStep::Action { tool, input, .. } => {
                assert_eq!(tool, "run_flux_balance_analysis");
                assert_eq!(input, json!({}));
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn nested_input_object() {
        let output = "Action: set_model_objective_value\nAction Input: {\"objective_dict\": {\"ATPM\": 1.0}, \"direction\": \"min\"} trailing";
        match parse_react_output(output) {
            ReactStep::Action { input, .. } => {
                assert_eq!(input["objective_dict"]["ATPM"], 1.0);
                assert_eq!(input["direction"], "min");
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn answer_block() {
        let output = "Thought: I can answer directly.\nAnswer: The model has 95 reactions.\nIt is E. coli core.";
        assert_eq!(
            parse_react_output(output),
            ReactStep::Answer {
                thought: Some("I can answer directly.".to_string()),
                answer: "The model has 95 reactions.\nIt is E. coli core.".to_string(),
            }
        );
    }

    #[test]
    fn bare_json_tool_call() {
        let output = "\n{\"name\": \"load_model\", \"parameters\": {\"model_id\": \"e_coli_core\"}}\nLoading now.";
        match parse_react_output(output) {
            ReactStep::Action { tool, input, .. } => {
                assert_eq!(tool, "load_model");
                assert_eq!(input, json!({"model_id": "e_coli_core"}));
            }
            other => panic!("unexpected step {:?}", other),
        }
        let output = r#"{"name": "gene_info", "arguments": {"gn_id": "b0001"}}"#;
        assert!(matches!(parse_react_output(output), ReactStep::Action { .. }));
    }

    #[test]
    fn plain_text_is_the_answer() {
        assert_eq!(
            parse_react_output("  Hello, I help with metabolic models. "),
            ReactStep::Answer {
                thought: None,
                answer: "Hello, I help with metabolic models.".to_string(),
            }
        );
    }

    #[test]
    fn braces_inside_strings() {
        let value = find_first_json_object(r#"x {"a": "}{", "b": {"c": 1}} y"#).unwrap();
        assert_eq!(value["a"], "}{");
        assert_eq!(value["b"]["c"], 1);
    }
}
