// src/cli/helper.rs
use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper, Result as RustylineResult};

// Commands offered by tab completion
const APP_COMMANDS: [&str; 16] = [
    // General
    "/help", "/status", "/config", "/quit", "/exit", "/clear",
    // LLM
    "/use", "/model", "/model_list", "/select_model",
    // Models
    "/load", "/upload", "/bounds", "/stats", "/models", "/switch",
];

// Commands whose argument is a local path
const PATH_COMMANDS: [&str; 2] = ["/upload", "/bounds"];

#[derive(Helper)]
pub struct ReplHelper {
    filename_completer: FilenameCompleter,
}

impl ReplHelper {
    pub fn new() -> Self {
        Self {
            filename_completer: FilenameCompleter::new(),
        }
    }
}

impl Default for ReplHelper {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands starting with `/<prefix>`
fn matching_commands(prefix: &str) -> Vec<Pair> {
    APP_COMMANDS
        .iter()
        .filter(|cmd| cmd[1..].starts_with(prefix))
        .map(|cmd| Pair {
            display: cmd.to_string(),
            replacement: cmd.to_string(),
        })
        .collect()
}

// --- Manual Implementation for Completer ---
impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> RustylineResult<(usize, Vec<Self::Candidate>)> {
        if !line.starts_with('/') || pos == 0 {
            return Ok((pos, Vec::new()));
        }
        match line.find(' ') {
            Some(space_idx) if pos > space_idx => {
                let command = &line[..space_idx];
                if !PATH_COMMANDS.contains(&command) {
                    return Ok((pos, Vec::new()));
                }
                let mut start_pos = space_idx;
                while line[start_pos..].starts_with(' ') {
                    start_pos += 1;
                }
                if pos < start_pos {
                    return Ok((pos, Vec::new()));
                }
                self.filename_completer
                    .complete(&line[start_pos..], pos - start_pos, ctx)
                    .map(|(replace_offset, candidates)| (start_pos + replace_offset, candidates))
            }
            _ => Ok((0, matching_commands(&line[1..pos]))),
        }
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Validator for ReplHelper {}

impl Highlighter for ReplHelper {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_command_prefixes() {
        let names: Vec<String> = matching_commands("mod")
            .into_iter()
            .map(|p| p.replacement)
            .collect();
        assert_eq!(names, vec!["/model", "/model_list", "/models"]);
        assert_eq!(matching_commands("s").len(), 4);
        assert!(matching_commands("shell").is_empty());
    }
}
