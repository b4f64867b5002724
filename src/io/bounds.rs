//! Reaction bounds tables, one `reaction_id,lower_bound,upper_bound` row per reaction
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::io::table::split_csv_line;

/// Flux bounds for a single reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundsRow {
    pub reaction_id: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Error, Debug)]
pub enum BoundsError {
    #[error("Unable to read bounds file: {0}")]
    UnableToRead(#[from] std::io::Error),
    #[error("Line {line}: expected 3 columns (reaction_id, lower_bound, upper_bound), found {found}")]
    WrongColumnCount { line: usize, found: usize },
    #[error("Line {line}: '{value}' is not a number")]
    NotANumber { line: usize, value: String },
    #[error("Line {line}: NaN is not a valid bound")]
    NaNBound { line: usize },
    #[error("No bounds rows found")]
    Empty,
}

/// Read a bounds CSV file
pub fn read_bounds_csv<P: AsRef<Path>>(path: P) -> Result<Vec<BoundsRow>, BoundsError> {
    let text = fs::read_to_string(path)?;
    parse_bounds_csv(&text)
}

/// Parse bounds CSV text
///
/// The first row is treated as a header when its bound columns are not numeric.
/// Blank lines are skipped.
pub fn parse_bounds_csv(text: &str) -> Result<Vec<BoundsRow>, BoundsError> {
    let mut rows = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(raw);
        if fields.len() != 3 {
            return Err(BoundsError::WrongColumnCount {
                line,
                found: fields.len(),
            });
        }
        let lower = fields[1].trim().parse::<f64>();
        let upper = fields[2].trim().parse::<f64>();
        match (lower, upper) {
            (Ok(lower_bound), Ok(upper_bound)) if lower_bound.is_nan() || upper_bound.is_nan() => {
                return Err(BoundsError::NaNBound { line })
            }
            (Ok(lower_bound), Ok(upper_bound)) => rows.push(BoundsRow {
                reaction_id: fields[0].trim().to_string(),
                lower_bound,
                upper_bound,
            }),
            _ if rows.is_empty() && index == first_content_line(text) => continue,
            (Err(_), _) => {
                return Err(BoundsError::NotANumber {
                    line,
                    value: fields[1].clone(),
                })
            }
            (_, Err(_)) => {
                return Err(BoundsError::NotANumber {
                    line,
                    value: fields[2].clone(),
                })
            }
        }
    }
    if rows.is_empty() {
        return Err(BoundsError::Empty);
    }
    Ok(rows)
}

fn first_content_line(text: &str) -> usize {
    text.lines()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn with_header() {
        let rows = parse_bounds_csv("reaction,lb,ub\nEX_glc,-10,1000\n\nR1,0,5.5\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            BoundsRow {
                reaction_id: "R1".to_string(),
                lower_bound: 0.,
                upper_bound: 5.5
            }
        );
    }

    #[test]
    fn without_header() {
        let rows = parse_bounds_csv("EX_glc,-10,1000").unwrap();
        assert_eq!(rows[0].lower_bound, -10.);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            parse_bounds_csv("a,b,c\nR1,0"),
            Err(BoundsError::WrongColumnCount { line: 2, found: 2 })
        ));
        assert!(matches!(
            parse_bounds_csv("R1,0,1\nR2,x,1"),
            Err(BoundsError::NotANumber { line: 2, .. })
        ));
        assert!(matches!(
            parse_bounds_csv("reaction,lb,ub\n"),
            Err(BoundsError::Empty)
        ));
    }

    #[test]
    fn nan_bounds_are_rejected() {
        assert!(matches!(
            parse_bounds_csv("reaction_id,lower_bound,upper_bound\nEX_glc,nan,nan\n"),
            Err(BoundsError::NaNBound { line: 2 })
        ));
        assert!(matches!(
            parse_bounds_csv("R1,0,NaN"),
            Err(BoundsError::NaNBound { line: 1 })
        ));
        // infinite bounds stay allowed
        let rows = parse_bounds_csv("R1,-inf,inf").unwrap();
        assert!(rows[0].lower_bound.is_infinite());
    }

    #[test]
    fn read_file() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("test_data")
            .join("bounds.csv");
        let rows = read_bounds_csv(path).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].reaction_id, "R1");
    }
}
