//! Assessment data model and parsing of model output.

use serde::{Deserialize, Serialize};

/// A scored evaluation category with supporting insights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub category: String,
    /// Always within `0..=100`.
    pub score: u8,
    pub insights: Vec<String>,
}

impl Assessment {
    pub fn new(category: impl Into<String>, score: u8, insights: Vec<String>) -> Self {
        Self {
            category: category.into(),
            score: score.min(100),
            insights,
        }
    }
}

/// JSON schema sent with every structured-generation request.
pub fn assessment_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "assessments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "score": { "type": "number" },
                        "insights": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    }
                }
            }
        }
    })
}

/// Extract assessments from a generated object.
///
/// Returns `None` when the object carries no `assessments` array. Scores are
/// rounded and clamped to `0..=100`; entries without a category are dropped,
/// as are non-string insights.
pub fn parse_assessments(object: &serde_json::Value) -> Option<Vec<Assessment>> {
    let items = object.get("assessments")?.as_array()?;

    let parsed = items
        .iter()
        .filter_map(|item| {
            let category = item.get("category")?.as_str()?.trim();
            if category.is_empty() {
                return None;
            }
            let score = item
                .get("score")
                .and_then(score_from_json)
                .unwrap_or(0.0)
                .round()
                .clamp(0.0, 100.0) as u8;
            let insights = item
                .get("insights")
                .and_then(|v| v.as_array())
                .map(|list| {
                    list.iter()
                        .filter_map(|i| i.as_str())
                        .map(str::trim)
                        .filter(|i| !i.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            Some(Assessment::new(category, score, insights))
        })
        .collect();

    Some(parsed)
}

// Models sometimes quote numbers.
fn score_from_json(value: &serde_json::Value) -> Option<f64> {
    let score = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches("/100").trim().parse().ok(),
        _ => None,
    };
    score.filter(|f| f.is_finite())
}
