use serde_json::{Map, Value};

use super::repair::repair_json;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Outcome of looking for a recipe payload in generated text.
/// Never an error: every variant is a valid input to `normalize`.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionResult {
    /// No ```json fenced block in the text.
    NotFound,
    /// A block was found but did not parse to a JSON object after repair.
    ParseFailed(String),
    /// The repaired block parsed to a JSON object.
    Parsed(Map<String, Value>),
}

impl ExtractionResult {
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            ExtractionResult::Parsed(obj) => Some(obj),
            _ => None,
        }
    }
}

/// Return the trimmed contents of the first ```json fenced block.
pub fn find_fenced_json(text: &str) -> Option<&str> {
    let open = text.find(FENCE_OPEN)?;
    let content_start = open + FENCE_OPEN.len();
    let close = text[content_start..].find(FENCE_CLOSE)?;
    Some(text[content_start..content_start + close].trim())
}

/// Locate, repair and parse the recipe JSON embedded in `text`.
pub fn extract_recipe_json(text: &str) -> ExtractionResult {
    let Some(block) = find_fenced_json(text) else {
        return ExtractionResult::NotFound;
    };

    let repaired = repair_json(block);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(obj)) => ExtractionResult::Parsed(obj),
        Ok(other) => ExtractionResult::ParseFailed(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        )),
        Err(e) => ExtractionResult::ParseFailed(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
