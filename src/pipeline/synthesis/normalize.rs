// Narrow untrusted model JSON into a `RecipeDraft`, one field at a time.
// Each field has its own total defaulting function; nothing here can fail.

use serde_json::{Map, Value};

use super::extract::ExtractionResult;
use super::ingredients::ValidatedIngredients;
use super::types::{RecipeDraft, RecipeIngredient};

pub const FALLBACK_TITLE: &str = "Generated Recipe";
pub const UNSPECIFIED_QUANTITY: &str = "unspecified";
pub const FALLBACK_INSTRUCTION: &str = "could not process instructions";

/// Keys accepted for an ingredient's name, in priority order. Models often
/// answer in the language of the ingredients, so common translations are kept.
const NAME_KEYS: &[&str] = &["name", "nombre", "ingredient", "item"];
const QUANTITY_KEYS: &[&str] = &["quantity", "cantidad", "amount"];

/// Build the draft from an extraction outcome. `image` is always empty here.
pub fn normalize_recipe(
    extraction: &ExtractionResult,
    ingredients: &ValidatedIngredients,
) -> RecipeDraft {
    let parsed = extraction.as_object();
    RecipeDraft {
        title: normalize_title(parsed),
        ingredients: normalize_ingredients(parsed, ingredients),
        instructions: normalize_instructions(parsed),
        image: String::new(),
    }
}

/// Parsed `title` when it is a non-blank string, else [`FALLBACK_TITLE`].
pub fn normalize_title(parsed: Option<&Map<String, Value>>) -> String {
    parsed
        .and_then(|obj| obj.get("title"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(FALLBACK_TITLE)
        .to_string()
}

/// Parsed `ingredients` array mapped entry by entry; the caller's own list
/// (each with an unspecified quantity) when the array is absent or empty.
pub fn normalize_ingredients(
    parsed: Option<&Map<String, Value>>,
    fallback: &ValidatedIngredients,
) -> Vec<RecipeIngredient> {
    let from_model: Vec<RecipeIngredient> = parsed
        .and_then(|obj| obj.get("ingredients"))
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(ingredient_from_entry).collect())
        .unwrap_or_default();

    if from_model.is_empty() {
        return fallback
            .iter()
            .map(|name| RecipeIngredient {
                name: name.to_string(),
                quantity: UNSPECIFIED_QUANTITY.to_string(),
            })
            .collect();
    }
    from_model
}

/// Parsed `instructions` as a list of non-blank strings; the one-line
/// sentinel when nothing usable is present.
pub fn normalize_instructions(parsed: Option<&Map<String, Value>>) -> Vec<String> {
    let steps: Vec<String> = match parsed.and_then(|obj| obj.get("instructions")) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_text).collect(),
        Some(single @ Value::String(_)) => scalar_text(single).into_iter().collect(),
        _ => Vec::new(),
    };

    if steps.is_empty() {
        vec![FALLBACK_INSTRUCTION.to_string()]
    } else {
        steps
    }
}

fn ingredient_from_entry(entry: &Value) -> RecipeIngredient {
    match entry {
        Value::Object(fields) => RecipeIngredient {
            name: first_text(fields, NAME_KEYS).unwrap_or_default(),
            quantity: first_text(fields, QUANTITY_KEYS)
                .unwrap_or_else(|| UNSPECIFIED_QUANTITY.to_string()),
        },
        other => RecipeIngredient {
            name: scalar_text(other).unwrap_or_default(),
            quantity: UNSPECIFIED_QUANTITY.to_string(),
        },
    }
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(scalar_text)
}

/// Strings (trimmed, non-blank) and numbers as text; anything else is absent.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
