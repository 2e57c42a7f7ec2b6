// Caller-supplied ingredient lists: cleaning, filtering and the minimum-count gate.
// Runs before any external call so a rejected request costs nothing.

use serde_json::Value;

use super::SynthesisError;

/// Longest ingredient name forwarded to the prompt (characters).
const MAX_INGREDIENT_LENGTH: usize = 100;

/// Raw ingredient list as received from the caller. Entries may be missing
/// (null) or blank; both are dropped during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientInput(Vec<Option<String>>);

impl IngredientInput {
    /// Narrow an untyped JSON value into an ingredient list. Non-array values
    /// become an empty list; non-string entries are treated as missing.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self(
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Option<String>>> for IngredientInput {
    fn from(items: Vec<Option<String>>) -> Self {
        Self(items)
    }
}

impl From<Vec<String>> for IngredientInput {
    fn from(items: Vec<String>) -> Self {
        Self(items.into_iter().map(Some).collect())
    }
}

impl From<&[&str]> for IngredientInput {
    fn from(items: &[&str]) -> Self {
        Self(items.iter().map(|s| Some(s.to_string())).collect())
    }
}

impl<const N: usize> From<[&str; N]> for IngredientInput {
    fn from(items: [&str; N]) -> Self {
        Self::from(&items[..])
    }
}

/// Ingredient list that passed validation: cleaned, non-blank, in caller order,
/// and at least as long as the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIngredients(Vec<String>);

impl ValidatedIngredients {
    #[cfg(test)]
    fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Clean every entry, drop the unusable ones, and enforce `min_required`.
pub fn validate_ingredients(
    input: &IngredientInput,
    min_required: usize,
) -> Result<ValidatedIngredients, SynthesisError> {
    let kept: Vec<String> = input
        .0
        .iter()
        .flatten()
        .map(|raw| sanitize_ingredient(raw))
        .filter(|cleaned| !cleaned.is_empty())
        .collect();

    if kept.len() < min_required {
        return Err(SynthesisError::InsufficientIngredients {
            found: kept.len(),
            required: min_required,
        });
    }

    Ok(ValidatedIngredients(kept))
}

/// Strip invisible and control characters, collapse whitespace, trim, and cap
/// the length of a single ingredient.
pub fn sanitize_ingredient(raw: &str) -> String {
    let visible: String = raw
        .chars()
        .map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c })
        .filter(|c| !is_invisible(*c) && !c.is_control())
        .collect();

    let collapsed = visible.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, MAX_INGREDIENT_LENGTH)
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}' // zero-width space/joiners, LRM/RLM
            | '\u{202A}'..='\u{202E}' // bidi embeddings and overrides
            | '\u{2060}'..='\u{2064}' // word joiner, invisible operators
            | '\u{FEFF}' // BOM
    )
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}
