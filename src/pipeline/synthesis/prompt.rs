use super::ingredients::ValidatedIngredients;

/// Separator used when listing ingredients in the prompt.
pub const INGREDIENT_DELIMITER: &str = ", ";

/// Build the recipe-generation prompt for a validated ingredient list.
///
/// The JSON shape requested here is the contract `extract` and `normalize`
/// rely on: `title`, `ingredients` as `{name, quantity}` objects, and
/// `instructions` as strings, inside a fenced ```json block.
pub fn build_recipe_prompt(ingredients: &ValidatedIngredients) -> String {
    let listed = ingredients
        .iter()
        .collect::<Vec<_>>()
        .join(INGREDIENT_DELIMITER);

    format!(
        r#"Create a recipe using the following ingredients: {listed}.
Return the result as JSON with exactly this structure:

```json
{{
  "title": "",
  "ingredients": [{{"name": "", "quantity": ""}}],
  "instructions": [""]
}}
```

Wrap the JSON in a fenced code block labeled json. Use double quotes for all keys and strings."#
    )
}

/// Build the illustration prompt from a normalized recipe title.
pub fn build_image_prompt(title: &str) -> String {
    format!("an image of a dish for recipe: {title}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::synthesis::ingredients::{validate_ingredients, IngredientInput};

    fn validated(items: &[&str]) -> ValidatedIngredients {
        validate_ingredients(&IngredientInput::from(items), 1).unwrap()
    }

    #[test]
    fn prompt_lists_ingredients_in_order() {
        let prompt = build_recipe_prompt(&validated(&["tomato", "onion", "garlic"]));
        assert!(prompt.contains("tomato, onion, garlic."));
    }

    #[test]
    fn prompt_requests_fenced_json_with_fixed_keys() {
        let prompt = build_recipe_prompt(&validated(&["egg"]));
        assert!(prompt.contains("```json"));
        assert!(prompt.contains(r#""title""#));
        assert!(prompt.contains(r#""ingredients": [{"name": "", "quantity": ""}]"#));
        assert!(prompt.contains(r#""instructions": [""]"#));
    }

    #[test]
    fn prompt_is_deterministic() {
        let list = validated(&["rice", "beans"]);
        assert_eq!(build_recipe_prompt(&list), build_recipe_prompt(&list));
    }

    #[test]
    fn image_prompt_names_the_recipe() {
        assert_eq!(
            build_image_prompt("Pasta Delight"),
            "an image of a dish for recipe: Pasta Delight"
        );
    }
}
