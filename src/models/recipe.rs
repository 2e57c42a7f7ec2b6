use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::synthesis::{RecipeDraft, RecipeIngredient};

/// A generated recipe persisted for its owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecipe {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<String>,
    pub image: String,
    pub share_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StoredRecipe {
    /// Wrap a freshly generated draft for `user_id`. Not shared yet.
    pub fn from_draft(user_id: &str, draft: RecipeDraft) -> Self {
        // Microsecond precision matches what the store keeps.
        let now = Utc::now().naive_utc().trunc_subsecs(6);
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: draft.title,
            ingredients: draft.ingredients,
            instructions: draft.instructions,
            image: draft.image,
            share_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.share_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_draft_copies_every_field() {
        let draft = RecipeDraft {
            title: "Soup".into(),
            ingredients: vec![RecipeIngredient {
                name: "leek".into(),
                quantity: "2".into(),
            }],
            instructions: vec!["Simmer".into()],
            image: "data:image/png;base64,AA==".into(),
        };
        let stored = StoredRecipe::from_draft("user-1", draft.clone());
        assert_eq!(stored.user_id, "user-1");
        assert_eq!(stored.title, draft.title);
        assert_eq!(stored.ingredients, draft.ingredients);
        assert_eq!(stored.instructions, draft.instructions);
        assert_eq!(stored.image, draft.image);
        assert!(!stored.is_shared());
        assert_eq!(stored.created_at, stored.updated_at);
    }
}
