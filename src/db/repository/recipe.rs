use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::StoredRecipe;

/// Fixed-width so lexical order in SQL matches chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const RECIPE_COLUMNS: &str =
    "id, user_id, title, ingredients, instructions, image, share_id, created_at, updated_at";

pub fn insert_recipe(conn: &Connection, recipe: &StoredRecipe) -> Result<(), DatabaseError> {
    let ingredients = serde_json::to_string(&recipe.ingredients).map_err(|e| {
        DatabaseError::Serialization {
            field: "ingredients",
            reason: e.to_string(),
        }
    })?;
    let instructions = serde_json::to_string(&recipe.instructions).map_err(|e| {
        DatabaseError::Serialization {
            field: "instructions",
            reason: e.to_string(),
        }
    })?;

    conn.execute(
        "INSERT INTO recipes (id, user_id, title, ingredients, instructions, image, share_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            recipe.id.to_string(),
            recipe.user_id,
            recipe.title,
            ingredients,
            instructions,
            recipe.image,
            recipe.share_id.map(|s| s.to_string()),
            format_timestamp(&recipe.created_at),
            format_timestamp(&recipe.updated_at),
        ],
    )?;
    Ok(())
}

/// All recipes owned by `user_id`, newest first.
pub fn list_recipes_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<StoredRecipe>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], read_row)?;

    let mut recipes = Vec::new();
    for row in rows {
        recipes.push(recipe_from_row(row?)?);
    }
    Ok(recipes)
}

/// The recipe with `id` if it belongs to `user_id`.
pub fn get_owned_recipe(
    conn: &Connection,
    id: &Uuid,
    user_id: &str,
) -> Result<Option<StoredRecipe>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1 AND user_id = ?2"),
            params![id.to_string(), user_id],
            read_row,
        )
        .optional()?;

    row.map(recipe_from_row).transpose()
}

/// Delete the recipe if `user_id` owns it. Returns whether a row was removed.
pub fn delete_owned_recipe(
    conn: &Connection,
    id: &Uuid,
    user_id: &str,
) -> Result<bool, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM recipes WHERE id = ?1 AND user_id = ?2",
        params![id.to_string(), user_id],
    )?;
    Ok(deleted > 0)
}

/// Give an owned recipe a share id, keeping any id it already has.
/// `None` when the recipe does not exist or belongs to someone else.
pub fn assign_share_id(
    conn: &Connection,
    id: &Uuid,
    user_id: &str,
) -> Result<Option<Uuid>, DatabaseError> {
    let existing: Option<Option<String>> = conn
        .query_row(
            "SELECT share_id FROM recipes WHERE id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        None => Ok(None),
        Some(Some(share_id)) => parse_uuid("share_id", &share_id).map(Some),
        Some(None) => {
            let share_id = Uuid::new_v4();
            conn.execute(
                "UPDATE recipes SET share_id = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                params![
                    share_id.to_string(),
                    format_timestamp(&Utc::now().naive_utc()),
                    id.to_string(),
                    user_id,
                ],
            )?;
            Ok(Some(share_id))
        }
    }
}

/// Public lookup of a shared recipe.
pub fn get_recipe_by_share_id(
    conn: &Connection,
    share_id: &Uuid,
) -> Result<Option<StoredRecipe>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE share_id = ?1"),
            params![share_id.to_string()],
            read_row,
        )
        .optional()?;

    row.map(recipe_from_row).transpose()
}

struct RecipeRow {
    id: String,
    user_id: String,
    title: String,
    ingredients: String,
    instructions: String,
    image: String,
    share_id: Option<String>,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        ingredients: row.get(3)?,
        instructions: row.get(4)?,
        image: row.get(5)?,
        share_id: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn recipe_from_row(row: RecipeRow) -> Result<StoredRecipe, DatabaseError> {
    Ok(StoredRecipe {
        id: parse_uuid("id", &row.id)?,
        user_id: row.user_id,
        title: row.title,
        ingredients: serde_json::from_str(&row.ingredients).map_err(|e| {
            DatabaseError::Serialization {
                field: "ingredients",
                reason: e.to_string(),
            }
        })?,
        instructions: serde_json::from_str(&row.instructions).map_err(|e| {
            DatabaseError::Serialization {
                field: "instructions",
                reason: e.to_string(),
            }
        })?,
        image: row.image,
        share_id: row
            .share_id
            .as_deref()
            .map(|s| parse_uuid("share_id", s))
            .transpose()?,
        created_at: parse_timestamp("created_at", &row.created_at)?,
        updated_at: parse_timestamp("updated_at", &row.updated_at)?,
    })
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(value).map_err(|e| DatabaseError::Serialization {
        field,
        reason: e.to_string(),
    })
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(field: &'static str, value: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").map_err(|e| {
        DatabaseError::Serialization {
            field,
            reason: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::pipeline::synthesis::{RecipeDraft, RecipeIngredient};
    use chrono::Duration;

    fn draft(title: &str) -> RecipeDraft {
        RecipeDraft {
            title: title.into(),
            ingredients: vec![RecipeIngredient {
                name: "tomato".into(),
                quantity: "2".into(),
            }],
            instructions: vec!["Chop".into(), "Serve".into()],
            image: String::new(),
        }
    }

    fn stored(user: &str, title: &str) -> StoredRecipe {
        StoredRecipe::from_draft(user, draft(title))
    }

    #[test]
    fn insert_and_get_owned() {
        let conn = open_memory_database().unwrap();
        let recipe = stored("alice", "Soup");
        insert_recipe(&conn, &recipe).unwrap();

        let loaded = get_owned_recipe(&conn, &recipe.id, "alice").unwrap().unwrap();
        assert_eq!(loaded.title, "Soup");
        assert_eq!(loaded.ingredients, recipe.ingredients);
        assert_eq!(loaded.instructions, recipe.instructions);
        assert_eq!(loaded.share_id, None);
        assert_eq!(loaded.created_at, recipe.created_at);
    }

    #[test]
    fn other_users_cannot_read() {
        let conn = open_memory_database().unwrap();
        let recipe = stored("alice", "Soup");
        insert_recipe(&conn, &recipe).unwrap();

        assert!(get_owned_recipe(&conn, &recipe.id, "bob").unwrap().is_none());
        assert!(get_owned_recipe(&conn, &Uuid::new_v4(), "alice").unwrap().is_none());
    }

    #[test]
    fn list_is_per_user_and_newest_first() {
        let conn = open_memory_database().unwrap();
        let mut older = stored("alice", "Older");
        older.created_at -= Duration::minutes(5);
        let newer = stored("alice", "Newer");
        insert_recipe(&conn, &older).unwrap();
        insert_recipe(&conn, &newer).unwrap();
        insert_recipe(&conn, &stored("bob", "Bob's")).unwrap();

        let titles: Vec<String> = list_recipes_for_user(&conn, "alice")
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
        assert!(list_recipes_for_user(&conn, "carol").unwrap().is_empty());
    }

    #[test]
    fn delete_requires_ownership() {
        let conn = open_memory_database().unwrap();
        let recipe = stored("alice", "Soup");
        insert_recipe(&conn, &recipe).unwrap();

        assert!(!delete_owned_recipe(&conn, &recipe.id, "bob").unwrap());
        assert!(delete_owned_recipe(&conn, &recipe.id, "alice").unwrap());
        assert!(!delete_owned_recipe(&conn, &recipe.id, "alice").unwrap());
        assert!(get_owned_recipe(&conn, &recipe.id, "alice").unwrap().is_none());
    }

    #[test]
    fn share_id_is_assigned_once_and_resolves() {
        let conn = open_memory_database().unwrap();
        let recipe = stored("alice", "Soup");
        insert_recipe(&conn, &recipe).unwrap();

        let first = assign_share_id(&conn, &recipe.id, "alice").unwrap().unwrap();
        let second = assign_share_id(&conn, &recipe.id, "alice").unwrap().unwrap();
        assert_eq!(first, second);

        let shared = get_recipe_by_share_id(&conn, &first).unwrap().unwrap();
        assert_eq!(shared.id, recipe.id);
        assert_eq!(shared.share_id, Some(first));
    }

    #[test]
    fn share_requires_ownership() {
        let conn = open_memory_database().unwrap();
        let recipe = stored("alice", "Soup");
        insert_recipe(&conn, &recipe).unwrap();

        assert!(assign_share_id(&conn, &recipe.id, "bob").unwrap().is_none());
        assert!(assign_share_id(&conn, &Uuid::new_v4(), "alice").unwrap().is_none());
    }

    #[test]
    fn unknown_share_id_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_recipe_by_share_id(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn corrupt_json_column_is_serialization_error() {
        let conn = open_memory_database().unwrap();
        let recipe = stored("alice", "Soup");
        insert_recipe(&conn, &recipe).unwrap();
        conn.execute(
            "UPDATE recipes SET instructions = 'not json' WHERE id = ?1",
            params![recipe.id.to_string()],
        )
        .unwrap();

        let err = get_owned_recipe(&conn, &recipe.id, "alice").unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::Serialization {
                field: "instructions",
                ..
            }
        ));
    }
}
