use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::db::to_datetime;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RecipeRow {
    pub id: i64,
    pub title: String,
    pub ingredients: String,
    pub instructions: String,
    pub cooking_time: String,
    pub difficulty: String,
    pub servings: String,
    pub created_at: i64,
    pub user_id: i64,
}

/// Recipe as returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub ingredients: String,
    pub instructions: String,
    pub cooking_time: String,
    pub difficulty: String,
    pub servings: String,
    pub user_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            ingredients: r.ingredients,
            instructions: r.instructions,
            cooking_time: r.cooking_time,
            difficulty: r.difficulty,
            servings: r.servings,
            user_id: r.user_id,
            created_at: to_datetime(r.created_at),
        }
    }
}
