use sqlx::{Any, AnyPool, Transaction};

use crate::db::last_insert_id;
use crate::generator::RecipeDraft;
use crate::recipes::repo_types::RecipeRow;

const RECIPE_COLUMNS: &str =
    "id, title, ingredients, instructions, cooking_time, difficulty, servings, created_at, user_id";

/// Insert one recipe inside a transaction.
pub async fn insert_recipe_tx(
    tx: &mut Transaction<'_, Any>,
    user_id: i64,
    draft: &RecipeDraft,
    created_at: i64,
) -> Result<RecipeRow, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO recipes
            (title, ingredients, instructions, cooking_time, difficulty, servings, created_at, user_id)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&draft.title)
    .bind(&draft.ingredients)
    .bind(&draft.instructions)
    .bind(&draft.cooking_time)
    .bind(&draft.difficulty)
    .bind(&draft.servings)
    .bind(created_at)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    let id = last_insert_id(tx).await?;

    Ok(RecipeRow {
        id,
        title: draft.title.clone(),
        ingredients: draft.ingredients.clone(),
        instructions: draft.instructions.clone(),
        cooking_time: draft.cooking_time.clone(),
        difficulty: draft.difficulty.clone(),
        servings: draft.servings.clone(),
        created_at,
        user_id,
    })
}

/// All drafts or none.
pub async fn insert_batch(
    db: &AnyPool,
    user_id: i64,
    drafts: &[RecipeDraft],
    created_at: i64,
) -> Result<Vec<RecipeRow>, sqlx::Error> {
    let mut tx = db.begin().await?;
    let mut rows = Vec::with_capacity(drafts.len());
    for draft in drafts {
        // dropping `tx` on error rolls back
        rows.push(insert_recipe_tx(&mut tx, user_id, draft, created_at).await?);
    }
    tx.commit().await?;
    Ok(rows)
}

/// Newest first; same-second rows fall back to id order.
pub async fn list(
    db: &AnyPool,
    user_id: Option<i64>,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<RecipeRow>, sqlx::Error> {
    let mut sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes");
    if user_id.is_some() {
        sql.push_str(" WHERE user_id = ?");
    }
    sql.push_str(" ORDER BY created_at DESC, id DESC");
    // MySQL has no OFFSET without LIMIT
    if limit.is_some() || offset > 0 {
        sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut query = sqlx::query_as::<_, RecipeRow>(&sql);
    if let Some(uid) = user_id {
        query = query.bind(uid);
    }
    if limit.is_some() || offset > 0 {
        query = query.bind(limit.unwrap_or(i64::MAX)).bind(offset);
    }
    query.fetch_all(db).await
}

/// Returns whether a row was removed.
pub async fn delete(db: &AnyPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(db: &AnyPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recipes")
        .fetch_one(db)
        .await
}
