use tracing::info;

use crate::{
    auth::repo_types::User,
    db::now_unix,
    error::{AppError, AppResult},
    generator::GenerationSource,
    recipes::{repo, repo_types::Recipe},
    state::AppState,
};

/// Generates three recipes for `user_id` and stores them in one transaction.
pub async fn generate_and_store(
    state: &AppState,
    user_id: i64,
    ingredients: &[String],
) -> AppResult<(Vec<Recipe>, GenerationSource)> {
    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let generated = state.generator.generate(ingredients).await;
    let rows = repo::insert_batch(&state.db, user_id, &generated.recipes, now_unix()).await?;

    info!(
        user_id,
        count = rows.len(),
        source = ?generated.source,
        "recipes stored"
    );
    Ok((rows.into_iter().map(Recipe::from).collect(), generated.source))
}
