use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::MaybeUser,
    error::{AppError, AppResult},
    extract::{ApiJson, ApiPath, ApiQuery},
    recipes::{
        dto::{DeleteResponse, GenerateRequest, GenerateResponse, ListQuery},
        repo,
        repo_types::Recipe,
        services::generate_and_store,
    },
    state::AppState,
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/generate-recipes", post(generate_recipes))
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", delete(delete_recipe))
}

/// POST /generate-recipes { ingredients: [...], user_id }
/// A bearer token stands in for `user_id` when the body omits it.
#[instrument(skip(state, body))]
pub async fn generate_recipes(
    State(state): State<AppState>,
    MaybeUser(token_user): MaybeUser,
    ApiJson(mut body): ApiJson<GenerateRequest>,
) -> AppResult<(StatusCode, Json<GenerateResponse>)> {
    let ingredients = body.clean_ingredients();
    if ingredients.is_empty() {
        return Err(AppError::validation("No ingredients provided"));
    }
    let user_id = body
        .user_id
        .or(token_user)
        .ok_or_else(|| AppError::validation("User ID required"))?;

    let (recipes, source) = generate_and_store(&state, user_id, &ingredients).await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            message: "Recipes generated successfully".into(),
            source,
            recipes,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> AppResult<Json<Vec<Recipe>>> {
    if matches!(q.limit, Some(l) if l < 0) || q.offset < 0 {
        return Err(AppError::validation("limit and offset must not be negative"));
    }
    let rows = repo::list(&state.db, q.user_id, q.limit, q.offset).await?;
    Ok(Json(rows.into_iter().map(Recipe::from).collect()))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<DeleteResponse>> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Recipe not found"));
    }
    info!(recipe_id = id, "recipe deleted");
    Ok(Json(DeleteResponse {
        message: "Recipe deleted successfully".into(),
    }))
}
