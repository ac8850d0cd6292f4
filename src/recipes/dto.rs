use serde::{Deserialize, Deserializer, Serialize};

use crate::generator::GenerationSource;
use crate::recipes::repo_types::Recipe;

/// Ingredients arrive as a JSON list, or as one comma-separated string from
/// simple form clients.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngredientsInput {
    List(Vec<String>),
    Text(String),
}

impl GenerateRequest {
    pub fn clean_ingredients(&mut self) -> Vec<String> {
        self.ingredients.take().map(IngredientsInput::into_clean).unwrap_or_default()
    }
}

impl IngredientsInput {
    /// Trimmed, blank entries dropped, order kept.
    pub fn into_clean(self) -> Vec<String> {
        let items = match self {
            Self::List(items) => items,
            Self::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub ingredients: Option<IngredientsInput>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub source: GenerationSource,
    pub recipes: Vec<Recipe>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Accepts `7`, `"7"` or null.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Num(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom("user_id must be an integer")),
    }
}
