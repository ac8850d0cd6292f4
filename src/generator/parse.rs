use serde::Deserialize;
use serde_json::Value;

/// One recipe object as the model wrote it. Every field is loose because
/// models disagree on whether lists are arrays or strings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecipe {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub ingredients: Option<Value>,
    #[serde(default)]
    pub instructions: Option<Value>,
    #[serde(default)]
    pub cooking_time: Option<Value>,
    #[serde(default)]
    pub difficulty: Option<Value>,
    #[serde(default)]
    pub servings: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("reply JSON is neither a list nor an object")]
    UnexpectedShape,
    #[error("reply contains no recipe objects")]
    NoRecipes,
}

/// Turns a free-form model reply into recipe objects.
///
/// Fenced code blocks win over surrounding prose. The JSON may be a list, an
/// object with a `recipes` list, or a single recipe object.
pub fn parse_model_reply(reply: &str) -> Result<Vec<RawRecipe>, ParseError> {
    let block = extract_json_block(reply).trim();

    let value = match serde_json::from_str::<Value>(block) {
        Ok(v) => v,
        Err(e) => match bracketed(block).and_then(|s| serde_json::from_str::<Value>(s).ok()) {
            Some(v) => v,
            None => return Err(ParseError::InvalidJson(e)),
        },
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("recipes") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                map.insert("recipes".into(), other);
                vec![Value::Object(map)]
            }
            None => vec![Value::Object(map)],
        },
        _ => return Err(ParseError::UnexpectedShape),
    };

    let recipes: Vec<RawRecipe> = items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();

    if recipes.is_empty() {
        return Err(ParseError::NoRecipes);
    }
    Ok(recipes)
}

fn extract_json_block(reply: &str) -> &str {
    if let Some((_, rest)) = reply.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest);
    }
    if let Some((_, rest)) = reply.split_once("```") {
        let inner = rest.split("```").next().unwrap_or(rest);
        // drop a language tag such as "JSON" or "javascript"
        return match inner.split_once('\n') {
            Some((tag, body)) if !tag.contains(['[', '{']) => body,
            _ => inner,
        };
    }
    reply
}

/// Widest `[...]` or `{...}` span, for replies with prose around bare JSON.
fn bracketed(text: &str) -> Option<&str> {
    let start = text.find(['[', '{'])?;
    let close = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}
