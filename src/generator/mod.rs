//! Recipe suggestions: ask the chat model, fall back to templates.

mod fallback;
pub mod llm;
mod parse;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::OpenAiConfig;

pub use fallback::{fallback_recipes, title_case};
pub use llm::{ChatMessage, ChatModel, CompletionOptions, OpenAiClient};
pub use parse::{parse_model_reply, ParseError, RawRecipe};

pub const RECIPES_PER_REQUEST: usize = 3;

const DEFAULT_INSTRUCTIONS: &str = "Follow the recipe steps carefully.";
const DEFAULT_COOKING_TIME: &str = "30 minutes";
const DEFAULT_DIFFICULTY: &str = "Medium";
const DEFAULT_SERVINGS: &str = "4";

// recipes column widths, in characters
const MAX_TITLE_LEN: usize = 200;
const MAX_SHORT_LEN: usize = 50;
const MAX_TEXT_LEN: usize = 16_000;

const OPTIONS: CompletionOptions = CompletionOptions {
    max_tokens: 1000,
    temperature: 0.7,
};

/// A recipe with every field filled, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDraft {
    pub title: String,
    pub ingredients: String,
    pub instructions: String,
    pub cooking_time: String,
    pub difficulty: String,
    pub servings: String,
}

impl RecipeDraft {
    /// Cuts every field down to what the recipes table holds.
    pub fn fit_columns(self) -> Self {
        Self {
            title: truncate_chars(self.title, MAX_TITLE_LEN),
            ingredients: truncate_chars(self.ingredients, MAX_TEXT_LEN),
            instructions: truncate_chars(self.instructions, MAX_TEXT_LEN),
            cooking_time: truncate_chars(self.cooking_time, MAX_SHORT_LEN),
            difficulty: truncate_chars(self.difficulty, MAX_SHORT_LEN),
            servings: truncate_chars(self.servings, MAX_SHORT_LEN),
        }
    }
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub recipes: Vec<RecipeDraft>,
    pub source: GenerationSource,
}

pub struct RecipeGenerator {
    model: Option<Arc<dyn ChatModel>>,
}

impl RecipeGenerator {
    pub fn new(model: Option<Arc<dyn ChatModel>>) -> Self {
        Self { model }
    }

    /// Live generation only when an API key is configured.
    pub fn from_config(cfg: &OpenAiConfig) -> anyhow::Result<Self> {
        let model = match cfg.api_key.as_deref() {
            Some(key) => {
                info!(model = %cfg.model, base_url = %cfg.base_url, "chat model configured");
                Some(Arc::new(OpenAiClient::new(cfg, key)?) as Arc<dyn ChatModel>)
            }
            None => {
                warn!("OPENAI_API_KEY not set; recipes will come from templates");
                None
            }
        };
        Ok(Self::new(model))
    }

    pub fn is_live(&self) -> bool {
        self.model.is_some()
    }

    /// Always returns exactly three recipes. Model failures are logged and
    /// replaced by the templates.
    pub async fn generate(&self, ingredients: &[String]) -> Generated {
        let Some(model) = &self.model else {
            debug!("no chat model; using templates");
            return fallback(ingredients);
        };

        let reply = match model.complete(&prompt(ingredients), OPTIONS).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "chat model call failed; using templates");
                return fallback(ingredients);
            }
        };

        match parse_model_reply(&reply) {
            Ok(raw) => {
                debug!(parsed = raw.len(), "model reply parsed");
                Generated {
                    recipes: complete_batch(raw, ingredients),
                    source: GenerationSource::Ai,
                }
            }
            Err(e) => {
                warn!(error = %e, "model reply unusable; using templates");
                fallback(ingredients)
            }
        }
    }
}

fn fallback(ingredients: &[String]) -> Generated {
    Generated {
        recipes: fallback_recipes(ingredients)
            .into_iter()
            .map(RecipeDraft::fit_columns)
            .collect(),
        source: GenerationSource::Fallback,
    }
}

fn prompt(ingredients: &[String]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a helpful cooking assistant. Provide recipe suggestions in JSON format.",
        ),
        ChatMessage::user(format!(
            "Suggest 3 simple recipes using these ingredients: {}.\n\
             For each recipe, provide a creative title, the list of ingredients (including the \
             ones provided plus any additional ones needed), step-by-step instructions, the \
             estimated cooking time, the difficulty level (Easy/Medium/Hard) and the number of \
             servings.\n\
             Format the response as a JSON array of objects with the keys: title, ingredients \
             (array of strings), instructions (string), cooking_time (string), difficulty \
             (string), servings (string).",
            ingredients.join(", ")
        )),
    ]
}

/// Normalizes what the model gave, pads with templates up to three and
/// drops anything beyond.
fn complete_batch(raw: Vec<RawRecipe>, ingredients: &[String]) -> Vec<RecipeDraft> {
    let mut recipes: Vec<RecipeDraft> = raw
        .into_iter()
        .take(RECIPES_PER_REQUEST)
        .map(|r| normalize(r, ingredients))
        .collect();
    if recipes.len() < RECIPES_PER_REQUEST {
        let templates = fallback_recipes(ingredients);
        recipes.extend(templates.into_iter().skip(recipes.len()));
    }
    recipes.into_iter().map(RecipeDraft::fit_columns).collect()
}

pub fn normalize(raw: RawRecipe, ingredients: &[String]) -> RecipeDraft {
    let first = ingredients.first().map(String::as_str).unwrap_or("House");

    RecipeDraft {
        title: raw
            .title
            .as_ref()
            .and_then(|v| text(v, " "))
            .unwrap_or_else(|| format!("{} Special", title_case(first))),
        ingredients: raw
            .ingredients
            .as_ref()
            .and_then(ingredient_text)
            .unwrap_or_else(|| ingredients.join(", ")),
        instructions: raw
            .instructions
            .as_ref()
            .and_then(instruction_text)
            .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.into()),
        cooking_time: raw
            .cooking_time
            .as_ref()
            .and_then(|v| match v {
                Value::Number(n) => Some(format!("{} minutes", n)),
                other => text(other, " "),
            })
            .unwrap_or_else(|| DEFAULT_COOKING_TIME.into()),
        difficulty: raw
            .difficulty
            .as_ref()
            .and_then(|v| text(v, " "))
            .unwrap_or_else(|| DEFAULT_DIFFICULTY.into()),
        servings: raw
            .servings
            .as_ref()
            .and_then(|v| text(v, " "))
            .unwrap_or_else(|| DEFAULT_SERVINGS.into()),
    }
}

/// Non-blank text for strings, numbers and arrays of those.
fn text(v: &Value, sep: &str) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|i| text(i, sep))
            .collect::<Vec<_>>()
            .join(sep),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Ingredient arrays may hold plain names or `{quantity, name}` objects.
fn ingredient_text(v: &Value) -> Option<String> {
    match v {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => {
                        let name = map
                            .get("name")
                            .or_else(|| map.get("item"))
                            .and_then(|n| text(n, " "))?;
                        let qty = map
                            .get("quantity")
                            .or_else(|| map.get("amount"))
                            .and_then(|q| text(q, " "));
                        Some(match qty {
                            Some(q) => format!("{} {}", q, name),
                            None => name,
                        })
                    }
                    other => text(other, " "),
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => text(other, ", "),
    }
}

/// Step arrays are numbered unless the model already numbered them.
fn instruction_text(v: &Value) -> Option<String> {
    match v {
        Value::Array(items) => {
            let steps: Vec<String> = items.iter().filter_map(|i| text(i, " ")).collect();
            if steps.is_empty() {
                return None;
            }
            let numbered = steps
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if s.starts_with(|c: char| c.is_ascii_digit()) {
                        s.clone()
                    } else {
                        format!("{}. {}", i + 1, s)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            Some(numbered)
        }
        other => text(other, "\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: anyhow::Result<String>,
        seen: Mutex<Vec<ChatMessage>>,
    }

    impl ScriptedModel {
        fn ok(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), seen: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { reply: Err(anyhow::anyhow!("connection refused")), seen: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            options: CompletionOptions,
        ) -> anyhow::Result<String> {
            assert_eq!(options.max_tokens, 1000);
            self.seen.lock().unwrap().extend_from_slice(messages);
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn assert_complete(recipes: &[RecipeDraft]) {
        assert_eq!(recipes.len(), RECIPES_PER_REQUEST);
        for r in recipes {
            assert!(!r.title.is_empty());
            assert!(!r.ingredients.is_empty());
            assert!(!r.instructions.is_empty());
            assert!(!r.cooking_time.is_empty());
            assert!(!r.difficulty.is_empty());
            assert!(!r.servings.is_empty());
        }
    }

    #[tokio::test]
    async fn without_model_uses_templates() {
        let gen = RecipeGenerator::new(None);
        assert!(!gen.is_live());
        let out = gen.generate(&list(&["chicken", "rice"])).await;
        assert_eq!(out.source, GenerationSource::Fallback);
        assert_complete(&out.recipes);
        assert_eq!(out.recipes[0].title, "Simple Chicken Stir Fry");
        assert_eq!(out.recipes[0].servings, "4");
    }

    #[tokio::test]
    async fn failing_model_uses_templates() {
        let gen = RecipeGenerator::new(Some(Arc::new(ScriptedModel::failing())));
        let out = gen.generate(&list(&["tofu"])).await;
        assert_eq!(out.source, GenerationSource::Fallback);
        assert_eq!(out.recipes, fallback_recipes(&list(&["tofu"])));
    }

    #[tokio::test]
    async fn unparsable_reply_uses_templates() {
        let gen = RecipeGenerator::new(Some(Arc::new(ScriptedModel::ok("I cannot help with that."))));
        let out = gen.generate(&list(&["beef"])).await;
        assert_eq!(out.source, GenerationSource::Fallback);
        assert_complete(&out.recipes);
    }

    #[tokio::test]
    async fn model_reply_is_used_and_padded() {
        let reply = r#"```json
[{"title": "Chicken Fried Rice", "ingredients": ["chicken", "rice", "egg"],
  "instructions": ["Cook rice", "Fry chicken", "Combine"], "cooking_time": 25,
  "difficulty": "Easy", "servings": 2}]
```"#;
        let model = Arc::new(ScriptedModel::ok(reply));
        let gen = RecipeGenerator::new(Some(model.clone()));
        let out = gen.generate(&list(&["chicken", "rice"])).await;

        assert_eq!(out.source, GenerationSource::Ai);
        assert_complete(&out.recipes);
        let first = &out.recipes[0];
        assert_eq!(first.title, "Chicken Fried Rice");
        assert_eq!(first.ingredients, "chicken, rice, egg");
        assert_eq!(first.instructions, "1. Cook rice\n2. Fry chicken\n3. Combine");
        assert_eq!(first.cooking_time, "25 minutes");
        assert_eq!(first.servings, "2");
        // slots 2 and 3 come from the templates at the same position
        let templates = fallback_recipes(&list(&["chicken", "rice"]));
        assert_eq!(out.recipes[1], templates[1]);
        assert_eq!(out.recipes[2], templates[2]);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].role, "system");
        assert!(seen[1].content.contains("chicken, rice"));
    }

    #[tokio::test]
    async fn extra_recipes_are_dropped() {
        let reply = r#"{"recipes": [{"title": "A"}, {"title": "B"}, {"title": "C"}, {"title": "D"}]}"#;
        let gen = RecipeGenerator::new(Some(Arc::new(ScriptedModel::ok(reply))));
        let out = gen.generate(&list(&["egg"])).await;
        let titles: Vec<_> = out.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn verbose_model_fields_fit_the_table() {
        let long_time = "about ".repeat(40);
        let reply = json!([{
            "title": "é".repeat(500),
            "cooking_time": long_time,
            "difficulty": "Medium",
        }])
        .to_string();
        let gen = RecipeGenerator::new(Some(Arc::new(ScriptedModel::ok(&reply))));
        let out = gen.generate(&list(&["egg"])).await;
        assert_eq!(out.source, GenerationSource::Ai);
        assert_eq!(out.recipes[0].title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(out.recipes[0].cooking_time.chars().count(), MAX_SHORT_LEN);
        assert_eq!(out.recipes[0].difficulty, "Medium");
    }

    #[tokio::test]
    async fn long_ingredient_names_fit_template_titles() {
        let gen = RecipeGenerator::new(None);
        let out = gen.generate(&["x".repeat(300)]).await;
        assert!(out.recipes.iter().all(|r| r.title.chars().count() <= MAX_TITLE_LEN));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo".into(), 2), "hé");
        assert_eq!(truncate_chars("abc".into(), 10), "abc");
    }

    #[test]
    fn normalize_fills_defaults() {
        let draft = normalize(RawRecipe::default(), &list(&["lentils", "carrot"]));
        assert_eq!(draft.title, "Lentils Special");
        assert_eq!(draft.ingredients, "lentils, carrot");
        assert_eq!(draft.instructions, DEFAULT_INSTRUCTIONS);
        assert_eq!(draft.cooking_time, DEFAULT_COOKING_TIME);
        assert_eq!(draft.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(draft.servings, DEFAULT_SERVINGS);
    }

    #[test]
    fn normalize_treats_blank_as_missing() {
        let raw = RawRecipe {
            title: Some(json!("   ")),
            difficulty: Some(json!("")),
            ingredients: Some(json!([])),
            ..Default::default()
        };
        let draft = normalize(raw, &list(&["pasta"]));
        assert_eq!(draft.title, "Pasta Special");
        assert_eq!(draft.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(draft.ingredients, "pasta");
    }

    #[test]
    fn normalize_structured_ingredients() {
        let raw = RawRecipe {
            ingredients: Some(json!([
                {"name": "flour", "quantity": "2 cups"},
                {"item": "salt"},
                "water"
            ])),
            instructions: Some(json!(["1. Mix", "2. Knead"])),
            ..Default::default()
        };
        let draft = normalize(raw, &list(&["flour"]));
        assert_eq!(draft.ingredients, "2 cups flour, salt, water");
        assert_eq!(draft.instructions, "1. Mix\n2. Knead");
    }
}
