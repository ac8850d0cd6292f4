use super::RecipeDraft;

/// Three fixed recipes built around the first ingredient. Pure string
/// substitution, so the same input always yields the same output.
pub fn fallback_recipes(ingredients: &[String]) -> Vec<RecipeDraft> {
    let first = ingredients
        .first()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or("mixed vegetables");
    let name = title_case(first);
    let all = ingredients.join(", ");

    vec![
        RecipeDraft {
            title: format!("Simple {} Stir Fry", name),
            ingredients: format!("{}, soy sauce, garlic, oil, salt, pepper", all),
            instructions: format!(
                "1. Heat oil in a pan\n2. Add {} and stir fry\n3. Add other ingredients\n4. Season with soy sauce, salt, and pepper\n5. Cook until tender",
                first
            ),
            cooking_time: "15 minutes".into(),
            difficulty: "Easy".into(),
            servings: "4".into(),
        },
        RecipeDraft {
            title: format!("{} and Vegetable Soup", name),
            ingredients: format!("{}, vegetable broth, onion, herbs, salt", all),
            instructions: format!(
                "1. Boil vegetable broth\n2. Add {} and chopped vegetables\n3. Simmer for 20 minutes\n4. Season with herbs and salt\n5. Serve hot",
                first
            ),
            cooking_time: "25 minutes".into(),
            difficulty: "Medium".into(),
            servings: "6".into(),
        },
        RecipeDraft {
            title: format!("Roasted {} Medley", name),
            ingredients: format!("{}, olive oil, herbs, garlic, salt, pepper", all),
            instructions: format!(
                "1. Preheat oven to 400°F\n2. Toss {} and vegetables with oil and seasonings\n3. Spread on baking sheet\n4. Roast for 25-30 minutes\n5. Serve as side dish",
                first
            ),
            cooking_time: "30 minutes".into(),
            difficulty: "Medium".into(),
            servings: "4".into(),
        },
    ]
}

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
