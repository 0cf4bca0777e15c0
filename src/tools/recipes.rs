//! Recipe API (Spoonacular) tools, declared as DataMaps.

use serde_json::json;

use super::datamap::{DataMap, Foreach};
use crate::config::Config;

/// Recipes read aloud per search.
const SEARCH_RESULT_LIMIT: usize = 3;

pub fn recipe_search_tool(api_base: &str, api_key: &str) -> DataMap {
    DataMap::new("search_recipes_by_criteria")
        .purpose("Search for recipes based on dietary preferences, cuisine, and cooking time")
        .parameter("query", "string", "Recipe name or type of dish", true)
        .parameter(
            "diet",
            "string",
            "Dietary restrictions (vegetarian, vegan, gluten-free, etc.)",
            false,
        )
        .parameter("cuisine", "string", "Preferred cuisine type", false)
        .parameter("max_ready_time", "number", "Maximum cooking time in minutes", false)
        .parameter("intolerances", "string", "Food allergies or intolerances", false)
        .webhook(
            "GET",
            format!("{}/recipes/complexSearch", api_base),
            &[("Content-Type", "application/json")],
        )
        .params([
            ("apiKey", json!(api_key)),
            ("query", json!("${args.query}")),
            ("diet", json!("${args.diet}")),
            ("cuisine", json!("${args.cuisine}")),
            ("maxReadyTime", json!("${args.max_ready_time}")),
            ("intolerances", json!("${args.intolerances}")),
            ("addRecipeInformation", json!("true")),
            ("fillIngredients", json!("true")),
            ("number", json!(SEARCH_RESULT_LIMIT)),
            ("sort", json!("popularity")),
        ])
        .foreach(Foreach {
            input_key: "results".to_string(),
            output_key: "recipes_list".to_string(),
            max: SEARCH_RESULT_LIMIT,
            append: "I found ${this.title}. It takes about ${this.readyInMinutes} minutes and serves \
                     ${this.servings} people. ${this.summary}\n"
                .to_string(),
        })
        .output("${foreach.recipes_list}")
        .fallback_output(
            "I'm sorry, I'm having trouble accessing the recipe database right now. \
             Let me try a different approach to help you find something delicious to cook.",
        )
}

pub fn recipe_details_tool(api_base: &str, api_key: &str) -> DataMap {
    DataMap::new("get_recipe_details")
        .purpose("Get complete recipe details including ingredients and instructions")
        .parameter("recipe_id", "string", "Unique recipe identifier", true)
        .webhook(
            "GET",
            format!("{}/recipes/${{args.recipe_id}}/information", api_base),
            &[],
        )
        .params([
            ("apiKey", json!(api_key)),
            ("includeNutrition", json!("false")),
        ])
        .output(
            "Here's how to make ${response.title}: \
             You'll need ${response.extendedIngredients[*].original}. \
             Ready in ${response.readyInMinutes} minutes. \
             Here are the steps: ${response.analyzedInstructions[0].steps[*].step}",
        )
}

pub fn substitution_tool(api_base: &str, api_key: &str) -> DataMap {
    DataMap::new("substitute_ingredient")
        .purpose("Find suitable ingredient substitutions")
        .parameter("ingredient", "string", "Ingredient to substitute", true)
        .webhook("GET", format!("{}/food/ingredients/substitutes", api_base), &[])
        .params([
            ("apiKey", json!(api_key)),
            ("ingredientName", json!("${args.ingredient}")),
        ])
        .output(
            "For ${args.ingredient}, you can substitute: ${response.substitutes[*]}. \
             These work well because ${response.message}",
        )
}

/// All recipe API tools for the configured endpoint and key.
pub fn recipe_tools(config: &Config) -> Vec<DataMap> {
    let (base, key) = (config.recipe_api_base.as_str(), config.api_key.as_str());
    vec![
        recipe_search_tool(base, key),
        recipe_details_tool(base, key),
        substitution_tool(base, key),
    ]
}
