// Prompts for line-item classification

use crate::taxonomy::{CategoryTaxonomy, Direction, MainCategory, ScopeFilter};

pub const SYSTEM_PROMPT_CLASSIFICATION: &str = r#"
You are a bookkeeper classifying line items from cash-flow and profit & loss spreadsheets.
Labels may be in English, Spanish or a mix of both.

## YOUR MISSION
For every numbered line item, choose ONE main category and ONE subcategory code.

## CRITICAL RULES
- Use ONLY the category and subcategory codes listed in the request.
- The subcategory MUST belong to the same direction (inflow/outflow) as the category.
- Do NOT classify totals, subtotals, margins or profit lines as revenue or expenses.
  Leave them out of the response.
- If you are unsure, give a low confidence rather than guessing with a high one.
- Echo the `index` of each line item exactly as given.

## OUTPUT
Return ONLY valid JSON matching the schema.
"#;

fn category_lines() -> String {
    MainCategory::ALL
        .iter()
        .filter(|c| {
            !matches!(
                c,
                MainCategory::Total | MainCategory::Margin | MainCategory::Calculation
            )
        })
        .map(|c| {
            let direction = match c.direction() {
                Direction::Inflow => "inflow",
                Direction::Outflow => "outflow",
            };
            format!("- {} ({})", c, direction)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn subcategory_lines(taxonomy: &CategoryTaxonomy, direction: Direction, filter: &ScopeFilter) -> String {
    taxonomy
        .subcategories(direction, filter)
        .iter()
        .map(|s| format!("- {}: {} / {}", s.code, s.label_en, s.label_es))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The user message: allowed codes followed by the numbered line items.
pub fn build_classification_prompt(
    names: &[(usize, &str)],
    taxonomy: &CategoryTaxonomy,
    filter: &ScopeFilter,
) -> String {
    let items = names
        .iter()
        .map(|(index, name)| format!("{}. \"{}\"", index, name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "### CATEGORIES\n{}\n\n### INFLOW SUBCATEGORIES\n{}\n\n### OUTFLOW SUBCATEGORIES\n{}\n\n### LINE ITEMS\n{}\n",
        category_lines(),
        subcategory_lines(taxonomy, Direction::Inflow, filter),
        subcategory_lines(taxonomy, Direction::Outflow, filter),
        items
    )
}
