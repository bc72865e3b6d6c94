//! Prompt assembly for dashboard generation
//!
//! The model receives a fixed system prompt plus a user prompt that embeds the
//! caller's data (pretty-printed) and their design instructions.
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = "\
You are a frontend UI designer.

STRICT RULES:
- Output ONLY final, static HTML and CSS
- NO templates, NO variables, NO loops, NO placeholders
- DO NOT use PHP, Jinja, Blade or any server-side code
- Use modern colors and spacing
- Use cards, shadows, and rounded corners
- Use Google Font like 'Poppins' or 'Inter'
- Use soft background colors and accent colors
- DO NOT explain anything
- DO NOT use markdown or code fences
- Output must start with <html> and end with </html>";

const EXPENSES_KEY: &str = "expenses";
const TOTAL_KEY: &str = "total_spending";

/// Adds `total_spending` to data carrying an `expenses` list.
///
/// Entries without a numeric `amount` count as zero. Anything other than an
/// object holding an `expenses` array is left alone.
pub fn enrich(data: &mut Value) {
    let Some(object) = data.as_object_mut() else {
        return;
    };
    let Some(expenses) = object.get(EXPENSES_KEY).and_then(Value::as_array) else {
        return;
    };
    let total: f64 = expenses
        .iter()
        .filter_map(|item| item.get("amount").and_then(Value::as_f64))
        .sum();
    object.insert(TOTAL_KEY.to_string(), Value::String(format!("{total:.2}")));
}

/// The user turn for the first generation attempt.
pub fn build_user_prompt(data: &Value, instructions: &str) -> String {
    format!(
        "JSON Data:\n{}\n\nUser Instructions:\n{}\n",
        pretty(data),
        instructions
    )
}

/// The user turn sent when the first output contained template artefacts.
pub fn build_correction_prompt(data: &Value) -> String {
    format!(
        "The previous output was INVALID.\n\n\
         REGENERATE the dashboard as:\n\
         - PURE STATIC HTML ONLY\n\
         - NO PHP\n\
         - NO variables\n\
         - NO concatenation\n\
         - NO placeholders or symbols like {{{{ }}}}, <? ?>\n\n\
         USE THIS DATA EXACTLY:\n{}\n\n\
         Return ONLY clean HTML starting with <html> and ending with </html>.\n",
        pretty(data)
    )
}

fn pretty(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}
