//! Output path template rendering

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

fn placeholder() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern"))
}

/// Render a path template by substituting `{name}` tokens from `context`.
///
/// Substitution is literal and the function is pure: identical inputs always
/// produce identical output. Tokens with no entry in `context` are left in
/// place unresolved; supplying a complete context is the caller's job.
pub fn render(template: &str, context: &HashMap<String, String>) -> String {
    placeholder()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            match context.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
