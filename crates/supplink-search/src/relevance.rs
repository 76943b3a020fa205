use supplink_core::RelevanceRule;

use crate::types::RawSearchResult;

/// Returns `true` if `raw` looks like it is about `item` under `rule`.
///
/// Guards against results that sit on an approved domain but describe some
/// other product.
#[must_use]
pub fn is_relevant(rule: RelevanceRule, item: &str, raw: &RawSearchResult) -> bool {
    match rule {
        RelevanceRule::Off => true,
        RelevanceRule::Phrase => {
            let needle = item.trim().to_lowercase();
            if needle.is_empty() {
                return false;
            }
            raw.title().to_lowercase().contains(&needle)
                || raw.snippet().to_lowercase().contains(&needle)
        }
        RelevanceRule::Tokens { min_ratio } => {
            let wanted = tokens(item);
            if wanted.is_empty() {
                return false;
            }
            let haystack = tokens(&format!("{} {}", raw.title(), raw.snippet()));
            let found = wanted.iter().filter(|t| haystack.contains(t)).count();
            #[allow(clippy::cast_precision_loss)]
            let ratio = found as f64 / wanted.len() as f64;
            ratio >= min_ratio
        }
    }
}

fn tokens(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
    {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}
