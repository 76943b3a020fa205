//! Price and rating extraction from untyped search results.
//!
//! Each field has an ordered chain of strategies. Structured fields are
//! consulted before free-text mining, and the first strategy that yields a
//! value wins. Nothing extractable is a normal outcome and maps to `0.0`.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::types::RawSearchResult;

/// One way of pulling a number out of a raw result.
pub type Strategy = fn(&RawSearchResult) -> Option<f64>;

/// Price strategies, most trusted first.
pub const PRICE_STRATEGIES: &[Strategy] = &[numeric_price, price_string, snippet_price, title_price];

/// Rating strategies, most trusted first.
pub const RATING_STRATEGIES: &[Strategy] = &[
    numeric_rating,
    snippet_out_of_five,
    snippet_stars,
    title_out_of_five,
    title_stars,
];

/// Highest rating a text pattern may yield; larger numbers are something else.
const MAX_RATING: f64 = 5.0;

static CURRENCY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$€£¥]\s?([0-9][0-9,]*(?:\.[0-9]+)?)").expect("valid currency regex")
});

static OUT_OF_FIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9](?:\.[0-9]+)?)\s*(?:out of 5\b|/\s*5\b)").expect("valid rating regex")
});

static STARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([0-9](?:\.[0-9]+)?)[\s-]*stars?\b").expect("valid stars regex")
});

/// Applies `strategies` in order and returns the first value found, or `0.0`.
#[must_use]
pub fn first_match(raw: &RawSearchResult, strategies: &[Strategy]) -> f64 {
    strategies
        .iter()
        .find_map(|strategy| strategy(raw))
        .unwrap_or(0.0)
}

#[must_use]
pub fn extract_price(raw: &RawSearchResult) -> f64 {
    first_match(raw, PRICE_STRATEGIES)
}

#[must_use]
pub fn extract_rating(raw: &RawSearchResult) -> f64 {
    first_match(raw, RATING_STRATEGIES)
}

/// `extracted_price`, or `price` when the provider sent it as a number.
fn numeric_price(raw: &RawSearchResult) -> Option<f64> {
    ["extracted_price", "price"]
        .iter()
        .find_map(|name| raw.field(name).and_then(Value::as_f64))
        .and_then(non_negative)
}

/// `price` as a currency string, e.g. `"$1,299.00"` or `"19.99 €"`.
fn price_string(raw: &RawSearchResult) -> Option<f64> {
    let text = raw.text("price")?;
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().and_then(non_negative)
}

fn snippet_price(raw: &RawSearchResult) -> Option<f64> {
    mined_price(raw.snippet())
}

/// Last resort: some listings only carry the price in the title.
fn title_price(raw: &RawSearchResult) -> Option<f64> {
    mined_price(raw.title())
}

fn mined_price(text: &str) -> Option<f64> {
    let caps = CURRENCY_AMOUNT.captures(text)?;
    parse_number(&caps[1]).and_then(non_negative)
}

/// `rating` as a JSON number or a numeric string.
fn numeric_rating(raw: &RawSearchResult) -> Option<f64> {
    let value = match raw.field("rating")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.and_then(non_negative)
}

fn snippet_out_of_five(raw: &RawSearchResult) -> Option<f64> {
    mined_rating(&OUT_OF_FIVE, raw.snippet())
}

fn snippet_stars(raw: &RawSearchResult) -> Option<f64> {
    mined_rating(&STARS, raw.snippet())
}

fn title_out_of_five(raw: &RawSearchResult) -> Option<f64> {
    mined_rating(&OUT_OF_FIVE, raw.title())
}

fn title_stars(raw: &RawSearchResult) -> Option<f64> {
    mined_rating(&STARS, raw.title())
}

fn mined_rating(pattern: &Regex, text: &str) -> Option<f64> {
    let caps = pattern.captures(text)?;
    parse_number(&caps[1])
        .and_then(non_negative)
        .filter(|r| *r <= MAX_RATING)
}

fn parse_number(digits: &str) -> Option<f64> {
    digits.replace(',', "").parse::<f64>().ok()
}

fn non_negative(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
