//! Quantity and unit extraction from spoken commands
//!
//! Recognizes a digit or spelled-out number (one..ten) followed by a unit
//! spelling, and collapses plural/abbreviated spellings onto one canonical unit.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Unit spellings accepted after a quantity, longest plural forms included
const UNIT_PATTERN: &str =
    r"kg|g|lb|lbs|pieces?|pcs|bunch(?:es)?|cups?|tbsp|tsp|oz|bottles?|cans?|packets?|box(?:es)?";

/// Canonical units produced by extraction
pub const CANONICAL_UNITS: [&str; 13] = [
    "kg", "g", "lb", "pcs", "bunch", "cup", "tbsp", "tsp", "oz", "bottle", "can", "packet",
    "box",
];

/// Spelling variants and the canonical unit each one maps to
const UNIT_VARIANTS: &[(&str, &str)] = &[
    ("piece", "pcs"),
    ("pieces", "pcs"),
    ("pcs", "pcs"),
    ("bottles", "bottle"),
    ("cans", "can"),
    ("boxes", "box"),
    ("bunches", "bunch"),
    ("cups", "cup"),
    ("lbs", "lb"),
    ("packets", "packet"),
];

/// Spelled-out numbers, tried in this order
const NUMBER_WORDS: [(&str, u32); 10] = [
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

static NUMERIC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)(\d+)\s*({UNIT_PATTERN})")).expect("valid regex")
});

static WORD_REGEXES: LazyLock<Vec<(u32, Regex)>> = LazyLock::new(|| {
    NUMBER_WORDS
        .iter()
        .map(|(word, value)| {
            let regex =
                Regex::new(&format!(r"(?i){word}\s*({UNIT_PATTERN})")).expect("valid regex");
            (*value, regex)
        })
        .collect()
});

static PHRASE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let words = NUMBER_WORDS
        .iter()
        .map(|(word, _)| *word)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)^(?:\d+|{words})\s*(?:{UNIT_PATTERN})$")).expect("valid regex")
});

/// A quantity with its canonical unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedQuantity {
    /// Always greater than zero
    pub quantity: u32,
    pub unit: String,
}

/// Extract the first usable quantity/unit pair from free text
///
/// Digit quantities take precedence over spelled-out numbers. Matching is
/// substring-based with no word boundaries, so `"2 grapes"` reads as 2 g.
#[must_use]
pub fn extract(text: &str) -> Option<ParsedQuantity> {
    if let Some(parsed) = extract_numeric(text) {
        return Some(parsed);
    }

    WORD_REGEXES.iter().find_map(|(value, regex)| {
        regex.captures(text).map(|caps| ParsedQuantity {
            quantity: *value,
            unit: normalize_unit(&caps[1]),
        })
    })
}

/// Whether the whole of `phrase` spells a quantity, e.g. "3 kg" or "two bottles"
#[must_use]
pub fn is_quantity_phrase(phrase: &str) -> bool {
    PHRASE_REGEX.is_match(phrase)
}

fn extract_numeric(text: &str) -> Option<ParsedQuantity> {
    NUMERIC_REGEX.captures_iter(text).find_map(|caps| {
        // Zero or out-of-range digits are not a usable quantity
        let quantity = caps[1].parse::<u32>().ok().filter(|q| *q > 0)?;

        Some(ParsedQuantity {
            quantity,
            unit: normalize_unit(&caps[2]),
        })
    })
}

/// Map a unit spelling onto its canonical form
///
/// Spellings without a known variant pass through lower-cased.
#[must_use]
pub fn normalize_unit(unit: &str) -> String {
    let lower = unit.to_lowercase();

    UNIT_VARIANTS
        .iter()
        .find(|(variant, _)| *variant == lower)
        .map_or(lower, |(_, canonical)| (*canonical).to_string())
}
