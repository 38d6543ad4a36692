//! Value coercion: raw cell text into the kind declared by a field.
//!
//! Coercion never fails. Anything that cannot be read as the declared kind degrades to a
//! documented fallback (absent number, verbatim enum text, `false`).

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::types::SpecValue;
use super::units::{self, Unit};
use crate::catalog::{FieldSpec, ValueKind};
use crate::TARGET_NORMALIZE;

const AFFIRMATIVE: &[&str] = &["yes", "y", "true", "t", "1", "on"];

lazy_static! {
    // Digit groups end at any non-digit, so units written flush against the number still match.
    static ref THOUSANDS_SEPARATOR: Regex = Regex::new(r"(\d),(\d{3})(\D|$)").unwrap();
    static ref LEADING_NUMBER: Regex = Regex::new(r"(?s)^([-+]?(?:\d+\.?\d*|\.\d+))\s*(.*)$").unwrap();
    static ref ANY_NUMBER: Regex = Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)").unwrap();
    // A lone letter split from the digits that follow it: "r 410a", "r-410a".
    static ref SPLIT_SHORT_TOKEN: Regex = Regex::new(r"\b([a-z])[\s\-]+(\d)").unwrap();
}

/// A number read from text, with the unit that followed it if one was recognized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub magnitude: f64,
    pub unit: Option<&'static Unit>,
}

/// Coerce `raw` into the kind declared by `spec`. `None` is the absent marker.
pub fn coerce(raw: &str, spec: &FieldSpec) -> Option<SpecValue> {
    match spec.value_kind {
        ValueKind::Number => coerce_number(raw, spec),
        ValueKind::Enum => coerce_enum(raw, &spec.allowed_values),
        ValueKind::Bool => Some(SpecValue::Bool(coerce_bool(raw))),
        ValueKind::Text => Some(SpecValue::Text(raw.trim().to_string())),
    }
}

fn coerce_number(raw: &str, spec: &FieldSpec) -> Option<SpecValue> {
    let quantity = parse_quantity(raw)?;

    let value = match (quantity.unit, spec.unit()) {
        (Some(from), Some(to)) => units::convert(quantity.magnitude, from, to).unwrap_or_else(|| {
            debug!(
                target: TARGET_NORMALIZE,
                "Cannot convert '{}' from {} to {} for '{}'; keeping magnitude",
                raw, from, to, spec.name
            );
            quantity.magnitude
        }),
        _ => quantity.magnitude,
    };

    Some(SpecValue::Number(value))
}

/// Read a leading number and optional unit from `raw`.
///
/// When the text does not start with a number, the first number found anywhere in it is
/// used, together with any unit directly after it. Text with no digits at all yields `None`.
pub fn parse_quantity(raw: &str) -> Option<Quantity> {
    let text = strip_thousands_separators(&normalize_signs(raw.trim()));

    if let Some(caps) = LEADING_NUMBER.captures(&text) {
        if let Ok(magnitude) = caps[1].parse::<f64>() {
            return Some(Quantity {
                magnitude,
                unit: units::match_leading(&caps[2]),
            });
        }
    }

    let found = ANY_NUMBER.find(&text)?;
    let magnitude = found.as_str().parse::<f64>().ok()?;
    Some(Quantity {
        magnitude,
        unit: units::match_leading(&text[found.end()..]),
    })
}

/// Map typographic minus signs to `-`. An en dash only counts when a digit follows it.
fn normalize_signs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{2212}' => out.push('-'),
            '\u{2013}' if matches!(chars.peek(), Some(next) if next.is_ascii_digit()) => out.push('-'),
            other => out.push(other),
        }
    }
    out
}

fn strip_thousands_separators(text: &str) -> String {
    let mut out = text.to_string();
    // "1,234,567" needs two passes because matches cannot overlap.
    while THOUSANDS_SEPARATOR.is_match(&out) {
        out = THOUSANDS_SEPARATOR
            .replace_all(&out, "${1}${2}${3}")
            .into_owned();
    }
    out
}

fn coerce_enum(raw: &str, allowed: &[String]) -> Option<SpecValue> {
    let folded = fold_enum_text(raw);
    if folded.is_empty() {
        return None;
    }
    let compacted = compact(&folded);

    let candidates: Vec<(String, String)> = allowed
        .iter()
        .map(|a| {
            let f = fold_enum_text(a);
            let c = compact(&f);
            (f, c)
        })
        .collect();

    let exact = candidates
        .iter()
        .position(|(f, c)| *f == folded || (!c.is_empty() && *c == compacted));
    let matched = exact.or_else(|| {
        candidates.iter().position(|(f, c)| {
            (!f.is_empty() && folded.contains(f.as_str()))
                || (!c.is_empty() && compacted.contains(c.as_str()))
        })
    });

    match matched {
        Some(i) => Some(SpecValue::Enum(allowed[i].trim().to_lowercase())),
        None => {
            if !allowed.is_empty() {
                debug!(
                    target: TARGET_NORMALIZE,
                    "'{}' matches no allowed value; keeping '{}'", raw, folded
                );
            }
            Some(SpecValue::Enum(folded))
        }
    }
}

/// Case-fold enum text, rejoin split short tokens ("R 410A" to "r410a") and join words with `-`.
pub fn fold_enum_text(raw: &str) -> String {
    let lowered = raw.nfkc().collect::<String>().to_lowercase();
    let joined = SPLIT_SHORT_TOKEN.replace_all(lowered.trim(), "${1}${2}");
    joined.split_whitespace().collect::<Vec<_>>().join("-")
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| c.is_alphanumeric()).collect()
}

fn coerce_bool(raw: &str) -> bool {
    let token = raw.trim().trim_end_matches(['.', '!']).to_lowercase();
    AFFIRMATIVE.contains(&token.as_str())
}
