//! Per-node generalization
//!
//! Pure value transforms used by the k-anonymity processor. They only prepare
//! a field; whether the released batch is k-anonymous is decided by
//! [`super::KAnonymityValidator`].

use super::settings::{GeneralizationStrategy, SuppressionStrategy};

const MASK: char = '*';
const RANGE_WIDTH: i64 = 10;
const RANGE_CAP: i64 = 90;
const HIERARCHY_MIN_DIGITS: usize = 5;
const HIERARCHY_KEPT_DIGITS: usize = 3;
const TRUNCATE_LEN: usize = 3;

/// Generalize one scalar; `None` means the value is removed
pub fn generalize(
    value: &str,
    strategy: GeneralizationStrategy,
    suppression: SuppressionStrategy,
) -> Option<String> {
    match strategy {
        GeneralizationStrategy::Range => Some(range_band(value)),
        GeneralizationStrategy::Hierarchy => Some(hierarchy_prefix(value)),
        GeneralizationStrategy::Suppression => suppress(value, suppression),
    }
}

/// Bucket integers into decade bands, round decimals to the nearest ten,
/// truncate other long strings
pub fn range_band(value: &str) -> String {
    let trimmed = value.trim();

    if let Ok(n) = trimmed.parse::<i64>() {
        return match n {
            n if n < 0 => "<0".to_string(),
            n if n >= RANGE_CAP => format!("{RANGE_CAP}+"),
            n => {
                let low = n / RANGE_WIDTH * RANGE_WIDTH;
                format!("{}-{}", low, low + RANGE_WIDTH - 1)
            }
        };
    }

    if let Ok(x) = trimmed.parse::<f64>() {
        if x.is_finite() {
            let rounded = (x / RANGE_WIDTH as f64).round() * RANGE_WIDTH as f64;
            // Avoid rendering "-0"
            return format!("{}", rounded + 0.0);
        }
    }

    truncate_with_mask(trimmed)
}

/// Keep a prefix that identifies a wider group
pub fn hierarchy_prefix(value: &str) -> String {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if len >= HIERARCHY_MIN_DIGITS && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let mut out: String = trimmed.chars().take(HIERARCHY_KEPT_DIGITS).collect();
        out.extend(std::iter::repeat(MASK).take(len - HIERARCHY_KEPT_DIGITS));
        return out;
    }

    let mut words = trimmed.split_whitespace();
    if let (Some(first), Some(_)) = (words.next(), words.next()) {
        return first.to_string();
    }

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => {
            let masked = (len - 1).clamp(1, TRUNCATE_LEN);
            let mut out = first.to_string();
            out.extend(std::iter::repeat(MASK).take(masked));
            out
        }
        None => String::new(),
    }
}

/// Remove the value; both sub-strategies behave the same today
pub fn suppress(_value: &str, suppression: SuppressionStrategy) -> Option<String> {
    match suppression {
        SuppressionStrategy::Suppress | SuppressionStrategy::Generalize => None,
    }
}

fn truncate_with_mask(value: &str) -> String {
    if value.chars().count() <= TRUNCATE_LEN {
        return value.to_string();
    }
    let mut out: String = value.chars().take(TRUNCATE_LEN).collect();
    out.extend(std::iter::repeat(MASK).take(TRUNCATE_LEN));
    out
}
