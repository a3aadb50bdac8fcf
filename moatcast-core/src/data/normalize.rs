//! Numeric normalization shared by every stage that reads table cells.
//!
//! Contract:
//! 1. Surrounding whitespace is trimmed.
//! 2. One trailing `%` marker is stripped (`"12.5%"` → `12.5`; the value is
//!    NOT divided by 100).
//! 3. The remainder is parsed as a float.
//! 4. Empty, malformed or non-finite input is missing (`None`), never zero.

/// Parse a raw cell into a number following the module contract.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let body = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if body.is_empty() {
        return None;
    }
    body.parse::<f64>().ok().filter(|v| v.is_finite())
}
