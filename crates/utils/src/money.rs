//! Prices are kept as integer cents end to end.

/// Formats cents as a decimal amount, e.g. `2599` -> `"25.99"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Multiplies a unit price by a quantity, refusing to overflow.
pub fn line_total(unit_price_cents: i64, quantity: i64) -> Option<i64> {
    unit_price_cents.checked_mul(quantity)
}
