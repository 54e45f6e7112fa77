//! Failure-silent numeric coercion for textual API values.
//!
//! Every metric value arrives as a string and may be malformed or a
//! placeholder such as `"(not set)"`. Both functions are total: they never
//! panic and fall back to zero.

/// Parses `value` as a float and truncates toward zero.
///
/// `"12.0"` becomes `12`, `"-3.9"` becomes `-3`. Returns `0` for `None`,
/// empty or non-numeric input, and for non-finite values.
pub fn to_int(value: Option<&str>) -> i64 {
    let parsed = to_float(value);
    if parsed >= i64::MAX as f64 || parsed <= i64::MIN as f64 {
        return 0;
    }
    parsed.trunc() as i64
}

/// Parses `value` as a float, returning `0.0` on any failure.
pub fn to_float(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
