//! Parsing of human-written durations such as `1m30s` or `250ms`.

use std::time::Duration;

/// Nanoseconds per unit.
const UNITS: [(&str, f64); 7] = [
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Parse a sequence of `<number><unit>` terms (`h`, `m`, `s`, `ms`, `us`,
/// `ns`). A bare number is seconds.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty duration".into());
    }
    if let Ok(secs) = text.parse::<f64>() {
        return nanos(secs * 1e9, text);
    }

    let mut total = 0.0;
    let mut rest = text;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(format!("invalid duration {text:?}"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| format!("invalid number in duration {text:?}"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| format!("unknown unit {unit:?} in duration {text:?}"))?;
        total += value * scale;
        rest = &rest[unit_len..];
    }
    nanos(total, text)
}

fn nanos(total: f64, text: &str) -> Result<Duration, String> {
    if !total.is_finite() || total < 0.0 || total > u64::MAX as f64 {
        return Err(format!("duration out of range: {text:?}"));
    }
    Ok(Duration::from_nanos(total.round() as u64))
}
