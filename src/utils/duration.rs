//! Duration parsing and formatting for duration-typed flags
//!
//! Accepts the compact unit-suffixed notation commonly used on command lines
//! and in flag files: "300ms", "1.5s", "2h45m", "1h30m10s".

use regex::Regex;
use std::time::Duration;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse a duration string such as "90s", "1h30m" or "1.5ms".
///
/// A leading '+' is accepted. Negative durations are rejected because
/// `std::time::Duration` cannot represent them. The bare string "0" is
/// accepted without a unit.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let body = input.strip_prefix('+').unwrap_or(input);
    if body.starts_with('-') {
        return Err(format!("negative duration {:?}", input));
    }
    if body == "0" {
        return Ok(Duration::ZERO);
    }
    if body.is_empty() {
        return Err(format!("invalid duration {:?}", input));
    }

    let whole = Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)[a-zµμ]+)+$").map_err(|e| e.to_string())?;
    if !whole.is_match(body) {
        return Err(format!("invalid duration {:?}", input));
    }

    let component = Regex::new(r"(\d*)(?:\.(\d*))?([a-zµμ]+)").map_err(|e| e.to_string())?;
    let mut total: u128 = 0;
    for caps in component.captures_iter(body) {
        let unit = &caps[3];
        let scale =
            unit_nanos(unit).ok_or_else(|| format!("unknown unit {:?} in duration {:?}", unit, input))?;

        let int_part = &caps[1];
        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part
                .parse()
                .map_err(|_| format!("invalid duration {:?}", input))?
        };

        let mut nanos = int_value
            .checked_mul(scale)
            .ok_or_else(|| format!("duration {:?} out of range", input))?;

        if let Some(frac) = caps.get(2).map(|m| m.as_str()).filter(|f| !f.is_empty()) {
            let digits: f64 = format!("0.{}", frac)
                .parse()
                .map_err(|_| format!("invalid duration {:?}", input))?;
            nanos += (digits * scale as f64).round() as u128;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| format!("duration {:?} out of range", input))?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| format!("duration {:?} out of range", input))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Render a duration in the same notation `parse_duration` accepts.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{}ns", nanos);
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", fraction(nanos, NANOS_PER_MICRO, 3));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fraction(nanos, NANOS_PER_MILLI, 6));
    }

    let total_secs = nanos / NANOS_PER_SEC;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = fraction((total_secs % 60) * NANOS_PER_SEC + nanos % NANOS_PER_SEC, NANOS_PER_SEC, 9);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&format!("{}s", seconds));
    out
}

fn fraction(value: u128, unit: u128, width: usize) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("15us").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("15µs").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("7ns").unwrap(), Duration::from_nanos(7));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1m30.5s").unwrap(), Duration::from_millis(90_500));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("+10s").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("-5s").is_err());
        assert!(parse_duration("1h 30m").is_err());
    }

    #[test]
    fn test_format() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(42)), "42ns");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
    }

    #[test]
    fn test_format_output_parses_back() {
        let d = Duration::from_millis(5_400_250);
        assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
    }
}
