//! Human-readable byte size parsing.
//!
//! Upload limits are configured the way operators write them ("5mb",
//! "512kb") rather than as raw byte counts.

/// Parse a human-readable byte size expression into a byte count.
///
/// Accepts an optional fractional number followed by an optional unit
/// (`b`, `kb`, `mb`, `gb`, case-insensitive). A bare number is bytes.
pub fn parse_byte_size(input: &str) -> Option<u64> {
    let trimmed = input.trim().to_ascii_lowercase();
    if trimmed.is_empty() {
        return None;
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return None,
    };

    Some((value * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bytes() {
        assert_eq!(parse_byte_size("1000"), Some(1000));
        assert_eq!(parse_byte_size("0"), Some(0));
    }

    #[test]
    fn test_units() {
        assert_eq!(parse_byte_size("1kb"), Some(1024));
        assert_eq!(parse_byte_size("5mb"), Some(5 * 1024 * 1024));
        assert_eq!(parse_byte_size("1GB"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_byte_size("1.5kb"), Some(1536));
        assert_eq!(parse_byte_size(" 2 mb "), Some(2 * 1024 * 1024));
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(parse_byte_size(""), None);
        assert_eq!(parse_byte_size("mb"), None);
        assert_eq!(parse_byte_size("five mb"), None);
        assert_eq!(parse_byte_size("1tb"), None);
        assert_eq!(parse_byte_size("-1kb"), None);
    }
}
