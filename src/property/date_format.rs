//! Date patterns in the `yyyy-MM-dd'T'HH:mm:ssZ` notation used by schemas
//! and settings, translated to chrono format strings.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::{Error, Result};

/// Translate a pattern into a chrono format string.
pub fn to_chrono(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            // '' is a literal quote, 'text' is literal text
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }
        i += run;

        let directive = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('D', _) => "%j",
            ('H' | 'k', _) => "%H",
            ('h' | 'K', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('u', _) => "%u",
            ('Z', _) | ('X', 1 | 2) => "%z",
            ('X', _) => "%:z",
            ('z', _) => "%Z",
            _ => {
                return Err(Error::Configuration(format!(
                    "Unsupported date pattern letter {c:?} in {pattern:?}"
                )));
            }
        };
        out.push_str(directive);
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Parse with the pattern only. Date-only patterns yield midnight UTC and
/// patterns without a zone are read as UTC.
pub fn parse_date(input: &str, pattern: &str) -> Option<DateTime<Utc>> {
    let fmt = to_chrono(pattern).ok()?;
    if let Ok(dt) = DateTime::parse_from_str(input, &fmt) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(input, &fmt) {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(input, &fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Parse with the pattern, falling back to RFC 3339 and plain ISO dates.
pub fn parse_date_lenient(input: &str, pattern: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    parse_date(input, pattern)
        .or_else(|| DateTime::parse_from_rfc3339(input).ok().map(|dt| dt.with_timezone(&Utc)))
        .or_else(|| parse_date(input, "yyyy-MM-dd'T'HH:mm:ss"))
        .or_else(|| parse_date(input, "yyyy-MM-dd"))
}

pub fn format_date(dt: &DateTime<Utc>, pattern: &str) -> String {
    match to_chrono(pattern) {
        Ok(fmt) => dt.format(&fmt).to_string(),
        Err(_) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

/// Parse a date with offset. Without an explicit pattern RFC 3339 is used.
pub fn parse_zoned(input: &str, pattern: Option<&str>) -> Option<DateTime<FixedOffset>> {
    let input = input.trim();
    pattern
        .and_then(|p| to_chrono(p).ok())
        .and_then(|fmt| DateTime::parse_from_str(input, &fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(input).ok())
}

pub fn format_zoned(dt: &DateTime<FixedOffset>, pattern: Option<&str>) -> String {
    match pattern.map(to_chrono) {
        Some(Ok(fmt)) => dt.format(&fmt).to_string(),
        _ => dt.to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_translate_default_pattern() {
        assert_eq!(to_chrono("yyyy-MM-dd'T'HH:mm:ssZ").unwrap(), "%Y-%m-%dT%H:%M:%S%z");
        assert_eq!(to_chrono("dd.MM.yy").unwrap(), "%d.%m.%y");
        assert_eq!(to_chrono("HH:mm:ss.SSSXXX").unwrap(), "%H:%M:%S.%3f%:z");
        assert!(to_chrono("'week' ''w''").is_err());
    }

    #[test]
    fn test_date_only_pattern_is_midnight_utc() {
        let dt = parse_date("2024-01-15", "yyyy-MM-dd").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(format_date(&dt, "yyyy-MM-dd"), "2024-01-15");
    }

    #[test]
    fn test_zone_is_honored() {
        let dt = parse_date("2024-01-15T10:00:00+0200", "yyyy-MM-dd'T'HH:mm:ssZ").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_lenient_fallbacks() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(parse_date_lenient("2024-03-01T12:30:00Z", "dd.MM.yyyy"), Some(expected));
        assert_eq!(parse_date_lenient("2024-03-01T12:30:00", "dd.MM.yyyy"), Some(expected));
        assert!(parse_date_lenient("not a date", "dd.MM.yyyy").is_none());
    }
}
