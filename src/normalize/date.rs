//! Date parsing across the formats listing pages actually use
//!
//! Inputs range from RFC 3339 stamps to `"15 March, 2024 (IST)"`,
//! `"Mar 15, 2024, 10:30 IST"` and `"15/03/2024"`. Everything that parses
//! becomes a `DateTime<FixedOffset>`; everything else is left to the caller to
//! replace with the sentinel.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use regex::Regex;

/// Timezone abbreviations seen on news and advisory sites, with UTC offsets in seconds
const ZONE_ABBREVIATIONS: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("IST", 5 * 3600 + 1800),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("BST", 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
    ("EET", 2 * 3600),
    ("EEST", 3 * 3600),
    ("MSK", 3 * 3600),
    ("GST", 4 * 3600),
    ("PKT", 5 * 3600),
    ("NPT", 5 * 3600 + 2700),
    ("ICT", 7 * 3600),
    ("SGT", 8 * 3600),
    ("HKT", 8 * 3600),
    ("JST", 9 * 3600),
    ("KST", 9 * 3600),
    ("AEST", 10 * 3600),
    ("AEDT", 11 * 3600),
    ("NZST", 12 * 3600),
];

/// Labels that precede the date in metadata text
const NOISE_WORDS: &[&str] = &[
    "updated", "published", "posted", "last", "modified", "date", "on", "at",
];

/// Date-and-time layouts tried after cleanup (commas removed, single spaces)
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%b %d %Y %H:%M",
    "%B %d %Y %H:%M",
    "%b %d %Y %I:%M %p",
    "%B %d %Y %I:%M %p",
    "%d %b %Y %H:%M",
    "%d %B %Y %H:%M",
    "%d %b %Y %I:%M %p",
    "%d %B %Y %I:%M %p",
    "%b %d %Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
];

/// Date-only layouts, interpreted as midnight
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%b %d %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
];

/// Built-in pattern for a date-shaped substring inside noisy metadata text
///
/// [`default_date_pattern`] extends it with an optional trailing zone drawn
/// from the known abbreviations, so an arbitrary uppercase word after the date
/// is never captured.
pub const DEFAULT_DATE_PATTERN: &str = concat!(
    r"(?i)(?:",
    r"\b\d{1,2}(?:st|nd|rd|th)?\s+",
    r"(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?,?\s+\d{4}",
    r"|\b(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+",
    r"\d{1,2}(?:st|nd|rd|th)?,?\s+\d{4}",
    r"|\b\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2})?(?:Z|[+-]\d{2}:?\d{2})?)?",
    r"|\b\d{1,2}[/.-]\d{1,2}[/.-]\d{4}",
    r")",
    r"(?:,?\s+\d{1,2}:\d{2}(?:\s*[ap]m)?)?",
);

/// Compiles the built-in metadata date pattern with its zone suffix
pub fn default_date_pattern() -> Regex {
    let zones = ZONE_ABBREVIATIONS
        .iter()
        .map(|(abbr, _)| *abbr)
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r"{}(?:\s*\((?-i:{zones})\)|\s+(?-i:{zones})\b)?",
        DEFAULT_DATE_PATTERN,
        zones = zones
    );

    // Built from constants covered by tests
    Regex::new(&pattern).unwrap_or_else(|_| unreachable!("invalid built-in pattern"))
}

/// Finds the first date-shaped substring in a text blob
pub fn find_date_in_text(text: &str, pattern: &Regex) -> Option<String> {
    pattern
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Looks up a timezone abbreviation or numeric offset (`+05:30`, `-0800`)
pub fn lookup_offset(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim().trim_matches(|c| c == '(' || c == ')');

    if let Some(&(_, seconds)) = ZONE_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(zone))
    {
        return FixedOffset::east_opt(seconds);
    }

    parse_numeric_offset(zone)
}

fn parse_numeric_offset(token: &str) -> Option<FixedOffset> {
    let token = token
        .strip_prefix("UTC")
        .or_else(|| token.strip_prefix("GMT"))
        .unwrap_or(token);

    let (sign, digits) = match token.chars().next()? {
        '+' => (1, &token[1..]),
        '-' => (-1, &token[1..]),
        _ => return None,
    };

    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parses a date string into a timestamp
///
/// `default_offset` applies when the text names no zone.
///
/// # Examples
///
/// ```
/// use chrono::{DateTime, FixedOffset};
/// use cyber_news_scraper::normalize::parse_date;
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let parsed = parse_date("15 March, 2024 (IST)", utc).unwrap();
/// let expected = DateTime::parse_from_rfc3339("2024-03-15T00:00:00+05:30").unwrap();
/// assert_eq!(parsed, expected);
/// ```
pub fn parse_date(raw: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts);
    }

    let (cleaned, offset) = clean_date_text(raw);
    let offset = offset.unwrap_or(default_offset);

    if cleaned.is_empty() {
        return None;
    }

    parse_naive(&cleaned).and_then(|naive| offset.from_local_datetime(&naive).single())
}

/// Strips labels, punctuation and zone tokens, returning the bare date text
/// and the zone it named, if any
fn clean_date_text(raw: &str) -> (String, Option<FixedOffset>) {
    let mut offset = None;
    let mut tokens = Vec::new();

    let spaced = raw.replace(',', " ").replace('|', " ");
    for token in spaced.split_whitespace() {
        let bare = token.trim_matches(|c| c == '(' || c == ')');
        if bare.is_empty() {
            continue;
        }

        let is_zone_word = bare.len() >= 2
            && bare.chars().all(|c| c.is_ascii_uppercase())
            && lookup_offset(bare).is_some();
        let is_numeric_zone = parse_numeric_offset(bare).is_some();
        if is_zone_word || is_numeric_zone {
            if offset.is_none() {
                offset = lookup_offset(bare);
            }
            continue;
        }

        let label = bare.trim_end_matches(':').to_ascii_lowercase();
        if NOISE_WORDS.contains(&label.as_str()) {
            continue;
        }

        tokens.push(strip_ordinal(bare.trim_end_matches('.')));
    }

    (tokens.join(" "), offset)
}

/// "15th" -> "15"
fn strip_ordinal(token: &str) -> String {
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(number) = token.strip_suffix(suffix) {
            if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
                return number.to_string();
            }
        }
    }
    token.to_string()
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Splits a compound "author / date" string on the first separator
///
/// Returns `(author, date)`; without a separator the whole string is the date.
pub fn split_author_date(text: &str, separator: &str) -> (Option<String>, String) {
    match text.split_once(separator) {
        Some((author, date)) => {
            let author = author.trim();
            let author = (!author.is_empty()).then(|| author.to_string());
            (author, date.trim().to_string())
        }
        None => (None, text.trim().to_string()),
    }
}
