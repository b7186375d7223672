//! Expiration label to day-count conversion
//!
//! All conversions take the reference day explicitly so results do not
//! depend on the wall clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Abbreviated month names, French and English, lowercase without the trailing period
const MONTHS: [(&str, u32); 26] = [
    ("janv", 1),
    ("jan", 1),
    ("févr", 2),
    ("fév", 2),
    ("fevr", 2),
    ("fev", 2),
    ("feb", 2),
    ("mars", 3),
    ("mar", 3),
    ("avr", 4),
    ("apr", 4),
    ("mai", 5),
    ("may", 5),
    ("juin", 6),
    ("jun", 6),
    ("juil", 7),
    ("jul", 7),
    ("août", 8),
    ("aout", 8),
    ("aug", 8),
    ("sept", 9),
    ("sep", 9),
    ("oct", 10),
    ("nov", 11),
    ("déc", 12),
    ("dec", 12),
];

/// `12 févr. 2026`
static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s+([^\W\d_]+)\.?\s+(\d{4})").expect("valid regex"));

/// `Feb 12, 2026`
static MONTH_DAY_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\W\d_]+)\.?\s+(\d{1,2}),?\s+(\d{4})").expect("valid regex"));

/// Resolve a month word through the abbreviation table.
///
/// Exact matches win; otherwise the first three letters are tried, which
/// covers full names such as `February` or `février`.
pub fn month_from_word(word: &str) -> Option<u32> {
    let key = word.trim().trim_end_matches('.').to_lowercase();
    let lookup = |k: &str| MONTHS.iter().find(|(name, _)| *name == k).map(|(_, m)| *m);

    lookup(&key).or_else(|| {
        let prefix: String = key.chars().take(3).collect();
        if prefix.chars().count() == 3 {
            lookup(&prefix)
        } else {
            None
        }
    })
}

/// Convert a scraped expiration label into whole days after `today`.
///
/// Tries a direct date parse first, then `<day> <month> <year>` and
/// `<month> <day>, <year>`. Today or earlier yields `None`.
pub fn parse_days_to_expiry(label: &str, today: NaiveDate) -> Option<i64> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    if let Some(days) = parse_direct(label, today) {
        return forward_only(days);
    }

    if let Some(caps) = DAY_MONTH_YEAR.captures(label) {
        if let Some(date) = ymd_from_parts(&caps[3], &caps[2], &caps[1]) {
            return forward_only((date - today).num_days());
        }
    }

    if let Some(caps) = MONTH_DAY_YEAR.captures(label) {
        if let Some(date) = ymd_from_parts(&caps[3], &caps[1], &caps[2]) {
            return forward_only((date - today).num_days());
        }
    }

    trace!("Unrecognized expiration label: {:?}", label);
    None
}

/// Convert an explicit ISO `YYYY-MM-DD` date into whole days after `today`.
pub fn date_string_to_days(iso: &str, today: NaiveDate) -> Option<i64> {
    let date = NaiveDate::parse_from_str(iso.trim(), "%Y-%m-%d").ok()?;
    forward_only((date - today).num_days())
}

fn forward_only(days: i64) -> Option<i64> {
    (days > 0).then_some(days)
}

fn parse_direct(label: &str, today: NaiveDate) -> Option<i64> {
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(label, format) {
            return Some((date - today).num_days());
        }
    }

    let midnight = today.and_hms_opt(0, 0, 0)?;
    let target = DateTime::parse_from_rfc3339(label)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(label, "%Y-%m-%dT%H:%M:%S"))
        .ok()?;
    let seconds = (target - midnight).num_seconds() as f64;
    Some((seconds / SECONDS_PER_DAY).ceil() as i64)
}

fn ymd_from_parts(year: &str, month_word: &str, day: &str) -> Option<NaiveDate> {
    let month = month_from_word(month_word)?;
    let year: i32 = year.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
