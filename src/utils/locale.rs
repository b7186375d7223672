//! Locale-tolerant number parsing for scraped table cells
//!
//! Scraped cells mix French (`1 234,56`) and English (`1,234.56`) number
//! formatting, sometimes inside the same page. Each token is disambiguated on
//! its own; no locale is passed in.

/// Placeholder glyphs the chain page shows for an empty cell
const MISSING_MARKERS: [&str; 2] = ["\u{2014}", "\u{2013}"];

/// Parse one scraped token into a number.
///
/// Returns `None` for blanks, dash placeholders, and anything that does not
/// parse as a finite float after separator normalization.
pub fn parse_num(token: &str) -> Option<f64> {
    let trimmed = token.trim();
    if trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed) {
        return None;
    }

    let mut cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();
    if cleaned.ends_with('%') {
        cleaned.pop();
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // The separator that comes last is the decimal one
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replace(',', "."),
        _ => cleaned,
    };
    if normalized.is_empty() {
        return None;
    }

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
