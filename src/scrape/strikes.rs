//! Strike discovery
//!
//! The chain page exposes its strike list in several places depending on how
//! it was rendered. Each place gets its own extraction strategy; strategies
//! are tried in order and the first one that finds anything wins.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::utils::parse_num;

/// Exclusive bounds for bare integers taken as strikes
const BARE_STRIKE_RANGE: (f64, f64) = (1.0, 100_000.0);

/// A strike extraction strategy over (markdown text, optional HTML markup)
pub type StrikeStrategy = fn(&str, Option<&str>) -> Vec<f64>;

/// Strategies in priority order
pub const STRATEGIES: [(&str, StrikeStrategy); 4] = [
    ("tooltip attributes", from_tooltips),
    ("labeled spans", from_labeled_spans),
    ("text before table", from_text_before_table),
    ("strike query parameter", from_query_parameter),
];

static TOOLTIP_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:data-tooltip|data-title|aria-label|title)\s*=\s*"([\d\s\u{a0}\u{202f}.,]+)""#,
    )
    .expect("valid regex")
});

static LABELED_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<span[^>]*(?:class|data-[\w-]+)\s*=\s*"[^"]*(?:strike|label)[^"]*"[^>]*>\s*([\d\s\u{a0}\u{202f}.,]+?)\s*</span>"#,
    )
    .expect("valid regex")
});

static TABLE_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\|").expect("valid regex"));

/// A whole comma-decimal number; the leading group stops matches from
/// starting in the middle of a digit run
static LOCALE_DECIMAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\d.,])(\d+(?:[ \u{a0}\u{202f}.]\d{3})*,\d+)").expect("valid regex")
});

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));

static STRIKE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"strike=(\d+(?:[.,]\d+)?)").expect("valid regex"));

/// Recover the strikes referenced by a scraped snapshot.
///
/// Returns an ascending, deduplicated list; empty when no strategy finds
/// anything.
pub fn discover_strikes(text: &str, markup: Option<&str>) -> Vec<f64> {
    for (name, strategy) in STRATEGIES {
        let found = strategy(text, markup);
        if !found.is_empty() {
            debug!("Found {} strike candidates via {}", found.len(), name);
            return sorted_unique(found);
        }
    }

    debug!("No strikes found in snapshot");
    Vec::new()
}

/// Numeric tooltip attribute values in the markup
pub fn from_tooltips(_text: &str, markup: Option<&str>) -> Vec<f64> {
    let Some(html) = markup else {
        return Vec::new();
    };
    TOOLTIP_VALUE
        .captures_iter(html)
        .filter_map(|caps| parse_num(&caps[1]))
        .filter(|v| *v > 0.0)
        .collect()
}

/// Numeric content of strike/label spans in the markup
pub fn from_labeled_spans(_text: &str, markup: Option<&str>) -> Vec<f64> {
    let Some(html) = markup else {
        return Vec::new();
    };
    LABELED_SPAN
        .captures_iter(html)
        .filter_map(|caps| parse_num(&caps[1]))
        .filter(|v| *v > 0.0)
        .collect()
}

/// Numbers in the text that precedes the first table line.
///
/// Comma-decimal numbers are preferred; bare integers are only used when
/// there are none.
pub fn from_text_before_table(text: &str, _markup: Option<&str>) -> Vec<f64> {
    let region = match TABLE_START.find(text) {
        Some(m) => &text[..m.start()],
        None => text,
    };

    let decimals: Vec<f64> = LOCALE_DECIMAL
        .captures_iter(region)
        .filter_map(|caps| parse_num(&caps[1]))
        .filter(|v| *v > 0.0)
        .collect();
    if !decimals.is_empty() {
        return decimals;
    }

    let mut integers: Vec<f64> = Vec::new();
    for m in DIGIT_RUN.find_iter(region) {
        if !(2..=6).contains(&m.len()) || touches_separator(region, m.start(), m.end()) {
            continue;
        }
        let Ok(value) = m.as_str().parse::<f64>() else {
            continue;
        };
        if value > BARE_STRIKE_RANGE.0 && value < BARE_STRIKE_RANGE.1 && !integers.contains(&value)
        {
            integers.push(value);
        }
    }
    integers
}

/// `strike=<number>` anywhere in the text
pub fn from_query_parameter(text: &str, _markup: Option<&str>) -> Vec<f64> {
    STRIKE_PARAM
        .captures_iter(text)
        .filter_map(|caps| parse_num(&caps[1]))
        .collect()
}

fn touches_separator(region: &str, start: usize, end: usize) -> bool {
    let is_separator = |c: char| c == '.' || c == ',';
    let before = region[..start].chars().next_back().is_some_and(is_separator);
    let after = region[end..].chars().next().is_some_and(is_separator);
    before || after
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKUP: &str = r#"
        <div class="strike-row" title="70,00">70</div>
        <div data-tooltip="72,50"></div>
        <div title="Strike price">x</div>
        <div title="72,50"></div>
        <div title="0"></div>
    "#;

    #[test]
    fn tooltips_win_first() {
        let strikes = discover_strikes("strike=99", Some(MARKUP));
        assert_eq!(strikes, vec![70.0, 72.5]);
    }

    #[test]
    fn labeled_spans_when_no_tooltips() {
        let html = r#"<span class="strike-label">4 150,5</span><span class="label">4&nbsp;</span><span class="x">12</span>"#;
        assert_eq!(from_tooltips("", Some(html)), Vec::<f64>::new());
        assert_eq!(discover_strikes("", Some(html)), vec![4150.5]);
    }

    #[test]
    fn text_before_table_prefers_decimals() {
        let text = "Strikes 68,50 70,00 1\u{a0}250,00\nExpires 2026\n| Calls | Puts |\n| 99,00 |";
        assert_eq!(discover_strikes(text, None), vec![68.5, 70.0, 1250.0]);
    }

    #[test]
    fn unseparated_thousands_stay_whole() {
        let text = "Strikes 4150,25 4200,50\n| Calls | Puts |\n";
        assert_eq!(discover_strikes(text, None), vec![4150.25, 4200.5]);

        let text = "Gold 1.950,00;12345,5 and 2\u{a0}000,00\n| Calls | Puts |";
        assert_eq!(
            from_text_before_table(text, None),
            vec![1950.0, 12345.5, 2000.0]
        );
    }

    #[test]
    fn text_before_table_bare_integers() {
        let text = "Strike 70 75 80 75 price 12.50 v2.0 7 123456789\n| Calls | Puts |\n| 85 |";
        assert_eq!(discover_strikes(text, None), vec![70.0, 75.0, 80.0]);
    }

    #[test]
    fn query_parameter_fallback() {
        assert_eq!(from_query_parameter("?view=strikes&strike=72.5", None), vec![72.5]);
        let text = "| Calls | Puts |\nsee ?view=strikes&strike=72,5";
        assert_eq!(discover_strikes(text, None), vec![72.5]);
    }

    #[test]
    fn nothing_found() {
        assert!(discover_strikes("| Calls | Puts |", None).is_empty());
        assert!(discover_strikes("", Some("<div></div>")).is_empty());
    }
}
