//! Chain table extraction from the scraped markdown
//!
//! The chain page renders as a pipe table: one header line carrying the
//! `Calls` and `Puts` markers, a column header line, a separator line, then one
//! row per maturity with the call fields, the expiration label, and the put
//! fields mirrored around it.

use tracing::{debug, trace};

use crate::models::{RawOptionRow, SideFields, SIDE_FIELD_COUNT};

/// Cell delimiter that starts every table line
pub const COLUMN_DELIMITER: char = '|';

/// Markers of the line that opens the chain table
pub const TABLE_MARKERS: (&str, &str) = ("Calls", "Puts");

/// Call fields, expiration label, put fields
pub const ROW_CELL_COUNT: usize = 2 * SIDE_FIELD_COUNT + 1;

/// Lines after the marker line that are not data (column header and separator)
const HEADER_LINES: usize = 2;

/// Is this line part of a pipe table? Only lines starting with the delimiter count.
pub fn is_table_line(line: &str) -> bool {
    line.starts_with(COLUMN_DELIMITER)
}

/// Does this line open the chain table?
pub fn is_table_header(line: &str) -> bool {
    is_table_line(line) && line.contains(TABLE_MARKERS.0) && line.contains(TABLE_MARKERS.1)
}

/// Extract one row per maturity from the scraped chain text.
///
/// Lines outside the table are ignored, and so are data lines with fewer than
/// 27 non-empty cells. Unparseable cells become missing fields.
pub fn extract_table(text: &str) -> Vec<RawOptionRow> {
    let mut rows = Vec::new();
    let mut in_table = false;
    let mut line_in_table = 0usize;

    for line in text.lines().filter(|l| is_table_line(l)) {
        if is_table_header(line) {
            in_table = true;
            line_in_table = 0;
            continue;
        }
        if !in_table {
            continue;
        }

        line_in_table += 1;
        if line_in_table <= HEADER_LINES {
            continue;
        }

        match parse_row(line) {
            Some(row) => rows.push(row),
            None => trace!("Skipping malformed chain row: {:?}", line),
        }
    }

    debug!("Extracted {} chain rows", rows.len());
    rows
}

/// Parse one data line; `None` when it has too few cells
pub fn parse_row(line: &str) -> Option<RawOptionRow> {
    let cells: Vec<&str> = line
        .split(COLUMN_DELIMITER)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if cells.len() < ROW_CELL_COUNT {
        return None;
    }

    let call: [&str; SIDE_FIELD_COUNT] = cells[..SIDE_FIELD_COUNT].try_into().ok()?;
    let mut put: [&str; SIDE_FIELD_COUNT] = cells[SIDE_FIELD_COUNT + 1..ROW_CELL_COUNT]
        .try_into()
        .ok()?;
    put.reverse();

    Some(RawOptionRow {
        expiration: dedupe_label(cells[SIDE_FIELD_COUNT]),
        call: SideFields::from_cells(call),
        put: SideFields::from_cells(put),
    })
}

/// Collapse a label the page rendered twice in a row (`12 févr.12 févr.`)
pub fn dedupe_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    let half = chars.len() / 2;
    if half > 0 && chars.len() % 2 == 0 && chars[..half] == chars[half..] {
        chars[..half].iter().collect()
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Options chain for CL1!

| Calls | | | | | | | | | | | | | | Puts |
| IV bid | IV ask | Intr. | Time | Rho | Vega | Theta | Gamma | Delta | Price | Ask | Bid | Vol | Expiration | Vol | Bid | Ask | Price | Delta | Gamma | Theta | Vega | Rho | Time | Intr. | IV ask | IV bid |
| --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- | --- |
| 20,0 | 22,0 | 1,5 | 0,8 | 0,01 | 0,12 | \u{2212}0,03 | 0,002 | 0,55 | 2,3 | 2,35 | 2,25 | 120 | 12 févr. 202612 févr. 2026 | 80 | 1,1 | 1,15 | 1,12 | \u{2212}0,45 | 0,002 | \u{2212}0,02 | 0,11 | \u{2212}0,01 | 1,1 | 0 | 24,0 | 23,0 |
| 19,0 | \u{2014} | 1,5 | 0,8 | 0,01 | 0,12 | \u{2212}0,03 | 0,002 | 0,55 | 2,3 | 2,35 | 2,25 | 120 | 20 mars 2026 | 80 | 1,1 | 1,15 | 1,12 | \u{2212}0,45 | 0,002 | \u{2212}0,02 | 0,11 | \u{2212}0,01 | 1,1 | 0 | 25,0 | 24,0 |
| 1 | 2 | 3 |
";

    #[test]
    fn extracts_rows_after_header() {
        let rows = extract_table(SAMPLE);
        assert_eq!(rows.len(), 2);

        let first = &rows[0];
        assert_eq!(first.expiration, "12 févr. 2026");
        assert_eq!(first.call.bid_iv, Some(20.0));
        assert_eq!(first.call.ask_iv, Some(22.0));
        assert_eq!(first.call.volume, Some(120.0));
        assert_eq!(first.put.volume, Some(80.0));
        assert_eq!(first.put.bid, Some(1.1));
        assert_eq!(first.put.delta, Some(-0.45));
        assert_eq!(first.put.ask_iv, Some(24.0));
        assert_eq!(first.put.bid_iv, Some(23.0));

        let second = &rows[1];
        assert_eq!(second.expiration, "20 mars 2026");
        assert_eq!(second.call.ask_iv, None);
    }

    #[test]
    fn ignores_tables_without_chain_header() {
        let text = "| a | b |\n| --- | --- |\n| 1 | 2 |\n";
        assert!(extract_table(text).is_empty());
        assert!(extract_table("").is_empty());
    }

    #[test]
    fn indented_lines_are_not_table_lines() {
        assert!(is_table_line("| Calls | Puts |"));
        assert!(!is_table_line("  | Calls | Puts |"));

        let indented: String = SAMPLE.lines().map(|l| format!("    {}\n", l)).collect();
        assert!(extract_table(&indented).is_empty());
    }

    #[test]
    fn header_resets_row_counter() {
        let doubled = format!("{}{}", SAMPLE, SAMPLE);
        assert_eq!(extract_table(&doubled).len(), 4);
    }

    #[test]
    fn label_dedupe() {
        assert_eq!(dedupe_label("Mar 20, 2026Mar 20, 2026"), "Mar 20, 2026");
        assert_eq!(dedupe_label("20 mars 2026"), "20 mars 2026");
        assert_eq!(dedupe_label("abab"), "ab");
        assert_eq!(dedupe_label(""), "");
    }
}
