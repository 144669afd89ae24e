// Flat tabular form of the corpus.
//
// Minimal CSV: fields quoted only when they contain the separator, a quote or
// a line break; embedded quotes doubled. The parser accepts CRLF and quoted
// newlines, which speech text does contain.

use std::io::{self, Write};
use std::mem::take;

use hansard_common::ClassifiedQuote;

pub const HEADER: [&str; 11] = [
    "date",
    "house",
    "debate_title",
    "member",
    "party",
    "quote",
    "hansard_url",
    "json_url",
    "frame",
    "confidence",
    "analysis",
];

/// One CSV row for a record, in `HEADER` order.
pub fn quote_row(q: &ClassifiedQuote) -> Vec<String> {
    let c = &q.candidate;
    vec![
        c.date.format("%Y-%m-%d").to_string(),
        c.house.to_string(),
        c.debate_title.clone(),
        c.member.clone(),
        c.party.clone().unwrap_or_default(),
        c.quote.clone(),
        c.hansard_url.clone(),
        c.json_url.clone(),
        q.frame.to_string(),
        q.confidence.to_string(),
        q.analysis.clone().unwrap_or_default(),
    ]
}

pub fn header_row() -> Vec<String> {
    HEADER.iter().map(|h| h.to_string()).collect()
}

fn needs_quotes(field: &str, sep: char) -> bool {
    field.contains(sep) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

pub fn write_row<W: Write>(mut w: W, row: &[String], sep: char) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{sep}")?;
        } else {
            first = false;
        }
        if needs_quotes(cell, sep) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{cell}")?;
        }
    }
    writeln!(w)
}

/// Parse CSV text into rows. Blank lines are dropped.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                flush_row(&mut rows, &mut row);
            }
            _ => field.push(ch),
        }
    }

    row.push(field);
    flush_row(&mut rows, &mut row);
    rows
}

fn flush_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>) {
    if row.len() == 1 && row[0].is_empty() {
        row.clear();
    } else if !row.is_empty() {
        rows.push(take(row));
    }
}
