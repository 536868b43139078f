//! Delimited record parsing and canonical record-file rendering.
//!
//! Input files come from several hands (spreadsheet exports, the desktop
//! editor, manual edits), so the reader is tolerant: the delimiter is sniffed
//! between `,` and `;`, headers are matched against alias lists, and broken
//! rows are skipped instead of failing the document.

use std::io;

use tracing::{debug, warn};

use crate::constants::parser::{
    CANDIDATE_DELIMITERS, CANONICAL_HEADER, COMPANY_ALIASES, DUE_DATE_ALIASES,
    FALLBACK_DELIMITER, SNIFF_SAMPLE_BYTES, SNIFF_SAMPLE_LINES,
};
use crate::data::ClientRecord;
use crate::dates::normalize_to_iso;
use crate::errors::WatchError;

const UTF8_BOM: char = '\u{feff}';

/// Decode raw bytes and parse them into client records.
///
/// A leading UTF-8 BOM is ignored. Invalid UTF-8 fails the whole document.
pub fn parse_record_bytes(bytes: &[u8]) -> Result<Vec<ClientRecord>, WatchError> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        WatchError::Parse(format!("record document is not valid UTF-8: {err}"))
    })?;
    parse_records(text)
}

/// Parse delimited text into client records.
///
/// Rows with an empty company are dropped silently; the due date is not
/// validated here.
pub fn parse_records(text: &str) -> Result<Vec<ClientRecord>, WatchError> {
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| WatchError::Parse(format!("unreadable header row: {err}")))?
        .clone();
    let columns = ColumnMap::from_headers(headers.iter());
    if columns.company.is_empty() {
        warn!(
            "[license-watch:parser] no company column found among headers {:?}",
            headers.iter().collect::<Vec<_>>()
        );
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for (row_idx, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                debug!("[license-watch:parser] skipping malformed row {}: {err}", row_idx + 1);
                continue;
            }
        };
        let Some(company) = first_non_empty(&row, &columns.company) else {
            continue;
        };
        let due = first_non_empty(&row, &columns.due).unwrap_or_default();
        records.push(ClientRecord::new(company, due));
    }
    Ok(records)
}

/// Pick the field delimiter (`,` or `;`) by sampling a prefix of `text`.
///
/// A candidate is consistent when every sampled line holds the same non-zero
/// number of unquoted occurrences. A single consistent candidate wins; two
/// consistent candidates are separated by their header-line count; otherwise
/// the more frequent candidate wins. Ties fall back to comma.
pub fn sniff_delimiter(text: &str) -> u8 {
    let lines = sample_lines(text);
    if lines.is_empty() {
        return FALLBACK_DELIMITER;
    }
    let counts: Vec<Vec<usize>> = CANDIDATE_DELIMITERS
        .iter()
        .map(|delimiter| {
            lines
                .iter()
                .map(|line| count_unquoted(line, *delimiter))
                .collect()
        })
        .collect();

    let consistent: Vec<usize> = counts
        .iter()
        .enumerate()
        .filter(|(_, per_line)| per_line[0] > 0 && per_line.iter().all(|c| *c == per_line[0]))
        .map(|(idx, _)| idx)
        .collect();

    let winner = match consistent.as_slice() {
        [only] => Some(*only),
        [a, b] => pick_larger(counts[*a][0], *a, counts[*b][0], *b),
        _ => {
            let totals: Vec<usize> = counts.iter().map(|per_line| per_line.iter().sum()).collect();
            pick_larger(totals[0], 0, totals[1], 1)
        }
    };
    winner
        .map(|idx| CANDIDATE_DELIMITERS[idx])
        .unwrap_or(FALLBACK_DELIMITER)
}

/// Render records as the canonical at-rest file: comma-delimited,
/// `empresa,vencimento` header, ISO dates (unparseable values kept verbatim).
pub fn render_records(records: &[ClientRecord]) -> Result<String, WatchError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(CANONICAL_HEADER).map_err(csv_io_error)?;
    for record in records {
        writer
            .write_record([record.company.as_str(), normalize_to_iso(&record.raw_due).as_str()])
            .map_err(csv_io_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| WatchError::Io(io::Error::other(err.to_string())))?;
    String::from_utf8(bytes).map_err(|err| WatchError::Io(io::Error::other(err)))
}

fn csv_io_error(err: csv::Error) -> WatchError {
    WatchError::Io(io::Error::other(err))
}

/// Column indices for each logical field, in alias priority order.
struct ColumnMap {
    company: Vec<usize>,
    due: Vec<usize>,
}

impl ColumnMap {
    fn from_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Self {
        let normalized: Vec<String> = headers
            .map(|header| header.trim_start_matches(UTF8_BOM).trim().to_lowercase())
            .collect();
        let lookup = |aliases: &[&str]| -> Vec<usize> {
            aliases
                .iter()
                .filter_map(|alias| normalized.iter().position(|header| header == alias))
                .collect()
        };
        Self {
            company: lookup(COMPANY_ALIASES),
            due: lookup(DUE_DATE_ALIASES),
        }
    }
}

fn first_non_empty(row: &csv::StringRecord, columns: &[usize]) -> Option<String> {
    columns
        .iter()
        .filter_map(|idx| row.get(*idx))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn sample_lines(text: &str) -> Vec<&str> {
    let mut end = text.len().min(SNIFF_SAMPLE_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let sample = &text[..end];
    let truncated = end < text.len();
    let mut lines: Vec<&str> = sample
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_SAMPLE_LINES)
        .collect();
    // A cut-off final line would skew the per-line counts.
    if truncated && lines.len() > 1 && !sample.ends_with('\n') {
        lines.pop();
    }
    lines
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

fn pick_larger(left: usize, left_idx: usize, right: usize, right_idx: usize) -> Option<usize> {
    match left.cmp(&right) {
        std::cmp::Ordering::Greater => Some(left_idx),
        std::cmp::Ordering::Less => Some(right_idx),
        std::cmp::Ordering::Equal => None,
    }
}
