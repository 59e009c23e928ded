//! Delimited table codec for the combined county table
//!
//! Comma separated, UTF-8, header row, quotes only where needed. Nulls are
//! written as empty cells and read back as `None`.

use crate::models::{coerce_count, coerce_measure, MergedRow, COLUMNS};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::mem::take;
use std::path::Path;

const SEP: char = ',';

/* ---------------- Writing ---------------- */

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single row to any writer
pub fn write_row<W: Write>(mut w: W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, "{}", SEP)?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Write a header plus merged rows in canonical column order
pub fn write_rows<W: Write>(mut w: W, rows: &[MergedRow]) -> io::Result<()> {
    let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    write_row(&mut w, &header)?;
    for row in rows {
        let cells: Vec<String> = COLUMNS
            .iter()
            .map(|c| row.cell(c).unwrap_or_default())
            .collect();
        write_row(&mut w, &cells)?;
    }
    Ok(())
}

/// Write an untyped table (header + string rows)
pub fn write_raw<W: Write>(mut w: W, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    write_row(&mut w, header)?;
    for row in rows {
        write_row(&mut w, row)?;
    }
    Ok(())
}

/// Write the combined table to `path`, creating parent directories
pub fn write_table(path: &Path, rows: &[MergedRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    write_rows(&mut out, rows)?;
    out.flush()?;
    Ok(())
}

/// Write an untyped table to `path`, creating parent directories
pub fn write_raw_table(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    ensure_parent(path)?;
    let mut out = BufWriter::new(File::create(path)?);
    write_raw(&mut out, header, rows)?;
    out.flush()?;
    Ok(())
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/* ---------------- Parsing ---------------- */

/// Minimal delimited parser (quotes + CRLF tolerant)
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == SEP && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    // trailing row without a final newline
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

/// Parse a combined table previously written by [`write_rows`]
///
/// Columns are matched by header name; unknown columns are ignored and
/// missing ones read as null (or 0 for counts). `fips_key` is required.
pub fn parse_table(text: &str) -> Result<Vec<MergedRow>> {
    let mut rows = parse_rows(text).into_iter();
    let header = rows.next().ok_or_else(|| Error::Table {
        line: 1,
        message: "missing header row".to_string(),
    })?;

    let index = |name: &str| header.iter().position(|h| h.trim() == name);
    let fips_col = index("fips_key").ok_or_else(|| Error::Table {
        line: 1,
        message: "header has no fips_key column".to_string(),
    })?;
    let cols: Vec<Option<usize>> = COLUMNS.iter().map(|c| index(c)).collect();

    let mut out = Vec::new();
    for (i, cells) in rows.enumerate() {
        let line = i + 2;
        if cells.len() != header.len() {
            return Err(Error::Table {
                line,
                message: format!("expected {} cells, found {}", header.len(), cells.len()),
            });
        }
        let text = |col: usize| cell_at(&cells, cols[col]);
        let measure = |col: usize| coerce_measure(cell_at(&cells, cols[col]));

        out.push(MergedRow {
            fips_key: cells[fips_col].clone(),
            state_abbr: text(1).to_string(),
            state_name: text(2).to_string(),
            county_name: text(3).to_string(),
            population: coerce_count(text(4)),
            median_income: measure(5),
            unemployment_rate: measure(6),
            disaster_count: coerce_count(text(7)),
            obesity_rate: measure(8),
            diabetes_rate: measure(9),
            smoking_rate: measure(10),
            binge_drinking_rate: measure(11),
        });
    }
    Ok(out)
}

fn cell_at(cells: &[String], col: Option<usize>) -> &str {
    col.and_then(|c| cells.get(c)).map(String::as_str).unwrap_or("")
}

/// Read a combined table from disk
pub fn read_table(path: &Path) -> Result<Vec<MergedRow>> {
    let text = fs::read_to_string(path)?;
    parse_table(&text)
}
