//! CSV persistence for the result set.
//!
//! The file is always rewritten in full: every checkpoint and the final save
//! replace the previous contents. Writes go to a sibling temp file first and
//! are renamed into place, so an interrupted run leaves the previous
//! checkpoint intact.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::error::{Result, XsError};
use crate::fetch::Checkpoint;
use crate::model::PostRecord;

/// Column names, in file order.
pub const CSV_HEADERS: [&str; 6] = [
    "tweet_text",
    "tweet_date",
    "tweet_id",
    "tweet_fav_count",
    "retweet_count",
    "sentiment_compound",
];

/// Replace the field separator in post text so it cannot split a row.
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    text.replace(',', " ")
}

/// Quote a field if it contains quotes or line breaks.
fn quote_field(field: &str) -> String {
    if field.contains(['"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render one record as a CSV line (without the trailing newline).
#[must_use]
pub fn format_row(record: &PostRecord) -> String {
    [
        quote_field(&sanitize_text(&record.text)),
        record.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        record.id.to_string(),
        record.favorite_count.to_string(),
        record.retweet_count.to_string(),
        record.sentiment_compound.to_string(),
    ]
    .join(",")
}

/// Write the whole result set to `path`, replacing any previous file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be
/// written or renamed into place.
pub fn write_csv(path: &Path, records: &[PostRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| XsError::path_error("create directory", parent, e))?;
    }

    let tmp = temp_path(path);
    {
        let file = fs::File::create(&tmp).map_err(|e| XsError::path_error("create", &tmp, e))?;
        let mut out = BufWriter::new(file);
        let write_err = |e| XsError::path_error("write", &tmp, e);
        writeln!(out, "{}", CSV_HEADERS.join(",")).map_err(write_err)?;
        for record in records {
            writeln!(out, "{}", format_row(record)).map_err(write_err)?;
        }
        out.flush().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(|e| XsError::path_error("replace", path, e))?;

    debug!(path = %path.display(), rows = records.len(), "Wrote CSV");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Split CSV content into rows of fields, honouring quoted fields.
///
/// Each row carries the 1-based line number it started on.
fn parse_rows(content: &str) -> std::result::Result<Vec<(usize, Vec<String>)>, (usize, String)> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                rows.push((row_start, std::mem::take(&mut fields)));
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err((row_start, "unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        rows.push((row_start, fields));
    }
    Ok(rows)
}

/// Read a result set back from a CSV written by [`write_csv`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, the header does not match
/// [`CSV_HEADERS`], or a row has the wrong shape or unparseable values.
pub fn read_csv(path: &Path) -> Result<Vec<PostRecord>> {
    let content = fs::read_to_string(path).map_err(|e| XsError::path_error("read", path, e))?;
    let rows = parse_rows(&content).map_err(|(line, reason)| XsError::csv(path, line, reason))?;

    let mut rows = rows.into_iter();
    let Some((_, header)) = rows.next() else {
        return Err(XsError::csv(path, 1, "missing header row"));
    };
    if header != CSV_HEADERS {
        return Err(XsError::csv(
            path,
            1,
            format!("expected header '{}'", CSV_HEADERS.join(",")),
        ));
    }

    let mut records = Vec::new();
    for (line, fields) in rows {
        if fields.len() == 1 && fields[0].is_empty() {
            continue;
        }
        records.push(parse_record(path, line, &fields)?);
    }
    info!(path = %path.display(), rows = records.len(), "Loaded CSV");
    Ok(records)
}

fn parse_record(path: &Path, line: usize, fields: &[String]) -> Result<PostRecord> {
    let [text, date, id, fav, rt, compound] = fields else {
        return Err(XsError::csv(
            path,
            line,
            format!("expected {} fields, found {}", CSV_HEADERS.len(), fields.len()),
        ));
    };
    let bad = |column: &str, value: &str| {
        XsError::csv(path, line, format!("invalid {column} '{value}'"))
    };
    Ok(PostRecord {
        text: text.clone(),
        created_at: DateTime::parse_from_rfc3339(date)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| bad("tweet_date", date))?,
        id: id.parse().map_err(|_| bad("tweet_id", id))?,
        favorite_count: fav.parse().map_err(|_| bad("tweet_fav_count", fav))?,
        retweet_count: rt.parse().map_err(|_| bad("retweet_count", rt))?,
        sentiment_compound: compound
            .parse()
            .map_err(|_| bad("sentiment_compound", compound))?,
    })
}

/// Checkpoint sink that rewrites one CSV file.
#[derive(Debug, Clone)]
pub struct CsvCheckpoint {
    path: PathBuf,
}

impl CsvCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Checkpoint for CsvCheckpoint {
    fn save(&mut self, records: &[PostRecord]) -> Result<()> {
        write_csv(&self.path, records)
    }
}
