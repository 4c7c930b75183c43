use std::path::Path;

use crate::error::{AttendanceError, ImportLineError, LineRejection};
use crate::models::Record;
use crate::report::REASON_PLACEHOLDER;
use crate::validate::{validate_form, RawForm};

const MIN_FIELDS: usize = 7;

#[derive(Debug, Default)]
pub struct ImportBatch {
    pub records: Vec<Record>,
    pub rejected: Vec<ImportLineError>,
}

/// What happens to the records already stored when a file is imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    #[default]
    Append,
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: usize,
}

/// Reads an import file without blocking the runtime. A missing file or one
/// that is not UTF-8 text fails the whole import.
pub async fn read_source(path: &Path) -> Result<String, AttendanceError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| malformed(path, e))?;
    let text = String::from_utf8(bytes).map_err(|e| malformed(path, e))?;
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

fn malformed(path: &Path, e: impl std::fmt::Display) -> AttendanceError {
    AttendanceError::MalformedImportSource(format!("{}: {e}", path.display()))
}

/// Splits one CSV line into trimmed fields. A double quote toggles quoting
/// wherever it appears, commas only separate fields outside quotes, and `""`
/// inside quotes is a literal quote.
pub fn parse_line(line: &str) -> Vec<String> {
    let line = tighten_opening_quotes(line);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();

    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(|field| field.trim().to_string()).collect(),
        Ok(false) => Vec::new(),
        Err(e) => {
            log::debug!("Unparseable line {line:?}: {e}");
            Vec::new()
        }
    }
}

// The csv reader only opens a quoted field on the field's first byte, so
// `20, "a, b"` would split inside the quotes. Drop the blanks between a
// separator and an opening quote first.
fn tighten_opening_quotes(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut blanks = String::new();
    let mut in_quotes = false;
    let mut field_start = true;

    for ch in line.chars() {
        if field_start && ch.is_whitespace() {
            blanks.push(ch);
            continue;
        }
        if ch != '"' || !field_start {
            out.push_str(&blanks);
        }
        blanks.clear();
        field_start = false;

        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => field_start = true,
            _ => {}
        }
        out.push(ch);
    }

    out.push_str(&blanks);
    out
}

/// Parses every line after the header. Each line succeeds or fails on its own.
pub fn parse_batch(text: &str) -> ImportBatch {
    let mut batch = ImportBatch::default();

    for (index, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let fields = parse_line(line);
        match parse_row(&fields) {
            Ok(record) => batch.records.push(record),
            Err(reason) => {
                let error = ImportLineError {
                    line: index + 1,
                    reason,
                };
                log::warn!("Skipping import {error}");
                batch.rejected.push(error);
            }
        }
    }

    batch
}

/// Accepts the export layout (frequency at column 8, reason at 9), a reason in
/// column 8, or no reason at all.
fn parse_row(fields: &[String]) -> Result<Record, LineRejection> {
    if fields.len() < MIN_FIELDS {
        return Err(LineRejection::TooFewFields(fields.len()));
    }

    let reason = match fields.len() {
        MIN_FIELDS => "",
        8 => fields[7].as_str(),
        _ => fields[8].as_str(),
    };
    let reason = if reason == REASON_PLACEHOLDER { "" } else { reason };

    let raw = RawForm {
        student_name: fields[0].clone(),
        inep_code: fields[1].clone(),
        class_name: fields[2].clone(),
        month: fields[3].clone(),
        year: fields[4].clone(),
        days_attended: fields[5].clone(),
        total_days: fields[6].clone(),
        reason: reason.to_string(),
    };

    let input = validate_form(&raw)?;
    Ok(Record::create(input))
}
