//! Tabular input and output.
//!
//! The input table must carry a header row with the columns `url`,
//! `file_name`, `source`, `file_size` and `number_of_pages`. Any other
//! columns are kept verbatim and written back out next to the predictions.

use crate::errors::{ClassifierError, FieldParseError, Result};
use crate::types::{DocumentRecord, Prediction};
use csv::StringRecord;
use std::io::{Read, Write};
use std::path::Path;

pub const URL_COLUMN: &str = "url";
pub const FILE_NAME_COLUMN: &str = "file_name";
pub const SOURCE_COLUMN: &str = "source";
pub const FILE_SIZE_COLUMN: &str = "file_size";
pub const PAGES_COLUMN: &str = "number_of_pages";

pub const PREDICTED_CATEGORY_COLUMN: &str = "predicted_category";
pub const PREDICTED_CONFIDENCE_COLUMN: &str = "predicted_category_confidence";

/// Raw rows as read, plus the column positions the pipeline needs.
#[derive(Debug, Clone)]
pub struct InputTable {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    columns: RequiredColumns,
}

#[derive(Debug, Clone, Copy)]
struct RequiredColumns {
    url: usize,
    file_name: usize,
    source: usize,
    file_size: usize,
    pages: usize,
}

impl InputTable {
    pub fn read_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read(file)
    }

    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| ClassifierError::Input(format!("missing required column '{name}'")))
        };
        let columns = RequiredColumns {
            url: column(URL_COLUMN)?,
            file_name: column(FILE_NAME_COLUMN)?,
            source: column(SOURCE_COLUMN)?,
            file_size: column(FILE_SIZE_COLUMN)?,
            pages: column(PAGES_COLUMN)?,
        };

        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            headers,
            rows,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Parse every row into a `DocumentRecord`. The first malformed row aborts.
    pub fn documents(&self) -> Result<Vec<DocumentRecord>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| self.document(row, record))
            .collect()
    }

    fn document(&self, row: usize, record: &StringRecord) -> Result<DocumentRecord> {
        let cell = |index: usize| record.get(index).unwrap_or("");

        let url = cell(self.columns.url).trim();
        if url.is_empty() {
            return Err(ClassifierError::parse(
                row,
                FieldParseError::new(URL_COLUMN, url, "value is required"),
            ));
        }

        let source_list = parse_source_list(cell(self.columns.source))
            .map_err(|e| ClassifierError::parse(row, e))?;
        let number_of_pages = parse_page_count(cell(self.columns.pages))
            .map_err(|e| ClassifierError::parse(row, e))?;

        Ok(DocumentRecord {
            row,
            url: url.to_string(),
            file_name: cell(self.columns.file_name).to_string(),
            source_list,
            file_size: cell(self.columns.file_size).to_string(),
            number_of_pages,
        })
    }

    /// Write the input rows back out with the prediction columns appended.
    pub fn write_predictions<W: Write>(&self, writer: W, predictions: &[Prediction]) -> Result<()> {
        if predictions.len() != self.rows.len() {
            return Err(ClassifierError::Invariant(format!(
                "{} predictions for {} input rows",
                predictions.len(),
                self.rows.len()
            )));
        }

        let mut writer = csv::Writer::from_writer(writer);

        let mut headers = self.headers.clone();
        headers.push_field(PREDICTED_CATEGORY_COLUMN);
        headers.push_field(PREDICTED_CONFIDENCE_COLUMN);
        writer.write_record(&headers)?;

        let mut ordered: Vec<&Prediction> = predictions.iter().collect();
        ordered.sort_by_key(|p| p.row);

        for (row, (record, prediction)) in self.rows.iter().zip(ordered).enumerate() {
            if prediction.row != row {
                return Err(ClassifierError::Invariant(format!(
                    "no prediction for input row {row}"
                )));
            }
            let mut out = record.clone();
            out.push_field(prediction.label.label());
            out.push_field(&prediction.confidence.to_string());
            writer.write_record(&out)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn write_predictions_path(&self, path: &Path, predictions: &[Prediction]) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_predictions(file, predictions)
    }
}

/// Page counts are integers; integral floats such as "3.0" are accepted.
pub fn parse_page_count(raw: &str) -> std::result::Result<u32, FieldParseError> {
    let value = raw.trim();
    if let Ok(pages) = value.parse::<u32>() {
        return Ok(pages);
    }
    match value.parse::<f64>() {
        Ok(pages) if pages.is_finite() && pages >= 0.0 && pages.fract() == 0.0 && pages <= u32::MAX as f64 => {
            Ok(pages as u32)
        }
        _ => Err(FieldParseError::new(
            PAGES_COLUMN,
            raw,
            "expected a non-negative integer",
        )),
    }
}

/// Parse a serialized list of strings.
///
/// Accepts Python-style literals (`['a', "b"]`, single or double quotes,
/// backslash escapes, trailing comma) which also covers JSON string arrays.
pub fn parse_source_list(raw: &str) -> std::result::Result<Vec<String>, FieldParseError> {
    let fail = |reason: &str| FieldParseError::new(SOURCE_COLUMN, raw, reason);

    let mut chars = raw.trim().chars().peekable();
    if chars.next() != Some('[') {
        return Err(fail("expected a list literal starting with '['"));
    }

    let mut items = Vec::new();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        match chars.next() {
            Some(']') => break,
            Some(quote @ ('\'' | '"')) => {
                let mut item = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some('n') => item.push('\n'),
                            Some('t') => item.push('\t'),
                            Some('r') => item.push('\r'),
                            Some(other) => item.push(other),
                            None => return Err(fail("unterminated escape")),
                        },
                        Some(c) if c == quote => break,
                        Some(c) => item.push(c),
                        None => return Err(fail("unterminated string")),
                    }
                }
                items.push(item);

                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
                match chars.next() {
                    Some(',') => continue,
                    Some(']') => break,
                    _ => return Err(fail("expected ',' or ']' after list item")),
                }
            }
            _ => return Err(fail("list items must be quoted strings")),
        }
    }

    if chars.any(|c| !c.is_whitespace()) {
        return Err(fail("trailing characters after list"));
    }
    Ok(items)
}
