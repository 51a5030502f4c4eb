use crate::context::RunContext;
use crate::errors::{ClassifierError, FieldParseError, Result};
use crate::link_context::LinkContextFetcher;
use crate::records::FILE_SIZE_COLUMN;
use crate::tokenizer::{tokenize, tokenize_without_noise, url_path};
use crate::types::{DocumentFeatures, DocumentRecord, TokenFamily, TokenSet};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::info;

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(19|20)\d{2}").unwrap());

/// Human size string to kilobytes.
///
/// The last two characters are the unit. `MB` scales by 1024; any other unit
/// is taken as kilobytes.
pub fn parse_file_size(raw: &str) -> std::result::Result<f64, FieldParseError> {
    let value = raw.trim();
    let split = value
        .char_indices()
        .rev()
        .nth(1)
        .map(|(i, _)| i)
        .ok_or_else(|| FieldParseError::new(FILE_SIZE_COLUMN, raw, "too short to carry a unit"))?;
    let (number, unit) = value.split_at(split);

    let number: f64 = number
        .trim()
        .parse()
        .map_err(|e| FieldParseError::new(FILE_SIZE_COLUMN, raw, format!("{e}")))?;
    if !number.is_finite() || number < 0.0 {
        return Err(FieldParseError::new(
            FILE_SIZE_COLUMN,
            raw,
            "size must be a finite, non-negative number",
        ));
    }

    Ok(if unit == "MB" { number * 1024.0 } else { number })
}

pub fn contains_year(file_name: &str) -> bool {
    YEAR.is_match(file_name)
}

pub fn file_name_tokens(file_name: &str) -> TokenSet {
    tokenize_without_noise(file_name).into_iter().collect()
}

pub fn url_tokens(url: &str) -> TokenSet {
    tokenize_without_noise(url_path(url)).into_iter().collect()
}

pub fn source_tokens(sources: &[String]) -> TokenSet {
    sources
        .iter()
        .flat_map(|source| tokenize(url_path(source)))
        .collect()
}

/// Derives per-document token families and scalar features for a batch.
pub struct FeatureExtractor {
    link_context: LinkContextFetcher,
}

impl FeatureExtractor {
    pub fn new(link_context: LinkContextFetcher) -> Self {
        Self { link_context }
    }

    pub fn link_context(&self) -> &LinkContextFetcher {
        &self.link_context
    }

    /// Extract features for every record, in input order.
    ///
    /// Scalars are validated for the whole batch before any page is fetched;
    /// one malformed `file_size` fails the batch.
    pub fn extract(
        &self,
        records: &[DocumentRecord],
        ctx: &RunContext,
    ) -> Result<Vec<DocumentFeatures>> {
        let sizes = records
            .iter()
            .map(|record| {
                parse_file_size(&record.file_size).map_err(|e| ClassifierError::parse(record.row, e))
            })
            .collect::<Result<Vec<f64>>>()?;

        let link_context = self.link_context.collect(records, ctx);
        if link_context.len() != records.len() {
            return Err(ClassifierError::Invariant(format!(
                "link context for {} of {} documents",
                link_context.len(),
                records.len()
            )));
        }

        let features: Vec<DocumentFeatures> = records
            .iter()
            .zip(sizes)
            .zip(link_context)
            .map(|((record, file_size_numeric), url_text)| {
                let mut tokens = BTreeMap::new();
                tokens.insert(TokenFamily::FileName, file_name_tokens(&record.file_name));
                tokens.insert(TokenFamily::Source, source_tokens(&record.source_list));
                tokens.insert(TokenFamily::Url, url_tokens(&record.url));
                tokens.insert(TokenFamily::UrlText, url_text);

                DocumentFeatures {
                    row: record.row,
                    tokens,
                    file_size_numeric,
                    number_of_pages: record.number_of_pages,
                    file_name_contains_year: contains_year(&record.file_name),
                }
            })
            .collect();

        let with_context = features
            .iter()
            .filter(|f| f.family(TokenFamily::UrlText).is_some_and(|t| !t.is_empty()))
            .count();
        info!(
            "Extracted features for {} documents ({} with link context)",
            features.len(),
            with_context
        );

        Ok(features)
    }
}
