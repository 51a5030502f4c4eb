use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ===== INPUT =====

/// One input row describing a downloaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// 0-based data row index; identity of this document through every stage
    pub row: usize,
    pub url: String,
    /// Empty when the input cell was absent
    pub file_name: String,
    /// Page URLs claiming to link to this document, in input order
    pub source_list: Vec<String>,
    /// Human size string such as "512KB" or "2MB"; parsed by the extractor
    pub file_size: String,
    pub number_of_pages: u32,
}

// ===== FEATURES =====

/// Unordered set of normalized tokens.
pub type TokenSet = BTreeSet<String>;

/// The four lexical feature families. Family identity survives into the
/// matrix through the column prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFamily {
    FileName,
    Source,
    Url,
    UrlText,
}

impl TokenFamily {
    pub const ALL: [TokenFamily; 4] = [
        TokenFamily::FileName,
        TokenFamily::Source,
        TokenFamily::Url,
        TokenFamily::UrlText,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            TokenFamily::FileName => "file_name_keywords",
            TokenFamily::Source => "source_keywords",
            TokenFamily::Url => "url_keywords",
            TokenFamily::UrlText => "url_text_keywords",
        }
    }

    pub fn column_prefix(&self) -> &'static str {
        match self {
            TokenFamily::FileName => "file_",
            TokenFamily::Source => "source_",
            TokenFamily::Url => "url_",
            TokenFamily::UrlText => "url_text_",
        }
    }

    /// Whether the literal "pdf" is dropped as a noise term for this family
    pub fn excludes_noise(&self) -> bool {
        matches!(self, TokenFamily::FileName | TokenFamily::Url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarFeature {
    FileSizeNumeric,
    NumberOfPages,
    FileNameContainsYear,
}

impl ScalarFeature {
    pub const ALL: [ScalarFeature; 3] = [
        ScalarFeature::FileSizeNumeric,
        ScalarFeature::NumberOfPages,
        ScalarFeature::FileNameContainsYear,
    ];

    pub fn column_name(&self) -> &'static str {
        match self {
            ScalarFeature::FileSizeNumeric => "file_size_numeric",
            ScalarFeature::NumberOfPages => "number_of_pages",
            ScalarFeature::FileNameContainsYear => "file_name_contains_year",
        }
    }
}

/// Typed column identity. Only turned into a string when the matrix is built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKey {
    Token { family: TokenFamily, token: String },
    Scalar(ScalarFeature),
}

impl FeatureKey {
    pub fn token(family: TokenFamily, token: impl Into<String>) -> Self {
        FeatureKey::Token {
            family,
            token: token.into(),
        }
    }

    pub fn column_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKey::Token { family, token } => {
                write!(f, "{}{}", family.column_prefix(), token)
            }
            FeatureKey::Scalar(scalar) => f.write_str(scalar.column_name()),
        }
    }
}

/// Derived features for one document, keyed by the record's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentFeatures {
    pub row: usize,
    pub tokens: BTreeMap<TokenFamily, TokenSet>,
    /// Kilobytes
    pub file_size_numeric: f64,
    pub number_of_pages: u32,
    pub file_name_contains_year: bool,
}

impl DocumentFeatures {
    pub fn family(&self, family: TokenFamily) -> Option<&TokenSet> {
        self.tokens.get(&family)
    }

    pub fn scalar(&self, scalar: ScalarFeature) -> f32 {
        match scalar {
            ScalarFeature::FileSizeNumeric => self.file_size_numeric as f32,
            ScalarFeature::NumberOfPages => self.number_of_pages as f32,
            ScalarFeature::FileNameContainsYear => {
                if self.file_name_contains_year {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

// ===== PREDICTIONS =====

/// Closed category taxonomy, in model class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentCategory {
    Letter,
    Agenda,
    Memo,
    Notice,
    Flyer,
    Other,
    Report,
    Procurement,
    Press,
    Slides,
    #[serde(rename = "Job Announcement")]
    JobAnnouncement,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 11] = [
        DocumentCategory::Letter,
        DocumentCategory::Agenda,
        DocumentCategory::Memo,
        DocumentCategory::Notice,
        DocumentCategory::Flyer,
        DocumentCategory::Other,
        DocumentCategory::Report,
        DocumentCategory::Procurement,
        DocumentCategory::Press,
        DocumentCategory::Slides,
        DocumentCategory::JobAnnouncement,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::Letter => "Letter",
            DocumentCategory::Agenda => "Agenda",
            DocumentCategory::Memo => "Memo",
            DocumentCategory::Notice => "Notice",
            DocumentCategory::Flyer => "Flyer",
            DocumentCategory::Other => "Other",
            DocumentCategory::Report => "Report",
            DocumentCategory::Procurement => "Procurement",
            DocumentCategory::Press => "Press",
            DocumentCategory::Slides => "Slides",
            DocumentCategory::JobAnnouncement => "Job Announcement",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub row: usize,
    pub label: DocumentCategory,
    /// Probability the model assigned to `label`
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_prefixes_keep_identical_tokens_apart() {
        let names: BTreeSet<String> = TokenFamily::ALL
            .iter()
            .map(|family| FeatureKey::token(*family, "agenda").column_name())
            .collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains("file_agenda"));
        assert!(names.contains("url_text_agenda"));
    }

    #[test]
    fn test_url_and_url_text_prefixes_do_not_collide() {
        // "url_" + "textbook" vs "url_text_" + "book"
        let url = FeatureKey::token(TokenFamily::Url, "textbook").column_name();
        let url_text = FeatureKey::token(TokenFamily::UrlText, "book").column_name();
        assert_ne!(url, url_text);
    }

    #[test]
    fn test_category_index_mapping() {
        assert_eq!(DocumentCategory::from_index(0), Some(DocumentCategory::Letter));
        assert_eq!(DocumentCategory::from_index(1), Some(DocumentCategory::Agenda));
        assert_eq!(
            DocumentCategory::from_index(10).map(|c| c.label()),
            Some("Job Announcement")
        );
        assert_eq!(DocumentCategory::from_index(11), None);
    }

    #[test]
    fn test_scalar_year_flag_is_binary() {
        let features = DocumentFeatures {
            row: 0,
            tokens: BTreeMap::new(),
            file_size_numeric: 150.0,
            number_of_pages: 3,
            file_name_contains_year: true,
        };
        assert_eq!(features.scalar(ScalarFeature::FileNameContainsYear), 1.0);
        assert_eq!(features.scalar(ScalarFeature::NumberOfPages), 3.0);
        assert_eq!(features.scalar(ScalarFeature::FileSizeNumeric), 150.0);
    }
}
