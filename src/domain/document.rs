use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

/// One untyped input line: source column name to raw string value.
pub type RawRecord = HashMap<String, String>;

/// Validated, cleaned and schema-normalised representation of one input row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CanonicalDocument {
    pub doc_id: String,
    pub jurisdiction: String,
    pub ontology_id: String,
    pub concept_names: Option<String>,
    pub published_date: NaiveDate,
    pub title: String,
    pub clean_text: String,
    pub department: Option<String>,
    pub issuing_body: Option<String>,
    pub issuance_type: Option<String>,
    pub status: Option<String>,
    pub source_url: Option<String>,
}

/// Row that passed field validation but whose native text is not yet cleaned.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedRecord {
    /// Canonical fields; `clean_text` stays empty until [`Self::into_document`].
    pub document: CanonicalDocument,
    pub text_native: String,
}

impl ValidatedRecord {
    pub fn into_document(self, clean_text: String) -> CanonicalDocument {
        CanonicalDocument {
            clean_text,
            ..self.document
        }
    }
}

/// A canonical document that passed the length gate and carries its bucket and
/// embedding, ready to be upserted.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddedDocument {
    pub document: CanonicalDocument,
    pub time_bucket: String,
    pub embedding: Vec<f32>,
}

/// Embedding row as read back for similarity aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredEmbedding {
    pub jurisdiction: String,
    pub time_bucket: String,
    pub embedding: Vec<f32>,
}

/// Full persisted row, as returned by point lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredDocument {
    pub document: CanonicalDocument,
    pub time_bucket: String,
    pub embedding: Option<Vec<f32>>,
}
