//! Mapping of heterogeneous export columns onto the canonical document schema.

use chrono::NaiveDate;
use html_escape::decode_html_entities;
use thiserror::Error;
use url::Url;

use crate::domain::document::{CanonicalDocument, RawRecord, ValidatedRecord};
use crate::{MAX_TITLE_CHARS, TITLE_TRUNCATED_CHARS};

/// Version of the alias table below. Bump when a column is added or renamed.
pub const SCHEMA_VERSION: u32 = 2;

/// Expected layout of `CUBEPublishedDate`.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid date `{value}`, expected {expected}")]
    InvalidDate {
        value: String,
        expected: &'static str,
    },
}

/// A canonical field and every column name it has been exported under.
struct FieldSpec {
    name: &'static str,
    aliases: &'static [&'static str],
    required: bool,
}

const DOCUMENT_ID: FieldSpec = FieldSpec {
    name: "document_id",
    aliases: &["RegInsightDocumentId", "doc_id"],
    required: true,
};
const JURISDICTION: FieldSpec = FieldSpec {
    name: "jurisdiction",
    aliases: &["CUBEJurisdiction"],
    required: true,
};
const ISSUING_BODY: FieldSpec = FieldSpec {
    name: "issuing_body",
    aliases: &["CUBEIssuingBody"],
    required: true,
};
const PUBLISHED_DATE: FieldSpec = FieldSpec {
    name: "published_date",
    aliases: &["CUBEPublishedDate"],
    required: true,
};
const ONTOLOGY_ID: FieldSpec = FieldSpec {
    name: "ontology_id",
    aliases: &["RegOntologyId"],
    required: true,
};
const TEXT_NATIVE: FieldSpec = FieldSpec {
    name: "text_native",
    aliases: &["RegInsightTextNative"],
    required: true,
};
const TITLE: FieldSpec = FieldSpec {
    name: "title",
    aliases: &["RegInsightTitleNative"],
    required: false,
};
const DEPARTMENT: FieldSpec = FieldSpec {
    name: "department",
    aliases: &["CUBEIssuingDepartment"],
    required: false,
};
const ISSUANCE_TYPE: FieldSpec = FieldSpec {
    name: "issuance_type",
    aliases: &["IssuanceType"],
    required: false,
};
const STATUS: FieldSpec = FieldSpec {
    name: "status",
    aliases: &["Status"],
    required: false,
};
const SOURCE_URL: FieldSpec = FieldSpec {
    name: "source_url",
    aliases: &["RegInsightSourceLink"],
    required: false,
};
const CONCEPT_NAMES: FieldSpec = FieldSpec {
    name: "concept_names",
    aliases: &["RegOntologyConceptNames"],
    required: false,
};

/// First non-blank value found under the canonical name or any alias, trimmed.
fn lookup(record: &RawRecord, field: &FieldSpec) -> Option<String> {
    std::iter::once(field.name)
        .chain(field.aliases.iter().copied())
        .filter_map(|key| record.get(key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn required(record: &RawRecord, field: &FieldSpec) -> Result<String, RecordError> {
    debug_assert!(field.required);
    lookup(record, field).ok_or(RecordError::MissingField(field.name))
}

fn optional(record: &RawRecord, field: &FieldSpec) -> Option<String> {
    lookup(record, field)
}

/// Parse `MM/DD/YYYY`, ignoring a trailing time component when present.
pub fn parse_published_date(value: &str) -> Result<NaiveDate, RecordError> {
    let date_part = value.split_whitespace().next().unwrap_or_default();
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).map_err(|_| RecordError::InvalidDate {
        value: value.to_string(),
        expected: "MM/DD/YYYY",
    })
}

/// Collapse whitespace, decode entities and bound the title length.
///
/// Titles longer than [`MAX_TITLE_CHARS`] keep their first
/// [`TITLE_TRUNCATED_CHARS`] characters followed by `...`.
pub fn normalize_title(raw: &str) -> String {
    let decoded = decode_html_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_TITLE_CHARS {
        let mut truncated: String = collapsed.chars().take(TITLE_TRUNCATED_CHARS).collect();
        truncated.push_str("...");
        truncated
    } else {
        collapsed
    }
}

fn normalize_source_url(doc_id: &str, raw: String) -> Option<String> {
    match Url::parse(&raw) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            log::warn!("Dropping invalid source link for {doc_id}: {raw} ({e})");
            None
        }
    }
}

/// Validate a raw row and map it onto the canonical schema.
///
/// The native text is returned untouched alongside the canonical fields so the
/// cleaner can run on it next.
pub fn canonicalize(record: &RawRecord) -> Result<ValidatedRecord, RecordError> {
    let doc_id = required(record, &DOCUMENT_ID)?;
    let jurisdiction = required(record, &JURISDICTION)?;
    let issuing_body = required(record, &ISSUING_BODY)?;
    let published_date = parse_published_date(&required(record, &PUBLISHED_DATE)?)?;
    let ontology_id = required(record, &ONTOLOGY_ID)?;
    let text_native = required(record, &TEXT_NATIVE)?;

    let title = optional(record, &TITLE)
        .map(|title| normalize_title(&title))
        .unwrap_or_default();
    let source_url =
        optional(record, &SOURCE_URL).and_then(|url| normalize_source_url(&doc_id, url));

    Ok(ValidatedRecord {
        document: CanonicalDocument {
            jurisdiction,
            ontology_id,
            concept_names: optional(record, &CONCEPT_NAMES),
            published_date,
            title,
            clean_text: String::new(),
            department: optional(record, &DEPARTMENT),
            issuing_body: Some(issuing_body),
            issuance_type: optional(record, &ISSUANCE_TYPE),
            status: optional(record, &STATUS),
            source_url,
            doc_id,
        },
        text_native,
    })
}
