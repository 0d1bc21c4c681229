//! Diesel row models for `reginsights_clean`.

use bytemuck::cast_slice;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::domain::document::{CanonicalDocument, EmbeddedDocument};
use crate::repository::schema::reginsights_clean;

/// Insert/update payload. `None` is written as NULL so a re-ingested row
/// fully replaces the previous one.
#[derive(Insertable, AsChangeset)]
#[diesel(table_name = reginsights_clean)]
#[diesel(primary_key(doc_id))]
#[diesel(treat_none_as_null = true)]
pub struct NewDocument<'a> {
    pub doc_id: &'a str,
    pub jurisdiction: &'a str,
    pub ontology_id: &'a str,
    pub concept_names: Option<&'a str>,
    pub time_bucket: &'a str,
    pub published_date: NaiveDate,
    pub title: &'a str,
    pub clean_text: &'a str,
    pub department: Option<&'a str>,
    pub issuing_body: Option<&'a str>,
    pub issuance_type: Option<&'a str>,
    pub status: Option<&'a str>,
    pub source_url: Option<&'a str>,
    pub embedding: Option<Vec<u8>>,
    pub updated_at: NaiveDateTime,
}

impl<'a> NewDocument<'a> {
    pub fn from_embedded(item: &'a EmbeddedDocument, updated_at: NaiveDateTime) -> Self {
        let doc = &item.document;
        Self {
            doc_id: &doc.doc_id,
            jurisdiction: &doc.jurisdiction,
            ontology_id: &doc.ontology_id,
            concept_names: doc.concept_names.as_deref(),
            time_bucket: &item.time_bucket,
            published_date: doc.published_date,
            title: &doc.title,
            clean_text: &doc.clean_text,
            department: doc.department.as_deref(),
            issuing_body: doc.issuing_body.as_deref(),
            issuance_type: doc.issuance_type.as_deref(),
            status: doc.status.as_deref(),
            source_url: doc.source_url.as_deref(),
            embedding: Some(cast_slice(item.embedding.as_slice()).to_vec()),
            updated_at,
        }
    }
}

#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = reginsights_clean)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Document {
    pub doc_id: String,
    pub jurisdiction: String,
    pub ontology_id: String,
    pub concept_names: Option<String>,
    pub time_bucket: String,
    pub published_date: NaiveDate,
    pub title: String,
    pub clean_text: String,
    pub department: Option<String>,
    pub issuing_body: Option<String>,
    pub issuance_type: Option<String>,
    pub status: Option<String>,
    pub source_url: Option<String>,
    pub embedding: Option<Vec<u8>>,
    pub updated_at: NaiveDateTime,
}

impl From<Document> for CanonicalDocument {
    fn from(row: Document) -> Self {
        CanonicalDocument {
            doc_id: row.doc_id,
            jurisdiction: row.jurisdiction,
            ontology_id: row.ontology_id,
            concept_names: row.concept_names,
            published_date: row.published_date,
            title: row.title,
            clean_text: row.clean_text,
            department: row.department,
            issuing_body: row.issuing_body,
            issuance_type: row.issuance_type,
            status: row.status,
            source_url: row.source_url,
        }
    }
}
