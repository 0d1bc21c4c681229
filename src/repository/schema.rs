diesel::table! {
    reginsights_clean (doc_id) {
        doc_id -> Text,
        jurisdiction -> Text,
        ontology_id -> Text,
        concept_names -> Nullable<Text>,
        time_bucket -> Text,
        published_date -> Date,
        title -> Text,
        clean_text -> Text,
        department -> Nullable<Text>,
        issuing_body -> Nullable<Text>,
        issuance_type -> Nullable<Text>,
        status -> Nullable<Text>,
        source_url -> Nullable<Text>,
        embedding -> Nullable<Binary>,
        updated_at -> Timestamp,
    }
}

/// DDL applied when a pool is established. Safe to run repeatedly.
pub const CREATE_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS reginsights_clean (
    doc_id TEXT PRIMARY KEY NOT NULL,
    jurisdiction TEXT NOT NULL,
    ontology_id TEXT NOT NULL,
    concept_names TEXT,
    time_bucket TEXT NOT NULL,
    published_date DATE NOT NULL,
    title TEXT NOT NULL,
    clean_text TEXT NOT NULL,
    department TEXT,
    issuing_body TEXT,
    issuance_type TEXT,
    status TEXT,
    source_url TEXT,
    embedding BLOB,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_reginsights_jurisdiction_bucket
    ON reginsights_clean (jurisdiction, time_bucket);
CREATE INDEX IF NOT EXISTS idx_reginsights_ontology
    ON reginsights_clean (ontology_id);
"#;
