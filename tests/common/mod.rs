//! Helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;

use reginsight_convergence::db::{DbPool, establish_connection_pool};
use reginsight_convergence::domain::document::RawRecord;
use reginsight_convergence::processing::embedding::{Embedder, EmbeddingError, normalize_embedding};
use reginsight_convergence::repository::DieselRepository;
use tempfile::TempDir;

/// Temporary database used in integration tests.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir.");
        let path = dir.path().join("test.db");
        let pool = establish_connection_pool(path.to_str().expect("utf-8 temp path"))
            .expect("Failed to establish SQLite connection.");
        TestDb { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn repo(&self) -> DieselRepository {
        DieselRepository::new(self.pool())
    }
}

/// Deterministic letter-frequency embedder; counts every call.
#[derive(Default)]
pub struct StubEmbedder {
    pub calls: usize,
}

impl Embedder for StubEmbedder {
    fn encode(&mut self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls += 1;
        let mut counts = vec![0.0_f32; 26];
        for c in text.chars().filter(char::is_ascii_alphabetic) {
            counts[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
        }
        Ok(normalize_embedding(&counts))
    }
}

pub fn raw_row(fields: &[(&str, &str)]) -> RawRecord {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>()
}

/// A CUBE export row with the given identity, jurisdiction, date and body.
pub fn cube_row(doc_id: &str, jurisdiction: &str, date: &str, text: &str) -> RawRecord {
    raw_row(&[
        ("RegInsightDocumentId", doc_id),
        ("CUBEJurisdiction", jurisdiction),
        ("CUBEIssuingBody", "Regulator"),
        ("CUBEPublishedDate", date),
        ("RegOntologyId", "ONT-1"),
        ("RegInsightTextNative", text),
        ("RegInsightTitleNative", "Guidance note"),
    ])
}

/// Markup-wrapped body whose cleaned length is at least `chars`.
pub fn body_of(word: &str, chars: usize) -> String {
    let unit = format!("{word} ");
    format!("<p>{}</p>", unit.repeat(chars / unit.len() + 1))
}
