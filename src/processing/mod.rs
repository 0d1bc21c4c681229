use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::processing::cleaner::TextExtractor;
use crate::processing::embedding::Embedder;
use crate::processing::ingest::{IngestError, IngestSettings, ingest_csv};
use crate::processing::similarity::SimilarityAggregator;
use crate::repository::{DocumentReader, DocumentWriter};

pub mod bucket;
pub mod canonical;
pub mod cleaner;
pub mod embedding;
pub mod ingest;
pub mod similarity;

#[derive(Deserialize, Debug, PartialEq)]
pub enum ZMQMessage {
    /// Ingest the CSV file at the given path.
    Ingest(PathBuf),
    /// Ingest the configured default input file.
    IngestDefault,
    Similarity(SimilarityQuery),
    Jurisdictions,
}

#[derive(Deserialize, Debug, PartialEq)]
pub struct SimilarityQuery {
    pub country_a: String,
    pub country_b: String,
    #[serde(default)]
    pub ontology_id: Option<String>,
}

/// Status-coded JSON reply sent back over the socket.
#[derive(Serialize, Debug, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    pub fn ok<T: Serialize>(body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(e) => Self::error(500, format!("Failed to encode reply: {e}")),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::error(404, detail)
    }

    pub fn error(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": detail.into() }),
        }
    }
}

pub fn process_similarity_message<R>(query: &SimilarityQuery, repo: &R) -> Reply
where
    R: DocumentReader + ?Sized,
{
    log::info!("Received similarity query: {query:?}");

    let aggregator = SimilarityAggregator::new(repo);
    match aggregator.compute(
        &query.country_a,
        &query.country_b,
        query.ontology_id.as_deref(),
    ) {
        Ok(series) if series.is_empty() => Reply::not_found(format!(
            "No similarity data found for {} and {}",
            query.country_a, query.country_b
        )),
        Ok(series) => Reply::ok(&series),
        Err(e) => {
            log::error!("Error in similarity analysis: {e}");
            Reply::error(500, e.to_string())
        }
    }
}

pub fn process_jurisdictions_message<R>(repo: &R) -> Reply
where
    R: DocumentReader + ?Sized,
{
    match SimilarityAggregator::new(repo).jurisdictions() {
        Ok(jurisdictions) if jurisdictions.is_empty() => {
            Reply::not_found("No jurisdictions found in the database.")
        }
        Ok(jurisdictions) => Reply::ok(&json!({ "jurisdictions": jurisdictions })),
        Err(e) => {
            log::error!("Failed to list jurisdictions: {e}");
            Reply::error(500, e.to_string())
        }
    }
}

pub fn process_ingest_message<X, E, W>(
    path: &Path,
    extractor: &X,
    embedder: &mut E,
    repo: &W,
    settings: IngestSettings,
) -> Reply
where
    X: TextExtractor + ?Sized,
    E: Embedder + ?Sized,
    W: DocumentWriter + ?Sized,
{
    log::info!("Received ingestion request for {}", path.display());

    match ingest_csv(path, extractor, embedder, repo, settings) {
        Ok(stats) => Reply::ok(&stats),
        Err(aborted) => {
            let status = match aborted.error {
                IngestError::SourceNotFound { .. } => 404,
                _ => 500,
            };
            Reply {
                status,
                body: json!({
                    "detail": aborted.error.to_string(),
                    "stats": aborted.stats,
                }),
            }
        }
    }
}

/// Dispatches decoded messages to the ingestion pipeline and aggregator,
/// holding the process-wide embedder.
pub struct Worker<'a, X: ?Sized, E: ?Sized, R: ?Sized> {
    pub extractor: &'a X,
    pub embedder: &'a mut E,
    pub repo: &'a R,
    pub settings: IngestSettings,
    pub default_input: PathBuf,
}

impl<X, E, R> Worker<'_, X, E, R>
where
    X: TextExtractor + ?Sized,
    E: Embedder + ?Sized,
    R: DocumentReader + DocumentWriter + ?Sized,
{
    pub fn handle(&mut self, msg: ZMQMessage) -> Reply {
        match msg {
            ZMQMessage::Ingest(path) => process_ingest_message(
                &path,
                self.extractor,
                self.embedder,
                self.repo,
                self.settings,
            ),
            ZMQMessage::IngestDefault => process_ingest_message(
                &self.default_input,
                self.extractor,
                self.embedder,
                self.repo,
                self.settings,
            ),
            ZMQMessage::Similarity(query) => process_similarity_message(&query, self.repo),
            ZMQMessage::Jurisdictions => process_jurisdictions_message(self.repo),
        }
    }

    /// Decode and handle one raw request.
    pub fn handle_bytes(&mut self, msg: &[u8]) -> Reply {
        match serde_json::from_slice::<ZMQMessage>(msg) {
            Ok(parsed) => self.handle(parsed),
            Err(e) => {
                log::error!("Failed to parse JSON: {e}");
                Reply::error(400, format!("Failed to parse request: {e}"))
            }
        }
    }
}
