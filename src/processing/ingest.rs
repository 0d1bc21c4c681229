//! Sequential ingestion pass: validate, clean, gate, bucket, embed, upsert.
//!
//! Each row moves through `Reading -> Validated -> Cleaned -> Embedded ->
//! Buffered -> Flushed`, or leaves early as a counted skip. Only a source I/O
//! fault or a failed batch write ends the run; batches flushed before that
//! stay persisted.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

use crate::domain::document::{EmbeddedDocument, RawRecord};
use crate::processing::bucket::TimeBucketer;
use crate::processing::canonical::{SCHEMA_VERSION, canonicalize};
use crate::processing::cleaner::{TextExtractor, clean_text, passes_length_gate};
use crate::processing::embedding::Embedder;
use crate::repository::DocumentWriter;
use crate::repository::errors::{RepositoryError, RepositoryResult};
use crate::{BATCH_SIZE, MIN_CHARS};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input source not found: {}", path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed reading input source: {0}")]
    Source(#[from] csv::Error),
    #[error("failed to persist batch: {0}")]
    Persistence(#[from] RepositoryError),
}

/// A run that stopped early, with the counts reached before the failure.
#[derive(Debug, Error)]
#[error("ingestion aborted ({stats}): {error}")]
pub struct IngestAborted {
    pub stats: IngestStats,
    #[source]
    pub error: IngestError,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub read: usize,
    pub kept: usize,
    pub persisted: usize,
    pub batches: usize,
    pub skipped_invalid: usize,
    pub skipped_short: usize,
    pub skipped_embedding: usize,
}

impl IngestStats {
    pub fn skipped(&self) -> usize {
        self.skipped_invalid + self.skipped_short + self.skipped_embedding
    }
}

impl Serialize for IngestStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("IngestStats", 8)?;
        state.serialize_field("read", &self.read)?;
        state.serialize_field("kept", &self.kept)?;
        state.serialize_field("skipped", &self.skipped())?;
        state.serialize_field("persisted", &self.persisted)?;
        state.serialize_field("batches", &self.batches)?;
        state.serialize_field("skipped_invalid", &self.skipped_invalid)?;
        state.serialize_field("skipped_short", &self.skipped_short)?;
        state.serialize_field("skipped_embedding", &self.skipped_embedding)?;
        state.end()
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kept={}, skipped={}, persisted={}",
            self.kept,
            self.skipped(),
            self.persisted
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Invalid,
    TooShort,
    EmbeddingFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RowOutcome {
    Buffered,
    Skipped(SkipReason),
}

#[derive(Clone, Copy, Debug)]
pub struct IngestSettings {
    pub batch_size: usize,
    pub min_chars: usize,
    pub bucketer: TimeBucketer,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            min_chars: MIN_CHARS,
            bucketer: TimeBucketer::default(),
        }
    }
}

/// Buffers embedded documents and writes them in fixed-size batches.
pub struct BatchUpserter<'a, W: ?Sized> {
    writer: &'a W,
    batch_size: usize,
    buffer: Vec<EmbeddedDocument>,
}

impl<'a, W> BatchUpserter<'a, W>
where
    W: DocumentWriter + ?Sized,
{
    pub fn new(writer: &'a W, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            writer,
            batch_size,
            buffer: Vec::with_capacity(batch_size),
        }
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer one document, flushing when the batch is full. Returns the
    /// number of rows written by that flush, if one happened.
    pub fn push(&mut self, document: EmbeddedDocument) -> RepositoryResult<Option<usize>> {
        self.buffer.push(document);
        if self.buffer.len() >= self.batch_size {
            self.flush().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Write everything buffered as one atomic batch. A failed write keeps
    /// the buffer intact.
    pub fn flush(&mut self) -> RepositoryResult<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        self.writer.upsert_documents(&self.buffer)?;
        let written = self.buffer.len();
        self.buffer.clear();
        Ok(written)
    }
}

/// One ingestion run over a row source.
pub struct Ingestor<'a, X: ?Sized, E: ?Sized, W: ?Sized> {
    extractor: &'a X,
    embedder: &'a mut E,
    upserter: BatchUpserter<'a, W>,
    settings: IngestSettings,
    stats: IngestStats,
}

impl<'a, X, E, W> Ingestor<'a, X, E, W>
where
    X: TextExtractor + ?Sized,
    E: Embedder + ?Sized,
    W: DocumentWriter + ?Sized,
{
    pub fn new(
        extractor: &'a X,
        embedder: &'a mut E,
        writer: &'a W,
        settings: IngestSettings,
    ) -> Self {
        Self {
            extractor,
            embedder,
            upserter: BatchUpserter::new(writer, settings.batch_size),
            settings,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    fn record_flush(&mut self, written: usize, final_batch: bool) {
        if written == 0 {
            return;
        }
        self.stats.persisted += written;
        self.stats.batches += 1;
        log::info!(
            "Inserted {}batch of {written} rows (total kept: {}, skipped: {})",
            if final_batch { "final " } else { "" },
            self.stats.kept,
            self.stats.skipped()
        );
    }

    /// Move a single row through the pipeline. Row-level problems are counted
    /// and reported as [`RowOutcome::Skipped`]; only a failed batch write is
    /// returned as an error.
    pub fn process_record(&mut self, record: &RawRecord) -> RepositoryResult<RowOutcome> {
        let validated = match canonicalize(record) {
            Ok(validated) => validated,
            Err(e) => {
                log::warn!("Validation error: {e} for row {}", self.stats.read);
                self.stats.skipped_invalid += 1;
                return Ok(RowOutcome::Skipped(SkipReason::Invalid));
            }
        };

        let cleaned = clean_text(self.extractor, &validated.text_native);
        if !passes_length_gate(&cleaned, self.settings.min_chars) {
            log::debug!(
                "Skipping short text (length: {}, doc_id: {})",
                cleaned.chars().count(),
                validated.document.doc_id
            );
            self.stats.skipped_short += 1;
            return Ok(RowOutcome::Skipped(SkipReason::TooShort));
        }

        let document = validated.into_document(cleaned);
        let time_bucket = self.settings.bucketer.label(document.published_date);

        let embedding = match self.embedder.encode(&document.clean_text) {
            Ok(embedding) => embedding,
            Err(e) => {
                log::error!("Dropping {}: {e}", document.doc_id);
                self.stats.skipped_embedding += 1;
                return Ok(RowOutcome::Skipped(SkipReason::EmbeddingFailed));
            }
        };

        self.stats.kept += 1;
        let flushed = self.upserter.push(EmbeddedDocument {
            document,
            time_bucket,
            embedding,
        })?;
        if let Some(written) = flushed {
            self.record_flush(written, false);
        }

        Ok(RowOutcome::Buffered)
    }

    fn abort(mut self, error: IngestError) -> IngestAborted {
        if matches!(error, IngestError::Source(_)) && self.upserter.pending() > 0 {
            match self.upserter.flush() {
                Ok(written) => self.record_flush(written, true),
                Err(e) => log::error!("Failed to flush buffered rows after source error: {e}"),
            }
        }
        log::error!("Ingestion aborted: {error}");
        log_summary(&self.stats);
        IngestAborted {
            stats: self.stats,
            error,
        }
    }

    /// Consume `rows` to the end and flush the remainder.
    ///
    /// CSV decoding problems confined to one row are counted as invalid rows;
    /// I/O faults stop the run after flushing what is already buffered.
    pub fn run<I>(mut self, rows: I) -> Result<IngestStats, IngestAborted>
    where
        I: IntoIterator<Item = Result<RawRecord, csv::Error>>,
    {
        log::info!("Starting data ingestion (schema v{SCHEMA_VERSION}).");

        for row in rows {
            self.stats.read += 1;
            let record = match row {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(self.abort(e.into())),
                Err(e) => {
                    log::warn!("Validation error: {e} for row {}", self.stats.read);
                    self.stats.skipped_invalid += 1;
                    continue;
                }
            };

            if let Err(e) = self.process_record(&record) {
                return Err(self.abort(e.into()));
            }
        }

        match self.upserter.flush() {
            Ok(written) => self.record_flush(written, true),
            Err(e) => return Err(self.abort(e.into())),
        }

        log_summary(&self.stats);
        Ok(self.stats)
    }
}

fn log_summary(stats: &IngestStats) {
    log::info!(
        "Ingestion completed. Total rows kept: {}, total rows skipped: {} (invalid: {}, short: {}, embedding: {}), persisted: {} in {} batches",
        stats.kept,
        stats.skipped(),
        stats.skipped_invalid,
        stats.skipped_short,
        stats.skipped_embedding,
        stats.persisted,
        stats.batches
    );
}

/// Open a header-led CSV file as a lazy sequence of raw records.
pub fn open_csv_source(
    path: &Path,
) -> Result<impl Iterator<Item = Result<RawRecord, csv::Error>> + use<>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::SourceNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::Reader::from_reader(file).into_deserialize::<RawRecord>())
}

/// Ingest a CSV file end to end.
pub fn ingest_csv<X, E, W>(
    path: &Path,
    extractor: &X,
    embedder: &mut E,
    writer: &W,
    settings: IngestSettings,
) -> Result<IngestStats, IngestAborted>
where
    X: TextExtractor + ?Sized,
    E: Embedder + ?Sized,
    W: DocumentWriter + ?Sized,
{
    let rows = match open_csv_source(path) {
        Ok(rows) => rows,
        Err(error) => {
            log::error!("{error}");
            return Err(IngestAborted {
                stats: IngestStats::default(),
                error,
            });
        }
    };

    Ingestor::new(extractor, embedder, writer, settings).run(rows)
}
