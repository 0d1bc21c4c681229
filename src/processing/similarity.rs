//! Per-bucket similarity between the document embeddings of two
//! jurisdictions.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::document::StoredEmbedding;
use crate::domain::similarity::{SimilaritySample, SimilaritySeries, SimilarityStats};
use crate::repository::DocumentReader;
use crate::repository::errors::RepositoryError;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("failed to load embeddings: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cosine similarity of two vectors. Zero-length vectors compare as 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0_f32, 0.0_f32, 0.0_f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Row-major `m x n` matrix of cosine similarities between `a` and `b`.
pub fn similarity_matrix<A, B>(a: &[A], b: &[B]) -> Vec<f32>
where
    A: AsRef<[f32]>,
    B: AsRef<[f32]>,
{
    let mut matrix = Vec::with_capacity(a.len() * b.len());
    for row in a {
        for col in b {
            matrix.push(cosine_similarity(row.as_ref(), col.as_ref()));
        }
    }
    matrix
}

/// Reduce a flattened similarity matrix. Returns `None` for an empty matrix.
///
/// The median is the high median: for an even count it is the upper of the
/// two middle values, so it is always an observed similarity.
pub fn summarize(values: &[f32]) -> Option<SimilarityStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let count = sorted.len();
    let median = sorted[count / 2];

    let mean = sorted.iter().map(|v| f64::from(*v)).sum::<f64>() / count as f64;
    let variance = sorted
        .iter()
        .map(|v| (f64::from(*v) - mean).powi(2))
        .sum::<f64>()
        / count as f64;

    Some(SimilarityStats {
        median,
        mean: mean as f32,
        max: sorted[count - 1],
        min: sorted[0],
        std: variance.sqrt() as f32,
        count,
    })
}

#[derive(Default)]
struct BucketEmbeddings {
    a: Vec<Vec<f32>>,
    b: Vec<Vec<f32>>,
}

/// Group rows by bucket, splitting them by jurisdiction. Vectors whose
/// dimension differs from the first one seen are dropped.
fn group_by_bucket(
    rows: Vec<StoredEmbedding>,
    jurisdiction_a: &str,
    jurisdiction_b: &str,
) -> BTreeMap<String, BucketEmbeddings> {
    let mut buckets: BTreeMap<String, BucketEmbeddings> = BTreeMap::new();
    let mut dimension: Option<usize> = None;

    for row in rows {
        if row.embedding.is_empty() {
            continue;
        }
        let dim = *dimension.get_or_insert(row.embedding.len());
        if row.embedding.len() != dim {
            log::warn!(
                "Ignoring {}-dimensional embedding for {} in {} (expected {dim})",
                row.embedding.len(),
                row.jurisdiction,
                row.time_bucket
            );
            continue;
        }

        let in_a = row.jurisdiction == jurisdiction_a;
        let in_b = row.jurisdiction == jurisdiction_b;
        if !in_a && !in_b {
            continue;
        }

        let entry = buckets.entry(row.time_bucket).or_default();
        match (in_a, in_b) {
            (true, true) => {
                entry.a.push(row.embedding.clone());
                entry.b.push(row.embedding);
            }
            (true, false) => entry.a.push(row.embedding),
            _ => entry.b.push(row.embedding),
        }
    }

    buckets
}

/// Build the series from already loaded rows.
pub fn aggregate(
    rows: Vec<StoredEmbedding>,
    jurisdiction_a: &str,
    jurisdiction_b: &str,
) -> Vec<SimilaritySample> {
    group_by_bucket(rows, jurisdiction_a, jurisdiction_b)
        .into_iter()
        .filter_map(|(time_bucket, bucket)| {
            if bucket.a.is_empty() || bucket.b.is_empty() {
                return None;
            }
            let matrix = similarity_matrix(&bucket.a, &bucket.b);
            let stats = summarize(&matrix)?;
            log::info!(
                "Time bucket {time_bucket}: Similarity = {:.3} (based on {} comparisons)",
                stats.median,
                stats.count
            );
            Some(SimilaritySample {
                time_bucket,
                similarity: stats.median,
                stats,
            })
        })
        .collect()
}

/// Computes similarity series on demand from the persisted corpus.
pub struct SimilarityAggregator<'a, R: ?Sized> {
    reader: &'a R,
}

impl<'a, R> SimilarityAggregator<'a, R>
where
    R: DocumentReader + ?Sized,
{
    pub fn new(reader: &'a R) -> Self {
        Self { reader }
    }

    /// Median-based similarity per shared time bucket, oldest first.
    ///
    /// Buckets where either jurisdiction has no embedding are left out. No
    /// shared bucket yields an empty series, not an error.
    pub fn compute(
        &self,
        jurisdiction_a: &str,
        jurisdiction_b: &str,
        ontology_id: Option<&str>,
    ) -> Result<SimilaritySeries, SimilarityError> {
        log::info!("Computing similarity between {jurisdiction_a} and {jurisdiction_b}");

        let rows = self
            .reader
            .list_embeddings(jurisdiction_a, jurisdiction_b, ontology_id)?;

        let similarity_sequence = aggregate(rows, jurisdiction_a, jurisdiction_b);
        if similarity_sequence.is_empty() {
            log::warn!("No overlapping time buckets for {jurisdiction_a} and {jurisdiction_b}");
        }

        Ok(SimilaritySeries {
            country_a: jurisdiction_a.to_string(),
            country_b: jurisdiction_b.to_string(),
            ontology_id: ontology_id.map(str::to_string),
            similarity_sequence,
        })
    }

    pub fn jurisdictions(&self) -> Result<Vec<String>, SimilarityError> {
        Ok(self.reader.list_jurisdictions()?)
    }
}
