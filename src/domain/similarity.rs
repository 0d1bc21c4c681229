use serde::Serialize;

/// Summary of one flattened pairwise cosine-similarity matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimilarityStats {
    pub median: f32,
    pub mean: f32,
    pub max: f32,
    pub min: f32,
    /// Population standard deviation.
    pub std: f32,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilaritySample {
    pub time_bucket: String,
    /// Median of the bucket's similarity matrix.
    pub similarity: f32,
    #[serde(flatten)]
    pub stats: SimilarityStats,
}

/// Chronologically ordered samples for one jurisdiction pair.
///
/// An empty series is a valid answer meaning the two jurisdictions share no
/// time bucket.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilaritySeries {
    pub country_a: String,
    pub country_b: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ontology_id: Option<String>,
    pub similarity_sequence: Vec<SimilaritySample>,
}

impl SimilaritySeries {
    pub fn is_empty(&self) -> bool {
        self.similarity_sequence.is_empty()
    }

    pub fn buckets(&self) -> impl Iterator<Item = &str> {
        self.similarity_sequence
            .iter()
            .map(|sample| sample.time_bucket.as_str())
    }
}
