use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to initialize embedding model: {0}")]
    Init(String),
    #[error("failed to generate embedding: {0}")]
    Inference(String),
    #[error("embedding model returned no vector")]
    EmptyOutput,
    #[error("refusing to embed empty text")]
    EmptyText,
}

/// Text to fixed-dimension vector capability.
///
/// Implementations are created once per process and handed to the pipeline;
/// for a fixed model version the same text must always map to the same
/// vector.
pub trait Embedder {
    fn encode(&mut self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Resolve a configured model name into a fastembed model.
pub fn parse_embedding_model(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match name {
        "multilingual-e5-large" => Ok(EmbeddingModel::MultilingualE5Large),
        "multilingual-e5-base" => Ok(EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-small" => Ok(EmbeddingModel::MultilingualE5Small),
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "paraphrase-multilingual-minilm-l12-v2" => Ok(EmbeddingModel::ParaphraseMLMiniLML12V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbeddingError::Init(format!(
            "unknown embedding model `{other}`"
        ))),
    }
}

/// Input prefix a model was trained with for documents being indexed.
///
/// E5 models expect `"passage: "` in front of stored text.
pub fn passage_prefix(model: &EmbeddingModel) -> &'static str {
    match model {
        EmbeddingModel::MultilingualE5Large
        | EmbeddingModel::MultilingualE5Base
        | EmbeddingModel::MultilingualE5Small => "passage: ",
        _ => "",
    }
}

/// Embedder backed by a locally loaded fastembed model.
pub struct FastEmbedder {
    model: TextEmbedding,
    prefix: &'static str,
}

impl FastEmbedder {
    pub fn try_new(model: EmbeddingModel) -> Result<Self, EmbeddingError> {
        let prefix = passage_prefix(&model);
        let model = TextEmbedding::try_new(InitOptions::new(model))
            .map_err(|error| EmbeddingError::Init(format!("{error:?}")))?;
        Ok(Self { model, prefix })
    }
}

impl Embedder for FastEmbedder {
    fn encode(&mut self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        self.model
            .embed(vec![format!("{}{text}", self.prefix)], None)
            .map_err(|error| EmbeddingError::Inference(format!("{error:?}")))?
            .into_iter()
            .next()
            .map(|value| normalize_embedding(&value))
            .ok_or(EmbeddingError::EmptyOutput)
    }
}

/// Normalize a vector to unit length.
///
/// Returns the original vector when the norm is zero.
pub fn normalize_embedding(vec: &[f32]) -> Vec<f32> {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        vec.to_vec()
    } else {
        vec.iter().map(|x| x / norm).collect()
    }
}
