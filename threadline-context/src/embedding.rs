//! Embedding helper: create vectors, chunk text for embedding, rank by similarity.

use std::cmp::Ordering;

use threadline_types::{EmbeddingError, EmbeddingProvider, EmbeddingRequest, ModelProfile};

use crate::counter::TokenMeter;
use crate::splitter::ContentSplitter;

/// Embeds text with one embedding model and searches over the results.
///
/// Chunking uses the embedding model's own message limit, so every chunk can
/// be embedded in one request.
#[derive(Debug)]
pub struct EmbeddingAgent<E> {
    provider: E,
    profile: ModelProfile,
    splitter: ContentSplitter,
    dimensions: Option<usize>,
}

impl<E: EmbeddingProvider> EmbeddingAgent<E> {
    /// Creates an agent embedding with `profile.model_id`.
    #[must_use]
    pub fn new(provider: E, profile: ModelProfile, meter: TokenMeter) -> Self {
        Self { provider, profile, splitter: ContentSplitter::new(meter), dimensions: None }
    }

    /// Requests vectors of `dimensions` size, for models that support it.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// The embedding model's limits.
    #[must_use]
    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    /// Embeds a single text.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; returns [`EmbeddingError::InvalidResponse`]
    /// when the provider answers without a vector.
    pub async fn create(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.create_batch(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding returned".into()))
    }

    /// Embeds several texts in one request, one vector per input in order.
    ///
    /// # Errors
    ///
    /// Propagates provider failures; returns [`EmbeddingError::InvalidResponse`]
    /// when the vector count does not match the input count.
    pub async fn create_batch(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = input.len();
        let request = EmbeddingRequest {
            model: self.profile.model_id.clone(),
            input,
            dimensions: self.dimensions,
        };
        let response = self.provider.embed(request).await?;
        if response.embeddings.len() != expected {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {expected} embeddings, got {}",
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    /// Splits `text` into chunks that each fit one embedding request.
    #[must_use]
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        self.splitter.split(text, &self.profile)
    }

    /// Like [`chunk_text`](Self::chunk_text), wrapping every chunk with
    /// `metadata` (e.g. a document title) and counting the wrapped size.
    #[must_use]
    pub fn chunk_text_with<F>(&self, text: &str, metadata: F) -> Vec<String>
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.splitter.clone().with_metadata(metadata).split(text, &self.profile)
    }

    /// Embeds `query` and returns the `limit` candidates most similar to it,
    /// best first.
    ///
    /// `extractor` reads a candidate's stored embedding.
    ///
    /// # Errors
    ///
    /// Returns an error when embedding the query fails.
    pub async fn search<'c, T, F>(
        &self,
        query: &str,
        candidates: &'c [T],
        extractor: F,
        limit: usize,
    ) -> Result<Vec<&'c T>, EmbeddingError>
    where
        F: Fn(&T) -> &[f32],
    {
        let query = self.create(query).await?;
        Ok(rank(&query, candidates, extractor, limit))
    }
}

/// Orders `candidates` by descending similarity to `query` and keeps the top
/// `limit`. Ties keep their input order.
fn rank<'c, T, F>(query: &[f32], candidates: &'c [T], extractor: F, limit: usize) -> Vec<&'c T>
where
    F: Fn(&T) -> &[f32],
{
    let mut scored: Vec<(f32, &T)> =
        candidates.iter().map(|c| (cosine_similarity(query, extractor(c)), c)).collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}

/// Cosine similarity of two vectors, in `[-1, 1]`.
///
/// Vectors of different length are compared over their common prefix. A zero
/// vector has similarity 0 with everything.
///
/// ```
/// use threadline_context::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
/// ```
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_vector_is_dissimilar() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn opposite_vectors() {
        let s = cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]);
        assert!((s + 1.0).abs() < 1e-6);
    }

    #[test]
    fn rank_orders_best_first_and_limits() {
        let items = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let top = rank(&[1.0, 0.0], &items, |v| v.as_slice(), 2);
        assert_eq!(top, vec![&items[1], &items[2]]);
    }

    #[test]
    fn rank_with_limit_past_len() {
        let items = vec![vec![1.0]];
        assert_eq!(rank(&[1.0], &items, |v| v.as_slice(), 5).len(), 1);
    }
}
