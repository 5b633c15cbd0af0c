//! The encoder seam: text in, fixed-length vector out.

use crate::error::EmbeddingError;

/// Unit-length vector produced by an encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Wrap raw encoder output, scaling it to unit length.
    ///
    /// An all-zero vector has no direction and is kept as is.
    pub fn new(mut values: Vec<f32>) -> Self {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity, in [-1, 1]; 0 for vectors of different sizes.
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        if self.dimension() != other.dimension() {
            return 0.0;
        }
        // unit length: cosine == dot product
        std::iter::zip(&self.values, &other.values)
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

/// Identity of a loaded encoder.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Short name, e.g. "all-MiniLM-L6-v2"
    pub name: String,
    /// Length of every vector the encoder returns
    pub dimension: usize,
    /// Tokens considered per text; the rest is truncated
    pub max_sequence_length: usize,
}

/// A sentence encoder.
///
/// Implementations must be deterministic: the same text always maps to the
/// same vector, and every vector has `info().dimension` values.
pub trait EmbeddingModel: Send + Sync {
    fn info(&self) -> &ModelInfo;

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Encode several texts; one forward pass per text unless overridden.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Embed one record text, rejecting blank input and checking the size.
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let embedding = self.embed(text)?;
        let expected = self.info().dimension;
        if embedding.dimension() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: embedding.dimension(),
            });
        }
        Ok(embedding.into_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel {
        info: ModelInfo,
        output_dim: usize,
    }

    impl FixedModel {
        fn new(declared: usize, output_dim: usize) -> Self {
            Self {
                info: ModelInfo {
                    name: "fixed".to_string(),
                    dimension: declared,
                    max_sequence_length: 16,
                },
                output_dim,
            }
        }
    }

    impl EmbeddingModel for FixedModel {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            let seed = text.len() as f32;
            Ok(Embedding::new(
                (0..self.output_dim).map(|i| seed + i as f32).collect(),
            ))
        }
    }

    #[test]
    fn test_new_scales_to_unit_length() {
        let embedding = Embedding::new(vec![6.0, 8.0]);
        assert!((embedding.values[0] - 0.6).abs() < 1e-6);
        assert!((embedding.values[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_left_alone() {
        let emb = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(emb.values, vec![0.0, 0.0]);
    }

    #[test]
    fn test_cosine_similarity() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![0.0, 1.0]);
        let c = Embedding::new(vec![-1.0, 0.0]);
        assert!((a.cosine_similarity(&a) - 1.0).abs() < 0.001);
        assert!(a.cosine_similarity(&b).abs() < 0.001);
        assert!((a.cosine_similarity(&c) + 1.0).abs() < 0.001);
        assert_eq!(a.cosine_similarity(&Embedding::new(vec![1.0])), 0.0);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let model = FixedModel::new(8, 8);
        let first = model.encode("Heat: A group of robbers").unwrap();
        let second = model.encode("Heat: A group of robbers").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }

    #[test]
    fn test_encode_rejects_empty_text() {
        let model = FixedModel::new(8, 8);
        assert!(matches!(
            model.encode("   "),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_encode_checks_dimension() {
        let model = FixedModel::new(8, 4);
        assert!(matches!(
            model.encode("text"),
            Err(EmbeddingError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
    }
}
