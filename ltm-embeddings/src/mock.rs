use async_trait::async_trait;

use ltm_core::traits::EmbeddingModel;
use ltm_core::{LtmError, LtmResult};

use crate::truncate_input;

/// Deterministic pseudo-embedding derived from a hash of the input, so
/// tests and fallback paths stay reproducible without calling out to a
/// real model. Values lie in `[-1, 1]`.
pub struct MockEmbeddingModel {
    dimension: usize,
    max_input_chars: usize,
}

impl MockEmbeddingModel {
    pub fn new(dimension: usize, max_input_chars: usize) -> Self {
        Self { dimension, max_input_chars }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut state = fnv1a(text.as_bytes());
        (0..self.dimension)
            .map(|_| {
                state = splitmix64(state);
                // Map to [-1, 1] via the top bits, avoiding modulo bias.
                ((state >> 11) as f64 / (1u64 << 53) as f64) as f32 * 2.0 - 1.0
            })
            .collect()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e3779b97f4a7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

#[async_trait]
impl EmbeddingModel for MockEmbeddingModel {
    async fn embed_one(&self, text: &str) -> LtmResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(LtmError::invalid_input("empty or whitespace-only input"));
        }
        let truncated = truncate_input(text, self.max_input_chars);
        Ok(self.embed_text(&truncated))
    }

    async fn embed_many(&self, texts: &[String]) -> LtmResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_one(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_input() {
        let model = MockEmbeddingModel::new(8, 32_000);
        assert!(model.embed_one("   ").await.is_err());
    }

    #[tokio::test]
    async fn is_deterministic() {
        let model = MockEmbeddingModel::new(16, 32_000);
        let a = model.embed_one("hello world").await.unwrap();
        let b = model.embed_one("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn values_within_bounds() {
        let model = MockEmbeddingModel::new(64, 32_000);
        let v = model.embed_one("bounded values").await.unwrap();
        assert_eq!(v.len(), 64);
        assert!(v.iter().all(|x| (-1.0..=1.0).contains(x)));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let model = MockEmbeddingModel::new(8, 32_000);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let batch = model.embed_many(&texts).await.unwrap();
        for (text, vec) in texts.iter().zip(batch.iter()) {
            assert_eq!(vec, &model.embed_one(text).await.unwrap());
        }
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn pseudo_embeddings_are_deterministic_and_bounded(
                text in "[a-zA-Z0-9 ]{1,200}",
                dimension in 1usize..128,
            ) {
                let model = MockEmbeddingModel::new(dimension, 32_000);
                let a = model.embed_text(&text);
                let b = model.embed_text(&text);
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a.len(), dimension);
                prop_assert!(a.iter().all(|x| (-1.0..=1.0).contains(x)));
            }
        }
    }
}
