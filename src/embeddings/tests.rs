use super::*;

struct SlowEmbedder {
    delay: Duration,
}

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingFailure> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![text.len() as f32, 1.0])
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

struct ShortBatchEmbedder;

#[async_trait]
impl Embedder for ShortBatchEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingFailure> {
        Ok(vec![1.0])
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingFailure> {
        Ok(vec![vec![1.0]])
    }

    fn model_name(&self) -> &str {
        "short"
    }
}

#[tokio::test]
async fn default_batch_embeds_in_order() {
    let embedder = SlowEmbedder {
        delay: Duration::from_millis(1),
    };
    let texts = vec!["a".to_string(), "abc".to_string()];

    let embeddings = embedder
        .embed_batch(&texts)
        .await
        .expect("batch should succeed");

    assert_eq!(embeddings, vec![vec![1.0, 1.0], vec![3.0, 1.0]]);
}

#[tokio::test]
async fn embed_times_out() {
    let embedder = SlowEmbedder {
        delay: Duration::from_secs(5),
    };

    let result = embed_with_timeout(&embedder, "query", Duration::from_millis(20)).await;

    assert_eq!(
        result,
        Err(EmbeddingFailure::Timeout(Duration::from_millis(20)))
    );
}

#[tokio::test]
async fn embed_within_timeout_returns_vector() {
    let embedder = SlowEmbedder {
        delay: Duration::from_millis(1),
    };

    let result = embed_with_timeout(&embedder, "ab", Duration::from_secs(5)).await;

    assert_eq!(result, Ok(vec![2.0, 1.0]));
}

#[tokio::test]
async fn batch_count_mismatch_is_malformed() {
    let texts = vec!["one".to_string(), "two".to_string()];

    let result = embed_batch_with_timeout(&ShortBatchEmbedder, &texts, Duration::from_secs(1)).await;

    assert!(matches!(result, Err(EmbeddingFailure::Malformed(_))));
}
