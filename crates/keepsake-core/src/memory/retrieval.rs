//! Grounding retrieval over the fragment corpus.
//!
//! Selects the fragments most relevant to a live user utterance so they
//! can be injected into the next generation turn. Retrieval is two-tier:
//! semantic ranking when the embedding backend is reachable, recency
//! order otherwise. Grounding context should degrade, never vanish, when
//! the embedding backend is down -- this method cannot fail.

use std::sync::Arc;

use keepsake_types::fragment::MemoryFragment;

use crate::embedding::box_embedder::BoxEmbedder;
use crate::embedding::similarity::rank_by_similarity;

/// Default number of fragments injected as grounding context.
pub const DEFAULT_GROUNDING_LIMIT: usize = 5;

/// A fragment projected down to the fields grounding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingFragment {
    pub category: String,
    pub content: String,
    pub context: String,
}

impl From<&MemoryFragment> for GroundingFragment {
    fn from(fragment: &MemoryFragment) -> Self {
        Self {
            category: fragment.category.clone(),
            content: fragment.content.clone(),
            context: fragment.context.clone(),
        }
    }
}

/// Retrieves the top-K fragments relevant to a query.
///
/// `embedder: None` models "embedding capability unavailable"; the
/// retriever then serves the recency fallback unconditionally.
pub struct GroundingRetriever {
    embedder: Option<Arc<BoxEmbedder>>,
}

impl GroundingRetriever {
    pub fn new(embedder: Option<Arc<BoxEmbedder>>) -> Self {
        Self { embedder }
    }

    /// Select up to `limit` fragments for the query, most relevant first.
    ///
    /// Deterministic: an unchanged corpus and query yield the identical
    /// ordered result. Falls back to the first `limit` fragments in store
    /// order when the corpus is empty, the query is blank, no embedder is
    /// configured, or any embedding call fails.
    pub async fn retrieve(
        &self,
        query: &str,
        fragments: &[MemoryFragment],
        limit: usize,
    ) -> Vec<GroundingFragment> {
        if fragments.is_empty() || query.trim().is_empty() {
            return Self::recency_fallback(fragments, limit);
        }

        let Some(embedder) = &self.embedder else {
            return Self::recency_fallback(fragments, limit);
        };

        let query_embedding = match embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.swap_remove(0),
            Ok(_) => {
                tracing::warn!("embedding service returned no query vector; using recency fallback");
                return Self::recency_fallback(fragments, limit);
            }
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; using recency fallback");
                return Self::recency_fallback(fragments, limit);
            }
        };

        // Fragments created before embeddings existed remain retrievable:
        // compute their vectors on demand from "{category}: {content}".
        let missing: Vec<usize> = fragments
            .iter()
            .enumerate()
            .filter(|(_, f)| f.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut computed: Vec<Vec<f32>> = Vec::new();
        if !missing.is_empty() {
            let texts: Vec<String> = missing
                .iter()
                .map(|&i| fragments[i].embedding_text())
                .collect();
            match embedder.embed(&texts).await {
                Ok(vectors) if vectors.len() == texts.len() => computed = vectors,
                Ok(vectors) => {
                    tracing::warn!(
                        expected = texts.len(),
                        got = vectors.len(),
                        "on-demand embedding batch size mismatch; using recency fallback"
                    );
                    return Self::recency_fallback(fragments, limit);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "on-demand embedding failed; using recency fallback");
                    return Self::recency_fallback(fragments, limit);
                }
            }
        }

        let mut computed_iter = computed.into_iter();
        let candidates: Vec<(usize, Vec<f32>)> = fragments
            .iter()
            .enumerate()
            .map(|(i, fragment)| match &fragment.embedding {
                Some(embedding) => (i, embedding.clone()),
                None => (
                    i,
                    computed_iter
                        .next()
                        .expect("one computed vector per missing embedding"),
                ),
            })
            .collect();

        rank_by_similarity(&query_embedding, &candidates)
            .into_iter()
            .take(limit)
            .map(|(i, _)| GroundingFragment::from(&fragments[i]))
            .collect()
    }

    /// First `limit` fragments in store order, no similarity scoring.
    fn recency_fallback(fragments: &[MemoryFragment], limit: usize) -> Vec<GroundingFragment> {
        fragments
            .iter()
            .take(limit)
            .map(GroundingFragment::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingEmbedder, KeyedEmbedder};
    use keepsake_types::fragment::MemoryFragment;
    use uuid::Uuid;

    fn fragment(category: &str, content: &str, embedding: Option<Vec<f32>>) -> MemoryFragment {
        let mut fragment = MemoryFragment::new_pending(
            Uuid::now_v7(),
            category.to_string(),
            content.to_string(),
            String::new(),
        );
        fragment.embedding = embedding;
        fragment
    }

    fn retriever_with(embedder: impl crate::embedding::embedder::Embedder + 'static) -> GroundingRetriever {
        GroundingRetriever::new(Some(Arc::new(BoxEmbedder::new(embedder))))
    }

    #[tokio::test]
    async fn test_empty_corpus_returns_empty() {
        let retriever = retriever_with(KeyedEmbedder::new(vec![], vec![1.0, 0.0]));
        let result = retriever.retrieve("childhood", &[], 5).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_uses_recency_order() {
        let retriever = retriever_with(KeyedEmbedder::new(vec![], vec![1.0, 0.0]));
        let corpus = vec![
            fragment("A", "first", Some(vec![1.0, 0.0])),
            fragment("B", "second", Some(vec![0.0, 1.0])),
            fragment("C", "third", Some(vec![0.5, 0.5])),
        ];
        let result = retriever.retrieve("   ", &corpus, 2).await;
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].content, "first");
        assert_eq!(result[1].content, "second");
    }

    #[tokio::test]
    async fn test_no_embedder_uses_recency_order() {
        let retriever = GroundingRetriever::new(None);
        let corpus = vec![
            fragment("A", "first", Some(vec![0.0, 1.0])),
            fragment("B", "second", Some(vec![1.0, 0.0])),
        ];
        let result = retriever.retrieve("anything", &corpus, 5).await;
        assert_eq!(result[0].content, "first");
        assert_eq!(result[1].content, "second");
    }

    #[tokio::test]
    async fn test_embedder_failure_uses_recency_order() {
        let retriever = retriever_with(FailingEmbedder);
        let corpus = vec![
            fragment("A", "first", Some(vec![0.0, 1.0])),
            fragment("B", "second", Some(vec![1.0, 0.0])),
        ];
        let result = retriever.retrieve("anything", &corpus, 1).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].content, "first");
    }

    #[tokio::test]
    async fn test_identical_embedding_wins_at_k1() {
        let retriever = retriever_with(KeyedEmbedder::new(
            vec![("Tell me about your childhood", vec![1.0, 0.0])],
            vec![0.0, 0.0],
        ));
        let corpus = vec![
            fragment("Career", "Worked as a fisherman", Some(vec![0.0, 1.0])),
            fragment("Childhood", "Grew up in Odense", Some(vec![1.0, 0.0])),
        ];
        let result = retriever
            .retrieve("Tell me about your childhood", &corpus, 1)
            .await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].content, "Grew up in Odense");
    }

    #[tokio::test]
    async fn test_missing_embeddings_are_computed_on_demand() {
        // The legacy fragment has no stored embedding; the keyed embedder
        // maps its "{category}: {content}" text onto the query direction.
        let retriever = retriever_with(KeyedEmbedder::new(
            vec![
                ("bakery smells", vec![1.0, 0.0]),
                ("Childhood: The bakery smelled of fresh bread", vec![0.9, 0.1]),
            ],
            vec![0.0, 1.0],
        ));
        let corpus = vec![
            fragment("Travel", "Sailed to Norway", Some(vec![0.0, 1.0])),
            fragment("Childhood", "The bakery smelled of fresh bread", None),
        ];
        let result = retriever.retrieve("bakery smells", &corpus, 1).await;
        assert_eq!(result[0].content, "The bakery smelled of fresh bread");
    }

    #[tokio::test]
    async fn test_retrieval_is_deterministic() {
        let corpus = vec![
            fragment("A", "alpha", Some(vec![0.8, 0.2])),
            fragment("B", "beta", Some(vec![0.2, 0.8])),
            fragment("C", "gamma", Some(vec![0.5, 0.5])),
        ];
        let retriever = retriever_with(KeyedEmbedder::new(
            vec![("query", vec![1.0, 0.0])],
            vec![0.0, 0.0],
        ));

        let first = retriever.retrieve("query", &corpus, 3).await;
        let retriever = retriever_with(KeyedEmbedder::new(
            vec![("query", vec![1.0, 0.0])],
            vec![0.0, 0.0],
        ));
        let second = retriever.retrieve("query", &corpus, 3).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_equal_scores_keep_store_order() {
        // All fragments share one embedding: scores tie, input order holds.
        let shared = vec![0.6_f32, 0.8];
        let corpus = vec![
            fragment("A", "first", Some(shared.clone())),
            fragment("B", "second", Some(shared.clone())),
            fragment("C", "third", Some(shared.clone())),
        ];
        let retriever = retriever_with(KeyedEmbedder::new(
            vec![("query", vec![0.6, 0.8])],
            vec![0.0, 0.0],
        ));
        let result = retriever.retrieve("query", &corpus, 3).await;
        let contents: Vec<&str> = result.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_limit_truncates() {
        let corpus: Vec<MemoryFragment> = (0..10)
            .map(|i| fragment("N", &format!("item {i}"), Some(vec![1.0, 0.0])))
            .collect();
        let retriever = retriever_with(KeyedEmbedder::new(
            vec![("query", vec![1.0, 0.0])],
            vec![0.0, 0.0],
        ));
        let result = retriever
            .retrieve("query", &corpus, DEFAULT_GROUNDING_LIMIT)
            .await;
        assert_eq!(result.len(), DEFAULT_GROUNDING_LIMIT);
    }
}
