//! Tier 2: semantic similarity over the curated Q&A corpus
//!
//! Hash-based bag-of-words embeddings with cosine similarity. No model
//! download, no network: each question embeds into a fixed-dimension
//! normalized vector at index build time, and a query is one embed plus a
//! dot product per entry.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use frontdesk_config::QaPair;

const EMBEDDING_DIM: usize = 256;

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| t.to_lowercase())
}

fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIM];

    for token in tokenize(text) {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % EMBEDDING_DIM;
        vector[idx] += 1.0;
    }

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

struct IndexedEntry {
    id: String,
    answer: String,
    embedding: Vec<f32>,
}

/// Semantic index over a company's Q&A corpus
pub struct SemanticIndex {
    entries: Vec<IndexedEntry>,
}

/// A Q&A match with its similarity score
pub struct SemanticHit<'a> {
    pub id: &'a str,
    pub answer: &'a str,
    pub score: f32,
}

impl SemanticIndex {
    pub fn build(qa_pairs: &[QaPair]) -> Self {
        Self {
            entries: qa_pairs
                .iter()
                .map(|qa| IndexedEntry {
                    id: qa.id.clone(),
                    answer: qa.answer.clone(),
                    // Question and answer both carry signal for matching
                    embedding: embed(&format!("{} {}", qa.question, qa.answer)),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Closest entry by cosine similarity.
    pub fn best_match(&self, query: &str) -> Option<SemanticHit<'_>> {
        let query_embedding = embed(query);

        self.entries
            .iter()
            .map(|entry| SemanticHit {
                id: &entry.id,
                answer: &entry.answer,
                score: cosine(&query_embedding, &entry.embedding),
            })
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<QaPair> {
        vec![
            QaPair {
                id: "qa-brands".to_string(),
                question: "What brands of air conditioner do you service?".to_string(),
                answer: "We service all major brands including Trane, Carrier and Lennox."
                    .to_string(),
            },
            QaPair {
                id: "qa-hours".to_string(),
                question: "What are your business hours?".to_string(),
                answer: "We are open Monday through Friday, 7am to 6pm.".to_string(),
            },
            QaPair {
                id: "qa-warranty".to_string(),
                question: "Do repairs come with a warranty?".to_string(),
                answer: "All repairs carry a one-year parts and labor warranty.".to_string(),
            },
        ]
    }

    #[test]
    fn test_best_match_picks_relevant_entry() {
        let index = SemanticIndex::build(&corpus());
        let hit = index.best_match("what brands do you service").unwrap();
        assert_eq!(hit.id, "qa-brands");
    }

    #[test]
    fn test_hours_query() {
        let index = SemanticIndex::build(&corpus());
        let hit = index.best_match("what are your hours").unwrap();
        assert_eq!(hit.id, "qa-hours");
    }

    #[test]
    fn test_identical_text_scores_near_one() {
        let v = embed("do you service heat pumps");
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_unrelated_query_scores_low() {
        let index = SemanticIndex::build(&corpus());
        let hit = index.best_match("purple elephant dancing").unwrap();
        assert!(hit.score < 0.3);
    }

    #[test]
    fn test_empty_corpus() {
        let index = SemanticIndex::build(&[]);
        assert!(index.best_match("anything").is_none());
    }
}
