//! In-memory policy corpus with deterministic retrieval
//!
//! The corpus is loaded once at process start and shared by reference
//! across concurrent runs; nothing mutates it afterwards. Scoring is
//! lexical (token-set cosine), which keeps retrieval deterministic and
//! dependency-free while preserving the `search(query, k)` contract.

use crate::retriever::{PolicyRetriever, RetrievalError};
use ehs_types::PolicySnippet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One policy document in the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Stable document id
    pub id: String,
    /// Policy text
    pub text: String,
    /// Topic tag (e.g. "PPE", "LOTO")
    pub tag: String,
    /// Where the document came from
    pub source: String,
}

/// Built-in seed policies, used when no corpus directory is configured
/// or the directory holds no documents
#[must_use]
pub fn seed_documents() -> Vec<PolicyDocument> {
    vec![
        PolicyDocument {
            id: "ppe_policy".to_string(),
            text: "All personnel in production areas must wear ANSI Z89.1 hard hats, \
                   ANSI Z87.1 eye protection, and high-visibility vests at all times."
                .to_string(),
            tag: "PPE".to_string(),
            source: "seed".to_string(),
        },
        PolicyDocument {
            id: "lockout_tagout".to_string(),
            text: "Before servicing equipment, apply lockout/tagout per OSHA 1910.147. \
                   Verify zero energy state prior to maintenance activities."
                .to_string(),
            tag: "LOTO".to_string(),
            source: "seed".to_string(),
        },
        PolicyDocument {
            id: "chemical_handling".to_string(),
            text: "When handling corrosive chemicals, use splash-resistant gloves, \
                   face shields, and ensure eyewash stations are operational within \
                   10 seconds travel time."
                .to_string(),
            tag: "Chemical".to_string(),
            source: "seed".to_string(),
        },
    ]
}

/// Immutable, process-wide policy store
///
/// Wrap in `Arc` and hand a clone to every run.
#[derive(Debug)]
pub struct PolicyStore {
    documents: Vec<IndexedDocument>,
}

#[derive(Debug)]
struct IndexedDocument {
    doc: PolicyDocument,
    tokens: BTreeSet<String>,
}

impl PolicyStore {
    /// Build a store from explicit documents
    #[must_use]
    pub fn new(documents: Vec<PolicyDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|doc| IndexedDocument {
                tokens: tokenize(&doc.text),
                doc,
            })
            .collect();
        Self { documents }
    }

    /// Build a store seeded with the built-in policies
    #[must_use]
    pub fn with_seed() -> Self {
        tracing::info!("using built-in seed policies for the corpus");
        Self::new(seed_documents())
    }

    /// Load `.txt` documents from a directory, falling back to the seed
    /// policies when the directory is missing or empty
    ///
    /// # Errors
    /// Returns an error only when a present file cannot be read.
    pub fn load_from_dir(dir: &Path) -> Result<Self, std::io::Error> {
        let mut docs = Vec::new();
        if dir.is_dir() {
            let mut entries: Vec<_> = std::fs::read_dir(dir)?
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
                .collect();
            entries.sort();
            for path in entries {
                let text = std::fs::read_to_string(&path)?;
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "policy".to_string());
                docs.push(PolicyDocument {
                    id,
                    text,
                    tag: "policy".to_string(),
                    source: path.display().to_string(),
                });
            }
        }
        if docs.is_empty() {
            return Ok(Self::with_seed());
        }
        tracing::info!(count = docs.len(), "loaded policy corpus from directory");
        Ok(Self::new(docs))
    }

    /// Number of documents in the corpus
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Rank documents against a query, descending score, at most `k`
    ///
    /// Zero-score documents are excluded; an empty result is valid.
    #[must_use]
    pub fn rank(&self, query: &str, k: usize) -> Vec<PolicySnippet> {
        if k == 0 {
            return Vec::new();
        }
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(f64, &PolicyDocument)> = self
            .documents
            .iter()
            .filter_map(|indexed| {
                let score = cosine(&query_tokens, &indexed.tokens);
                (score > 0.0).then_some((score, &indexed.doc))
            })
            .collect();

        // Stable order: score descending, then id for determinism
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });

        scored
            .into_iter()
            .take(k)
            .map(|(score, doc)| PolicySnippet {
                id: doc.id.clone(),
                text: doc.text.clone(),
                score,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl PolicyRetriever for PolicyStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<PolicySnippet>, RetrievalError> {
        Ok(self.rank(query, k))
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_lowercase)
        .collect()
}

fn cosine(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let overlap = a.intersection(b).count() as f64;
    overlap / ((a.len() as f64).sqrt() * (b.len() as f64).sqrt())
}
