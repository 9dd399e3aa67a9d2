//! ∞-gram models over the two index back-ends.
//!
//! The single query operation is `next_token_distribution`: condition on
//! the longest suffix of the query with at least `min_matches`
//! occurrences and return the empirical distribution of the token that
//! follows it. Greedy generation loops that operation.

pub mod fm;
pub mod sa;

pub use fm::FmModel;
pub use sa::SaModel;

use serde::{Deserialize, Serialize};

/// A next-token prediction.
pub struct Prediction {
    /// Empirical next-token probabilities, `vocab_size` long. Zero-length
    /// for an empty query.
    pub distribution: Vec<f32>,
    /// Token length of the suffix actually used; 0 when nothing matched.
    pub effective_n: usize,
    /// Number of retrieved continuations backing the distribution.
    pub num_retrieved: usize,
    /// Extra tokens carried per retrieved suffix.
    pub num_extend: usize,
    /// The retrieved continuations themselves.
    pub retrieved_suffixes: Vec<Vec<u32>>,
}

impl Prediction {
    /// The contract for an empty query: zero-length distribution.
    pub(crate) fn empty_query() -> Self {
        Prediction {
            distribution: Vec::new(),
            effective_n: 0,
            num_retrieved: 0,
            num_extend: 1,
            retrieved_suffixes: Vec::new(),
        }
    }

    /// No suffix of the query reached the match threshold.
    pub(crate) fn no_match(vocab_size: usize, num_extend: usize) -> Self {
        Prediction {
            distribution: vec![0.0; vocab_size],
            effective_n: 0,
            num_retrieved: 0,
            num_extend,
            retrieved_suffixes: Vec::new(),
        }
    }
}

/// Build-time parameters shared by both back-ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Document separator in the raw training file.
    pub line_split: String,
    /// Token value terminating every document.
    pub sentinel_val: u16,
    /// How many sentinel copies terminate a document.
    pub sentinel_size: usize,
    /// Tokenization parallelism.
    pub n_workers: usize,
    /// Per-chunk SA build buffer, MiB.
    pub max_mem_mib: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            line_split: "\n".to_string(),
            sentinel_val: 0,
            sentinel_size: 2,
            n_workers: 4,
            max_mem_mib: 1024,
        }
    }
}

/// The ∞-gram model, one variant per back-end.
pub enum Model {
    SuffixArray(SaModel),
    FmIndex(FmModel),
}

impl Model {
    pub fn next_token_distribution(
        &self,
        query_ids: &[u32],
        num_extend: usize,
        min_matches: usize,
    ) -> Prediction {
        match self {
            Model::SuffixArray(m) => m.next_token_distribution(query_ids, num_extend, min_matches),
            Model::FmIndex(m) => m.next_token_distribution(query_ids, num_extend, min_matches),
        }
    }
}

/// Greedily extend `query_ids` by up to `num_new_tokens` argmax picks.
/// Stops early once a prediction retrieves nothing.
pub fn generate_greedy(
    model: &Model,
    query_ids: &[u32],
    num_new_tokens: usize,
    min_matches: usize,
) -> Vec<u32> {
    let mut result = query_ids.to_vec();
    for _ in 0..num_new_tokens {
        let prediction = model.next_token_distribution(&result, 1, min_matches);
        if prediction.num_retrieved == 0 {
            return result;
        }
        match argmax(&prediction.distribution) {
            Some(token) => result.push(token as u32),
            None => return result,
        }
    }
    result
}

/// `generate_greedy` that reports each intermediate sequence.
pub fn generate_greedy_stream(
    model: &Model,
    query_ids: &[u32],
    num_new_tokens: usize,
    min_matches: usize,
    mut on_step: impl FnMut(&[u32]),
) -> Vec<u32> {
    let mut result = query_ids.to_vec();
    for _ in 0..num_new_tokens {
        let prediction = model.next_token_distribution(&result, 1, min_matches);
        if prediction.num_retrieved == 0 {
            return result;
        }
        match argmax(&prediction.distribution) {
            Some(token) => result.push(token as u32),
            None => return result,
        }
        on_step(&result);
    }
    result
}

/// Index of the largest value; `None` on an empty slice. Ties go to the
/// earliest index.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, bv)) if v <= bv => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Indices sorted by value descending; stable on ties.
pub fn argsort_desc(values: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].partial_cmp(&values[a]).unwrap_or(std::cmp::Ordering::Equal));
    indices
}
