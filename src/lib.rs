//! # IGX - ∞-gram Language Model Engine
//!
//! IGX answers one question over a fixed tokenized corpus: given a query
//! token sequence, what empirically follows its longest suffix that still
//! occurs at least `min_matches` times? Corpora are indexed once and
//! queried read-only through memory maps.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`corpus`] - Byte-packed token stream access and the token codec
//! - [`ingest`] - Parallel tokenization and sentinel-delimited chunking
//! - [`index`] - The two back-ends: suffix array and FM-index
//! - [`model`] - The ∞-gram query algorithm and greedy generation
//! - [`tokenizer`] - Text ↔ token-id boundary (HuggingFace tokenizers)
//!
//! ## Quick Start
//!
//! ```ignore
//! use igx::model::{BuildConfig, Model, SaModel};
//! use igx::tokenizer::TokenizerWrapper;
//! use std::path::Path;
//!
//! let tokenizer = TokenizerWrapper::from_file(Path::new("tokenizer.json"))?;
//! let model = Model::SuffixArray(SaModel::initialize(
//!     Path::new("corpus.txt"),
//!     Path::new("out"),
//!     &tokenizer,
//!     &BuildConfig::default(),
//! )?);
//!
//! let prediction = model.next_token_distribution(&[42, 7], 1, 1);
//! println!("matched {} tokens of context", prediction.effective_n);
//! ```
//!
//! ## Back-ends
//!
//! The suffix-array back-end binary-searches a byte-level suffix array
//! for every candidate suffix length. The FM-index back-end walks the
//! query backwards through a BWT wavelet matrix, pruning with a 2-gram
//! cache, and enumerates continuations in parallel. Both produce
//! identical predictions; the FM-index trades build time for query-time
//! memory locality.

pub mod corpus;
pub mod error;
pub mod index;
pub mod ingest;
pub mod model;
pub mod tokenizer;

pub use error::IgxError;
pub use model::{generate_greedy, generate_greedy_stream, Model, Prediction};
