//! # LOUDS-encoded succinct string dictionary in Rust
//!
//! This is a Rust library of a static string dictionary laid out as a
//! level-order unary degree sequence (LOUDS) trie, with a companion blob
//! store for variable-length payloads.
//!
//! ## Features
//!
//! - **Dictionary encoding.** Lsdict provides a bijective mapping between
//!   strings and integer IDs. IDs are assigned in level order: shorter keys
//!   first, lexicographic within each length.
//! - **Pointer-free trie.** The trie is stored as two bit vectors and an
//!   array of edge labels; parent/child navigation is done with rank and
//!   select, so no node is ever allocated.
//! - **Queries.** Exact match, predictive (prefix) enumeration in
//!   lexicographic order, common-prefix search, and reverse lookup from an ID
//!   to its key.
//! - **Borrowed images.** Builders produce one contiguous byte image; readers
//!   borrow it (e.g. from a memory-mapped file), validate it on open and never
//!   write through it.
//!
//! ## Note
//!
//! - Keys must not be empty.
//! - Edge labels can be narrowed from 8 bits down to 1 bit per edge with
//!   [`TrieBuilder::with_transition_bits`] when every key byte fits.
//!
//! ## Example
//!
//! ```
//! use lsdict::{BlobBuilder, BlobReader, TrieBuilder, TrieReader};
//!
//! let keys = ["ICDM", "ICML", "SIGIR", "SIGKDD", "SIGMOD"];
//!
//! // Builds the trie image.
//! let trie_builder = TrieBuilder::from_keys(keys).unwrap();
//! let trie = TrieReader::open(trie_builder.image()).unwrap();
//! assert_eq!(trie.num_keys(), keys.len());
//!
//! // Stores a value per ID.
//! let values = ["data mining", "machine learning", "information retrieval", "kdd", "databases"];
//! let mut records = vec![""; keys.len()];
//! for (key, value) in keys.iter().zip(values) {
//!     records[trie_builder.key_index(key).unwrap()] = value;
//! }
//! let blob_builder = BlobBuilder::from_records(records).unwrap();
//! let blobs = BlobReader::open(blob_builder.image()).unwrap();
//!
//! // Looks up a key and its value.
//! let id = trie.exact_match("SIGIR").unwrap();
//! assert_eq!(blobs.get(id).unwrap(), b"information retrieval");
//! assert_eq!(trie.exact_match("SIGSPATIAL"), None);
//!
//! // Decodes the key associated with an ID.
//! assert_eq!(trie.reverse(id, 16), Some(b"SIGIR".to_vec()));
//!
//! // Enumerates keys starting with a prefix.
//! let mut iter = trie.predictive_iter("SIG");
//! assert_eq!(iter.next().map(|(_, key)| key), Some(b"SIGIR".to_vec()));
//! assert_eq!(iter.next().map(|(_, key)| key), Some(b"SIGKDD".to_vec()));
//! assert_eq!(iter.next().map(|(_, key)| key), Some(b"SIGMOD".to_vec()));
//! assert_eq!(iter.next(), None);
//! ```
pub mod bit_stream;
pub mod bit_vector;
pub mod blob;
pub mod trie;
mod utils;

pub use bit_stream::BitStreamBuilder;
pub use bit_vector::BitVector;
pub use blob::builder::BlobBuilder;
pub use blob::BlobReader;
pub use trie::builder::TrieBuilder;
pub use trie::decoder::Decoder;
pub use trie::predictive_iter::PredictiveIter;
pub use trie::{SearchMode, TrieReader};

/// Default bit width of trie edge labels.
pub const DEFAULT_TRANSITION_BITS: usize = 8;

/// Default length every blob record is padded to at least.
pub const DEFAULT_MIN_LENGTH: usize = 0;

/// Default granularity of blob record lengths.
pub const DEFAULT_LENGTH_STEP: usize = 1;
