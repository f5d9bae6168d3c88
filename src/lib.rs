//! # br-index
//!
//! Bidirectional, run-length compressed full-text index over a single
//! static text.
//!
//! The index encodes the Burrows-Wheeler transforms of the text and of its
//! reverse in run-length form, keeps suffix-array samples at the run
//! boundaries, and answers three families of queries at interactive speed:
//!
//! - count and locate all exact occurrences of a pattern;
//! - grow the pattern by one character on the left or on the right while
//!   maintaining the match intervals over both orientations;
//! - locate occurrences with up to `k` mismatches by enumerating
//!   error-profile searches over the bidirectional extensions.
//!
//! Space is proportional to the number of BWT runs rather than to the text
//! length, so highly repetitive inputs compress well.
//!
//! ## Example
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use br_index::{BrIndex, BuildOptions};
//!
//! let index = BrIndex::build(b"mississippi", &BuildOptions::new())?;
//!
//! // grow "issi" leftwards, one character at a time
//! let mut state = index.reset_pattern();
//! for &c in b"issi".iter().rev() {
//!     index.left_extension(&mut state, c);
//! }
//! assert_eq!(state.count(), 2);
//!
//! let mut occ = index.locate(&state);
//! occ.sort();
//! assert_eq!(occ, vec![1, 4]);
//! # Ok(())
//! # }
//! ```
#![cfg(target_pointer_width = "64")]

pub mod alphabet;
pub mod bit_vector;
pub mod br_index;
pub mod broadword;
pub mod compact_vector;
pub mod patterns;
pub mod plcp;
pub mod rle_string;
pub mod rs_bit_vector;
pub mod sa;
pub mod search;
pub mod serial;
pub mod sparse_bitvector;
pub mod utils;

pub use crate::br_index::{BrIndex, BuildOptions, BwtRange, Sample, SearchState, INDEX_EXTENSION};
pub use crate::sa::SaAlgorithm;
pub use crate::serial::Serializable;
