//! Approximate pattern matching over the bidirectional index.
//!
//! The driver enumerates error profiles with the pigeonhole scheme: the
//! pattern is split into k + 1 pieces, and for every occurrence with at most
//! k mismatches some piece matches exactly. Each seed search matches its
//! piece exactly, extends rightwards branching over substitutions, then
//! leftwards requiring at least one mismatch in every piece left of the
//! seed, so each occurrence is enumerated under exactly one seed. Only the
//! core extension primitives are used.
#![cfg(target_pointer_width = "64")]

use std::collections::BTreeSet;

use crate::br_index::{BrIndex, Sample, SearchState};

impl BrIndex {
    /// Collects the match samples of `pattern` with up to `k` mismatches.
    ///
    /// With `k == 0` this is plain exact backward search. The returned
    /// samples cover pairwise disjoint ranges.
    pub fn search_with_mismatch(&self, pattern: &[u8], k: usize) -> Vec<Sample> {
        if pattern.is_empty() {
            return vec![];
        }
        if k >= pattern.len() {
            // every window of the pattern's length is within budget; the
            // pigeonhole split needs k + 1 pieces, so enumerate all distinct
            // substrings of that length instead
            let mut samples = vec![];
            let alphabet = self.alphabet().chars();
            enumerate_windows(self, pattern.len(), self.reset_pattern(), &alphabet, &mut samples);
            return samples;
        }
        let pieces = piece_bounds(pattern.len(), k);
        let search = MismatchSearch {
            index: self,
            pattern,
            pieces: &pieces,
            budget: k,
            alphabet: self.alphabet().chars(),
        };
        let mut samples = vec![];
        for seed in 0..pieces.len() {
            search.run_seed(seed, &mut samples);
        }
        samples
    }

    /// Locates the occurrences covered by `samples`, deduplicated and sorted.
    pub fn locate_samples(&self, samples: &[Sample]) -> Vec<usize> {
        let mut positions = BTreeSet::new();
        for sample in samples {
            positions.extend(self.locate_sample(sample));
        }
        positions.into_iter().collect()
    }

    /// Sums the occurrence counts of `samples`.
    pub fn count_samples(&self, samples: &[Sample]) -> usize {
        samples.iter().map(|s| s.count()).sum()
    }
}

/// Extends by every alphabet character until `remaining` characters are
/// matched, yielding one sample per distinct substring of that length.
fn enumerate_windows(
    index: &BrIndex,
    remaining: usize,
    state: SearchState,
    alphabet: &[u8],
    out: &mut Vec<Sample>,
) {
    if remaining == 0 {
        out.push(state.sample());
        return;
    }
    for &c in alphabet {
        let mut branch = state.clone();
        if !index.left_extension(&mut branch, c).is_empty() {
            enumerate_windows(index, remaining - 1, branch, alphabet, out);
        }
    }
}

/// Splits `len` positions into `k + 1` (capped at `len`) contiguous pieces
/// of balanced sizes, as half-open intervals.
fn piece_bounds(len: usize, k: usize) -> Vec<(usize, usize)> {
    let parts = (k + 1).min(len);
    let base = len / parts;
    let extra = len % parts;
    let mut bounds = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let end = start + base + (i < extra) as usize;
        bounds.push((start, end));
        start = end;
    }
    bounds
}

struct MismatchSearch<'a> {
    index: &'a BrIndex,
    pattern: &'a [u8],
    pieces: &'a [(usize, usize)],
    budget: usize,
    alphabet: Vec<u8>,
}

impl MismatchSearch<'_> {
    fn run_seed(&self, seed: usize, out: &mut Vec<Sample>) {
        let (start, end) = self.pieces[seed];
        let mut state = self.index.reset_pattern();
        for pos in (start..end).rev() {
            if self.index.left_extension(&mut state, self.pattern[pos]).is_empty() {
                return;
            }
        }
        self.extend_right(seed, end, state, 0, out);
    }

    /// Appends pattern positions `pos..` one by one, branching on
    /// substitutions while the budget lasts.
    fn extend_right(&self, seed: usize, pos: usize, state: SearchState, used: usize, out: &mut Vec<Sample>) {
        if pos == self.pattern.len() {
            if seed == 0 {
                out.push(state.sample());
            } else {
                let piece = seed - 1;
                self.extend_left(seed, piece, self.pieces[piece].1, state, used, 0, out);
            }
            return;
        }
        let want = self.pattern[pos];
        let mut exact = state.clone();
        if !self.index.right_extension(&mut exact, want).is_empty() {
            self.extend_right(seed, pos + 1, exact, used, out);
        }
        if used < self.budget {
            for &c in &self.alphabet {
                if c == want {
                    continue;
                }
                let mut branch = state.clone();
                if !self.index.right_extension(&mut branch, c).is_empty() {
                    self.extend_right(seed, pos + 1, branch, used + 1, out);
                }
            }
        }
    }

    /// Prepends pattern positions below `pos`, right to left through the
    /// pieces left of the seed. Every such piece must take at least one
    /// mismatch, making the seed the leftmost exactly-matching piece.
    #[allow(clippy::too_many_arguments)]
    fn extend_left(
        &self,
        seed: usize,
        piece: usize,
        pos: usize,
        state: SearchState,
        used: usize,
        piece_mismatches: usize,
        out: &mut Vec<Sample>,
    ) {
        let (start, _) = self.pieces[piece];
        if pos == start {
            if piece_mismatches == 0 {
                return;
            }
            if piece == 0 {
                out.push(state.sample());
            } else {
                self.extend_left(seed, piece - 1, start, state, used, 0, out);
            }
            return;
        }
        let want = self.pattern[pos - 1];
        let mut exact = state.clone();
        if !self.index.left_extension(&mut exact, want).is_empty() {
            self.extend_left(seed, piece, pos - 1, exact, used, piece_mismatches, out);
        }
        if used < self.budget {
            for &c in &self.alphabet {
                if c == want {
                    continue;
                }
                let mut branch = state.clone();
                if !self.index.left_extension(&mut branch, c).is_empty() {
                    self.extend_left(seed, piece, pos - 1, branch, used + 1, piece_mismatches + 1, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    use crate::br_index::BuildOptions;
    use crate::sa::SaAlgorithm;

    fn build_both(text: &[u8]) -> Vec<BrIndex> {
        [true, false]
            .iter()
            .map(|&with_plcp| {
                BrIndex::build(
                    text,
                    &BuildOptions {
                        algorithm: SaAlgorithm::Sais,
                        with_plcp,
                    },
                )
                .unwrap()
            })
            .collect()
    }

    fn naive_mismatch_occurrences(text: &[u8], pattern: &[u8], k: usize) -> Vec<usize> {
        if pattern.is_empty() || pattern.len() > text.len() {
            return vec![];
        }
        (0..=text.len() - pattern.len())
            .filter(|&i| {
                text[i..i + pattern.len()]
                    .iter()
                    .zip(pattern)
                    .filter(|(a, b)| a != b)
                    .count()
                    <= k
            })
            .collect()
    }

    #[test]
    fn test_piece_bounds() {
        assert_eq!(piece_bounds(10, 0), vec![(0, 10)]);
        assert_eq!(piece_bounds(10, 1), vec![(0, 5), (5, 10)]);
        assert_eq!(piece_bounds(10, 2), vec![(0, 4), (4, 7), (7, 10)]);
        assert_eq!(piece_bounds(2, 3), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_exact_matches_backward_search() {
        let text = b"mississippi";
        for index in build_both(text) {
            let samples = index.search_with_mismatch(b"issi", 0);
            assert_eq!(index.count_samples(&samples), 2);
            assert_eq!(index.locate_samples(&samples), vec![1, 4]);

            assert!(index.search_with_mismatch(b"xyz", 0).is_empty());
            assert!(index.search_with_mismatch(b"", 2).is_empty());
        }
    }

    #[test]
    fn test_one_mismatch() {
        let text = b"mississippi";
        for index in build_both(text) {
            // "issa" matches "issi" at 1 and 4 with one substitution
            let samples = index.search_with_mismatch(b"issa", 1);
            let expected = naive_mismatch_occurrences(text, b"issa", 1);
            assert_eq!(index.locate_samples(&samples), expected);
            assert_eq!(index.count_samples(&samples), expected.len());
        }
    }

    #[test]
    fn test_samples_are_disjoint() {
        let text = b"abracadabra";
        for index in build_both(text) {
            let samples = index.search_with_mismatch(b"abra", 1);
            let total = index.count_samples(&samples);
            let distinct = index.locate_samples(&samples).len();
            assert_eq!(total, distinct);
        }
    }

    #[test]
    fn test_random_against_naive() {
        let mut rng = ChaChaRng::seed_from_u64(51);
        for _ in 0..6 {
            let text: Vec<u8> = (0..rng.gen_range(30..120))
                .map(|_| b"acgt"[rng.gen_range(0..4)])
                .collect();
            for index in build_both(&text) {
                for k in 0..=2 {
                    for _ in 0..10 {
                        let len = rng.gen_range(k + 1..=8);
                        let pattern: Vec<u8> =
                            (0..len).map(|_| b"acgt"[rng.gen_range(0..4)]).collect();
                        let expected = naive_mismatch_occurrences(&text, &pattern, k);
                        let samples = index.search_with_mismatch(&pattern, k);
                        assert_eq!(
                            index.locate_samples(&samples),
                            expected,
                            "pattern {:?} k={k}",
                            pattern
                        );
                        assert_eq!(index.count_samples(&samples), expected.len());
                    }
                }
            }
        }
    }

    #[test]
    fn test_budget_larger_than_pattern() {
        let text = b"banana";
        for index in build_both(text) {
            // every position of a length-2 window matches with 2 free errors
            let samples = index.search_with_mismatch(b"xy", 2);
            let expected = naive_mismatch_occurrences(text, b"xy", 2);
            assert_eq!(index.locate_samples(&samples), expected);
        }
    }
}
