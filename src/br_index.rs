//! The bidirectional run-length compressed full-text index.
#![cfg(target_pointer_width = "64")]

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::alphabet::{AlphabetMap, TERMINATOR};
use crate::compact_vector::CompactVector;
use crate::plcp::Plcp;
use crate::rle_string::RleString;
use crate::sa::{self, SaAlgorithm};
use crate::sparse_bitvector::SparseBitVector;
use crate::utils;
use crate::Serializable;

/// File extension of a persisted index.
pub const INDEX_EXTENSION: &str = "brin";

const F_LEN: usize = 256;

/// Closed BWT interval. The empty result is the inverted pair (1, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BwtRange {
    pub first: usize,
    pub second: usize,
}

impl BwtRange {
    /// The canonical empty range.
    pub const EMPTY: Self = Self { first: 1, second: 0 };

    /// Checks if the range matches nothing.
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.second < self.first
    }

    /// Returns the number of rows covered.
    #[inline(always)]
    pub const fn len(&self) -> usize {
        (self.second + 1).saturating_sub(self.first)
    }

    /// Checks if `pos` lies inside the range.
    #[inline(always)]
    pub const fn contains(&self, pos: usize) -> bool {
        self.first <= pos && pos <= self.second
    }
}

/// Mutable search state of one pattern, held by the caller.
///
/// An index instance is immutable after construction; every query thread
/// keeps its own `SearchState` (obtained from
/// [`BrIndex::reset_pattern()`]) and passes it to the extension
/// primitives. The state couples the pattern's interval over the text with
/// the interval over the reversed text, plus one suffix-array sample
/// ("toehold") on each side from which `locate` reconstructs all
/// occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    range: BwtRange,
    p: usize,
    j: usize,
    d: usize,
    range_rev: BwtRange,
    p_rev: usize,
    j_rev: usize,
    d_rev: usize,
    len: usize,
}

impl SearchState {
    /// Returns the interval of the current pattern over the forward BWT.
    #[inline(always)]
    pub fn range(&self) -> BwtRange {
        self.range
    }

    /// Returns the interval of the reversed pattern over the reverse BWT.
    #[inline(always)]
    pub fn range_rev(&self) -> BwtRange {
        self.range_rev
    }

    /// Returns the number of occurrences of the current pattern.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.range.len()
    }

    /// Checks if the current pattern matches nothing.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns the length of the current pattern.
    #[inline(always)]
    pub fn pattern_length(&self) -> usize {
        self.len
    }

    /// Snapshots the state into a locate-ready sample.
    pub fn sample(&self) -> Sample {
        Sample {
            range: self.range,
            p: self.p,
            j: self.j,
            d: self.d,
            len: self.len,
        }
    }
}

/// Snapshot of a match collected during a search, sufficient to count and
/// locate its occurrences later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub(crate) range: BwtRange,
    pub(crate) p: usize,
    pub(crate) j: usize,
    pub(crate) d: usize,
    pub(crate) len: usize,
}

impl Sample {
    /// Returns the number of occurrences covered by the sample.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.range.len()
    }
}

/// Construction options.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Suffix-sorting backend.
    pub algorithm: SaAlgorithm,
    /// Stores the permuted LCP for the fast locate. When disabled, the
    /// index instead keeps two extra run-sample maps and locates through
    /// LF walks, trading time for space.
    pub with_plcp: bool,
}

impl BuildOptions {
    /// Default options: SA-IS and the PLCP-backed locate.
    pub fn new() -> Self {
        Self {
            algorithm: SaAlgorithm::Sais,
            with_plcp: true,
        }
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Bidirectional r-index over a single static text.
///
/// Supports counting and locating all exact occurrences of a pattern, and
/// growing the pattern by one character on either side while maintaining
/// the match intervals over the text and its reverse.
///
/// # Examples
///
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use br_index::{BrIndex, BuildOptions};
///
/// let index = BrIndex::build(b"mississippi", &BuildOptions::new())?;
///
/// let mut state = index.reset_pattern();
/// for &c in b"issi".iter().rev() {
///     index.left_extension(&mut state, c);
/// }
/// assert_eq!(state.count(), 2);
///
/// let mut occ = index.locate(&state);
/// occ.sort();
/// assert_eq!(occ, vec![1, 4]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrIndex {
    alphabet: AlphabetMap,
    f: Vec<usize>,
    bwt: RleString,
    bwt_rev: RleString,
    terminator_pos: usize,
    terminator_pos_rev: usize,
    last_sa_val: usize,

    // run-boundary samples, needed for left extensions
    samples_first: CompactVector,
    samples_last: CompactVector,
    inv_order: CompactVector,
    inv_order_first: Option<CompactVector>,

    // predecessor structures for Phi (SA[i] -> SA[i-1])
    first: SparseBitVector,
    first_to_run: CompactVector,

    // predecessor structures for Phi^{-1} (SA[i] -> SA[i+1])
    last: SparseBitVector,
    last_to_run: CompactVector,

    // reverse-side samples, needed for right extensions
    samples_first_rev: CompactVector,
    samples_last_rev: CompactVector,
    inv_order_rev: CompactVector,
    inv_order_rev_first: Option<CompactVector>,

    plcp: Option<Plcp>,
}

/// BWT of `text` in suffix-array order, with a first-sample at every run
/// opening and a last-sample at every run close (including the final
/// position). Samples carry ((SA[.] - 1) mod n, run index).
fn bwt_and_run_samples(
    text: &[u8],
    sa: &[usize],
) -> (Vec<u8>, Vec<(usize, usize)>, Vec<(usize, usize)>) {
    let n = text.len();
    let sample = |x: usize| if x > 0 { x - 1 } else { n - 1 };

    let mut bwt = Vec::with_capacity(n);
    let mut firsts = vec![];
    let mut lasts = vec![];
    for i in 0..n {
        let x = sa[i];
        bwt.push(if x > 0 { text[x - 1] } else { TERMINATOR });
        if i == 0 || bwt[i] != bwt[i - 1] {
            if i > 0 {
                lasts.push((sample(sa[i - 1]), lasts.len()));
            }
            firsts.push((sample(x), firsts.len()));
        }
    }
    lasts.push((sample(sa[n - 1]), lasts.len()));
    (bwt, firsts, lasts)
}

/// Builds the predecessor bitvector and run-permutation table from samples
/// sorted by text position.
fn predecessor_structures(
    n: usize,
    samples: &[(usize, usize)],
    run_width: usize,
) -> Result<(SparseBitVector, CompactVector)> {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let positions: Vec<usize> = sorted.iter().map(|&(pos, _)| pos).collect();
    let runs: Vec<usize> = sorted.iter().map(|&(_, run)| run).collect();
    Ok((
        SparseBitVector::from_positions(n, &positions)?,
        CompactVector::from_slice_width(&runs, run_width)?,
    ))
}

/// Maps each run's sample into the lexicographic order of the other index:
/// `out[k] = isa_other[n - 2 - sample[k]]`, or 0 for the terminator sample.
fn inverse_order_map(
    samples: &[(usize, usize)],
    isa_other: &[usize],
    width: usize,
) -> Result<CompactVector> {
    let n = isa_other.len();
    let vals: Vec<usize> = samples
        .iter()
        .map(|&(pos, _)| if pos + 2 <= n { isa_other[n - 2 - pos] } else { 0 })
        .collect();
    CompactVector::from_slice_width(&vals, width)
}

impl BrIndex {
    /// Builds the index over `text`.
    ///
    /// # Errors
    ///
    /// An error is returned if `text` is empty, contains a reserved byte
    /// (0 or 1), or its alphabet overflows the internal domain.
    pub fn build(text: &[u8], options: &BuildOptions) -> Result<Self> {
        let alphabet = AlphabetMap::from_text(text)?;
        let n = text.len() + 1;

        let mut t: Vec<u8> = text.iter().map(|&b| alphabet.map(b)).collect();
        t.push(TERMINATOR);
        let (sa, isa) = sa::build_sa_and_isa(&t, options.algorithm);
        let last_sa_val = sa[n - 1];
        let (bwt_bytes, firsts, lasts) = bwt_and_run_samples(&t, &sa);
        let plcp = if options.with_plcp {
            Some(Plcp::build(&t, &sa)?)
        } else {
            None
        };
        drop(sa);
        drop(t);

        let mut t_rev: Vec<u8> = text.iter().rev().map(|&b| alphabet.map(b)).collect();
        t_rev.push(TERMINATOR);
        let (sa_rev, isa_rev) = sa::build_sa_and_isa(&t_rev, options.algorithm);
        let (bwt_rev_bytes, firsts_rev, lasts_rev) = bwt_and_run_samples(&t_rev, &sa_rev);
        drop(sa_rev);
        drop(t_rev);

        let bwt = RleString::from_bytes(&bwt_bytes)?;
        let bwt_rev = RleString::from_bytes(&bwt_rev_bytes)?;
        let r = bwt.number_of_runs();
        let r_rev = bwt_rev.number_of_runs();
        debug_assert_eq!(firsts.len(), r);
        debug_assert_eq!(lasts.len(), r);
        debug_assert_eq!(firsts_rev.len(), r_rev);
        debug_assert_eq!(lasts_rev.len(), r_rev);

        let mut f = vec![0usize; F_LEN];
        for &c in &bwt_bytes {
            f[c as usize] += 1;
        }
        for i in (1..F_LEN).rev() {
            f[i] = f[i - 1];
        }
        f[0] = 0;
        for i in 1..F_LEN {
            f[i] += f[i - 1];
        }

        let terminator_pos = bwt_bytes.iter().position(|&c| c == TERMINATOR).unwrap();
        let terminator_pos_rev = bwt_rev_bytes.iter().position(|&c| c == TERMINATOR).unwrap();

        let log_n = utils::needed_bits(n);
        let log_r = utils::needed_bits(r);

        let pack = |samples: &[(usize, usize)]| -> Result<CompactVector> {
            let vals: Vec<usize> = samples.iter().map(|&(pos, _)| pos).collect();
            CompactVector::from_slice_width(&vals, log_n)
        };
        let samples_first = pack(&firsts)?;
        let samples_last = pack(&lasts)?;
        let samples_first_rev = pack(&firsts_rev)?;
        let samples_last_rev = pack(&lasts_rev)?;

        let (first, first_to_run) = predecessor_structures(n, &firsts, log_r)?;
        let (last, last_to_run) = predecessor_structures(n, &lasts, log_r)?;

        let inv_order = inverse_order_map(&lasts, &isa_rev, log_n)?;
        let inv_order_rev = inverse_order_map(&lasts_rev, &isa, log_n)?;
        let (inv_order_first, inv_order_rev_first) = if options.with_plcp {
            (None, None)
        } else {
            (
                Some(inverse_order_map(&firsts, &isa_rev, log_n)?),
                Some(inverse_order_map(&firsts_rev, &isa, log_n)?),
            )
        };

        Ok(Self {
            alphabet,
            f,
            bwt,
            bwt_rev,
            terminator_pos,
            terminator_pos_rev,
            last_sa_val,
            samples_first,
            samples_last,
            inv_order,
            inv_order_first,
            first,
            first_to_run,
            last,
            last_to_run,
            samples_first_rev,
            samples_last_rev,
            inv_order_rev,
            inv_order_rev_first,
            plcp,
        })
    }

    /// Returns the full BWT range.
    pub fn full_range(&self) -> BwtRange {
        BwtRange {
            first: 0,
            second: self.bwt_size() - 1,
        }
    }

    /// Returns the BWT range of `c P` given the range of `P`, for a
    /// remapped character `c`.
    fn lf_map(&self, rn: BwtRange, c: u8) -> BwtRange {
        self.lf_map_on(&self.bwt, rn, c)
    }

    /// The reverse-side counterpart of [`Self::lf_map()`].
    fn lf_map_rev(&self, rn: BwtRange, c: u8) -> BwtRange {
        self.lf_map_on(&self.bwt_rev, rn, c)
    }

    fn lf_map_on(&self, bwt: &RleString, rn: BwtRange, c: u8) -> BwtRange {
        let c = c as usize;
        if c + 1 >= F_LEN || self.f[c + 1] <= self.f[c] {
            return BwtRange::EMPTY;
        }
        let before = bwt.rank(rn.first, c as u8).unwrap();
        let inside = bwt.rank(rn.second + 1, c as u8).unwrap() - before;
        if inside == 0 {
            BwtRange::EMPTY
        } else {
            BwtRange {
                first: self.f[c] + before,
                second: self.f[c] + before + inside - 1,
            }
        }
    }

    /// LF step on the forward BWT: the row of the suffix one position to
    /// the left in the text.
    pub fn lf(&self, i: usize) -> usize {
        let c = self.bwt.at(i).unwrap();
        self.f[c as usize] + self.bwt.rank(i, c).unwrap()
    }

    /// LF step on the reverse BWT.
    pub fn lf_rev(&self, i: usize) -> usize {
        let c = self.bwt_rev.at(i).unwrap();
        self.f[c as usize] + self.bwt_rev.rank(i, c).unwrap()
    }

    /// Inverse of LF (also known as Psi) on the forward BWT.
    pub fn fl(&self, i: usize) -> usize {
        let c = self.f_at(i);
        self.bwt.select(i - self.f[c as usize], c).unwrap()
    }

    /// Inverse of LF on the reverse BWT.
    pub fn fl_rev(&self, i: usize) -> usize {
        let c = self.f_at(i);
        self.bwt_rev.select(i - self.f[c as usize], c).unwrap()
    }

    /// Character of row `i` in the first column F.
    fn f_at(&self, i: usize) -> u8 {
        debug_assert!(i < self.bwt_size());
        (self.f.partition_point(|&x| x <= i) - 1) as u8
    }

    /// Phi function: SA[i] from SA[i+1], through the run-boundary samples.
    ///
    /// The caller must not query the text position of SA[0] (= n - 1).
    pub fn phi(&self, i: usize) -> usize {
        debug_assert!(i != self.bwt_size() - 1);
        let k = self.first.predecessor_rank_circular(i);
        let q = self.first.select(k).unwrap();
        // circular distance from the strict predecessor
        let delta = if q < i { i - q } else { i + 1 };
        let run = self.first_to_run.get_int(k).unwrap();
        debug_assert!(run > 0);
        (self.samples_last.get_int(run - 1).unwrap() + delta) % self.bwt_size()
    }

    /// Phi inverse: SA[i] from SA[i-1].
    ///
    /// The caller must not query the text position of SA[n-1].
    pub fn phi_inverse(&self, i: usize) -> usize {
        debug_assert!(i != self.last_sa_val);
        let k = self.last.predecessor_rank_circular(i);
        let q = self.last.select(k).unwrap();
        let delta = if q < i { i - q } else { i + 1 };
        let run = self.last_to_run.get_int(k).unwrap();
        debug_assert!(run + 1 < self.number_of_runs(false));
        (self.samples_first.get_int(run + 1).unwrap() + delta) % self.bwt_size()
    }

    /// Returns the BWT range of the original (not remapped) character `c`.
    pub fn get_char_range(&self, c: u8) -> BwtRange {
        let c = self.alphabet.map(c) as usize;
        if c + 1 >= F_LEN || self.f[c + 1] <= self.f[c] {
            return BwtRange::EMPTY;
        }
        BwtRange {
            first: self.f[c],
            second: self.f[c + 1] - 1,
        }
    }

    /// Starts a fresh pattern matching the whole text.
    pub fn reset_pattern(&self) -> SearchState {
        SearchState {
            range: self.full_range(),
            p: 0,
            j: self.bwt_size() - 1,
            d: 0,
            range_rev: self.full_range(),
            p_rev: 0,
            j_rev: 0,
            d_rev: 0,
            len: 0,
        }
    }

    /// Extends the pattern P to cP, for an original character `c`.
    ///
    /// On success the state is updated and the new forward range returned;
    /// if cP does not occur, the state is left unchanged and the empty
    /// range is returned.
    pub fn left_extension(&self, state: &mut SearchState, c: u8) -> BwtRange {
        let c = self.alphabet.map(c);
        let prev = state.range;
        let range = self.lf_map(prev, c);
        if range.is_empty() {
            return BwtRange::EMPTY;
        }
        state.range = range;

        // occurrences of aP for every a lexicographically below c,
        // terminator included
        let mut acc = 0;
        for a in 1..c {
            acc += self.lf_map(prev, a).len();
        }
        state.range_rev = BwtRange {
            first: state.range_rev.first + acc,
            second: state.range_rev.first + acc + range.len() - 1,
        };

        if prev.len() != range.len() {
            // cP and aP both occur for some a != c: the old sample no
            // longer labels an occurrence of cP, take a fresh one from the
            // last c-run intersecting the previous range
            let rnk = self.bwt.rank(prev.second + 1, c).unwrap();
            debug_assert!(rnk > 0);
            let sel = self.bwt.select(rnk - 1, c).unwrap();
            debug_assert!(prev.contains(sel));
            let k = self.bwt.run_of_position(sel).unwrap();

            if self.bwt.at(prev.second) == Some(c) {
                state.j = self.samples_first.get_int(k).unwrap();
                match &self.inv_order_first {
                    Some(map) => {
                        let start = self.bwt.run_start(k).unwrap();
                        state.p = self.f[c as usize] + self.bwt.rank(start, c).unwrap();
                        state.p_rev = map.get_int(k).unwrap();
                    }
                    None => {
                        state.p = sel;
                        state.p_rev = self.inv_order.get_int(k).unwrap();
                    }
                }
            } else {
                state.j = self.samples_last.get_int(k).unwrap();
                state.p = if self.inv_order_first.is_some() {
                    self.f[c as usize] + rnk - 1
                } else {
                    sel
                };
                state.p_rev = self.inv_order.get_int(k).unwrap();
            }
            state.d = 0;
            state.j_rev = self.bwt_size() - 2 - state.j;
            state.d_rev = state.len;
        } else {
            // only c precedes P, the old sample still labels cP shifted by one
            state.d += 1;
        }
        state.len += 1;
        state.range
    }

    /// Extends the pattern P to Pc, for an original character `c`.
    pub fn right_extension(&self, state: &mut SearchState, c: u8) -> BwtRange {
        let c = self.alphabet.map(c);
        let prev = state.range_rev;
        let range_rev = self.lf_map_rev(prev, c);
        if range_rev.is_empty() {
            return BwtRange::EMPTY;
        }
        state.range_rev = range_rev;

        let mut acc = 0;
        for a in 1..c {
            acc += self.lf_map_rev(prev, a).len();
        }
        state.range = BwtRange {
            first: state.range.first + acc,
            second: state.range.first + acc + range_rev.len() - 1,
        };

        if prev.len() != range_rev.len() {
            let rnk = self.bwt_rev.rank(prev.second + 1, c).unwrap();
            debug_assert!(rnk > 0);
            let sel = self.bwt_rev.select(rnk - 1, c).unwrap();
            debug_assert!(prev.contains(sel));
            let k = self.bwt_rev.run_of_position(sel).unwrap();

            if self.bwt_rev.at(prev.second) == Some(c) {
                state.j_rev = self.samples_first_rev.get_int(k).unwrap();
                match &self.inv_order_rev_first {
                    Some(map) => {
                        let start = self.bwt_rev.run_start(k).unwrap();
                        state.p_rev = self.f[c as usize] + self.bwt_rev.rank(start, c).unwrap();
                        state.p = map.get_int(k).unwrap();
                    }
                    None => {
                        state.p_rev = sel;
                        state.p = self.inv_order_rev.get_int(k).unwrap();
                    }
                }
            } else {
                state.j_rev = self.samples_last_rev.get_int(k).unwrap();
                state.p_rev = if self.inv_order_rev_first.is_some() {
                    self.f[c as usize] + rnk - 1
                } else {
                    sel
                };
                state.p = self.inv_order_rev.get_int(k).unwrap();
            }
            state.d_rev = 0;
            state.j = self.bwt_size() - 2 - state.j_rev;
            state.d = state.len;
        } else {
            state.d_rev += 1;
        }
        state.len += 1;
        state.range
    }

    /// Locates every occurrence of the current pattern.
    pub fn locate(&self, state: &SearchState) -> Vec<usize> {
        self.locate_sample(&state.sample())
    }

    /// Locates every occurrence covered by a collected sample.
    pub fn locate_sample(&self, sample: &Sample) -> Vec<usize> {
        if sample.range.is_empty() {
            return vec![];
        }
        debug_assert!(sample.j >= sample.d);
        let sa = sample.j - sample.d;

        let mut out = VecDeque::with_capacity(sample.range.len());
        out.push_back(sa);
        match &self.plcp {
            Some(plcp) => {
                let mut pos = sa;
                while plcp.get(pos).unwrap() >= sample.len {
                    pos = self.phi(pos);
                    out.push_front(pos);
                }
                pos = sa;
                loop {
                    if pos == self.last_sa_val {
                        break;
                    }
                    pos = self.phi_inverse(pos);
                    if plcp.get(pos).unwrap() < sample.len {
                        break;
                    }
                    out.push_back(pos);
                }
            }
            None => {
                // no PLCP stored: recover the row of `sa` by LF-walking from
                // the exact anchor, then split the Phi walks by row arithmetic
                let mut row = sample.p;
                for _ in 0..sample.d {
                    row = self.lf(row);
                }
                debug_assert!(sample.range.contains(row));
                let mut pos = sa;
                for _ in sample.range.first..row {
                    pos = self.phi(pos);
                    out.push_front(pos);
                }
                pos = sa;
                for _ in row..sample.range.second {
                    pos = self.phi_inverse(pos);
                    out.push_back(pos);
                }
            }
        }
        out.into()
    }

    /// Returns BWT[i] (or BWT^R[i]) as an original character; the
    /// terminator maps to byte 0.
    pub fn bwt_at(&self, i: usize, reversed: bool) -> Option<u8> {
        let bwt = if reversed { &self.bwt_rev } else { &self.bwt };
        bwt.at(i).map(|c| self.alphabet.unmap(c))
    }

    /// Returns the number of BWT runs.
    pub fn number_of_runs(&self, reversed: bool) -> usize {
        if reversed {
            self.bwt_rev.number_of_runs()
        } else {
            self.bwt.number_of_runs()
        }
    }

    /// Returns the position of the terminator symbol in the BWT.
    pub fn get_terminator_position(&self, reversed: bool) -> usize {
        if reversed {
            self.terminator_pos_rev
        } else {
            self.terminator_pos
        }
    }

    /// Returns the BWT as original characters; the terminator maps to byte 0.
    pub fn get_bwt(&self, reversed: bool) -> Vec<u8> {
        let bwt = if reversed { &self.bwt_rev } else { &self.bwt };
        bwt.to_bytes().iter().map(|&c| self.alphabet.unmap(c)).collect()
    }

    /// Returns the length of the indexed text.
    pub fn text_size(&self) -> usize {
        self.bwt.len() - 1
    }

    /// Returns the length of the BWT (text plus terminator).
    pub fn bwt_size(&self) -> usize {
        self.bwt.len()
    }

    /// Returns the alphabet remap of the indexed text.
    pub fn alphabet(&self) -> &AlphabetMap {
        &self.alphabet
    }

    /// Checks if the index stores the permuted LCP.
    pub fn has_plcp(&self) -> bool {
        self.plcp.is_some()
    }

    /// Writes the index to `path_prefix` + ".brin" and returns the path.
    pub fn save(&self, path_prefix: impl AsRef<Path>) -> Result<PathBuf> {
        let mut os = path_prefix.as_ref().as_os_str().to_os_string();
        os.push(".");
        os.push(INDEX_EXTENSION);
        let path = PathBuf::from(os);
        let mut writer = BufWriter::new(
            File::create(&path).map_err(|e| anyhow!("cannot create {}: {e}", path.display()))?,
        );
        self.serialize_into(&mut writer)?;
        Ok(path)
    }

    /// Reads an index back from a file written by [`Self::save()`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path).map_err(|e| anyhow!("cannot open {}: {e}", path.display()))?,
        );
        Self::deserialize_from(reader)
    }

    /// Returns the per-component space breakdown.
    pub fn space(&self) -> SpaceBreakdown {
        let mut entries = vec![
            ("alphabet", self.alphabet.size_in_bytes()),
            ("F", self.f.size_in_bytes()),
            ("bwt", self.bwt.size_in_bytes()),
            ("bwt_rev", self.bwt_rev.size_in_bytes()),
            ("samples_first", self.samples_first.size_in_bytes()),
            ("samples_last", self.samples_last.size_in_bytes()),
            ("inv_order", self.inv_order.size_in_bytes()),
            ("first", self.first.size_in_bytes()),
            ("first_to_run", self.first_to_run.size_in_bytes()),
            ("last", self.last.size_in_bytes()),
            ("last_to_run", self.last_to_run.size_in_bytes()),
            ("samples_first_rev", self.samples_first_rev.size_in_bytes()),
            ("samples_last_rev", self.samples_last_rev.size_in_bytes()),
            ("inv_order_rev", self.inv_order_rev.size_in_bytes()),
        ];
        if let Some(map) = &self.inv_order_first {
            entries.push(("inv_order_first", map.size_in_bytes()));
        }
        if let Some(map) = &self.inv_order_rev_first {
            entries.push(("inv_order_rev_first", map.size_in_bytes()));
        }
        if let Some(plcp) = &self.plcp {
            entries.push(("plcp", plcp.size_in_bytes()));
        }
        SpaceBreakdown {
            text_size: self.text_size(),
            sigma: self.alphabet.sigma(),
            runs: self.number_of_runs(false),
            runs_rev: self.number_of_runs(true),
            entries,
        }
    }
}

/// Component-by-component size report, printable by the CLI.
#[derive(Debug, Clone)]
pub struct SpaceBreakdown {
    pub text_size: usize,
    pub sigma: usize,
    pub runs: usize,
    pub runs_rev: usize,
    pub entries: Vec<(&'static str, usize)>,
}

impl SpaceBreakdown {
    /// Returns the total number of bytes across components.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|&(_, bytes)| bytes).sum()
    }
}

impl fmt::Display for SpaceBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "text length           : {}", self.text_size)?;
        writeln!(f, "alphabet size         : {}", self.sigma)?;
        writeln!(f, "number of runs in bwt : {}", self.runs)?;
        writeln!(f, "number of runs in bwtR: {}", self.runs_rev)?;
        for &(name, bytes) in &self.entries {
            writeln!(f, "{name:<22}: {bytes} bytes")?;
        }
        write!(f, "<total space of br-index>: {} bytes", self.total())
    }
}

impl Serializable for BrIndex {
    fn serialize_into<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut mem = self.alphabet.serialize_into(&mut writer)?;
        mem += self.terminator_pos.serialize_into(&mut writer)?;
        mem += self.terminator_pos_rev.serialize_into(&mut writer)?;
        mem += self.last_sa_val.serialize_into(&mut writer)?;
        mem += self.f.serialize_into(&mut writer)?;
        mem += self.bwt.serialize_into(&mut writer)?;
        mem += self.bwt_rev.serialize_into(&mut writer)?;
        mem += self.samples_first.serialize_into(&mut writer)?;
        mem += self.samples_last.serialize_into(&mut writer)?;
        mem += self.inv_order.serialize_into(&mut writer)?;
        mem += self.inv_order_first.serialize_into(&mut writer)?;
        mem += self.first.serialize_into(&mut writer)?;
        mem += self.first_to_run.serialize_into(&mut writer)?;
        mem += self.last.serialize_into(&mut writer)?;
        mem += self.last_to_run.serialize_into(&mut writer)?;
        mem += self.samples_first_rev.serialize_into(&mut writer)?;
        mem += self.samples_last_rev.serialize_into(&mut writer)?;
        mem += self.inv_order_rev.serialize_into(&mut writer)?;
        mem += self.inv_order_rev_first.serialize_into(&mut writer)?;
        mem += self.plcp.serialize_into(&mut writer)?;
        Ok(mem)
    }

    fn deserialize_from<R: Read>(mut reader: R) -> Result<Self> {
        let alphabet = AlphabetMap::deserialize_from(&mut reader)?;
        let terminator_pos = usize::deserialize_from(&mut reader)?;
        let terminator_pos_rev = usize::deserialize_from(&mut reader)?;
        let last_sa_val = usize::deserialize_from(&mut reader)?;
        let f = Vec::<usize>::deserialize_from(&mut reader)?;
        let bwt = RleString::deserialize_from(&mut reader)?;
        let bwt_rev = RleString::deserialize_from(&mut reader)?;
        let samples_first = CompactVector::deserialize_from(&mut reader)?;
        let samples_last = CompactVector::deserialize_from(&mut reader)?;
        let inv_order = CompactVector::deserialize_from(&mut reader)?;
        let inv_order_first = Option::<CompactVector>::deserialize_from(&mut reader)?;
        let first = SparseBitVector::deserialize_from(&mut reader)?;
        let first_to_run = CompactVector::deserialize_from(&mut reader)?;
        let last = SparseBitVector::deserialize_from(&mut reader)?;
        let last_to_run = CompactVector::deserialize_from(&mut reader)?;
        let samples_first_rev = CompactVector::deserialize_from(&mut reader)?;
        let samples_last_rev = CompactVector::deserialize_from(&mut reader)?;
        let inv_order_rev = CompactVector::deserialize_from(&mut reader)?;
        let inv_order_rev_first = Option::<CompactVector>::deserialize_from(&mut reader)?;
        let plcp = Option::<Plcp>::deserialize_from(&mut reader)?;
        Ok(Self {
            alphabet,
            f,
            bwt,
            bwt_rev,
            terminator_pos,
            terminator_pos_rev,
            last_sa_val,
            samples_first,
            samples_last,
            inv_order,
            inv_order_first,
            first,
            first_to_run,
            last,
            last_to_run,
            samples_first_rev,
            samples_last_rev,
            inv_order_rev,
            inv_order_rev_first,
            plcp,
        })
    }

    fn size_in_bytes(&self) -> usize {
        self.alphabet.size_in_bytes()
            + self.terminator_pos.size_in_bytes()
            + self.terminator_pos_rev.size_in_bytes()
            + self.last_sa_val.size_in_bytes()
            + self.f.size_in_bytes()
            + self.bwt.size_in_bytes()
            + self.bwt_rev.size_in_bytes()
            + self.samples_first.size_in_bytes()
            + self.samples_last.size_in_bytes()
            + self.inv_order.size_in_bytes()
            + self.inv_order_first.size_in_bytes()
            + self.first.size_in_bytes()
            + self.first_to_run.size_in_bytes()
            + self.last.size_in_bytes()
            + self.last_to_run.size_in_bytes()
            + self.samples_first_rev.size_in_bytes()
            + self.samples_last_rev.size_in_bytes()
            + self.inv_order_rev.size_in_bytes()
            + self.inv_order_rev_first.size_in_bytes()
            + self.plcp.size_in_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn build_both(text: &[u8]) -> Vec<BrIndex> {
        let plcp = BrIndex::build(
            text,
            &BuildOptions {
                algorithm: SaAlgorithm::Sais,
                with_plcp: true,
            },
        )
        .unwrap();
        let nplcp = BrIndex::build(
            text,
            &BuildOptions {
                algorithm: SaAlgorithm::Sais,
                with_plcp: false,
            },
        )
        .unwrap();
        vec![plcp, nplcp]
    }

    fn naive_occurrences(text: &[u8], pattern: &[u8]) -> Vec<usize> {
        if pattern.is_empty() || pattern.len() > text.len() {
            return vec![];
        }
        (0..=text.len() - pattern.len())
            .filter(|&i| &text[i..i + pattern.len()] == pattern)
            .collect()
    }

    fn extend_left_all(index: &BrIndex, pattern: &[u8]) -> (SearchState, bool) {
        let mut state = index.reset_pattern();
        for &c in pattern.iter().rev() {
            if index.left_extension(&mut state, c).is_empty() {
                return (state, false);
            }
        }
        (state, true)
    }

    fn assert_pattern(index: &BrIndex, text: &[u8], pattern: &[u8]) {
        let expected = naive_occurrences(text, pattern);
        let (state, found) = extend_left_all(index, pattern);
        if !found {
            assert!(expected.is_empty(), "pattern {:?} dropped early", pattern);
            return;
        }
        assert_eq!(state.count(), expected.len(), "count of {:?}", pattern);
        assert_eq!(
            state.range().len(),
            state.range_rev().len(),
            "range sizes of {:?}",
            pattern
        );
        let mut occ = index.locate(&state);
        occ.sort_unstable();
        assert_eq!(occ, expected, "locate of {:?}", pattern);
    }

    fn reference_sa(text_with_term: &[u8]) -> Vec<usize> {
        let mut sa: Vec<usize> = (0..text_with_term.len()).collect();
        sa.sort_by(|&a, &b| text_with_term[a..].cmp(&text_with_term[b..]));
        sa
    }

    #[test]
    fn test_build_rejections() {
        assert!(BrIndex::build(b"", &BuildOptions::new()).is_err());
        assert!(BrIndex::build(b"ab\x00", &BuildOptions::new()).is_err());
        assert!(BrIndex::build(b"ab\x01", &BuildOptions::new()).is_err());
    }

    #[test]
    fn test_mississippi_scenario() {
        for index in build_both(b"mississippi") {
            assert_eq!(index.text_size(), 11);
            assert_eq!(index.bwt_size(), 12);
            assert_eq!(index.get_char_range(b'i').len(), 4);

            let mut state = index.reset_pattern();
            assert_eq!(index.left_extension(&mut state, b'i'), index.get_char_range(b'i'));
            assert!(!index.left_extension(&mut state, b's').is_empty());
            assert_eq!(state.count(), 2); // "si"
            assert!(!index.left_extension(&mut state, b's').is_empty());
            assert_eq!(state.count(), 2); // "ssi"
            assert!(!index.left_extension(&mut state, b'i').is_empty());
            assert_eq!(state.count(), 2); // "issi"
            assert_eq!(state.pattern_length(), 4);

            let mut occ = index.locate(&state);
            occ.sort_unstable();
            assert_eq!(occ, vec![1, 4]);
        }
    }

    #[test]
    fn test_mississippi_bwt() {
        for index in build_both(b"mississippi") {
            // BWT(mississippi$) with the terminator reported as byte 0
            assert_eq!(index.get_bwt(false), b"ipssm\x00pissii".to_vec());
            assert_eq!(index.get_terminator_position(false), 5);
            assert_eq!(index.bwt_at(5, false), Some(0));
            assert_eq!(index.bwt_at(0, false), Some(b'i'));
            assert_eq!(index.number_of_runs(false), 9);
        }
    }

    #[test]
    fn test_abracadabra_scenario() {
        for index in build_both(b"abracadabra") {
            assert_pattern(&index, b"abracadabra", b"abra");
        }
    }

    #[test]
    fn test_banana_scenario() {
        for index in build_both(b"banana") {
            assert_pattern(&index, b"banana", b"ana");
        }
    }

    #[test]
    fn test_aaaaaa_scenario() {
        for index in build_both(b"aaaaaa") {
            assert_pattern(&index, b"aaaaaa", b"aa");
            let (state, found) = extend_left_all(&index, b"aa");
            assert!(found);
            assert_eq!(state.count(), 5);
        }
    }

    #[test]
    fn test_pattern_equals_text() {
        for text in [&b"mississippi"[..], b"abracadabra", b"aaaaaa"] {
            for index in build_both(text) {
                assert_pattern(&index, text, text);
            }
        }
    }

    #[test]
    fn test_absent_characters() {
        for index in build_both(b"mississippi") {
            let (state, found) = extend_left_all(&index, b"xyz");
            assert!(!found);
            // state untouched by the failed extension
            assert_eq!(state.count(), index.bwt_size());

            // reserved bytes remap to 0 and yield empty ranges
            let mut state = index.reset_pattern();
            assert!(index.left_extension(&mut state, 0).is_empty());
            assert!(index.left_extension(&mut state, 1).is_empty());
            assert!(index.right_extension(&mut state, 0).is_empty());
            assert_eq!(state.pattern_length(), 0);
            assert!(index.get_char_range(0).is_empty());
        }
    }

    #[test]
    fn test_char_ranges() {
        let text = b"abracadabra";
        for index in build_both(text) {
            for c in 0u8..=255 {
                let expected = naive_occurrences(text, &[c]).len();
                assert_eq!(index.get_char_range(c).len(), expected, "char {c}");
            }
        }
    }

    #[test]
    fn test_lf_fl_inverse() {
        for index in build_both(b"abracadabra") {
            let n = index.bwt_size();
            for i in 0..n {
                assert_eq!(index.fl(index.lf(i)), i);
                assert_eq!(index.lf(index.fl(i)), i);
                assert_eq!(index.fl_rev(index.lf_rev(i)), i);
                assert_eq!(index.lf_rev(index.fl_rev(i)), i);
            }
        }
    }

    #[test]
    fn test_phi_against_reference() {
        for text in [&b"banana"[..], b"mississippi", b"aaaaaa", b"abracadabra"] {
            let mut t = text.to_vec();
            t.push(1);
            let sa = reference_sa(&t);
            let n = t.len();
            for index in build_both(text) {
                for i in 1..n {
                    assert_eq!(index.phi(sa[i]), sa[i - 1], "Phi(SA[{i}])");
                }
                for i in 0..n - 1 {
                    assert_eq!(index.phi_inverse(sa[i]), sa[i + 1], "PhiI(SA[{i}])");
                }
                // composed walks cycle the whole SA
                let mut pos = sa[n - 1];
                for i in (0..n - 1).rev() {
                    pos = index.phi(pos);
                    assert_eq!(pos, sa[i]);
                }
                for i in 1..n {
                    pos = index.phi_inverse(pos);
                    assert_eq!(pos, sa[i]);
                }
            }
        }
    }

    #[test]
    fn test_run_samples_against_reference() {
        let text = b"mississippi";
        let mut t: Vec<u8> = Vec::new();
        for index in build_both(text) {
            t.clear();
            t.extend(text.iter().map(|&b| index.alphabet.map(b)));
            t.push(TERMINATOR);
            let sa = reference_sa(&t);
            let n = t.len();
            let bwt_of = |i: usize| if sa[i] > 0 { t[sa[i] - 1] } else { TERMINATOR };

            let mut run = 0;
            for i in 0..n {
                if i > 0 && bwt_of(i) != bwt_of(i - 1) {
                    run += 1;
                }
                let sample = |x: usize| if x > 0 { x - 1 } else { n - 1 };
                if i == 0 || bwt_of(i) != bwt_of(i - 1) {
                    assert_eq!(index.samples_first.get_int(run), Some(sample(sa[i])));
                }
                if i + 1 == n || bwt_of(i) != bwt_of(i + 1) {
                    assert_eq!(index.samples_last.get_int(run), Some(sample(sa[i])));
                }
            }
            assert_eq!(run + 1, index.number_of_runs(false));
            assert_eq!(index.last_sa_val, sa[n - 1]);
        }
    }

    #[test]
    fn test_right_extension_matches_left() {
        let text = b"mississippi";
        for index in build_both(text) {
            let (left_state, found) = extend_left_all(&index, b"issi");
            assert!(found);

            let mut state = index.reset_pattern();
            for &c in b"issi" {
                assert!(!index.right_extension(&mut state, c).is_empty());
            }
            assert_eq!(state.range(), left_state.range());
            assert_eq!(state.count(), 2);
            let mut occ = index.locate(&state);
            occ.sort_unstable();
            assert_eq!(occ, vec![1, 4]);
        }
    }

    #[test]
    fn test_mixed_extension_orders() {
        let mut rng = ChaChaRng::seed_from_u64(41);
        let texts: [&[u8]; 3] = [b"mississippi", b"abracadabra", b"aabaabaabaab"];
        for text in texts {
            let indexes = build_both(text);
            for _ in 0..40 {
                let len = rng.gen_range(1..=6.min(text.len()));
                let start = rng.gen_range(0..=text.len() - len);
                let pattern = &text[start..start + len];

                // random split and interleaving spelling the same pattern
                let split = rng.gen_range(0..=len);
                let mut ops: Vec<bool> = (0..len).map(|i| i < split).collect();
                for i in (1..ops.len()).rev() {
                    let j = rng.gen_range(0..=i);
                    ops.swap(i, j);
                }

                for index in &indexes {
                    let (left_state, found) = extend_left_all(index, pattern);
                    let mut state = index.reset_pattern();
                    let (mut lo, mut hi) = (split, split);
                    let mut ok = true;
                    for &is_left in &ops {
                        let range = if is_left {
                            lo -= 1;
                            index.left_extension(&mut state, pattern[lo])
                        } else {
                            hi += 1;
                            index.right_extension(&mut state, pattern[hi - 1])
                        };
                        if range.is_empty() {
                            ok = false;
                            break;
                        }
                    }
                    assert_eq!(ok, found, "pattern {:?}", pattern);
                    if !found {
                        continue;
                    }
                    assert_eq!(state.range(), left_state.range(), "pattern {:?}", pattern);
                    let mut occ = index.locate(&state);
                    occ.sort_unstable();
                    let mut expected = index.locate(&left_state);
                    expected.sort_unstable();
                    assert_eq!(occ, expected, "pattern {:?}", pattern);
                }
            }
        }
    }

    #[test]
    fn test_counts_against_naive_random() {
        let mut rng = ChaChaRng::seed_from_u64(42);
        for sigma in [2u8, 4, 8] {
            for _ in 0..4 {
                let text: Vec<u8> = (0..rng.gen_range(20..200))
                    .map(|_| b'a' + rng.gen_range(0..sigma))
                    .collect();
                for index in build_both(&text) {
                    for _ in 0..30 {
                        let len = rng.gen_range(1..=8);
                        let pattern: Vec<u8> = (0..len)
                            .map(|_| b'a' + rng.gen_range(0..sigma + 1)) // sometimes absent
                            .collect();
                        assert_pattern(&index, &text, &pattern);
                    }
                }
            }
        }
    }

    #[test]
    fn test_backends_agree() {
        let text = b"abracadabra";
        let sais = BrIndex::build(
            text,
            &BuildOptions {
                algorithm: SaAlgorithm::Sais,
                with_plcp: true,
            },
        )
        .unwrap();
        let doubling = BrIndex::build(
            text,
            &BuildOptions {
                algorithm: SaAlgorithm::Doubling,
                with_plcp: true,
            },
        )
        .unwrap();
        assert_eq!(sais, doubling);
    }

    #[test]
    fn test_serialize_roundtrip() {
        for index in build_both(b"mississippi") {
            let mut bytes = vec![];
            let size = index.serialize_into(&mut bytes).unwrap();
            assert_eq!(size, bytes.len());
            assert_eq!(size, index.size_in_bytes());
            let other = BrIndex::deserialize_from(&bytes[..]).unwrap();
            assert_eq!(index, other);

            // the reloaded index answers queries identically
            assert_pattern(&other, b"mississippi", b"issi");
            assert_pattern(&other, b"mississippi", b"ssi");
            assert_pattern(&other, b"mississippi", b"mississippi");
        }
    }

    #[test]
    fn test_save_load() {
        let index = BrIndex::build(b"abracadabra", &BuildOptions::new()).unwrap();
        let prefix = std::env::temp_dir().join("br_index_save_load_test");
        let path = index.save(&prefix).unwrap();
        assert_eq!(path.extension().unwrap(), INDEX_EXTENSION);
        let other = BrIndex::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(index, other);
    }

    #[test]
    fn test_space_breakdown() {
        let index = BrIndex::build(b"mississippi", &BuildOptions::new()).unwrap();
        let space = index.space();
        assert!(space.total() > 0);
        assert!(space.entries.iter().any(|&(name, _)| name == "plcp"));
        let report = space.to_string();
        assert!(report.contains("number of runs in bwt"));
    }

    #[test]
    fn test_single_character_text() {
        for index in build_both(b"z") {
            assert_pattern(&index, b"z", b"z");
            assert_pattern(&index, b"z", b"a");
            assert_eq!(index.number_of_runs(false), 2);
        }
    }
}
