//! Suffix-array construction for terminator-padded texts.
//!
//! The index treats suffix sorting as a black box returning the suffix array
//! and its inverse. Two backends share the contract: full recursive SA-IS
//! (induced sorting) and a prefix-doubling sorter kept as the simple
//! fallback. Inputs must end with a unique minimal terminator byte.
#![cfg(target_pointer_width = "64")]

const EMPTY: usize = usize::MAX;

/// Suffix-sorting backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaAlgorithm {
    /// Linear-time induced sorting.
    #[default]
    Sais,
    /// O(n log^2 n) prefix doubling.
    Doubling,
}

/// Returns the suffix array and inverse suffix array of `text`.
///
/// The caller must guarantee that the last byte of `text` is strictly
/// smaller than every other byte and occurs exactly once.
pub fn build_sa_and_isa(text: &[u8], algorithm: SaAlgorithm) -> (Vec<usize>, Vec<usize>) {
    debug_assert!(!text.is_empty());
    debug_assert!({
        let last = *text.last().unwrap();
        text[..text.len() - 1].iter().all(|&c| c > last)
    });
    let sa = match algorithm {
        SaAlgorithm::Sais => {
            let s: Vec<usize> = text.iter().map(|&c| c as usize).collect();
            sais(&s, 256)
        }
        SaAlgorithm::Doubling => doubling(text),
    };
    let mut isa = vec![0usize; sa.len()];
    for (i, &x) in sa.iter().enumerate() {
        isa[x] = i;
    }
    (sa, isa)
}

fn bucket_heads(counts: &[usize]) -> Vec<usize> {
    let mut heads = vec![0; counts.len()];
    let mut sum = 0;
    for (c, &cnt) in counts.iter().enumerate() {
        heads[c] = sum;
        sum += cnt;
    }
    heads
}

fn bucket_tails(counts: &[usize]) -> Vec<usize> {
    let mut tails = vec![0; counts.len()];
    let mut sum = 0;
    for (c, &cnt) in counts.iter().enumerate() {
        sum += cnt;
        tails[c] = sum;
    }
    tails
}

#[inline(always)]
fn is_lms(stype: &[bool], i: usize) -> bool {
    i > 0 && stype[i] && !stype[i - 1]
}

/// Compares two LMS substrings (from an LMS position up to the next LMS
/// position, inclusive). The unique sentinel stops every comparison before
/// it can run past the end.
fn lms_substrings_equal(s: &[usize], stype: &[bool], a: usize, b: usize) -> bool {
    let mut i = 0;
    loop {
        let a_end = i > 0 && is_lms(stype, a + i);
        let b_end = i > 0 && is_lms(stype, b + i);
        if a_end && b_end {
            return true;
        }
        if a_end != b_end || s[a + i] != s[b + i] {
            return false;
        }
        i += 1;
    }
}

/// Induces L-type then S-type suffixes from the seeded LMS positions.
fn induce(sa: &mut [usize], s: &[usize], stype: &[bool], counts: &[usize]) {
    let n = s.len();
    let mut heads = bucket_heads(counts);
    for idx in 0..n {
        let i = sa[idx];
        if i != EMPTY && i > 0 && !stype[i - 1] {
            let c = s[i - 1];
            sa[heads[c]] = i - 1;
            heads[c] += 1;
        }
    }
    let mut tails = bucket_tails(counts);
    for idx in (0..n).rev() {
        let i = sa[idx];
        if i != EMPTY && i > 0 && stype[i - 1] {
            let c = s[i - 1];
            tails[c] -= 1;
            sa[tails[c]] = i - 1;
        }
    }
}

fn sais(s: &[usize], sigma: usize) -> Vec<usize> {
    let n = s.len();
    if n == 0 {
        return vec![];
    }
    if n == 1 {
        return vec![0];
    }

    // suffix types, true = S-type
    let mut stype = vec![false; n];
    stype[n - 1] = true;
    for i in (0..n - 1).rev() {
        stype[i] = s[i] < s[i + 1] || (s[i] == s[i + 1] && stype[i + 1]);
    }

    let mut counts = vec![0usize; sigma];
    for &c in s {
        counts[c] += 1;
    }

    // first round: seed LMS suffixes in any in-bucket order and induce,
    // which sorts them by LMS substring
    let mut sa = vec![EMPTY; n];
    let mut tails = bucket_tails(&counts);
    for i in (1..n).rev() {
        if is_lms(&stype, i) {
            tails[s[i]] -= 1;
            sa[tails[s[i]]] = i;
        }
    }
    induce(&mut sa, s, &stype, &counts);

    // name LMS substrings in their induced order
    let mut names = vec![EMPTY; n];
    let mut name = 0;
    let mut prev = EMPTY;
    for idx in 0..n {
        let i = sa[idx];
        if i == EMPTY || !is_lms(&stype, i) {
            continue;
        }
        if prev != EMPTY && !lms_substrings_equal(s, &stype, prev, i) {
            name += 1;
        }
        names[i] = name;
        prev = i;
    }
    let num_names = name + 1;

    let lms_positions: Vec<usize> = (1..n).filter(|&i| is_lms(&stype, i)).collect();
    let ordered: Vec<usize> = if num_names < lms_positions.len() {
        // names collide: sort the reduced string recursively
        let reduced: Vec<usize> = lms_positions.iter().map(|&i| names[i]).collect();
        let rsa = sais(&reduced, num_names);
        rsa.iter().map(|&r| lms_positions[r]).collect()
    } else {
        sa.iter().copied().filter(|&i| i != EMPTY && is_lms(&stype, i)).collect()
    };

    // final round: seed the now-sorted LMS suffixes and induce
    sa.fill(EMPTY);
    let mut tails = bucket_tails(&counts);
    for &i in ordered.iter().rev() {
        tails[s[i]] -= 1;
        sa[tails[s[i]]] = i;
    }
    induce(&mut sa, s, &stype, &counts);
    sa
}

fn doubling(text: &[u8]) -> Vec<usize> {
    let n = text.len();
    let mut sa: Vec<usize> = (0..n).collect();
    let mut rank: Vec<usize> = text.iter().map(|&c| c as usize).collect();
    let mut k = 1;
    while k < n {
        sa.sort_by_key(|&i| (rank[i], rank.get(i + k).copied()));
        let mut next = vec![0usize; n];
        for w in 1..n {
            let prev_key = (rank[sa[w - 1]], rank.get(sa[w - 1] + k).copied());
            let cur_key = (rank[sa[w]], rank.get(sa[w] + k).copied());
            next[sa[w]] = next[sa[w - 1]] + (cur_key != prev_key) as usize;
        }
        let done = next[sa[n - 1]] == n - 1;
        rank = next;
        if done {
            break;
        }
        k *= 2;
    }
    sa
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn naive_sa(text: &[u8]) -> Vec<usize> {
        let mut sa: Vec<usize> = (0..text.len()).collect();
        sa.sort_by(|&a, &b| text[a..].cmp(&text[b..]));
        sa
    }

    fn with_terminator(text: &[u8]) -> Vec<u8> {
        let mut t = text.to_vec();
        t.push(1);
        t
    }

    fn test_both_backends(text: &[u8]) {
        let t = with_terminator(text);
        let expected = naive_sa(&t);
        for algorithm in [SaAlgorithm::Sais, SaAlgorithm::Doubling] {
            let (sa, isa) = build_sa_and_isa(&t, algorithm);
            assert_eq!(sa, expected, "{algorithm:?} on {:?}", text);
            for (i, &x) in sa.iter().enumerate() {
                assert_eq!(isa[x], i);
            }
        }
    }

    #[test]
    fn test_classic_texts() {
        test_both_backends(b"mississippi");
        test_both_backends(b"abracadabra");
        test_both_backends(b"banana");
        test_both_backends(b"aaaaaa");
        test_both_backends(b"a");
        test_both_backends(b"ab");
        test_both_backends(b"ba");
    }

    #[test]
    fn test_repetitive() {
        test_both_backends(b"abababababababababab");
        test_both_backends(b"aabaabaabaabaabaab");
        test_both_backends(&b"tcgatcga".repeat(40));
    }

    #[test]
    fn test_random_small_alphabet() {
        let mut rng = ChaChaRng::seed_from_u64(31);
        for len in [2, 3, 7, 50, 500] {
            for _ in 0..20 {
                let text: Vec<u8> = (0..len).map(|_| b'a' + rng.gen_range(0..3)).collect();
                test_both_backends(&text);
            }
        }
    }

    #[test]
    fn test_random_wide_alphabet() {
        let mut rng = ChaChaRng::seed_from_u64(32);
        let text: Vec<u8> = (0..300).map(|_| rng.gen_range(2u8..=255)).collect();
        test_both_backends(&text);
    }
}
