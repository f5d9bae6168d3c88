//! Pattern-file readers for the query tools.
//!
//! FASTA and FASTQ inputs yield each read together with its reverse
//! complement, so nucleotide patterns are searched on both strands; any
//! other file is read as plain text with one pattern per line.
#![cfg(target_pointer_width = "64")]

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Result};

/// One pattern to search, with the identifier it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternRecord {
    pub id: String,
    pub seq: Vec<u8>,
}

/// Returns the complement of a nucleotide, leaving other bytes unchanged.
#[inline]
fn complement(b: u8) -> u8 {
    match b {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        other => other,
    }
}

/// Computes the reverse complement of a nucleotide sequence.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// Reads the patterns of `path`, dispatching on the file extension:
/// `.fa`/`.fasta` as FASTA, `.fq`/`.fastq` as FASTQ (both with
/// reverse-complement mates), anything else one pattern per line.
pub fn read_patterns(path: impl AsRef<Path>) -> Result<Vec<PatternRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(
        File::open(path).map_err(|e| anyhow!("cannot open {}: {e}", path.display()))?,
    );
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("fa") | Some("fasta") => read_fasta(reader),
        Some("fq") | Some("fastq") => read_fastq(reader),
        _ => read_plain(reader),
    }
}

fn push_with_mate(records: &mut Vec<PatternRecord>, id: String, seq: Vec<u8>) {
    let rc = reverse_complement(&seq);
    records.push(PatternRecord { id: id.clone(), seq });
    records.push(PatternRecord {
        id: format!("{id}/rc"),
        seq: rc,
    });
}

fn read_fasta<R: BufRead>(reader: R) -> Result<Vec<PatternRecord>> {
    let mut records = vec![];
    let mut id = String::new();
    let mut seq: Vec<u8> = vec![];
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if line.starts_with('>') || line.starts_with('@') {
            if !id.is_empty() {
                push_with_mate(&mut records, std::mem::take(&mut id), std::mem::take(&mut seq));
            }
            id = line[1..].to_string();
        } else {
            seq.extend_from_slice(line.as_bytes());
        }
    }
    if !id.is_empty() {
        push_with_mate(&mut records, id, seq);
    }
    Ok(records)
}

fn read_fastq<R: BufRead>(reader: R) -> Result<Vec<PatternRecord>> {
    let mut records = vec![];
    let mut lines = reader.lines();
    while let Some(id) = lines.next() {
        let id = id?;
        if id.is_empty() {
            continue;
        }
        let seq = lines
            .next()
            .ok_or_else(|| anyhow!("truncated FASTQ record after {id:?}"))??;
        let plus = lines
            .next()
            .ok_or_else(|| anyhow!("truncated FASTQ record after {id:?}"))??;
        let _qual = lines
            .next()
            .ok_or_else(|| anyhow!("truncated FASTQ record after {id:?}"))??;
        if !id.starts_with('@') || !plus.starts_with('+') {
            return Err(anyhow!("file does not appear to be in FASTQ format."));
        }
        push_with_mate(&mut records, id[1..].to_string(), seq.into_bytes());
    }
    Ok(records)
}

fn read_plain<R: BufRead>(reader: R) -> Result<Vec<PatternRecord>> {
    let mut records = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        records.push(PatternRecord {
            id: format!("pattern-{}", i + 1),
            seq: line.into_bytes(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(reverse_complement(b"AACG"), b"CGTT".to_vec());
        assert_eq!(reverse_complement(b"acgtN"), b"Nacgt".to_vec());
        assert_eq!(reverse_complement(reverse_complement(b"GATTACA").as_slice()), b"GATTACA".to_vec());
    }

    #[test]
    fn test_fasta() {
        let input = b">read1\nACGT\nAC\n\n>read2\nTTT\n" as &[u8];
        let records = read_fasta(BufReader::new(input)).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].id, "read1");
        assert_eq!(records[0].seq, b"ACGTAC".to_vec());
        assert_eq!(records[1].id, "read1/rc");
        assert_eq!(records[1].seq, b"GTACGT".to_vec());
        assert_eq!(records[2].id, "read2");
        assert_eq!(records[2].seq, b"TTT".to_vec());
        assert_eq!(records[3].seq, b"AAA".to_vec());
    }

    #[test]
    fn test_fastq() {
        let input = b"@r1\nACGT\n+\nIIII\n@r2\nGGA\n+\nIII\n" as &[u8];
        let records = read_fastq(BufReader::new(input)).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].seq, b"ACGT".to_vec());
        assert_eq!(records[1].seq, b"ACGT".to_vec());
        assert_eq!(records[2].seq, b"GGA".to_vec());
        assert_eq!(records[3].seq, b"TCC".to_vec());
    }

    #[test]
    fn test_fastq_errors() {
        let truncated = b"@r1\nACGT\n+\n" as &[u8];
        assert!(read_fastq(BufReader::new(truncated)).is_err());
        let wrong = b"r1\nACGT\n+\nIIII\n" as &[u8];
        assert!(read_fastq(BufReader::new(wrong)).is_err());
    }

    #[test]
    fn test_plain() {
        let input = b"issi\n\nabra\n" as &[u8];
        let records = read_plain(BufReader::new(input)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].seq, b"issi".to_vec());
        assert_eq!(records[1].seq, b"abra".to_vec());
    }
}
