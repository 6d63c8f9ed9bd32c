//! # GenBank Record Scanning
//!
//! Convenience layer over the extractor -> index pipeline for GenBank-style
//! annotated files, where sequence data lies between a line containing
//! `ORIGIN` and a terminator line starting with `//`:
//!
//! ```text
//! ORIGIN
//!         1 gatcctccat atacaacggt atctccacct caggtttaga tctcaacaac
//!        61 ggaaccattg ccgacatgag acagttaggt atcgtcgaga gttacaagct
//! //
//! ```
//!
//! Everything outside an ORIGIN span is ignored. Line offsets and spaces
//! inside the span are skipped by the extractor itself (they classify as
//! `Other`). The extraction window resets at each record boundary so k-mers
//! never bridge two records. Multiple records per file are supported;
//! multiple files are not (one index, one input stream per call).

use std::io::BufRead;

use eyre::{Result, WrapErr};
use tracing::debug;

use crate::btree::KmerIndex;
use crate::error::IndexError;
use crate::kmer::KmerExtractor;

/// Stream a GenBank-style file into the index: every k-mer inside an
/// ORIGIN..// span is upserted. Returns the total number of k-mers indexed.
pub fn index_records<R: BufRead>(mut reader: R, index: &mut KmerIndex) -> Result<u64> {
    let mut extractor = KmerExtractor::new(index.k() as usize)?;
    let mut in_origin = false;
    let mut records = 0u64;
    let mut total = 0u64;
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(IndexError::StorageFailure)
            .wrap_err("failed to read sequence line")?;
        if n == 0 {
            break;
        }

        if !in_origin {
            if line.contains("ORIGIN") {
                in_origin = true;
            }
            continue;
        }

        if line.trim_start().starts_with("//") {
            in_origin = false;
            records += 1;
            extractor.reset();
            continue;
        }

        for c in line.chars() {
            if let Some(key) = extractor.feed(c) {
                index.upsert(key)?;
                total += 1;
            }
        }
    }

    debug!(records, kmers = total, "indexed genbank stream");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::{encode, Symbol};

    fn key_of(s: &str) -> u64 {
        let window: Vec<Symbol> = s.chars().map(Symbol::classify).collect();
        encode(&window).unwrap()
    }

    fn temp_index(k: u32) -> (KmerIndex, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let index = KmerIndex::open(dir.path().join("index.kdx"), k, 2).unwrap();
        (index, dir)
    }

    #[test]
    fn indexes_only_the_origin_span() {
        let (mut index, _dir) = temp_index(3);
        let input = "\
LOCUS       SCU49845     5028 bp    DNA             PLN
DEFINITION  Saccharomyces cerevisiae TCP1-beta gene.
ORIGIN
        1 atcg
//
";
        let total = index_records(input.as_bytes(), &mut index).unwrap();
        assert_eq!(total, 2);
        assert_eq!(index.lookup(key_of("ATC")).unwrap(), Some(1));
        assert_eq!(index.lookup(key_of("TCG")).unwrap(), Some(1));
        // Nothing from the annotation lines leaked in.
        assert_eq!(index.scan_all().count(), 2);
    }

    #[test]
    fn counts_accumulate_across_lines() {
        let (mut index, _dir) = temp_index(3);
        let input = "ORIGIN\n        1 atcgn\n       61 atcg\n//\n";
        let total = index_records(input.as_bytes(), &mut index).unwrap();

        // "ATCGNATCG" with k=3: ATC, TCG, reset, ATC, TCG.
        assert_eq!(total, 4);
        assert_eq!(index.lookup(key_of("ATC")).unwrap(), Some(2));
        assert_eq!(index.lookup(key_of("TCG")).unwrap(), Some(2));
        assert_eq!(index.lookup(key_of("CGA")).unwrap(), None);
    }

    #[test]
    fn window_does_not_bridge_records() {
        let (mut index, _dir) = temp_index(4);
        // "AT" then "CG": would form ATCG if the boundary leaked.
        let input = "ORIGIN\nat\n//\nORIGIN\ncg\n//\n";
        let total = index_records(input.as_bytes(), &mut index).unwrap();
        assert_eq!(total, 0);
        assert!(index.scan_all().next().is_none());
    }

    #[test]
    fn multiple_records_in_one_file() {
        let (mut index, _dir) = temp_index(3);
        let input = "ORIGIN\naaa\n//\njunk\nORIGIN\naaa\n//\n";
        let total = index_records(input.as_bytes(), &mut index).unwrap();
        assert_eq!(total, 2);
        assert_eq!(index.lookup(key_of("AAA")).unwrap(), Some(2));
    }

    #[test]
    fn empty_stream_indexes_nothing() {
        let (mut index, _dir) = temp_index(3);
        let total = index_records(&b""[..], &mut index).unwrap();
        assert_eq!(total, 0);
        assert!(index.scan_all().next().is_none());
    }
}
