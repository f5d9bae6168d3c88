use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use br_index::patterns::{read_patterns, PatternRecord};
use br_index::{BrIndex, BuildOptions, SaAlgorithm};

#[derive(Parser)]
#[command(name = "bri")]
#[command(about = "Bidirectional r-index: build, count and locate over a static text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index of a text file and write it next to the input
    BuildIndex {
        /// Text file to index (raw bytes; values 0 and 1 are reserved)
        input: PathBuf,

        /// Output prefix; the index lands at <prefix>.brin
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the permuted LCP, trading locate speed for space
        #[arg(long)]
        nplcp: bool,

        /// Suffix-sorting backend
        #[arg(long, value_enum, default_value_t = SaBackend::Sais)]
        sa_algorithm: SaBackend,
    },
    /// Count pattern occurrences, allowing mismatches
    Count {
        /// Index file (.brin)
        index: PathBuf,

        /// Patterns: .fa/.fasta/.fq/.fastq (with reverse complements) or one per line
        patterns: PathBuf,

        /// Maximum number of mismatched characters allowed
        #[arg(short, long, default_value_t = 0)]
        mismatches: usize,
    },
    /// Locate pattern occurrences, allowing mismatches
    Locate {
        /// Index file (.brin)
        index: PathBuf,

        /// Patterns: .fa/.fasta/.fq/.fastq (with reverse complements) or one per line
        patterns: PathBuf,

        /// Maximum number of mismatched characters allowed
        #[arg(short, long, default_value_t = 0)]
        mismatches: usize,

        /// Verify every reported occurrence against this text file
        #[arg(short, long)]
        check: Option<PathBuf>,
    },
    /// Print the space breakdown of an index
    Space {
        /// Index file (.brin)
        index: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SaBackend {
    Sais,
    Doubling,
}

impl From<SaBackend> for SaAlgorithm {
    fn from(backend: SaBackend) -> Self {
        match backend {
            SaBackend::Sais => SaAlgorithm::Sais,
            SaBackend::Doubling => SaAlgorithm::Doubling,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::BuildIndex {
            input,
            output,
            nplcp,
            sa_algorithm,
        } => build_index(input, output, nplcp, sa_algorithm),
        Commands::Count {
            index,
            patterns,
            mismatches,
        } => count(index, patterns, mismatches),
        Commands::Locate {
            index,
            patterns,
            mismatches,
            check,
        } => locate(index, patterns, mismatches, check),
        Commands::Space { index } => space(index),
    }
}

fn load_index(path: &PathBuf) -> Result<BrIndex> {
    let start = Instant::now();
    let index = BrIndex::load(path)?;
    println!("Load time  : {} ms", start.elapsed().as_millis());
    Ok(index)
}

fn load_patterns(path: &PathBuf) -> Result<Vec<PatternRecord>> {
    let records =
        read_patterns(path).with_context(|| format!("cannot read patterns from {}", path.display()))?;
    if records.is_empty() {
        return Err(anyhow!("no patterns found in {}", path.display()));
    }
    println!("Read {} patterns from {}", records.len(), path.display());
    Ok(records)
}

fn build_index(input: PathBuf, output: Option<PathBuf>, nplcp: bool, sa_algorithm: SaBackend) -> Result<()> {
    let text = fs::read(&input).with_context(|| format!("cannot read {}", input.display()))?;
    println!("Text length = {}", text.len());

    let options = BuildOptions {
        algorithm: sa_algorithm.into(),
        with_plcp: !nplcp,
    };
    let start = Instant::now();
    let index = BrIndex::build(&text, &options)?;
    println!("Build time : {} ms", start.elapsed().as_millis());

    let r = index.number_of_runs(false);
    println!("Number of BWT equal-letter runs: r = {r}");
    println!("Rate n/r = {:.4}", index.bwt_size() as f64 / r as f64);
    println!("Number of BWT^R equal-letter runs: rR = {}", index.number_of_runs(true));

    let prefix = output.unwrap_or(input);
    let path = index.save(&prefix)?;
    println!("Index written to {}", path.display());
    Ok(())
}

fn count(index: PathBuf, patterns: PathBuf, mismatches: usize) -> Result<()> {
    let index = load_index(&index)?;
    let records = load_patterns(&patterns)?;

    println!("counting occurrences with at most {mismatches} mismatches ...");
    let start = Instant::now();
    let mut occ_tot = 0;
    for record in &records {
        let samples = index.search_with_mismatch(&record.seq, mismatches);
        let occ = index.count_samples(&samples);
        occ_tot += occ;
        println!("{}: {occ}", record.id);
    }
    let elapsed = start.elapsed();

    println!();
    println!("Number of patterns           n = {}", records.len());
    println!("Total number of occurrences occ = {occ_tot}");
    println!("Count time : {} us", elapsed.as_micros());
    println!(
        "Count time : {:.2} us/pattern",
        elapsed.as_micros() as f64 / records.len() as f64
    );
    Ok(())
}

fn locate(index: PathBuf, patterns: PathBuf, mismatches: usize, check: Option<PathBuf>) -> Result<()> {
    let index = load_index(&index)?;
    let records = load_patterns(&patterns)?;
    let text = match &check {
        Some(path) => {
            Some(fs::read(path).with_context(|| format!("cannot read {}", path.display()))?)
        }
        None => None,
    };

    println!("locating occurrences with at most {mismatches} mismatches ...");
    let start = Instant::now();
    let mut occ_tot = 0;
    let mut wrong = 0;
    for record in &records {
        let samples = index.search_with_mismatch(&record.seq, mismatches);
        let occs = index.locate_samples(&samples);
        occ_tot += occs.len();
        print!("{} ({} occs):", record.id, occs.len());
        for &o in &occs {
            print!(" {o}");
        }
        println!();

        if let Some(text) = &text {
            wrong += verify_occurrences(text, &record.seq, &occs, mismatches);
        }
    }
    let elapsed = start.elapsed();

    println!();
    println!("Number of patterns           n = {}", records.len());
    println!("Total number of occurrences occ = {occ_tot}");
    println!("Locate time: {} us", elapsed.as_micros());
    if occ_tot > 0 {
        println!(
            "Locate time: {:.2} us/occurrence",
            elapsed.as_micros() as f64 / occ_tot as f64
        );
    }
    if text.is_some() {
        if wrong > 0 {
            return Err(anyhow!("{wrong} reported occurrences failed verification"));
        }
        println!("All occurrences verified.");
    }
    Ok(())
}

fn verify_occurrences(text: &[u8], pattern: &[u8], occs: &[usize], allowed: usize) -> usize {
    let mut wrong = 0;
    for &o in occs {
        let window = text.get(o..o + pattern.len());
        let ok = window.map_or(false, |w| {
            w.iter().zip(pattern).filter(|(a, b)| a != b).count() <= allowed
        });
        if !ok {
            eprintln!("Error: wrong occurrence {o} for pattern {:?}", String::from_utf8_lossy(pattern));
            wrong += 1;
        }
    }
    wrong
}

fn space(index: PathBuf) -> Result<()> {
    let index = load_index(&index)?;
    println!("{}", index.space());
    Ok(())
}
