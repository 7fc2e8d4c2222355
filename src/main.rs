//! # mag-utils
//!
//! Helper commands for a genome annotation pipeline.
//!
//! ```bash
//! # Count KEGG/EC/CAZy/MEROPS/Pfam identifiers in an annotation table
//! mag-utils count-ids annotations.tsv -o ids.tsv -j 4
//!
//! # Merge per-bin tables sharing a header
//! mag-utils merge merged.tsv bin_1.tsv bin_2.tsv --has-header
//!
//! # Build and index an mmseqs2 database
//! mag-utils mmseqs-db genes.faa db/genes.mmsdb --threads 8
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use mag_utils::annotation_table::read_annotation_table;
use mag_utils::download_file::download_file;
use mag_utils::extract_ids::{
    count_ids, count_ids_parallel, ids_from_row, write_counts_tsv, write_id_counts,
};
use mag_utils::logging::{init_logging, LogConfig, LogLevel};
use mag_utils::make_mmseqs_db::{make_mmseqs_db, MmseqsDbOptions};
use mag_utils::merge_files::merge_files;
use mag_utils::multigrep::multigrep;

#[derive(Parser)]
#[command(
    name = "mag-utils",
    version,
    about = "🧬 Helper commands for a genome annotation pipeline",
    long_about = "Wrappers around mmseqs and grep, file merging, URL fetching and identifier extraction from annotation tables (KEGG genes/KO/EC, MEROPS, CAZy, Pfam)."
)]
struct Cli {
    /// Also write log messages to this file (repeatable)
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    log_files: Vec<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count identifiers across every row of an annotation table
    CountIds {
        /// Annotation table (tab-separated, optionally gzipped)
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Output file (default: stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Number of threads to use (0 = auto-detect)
        #[arg(short = 'j', long = "threads", default_value_t = 1)]
        threads: usize,

        /// Compress the output file with gzip
        #[arg(short = 'c', long = "compress", requires = "output")]
        compress: bool,
    },

    /// Print the distinct identifiers of each row of an annotation table
    RowIds {
        #[arg(value_name = "TABLE")]
        table: PathBuf,
    },

    /// Concatenate files into one
    Merge {
        #[arg(value_name = "OUTFILE")]
        outfile: PathBuf,

        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,

        /// Inputs share a header line; keep it once
        #[arg(long = "has-header")]
        has_header: bool,
    },

    /// Build an mmseqs2 database from a fasta file
    MmseqsDb {
        #[arg(value_name = "FASTA")]
        fasta: PathBuf,

        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Skip `mmseqs createindex`
        #[arg(long = "no-index")]
        no_index: bool,

        /// Threads for indexing (0 = auto-detect)
        #[arg(short = 't', long = "threads", default_value_t = 10)]
        threads: usize,

        /// mmseqs executable
        #[arg(long = "mmseqs", default_value = "mmseqs")]
        mmseqs_bin: PathBuf,
    },

    /// Find the lines of a file containing any of a list of exact substrings
    Multigrep {
        /// File with one search term per line
        #[arg(value_name = "TERMS_FILE")]
        terms_file: PathBuf,

        #[arg(value_name = "SEARCH_AGAINST")]
        search_against: PathBuf,

        /// Directory for the temporary hits file
        #[arg(long = "output-dir", default_value = ".")]
        output_dir: PathBuf,

        /// Delimiter between output records
        #[arg(long = "split-char", default_value = "\n")]
        split_char: String,
    },

    /// Fetch a URL to a file or to stdout
    Download {
        url: String,

        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = match LogConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("⚠️  Warning: {e}, using default logging");
            LogConfig::default()
        }
    };
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    log_config.log_files.extend(cli.log_files.iter().cloned());

    if let Err(e) = init_logging(&log_config) {
        eprintln!("❌ Error setting up logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command) {
        eprintln!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::CountIds {
            table,
            output,
            threads,
            compress,
        } => {
            let start = Instant::now();
            let table = read_annotation_table(&table)
                .with_context(|| format!("reading annotation table {}", table.display()))?;

            let thread_count = resolve_threads(threads);
            let counts = if thread_count > 1 {
                if let Err(e) = rayon::ThreadPoolBuilder::new()
                    .num_threads(thread_count)
                    .build_global()
                {
                    tracing::warn!("Could not set thread pool size: {e}");
                }
                count_ids_parallel(&table)
            } else {
                count_ids(&table)
            };
            info!(
                rows = table.len(),
                ids = counts.len(),
                elapsed = ?start.elapsed(),
                "counted identifiers"
            );

            match output {
                Some(path) => write_id_counts(&path, &counts, compress)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => {
                    let stdout = io::stdout();
                    let mut handle = stdout.lock();
                    write_counts_tsv(&mut handle, &counts)?;
                    handle.flush()?;
                }
            }
        }

        Commands::RowIds { table } => {
            let table = read_annotation_table(&table)
                .with_context(|| format!("reading annotation table {}", table.display()))?;
            let key_column = table.columns.first().cloned().unwrap_or_default();

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for row in &table.rows {
                let ids: Vec<String> = ids_from_row(row).into_iter().collect();
                writeln!(
                    handle,
                    "{}\t{}",
                    row.get(&key_column).unwrap_or(""),
                    ids.join(",")
                )?;
            }
            handle.flush()?;
        }

        Commands::Merge {
            outfile,
            files,
            has_header,
        } => {
            merge_files(&files, &outfile, has_header)?;
            info!("merged {} files into {}", files.len(), outfile.display());
        }

        Commands::MmseqsDb {
            fasta,
            output,
            no_index,
            threads,
            mmseqs_bin,
        } => {
            let options = MmseqsDbOptions {
                create_index: !no_index,
                threads: resolve_threads(threads),
                mmseqs_bin,
            };
            make_mmseqs_db(&fasta, &output, &options)?;
        }

        Commands::Multigrep {
            terms_file,
            search_against,
            output_dir,
            split_char,
        } => {
            let terms_text = fs::read_to_string(&terms_file)
                .with_context(|| format!("reading search terms {}", terms_file.display()))?;
            let terms: Vec<&str> = terms_text
                .lines()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();

            let hits = multigrep(&terms, &search_against, &split_char, &output_dir)?;
            let mut keys: Vec<&String> = hits.keys().collect();
            keys.sort();

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for key in keys {
                writeln!(handle, "{}", hits[key])?;
            }
            handle.flush()?;
        }

        Commands::Download { url, output } => {
            if let Some(body) = download_file(&url, output.as_deref())? {
                io::stdout().write_all(body.as_bytes())?;
            }
        }
    }

    Ok(())
}
