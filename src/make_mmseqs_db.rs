use crate::error::Result;
use crate::run_process::{run_process, RunOptions};
use std::ffi::OsString;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct MmseqsDbOptions {
    /// Also run `mmseqs createindex` after `createdb`
    pub create_index: bool,
    pub threads: usize,
    pub mmseqs_bin: PathBuf,
}

impl Default for MmseqsDbOptions {
    fn default() -> Self {
        MmseqsDbOptions {
            create_index: true,
            threads: 10,
            mmseqs_bin: PathBuf::from("mmseqs"),
        }
    }
}

/// Turn a fasta file into an mmseqs2 database, indexed for searching unless disabled.
///
/// Indexing uses a `tmp` directory next to `output_loc`; two builds writing to the
/// same directory at once will share it.
pub fn make_mmseqs_db(fasta_loc: &Path, output_loc: &Path, options: &MmseqsDbOptions) -> Result<()> {
    info!(
        fasta = %fasta_loc.display(),
        db = %output_loc.display(),
        "creating mmseqs database"
    );

    let createdb: Vec<OsString> = vec![
        options.mmseqs_bin.clone().into(),
        "createdb".into(),
        fasta_loc.into(),
        output_loc.into(),
    ];
    run_process(&createdb, &RunOptions::default())?;

    if options.create_index {
        let tmp_dir = output_loc
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("tmp");
        create_dir_all(&tmp_dir)?;

        let createindex: Vec<OsString> = vec![
            options.mmseqs_bin.clone().into(),
            "createindex".into(),
            output_loc.into(),
            tmp_dir.into(),
            "--threads".into(),
            options.threads.to_string().into(),
        ];
        run_process(&createindex, &RunOptions::default())?;
    }

    Ok(())
}
