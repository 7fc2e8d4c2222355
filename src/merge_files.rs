use crate::error::Result;
use std::fs::{create_dir_all, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Concatenate `files_to_merge` into `outfile`, in order.
///
/// With `has_header` every input is assumed to start with the same header line: it is
/// written once, taken from the first file, and dropped from each input. Headers are
/// not compared.
pub fn merge_files<P: AsRef<Path>>(
    files_to_merge: &[P],
    outfile: &Path,
    has_header: bool,
) -> Result<()> {
    if let Some(parent) = outfile.parent() {
        create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(outfile)?);

    if has_header {
        if let Some(first) = files_to_merge.first() {
            let mut header = String::new();
            BufReader::new(File::open(first)?).read_line(&mut header)?;
            writer.write_all(header.as_bytes())?;
        }
    }

    for file in files_to_merge {
        let mut reader = BufReader::new(File::open(file)?);
        if has_header {
            let mut skipped = Vec::new();
            reader.read_until(b'\n', &mut skipped)?;
        }
        io::copy(&mut reader, &mut writer)?;
    }

    writer.flush()?;
    debug!(
        files = files_to_merge.len(),
        outfile = %outfile.display(),
        "merged files"
    );
    Ok(())
}
