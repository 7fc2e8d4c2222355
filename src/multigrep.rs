use crate::error::Result;
use crate::run_process::{run_process, RunOptions};
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Search a list of exact substrings against a file (typically the `_h` header file of
/// an mmseqs database) and map the first token of each matching line to the whole line.
///
/// Terms without a match are simply absent from the result. The search terms go into a
/// uniquely named temporary file inside `output_dir`, removed once the search is done.
pub fn multigrep<S: AsRef<str>>(
    search_terms: &[S],
    search_against: &Path,
    split_char: &str,
    output_dir: &Path,
) -> Result<HashMap<String, String>> {
    if search_terms.is_empty() {
        return Ok(HashMap::new());
    }

    let mut hits_file = tempfile::Builder::new()
        .prefix("hits")
        .suffix(".txt")
        .tempfile_in(output_dir)?;
    for term in search_terms {
        writeln!(hits_file, "{}", term.as_ref())?;
    }
    hits_file.flush()?;

    let command: Vec<OsString> = vec![
        "grep".into(),
        "-a".into(),
        "-F".into(),
        "-f".into(),
        hits_file.path().into(),
        search_against.into(),
    ];
    // grep reports "no lines selected" with status 1
    let options = RunOptions::new().accept_status(1);
    let results = run_process(&command, &options)?.unwrap_or_default();

    let hits = parse_grep_output(&results, split_char);
    debug!(
        terms = search_terms.len(),
        hits = hits.len(),
        "multigrep finished"
    );
    Ok(hits)
}

fn parse_grep_output(results: &str, split_char: &str) -> HashMap<String, String> {
    let trimmed = results.trim();
    if trimmed.is_empty() {
        return HashMap::new();
    }

    trimmed
        .split(split_char)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            line.split_whitespace()
                .next()
                .map(|key| (key.to_string(), line.to_string()))
        })
        .collect()
}
