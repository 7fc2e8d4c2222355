use crate::error::{MagError, Result};
use std::path::Path;
use tracing::{error, info};

// TODO: retry transient download failures instead of failing on the first error
fn get(url: &str) -> Result<reqwest::blocking::Response> {
    info!("downloading {url}");
    reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .map_err(|source| download_failed(url, source))
}

fn download_failed(url: &str, source: reqwest::Error) -> MagError {
    error!("Something went wrong with the download of the url: {url}");
    MagError::Download {
        url: url.to_string(),
        source,
    }
}

/// Fetch `url` and return the body as text.
pub fn download_to_string(url: &str) -> Result<String> {
    get(url)?
        .text()
        .map_err(|source| download_failed(url, source))
}

/// Fetch `url` into `output_file`, replacing it if it exists.
///
/// The body is streamed into a temporary file next to `output_file` and only moved into
/// place once complete, so a failed download leaves no partial file behind.
pub fn download_to_file(url: &str, output_file: &Path) -> Result<()> {
    let mut response = get(url)?;

    let dir = match output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut partial = tempfile::Builder::new()
        .prefix(".download")
        .tempfile_in(dir)?;
    response
        .copy_to(&mut partial)
        .map_err(|source| download_failed(url, source))?;
    partial.persist(output_file).map_err(|e| e.error)?;
    Ok(())
}

/// Fetch `url` to `output_file` when given, otherwise return the body.
pub fn download_file(url: &str, output_file: Option<&Path>) -> Result<Option<String>> {
    match output_file {
        Some(path) => download_to_file(url, path).map(|()| None),
        None => download_to_string(url).map(Some),
    }
}
