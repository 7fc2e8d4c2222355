pub mod annotation_table;
pub mod download_file;
pub mod error;
pub mod extract_ids;
pub mod helpers;
pub mod logging;
pub mod make_mmseqs_db;
pub mod merge_files;
pub mod multigrep;
pub mod run_process;

pub use error::{MagError, Result};
