use crate::error::Result;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Cell values a tabular reader treats as "no data"
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_value(value: &str) -> bool {
    NA_VALUES.contains(&value.trim())
}

/// One gene/protein of an annotation table: column name to raw cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationRow {
    fields: HashMap<String, String>,
}

impl AnnotationRow {
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        AnnotationRow {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Cell text, or `None` when the column is absent or the cell holds an NA value.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|value| !is_missing_value(value))
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    pub columns: Vec<String>,
    pub rows: Vec<AnnotationRow>,
}

impl AnnotationTable {
    pub fn from_rows(columns: Vec<String>, rows: Vec<AnnotationRow>) -> Self {
        AnnotationTable { columns, rows }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Parse tab-separated text whose first non-blank line names the columns.
    ///
    /// Rows shorter than the header leave their trailing cells missing; extra cells
    /// are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut columns: Option<Vec<String>> = None;
        let mut rows = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let Some(names) = columns.as_ref() else {
                columns = Some(line.split('\t').map(|c| c.trim().to_string()).collect());
                continue;
            };
            rows.push(AnnotationRow::from_pairs(
                names.iter().cloned().zip(line.split('\t').map(str::to_string)),
            ));
        }

        Ok(AnnotationTable {
            columns: columns.unwrap_or_default(),
            rows,
        })
    }
}

/// Read an annotation table from disk, gunzipping it first when it is gzip data.
pub fn read_annotation_table(file_path: &Path) -> Result<AnnotationTable> {
    let mut file = File::open(file_path)?;
    let mut magic = [0u8; 2];
    let is_gzip = file.read(&mut magic)? == 2 && magic == [0x1f, 0x8b];
    let file = File::open(file_path)?;

    let table = if is_gzip {
        let decoder = flate2::read::MultiGzDecoder::new(file);
        AnnotationTable::from_reader(BufReader::new(decoder))?
    } else {
        AnnotationTable::from_reader(BufReader::new(file))?
    };

    debug!(
        path = %file_path.display(),
        columns = table.columns.len(),
        rows = table.rows.len(),
        gzip = is_gzip,
        "read annotation table"
    );
    Ok(table)
}
