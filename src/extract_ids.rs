use crate::annotation_table::{AnnotationRow, AnnotationTable};
use crate::helpers::get_ordered_uniques;
use flate2::write::GzEncoder;
use flate2::Compression;
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::LazyLock;

/// Occurrences of each identifier across a whole table
pub type IdCounts = BTreeMap<String, usize>;

/// How identifiers are pulled out of one cell
pub enum Extractor {
    /// Split on a separator and trim each piece
    Delimited(&'static str),
    /// `"; "`-separated CAZy hits, keeping the family before the first `_`, once per cell
    CazyFamilies,
    /// Every regex match, passed through a normalisation step
    Pattern {
        regex: Regex,
        normalize: fn(&str) -> Option<String>,
    },
}

pub struct IdRule {
    pub column: &'static str,
    pub extractor: Extractor,
}

impl IdRule {
    fn delimited(column: &'static str, separator: &'static str) -> Self {
        IdRule {
            column,
            extractor: Extractor::Delimited(separator),
        }
    }

    fn pattern(column: &'static str, pattern: &str, normalize: fn(&str) -> Option<String>) -> Self {
        IdRule {
            column,
            extractor: Extractor::Pattern {
                regex: Regex::new(pattern).expect("identifier patterns are valid regexes"),
                normalize,
            },
        }
    }

    /// Feed every identifier found in `value` to `sink`. Empty identifiers are dropped.
    pub fn extract<F: FnMut(String)>(&self, value: &str, sink: &mut F) {
        match &self.extractor {
            Extractor::Delimited(separator) => value
                .split(*separator)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .for_each(|id| sink(id.to_string())),
            Extractor::CazyFamilies => {
                let families = value
                    .split("; ")
                    .filter_map(|hit| hit.split('_').next())
                    .filter(|family| !family.is_empty());
                get_ordered_uniques(families)
                    .into_iter()
                    .for_each(|family| sink(family.to_string()));
            }
            Extractor::Pattern { regex, normalize } => regex
                .find_iter(value)
                .filter_map(|m| normalize(m.as_str()))
                .filter(|id| !id.is_empty())
                .for_each(&mut *sink),
        }
    }
}

fn strip_brackets(tag: &str) -> &str {
    if tag.len() < 2 {
        return "";
    }
    &tag[1..tag.len() - 1]
}

// "[EC:1.1.1.1]" -> "EC:1.1.1.1"
fn kegg_ec(tag: &str) -> Option<String> {
    Some(strip_brackets(tag).to_string())
}

// "(EC 3.2.1.4)" -> "EC:3.2.1.4"
fn cazy_ec(tag: &str) -> Option<String> {
    let prefix = tag.get(1..3)?;
    let number = tag.get(4..tag.len() - 1)?;
    Some(format!("{prefix}:{number}"))
}

// "[GH5_2]" -> "GH5"
fn cazy_family(tag: &str) -> Option<String> {
    strip_brackets(tag).split('_').next().map(str::to_string)
}

// "[PF00001.20]" -> "PF00001"
fn pfam_accession(tag: &str) -> Option<String> {
    strip_brackets(tag).split('.').next().map(str::to_string)
}

static ID_RULES: LazyLock<Vec<IdRule>> = LazyLock::new(|| {
    vec![
        IdRule::delimited("kegg_genes_id", ","),
        IdRule::delimited("ko_id", ","),
        // legacy KO column
        IdRule::delimited("kegg_id", ","),
        IdRule::pattern("kegg_hit", r"\[EC:\d*\.\d*\.\d*\.\d*\]", kegg_ec),
        IdRule::delimited("peptidase_family", ";"),
        IdRule {
            column: "cazy_id",
            extractor: Extractor::CazyFamilies,
        },
        IdRule::pattern("cazy_hits", r"\(EC [\d+\.]+[\d-]\)", cazy_ec),
        // older cazy_hits format with bracketed families
        IdRule::pattern("cazy_hits", r"\[[A-Z]*\d*?\]", cazy_family),
        IdRule::pattern("pfam_hits", r"\[PF\d{5}\.\d*\]", pfam_accession),
    ]
});

/// Column rules applied to every row, in order. A column may carry several rules.
pub fn id_rules() -> &'static [IdRule] {
    &ID_RULES
}

/// Run every rule over one row. Absent and NA cells contribute nothing.
pub fn for_each_id<F: FnMut(String)>(row: &AnnotationRow, mut sink: F) {
    for rule in id_rules() {
        if let Some(value) = row.get(rule.column) {
            rule.extract(value, &mut sink);
        }
    }
}

/// Distinct identifiers of a single row
pub fn ids_from_row(row: &AnnotationRow) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for_each_id(row, |id| {
        ids.insert(id);
    });
    ids
}

fn add_row(mut counts: IdCounts, row: &AnnotationRow) -> IdCounts {
    for_each_id(row, |id| *counts.entry(id).or_insert(0) += 1);
    counts
}

/// Identifier frequencies across every row of `table`
pub fn count_ids(table: &AnnotationTable) -> IdCounts {
    table.rows.iter().fold(IdCounts::new(), add_row)
}

/// Same as [`count_ids`], with rows spread over the rayon thread pool.
pub fn count_ids_parallel(table: &AnnotationTable) -> IdCounts {
    table
        .rows
        .par_iter()
        .fold(IdCounts::new, add_row)
        .reduce(IdCounts::new, |mut merged, partial| {
            for (id, count) in partial {
                *merged.entry(id).or_insert(0) += count;
            }
            merged
        })
}

pub fn write_id_counts(filename: &Path, counts: &IdCounts, compress: bool) -> std::io::Result<()> {
    // Create the directory structure if it doesn't exist
    if let Some(parent) = filename.parent() {
        create_dir_all(parent)?;
    }

    let file = File::create(filename)?;

    if compress {
        let encoder = GzEncoder::new(file, Compression::default());
        let mut writer = BufWriter::new(encoder);
        write_counts_tsv(&mut writer, counts)?;
        writer.flush()?;
    } else {
        let mut writer = BufWriter::new(file);
        write_counts_tsv(&mut writer, counts)?;
        writer.flush()?;
    }

    Ok(())
}

pub fn write_counts_tsv<W: Write>(writer: &mut W, counts: &IdCounts) -> std::io::Result<()> {
    writeln!(writer, "id\tcount")?;
    for (id, count) in counts {
        writeln!(writer, "{id}\t{count}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> AnnotationRow {
        AnnotationRow::from_pairs(pairs.iter().copied())
    }

    #[test]
    fn test_delimited_columns() {
        let ids = ids_from_row(&row(&[
            ("kegg_genes_id", "eco:b0001, eco:b0002"),
            ("ko_id", "K00001,K00002,"),
            ("kegg_id", "K00003"),
            ("peptidase_family", "S8A; M23B"),
        ]));
        let expected: BTreeSet<String> = [
            "eco:b0001", "eco:b0002", "K00001", "K00002", "K00003", "S8A", "M23B",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_kegg_hit_ec_numbers() {
        let ids = ids_from_row(&row(&[(
            "kegg_hit",
            "alcohol dehydrogenase [EC:1.1.1.1] and [EC:1.1.1.2]; broken [EC:1.1]",
        )]));
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec!["EC:1.1.1.1", "EC:1.1.1.2"]
        );
    }

    #[test]
    fn test_cazy_id_families_once_per_cell() {
        let table = AnnotationTable::from_rows(
            vec!["cazy_id".to_string()],
            vec![
                row(&[("cazy_id", "GH5_2; GH5_4; CBM2")]),
                row(&[("cazy_id", "GH5")]),
            ],
        );
        let counts = count_ids(&table);
        assert_eq!(counts["GH5"], 2);
        assert_eq!(counts["CBM2"], 1);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn test_cazy_hits_ec_and_legacy_families() {
        let ids = ids_from_row(&row(&[(
            "cazy_hits",
            "endo-beta-1,4-glucanase (EC 3.2.1.4); beta-mannanase (EC 3.2.1.-) [GH5] []",
        )]));
        let expected: BTreeSet<String> = ["EC:3.2.1.4", "EC:3.2.1.-", "GH5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_pfam_version_stripped() {
        let ids = ids_from_row(&row(&[("pfam_hits", "7tm_1 [PF00001.20]; ABC [PF00005]")]));
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["PF00001"]);
    }

    #[test]
    fn test_unrecognised_columns_give_nothing() {
        let table = AnnotationTable::from_rows(
            vec!["gene".to_string(), "rank".to_string()],
            vec![row(&[("gene", "g1"), ("rank", "A")])],
        );
        assert!(count_ids(&table).is_empty());
    }

    #[test]
    fn test_strip_helpers_on_short_input() {
        assert_eq!(strip_brackets("]"), "");
        assert_eq!(cazy_ec("(E"), None);
    }
}
