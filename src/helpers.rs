use std::collections::HashSet;
use std::hash::Hash;

/// Split `items` into consecutive chunks of `size` elements; the last one may be shorter.
/// A `size` of zero is treated as one.
pub fn divide_chunks<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}

pub fn remove_prefix<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.strip_prefix(prefix).unwrap_or(text)
}

pub fn remove_suffix<'a>(text: &'a str, suffix: &str) -> &'a str {
    text.strip_suffix(suffix).unwrap_or(text)
}

/// Unique elements in first-seen order
pub fn get_ordered_uniques<T, I>(seq: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    seq.into_iter()
        .filter(|x| seen.insert(x.clone()))
        .collect()
}

/// Like [`get_ordered_uniques`], with missing values left out entirely
pub fn get_ordered_present_uniques<T, I>(seq: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = Option<T>>,
{
    get_ordered_uniques(seq.into_iter().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_chunks() {
        assert_eq!(
            divide_chunks(&[1, 2, 3, 4, 5], 2),
            vec![vec![1, 2], vec![3, 4], vec![5]]
        );
        assert_eq!(divide_chunks(&[1, 2], 5), vec![vec![1, 2]]);
        assert!(divide_chunks::<u8>(&[], 3).is_empty());
        assert_eq!(divide_chunks(&[1, 2], 0), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_remove_prefix_and_suffix() {
        assert_eq!(remove_prefix("abcdef", "abc"), "def");
        assert_eq!(remove_prefix("xyz", "abc"), "xyz");
        assert_eq!(remove_suffix("genome.fasta", ".fasta"), "genome");
        assert_eq!(remove_suffix("genome.fa", ".fasta"), "genome.fa");
        assert_eq!(remove_suffix("genome", ""), "genome");
    }

    #[test]
    fn test_get_ordered_uniques() {
        assert_eq!(get_ordered_uniques(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(
            get_ordered_uniques(["K2", "K1", "K2"]),
            vec!["K2", "K1"]
        );
    }

    #[test]
    fn test_get_ordered_present_uniques() {
        let seq = vec![None, Some("b"), None, Some("a"), Some("b")];
        assert_eq!(get_ordered_present_uniques(seq), vec!["b", "a"]);
    }
}
