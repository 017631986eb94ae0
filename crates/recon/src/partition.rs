use std::collections::BTreeSet;
use std::collections::HashSet;

use crate::model::{Key, Partition, PartitionSummary, Source, Table};
use crate::normalize::NormalizeOptions;

/// Split a source against a reference key set: rows whose canonical key is
/// in the set are retained, everything else (blank keys included) is
/// excluded. No row is created, dropped, or reordered; each input row lands
/// on exactly one side.
pub fn partition_by_keys(
    source: &Source,
    reference: &BTreeSet<String>,
    options: &NormalizeOptions,
) -> Partition {
    split(source, options, |key| match key.as_value() {
        Some(s) => reference.contains(s),
        None => false,
    })
}

/// Split off the rows whose identifier is blank. Rows with a non-empty
/// canonical key are retained.
pub fn split_blank(source: &Source, options: &NormalizeOptions) -> Partition {
    split(source, options, |key| !key.is_empty())
}

fn split(source: &Source, options: &NormalizeOptions, retain: impl Fn(&Key) -> bool) -> Partition {
    let keys = source.keys(options);

    let mut retained_rows = Vec::new();
    let mut excluded_rows = Vec::new();
    let mut keys_total: HashSet<&str> = HashSet::new();
    let mut keys_retained: HashSet<&str> = HashSet::new();

    for (row, key) in source.table.rows.iter().zip(&keys) {
        let keep = retain(key);
        if let Some(value) = key.as_value() {
            keys_total.insert(value);
            if keep {
                keys_retained.insert(value);
            }
        }
        if keep {
            retained_rows.push(row.clone());
        } else {
            excluded_rows.push(row.clone());
        }
    }

    let summary = PartitionSummary {
        rows_total: source.table.rows.len(),
        rows_retained: retained_rows.len(),
        rows_excluded: excluded_rows.len(),
        keys_total: keys_total.len(),
        keys_retained: keys_retained.len(),
    };

    Partition {
        retained: Table::new(
            source.table.name.clone(),
            source.table.columns.clone(),
            retained_rows,
        ),
        excluded: Table::new(
            source.table.name.clone(),
            source.table.columns.clone(),
            excluded_rows,
        ),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;

    fn source(ids: &[&str]) -> Source {
        let table = Table::new(
            "merged",
            vec!["part_no".into(), "qty".into()],
            ids.iter()
                .enumerate()
                .map(|(i, id)| vec![id.to_string(), i.to_string()])
                .collect(),
        );
        Source::from_table(table, "part_no").unwrap()
    }

    fn reference(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn retained_and_excluded_cover_the_source() {
        let source = source(&["A1", "B2", "a1", "C3", ""]);
        let part = partition_by_keys(&source, &reference(&["A1"]), &NormalizeOptions::default());

        // a1 normalizes to A1, so two rows match.
        assert_eq!(part.retained.rows.len(), 2);
        assert_eq!(part.excluded.rows.len(), 3);
        assert_eq!(part.retained.rows[0][1], "0");
        assert_eq!(part.retained.rows[1][1], "2");
        assert_eq!(part.excluded.rows[0][1], "1");

        assert_eq!(part.summary.rows_total, 5);
        assert_eq!(part.summary.rows_retained, 2);
        assert_eq!(part.summary.rows_excluded, 3);
        assert_eq!(part.summary.keys_total, 3);
        assert_eq!(part.summary.keys_retained, 1);
    }

    #[test]
    fn empty_reference_excludes_everything() {
        let source = source(&["A1", "B2"]);
        let part = partition_by_keys(&source, &BTreeSet::new(), &NormalizeOptions::default());
        assert!(part.retained.rows.is_empty());
        assert_eq!(part.excluded.rows, source.table.rows);
    }

    #[test]
    fn blank_keys_are_never_retained() {
        let source = source(&["", "  "]);
        let part = partition_by_keys(&source, &reference(&["A1"]), &NormalizeOptions::default());
        assert!(part.retained.rows.is_empty());
        assert_eq!(part.excluded.rows.len(), 2);
        assert_eq!(part.summary.keys_total, 0);
    }

    #[test]
    fn split_blank_separates_unidentified_rows() {
        let source = source(&["A1", "", "B2", "\u{3000}"]);
        let part = split_blank(&source, &NormalizeOptions::default());
        assert_eq!(part.retained.rows.len(), 2);
        assert_eq!(part.excluded.rows.len(), 2);
        assert_eq!(part.retained.rows[0][0], "A1");
        assert_eq!(part.excluded.rows[1][0], "\u{3000}");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn is_subsequence(sub: &[Vec<String>], full: &[Vec<String>]) -> bool {
            let mut it = full.iter();
            sub.iter().all(|row| it.any(|r| r == row))
        }

        proptest! {
            #[test]
            fn partition_is_complete_and_disjoint(
                ids in proptest::collection::vec("[ab1-3 ]{0,4}", 0..24),
                keys in proptest::collection::btree_set("[AB1-3]{1,3}", 0..6),
            ) {
                let source = source(&ids.iter().map(String::as_str).collect::<Vec<_>>());
                let part = partition_by_keys(&source, &keys, &NormalizeOptions::default());

                prop_assert_eq!(
                    part.retained.rows.len() + part.excluded.rows.len(),
                    source.table.rows.len()
                );
                prop_assert!(is_subsequence(&part.retained.rows, &source.table.rows));
                prop_assert!(is_subsequence(&part.excluded.rows, &source.table.rows));
                prop_assert_eq!(part.summary.rows_retained, part.retained.rows.len());
                prop_assert_eq!(part.summary.rows_excluded, part.excluded.rows.len());
                prop_assert!(part.summary.keys_retained <= part.summary.keys_total);
            }
        }
    }
}
