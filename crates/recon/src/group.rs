use std::collections::BTreeMap;

use crate::model::{GroupEntry, Key, Source};
use crate::normalize::NormalizeOptions;

/// Index a source by canonical key: occurrence count plus the first raw
/// value seen for that key. Empty keys are skipped. The map is ordered, so
/// downstream union tables come out ascending by key.
pub fn group_keys(source: &Source, options: &NormalizeOptions) -> BTreeMap<String, GroupEntry> {
    let keys = source.keys(options);
    group_rows(source, &keys)
}

/// Same as [`group_keys`] for callers that already computed the key column.
pub fn group_rows(source: &Source, keys: &[Key]) -> BTreeMap<String, GroupEntry> {
    let mut groups: BTreeMap<String, GroupEntry> = BTreeMap::new();
    for (row, key) in source.table.rows.iter().zip(keys) {
        let Some(value) = key.as_value() else {
            continue;
        };
        let entry = groups.entry(value.to_string()).or_insert_with(|| GroupEntry {
            count: 0,
            sample: source.raw_id(row).to_string(),
        });
        entry.count += 1;
    }
    groups
}
