use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::{CategoryGroup, CategorySplit, Table};

/// Split a table into one group per distinct category cell value.
///
/// Rows whose category trims to empty are dropped from the split and only
/// counted. Groups come out ordered by descending row count, first
/// appearance breaking ties; rows keep their order within each group.
pub fn split_by_category(table: &Table, category_field: &str) -> Result<CategorySplit, ReconError> {
    let idx = table
        .find_column(category_field)
        .ok_or_else(|| ReconError::MissingField {
            source: table.name.clone(),
            field: category_field.to_string(),
            available: table.columns.clone(),
        })?;

    let mut order: Vec<String> = Vec::new();
    let mut by_label: HashMap<String, Vec<Vec<String>>> = HashMap::new();
    let mut rows_blank = 0usize;

    for row in &table.rows {
        let label = table.cell(row, idx);
        if label.trim().is_empty() {
            rows_blank += 1;
            continue;
        }
        let bucket = by_label.entry(label.to_string()).or_insert_with(|| {
            order.push(label.to_string());
            Vec::new()
        });
        bucket.push(row.clone());
    }

    let categorized: usize = by_label.values().map(Vec::len).sum();

    let mut ranked: Vec<(usize, String)> = order
        .iter()
        .enumerate()
        .map(|(first_seen, label)| (first_seen, label.clone()))
        .collect();
    ranked.sort_by(|a, b| {
        let count_a = by_label[&a.1].len();
        let count_b = by_label[&b.1].len();
        count_b.cmp(&count_a).then(a.0.cmp(&b.0))
    });

    let groups = ranked
        .into_iter()
        .map(|(_, label)| {
            let rows = by_label.remove(&label).unwrap_or_default();
            let share = if categorized == 0 {
                0.0
            } else {
                (rows.len() as f64 / categorized as f64 * 1000.0).round() / 10.0
            };
            CategoryGroup {
                table: Table::new(label.clone(), table.columns.clone(), rows),
                label,
                share_percent: share,
            }
        })
        .collect();

    Ok(CategorySplit {
        groups,
        rows_total: table.rows.len(),
        rows_blank,
    })
}
