use std::collections::HashSet;

use crate::model::{ColumnDropPlan, Table};
use crate::normalize::normalize_header;

/// Match a reference list of column names against a schema. Comparison uses
/// the header normal form, so width, spacing, and case differences between
/// the list and the file still match. Each reference name claims at most the
/// first matching column; duplicate requests collapse into one.
pub fn plan_column_drops(columns: &[String], reference: &[String]) -> ColumnDropPlan {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_header(c)).collect();

    let mut drop_indices: Vec<usize> = Vec::new();
    let mut claimed: HashSet<usize> = HashSet::new();
    let mut requested: HashSet<String> = HashSet::new();
    let mut dropped: Vec<String> = Vec::new();
    let mut not_found: Vec<String> = Vec::new();

    for name in reference {
        let target = normalize_header(name);
        if target.is_empty() || !requested.insert(target.clone()) {
            continue;
        }
        let found = normalized
            .iter()
            .enumerate()
            .find(|(i, c)| **c == target && !claimed.contains(i))
            .map(|(i, _)| i);
        match found {
            Some(i) => {
                claimed.insert(i);
                drop_indices.push(i);
                dropped.push(columns[i].clone());
            }
            None => not_found.push(name.clone()),
        }
    }

    drop_indices.sort_unstable();

    ColumnDropPlan {
        columns_before: columns.len(),
        columns_after: columns.len() - drop_indices.len(),
        drop_indices,
        dropped,
        not_found,
    }
}

/// Apply a drop plan: remove the planned columns from the schema and from
/// every row. Row count, row order, and the relative order of surviving
/// columns are unchanged.
pub fn drop_columns(table: &Table, plan: &ColumnDropPlan) -> Table {
    let keep: Vec<usize> = (0..table.columns.len())
        .filter(|i| !plan.drop_indices.contains(i))
        .collect();

    let columns = keep.iter().map(|&i| table.columns[i].clone()).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            keep.iter()
                .map(|&i| table.cell(row, i).to_string())
                .collect()
        })
        .collect();

    Table::new(table.name.clone(), columns, rows)
}
