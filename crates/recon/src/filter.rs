use crate::config::RowFilter;
use crate::error::ReconError;
use crate::model::Table;

/// Keep only the rows the filter selects. Row order among kept rows is
/// unchanged; the schema is untouched.
pub fn apply_filter(table: &Table, filter: &RowFilter) -> Result<Table, ReconError> {
    let idx = table
        .find_column(&filter.column)
        .ok_or_else(|| ReconError::MissingField {
            source: table.name.clone(),
            field: filter.column.clone(),
            available: table.columns.clone(),
        })?;

    let rows = table
        .rows
        .iter()
        .filter(|row| {
            let val = table.cell(row, idx);
            match (&filter.contains, &filter.equals) {
                (Some(needle), _) => val.contains(needle.as_str()),
                (None, Some(values)) => values.iter().any(|v| v == val),
                (None, None) => true,
            }
        })
        .cloned()
        .collect();

    Ok(Table::new(table.name.clone(), table.columns.clone(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            "items",
            vec!["part_no".into(), "区分".into()],
            vec![
                vec!["A1".into(), "先端キャップ 9mm".into()],
                vec!["B2".into(), "本体".into()],
                vec!["C3".into(), "先端キャップ 12mm".into()],
            ],
        )
    }

    #[test]
    fn contains_filter_keeps_matching_rows() {
        let filter = RowFilter {
            column: "区分".into(),
            contains: Some("先端キャップ".into()),
            equals: None,
        };
        let filtered = apply_filter(&table(), &filter).unwrap();
        assert_eq!(filtered.rows.len(), 2);
        assert_eq!(filtered.rows[0][0], "A1");
        assert_eq!(filtered.rows[1][0], "C3");
    }

    #[test]
    fn equals_filter_matches_whole_cell() {
        let filter = RowFilter {
            column: "区分".into(),
            contains: None,
            equals: Some(vec!["本体".into()]),
        };
        let filtered = apply_filter(&table(), &filter).unwrap();
        assert_eq!(filtered.rows.len(), 1);
        assert_eq!(filtered.rows[0][0], "B2");
    }

    #[test]
    fn unknown_filter_column_fails() {
        let filter = RowFilter {
            column: "納期".into(),
            contains: Some("x".into()),
            equals: None,
        };
        let err = apply_filter(&table(), &filter).unwrap_err();
        assert!(err.to_string().contains("納期"));
        assert!(err.to_string().contains("items"));
    }
}
