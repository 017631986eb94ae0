// Excel file import (xlsx, xls, xlsb, ods)
//
// One-way conversion: every cell is read back as its display string, so
// identifier text like leading zeros survives untouched.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use bommatch_recon::model::Table;
use bommatch_recon::normalize::normalize_header;

/// Import one table from an Excel workbook.
///
/// With `sheet` given, that sheet is read. Without one, every sheet is
/// scanned and the first whose detected header carries `expected_column`
/// wins; the first sheet is the fallback.
pub fn import(
    name: &str,
    path: &Path,
    sheet: Option<&str>,
    expected_column: Option<&str>,
) -> Result<Table, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    if let Some(wanted) = sheet {
        if !sheet_names.iter().any(|s| s == wanted) {
            return Err(format!(
                "sheet '{}' not found (available: {})",
                wanted,
                sheet_names.join(", ")
            ));
        }
        let grid = read_grid(&mut workbook, wanted)?;
        return Ok(table_from_grid(name, &grid, expected_column));
    }

    if let Some(column) = expected_column {
        for sheet_name in &sheet_names {
            let grid = read_grid(&mut workbook, sheet_name)?;
            let table = table_from_grid(name, &grid, expected_column);
            if table.find_column(column).is_some() {
                return Ok(table);
            }
        }
    }

    let grid = read_grid(&mut workbook, &sheet_names[0])?;
    Ok(table_from_grid(name, &grid, expected_column))
}

fn read_grid(
    workbook: &mut Sheets<BufReader<File>>,
    sheet: &str,
) -> Result<Vec<Vec<String>>, String> {
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet, e))?;

    Ok(range
        .rows()
        .map(|row| row.iter().map(display_string).collect())
        .collect())
}

/// Locate the header row and build a table from the rows below it.
///
/// Spreadsheets in the wild carry title banners above the real header, so
/// when `expected_column` is known, the first row containing it (after
/// header normalization) is taken as the header; row 0 is the fallback.
/// Blank header cells get positional names.
fn table_from_grid(name: &str, grid: &[Vec<String>], expected_column: Option<&str>) -> Table {
    let header_row = expected_column
        .and_then(|column| {
            let target = normalize_header(column);
            grid.iter()
                .position(|row| row.iter().any(|cell| normalize_header(cell) == target))
        })
        .unwrap_or(0);

    let columns: Vec<String> = grid
        .get(header_row)
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| {
                    let trimmed = cell.trim();
                    if trimmed.is_empty() {
                        format!("column_{}", i + 1)
                    } else {
                        trimmed.to_string()
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let rows: Vec<Vec<String>> = grid
        .iter()
        .skip(header_row + 1)
        .map(|row| row.to_vec())
        .collect();

    Table::new(name, columns, rows)
}

fn display_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}
