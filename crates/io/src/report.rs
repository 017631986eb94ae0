// Report workbooks
//
// Layouts mirror the inspection worksheets this output replaces: flagged
// source sheets first, then a summary sheet with the union table below the
// counts block.

use std::collections::HashSet;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use unicode_width::UnicodeWidthStr;

use bommatch_recon::model::{
    CategorySplit, ColumnDropPlan, FlaggedSource, Partition, PartitionRun, RunResult, Table,
    UniqueResult, UniqueSource,
};

use crate::sheet_name::{sanitize_sheet_name, unique_name};

const MAX_COLUMN_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// Workbook writers
// ---------------------------------------------------------------------------

/// Write the full reconciliation report: flagged left, flagged right,
/// summary + union, and one sheet per source of the uniqueness pass when
/// it ran.
pub fn write_run_report(result: &RunResult, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    let name = claim(&format!("1_{}_flagged", result.meta.left), &mut used);
    write_flagged_sheet(add_sheet(&mut workbook, &name)?, &result.recon.left)?;

    let name = claim(&format!("2_{}_flagged", result.meta.right), &mut used);
    write_flagged_sheet(add_sheet(&mut workbook, &name)?, &result.recon.right)?;

    let name = claim("3_summary", &mut used);
    write_summary_sheet(add_sheet(&mut workbook, &name)?, result)?;

    if let Some(unique) = &result.unique {
        for (i, source) in unique.sources.iter().enumerate() {
            let name = claim(&format!("{}_{}_unique", i + 4, source.table.name), &mut used);
            write_unique_sheet(add_sheet(&mut workbook, &name)?, source)?;
        }
    }

    save(workbook, path)
}

/// Write a standalone uniqueness report: one sheet per source, scan order
/// preserved.
pub fn write_unique_report(result: &UniqueResult, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    for source in &result.sources {
        let name = claim(&format!("{}_unique", source.table.name), &mut used);
        write_unique_sheet(add_sheet(&mut workbook, &name)?, source)?;
    }

    save(workbook, path)
}

/// Write the two-sided partition report: summary first, then matched and
/// unmatched rows per side.
pub fn write_partition_report(run: &PartitionRun, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    let left = run.left.retained.name.clone();
    let right = run.right.retained.name.clone();

    let name = claim("summary", &mut used);
    let metrics = vec![
        (format!("{left} rows"), run.left.summary.rows_total),
        (format!("{left} rows matched"), run.left.summary.rows_retained),
        (format!("{left} rows unmatched"), run.left.summary.rows_excluded),
        (format!("{right} rows"), run.right.summary.rows_total),
        (format!("{right} rows matched"), run.right.summary.rows_retained),
        (format!("{right} rows unmatched"), run.right.summary.rows_excluded),
        ("common keys".to_string(), run.common_keys),
        (format!("{left} only keys"), run.left_only_keys),
        (format!("{right} only keys"), run.right_only_keys),
    ];
    write_metrics_sheet(add_sheet(&mut workbook, &name)?, &metrics)?;

    let sides = [
        ("matched", &run.left.retained),
        ("matched", &run.right.retained),
        ("unmatched", &run.left.excluded),
        ("unmatched", &run.right.excluded),
    ];
    for (suffix, table) in sides {
        let name = claim(&format!("{}_{}", table.name, suffix), &mut used);
        write_table_sheet(add_sheet(&mut workbook, &name)?, table)?;
    }

    save(workbook, path)
}

/// Write the blank-identifier split: summary, rows with an identifier,
/// rows without one.
pub fn write_prune_report(partition: &Partition, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    let source = partition.retained.name.clone();
    let name = claim("summary", &mut used);
    let metrics = vec![
        (format!("{source} rows"), partition.summary.rows_total),
        ("rows with identifier".to_string(), partition.summary.rows_retained),
        ("rows without identifier".to_string(), partition.summary.rows_excluded),
        ("distinct keys".to_string(), partition.summary.keys_total),
    ];
    write_metrics_sheet(add_sheet(&mut workbook, &name)?, &metrics)?;

    let name = claim(&format!("{source}_retained"), &mut used);
    write_table_sheet(add_sheet(&mut workbook, &name)?, &partition.retained)?;

    let name = claim(&format!("{source}_excluded"), &mut used);
    write_table_sheet(add_sheet(&mut workbook, &name)?, &partition.excluded)?;

    save(workbook, path)
}

/// Write the category split report: an overview sheet with per-category
/// counts, shares, and jump links, then one sheet per category.
pub fn write_category_report(split: &CategorySplit, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    let summary_name = claim("categories", &mut used);
    let sheet_names: Vec<String> = split
        .groups
        .iter()
        .map(|group| claim(&group.label, &mut used))
        .collect();

    {
        let worksheet = add_sheet(&mut workbook, &summary_name)?;
        let columns = ["category", "rows", "share", "jump"].map(String::from);
        write_header(worksheet, 0, &columns)?;

        let share_format = Format::new().set_num_format("0.0\"%\"");
        for (r, group) in split.groups.iter().enumerate() {
            let y = r as u32 + 1;
            worksheet
                .write_string(y, 0, &group.label)
                .and_then(|ws| ws.write_number(y, 1, group.table.rows.len() as f64))
                .and_then(|ws| {
                    ws.write_number_with_format(y, 2, group.share_percent, &share_format)
                })
                .and_then(|ws| {
                    ws.write_formula(
                        y,
                        3,
                        format!("=HYPERLINK(\"#'{}'!A1\",\"→\")", sheet_names[r]).as_str(),
                    )
                })
                .map_err(|e| format!("Failed to write category row: {}", e))?;
        }

        worksheet
            .set_freeze_panes(1, 0)
            .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
        let labels: Vec<Vec<String>> = split
            .groups
            .iter()
            .map(|g| vec![g.label.clone()])
            .collect();
        apply_widths(worksheet, &best_fit_widths(&columns, &labels))?;
    }

    for (group, name) in split.groups.iter().zip(&sheet_names) {
        let worksheet = add_sheet(&mut workbook, name)?;
        write_table_sheet(worksheet, &group.table)?;
        if !group.table.columns.is_empty() {
            worksheet
                .autofilter(
                    0,
                    0,
                    group.table.rows.len() as u32,
                    group.table.columns.len() as u16 - 1,
                )
                .map_err(|e| format!("Failed to set autofilter: {}", e))?;
        }
    }

    save(workbook, path)
}

/// Write the column-drop report: counts, dropped columns, and requested
/// names that matched nothing.
pub fn write_drop_report(
    source_name: &str,
    plan: &ColumnDropPlan,
    path: &Path,
) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();

    let name = claim("summary", &mut used);
    let metrics = vec![
        (format!("{source_name} columns before"), plan.columns_before),
        (format!("{source_name} columns after"), plan.columns_after),
        ("columns dropped".to_string(), plan.dropped.len()),
        ("names not found".to_string(), plan.not_found.len()),
    ];
    write_metrics_sheet(add_sheet(&mut workbook, &name)?, &metrics)?;

    let name = claim("dropped", &mut used);
    write_name_list(add_sheet(&mut workbook, &name)?, "dropped_column", &plan.dropped)?;

    let name = claim("not_found", &mut used);
    write_name_list(add_sheet(&mut workbook, &name)?, "requested_name", &plan.not_found)?;

    save(workbook, path)
}

/// Write one table as a single-sheet workbook.
pub fn write_table_workbook(table: &Table, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();
    let name = claim(&table.name, &mut used);
    write_table_sheet(add_sheet(&mut workbook, &name)?, table)?;
    save(workbook, path)
}

// ---------------------------------------------------------------------------
// Sheet writers
// ---------------------------------------------------------------------------

fn write_table_sheet(worksheet: &mut Worksheet, table: &Table) -> Result<(), String> {
    write_header(worksheet, 0, &table.columns)?;
    for (r, row) in table.rows.iter().enumerate() {
        for c in 0..table.columns.len() {
            worksheet
                .write_string(r as u32 + 1, c as u16, table.cell(row, c))
                .map_err(|e| format!("Failed to write cell: {}", e))?;
        }
    }
    freeze_header(worksheet)?;
    apply_widths(worksheet, &best_fit_widths(&table.columns, &table.rows))
}

/// Source rows verbatim, with the membership flag appended as a real
/// boolean column.
fn write_flagged_sheet(worksheet: &mut Worksheet, flagged: &FlaggedSource) -> Result<(), String> {
    let mut columns = flagged.table.columns.clone();
    columns.push(flagged.flag_column.clone());
    write_header(worksheet, 0, &columns)?;

    let width = flagged.table.columns.len();
    for (r, row) in flagged.table.rows.iter().enumerate() {
        let y = r as u32 + 1;
        for c in 0..width {
            worksheet
                .write_string(y, c as u16, flagged.table.cell(row, c))
                .map_err(|e| format!("Failed to write cell: {}", e))?;
        }
        worksheet
            .write_boolean(y, width as u16, flagged.flags[r])
            .map_err(|e| format!("Failed to write flag: {}", e))?;
    }

    freeze_header(worksheet)?;
    apply_widths(worksheet, &best_fit_widths(&columns, &flagged.table.rows))
}

/// Counts block on top, union table below it.
fn write_summary_sheet(worksheet: &mut Worksheet, result: &RunResult) -> Result<(), String> {
    let meta = &result.meta;
    let summary = &result.recon.summary;

    let metrics = vec![
        (format!("{} unique keys", meta.left), summary.left_keys),
        (format!("{} unique keys", meta.right), summary.right_keys),
        ("both".to_string(), summary.both),
        (format!("{} only", meta.left), summary.left_only),
        (format!("{} only", meta.right), summary.right_only),
    ];
    write_metric_block(worksheet, 0, &metrics)?;

    let start = metrics.len() as u32 + 3;
    let columns = vec![
        "key".to_string(),
        "status".to_string(),
        format!("in_{}", meta.left),
        format!("{}_count", meta.left),
        format!("{}_sample", meta.left),
        format!("in_{}", meta.right),
        format!("{}_count", meta.right),
        format!("{}_sample", meta.right),
    ];
    write_header(worksheet, start, &columns)?;

    let mut width_rows: Vec<Vec<String>> = Vec::new();
    for (r, row) in result.recon.union.iter().enumerate() {
        let y = start + 1 + r as u32;
        let left_sample = row.left_sample.as_deref().unwrap_or("");
        let right_sample = row.right_sample.as_deref().unwrap_or("");
        worksheet
            .write_string(y, 0, &row.key)
            .and_then(|ws| ws.write_string(y, 1, row.bucket.to_string()))
            .and_then(|ws| ws.write_boolean(y, 2, row.left_count > 0))
            .and_then(|ws| ws.write_number(y, 3, row.left_count as f64))
            .and_then(|ws| ws.write_string(y, 4, left_sample))
            .and_then(|ws| ws.write_boolean(y, 5, row.right_count > 0))
            .and_then(|ws| ws.write_number(y, 6, row.right_count as f64))
            .and_then(|ws| ws.write_string(y, 7, right_sample))
            .map_err(|e| format!("Failed to write union row: {}", e))?;
        width_rows.push(vec![
            row.key.clone(),
            row.bucket.to_string(),
            String::new(),
            String::new(),
            left_sample.to_string(),
            String::new(),
            String::new(),
            right_sample.to_string(),
        ]);
    }

    for (metric, _) in &metrics {
        width_rows.push(vec![metric.clone()]);
    }
    apply_widths(worksheet, &best_fit_widths(&columns, &width_rows))
}

/// Source rows verbatim plus the three appended audit columns.
fn write_unique_sheet(worksheet: &mut Worksheet, source: &UniqueSource) -> Result<(), String> {
    let mut columns = source.table.columns.clone();
    columns.push("unique_in_source".to_string());
    columns.push("unique_overall".to_string());
    columns.push("normalized_key".to_string());
    write_header(worksheet, 0, &columns)?;

    let width = source.table.columns.len() as u16;
    for (r, row) in source.table.rows.iter().enumerate() {
        let y = r as u32 + 1;
        for c in 0..source.table.columns.len() {
            worksheet
                .write_string(y, c as u16, source.table.cell(row, c))
                .map_err(|e| format!("Failed to write cell: {}", e))?;
        }
        worksheet
            .write_boolean(y, width, source.local_flags[r])
            .and_then(|ws| ws.write_boolean(y, width + 1, source.global_flags[r]))
            .and_then(|ws| ws.write_string(y, width + 2, &source.norm_keys[r]))
            .map_err(|e| format!("Failed to write flags: {}", e))?;
    }

    freeze_header(worksheet)?;
    apply_widths(worksheet, &best_fit_widths(&columns, &source.table.rows))
}

fn write_metrics_sheet(
    worksheet: &mut Worksheet,
    metrics: &[(String, usize)],
) -> Result<(), String> {
    write_metric_block(worksheet, 0, metrics)?;
    let labels: Vec<Vec<String>> = metrics.iter().map(|(m, _)| vec![m.clone()]).collect();
    let columns = ["metric", "value"].map(String::from);
    apply_widths(worksheet, &best_fit_widths(&columns, &labels))
}

fn write_metric_block(
    worksheet: &mut Worksheet,
    start: u32,
    metrics: &[(String, usize)],
) -> Result<(), String> {
    let columns = ["metric", "value"].map(String::from);
    write_header(worksheet, start, &columns)?;
    for (r, (metric, value)) in metrics.iter().enumerate() {
        let y = start + 1 + r as u32;
        worksheet
            .write_string(y, 0, metric)
            .and_then(|ws| ws.write_number(y, 1, *value as f64))
            .map_err(|e| format!("Failed to write metric '{}': {}", metric, e))?;
    }
    Ok(())
}

fn write_name_list(
    worksheet: &mut Worksheet,
    header: &str,
    names: &[String],
) -> Result<(), String> {
    let columns = [header.to_string()];
    write_header(worksheet, 0, &columns)?;
    for (r, name) in names.iter().enumerate() {
        worksheet
            .write_string(r as u32 + 1, 0, name)
            .map_err(|e| format!("Failed to write name: {}", e))?;
    }
    let rows: Vec<Vec<String>> = names.iter().map(|n| vec![n.clone()]).collect();
    apply_widths(worksheet, &best_fit_widths(&columns, &rows))
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn claim(base: &str, used: &mut HashSet<String>) -> String {
    unique_name(&sanitize_sheet_name(base), used)
}

fn add_sheet<'a>(workbook: &'a mut Workbook, name: &str) -> Result<&'a mut Worksheet, String> {
    workbook
        .add_worksheet()
        .set_name(name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))
}

fn save(mut workbook: Workbook, path: &Path) -> Result<(), String> {
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))
}

fn write_header(worksheet: &mut Worksheet, row: u32, columns: &[String]) -> Result<(), String> {
    let bold = Format::new().set_bold();
    for (c, column) in columns.iter().enumerate() {
        worksheet
            .write_string_with_format(row, c as u16, column, &bold)
            .map_err(|e| format!("Failed to write header '{}': {}", column, e))?;
    }
    Ok(())
}

fn freeze_header(worksheet: &mut Worksheet) -> Result<(), String> {
    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to set freeze panes: {}", e))?;
    Ok(())
}

/// Column widths from the header and a sample of rows. `unicode-width`
/// counts East-Asian text double, which tracks how Excel's default font
/// lays it out.
fn best_fit_widths(columns: &[String], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.as_str().width()).collect();
    for row in rows.iter().take(500) {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.as_str().width());
            }
        }
    }
    widths.iter().map(|w| (w + 2).min(MAX_COLUMN_WIDTH)).collect()
}

fn apply_widths(worksheet: &mut Worksheet, widths: &[usize]) -> Result<(), String> {
    for (i, width) in widths.iter().enumerate() {
        worksheet
            .set_column_width(i as u16, *width as f64)
            .map_err(|e| format!("Failed to set column {} width: {}", i, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::Reader;
    use std::collections::HashMap;
    use tempfile::tempdir;

    use bommatch_recon::config::Config;
    use bommatch_recon::engine;
    use bommatch_recon::model::ReconInput;

    fn table(name: &str, ids: &[&str]) -> Table {
        Table::new(
            name,
            vec!["部品No.".into(), "品名".into()],
            ids.iter()
                .map(|id| vec![id.to_string(), format!("品 {id}")])
                .collect(),
        )
    }

    fn run_fixture() -> RunResult {
        let toml = r#"
name = "roundtrip"

[sources.materials]
file = "materials.xlsx"
id_column = "部品No."

[sources.assybom]
file = "assybom.xlsx"
id_column = "部品No."

[recon]
left = "materials"
right = "assybom"

[unique]
source_order = ["materials", "assybom"]
"#;
        let config = Config::from_toml(toml).unwrap();
        let mut tables = HashMap::new();
        tables.insert("materials".to_string(), table("materials", &["A-100", "B200", ""]));
        tables.insert("assybom".to_string(), table("assybom", &["a-100", "C300"]));
        let input = ReconInput { tables };
        engine::run(&config, &input).unwrap()
    }

    #[test]
    fn test_run_report_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let result = run_fixture();

        write_run_report(&result, &path).unwrap();

        let back = crate::xlsx::import("back", &path, Some("1_materials_flagged"), None).unwrap();
        assert_eq!(back.columns, vec!["部品No.", "品名", "in_assybom"]);
        assert_eq!(back.rows.len(), 3);
        assert_eq!(back.rows[0][2], "TRUE");
        assert_eq!(back.rows[1][2], "FALSE");

        let summary = crate::xlsx::import("s", &path, Some("3_summary"), None).unwrap();
        assert_eq!(summary.columns[0], "metric");

        let unique = crate::xlsx::import("u", &path, Some("4_materials_unique"), None).unwrap();
        assert_eq!(
            unique.columns,
            vec!["部品No.", "品名", "unique_in_source", "unique_overall", "normalized_key"]
        );
        assert_eq!(unique.rows[0][4], "A-100");
    }

    #[test]
    fn test_summary_union_block_sits_below_metrics() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let result = run_fixture();

        write_run_report(&result, &path).unwrap();

        // Union header lands under the 5 metric rows + gap, so re-importing
        // with the union key column as expected header must find it.
        let union = crate::xlsx::import("union", &path, Some("3_summary"), Some("key")).unwrap();
        assert_eq!(union.columns[0], "key");
        assert_eq!(union.columns[1], "status");
        let keys: Vec<&str> = union.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(keys, vec!["A-100", "B200", "C300"]);
        assert_eq!(union.rows[0][1], "both");
    }

    #[test]
    fn test_partition_report_has_five_sheets() {
        use bommatch_recon::model::{PartitionRun, Source};
        use bommatch_recon::normalize::NormalizeOptions;
        use bommatch_recon::partition::partition_by_keys;
        use std::collections::BTreeSet;

        let dir = tempdir().unwrap();
        let path = dir.path().join("partition.xlsx");

        let left = Source::from_table(table("catalog", &["K1", "K2"]), "部品No.").unwrap();
        let right = Source::from_table(table("kaf", &["K1", "K3"]), "部品No.").unwrap();
        let common: BTreeSet<String> = ["K1".to_string()].into();
        let run = PartitionRun {
            left: partition_by_keys(&left, &common, &NormalizeOptions::default()),
            right: partition_by_keys(&right, &common, &NormalizeOptions::default()),
            common_keys: 1,
            left_only_keys: 1,
            right_only_keys: 1,
        };

        write_partition_report(&run, &path).unwrap();

        let workbook = calamine::open_workbook_auto(&path).unwrap();
        assert_eq!(
            workbook.sheet_names().to_vec(),
            vec![
                "summary",
                "catalog_matched",
                "kaf_matched",
                "catalog_unmatched",
                "kaf_unmatched"
            ]
        );

        let matched = crate::xlsx::import("m", &path, Some("catalog_matched"), None).unwrap();
        assert_eq!(matched.rows.len(), 1);
        assert_eq!(matched.rows[0][0], "K1");
    }

    #[test]
    fn test_category_report_sanitizes_sheet_names() {
        use bommatch_recon::category::split_by_category;

        let dir = tempdir().unwrap();
        let path = dir.path().join("categories.xlsx");

        let source = Table::new(
            "defects",
            vec!["区分".into(), "内容".into()],
            vec![
                vec!["組立/調整".into(), "ネジ浮き".into()],
                vec!["組立/調整".into(), "欠品".into()],
                vec!["塗装".into(), "色ムラ".into()],
            ],
        );
        let split = split_by_category(&source, "区分").unwrap();
        write_category_report(&split, &path).unwrap();

        let workbook = calamine::open_workbook_auto(&path).unwrap();
        let names = workbook.sheet_names().to_vec();
        assert_eq!(names, vec!["categories", "組立_調整", "塗装"]);

        let overview = crate::xlsx::import("o", &path, Some("categories"), None).unwrap();
        assert_eq!(overview.rows[0][0], "組立/調整");
        assert_eq!(overview.rows[0][1], "2");
    }

    #[test]
    fn test_drop_report_lists_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drops.xlsx");

        let plan = ColumnDropPlan {
            drop_indices: vec![2],
            dropped: vec!["数量".into()],
            not_found: vec!["備考".into()],
            columns_before: 4,
            columns_after: 3,
        };
        write_drop_report("materials", &plan, &path).unwrap();

        let dropped = crate::xlsx::import("d", &path, Some("dropped"), None).unwrap();
        assert_eq!(dropped.columns, vec!["dropped_column"]);
        assert_eq!(dropped.rows[0][0], "数量");

        let not_found = crate::xlsx::import("n", &path, Some("not_found"), None).unwrap();
        assert_eq!(not_found.rows[0][0], "備考");
    }

    #[test]
    fn test_table_workbook_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.xlsx");

        let original = table("materials", &["A-100", "0012"]);
        write_table_workbook(&original, &path).unwrap();

        let back = crate::xlsx::import("materials", &path, None, None).unwrap();
        assert_eq!(back.columns, original.columns);
        assert_eq!(back.rows[1][0], "0012", "identifier text must stay text");
    }
}
