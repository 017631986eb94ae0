//! Command implementations: read one TOML config, load the sources it
//! names relative to the config file, run the engine, write whatever
//! `[output]` asks for. Human summaries go to stderr; stdout stays clean
//! for `--json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bommatch_io::{csv, report, xlsx};
use bommatch_recon::config::{Config, SourceConfig};
use bommatch_recon::engine;
use bommatch_recon::error::ReconError;
use bommatch_recon::model::{ReconInput, Table};

use crate::CliError;

pub fn cmd_run(config_path: PathBuf, json: bool, output: Option<PathBuf>) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_input(&config, &base_dir)?;
    let result = engine::run(&config, &input).map_err(engine_error)?;

    emit_json(&result, json, output.as_deref())?;

    if let Some(path) = output_file(&config, &base_dir) {
        report::write_run_report(&result, &path).map_err(CliError::runtime)?;
        eprintln!("wrote {}", path.display());
    }

    let s = &result.recon.summary;
    eprintln!(
        "{}: {} keys vs {} keys: {} both, {} only in {}, {} only in {}",
        config.name,
        s.left_keys,
        s.right_keys,
        s.both,
        s.left_only,
        result.meta.left,
        s.right_only,
        result.meta.right,
    );

    if s.left_only > 0 || s.right_only > 0 {
        return Err(CliError::diffs(format!(
            "{} keys unmatched",
            s.left_only + s.right_only
        )));
    }
    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;

    let mut operations = Vec::new();
    if config.recon.is_some() {
        operations.push("recon");
    }
    if config.unique.is_some() {
        operations.push("unique");
    }
    if config.partition.is_some() {
        operations.push("partition");
    }
    if config.prune_blank.is_some() {
        operations.push("prune_blank");
    }
    if config.split.is_some() {
        operations.push("split");
    }
    if config.drop_columns.is_some() {
        operations.push("drop_columns");
    }

    eprintln!(
        "valid: '{}' with {} source(s): {}",
        config.name,
        config.sources.len(),
        operations.join(", "),
    );
    Ok(())
}

pub fn cmd_unique(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_input(&config, &base_dir)?;
    let result = engine::run_unique(&config, &input).map_err(engine_error)?;

    emit_json(&result, json, None)?;

    if let Some(path) = output_file(&config, &base_dir) {
        report::write_unique_report(&result, &path).map_err(CliError::runtime)?;
        eprintln!("wrote {}", path.display());
    }

    for source in &result.sources {
        let repeats = source
            .global_flags
            .iter()
            .zip(&source.norm_keys)
            .filter(|(flag, key)| !**flag && !key.is_empty())
            .count();
        eprintln!(
            "{}: {} rows, {} repeat an earlier key",
            source.table.name,
            source.table.rows.len(),
            repeats,
        );
    }
    Ok(())
}

pub fn cmd_partition(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_input(&config, &base_dir)?;
    let run = engine::run_partition(&config, &input).map_err(engine_error)?;

    emit_json(&run, json, None)?;

    if let Some(path) = output_file(&config, &base_dir) {
        report::write_partition_report(&run, &path).map_err(CliError::runtime)?;
        eprintln!("wrote {}", path.display());
    }

    eprintln!(
        "{} common keys; {}: {} matched / {} unmatched rows; {}: {} matched / {} unmatched rows",
        run.common_keys,
        run.left.retained.name,
        run.left.summary.rows_retained,
        run.left.summary.rows_excluded,
        run.right.retained.name,
        run.right.summary.rows_retained,
        run.right.summary.rows_excluded,
    );
    Ok(())
}

pub fn cmd_prune_blank(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_input(&config, &base_dir)?;
    let partition = engine::run_prune_blank(&config, &input).map_err(engine_error)?;

    emit_json(&partition, json, None)?;

    if let Some(path) = output_file(&config, &base_dir) {
        report::write_prune_report(&partition, &path).map_err(CliError::runtime)?;
        eprintln!("wrote {}", path.display());
    }

    eprintln!(
        "{}: {} rows kept, {} rows have no identifier",
        partition.retained.name,
        partition.summary.rows_retained,
        partition.summary.rows_excluded,
    );
    Ok(())
}

pub fn cmd_split(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_input(&config, &base_dir)?;
    let split = engine::run_split(&config, &input).map_err(engine_error)?;

    emit_json(&split, json, None)?;

    if let Some(path) = output_file(&config, &base_dir) {
        report::write_category_report(&split, &path).map_err(CliError::runtime)?;
        eprintln!("wrote {}", path.display());
    }

    eprintln!(
        "{} categories over {} rows ({} rows have no category)",
        split.groups.len(),
        split.rows_total,
        split.rows_blank,
    );
    Ok(())
}

pub fn cmd_drop_columns(config_path: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let input = load_input(&config, &base_dir)?;
    let (table, plan) = engine::run_drop_columns(&config, &input).map_err(engine_error)?;

    emit_json(&plan, json, None)?;

    if let Some(path) = output_file(&config, &base_dir) {
        write_output_table(&table, &path)?;
        eprintln!("wrote {}", path.display());

        let report_path = report_sibling(&path);
        report::write_drop_report(&table.name, &plan, &report_path).map_err(CliError::runtime)?;
        eprintln!("wrote {}", report_path.display());
    }

    eprintln!(
        "{}: {} columns -> {}, {} dropped",
        table.name,
        plan.columns_before,
        plan.columns_after,
        plan.dropped.len(),
    );
    if !plan.not_found.is_empty() {
        eprintln!("not found: {}", plan.not_found.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<(Config, PathBuf), CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::runtime(format!("cannot read {}: {e}", path.display())))?;
    let config = Config::from_toml(&text).map_err(engine_error)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    Ok((config, base_dir))
}

fn load_input(config: &Config, base_dir: &Path) -> Result<ReconInput, CliError> {
    let mut tables = HashMap::new();
    for (name, source) in &config.sources {
        let path = base_dir.join(&source.file);
        tables.insert(name.clone(), load_table(name, &path, source)?);
    }
    Ok(ReconInput { tables })
}

/// Dispatch on the file extension. Spreadsheet formats go through calamine
/// with the configured sheet and the id column as the expected header.
fn load_table(name: &str, path: &Path, source: &SourceConfig) -> Result<Table, CliError> {
    let loaded = match extension(path).as_str() {
        "csv" => csv::import(name, path),
        "tsv" => csv::import_tsv(name, path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
            xlsx::import(name, path, source.sheet.as_deref(), source.id_column.as_deref())
        }
        other => {
            return Err(CliError::usage(format!(
                "source '{name}': unsupported input format \"{other}\""
            ))
            .with_hint("expected .csv, .tsv, .xlsx, .xlsm, .xlsb, .xls, or .ods"));
        }
    };
    loaded.map_err(|e| CliError::runtime(format!("cannot load '{name}': {e}")))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn output_file(config: &Config, base_dir: &Path) -> Option<PathBuf> {
    config.output.file.as_ref().map(|f| base_dir.join(f))
}

fn write_output_table(table: &Table, path: &Path) -> Result<(), CliError> {
    let written = match extension(path).as_str() {
        "csv" => csv::export(table, path),
        "tsv" => csv::export_tsv(table, path),
        _ => report::write_table_workbook(table, path),
    };
    written.map_err(CliError::runtime)
}

/// The audit workbook written next to a trimmed output file.
fn report_sibling(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    path.with_file_name(format!("{stem}_report.xlsx"))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn emit_json<T: serde::Serialize>(
    value: &T,
    json: bool,
    output: Option<&Path>,
) -> Result<(), CliError> {
    if !json && output.is_none() {
        return Ok(());
    }
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
    if let Some(path) = output {
        std::fs::write(path, &text)
            .map_err(|e| CliError::runtime(format!("cannot write {}: {e}", path.display())))?;
        eprintln!("wrote {}", path.display());
    }
    if json {
        println!("{text}");
    }
    Ok(())
}

fn engine_error(err: ReconError) -> CliError {
    match &err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::UnknownSource(_) => CliError::invalid_config(err.to_string()),
        ReconError::MissingField { .. } | ReconError::Io(_) => CliError::runtime(err.to_string()),
    }
}
