use std::collections::{BTreeMap, BTreeSet};

use crate::category::split_by_category;
use crate::columns::{drop_columns, plan_column_drops};
use crate::config::Config;
use crate::error::ReconError;
use crate::filter::apply_filter;
use crate::group::group_rows;
use crate::model::{
    CategorySplit, ColumnDropPlan, FlaggedSource, GroupEntry, Key, PairRecon, Partition,
    PartitionRun, ReconBucket, ReconInput, ReconMeta, ReconSummary, RunResult, Source, Table,
    UnionRow, UniqueResult, UniqueSource,
};
use crate::normalize::NormalizeOptions;
use crate::partition::{partition_by_keys, split_blank};
use crate::unique::{first_occurrence_flags, SeenKeys};

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Reconcile two sources.
///
/// Produces per-row membership flags for both sides (row count and order
/// preserved exactly), the union of distinct canonical keys ascending with a
/// three-way classification, and the distinct-key summary counts.
pub fn reconcile(left: &Source, right: &Source, options: &NormalizeOptions) -> PairRecon {
    let left_keys = left.keys(options);
    let right_keys = right.keys(options);
    let left_groups = group_rows(left, &left_keys);
    let right_groups = group_rows(right, &right_keys);

    let left_flags = membership_flags(&left_keys, &right_groups);
    let right_flags = membership_flags(&right_keys, &left_groups);

    let mut union = Vec::new();
    let mut both = 0usize;
    let mut left_only = 0usize;
    let mut right_only = 0usize;

    let all_keys: BTreeSet<&String> = left_groups.keys().chain(right_groups.keys()).collect();
    for key in all_keys {
        let l = left_groups.get(key);
        let r = right_groups.get(key);
        let bucket = match (l.is_some(), r.is_some()) {
            (true, true) => {
                both += 1;
                ReconBucket::Both
            }
            (true, false) => {
                left_only += 1;
                ReconBucket::LeftOnly
            }
            (false, true) => {
                right_only += 1;
                ReconBucket::RightOnly
            }
            (false, false) => continue,
        };
        union.push(UnionRow {
            key: key.clone(),
            bucket,
            left_count: l.map_or(0, |g| g.count),
            right_count: r.map_or(0, |g| g.count),
            left_sample: l.map(|g| g.sample.clone()),
            right_sample: r.map(|g| g.sample.clone()),
        });
    }

    let summary = ReconSummary {
        left_keys: left_groups.len(),
        right_keys: right_groups.len(),
        both,
        left_only,
        right_only,
    };

    PairRecon {
        left: FlaggedSource {
            flag_column: format!("in_{}", right.name()),
            table: left.table.clone(),
            flags: left_flags,
        },
        right: FlaggedSource {
            flag_column: format!("in_{}", left.name()),
            table: right.table.clone(),
            flags: right_flags,
        },
        union,
        summary,
    }
}

/// Row key is non-empty and present in the other side's key index.
fn membership_flags(keys: &[Key], other: &BTreeMap<String, GroupEntry>) -> Vec<bool> {
    keys.iter()
        .map(|key| key.as_value().map_or(false, |s| other.contains_key(s)))
        .collect()
}

// ---------------------------------------------------------------------------
// Config-driven runs
// ---------------------------------------------------------------------------

/// Run the `[recon]` operation, plus the `[unique]` pass when configured.
pub fn run(config: &Config, input: &ReconInput) -> Result<RunResult, ReconError> {
    let pair = require_section(config.recon.as_ref(), "recon")?;
    let left = build_source(config, input, &pair.left)?;
    let right = build_source(config, input, &pair.right)?;

    let recon = reconcile(&left, &right, &config.normalize);
    let unique = match config.unique {
        Some(_) => Some(run_unique(config, input)?),
        None => None,
    };

    Ok(RunResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            left: pair.left.clone(),
            right: pair.right.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        recon,
        unique,
    })
}

/// Run the `[unique]` pass: per-source first-occurrence flags, plus global
/// flags threading one seen-set across `source_order`.
pub fn run_unique(config: &Config, input: &ReconInput) -> Result<UniqueResult, ReconError> {
    let unique = require_section(config.unique.as_ref(), "unique")?;

    let mut seen = SeenKeys::new();
    let mut sources = Vec::new();
    for name in &unique.source_order {
        let source = build_source(config, input, name)?;
        let keys = source.keys(&config.normalize);
        let local_flags = first_occurrence_flags(&keys);
        let global_flags = seen.mark(&keys);
        let norm_keys = keys
            .iter()
            .map(|k| k.as_value().unwrap_or("").to_string())
            .collect();
        sources.push(UniqueSource {
            table: source.table,
            local_flags,
            global_flags,
            norm_keys,
        });
    }

    Ok(UniqueResult {
        source_order: unique.source_order.clone(),
        sources,
    })
}

/// Run the `[partition]` operation: keep, on each side, the rows whose key
/// both sides share.
pub fn run_partition(config: &Config, input: &ReconInput) -> Result<PartitionRun, ReconError> {
    let cfg = require_section(config.partition.as_ref(), "partition")?;
    let left = build_source(config, input, &cfg.left)?;
    let right = build_source(config, input, &cfg.right)?;

    let left_keys: BTreeSet<String> =
        group_rows(&left, &left.keys(&config.normalize)).into_keys().collect();
    let right_keys: BTreeSet<String> =
        group_rows(&right, &right.keys(&config.normalize)).into_keys().collect();
    let common: BTreeSet<String> = left_keys.intersection(&right_keys).cloned().collect();

    Ok(PartitionRun {
        common_keys: common.len(),
        left_only_keys: left_keys.len() - common.len(),
        right_only_keys: right_keys.len() - common.len(),
        left: partition_by_keys(&left, &common, &config.normalize),
        right: partition_by_keys(&right, &common, &config.normalize),
    })
}

/// Run the `[prune_blank]` operation: split off rows with a blank identifier.
pub fn run_prune_blank(config: &Config, input: &ReconInput) -> Result<Partition, ReconError> {
    let cfg = require_section(config.prune_blank.as_ref(), "prune_blank")?;
    let source = build_source(config, input, &cfg.source)?;
    Ok(split_blank(&source, &config.normalize))
}

/// Run the `[split]` operation: one group per category value.
pub fn run_split(config: &Config, input: &ReconInput) -> Result<CategorySplit, ReconError> {
    let cfg = require_section(config.split.as_ref(), "split")?;
    let table = build_table(config, input, &cfg.source)?;
    split_by_category(&table, &cfg.category_column)
}

/// Run the `[drop_columns]` operation. Returns the trimmed table and the
/// plan that produced it, for reporting.
pub fn run_drop_columns(
    config: &Config,
    input: &ReconInput,
) -> Result<(Table, ColumnDropPlan), ReconError> {
    let cfg = require_section(config.drop_columns.as_ref(), "drop_columns")?;
    let table = build_table(config, input, &cfg.source)?;
    let plan = plan_column_drops(&table.columns, &cfg.columns);
    let trimmed = drop_columns(&table, &plan);
    Ok((trimmed, plan))
}

// ---------------------------------------------------------------------------
// Source assembly
// ---------------------------------------------------------------------------

/// Load CSV text into a [`Table`]. First record is the header row; short
/// data rows are allowed and read back as empty cells.
pub fn load_csv_table(name: &str, csv_data: &str) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(Table::new(name, columns, rows))
}

/// Look up a source's table, apply its row filter, and pin its name to the
/// config name.
pub fn build_table(config: &Config, input: &ReconInput, name: &str) -> Result<Table, ReconError> {
    let source_config = config
        .sources
        .get(name)
        .ok_or_else(|| ReconError::UnknownSource(name.to_string()))?;
    let table = input
        .tables
        .get(name)
        .ok_or_else(|| ReconError::UnknownSource(format!("'{name}' has no data")))?;

    let mut table = match source_config.filter {
        Some(ref filter) => apply_filter(table, filter)?,
        None => table.clone(),
    };
    table.name = name.to_string();
    Ok(table)
}

/// [`build_table`] plus identifier resolution.
pub fn build_source(config: &Config, input: &ReconInput, name: &str) -> Result<Source, ReconError> {
    let table = build_table(config, input, name)?;
    let id_column = config
        .sources
        .get(name)
        .and_then(|s| s.id_column.as_deref())
        .ok_or_else(|| {
            ReconError::ConfigValidation(format!("source '{name}' has no id_column"))
        })?;
    Source::from_table(table, id_column)
}

fn require_section<'a, T>(section: Option<&'a T>, name: &str) -> Result<&'a T, ReconError> {
    section.ok_or_else(|| ReconError::ConfigValidation(format!("config has no [{name}] section")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
