use serde::Serialize;

use crate::error::ReconError;
use crate::normalize::{self, NormalizeOptions};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A rectangular grid of cell values with a declared column schema.
///
/// Rows keep the order they were loaded in. Short rows read as empty
/// cells; cells are always strings so part numbers keep leading zeros.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn cell<'a>(&self, row: &'a [String], col: usize) -> &'a str {
        row.get(col).map(String::as_str).unwrap_or("")
    }

    /// Locate a column by header, tolerant of width, spacing, and case
    /// divergence between the config and the file. Exact normalized match
    /// wins; otherwise the first header that contains the wanted name.
    pub fn find_column(&self, wanted: &str) -> Option<usize> {
        let target = normalize::normalize_header(wanted);
        if target.is_empty() {
            return None;
        }
        let normalized: Vec<String> = self
            .columns
            .iter()
            .map(|c| normalize::normalize_header(c))
            .collect();
        if let Some(i) = normalized.iter().position(|c| *c == target) {
            return Some(i);
        }
        normalized.iter().position(|c| c.contains(&target))
    }
}

/// A table with its identifier column resolved.
#[derive(Debug, Clone)]
pub struct Source {
    pub table: Table,
    pub id_index: usize,
}

impl Source {
    /// Resolve `id_field` against the table schema. Fails before any
    /// reconciliation work if the column is absent.
    pub fn from_table(table: Table, id_field: &str) -> Result<Self, ReconError> {
        let id_index = table
            .find_column(id_field)
            .ok_or_else(|| ReconError::MissingField {
                source: table.name.clone(),
                field: id_field.to_string(),
                available: table.columns.clone(),
            })?;
        Ok(Self { table, id_index })
    }

    pub fn name(&self) -> &str {
        &self.table.name
    }

    /// Raw identifier cell of one row, pre-normalization.
    pub fn raw_id<'a>(&self, row: &'a [String]) -> &'a str {
        self.table.cell(row, self.id_index)
    }

    /// Canonical key per row, in row order.
    pub fn keys(&self, options: &NormalizeOptions) -> Vec<Key> {
        self.table
            .rows
            .iter()
            .map(|row| normalize::normalize(self.raw_id(row), options))
            .collect()
    }
}

/// Pre-loaded tables keyed by source name.
pub struct ReconInput {
    pub tables: std::collections::HashMap<String, Table>,
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Canonical identifier, or the sentinel for a blank/absent one.
///
/// `Empty` never matches anything, including another `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Empty,
    Value(String),
}

impl Key {
    pub fn as_value(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Value(s) => Some(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Occurrences of one canonical key within a single source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub count: usize,
    /// First raw identifier that produced this key, pre-normalization.
    pub sample: String,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconBucket {
    Both,
    LeftOnly,
    RightOnly,
}

impl std::fmt::Display for ReconBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Both => write!(f, "both"),
            Self::LeftOnly => write!(f, "left_only"),
            Self::RightOnly => write!(f, "right_only"),
        }
    }
}

/// One distinct canonical key from the union of both sides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnionRow {
    pub key: String,
    pub bucket: ReconBucket,
    pub left_count: usize,
    pub right_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_sample: Option<String>,
}

// ---------------------------------------------------------------------------
// Flagged output
// ---------------------------------------------------------------------------

/// An input table plus one appended boolean column.
///
/// `table` is the input verbatim: same rows, same order. The flag never
/// filters; `flags.len() == table.rows.len()` always holds.
#[derive(Debug, Clone, Serialize)]
pub struct FlaggedSource {
    pub table: Table,
    pub flag_column: String,
    pub flags: Vec<bool>,
}

impl FlaggedSource {
    pub fn name(&self) -> &str {
        &self.table.name
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

/// Distinct-key counts for one reconciled pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub left_keys: usize,
    pub right_keys: usize,
    pub both: usize,
    pub left_only: usize,
    pub right_only: usize,
}

/// Output of reconciling one pair of sources.
#[derive(Debug, Clone, Serialize)]
pub struct PairRecon {
    pub left: FlaggedSource,
    pub right: FlaggedSource,
    pub union: Vec<UnionRow>,
    pub summary: ReconSummary,
}

/// Per-source first-occurrence flags from a uniqueness pass.
///
/// `local_flags` scan each source alone; `global_flags` thread one seen-set
/// across the declared source order. `norm_keys` carries the canonical key
/// per row (blank for Empty) so reports can show what was compared.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueSource {
    pub table: Table,
    pub local_flags: Vec<bool>,
    pub global_flags: Vec<bool>,
    pub norm_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniqueResult {
    pub source_order: Vec<String>,
    pub sources: Vec<UniqueSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub meta: ReconMeta,
    pub recon: PairRecon,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<UniqueResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub left: String,
    pub right: String,
    pub engine_version: String,
    pub run_at: String,
}

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// A source split into retained and excluded rows. The two tables are
/// disjoint and interleave back into the input exactly.
#[derive(Debug, Clone, Serialize)]
pub struct Partition {
    pub retained: Table,
    pub excluded: Table,
    pub summary: PartitionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub rows_total: usize,
    pub rows_retained: usize,
    pub rows_excluded: usize,
    /// Distinct non-empty keys in the input.
    pub keys_total: usize,
    /// Distinct keys that survived into `retained`.
    pub keys_retained: usize,
}

/// Both sides of a pair partitioned against their shared key set.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionRun {
    pub left: Partition,
    pub right: Partition,
    pub common_keys: usize,
    pub left_only_keys: usize,
    pub right_only_keys: usize,
}

// ---------------------------------------------------------------------------
// Category split
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub label: String,
    pub table: Table,
    /// Share of categorized rows, rounded to 0.1%.
    pub share_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySplit {
    /// Groups by descending row count; ties keep first-appearance order.
    pub groups: Vec<CategoryGroup>,
    pub rows_total: usize,
    /// Rows dropped for having a blank category cell.
    pub rows_blank: usize,
}

// ---------------------------------------------------------------------------
// Column drops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDropPlan {
    /// Indices to drop, ascending.
    pub drop_indices: Vec<usize>,
    /// Original header names matched for dropping.
    pub dropped: Vec<String>,
    /// Reference names that matched no header.
    pub not_found: Vec<String>,
    pub columns_before: usize,
    pub columns_after: usize,
}
