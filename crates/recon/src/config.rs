use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ReconError;
use crate::normalize::NormalizeOptions;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default)]
    pub recon: Option<ReconPair>,
    #[serde(default)]
    pub unique: Option<UniqueConfig>,
    #[serde(default)]
    pub partition: Option<PartitionConfig>,
    #[serde(default)]
    pub prune_blank: Option<PruneBlankConfig>,
    #[serde(default)]
    pub split: Option<SplitConfig>,
    #[serde(default)]
    pub drop_columns: Option<DropColumnsConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// CSV or XLSX path, resolved relative to the config file by the caller.
    pub file: String,
    /// Worksheet to read; first sheet when absent. Ignored for CSV.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Identifier column, matched against the file header tolerantly.
    /// Required by key-based operations; `[split]` and `[drop_columns]`
    /// work without one.
    #[serde(default)]
    pub id_column: Option<String>,
    #[serde(default)]
    pub filter: Option<RowFilter>,
}

/// Row selection applied before any matching. Exactly one of `contains` /
/// `equals` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct RowFilter {
    pub column: String,
    #[serde(default)]
    pub contains: Option<String>,
    #[serde(default)]
    pub equals: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconPair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UniqueConfig {
    /// Explicit scan order for the cross-source pass. Never inferred.
    pub source_order: Vec<String>,
}

/// Keep, on each side, only the rows whose key both sides share.
#[derive(Debug, Clone, Deserialize)]
pub struct PartitionConfig {
    pub left: String,
    pub right: String,
}

/// Drop the rows of one source whose identifier is blank.
#[derive(Debug, Clone, Deserialize)]
pub struct PruneBlankConfig {
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitConfig {
    pub source: String,
    pub category_column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DropColumnsConfig {
    pub source: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub file: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl Config {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: Config =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one source is required".into(),
            ));
        }

        for (name, source) in &self.sources {
            if let Some(ref filter) = source.filter {
                match (&filter.contains, &filter.equals) {
                    (Some(_), Some(_)) => {
                        return Err(ReconError::ConfigValidation(format!(
                            "source '{name}': filter sets both 'contains' and 'equals'"
                        )));
                    }
                    (None, None) => {
                        return Err(ReconError::ConfigValidation(format!(
                            "source '{name}': filter needs 'contains' or 'equals'"
                        )));
                    }
                    (None, Some(values)) if values.is_empty() => {
                        return Err(ReconError::ConfigValidation(format!(
                            "source '{name}': filter 'equals' list is empty"
                        )));
                    }
                    _ => {}
                }
            }
        }

        let known = |section: &str, name: &String| -> Result<(), ReconError> {
            if self.sources.contains_key(name) {
                Ok(())
            } else {
                Err(ReconError::UnknownSource(format!(
                    "[{section}] references '{name}'"
                )))
            }
        };

        // Key-based operations need an identifier column on every source
        // they touch.
        let keyed = |section: &str, name: &String| -> Result<(), ReconError> {
            known(section, name)?;
            if self.sources[name].id_column.is_none() {
                return Err(ReconError::ConfigValidation(format!(
                    "[{section}] uses source '{name}', which has no id_column"
                )));
            }
            Ok(())
        };

        if let Some(ref pair) = self.recon {
            keyed("recon", &pair.left)?;
            keyed("recon", &pair.right)?;
            if pair.left == pair.right {
                return Err(ReconError::ConfigValidation(
                    "[recon] left and right must differ".into(),
                ));
            }
        }

        if let Some(ref unique) = self.unique {
            if unique.source_order.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "[unique] source_order is empty".into(),
                ));
            }
            for name in &unique.source_order {
                keyed("unique", name)?;
            }
            let mut seen = std::collections::HashSet::new();
            for name in &unique.source_order {
                if !seen.insert(name) {
                    return Err(ReconError::ConfigValidation(format!(
                        "[unique] source_order lists '{name}' twice"
                    )));
                }
            }
        }

        if let Some(ref partition) = self.partition {
            keyed("partition", &partition.left)?;
            keyed("partition", &partition.right)?;
            if partition.left == partition.right {
                return Err(ReconError::ConfigValidation(
                    "[partition] left and right must differ".into(),
                ));
            }
        }

        if let Some(ref prune) = self.prune_blank {
            keyed("prune_blank", &prune.source)?;
        }

        if let Some(ref split) = self.split {
            known("split", &split.source)?;
        }

        if let Some(ref drop) = self.drop_columns {
            known("drop_columns", &drop.source)?;
            if drop.columns.is_empty() {
                return Err(ReconError::ConfigValidation(
                    "[drop_columns] columns list is empty".into(),
                ));
            }
        }

        if self.recon.is_none()
            && self.unique.is_none()
            && self.partition.is_none()
            && self.prune_blank.is_none()
            && self.split.is_none()
            && self.drop_columns.is_none()
        {
            return Err(ReconError::ConfigValidation(
                "config defines no operation ([recon], [unique], [partition], [prune_blank], [split], or [drop_columns])"
                    .into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{CaseFold, WhitespaceMode};

    const VALID: &str = r#"
name = "materials vs assybom"

[normalize]
unify_dash = true
case = "upper"
whitespace = "remove"

[sources.materials]
file = "materials.xlsx"
sheet = "単品"
id_column = "品目(Ver無)"

[sources.materials.filter]
column = "区分"
contains = "先端キャップ"

[sources.assybom]
file = "assybom.csv"
id_column = "部品No."

[recon]
left = "materials"
right = "assybom"

[unique]
source_order = ["materials", "assybom"]

[output]
file = "recon-report.xlsx"
"#;

    #[test]
    fn parse_valid_config() {
        let config = Config::from_toml(VALID).unwrap();
        assert_eq!(config.name, "materials vs assybom");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources["materials"].sheet.as_deref(), Some("単品"));
        let filter = config.sources["materials"].filter.as_ref().unwrap();
        assert_eq!(filter.contains.as_deref(), Some("先端キャップ"));
        let pair = config.recon.as_ref().unwrap();
        assert_eq!(pair.left, "materials");
        assert_eq!(pair.right, "assybom");
        assert_eq!(
            config.unique.as_ref().unwrap().source_order,
            vec!["materials", "assybom"]
        );
        assert_eq!(config.output.file.as_deref(), Some("recon-report.xlsx"));
    }

    #[test]
    fn normalize_section_defaults() {
        let toml = r#"
name = "defaults"

[sources.a]
file = "a.csv"
id_column = "id"

[sources.b]
file = "b.csv"
id_column = "id"

[recon]
left = "a"
right = "b"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert!(config.normalize.unify_dash);
        assert_eq!(config.normalize.case, CaseFold::Upper);
        assert_eq!(config.normalize.whitespace, WhitespaceMode::Remove);
    }

    #[test]
    fn reject_unknown_source_in_recon() {
        let toml = r#"
name = "bad"

[sources.a]
file = "a.csv"
id_column = "id"

[recon]
left = "a"
right = "missing"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("'missing'"));
    }

    #[test]
    fn reject_recon_pairing_a_source_with_itself() {
        let toml = r#"
name = "bad"

[sources.a]
file = "a.csv"
id_column = "id"

[recon]
left = "a"
right = "a"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn reject_filter_with_both_modes() {
        let toml = r#"
name = "bad"

[sources.a]
file = "a.csv"
id_column = "id"

[sources.a.filter]
column = "区分"
contains = "x"
equals = ["y"]

[split]
source = "a"
category_column = "区分"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn reject_keyed_operation_on_source_without_id() {
        let toml = r#"
name = "bad"

[sources.a]
file = "a.csv"
id_column = "id"

[sources.b]
file = "b.csv"

[recon]
left = "a"
right = "b"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("no id_column"));
    }

    #[test]
    fn split_source_needs_no_id_column() {
        let toml = r#"
name = "ok"

[sources.defects]
file = "defects.xlsx"

[split]
source = "defects"
category_column = "不良カテゴリ"
"#;
        let config = Config::from_toml(toml).unwrap();
        assert!(config.sources["defects"].id_column.is_none());
    }

    #[test]
    fn reject_duplicate_in_source_order() {
        let toml = r#"
name = "bad"

[sources.a]
file = "a.csv"
id_column = "id"

[unique]
source_order = ["a", "a"]
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("twice"));
    }

    #[test]
    fn reject_config_without_operations() {
        let toml = r#"
name = "bad"

[sources.a]
file = "a.csv"
id_column = "id"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("no operation"));
    }

    #[test]
    fn reject_invalid_case_value() {
        let toml = r#"
name = "bad"

[normalize]
case = "uppre"

[sources.a]
file = "a.csv"
id_column = "id"

[split]
source = "a"
category_column = "c"
"#;
        let err = Config::from_toml(toml).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn partition_and_drop_sections_parse() {
        let toml = r#"
name = "ops"

[sources.ca]
file = "ca.xlsx"
id_column = "品番"

[sources.kaf]
file = "kaf.xlsx"
id_column = "品番"

[partition]
left = "ca"
right = "kaf"

[prune_blank]
source = "ca"

[drop_columns]
source = "ca"
columns = ["社内備考", "旧単価"]
"#;
        let config = Config::from_toml(toml).unwrap();
        let partition = config.partition.as_ref().unwrap();
        assert_eq!(partition.left, "ca");
        assert_eq!(partition.right, "kaf");
        assert_eq!(config.prune_blank.as_ref().unwrap().source, "ca");
        let drop = config.drop_columns.as_ref().unwrap();
        assert_eq!(drop.columns.len(), 2);
    }
}
