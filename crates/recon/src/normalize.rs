use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::model::Key;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFold {
    Upper,
    Lower,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitespaceMode {
    Remove,
    Collapse,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizeOptions {
    pub unify_dash: bool,
    pub case: CaseFold,
    pub whitespace: WhitespaceMode,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            unify_dash: true,
            case: CaseFold::Upper,
            whitespace: WhitespaceMode::Remove,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Canonicalize one raw identifier value.
///
/// Fixed step order: NFKC fold, ideographic space to ASCII space plus outer
/// trim, invisible removal, dash unification, whitespace handling, case
/// fold. Steps never fail; a value that comes out empty is `Key::Empty`.
///
/// Idempotent for every option set: feeding a produced key back through
/// yields the same key.
pub fn normalize(raw: &str, options: &NormalizeOptions) -> Key {
    let s = fold_compat(raw);
    let s = trim_outer(&s);
    let s = strip_invisibles(&s);
    let s = if options.unify_dash { unify_dashes(&s) } else { s };
    let s = apply_whitespace(&s, options.whitespace);
    let s = apply_case(&s, options.case);
    if s.is_empty() {
        Key::Empty
    } else {
        Key::Value(s)
    }
}

/// Comparison form for column headers: NFKC fold, invisible and whitespace
/// removal, uppercase. Used to match configured column names against file
/// schemas regardless of width, spacing, or case.
pub fn normalize_header(raw: &str) -> String {
    let s = strip_invisibles(&fold_compat(raw));
    let s: String = s.split_whitespace().collect();
    s.to_uppercase()
}

fn fold_compat(s: &str) -> String {
    s.nfkc().collect()
}

fn trim_outer(s: &str) -> String {
    s.replace('\u{3000}', " ").trim().to_string()
}

fn strip_invisibles(s: &str) -> String {
    s.chars().filter(|c| !is_invisible(*c)).collect()
}

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{00A0}' | '\u{200B}'..='\u{200D}' | '\u{FEFF}')
}

fn unify_dashes(s: &str) -> String {
    s.chars()
        .map(|c| if is_dash_like(c) { '-' } else { c })
        .collect()
}

/// Minus sign, hyphen through horizontal-bar dashes, box-drawing horizontal,
/// full-width hyphen-minus, and the katakana long-vowel mark, which these
/// part lists use as a dash surrogate.
fn is_dash_like(c: char) -> bool {
    matches!(
        c,
        '\u{2212}' | '\u{2010}'..='\u{2015}' | '\u{2500}' | '\u{FF0D}' | '\u{30FC}'
    )
}

fn apply_whitespace(s: &str, mode: WhitespaceMode) -> String {
    match mode {
        WhitespaceMode::Remove => s.split_whitespace().collect(),
        WhitespaceMode::Collapse => s.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn apply_case(s: &str, case: CaseFold) -> String {
    match case {
        CaseFold::Upper => s.to_uppercase(),
        CaseFold::Lower => s.to_lowercase(),
        CaseFold::None => s.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
