// Excel sheet-name constraints

use std::collections::HashSet;

/// Make a string safe to use as an Excel sheet name.
///
/// Excel forbids `: \ / ? * [ ]`; those become underscores. Apostrophes
/// break `HYPERLINK` references to the sheet, so they become U+2019. An
/// empty result falls back to "Sheet", and the name is clamped to Excel's
/// 31-character limit.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            ':' | '\\' | '/' | '?' | '*' | '[' | ']' => '_',
            '\'' => '\u{2019}',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "Sheet".to_string();
    }
    truncate_chars(cleaned, 31)
}

/// Disambiguate duplicate sheet names with `_2`, `_3`… suffixes, keeping
/// the result within the 31-character limit. The chosen name is recorded
/// in `used`.
pub fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut i = 2;
    while used.contains(&name) {
        let suffix = format!("_{i}");
        let room = 31usize.saturating_sub(suffix.chars().count());
        name = format!("{}{suffix}", truncate_chars(base, room));
        i += 1;
    }
    used.insert(name.clone());
    name
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_characters_become_underscores() {
        assert_eq!(sanitize_sheet_name("a:b\\c/d?e*f[g]h"), "a_b_c_d_e_f_g_h");
    }

    #[test]
    fn test_apostrophe_becomes_typographic() {
        assert_eq!(sanitize_sheet_name("don't"), "don\u{2019}t");
    }

    #[test]
    fn test_blank_name_falls_back() {
        assert_eq!(sanitize_sheet_name("   "), "Sheet");
        assert_eq!(sanitize_sheet_name(""), "Sheet");
    }

    #[test]
    fn test_long_names_clamp_to_31_chars() {
        let long = "塗装不良_工程内検査_2025年度上期_サンプリング詳細一覧まとめ";
        assert_eq!(long.chars().count(), 33);
        let cleaned = sanitize_sheet_name(long);
        assert_eq!(cleaned.chars().count(), 31);
    }

    #[test]
    fn test_duplicates_get_numeric_suffixes() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("組立", &mut used), "組立");
        assert_eq!(unique_name("組立", &mut used), "組立_2");
        assert_eq!(unique_name("組立", &mut used), "組立_3");
    }

    #[test]
    fn test_suffix_fits_within_limit() {
        let base: String = "あ".repeat(31);
        let mut used = HashSet::new();
        assert_eq!(unique_name(&base, &mut used), base);
        let second = unique_name(&base, &mut used);
        assert_eq!(second.chars().count(), 31);
        assert!(second.ends_with("_2"));
    }
}
