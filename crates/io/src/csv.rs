// CSV/TSV import/export

use std::io::Read;
use std::path::Path;

use bommatch_recon::model::Table;

pub fn import(name: &str, path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(name, &content, delimiter)
}

pub fn import_tsv(name: &str, path: &Path) -> Result<Table, String> {
    import_with_delimiter(name, path, b'\t')
}

pub fn import_with_delimiter(name: &str, path: &Path, delimiter: u8) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    import_from_string(name, &content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the first line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Score: (number of lines with same field count as line 1) * field_count.
        // Higher field count breaks ties.
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed. Procurement-portal CSV exports
/// in this domain are frequently CP932, so Shift-JIS is the fallback.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::SHIFT_JIS.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// First record is the header row; cells are trimmed for header use only.
/// Data rows keep their cells verbatim, and short rows are allowed.
fn import_from_string(name: &str, content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    Ok(Table::new(name, columns, rows))
}

pub fn export(table: &Table, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b',')
}

pub fn export_tsv(table: &Table, path: &Path) -> Result<(), String> {
    export_with_delimiter(table, path, b'\t')
}

fn export_with_delimiter(table: &Table, path: &Path, delimiter: u8) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| e.to_string())?;

    writer.write_record(&table.columns).map_err(|e| e.to_string())?;

    // Pad short rows so every record matches the schema width
    for row in &table.rows {
        let record: Vec<&str> = (0..table.columns.len())
            .map(|col| table.cell(row, col))
            .collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "部品No.,品名,数量\nA-100,キャップ,2\nB200,ボルト,4\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "部品No.\t品名\t数量\nA-100\tキャップ\t2\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        // Semicolon delimiter but commas appear inside quoted fields
        let content = "部品No.;品名;備考\nA-100;\"キャップ, 予備\";\"12,000\"\nB200;ボルト;-\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_import_reads_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parts.csv");
        fs::write(&path, "部品No., 品名 ,数量\nA-100,キャップ,2\nB200,ボルト\n").unwrap();

        let table = import("materials", &path).unwrap();
        assert_eq!(table.name, "materials");
        assert_eq!(table.columns, vec!["部品No.", "品名", "数量"]);
        assert_eq!(table.rows.len(), 2);
        // Short second row reads back as empty in the missing column
        assert_eq!(table.cell(&table.rows[1], 2), "");
    }

    #[test]
    fn test_shift_jis_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cp932.csv");

        let (encoded, _, _) = encoding_rs::SHIFT_JIS.encode("部品No.,品名\nA-100,先端キャップ\n");
        fs::write(&path, encoded.as_ref()).unwrap();

        let table = import("portal", &path).unwrap();
        assert_eq!(table.columns, vec!["部品No.", "品名"]);
        assert_eq!(table.rows[0], vec!["A-100", "先端キャップ"]);
    }

    #[test]
    fn test_leading_zeros_survive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zeros.csv");
        fs::write(&path, "部品No.,数量\n0012,3\n").unwrap();

        let table = import("zeros", &path).unwrap();
        assert_eq!(table.rows[0][0], "0012");
    }

    #[test]
    fn test_export_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let table = Table::new(
            "out",
            vec!["部品No.".into(), "品名".into()],
            vec![
                vec!["A-100".into(), "キャップ".into()],
                vec!["B200".into()],
            ],
        );
        export(&table, &path).unwrap();

        let back = import("out", &path).unwrap();
        assert_eq!(back.columns, table.columns);
        assert_eq!(back.rows.len(), 2);
        assert_eq!(back.rows[1], vec!["B200", ""]);
    }

    #[test]
    fn test_tsv_export_uses_tabs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.tsv");

        let table = Table::new(
            "out",
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()]],
        );
        export_tsv(&table, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains('\t'), "TSV should contain tab characters");

        let back = import_tsv("out", &path).unwrap();
        assert_eq!(back.rows[0], vec!["1", "2"]);
    }
}
