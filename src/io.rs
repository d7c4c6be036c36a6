use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::types::common::Dataset;

/// Settings shared by every reader and writer.
#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    pub delimiter: u8,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions { delimiter: b',' }
    }
}

/// Reads a whole CSV file with a header row.
pub fn read_dataset(path: &Path, options: &CsvOptions) -> Result<Dataset> {
    if !path.is_file() {
        return Err(ToolError::FileNotFound(path.to_path_buf()));
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .from_path(path)?;

    let headers = rdr.headers()?.clone();
    let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), rows = rows.len(), "read CSV");

    Ok(Dataset::new(headers, rows))
}

/// Resolves `path` to the CSV files it names: the file itself, or the
/// `*.csv` files directly inside a directory in name order.
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ToolError::FileNotFound(path.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let candidate = entry?.path();
        let is_csv = candidate
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && candidate.is_file() {
            files.push(candidate);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(ToolError::NoMatches(format!(
            "no CSV files found in {}",
            path.display()
        )));
    }
    Ok(files)
}

/// Reads every CSV file under `path` into one dataset. All files must share
/// the header of the first one.
pub fn read_all(path: &Path, options: &CsvOptions) -> Result<Dataset> {
    let mut combined: Option<Dataset> = None;

    for file in input_files(path)? {
        let dataset = read_dataset(&file, options)?;
        match combined.as_mut() {
            None => combined = Some(dataset),
            Some(acc) => {
                if acc.headers != dataset.headers {
                    return Err(ToolError::SchemaMismatch(file));
                }
                acc.rows.extend(dataset.rows);
            }
        }
    }

    Ok(combined.unwrap_or_default())
}

fn write_records<W: Write>(writer: W, dataset: &Dataset, options: &CsvOptions) -> csv::Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(writer);

    wtr.write_record(&dataset.headers)?;
    for row in &dataset.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the dataset to `path`, replacing any existing file. The data goes
/// to a temporary file next to `path` first and is renamed into place only
/// once fully written, so a failure never leaves partial output behind.
pub fn write_dataset(path: &Path, dataset: &Dataset, options: &CsvOptions) -> Result<()> {
    let output_error = |source: std::io::Error| ToolError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(output_error)?;
    write_records(&mut tmp, dataset, options).map_err(|err| output_error(err.into()))?;

    // The temp file is created owner-only; an overwritten file keeps its own mode.
    if let Ok(existing) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .map_err(output_error)?;
    }
    tmp.persist(path).map_err(|err| output_error(err.error))?;

    debug!(path = %path.display(), rows = dataset.len(), "wrote CSV");
    Ok(())
}

pub fn write_stdout(dataset: &Dataset, options: &CsvOptions) -> Result<()> {
    let stdout = std::io::stdout();
    write_records(stdout.lock(), dataset, options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;
    use tempfile::tempdir;

    fn sample() -> Dataset {
        Dataset::new(
            StringRecord::from(vec!["id", "Memo", "Amount"]),
            vec![
                StringRecord::from(vec!["1", "rent, march", "100"]),
                StringRecord::from(vec!["2", "refund", "-100"]),
            ],
        )
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let result = read_dataset(&dir.path().join("missing.csv"), &CsvOptions::default());

        assert!(matches!(result, Err(ToolError::FileNotFound(_))));
    }

    #[test]
    fn test_write_then_read_keeps_quoted_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let options = CsvOptions::default();

        write_dataset(&path, &sample(), &options).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "id,Memo,Amount\n1,\"rent, march\",100\n2,refund,-100\n");

        let restored = read_dataset(&path, &options).unwrap();
        assert_eq!(restored, sample());
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale").unwrap();

        write_dataset(&path, &sample(), &CsvOptions::default()).unwrap();

        assert!(fs::read_to_string(&path).unwrap().starts_with("id,Memo,Amount"));
    }

    #[cfg(unix)]
    #[test]
    fn test_write_keeps_permissions_of_replaced_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("Cleaned.csv");
        fs::write(&path, "stale").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_dataset(&path, &sample(), &CsvOptions::default()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert!(fs::read_to_string(&path).unwrap().starts_with("id,Memo,Amount"));
    }

    #[test]
    fn test_write_into_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        let result = write_dataset(&path, &sample(), &CsvOptions::default());

        assert!(matches!(result, Err(ToolError::OutputWrite { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_custom_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("semi.csv");
        fs::write(&path, "id;Amount\n1;12.5\n").unwrap();
        let options = CsvOptions { delimiter: b';' };

        let data = read_dataset(&path, &options).unwrap();
        assert_eq!(data.headers, StringRecord::from(vec!["id", "Amount"]));
        assert_eq!(data.rows, vec![StringRecord::from(vec!["1", "12.5"])]);
    }

    #[test]
    fn test_read_all_directory_in_name_order() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "id,Amount\n2,20\n").unwrap();
        fs::write(dir.path().join("a.csv"), "id,Amount\n1,10\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let data = read_all(dir.path(), &CsvOptions::default()).unwrap();
        let ids: Vec<&str> = data.rows.iter().map(|row| &row[0]).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_read_all_rejects_mismatched_headers() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "id,Amount\n1,10\n").unwrap();
        fs::write(dir.path().join("b.csv"), "id,Total\n2,20\n").unwrap();

        let result = read_all(dir.path(), &CsvOptions::default());
        assert!(matches!(result, Err(ToolError::SchemaMismatch(_))));
    }

    #[test]
    fn test_input_files_empty_directory() {
        let dir = tempdir().unwrap();
        let result = input_files(dir.path());

        assert!(matches!(result, Err(ToolError::NoMatches(_))));
    }
}
