//! File helpers for export and import.
//!
//! - Atomic writes: write to temp file, sync to disk, then rename
//! - Line-oriented JSON (JSONL) reading with line-numbered errors

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Write content to a file atomically.
///
/// This function:
/// 1. Writes content to a temporary file next to the target
/// 2. Calls `fsync` to ensure data is on disk
/// 3. Atomically renames the temp file to the target path
///
/// If any step fails, the original file (if any) remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");

    Ok(())
}

/// Read a JSONL file into records, skipping blank lines.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line does not parse;
/// the message names the offending line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(&line).map_err(|e| {
            Error::InvalidArgument(format!("{}:{}: {e}", path.display(), line_num + 1))
        })?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/out.json");

        atomic_write(&path, "first").unwrap();
        atomic_write(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!temp.path().join("nested/out.json.tmp").exists());
    }

    #[test]
    fn test_read_jsonl_reports_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("items.jsonl");
        fs::write(&path, "{\"n\":1}\n\n{\"n\":2}\nnot json\n").unwrap();

        #[derive(Debug, serde::Deserialize)]
        struct Row {
            #[allow(dead_code)]
            n: u32,
        }

        let err = read_jsonl::<Row>(&path).unwrap_err();
        assert!(err.to_string().contains(":4:"));

        fs::write(&path, "{\"n\":1}\n\n{\"n\":2}\n").unwrap();
        assert_eq!(read_jsonl::<Row>(&path).unwrap().len(), 2);
    }
}
