//! Line-delimited JSON in and out.

use crate::error::{EvalError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Read one value per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| EvalError::Json { line: i + 1, source })?;
        items.push(item);
    }
    log::debug!("Read {} lines from {}", items.len(), path.display());
    Ok(items)
}

/// Write one compact JSON value per line.
pub fn write_jsonl<T: Serialize>(path: &Path, items: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for (i, item) in items.into_iter().enumerate() {
        serde_json::to_writer(&mut writer, &item).map_err(|source| EvalError::Json { line: i + 1, source })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a single pretty-printed JSON document.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| EvalError::Json { line: 1, source })?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
