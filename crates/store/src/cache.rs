//! Cache backends
//!
//! The cache holds rows committed by a flush. JSON has no NaN or infinity, so
//! the file backend writes NaN as `null` and infinities as `"inf"`/`"-inf"`.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, Row, Table, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Storage for flushed rows
pub trait CacheBackend: Send {
    /// Append rows after the ones already cached
    fn append(&mut self, rows: &[Row]) -> Result<(), ContractError>;

    /// All cached rows in commit order
    fn load(&self) -> Result<Table, ContractError>;

    /// Drop every cached row and release the underlying resource
    fn delete(&mut self) -> Result<(), ContractError>;
}

/// Cache kept in process memory
#[derive(Debug, Default)]
pub struct MemoryCache {
    table: Table,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheBackend for MemoryCache {
    fn append(&mut self, rows: &[Row]) -> Result<(), ContractError> {
        self.table.extend(rows.iter().cloned());
        Ok(())
    }

    fn load(&self) -> Result<Table, ContractError> {
        Ok(self.table.clone())
    }

    fn delete(&mut self) -> Result<(), ContractError> {
        self.table.clear();
        Ok(())
    }
}

/// A sample value as JSON can hold it
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum CacheValue {
    Number(f64),
    Infinite(String),
    Missing,
}

impl From<f64> for CacheValue {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Self::Missing
        } else if v == f64::INFINITY {
            Self::Infinite("inf".into())
        } else if v == f64::NEG_INFINITY {
            Self::Infinite("-inf".into())
        } else {
            Self::Number(v)
        }
    }
}

impl CacheValue {
    fn to_f64(&self) -> Result<f64, String> {
        match self {
            Self::Number(v) => Ok(*v),
            Self::Infinite(s) if s == "inf" => Ok(f64::INFINITY),
            Self::Infinite(s) if s == "-inf" => Ok(f64::NEG_INFINITY),
            Self::Infinite(s) => Err(format!("unknown value {s:?}")),
            Self::Missing => Ok(f64::NAN),
        }
    }
}

/// One cached row on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    timestamp: Timestamp,
    values: Vec<(String, CacheValue)>,
}

impl From<&Row> for CacheRecord {
    fn from(row: &Row) -> Self {
        Self {
            timestamp: row.timestamp,
            values: row
                .values
                .iter()
                .map(|(k, v)| (k.clone(), CacheValue::from(*v)))
                .collect(),
        }
    }
}

impl TryFrom<CacheRecord> for Row {
    type Error = String;

    fn try_from(record: CacheRecord) -> Result<Self, Self::Error> {
        let mut row = Row::new(record.timestamp);
        for (key, value) in record.values {
            let value = value.to_f64().map_err(|e| format!("{key}: {e}"))?;
            row.insert(key, value);
        }
        Ok(row)
    }
}

/// Cache stored as one JSON object per line
#[derive(Debug)]
pub struct JsonLinesCache {
    path: PathBuf,
}

impl JsonLinesCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheBackend for JsonLinesCache {
    #[instrument(name = "jsonl_cache_append", skip(self, rows), fields(path = %self.path.display(), rows = rows.len()))]
    fn append(&mut self, rows: &[Row]) -> Result<(), ContractError> {
        if rows.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            serde_json::to_writer(&mut writer, &CacheRecord::from(row))
                .map_err(|e| ContractError::store_cache(format!("encode row: {e}")))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        debug!("rows appended to cache");
        Ok(())
    }

    fn load(&self) -> Result<Table, ContractError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Table::new()),
            Err(e) => return Err(e.into()),
        };

        let mut table = Table::new();
        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let decode_error = |e: &dyn std::fmt::Display| {
                ContractError::store_cache(format!("{}:{}: {e}", self.path.display(), index + 1))
            };
            let record: CacheRecord =
                serde_json::from_str(&line).map_err(|e| decode_error(&e))?;
            table.push(Row::try_from(record).map_err(|e| decode_error(&e))?);
        }
        Ok(table)
    }

    fn delete(&mut self) -> Result<(), ContractError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cache file removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
