//! CSV datasets on disk.
//!
//! Typed rows go through `csv` + `serde`; arbitrary files (ticket exports)
//! are handled as an untyped [`Table`] so unknown columns survive enrichment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use pulse_common::{PulseError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

pub const EMAILS_DATASET: &str = "emails_cleaned.csv";
pub const ISSUES_DATASET: &str = "github_issues.csv";
pub const ISSUES_SENTIMENT_DATASET: &str = "github_issues_with_sentiment.csv";
pub const CHAT_LOG_DATASET: &str = "chat_logs.csv";

pub const EMOTION_COLUMN: &str = "emotion_sentiment";
pub const FINE_GRAINED_COLUMN: &str = "fine_grained_sentiment";
pub const THINKING_COLUMN: &str = "thinking";

/// `%Y-%m-%d %H:%M:%S`, the dashboard's timestamp format.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── CSV encoding ──────────────────────────────────────────────────────────────

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| PulseError::Io(e.into_error()))
}

/// Rows as CSV bytes, header first.
pub fn records_to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for row in rows {
        wtr.serialize(row)?;
    }
    finish(wtr)
}

pub fn records_from_csv<T: DeserializeOwned>(content: &str) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    rdr.deserialize().map(|r| r.map_err(PulseError::from)).collect()
}

/// Write through a sibling temp file so a reader never sees a half-written checkpoint.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

// ── Untyped table ─────────────────────────────────────────────────────────────

/// A CSV file held as header names plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(content.as_bytes());
        let headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let mut row: Vec<String> = record?.iter().map(String::from).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        finish(wtr)
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of `name`, or [`PulseError::MissingField`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| PulseError::missing_field(name))
    }

    /// Index of `name`, appending an empty column when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.column(name) {
            return i;
        }
        self.headers.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.headers.len() - 1
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows.get(row).and_then(|r| r.get(col)).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value.into();
        }
    }

    /// One JSON object per row, keyed by header.
    pub fn to_json_rows(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.headers
                    .iter()
                    .zip(row)
                    .map(|(h, v)| (h.clone(), serde_json::Value::String(v.clone())))
                    .collect()
            })
            .collect()
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub name: String,
    pub size_bytes: u64,
    pub last_updated: Option<String>,
}

/// A directory of CSV datasets.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    root: PathBuf,
    /// Held across the header check and the write in [`append`](Self::append).
    append_lock: Arc<Mutex<()>>,
}

fn display_time(modified: std::time::SystemTime) -> String {
    DateTime::<Local>::from(modified).format(DISPLAY_TIME_FORMAT).to_string()
}

impl DatasetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), append_lock: Arc::default() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of dataset `name` inside the store. Names are bare file names;
    /// `.csv` is appended when missing.
    pub fn path(&self, name: &str) -> Result<PathBuf> {
        let bare = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if !bare {
            return Err(PulseError::DatasetNotFound(name.to_string()));
        }
        let file = if name.ends_with(".csv") { name.to_string() } else { format!("{name}.csv") };
        Ok(self.root.join(file))
    }

    pub async fn exists(&self, name: &str) -> bool {
        match self.path(name) {
            Ok(p) => tokio::fs::try_exists(&p).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn read_string(&self, name: &str) -> Result<String> {
        let path = self.path(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PulseError::DatasetNotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        records_from_csv(&self.read_string(name).await?)
    }

    pub async fn write<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<()> {
        let path = self.path(name)?;
        write_atomic(&path, &records_to_csv(rows)?).await?;
        debug!(path = %path.display(), rows = rows.len(), "Dataset written");
        Ok(())
    }

    pub async fn read_table(&self, name: &str) -> Result<Table> {
        Table::from_csv(&self.read_string(name).await?)
    }

    /// Append one row; the header is written only when the file is new or empty.
    pub async fn append<T: Serialize>(&self, name: &str, row: &T) -> Result<()> {
        let path = self.path(name)?;
        let _guard = self.append_lock.lock().await;
        let has_content = match tokio::fs::metadata(&path).await {
            Ok(m) => m.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let mut wtr = csv::WriterBuilder::new().has_headers(!has_content).from_writer(Vec::new());
        wtr.serialize(row)?;
        let bytes = finish(wtr)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Modification time of dataset `name` in display format.
    pub async fn last_updated(&self, name: &str) -> Result<Option<String>> {
        let meta = tokio::fs::metadata(self.path(name)?).await?;
        Ok(meta.modified().ok().map(display_time))
    }

    /// CSV files directly under the root, sorted by name. A missing root is empty.
    pub async fn list(&self) -> Result<Vec<DatasetInfo>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await?;
            if !meta.is_file() || !name.ends_with(".csv") {
                continue;
            }
            out.push(DatasetInfo {
                name,
                size_bytes: meta.len(),
                last_updated: meta.modified().ok().map(display_time),
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
