//! Aggregates the dashboard shows for a classified dataset.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pulse_common::Result;
use serde::Serialize;

use crate::store::{DatasetStore, Table, EMOTION_COLUMN, FINE_GRAINED_COLUMN};

/// Columns tried, in order, as the row date for the daily trend.
pub const DATE_COLUMNS: &[&str] = &["Date", "Created At", "timestamp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub filename: String,
    pub total: usize,
    pub emotion_counts: Vec<LabelCount>,
    pub fine_grained_counts: Vec<LabelCount>,
    /// `YYYY-MM-DD -> emotion label -> count`; absent when no date column exists.
    pub trend: Option<BTreeMap<String, BTreeMap<String, usize>>>,
    pub last_updated: Option<String>,
}

/// Body of an analyze response: every row plus the aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetAnalysis {
    pub data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub stats: DatasetStats,
}

/// Calendar day of an email, ISO or dashboard timestamp.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    // Mail clients often append a zone comment such as " (UTC)".
    let without_comment = match s.find(" (") {
        Some(i) if s.ends_with(')') => &s[..i],
        _ => s,
    };
    DateTime::parse_from_rfc2822(without_comment)
        .map(|d| d.date_naive())
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|d| d.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|d| d.date()))
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Sorted by count descending, then label ascending.
fn ranked(counts: HashMap<String, usize>) -> Vec<LabelCount> {
    let mut v: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();
    v.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    v
}

impl DatasetStats {
    /// Count labels over `table`. Fails with `MissingField` when either
    /// sentiment column is absent.
    pub fn from_table(filename: impl Into<String>, table: &Table) -> Result<Self> {
        let emotion_col = table.require_column(EMOTION_COLUMN)?;
        let fine_col = table.require_column(FINE_GRAINED_COLUMN)?;
        let date_col = DATE_COLUMNS.iter().find_map(|c| table.column(c));

        let mut emotion: HashMap<String, usize> = HashMap::new();
        let mut fine: HashMap<String, usize> = HashMap::new();
        let mut trend: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

        for row in 0..table.rows.len() {
            let e = table.cell(row, emotion_col);
            *emotion.entry(e.to_string()).or_default() += 1;
            *fine.entry(table.cell(row, fine_col).to_string()).or_default() += 1;

            if let Some(day) = date_col.and_then(|c| parse_day(table.cell(row, c))) {
                *trend
                    .entry(day.format("%Y-%m-%d").to_string())
                    .or_default()
                    .entry(e.to_string())
                    .or_default() += 1;
            }
        }

        Ok(Self {
            filename: filename.into(),
            total: table.rows.len(),
            emotion_counts: ranked(emotion),
            fine_grained_counts: ranked(fine),
            trend: date_col.map(|_| trend),
            last_updated: None,
        })
    }
}

/// Load dataset `name` and compute its rows and aggregates.
pub async fn analyze_dataset(store: &DatasetStore, name: &str) -> Result<DatasetAnalysis> {
    let table = store.read_table(name).await?;
    let filename = store
        .path(name)?
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let mut stats = DatasetStats::from_table(filename, &table)?;
    stats.last_updated = store.last_updated(name).await?;
    Ok(DatasetAnalysis { data: table.to_json_rows(), stats })
}
