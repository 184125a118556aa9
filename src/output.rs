use std::fs;
use std::io::{self, Write};
use std::time::Duration;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};
use crate::config::ReportSettings;
use crate::domain::OutputFormat;
use crate::error::LinksError;
use crate::results::ResultRow;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Table columns as (key, title); keys match the `ResultRow` field names.
pub const COLUMNS: &[(&str, &str)] = &[
    ("name", "Name"),
    ("sample", "Sample"),
    ("project_name", "Project"),
    ("folder", "Folder"),
    ("url", "URL"),
    ("index_url", "Index URL"),
    ("project_id", "Project ID"),
    ("file_id", "File ID"),
    ("index_file_id", "Index file ID"),
];

pub struct TableMeta<'a> {
    pub report: &'a ReportSettings,
    pub generated_at: DateTime<Utc>,
    pub ttl: Duration,
}

#[derive(Debug, Serialize)]
pub struct Column {
    pub data: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ColumnDef {
    pub targets: Vec<usize>,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// JSON document consumed by the dashboard. Key names are fixed.
#[derive(Debug, Serialize)]
pub struct TableEnvelope<'a> {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    pub columns: Vec<Column>,
    #[serde(rename = "columnDefs")]
    pub column_defs: Vec<ColumnDef>,
    pub data: &'a [ResultRow],
}

impl<'a> TableEnvelope<'a> {
    pub fn new(meta: &TableMeta<'_>, rows: &'a [ResultRow]) -> Self {
        let columns = COLUMNS
            .iter()
            .map(|&(data, title)| Column { data, title })
            .collect();
        let url_targets = COLUMNS
            .iter()
            .enumerate()
            .filter(|(_, (key, _))| key.ends_with("url"))
            .map(|(idx, _)| idx)
            .collect();
        Self {
            label: meta.report.label.clone(),
            kind: "table",
            description: format!(
                "{} (generated {}, links valid for {})",
                meta.report.description,
                meta.generated_at.format("%Y-%m-%d %H:%M UTC"),
                describe_ttl(meta.ttl)
            ),
            columns,
            column_defs: vec![ColumnDef {
                targets: url_targets,
                kind: "url",
            }],
            data: rows,
        }
    }
}

/// Largest whole unit that divides the TTL exactly, so 5400 s reads as 90m.
fn describe_ttl(ttl: Duration) -> String {
    let seconds = ttl.as_secs();
    if seconds >= 3600 && seconds % 3600 == 0 {
        format!("{}h", seconds / 3600)
    } else if seconds >= 60 && seconds % 60 == 0 {
        format!("{}m", seconds / 60)
    } else {
        format!("{seconds}s")
    }
}

pub fn render_csv(rows: &[ResultRow]) -> Result<Vec<u8>, LinksError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| LinksError::Output(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| LinksError::Output(err.to_string()))
}

pub fn render_json(meta: &TableMeta<'_>, rows: &[ResultRow]) -> Result<Vec<u8>, LinksError> {
    let envelope = TableEnvelope::new(meta, rows);
    let mut bytes =
        serde_json::to_vec_pretty(&envelope).map_err(|err| LinksError::Output(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Renders the table fully, then moves it into place so a failed run never
/// leaves a partial file behind.
pub fn write_table(
    path: &Utf8Path,
    format: OutputFormat,
    meta: &TableMeta<'_>,
    rows: &[ResultRow],
) -> Result<(), LinksError> {
    let content = match format {
        OutputFormat::Csv => render_csv(rows)?,
        OutputFormat::Json => render_json(meta, rows)?,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| LinksError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".dx-links")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| LinksError::Filesystem(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| LinksError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| LinksError::Filesystem(err.to_string()))?;
    Ok(())
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let json = serde_json::to_string_pretty(summary)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, event: ProgressEvent) {
        tracing::debug!(message = %event.message, "progress");
    }
}
