use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::{CatalogClient, FileRecord};
use crate::config::{FileCategory, ResolvedConfig};
use crate::domain::{NamePattern, OutputFormat, RecencyWindow};
use crate::error::LinksError;
use crate::links::UrlAssembler;
use crate::output::{TableMeta, write_table};
use crate::pairing::{PairedRow, pair};
use crate::projects::ProjectNameCache;
use crate::results::{ResultRow, aggregate};
use crate::rows::{NormalizedRow, extract_sample, normalize};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub window: RecencyWindow,
    pub output: Utf8PathBuf,
    pub format: OutputFormat,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub window: String,
    pub created_after: String,
    pub output: String,
    pub format: OutputFormat,
    pub ttl_seconds: u64,
    pub written: bool,
    pub rows_written: usize,
    pub projects_resolved: usize,
    pub categories: Vec<CategorySummary>,
}

impl RunSummary {
    pub fn failed_categories(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.status == CategoryStatus::Failed)
            .count()
    }

    pub fn failed_rows(&self) -> usize {
        self.categories.iter().map(|c| c.failed_rows.len()).sum()
    }

    pub fn dropped_rows(&self) -> usize {
        self.categories.iter().map(|c| c.dropped.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryStatus {
    Linked,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub label: String,
    pub status: CategoryStatus,
    pub primary_count: usize,
    pub index_count: usize,
    pub paired_count: usize,
    pub linked_count: usize,
    pub dropped: Vec<RowRef>,
    pub failed_rows: Vec<FailedRow>,
    pub error: Option<String>,
}

impl CategorySummary {
    fn new(label: &str, status: CategoryStatus) -> Self {
        Self {
            label: label.to_string(),
            status,
            primary_count: 0,
            index_count: 0,
            paired_count: 0,
            linked_count: 0,
            dropped: Vec::new(),
            failed_rows: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowRef {
    pub name: String,
    pub folder: String,
    pub project: String,
}

impl From<&NormalizedRow> for RowRef {
    fn from(row: &NormalizedRow) -> Self {
        Self {
            name: row.name.clone(),
            folder: row.folder.clone(),
            project: row.container.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FailedRow {
    pub name: String,
    pub folder: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
    /// Rows done / rows total within the current category.
    pub progress: Option<(usize, usize)>,
}

impl ProgressEvent {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            elapsed: None,
            progress: None,
        }
    }
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<C: CatalogClient> {
    catalog: C,
    config: ResolvedConfig,
}

impl<C: CatalogClient> App<C> {
    pub fn new(catalog: C, config: ResolvedConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Runs every configured category, then writes the sorted table.
    ///
    /// A failing category is recorded in the summary and the others still run;
    /// only when every category fails is the first error returned.
    pub fn run(
        &self,
        options: RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunSummary, LinksError> {
        let created_after = options.window.created_after(options.now)?;
        tracing::info!(
            window = %options.window,
            created_after = %created_after.to_rfc3339(),
            categories = self.config.categories.len(),
            "starting link generation"
        );

        let mut cache = ProjectNameCache::new(&self.catalog);
        let assembler = UrlAssembler::new(&self.catalog, self.config.ttl);

        let mut results = Vec::new();
        let mut summaries = Vec::new();
        let mut first_error = None;
        for category in &self.config.categories {
            match self.link_category(category, created_after, &mut cache, &assembler, sink) {
                Ok((rows, summary)) => {
                    results.push(rows);
                    summaries.push(summary);
                }
                Err(err) => {
                    tracing::error!(category = %category.label, error = %err, "category aborted");
                    sink.event(ProgressEvent::message(format!(
                        "phase=Search; {} failed: {err}",
                        category.label
                    )));
                    let mut summary = CategorySummary::new(&category.label, CategoryStatus::Failed);
                    summary.error = Some(err.to_string());
                    summaries.push(summary);
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error
            && !summaries.is_empty()
            && summaries.iter().all(|s| s.status == CategoryStatus::Failed)
        {
            return Err(err);
        }

        let rows = aggregate(results);
        let written = if rows.is_empty() {
            tracing::info!(
                window = %options.window,
                "no matching files were found within the time frame"
            );
            sink.event(ProgressEvent::message(format!(
                "phase=Write; no matching files within {}",
                options.window
            )));
            false
        } else {
            sink.event(ProgressEvent::message(format!(
                "phase=Write; writing {} rows to {}",
                rows.len(),
                options.output
            )));
            let meta = TableMeta {
                report: &self.config.report,
                generated_at: options.now,
                ttl: self.config.ttl,
            };
            write_table(&options.output, options.format, &meta, &rows)?;
            tracing::info!(rows = rows.len(), output = %options.output, "output written");
            true
        };

        Ok(RunSummary {
            window: options.window.to_string(),
            created_after: created_after.to_rfc3339(),
            output: options.output.to_string(),
            format: options.format,
            ttl_seconds: self.config.ttl.as_secs(),
            written,
            rows_written: if written { rows.len() } else { 0 },
            projects_resolved: cache.len(),
            categories: summaries,
        })
    }

    fn search(
        &self,
        category: &FileCategory,
        pattern: &NamePattern,
        created_after: DateTime<Utc>,
        sink: &dyn ProgressSink,
    ) -> Result<Vec<FileRecord>, LinksError> {
        sink.event(ProgressEvent::message(format!(
            "phase=Search; {}: {pattern}",
            category.label
        )));
        sink.event(ProgressEvent::message("catalog.request"));
        let start = Instant::now();
        let records = self.catalog.search(pattern, created_after)?;
        let latency = start.elapsed();
        sink.event(ProgressEvent {
            message: format!("catalog.response latency_ms={}", latency.as_millis()),
            elapsed: Some(latency),
            progress: None,
        });
        tracing::info!(
            category = %category.label,
            pattern = %pattern,
            found = records.len(),
            "catalog search finished"
        );
        Ok(records)
    }

    fn link_category(
        &self,
        category: &FileCategory,
        created_after: DateTime<Utc>,
        cache: &mut ProjectNameCache<'_, C>,
        assembler: &UrlAssembler<'_, C>,
        sink: &dyn ProgressSink,
    ) -> Result<(Vec<ResultRow>, CategorySummary), LinksError> {
        let mut summary = CategorySummary::new(&category.label, CategoryStatus::Linked);

        let primary_records = self.search(category, &category.pattern, created_after, sink)?;
        summary.primary_count = primary_records.len();
        if primary_records.is_empty() {
            tracing::info!(category = %category.label, "no files found, skipping category");
            summary.status = CategoryStatus::Skipped;
            return Ok((Vec::new(), summary));
        }
        let primary = normalize(&primary_records, category.index_suffix())?;

        let pairing = match &category.index {
            Some(index) => {
                let index_records = self.search(category, &index.pattern, created_after, sink)?;
                summary.index_count = index_records.len();
                let index_rows = normalize(&index_records, None)?;
                sink.event(ProgressEvent::message(format!(
                    "phase=Pair; {}: matching {} files against {} indexes",
                    category.label,
                    primary.len(),
                    index_rows.len()
                )));
                pair(primary, &index_rows)
            }
            None => pair(primary, &[]),
        };

        summary.paired_count = pairing.paired.len();
        if !pairing.dropped.is_empty() {
            tracing::warn!(
                category = %category.label,
                dropped = pairing.dropped.len(),
                "files without a matching index were left out"
            );
            for row in &pairing.dropped {
                tracing::warn!(name = %row.name, folder = %row.folder, project = %row.container, "no index found");
            }
        }
        summary.dropped = pairing.dropped.iter().map(RowRef::from).collect();

        let total = pairing.paired.len();
        sink.event(ProgressEvent {
            message: format!("phase=Link; {}: generating {total} links", category.label),
            elapsed: None,
            progress: Some((0, total)),
        });

        let mut rows = Vec::with_capacity(total);
        for (position, paired) in pairing.paired.iter().enumerate() {
            match self.link_row(category, paired, cache, assembler) {
                Ok(row) => rows.push(row),
                Err(err) => {
                    tracing::warn!(name = %paired.primary.name, error = %err, "row skipped");
                    summary.failed_rows.push(FailedRow {
                        name: paired.primary.name.clone(),
                        folder: paired.primary.folder.clone(),
                        reason: err.to_string(),
                    });
                }
            }
            sink.event(ProgressEvent {
                message: format!("link {}", paired.primary.name),
                elapsed: None,
                progress: Some((position + 1, total)),
            });
        }
        summary.linked_count = rows.len();

        Ok((rows, summary))
    }

    fn link_row(
        &self,
        category: &FileCategory,
        paired: &PairedRow,
        cache: &mut ProjectNameCache<'_, C>,
        assembler: &UrlAssembler<'_, C>,
    ) -> Result<ResultRow, LinksError> {
        let primary = &paired.primary;
        let project_name = cache.resolve(&primary.container)?;
        let links = assembler.link(paired)?;
        Ok(ResultRow {
            name: primary.name.clone(),
            sample: category
                .sample_pattern
                .as_ref()
                .and_then(|pattern| extract_sample(&primary.name, pattern)),
            project_name,
            folder: primary.folder.clone(),
            url: links.url,
            index_url: links.index_url,
            project_id: primary.container.to_string(),
            file_id: primary.file.to_string(),
            index_file_id: paired.index.as_ref().map(|index| index.file.to_string()),
        })
    }
}
