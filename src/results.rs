use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub name: String,
    pub sample: Option<String>,
    pub project_name: String,
    pub folder: String,
    pub url: String,
    pub index_url: Option<String>,
    pub project_id: String,
    pub file_id: String,
    pub index_file_id: Option<String>,
}

/// Concatenates per-category results in order and sorts by (name, folder).
///
/// The sort is stable and byte-wise, so equal keys keep their category order
/// and a file matched by two categories is listed twice.
pub fn aggregate(category_results: Vec<Vec<ResultRow>>) -> Vec<ResultRow> {
    let mut rows: Vec<ResultRow> = category_results.into_iter().flatten().collect();
    rows.sort_by(|a, b| (&a.name, &a.folder).cmp(&(&b.name, &b.folder)));
    rows
}
