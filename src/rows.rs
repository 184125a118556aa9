use regex::Regex;

use crate::catalog::FileRecord;
use crate::domain::{ContainerId, FileId};
use crate::error::LinksError;

const ROOT_FOLDER: &str = "/";

/// A catalog record with its identity fields checked and its index name derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub name: String,
    pub index_name: Option<String>,
    pub folder: String,
    pub container: ContainerId,
    pub file: FileId,
}

impl NormalizedRow {
    pub fn join_key(&self) -> Option<(&str, &str, &ContainerId)> {
        self.index_name
            .as_deref()
            .map(|index| (index, self.folder.as_str(), &self.container))
    }

    pub fn own_key(&self) -> (&str, &str, &ContainerId) {
        (self.name.as_str(), self.folder.as_str(), &self.container)
    }
}

/// Maps records 1:1 into rows. The first record lacking a name, file id or
/// project aborts the whole batch.
pub fn normalize(
    records: &[FileRecord],
    suffix: Option<&str>,
) -> Result<Vec<NormalizedRow>, LinksError> {
    records
        .iter()
        .map(|record| normalize_record(record, suffix))
        .collect()
}

fn normalize_record(record: &FileRecord, suffix: Option<&str>) -> Result<NormalizedRow, LinksError> {
    let context = describe_record(record);
    let name = record
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| LinksError::MalformedRecord {
            field: "name",
            context: context.clone(),
        })?;
    let container: ContainerId = record
        .project
        .as_deref()
        .ok_or_else(|| LinksError::MalformedRecord {
            field: "project",
            context: context.clone(),
        })?
        .parse()
        .map_err(|_| LinksError::MalformedRecord {
            field: "project",
            context: context.clone(),
        })?;
    let file: FileId = record
        .id
        .as_deref()
        .ok_or_else(|| LinksError::MalformedRecord {
            field: "id",
            context: context.clone(),
        })?
        .parse()
        .map_err(|_| LinksError::MalformedRecord {
            field: "id",
            context: context.clone(),
        })?;

    Ok(NormalizedRow {
        name: name.to_string(),
        index_name: suffix.map(|suffix| format!("{name}{suffix}")),
        folder: record
            .folder
            .clone()
            .unwrap_or_else(|| ROOT_FOLDER.to_string()),
        container,
        file,
    })
}

fn describe_record(record: &FileRecord) -> String {
    format!(
        "name={} id={} project={}",
        record.name.as_deref().unwrap_or("-"),
        record.id.as_deref().unwrap_or("-"),
        record.project.as_deref().unwrap_or("-"),
    )
}

/// Sample identifier from a file name: first capture group, else the whole match.
pub fn extract_sample(name: &str, pattern: &Regex) -> Option<String> {
    let captures = pattern.captures(name)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn derives_index_name_verbatim() {
        let records = vec![
            FileRecord::new("sample1.bam", "/run1", "file-1", "proj-A"),
            FileRecord::new("Sample 2.BAM", "/run1", "file-2", "proj-A"),
        ];
        let rows = normalize(&records, Some(".bai")).unwrap();
        assert_eq!(rows[0].index_name.as_deref(), Some("sample1.bam.bai"));
        assert_eq!(rows[1].index_name.as_deref(), Some("Sample 2.BAM.bai"));
    }

    #[test]
    fn no_suffix_means_no_index_name() {
        let records = vec![FileRecord::new("report.xlsx", "/run1", "file-1", "proj-A")];
        let rows = normalize(&records, None).unwrap();
        assert!(rows[0].index_name.is_none());
        assert!(rows[0].join_key().is_none());
    }

    #[test]
    fn missing_identity_fields_abort() {
        let mut record = FileRecord::new("a.bam", "/", "file-1", "proj-A");
        record.project = None;
        let err = normalize(&[record], Some(".bai")).unwrap_err();
        assert_matches!(err, LinksError::MalformedRecord { field: "project", .. });

        let mut record = FileRecord::new("a.bam", "/", "file-1", "proj-A");
        record.name = None;
        let err = normalize(&[record], Some(".bai")).unwrap_err();
        assert_matches!(err, LinksError::MalformedRecord { field: "name", .. });
    }

    #[test]
    fn missing_folder_is_root() {
        let mut record = FileRecord::new("a.bam", "/", "file-1", "proj-A");
        record.folder = None;
        let rows = normalize(&[record], None).unwrap();
        assert_eq!(rows[0].folder, "/");
    }

    #[test]
    fn sample_from_capture_group() {
        let pattern = Regex::new(r"(Pan\d+)").unwrap();
        assert_eq!(
            extract_sample("NGS512_07_Pan4081_S7.bam", &pattern).as_deref(),
            Some("Pan4081")
        );
        assert!(extract_sample("undetermined.bam", &pattern).is_none());

        let whole = Regex::new(r"S\d+").unwrap();
        assert_eq!(extract_sample("x_S12.bam", &whole).as_deref(), Some("S12"));
    }
}
