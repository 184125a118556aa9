use std::collections::HashMap;

use crate::domain::ContainerId;
use crate::rows::NormalizedRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedRow {
    pub primary: NormalizedRow,
    pub index: Option<NormalizedRow>,
}

#[derive(Debug, Clone, Default)]
pub struct Pairing {
    pub paired: Vec<PairedRow>,
    /// Primary rows whose companion index was not found.
    pub dropped: Vec<NormalizedRow>,
}

/// Inner join of `primary` against `index` on (index name, folder, project).
///
/// When several index rows share a key the first one in input order wins.
/// Primary rows without a derived index name pass through unpaired.
pub fn pair(primary: Vec<NormalizedRow>, index: &[NormalizedRow]) -> Pairing {
    let mut lookup: HashMap<(&str, &str, &ContainerId), &NormalizedRow> = HashMap::new();
    for row in index {
        lookup.entry(row.own_key()).or_insert(row);
    }

    let mut pairing = Pairing::default();
    for row in primary {
        if row.index_name.is_none() {
            pairing.paired.push(PairedRow {
                primary: row,
                index: None,
            });
            continue;
        }
        let matched = row
            .join_key()
            .and_then(|key| lookup.get(&key).map(|found| (*found).clone()));
        match matched {
            Some(found) => pairing.paired.push(PairedRow {
                primary: row,
                index: Some(found),
            }),
            None => pairing.dropped.push(row),
        }
    }
    pairing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileRecord;
    use crate::rows::normalize;

    fn rows(records: &[(&str, &str, &str, &str)], suffix: Option<&str>) -> Vec<NormalizedRow> {
        let records: Vec<FileRecord> = records
            .iter()
            .map(|(name, folder, id, project)| FileRecord::new(name, folder, id, project))
            .collect();
        normalize(&records, suffix).unwrap()
    }

    #[test]
    fn pairs_on_name_folder_and_project() {
        let primary = rows(&[("sample1.bam", "/run1", "file-1", "proj-A")], Some(".bai"));
        let index = rows(&[("sample1.bam.bai", "/run1", "file-2", "proj-A")], None);
        let pairing = pair(primary, &index);
        assert_eq!(pairing.paired.len(), 1);
        assert!(pairing.dropped.is_empty());
        let paired = &pairing.paired[0];
        assert_eq!(paired.primary.file.as_str(), "file-1");
        assert_eq!(paired.index.as_ref().unwrap().file.as_str(), "file-2");
        assert_eq!(
            paired.primary.index_name.as_deref(),
            Some(paired.index.as_ref().unwrap().name.as_str())
        );
    }

    #[test]
    fn different_folder_is_dropped() {
        let primary = rows(&[("sample1.bam", "/run1", "file-1", "proj-A")], Some(".bai"));
        let index = rows(&[("sample1.bam.bai", "/run2", "file-2", "proj-A")], None);
        let pairing = pair(primary, &index);
        assert!(pairing.paired.is_empty());
        assert_eq!(pairing.dropped.len(), 1);
        assert_eq!(pairing.dropped[0].name, "sample1.bam");
    }

    #[test]
    fn different_project_is_dropped() {
        let primary = rows(&[("sample1.bam", "/run1", "file-1", "proj-A")], Some(".bai"));
        let index = rows(&[("sample1.bam.bai", "/run1", "file-2", "proj-B")], None);
        assert!(pair(primary, &index).paired.is_empty());
    }

    #[test]
    fn first_duplicate_index_wins() {
        let primary = rows(&[("s.bam", "/r", "file-1", "proj-A")], Some(".bai"));
        let index = rows(
            &[
                ("s.bam.bai", "/r", "file-first", "proj-A"),
                ("s.bam.bai", "/r", "file-second", "proj-A"),
            ],
            None,
        );
        let pairing = pair(primary, &index);
        assert_eq!(pairing.paired.len(), 1);
        assert_eq!(
            pairing.paired[0].index.as_ref().unwrap().file.as_str(),
            "file-first"
        );
    }

    #[test]
    fn index_less_rows_pass_through_in_order() {
        let primary = rows(
            &[
                ("b.xlsx", "/r", "file-2", "proj-A"),
                ("a.xlsx", "/r", "file-1", "proj-A"),
            ],
            None,
        );
        let pairing = pair(primary, &[]);
        let names: Vec<_> = pairing.paired.iter().map(|p| p.primary.name.as_str()).collect();
        assert_eq!(names, vec!["b.xlsx", "a.xlsx"]);
        assert!(pairing.paired.iter().all(|p| p.index.is_none()));
    }

    #[test]
    fn mixed_matches_keep_primary_order() {
        let primary = rows(
            &[
                ("c.bam", "/r", "file-c", "proj-A"),
                ("a.bam", "/r", "file-a", "proj-A"),
                ("b.bam", "/r", "file-b", "proj-A"),
            ],
            Some(".bai"),
        );
        let index = rows(
            &[
                ("b.bam.bai", "/r", "file-bi", "proj-A"),
                ("c.bam.bai", "/r", "file-ci", "proj-A"),
            ],
            None,
        );
        let pairing = pair(primary, &index);
        let names: Vec<_> = pairing.paired.iter().map(|p| p.primary.name.as_str()).collect();
        assert_eq!(names, vec!["c.bam", "b.bam"]);
        assert_eq!(pairing.dropped[0].name, "a.bam");
    }
}
