use dnanexus_links::catalog::FileRecord;
use dnanexus_links::pairing::pair;
use dnanexus_links::rows::normalize;

#[test]
fn sample_with_index_in_same_folder_pairs() {
    let primary = normalize(
        &[FileRecord::new("sample1.bam", "/run1", "file-1", "proj-A")],
        Some(".bai"),
    )
    .unwrap();
    let index = normalize(
        &[FileRecord::new("sample1.bam.bai", "/run1", "file-2", "proj-A")],
        None,
    )
    .unwrap();

    assert_eq!(primary[0].index_name.as_deref(), Some("sample1.bam.bai"));
    let pairing = pair(primary, &index);
    assert_eq!(pairing.paired.len(), 1);
    let paired = &pairing.paired[0];
    assert_eq!(paired.primary.file.as_str(), "file-1");
    assert_eq!(paired.index.as_ref().unwrap().file.as_str(), "file-2");
}

#[test]
fn index_in_another_folder_does_not_pair() {
    let primary = normalize(
        &[FileRecord::new("sample1.bam", "/run1", "file-1", "proj-A")],
        Some(".bai"),
    )
    .unwrap();
    let index = normalize(
        &[FileRecord::new("sample1.bam.bai", "/run2", "file-2", "proj-A")],
        None,
    )
    .unwrap();

    let pairing = pair(primary, &index);
    assert!(pairing.paired.is_empty());
    assert_eq!(pairing.dropped.len(), 1);
}

#[test]
fn vcf_index_convention() {
    let primary = normalize(
        &[FileRecord::new("Pan4000.vcf.gz", "/vcfs", "file-1", "proj-A")],
        Some(".tbi"),
    )
    .unwrap();
    let index = normalize(
        &[
            FileRecord::new("Pan4000.vcf.gz.bai", "/vcfs", "file-x", "proj-A"),
            FileRecord::new("Pan4000.vcf.gz.tbi", "/vcfs", "file-2", "proj-A"),
        ],
        None,
    )
    .unwrap();

    let pairing = pair(primary, &index);
    assert_eq!(pairing.paired.len(), 1);
    assert_eq!(
        pairing.paired[0].index.as_ref().unwrap().name,
        "Pan4000.vcf.gz.tbi"
    );
}
