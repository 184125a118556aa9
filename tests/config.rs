use std::time::Duration;

use assert_matches::assert_matches;

use dnanexus_links::config::{ConfigLoader, DEFAULT_TOKEN_ENV};
use dnanexus_links::domain::NameMode;
use dnanexus_links::error::LinksError;

#[test]
fn parse_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dx-links.json");
    std::fs::write(
        &path,
        r#"{
            "api_url": "https://api.example.org/",
            "ttl_seconds": 82800,
            "report": { "label": "Haem onc links" },
            "categories": [
                "bam",
                {
                    "label": "cnv",
                    "pattern": "^.*_cnv\\.vcf\\.gz$",
                    "mode": "regex",
                    "index_suffix": ".tbi",
                    "index_pattern": "^.*_cnv\\.vcf\\.gz\\.tbi$",
                    "sample_pattern": "(Pan\\d+)"
                },
                { "label": "coverage", "pattern": "*.exon_level.txt" }
            ]
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.api_url, "https://api.example.org");
    assert_eq!(resolved.token_env, DEFAULT_TOKEN_ENV);
    assert_eq!(resolved.ttl, Duration::from_secs(82_800));
    assert_eq!(resolved.report.label, "Haem onc links");
    assert!(!resolved.report.description.is_empty());

    let labels: Vec<_> = resolved
        .categories
        .iter()
        .map(|c| c.label.as_str())
        .collect();
    assert_eq!(labels, vec!["bam", "cnv", "coverage"]);

    let cnv = &resolved.categories[1];
    assert_eq!(cnv.pattern.mode(), NameMode::Regex);
    assert_eq!(cnv.index_suffix(), Some(".tbi"));
    assert!(cnv.sample_pattern.is_some());

    let coverage = &resolved.categories[2];
    assert_eq!(coverage.pattern.mode(), NameMode::Glob);
    assert!(coverage.index.is_none());
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, LinksError::ConfigRead(_));
}

#[test]
fn unknown_shorthand_category_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dx-links.json");
    std::fs::write(&path, r#"{ "categories": ["fastq"] }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, LinksError::ConfigParse(_));
}

#[test]
fn invalid_regex_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dx-links.json");
    std::fs::write(
        &path,
        r#"{ "categories": [{ "label": "x", "pattern": "(bam", "mode": "regex" }] }"#,
    )
    .unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, LinksError::InvalidPattern { .. });
}

#[test]
fn zero_ttl_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dx-links.json");
    std::fs::write(&path, r#"{ "ttl_seconds": 0 }"#).unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, LinksError::ConfigParse(_));
}
