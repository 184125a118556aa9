use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{NameMode, NamePattern};
use crate::error::LinksError;

pub const DEFAULT_API_URL: &str = "https://api.dnanexus.com";
pub const DEFAULT_TOKEN_ENV: &str = "DX_API_TOKEN";
pub const DEFAULT_TTL_SECONDS: u64 = 86_400;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const CONFIG_FILE_NAME: &str = "dx-links.json";
pub const SCHEMA_VERSION: u32 = 1;

const PAN_NUMBER_PATTERN: &str = r"(Pan\d+)";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub report: Option<ReportEntry>,
    #[serde(default)]
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ReportEntry {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CategoryEntry {
    Shorthand(String),
    Detailed(CategoryEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CategoryEntryObject {
    pub label: String,
    pub pattern: String,
    #[serde(default)]
    pub mode: Option<NameMode>,
    #[serde(default)]
    pub index_suffix: Option<String>,
    #[serde(default)]
    pub index_pattern: Option<String>,
    #[serde(default)]
    pub sample_pattern: Option<String>,
}

/// Companion index convention of a category, e.g. `.bai` found via `*.bam.bai`.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub suffix: String,
    pub pattern: NamePattern,
}

#[derive(Debug, Clone)]
pub struct FileCategory {
    pub label: String,
    pub pattern: NamePattern,
    pub index: Option<IndexSpec>,
    pub sample_pattern: Option<Regex>,
}

impl FileCategory {
    pub fn index_suffix(&self) -> Option<&str> {
        self.index.as_ref().map(|index| index.suffix.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub label: String,
    pub description: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            label: "Sequencing file links".to_string(),
            description: "Pre-authenticated DNAnexus download links for sequencing files"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api_url: String,
    pub token_env: String,
    pub ttl: Duration,
    pub timeout: Duration,
    pub report: ReportSettings,
    pub categories: Vec<FileCategory>,
}

impl ResolvedConfig {
    /// Keeps only the categories whose label is listed; an empty list keeps all.
    pub fn select_categories(&mut self, labels: &[String]) -> Result<(), LinksError> {
        if labels.is_empty() {
            return Ok(());
        }
        for label in labels {
            if !self.categories.iter().any(|category| &category.label == label) {
                return Err(LinksError::Usage(format!("unknown category: {label}")));
            }
        }
        self.categories
            .retain(|category| labels.iter().any(|label| label == &category.label));
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LinksError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LinksError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LinksError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("dx-links").join("config.json"))
            .filter(|path| path.exists())
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LinksError> {
        let schema_version = config.schema_version.unwrap_or(SCHEMA_VERSION);
        if schema_version != SCHEMA_VERSION {
            return Err(LinksError::ConfigParse(format!(
                "unsupported schema_version {schema_version}, expected {SCHEMA_VERSION}"
            )));
        }

        let ttl_seconds = config.ttl_seconds.unwrap_or(DEFAULT_TTL_SECONDS);
        if ttl_seconds == 0 {
            return Err(LinksError::ConfigParse(
                "ttl_seconds must be greater than zero".to_string(),
            ));
        }

        let defaults = ReportSettings::default();
        let report = match config.report {
            Some(entry) => ReportSettings {
                label: entry.label.unwrap_or(defaults.label),
                description: entry.description.unwrap_or(defaults.description),
            },
            None => defaults,
        };

        let categories = if config.categories.is_empty() {
            default_categories()
        } else {
            config
                .categories
                .into_iter()
                .map(|entry| match entry {
                    CategoryEntry::Shorthand(name) => builtin_category(&name)
                        .ok_or_else(|| LinksError::ConfigParse(format!("unknown category: {name}"))),
                    CategoryEntry::Detailed(obj) => detailed_category(obj),
                })
                .collect::<Result<Vec<_>, LinksError>>()?
        };

        Ok(ResolvedConfig {
            schema_version,
            api_url: config
                .api_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            token_env: config
                .token_env
                .unwrap_or_else(|| DEFAULT_TOKEN_ENV.to_string()),
            ttl: Duration::from_secs(ttl_seconds),
            timeout: Duration::from_secs(config.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)),
            report,
            categories,
        })
    }
}

fn detailed_category(obj: CategoryEntryObject) -> Result<FileCategory, LinksError> {
    let mode = obj.mode.unwrap_or_default();
    let pattern = NamePattern::new(&obj.pattern, mode)?;
    let index = match (obj.index_suffix, obj.index_pattern) {
        (Some(suffix), Some(index_pattern)) => Some(IndexSpec {
            suffix,
            pattern: NamePattern::new(&index_pattern, mode)?,
        }),
        (None, None) => None,
        _ => {
            return Err(LinksError::ConfigParse(format!(
                "category {}: index_suffix and index_pattern must be set together",
                obj.label
            )));
        }
    };
    let sample_pattern = obj
        .sample_pattern
        .map(|value| {
            Regex::new(&value).map_err(|err| LinksError::InvalidPattern {
                pattern: value.clone(),
                message: err.to_string(),
            })
        })
        .transpose()?;

    Ok(FileCategory {
        label: obj.label,
        pattern,
        index,
        sample_pattern,
    })
}

pub fn builtin_category(name: &str) -> Option<FileCategory> {
    let (pattern, suffix, index_pattern) = match name {
        "bam" => ("*.bam", ".bai", "*.bam.bai"),
        "vcf" => ("*.vcf.gz", ".tbi", "*.vcf.gz.tbi"),
        _ => return None,
    };
    Some(FileCategory {
        label: name.to_string(),
        pattern: NamePattern::glob(pattern).ok()?,
        index: Some(IndexSpec {
            suffix: suffix.to_string(),
            pattern: NamePattern::glob(index_pattern).ok()?,
        }),
        sample_pattern: Regex::new(PAN_NUMBER_PATTERN).ok(),
    })
}

pub fn default_categories() -> Vec<FileCategory> {
    ["bam", "vcf"]
        .into_iter()
        .filter_map(builtin_category)
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_without_config() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.api_url, DEFAULT_API_URL);
        assert_eq!(resolved.ttl, Duration::from_secs(86_400));
        let labels: Vec<_> = resolved.categories.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["bam", "vcf"]);
        assert_eq!(resolved.categories[0].index_suffix(), Some(".bai"));
        assert_eq!(resolved.categories[1].index_suffix(), Some(".tbi"));
    }

    #[test]
    fn newer_schema_version_is_rejected() {
        let config = Config {
            schema_version: Some(2),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, LinksError::ConfigParse(message) if message.contains("schema_version 2"));
    }

    #[test]
    fn index_fields_must_pair() {
        let config = Config {
            categories: vec![CategoryEntry::Detailed(CategoryEntryObject {
                label: "cram".to_string(),
                pattern: "*.cram".to_string(),
                mode: None,
                index_suffix: Some(".crai".to_string()),
                index_pattern: None,
                sample_pattern: None,
            })],
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, LinksError::ConfigParse(_));
    }

    #[test]
    fn select_unknown_category_is_usage_error() {
        let mut resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        let err = resolved
            .select_categories(&["fastq".to_string()])
            .unwrap_err();
        assert_matches!(err, LinksError::Usage(_));

        resolved.select_categories(&["vcf".to_string()]).unwrap();
        assert_eq!(resolved.categories.len(), 1);
        assert_eq!(resolved.categories[0].label, "vcf");
    }
}
