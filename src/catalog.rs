use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::ResolvedConfig;
use crate::domain::{ContainerId, FileId, NameMode, NamePattern};
use crate::error::LinksError;

const PAGE_LIMIT: u32 = 1000;

/// A file as described by the catalog. Every field may be missing on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

impl FileRecord {
    pub fn new(name: &str, folder: &str, id: &str, project: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            folder: Some(folder.to_string()),
            id: Some(id.to_string()),
            project: Some(project.to_string()),
        }
    }
}

pub trait CatalogClient: Send + Sync {
    fn search(
        &self,
        pattern: &NamePattern,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>, LinksError>;
    fn resolve_container_name(&self, container: &ContainerId) -> Result<String, LinksError>;
    fn mint_download_url(
        &self,
        file: &FileId,
        container: &ContainerId,
        ttl: Duration,
    ) -> Result<String, LinksError>;
}

#[derive(Clone)]
pub struct DnanexusHttpClient {
    client: Client,
    base_url: String,
}

impl DnanexusHttpClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, LinksError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("dx-links/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LinksError::CatalogHttp(err.to_string()))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(|err| LinksError::CatalogHttp(err.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| LinksError::CatalogHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Builds a client from the resolved config, reading the token from its environment variable.
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, LinksError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| LinksError::MissingToken(config.token_env.clone()))?;
        Self::new(&config.api_url, &token, config.timeout)
    }

    fn post(&self, route: &str, body: &Value, subject: &str) -> Result<Value, LinksError> {
        let url = format!("{}/{}", self.base_url, route);
        tracing::debug!(%url, "catalog request");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|err| LinksError::CatalogHttp(err.to_string()))?;
        let response = Self::handle_status(response, subject)?;
        response
            .json()
            .map_err(|err| LinksError::CatalogHttp(err.to_string()))
    }

    fn handle_status(response: Response, subject: &str) -> Result<Response, LinksError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        let (kind, message) = parse_api_error(&body);
        if status == 404 || kind.as_deref() == Some("ResourceNotFound") {
            return Err(LinksError::Lookup {
                id: subject.to_string(),
                message,
            });
        }
        Err(LinksError::CatalogStatus { status, message })
    }
}

impl CatalogClient for DnanexusHttpClient {
    fn search(
        &self,
        pattern: &NamePattern,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>, LinksError> {
        let mut records = Vec::new();
        let mut starting: Option<Value> = None;
        loop {
            let body = find_request(pattern, created_after, starting.take());
            let page = self.post("system/findDataObjects", &body, pattern.as_str())?;
            let (mut batch, next) = parse_find_page(page)?;
            records.append(&mut batch);
            match next {
                Some(next) => starting = Some(next),
                None => break,
            }
        }
        Ok(records)
    }

    fn resolve_container_name(&self, container: &ContainerId) -> Result<String, LinksError> {
        let route = format!("{}/describe", container.as_str());
        let value = self.post(&route, &json!({}), container.as_str())?;
        value
            .get("name")
            .and_then(|v| v.as_str())
            .map(|name| name.to_string())
            .ok_or_else(|| LinksError::Lookup {
                id: container.to_string(),
                message: "describe response has no name".to_string(),
            })
    }

    fn mint_download_url(
        &self,
        file: &FileId,
        container: &ContainerId,
        ttl: Duration,
    ) -> Result<String, LinksError> {
        let route = format!("{}/download", file.as_str());
        let body = json!({
            "duration": ttl.as_secs(),
            "preauthenticated": true,
            "project": container.as_str(),
        });
        let value = self.post(&route, &body, file.as_str())?;
        value
            .get("url")
            .and_then(|v| v.as_str())
            .map(|url| url.to_string())
            .ok_or_else(|| LinksError::Lookup {
                id: file.to_string(),
                message: "download response has no url".to_string(),
            })
    }
}

fn find_request(
    pattern: &NamePattern,
    created_after: DateTime<Utc>,
    starting: Option<Value>,
) -> Value {
    let name = match pattern.mode() {
        NameMode::Glob => json!({ "glob": pattern.as_str() }),
        NameMode::Regex => json!({ "regexp": pattern.as_str() }),
    };
    let mut body = json!({
        "class": "file",
        "name": name,
        "created": { "after": created_after.timestamp_millis() },
        "describe": {
            "fields": { "id": true, "name": true, "folder": true, "project": true }
        },
        "limit": PAGE_LIMIT,
    });
    if let (Some(starting), Some(map)) = (starting, body.as_object_mut()) {
        map.insert("starting".to_string(), starting);
    }
    body
}

#[derive(Debug, Deserialize)]
struct FindPage {
    #[serde(default)]
    results: Vec<FindResult>,
    #[serde(default)]
    next: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FindResult {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    describe: Option<FileRecord>,
}

/// Splits one `findDataObjects` page into records and the cursor for the next page.
pub fn parse_find_page(page: Value) -> Result<(Vec<FileRecord>, Option<Value>), LinksError> {
    let page: FindPage = serde_json::from_value(page)
        .map_err(|err| LinksError::CatalogHttp(format!("unexpected search response: {err}")))?;
    let records = page
        .results
        .into_iter()
        .map(|result| {
            let mut record = result.describe.unwrap_or_default();
            if record.id.is_none() {
                record.id = result.id;
            }
            if record.project.is_none() {
                record.project = result.project;
            }
            record
        })
        .collect();
    let next = page.next.filter(|next| !next.is_null());
    Ok((records, next))
}

fn parse_api_error(body: &str) -> (Option<String>, String) {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));
    let kind = error
        .and_then(|e| e.get("type"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string());
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .unwrap_or_else(|| body.trim().to_string());
    (kind, message)
}
