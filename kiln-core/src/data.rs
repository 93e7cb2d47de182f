//! Page data resolved before rendering starts.
//!
//! A [`DataSource`] produces a [`DataContext`] that is merged into the scope of
//! every template under the input directory. The remote source issues one GET
//! per build with no retry, caching or timeout: any failure aborts the build.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use walkdir::WalkDir;

/// Named values visible to templates.
pub type DataContext = serde_json::Map<String, Value>;

pub const DEFAULT_ENDPOINT: &str = "https://dog.ceo/api/breed/retriever/golden/images/random";
pub const DEFAULT_FIELD: &str = "message";
pub const DEFAULT_KEY: &str = "dogImage";

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response has no `{0}` field")]
    MissingField(String),
    #[error("response field `{0}` is not a string")]
    NotAString(String),
    #[error("invalid data file {}: {source}", .path.display())]
    InvalidDataFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("data file {} redefines `{key}`", .path.display())]
    DuplicateKey { key: String, path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Fetches a JSON document and binds one string field of it to a key.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct RemoteJsonProvider {
    pub endpoint: String,
    /// Field read from the response body
    pub field: String,
    /// Name the value is exposed under
    pub key: String,
}

impl Default for RemoteJsonProvider {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            field: DEFAULT_FIELD.to_string(),
            key: DEFAULT_KEY.to_string(),
        }
    }
}

impl RemoteJsonProvider {
    pub async fn fetch(&self) -> Result<DataContext, DataError> {
        log::debug!("Fetching {}", self.endpoint);

        let response = reqwest::get(&self.endpoint)
            .await
            .map_err(|source| DataError::Request {
                url: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status {
                url: self.endpoint.clone(),
                status,
            });
        }

        let body = response.text().await.map_err(|source| DataError::Request {
            url: self.endpoint.clone(),
            source,
        })?;

        extract_field(&body, &self.field, &self.key)
    }
}

/// Parse `body` as JSON and return `{ key: body[field] }`.
pub fn extract_field(body: &str, field: &str, key: &str) -> Result<DataContext, DataError> {
    let document: Value = serde_json::from_str(body)?;

    let value = match document.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(DataError::NotAString(field.to_string())),
        None => return Err(DataError::MissingField(field.to_string())),
    };

    let mut context = DataContext::new();
    context.insert(key.to_string(), Value::String(value));
    Ok(context)
}

/// A data source a build can draw from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Remote(RemoteJsonProvider),
    /// Fixed values, for offline builds and tests
    Static(DataContext),
}

impl DataSource {
    pub async fn fetch(&self) -> Result<DataContext, DataError> {
        match self {
            DataSource::Remote(provider) => provider.fetch().await,
            DataSource::Static(context) => Ok(context.clone()),
        }
    }
}

/// Await every source in order and merge the results. Later sources win.
pub async fn resolve_all(sources: &[DataSource]) -> Result<DataContext, DataError> {
    let mut merged = DataContext::new();
    for source in sources {
        merged.extend(source.fetch().await?);
    }
    Ok(merged)
}

/// Load every `*.json` file under `dir`, keyed by file stem. Files in
/// subdirectories nest under one key per directory, so `_data/dogs/breeds.json`
/// is `dogs.breeds`.
///
/// A missing directory yields an empty context. Two files claiming the same
/// key is an error.
pub fn load_global_data<P: AsRef<Path>>(dir: P) -> Result<DataContext, DataError> {
    let dir = dir.as_ref();
    let mut context = DataContext::new();
    if !dir.is_dir() {
        return Ok(context);
    }

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !path.extension().is_some_and(|ext| ext == "json") {
            continue;
        }
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let keys: Vec<String> = relative
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        let raw = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw).map_err(|source| DataError::InvalidDataFile {
            path: path.to_path_buf(),
            source,
        })?;
        insert_nested(&mut context, &keys, value, path)?;
    }

    Ok(context)
}

fn insert_nested(
    context: &mut DataContext,
    keys: &[String],
    value: Value,
    path: &Path,
) -> Result<(), DataError> {
    let duplicate = |key: &str| DataError::DuplicateKey {
        key: key.to_string(),
        path: path.to_path_buf(),
    };

    let Some((last, parents)) = keys.split_last() else {
        return Ok(());
    };
    let mut scope = context;
    for key in parents {
        let slot = scope
            .entry(key.clone())
            .or_insert_with(|| Value::Object(DataContext::new()));
        scope = match slot {
            Value::Object(map) => map,
            _ => return Err(duplicate(key)),
        };
    }
    if scope.contains_key(last) {
        return Err(duplicate(last));
    }
    scope.insert(last.clone(), value);
    Ok(())
}
