// src/digest.rs
//! Category payloads and the home digest snapshot (`{generatedAt, categories}`).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::CategoryConfig;
use crate::error::PublishError;
use crate::feed::FeedItem;

/// One category's ranked items plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub zh_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub zh_description: String,
    /// Unix milliseconds.
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub items: Vec<FeedItem>,
}

impl CategoryPayload {
    pub fn new(cat: &CategoryConfig, items: Vec<FeedItem>) -> Self {
        Self {
            id: cat.id.clone(),
            name: cat.name.clone(),
            zh_name: cat.zh_name.clone(),
            description: cat.description.clone(),
            zh_description: cat.zh_description.clone(),
            updated_at: Utc::now().timestamp_millis(),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub generated_at: String,
    pub categories: Vec<CategoryPayload>,
}

impl Digest {
    pub fn new(categories: Vec<CategoryPayload>) -> Self {
        Self {
            generated_at: now_rfc3339(),
            categories,
        }
    }
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Check a publish body: a JSON object with a non-empty `categories` array whose entries
/// are category payloads. A missing `generatedAt` is filled in.
pub fn validate_publish_payload(body: &Value) -> Result<Digest, PublishError> {
    let obj = body
        .as_object()
        .ok_or_else(|| PublishError::InvalidPayload("body must be a JSON object".into()))?;
    let cats = obj
        .get("categories")
        .ok_or_else(|| PublishError::InvalidPayload("missing `categories`".into()))?
        .as_array()
        .ok_or_else(|| PublishError::InvalidPayload("`categories` must be an array".into()))?;
    if cats.is_empty() {
        return Err(PublishError::InvalidPayload("`categories` is empty".into()));
    }

    let categories = cats
        .iter()
        .enumerate()
        .map(|(i, c)| {
            serde_json::from_value::<CategoryPayload>(c.clone())
                .map_err(|e| PublishError::InvalidPayload(format!("categories[{i}]: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let generated_at = obj
        .get("generatedAt")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(now_rfc3339);

    Ok(Digest {
        generated_at,
        categories,
    })
}

/// Pretty JSON written to a temp file next to `path`, then renamed into place.
pub fn write_snapshot(path: &Path, digest: &Digest) -> Result<(), PublishError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(digest)?;
    let tmp = path.with_extension("json.tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    info!(
        target: "digest",
        path = %path.display(),
        categories = digest.categories.len(),
        "snapshot written"
    );
    Ok(())
}

/// `Ok(None)` when no snapshot exists yet.
pub fn read_snapshot(path: &Path) -> Result<Option<Digest>, PublishError> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// [`read_snapshot`] on the blocking pool, for async handlers.
pub async fn load_snapshot(path: PathBuf) -> Result<Option<Digest>, PublishError> {
    tokio::task::spawn_blocking(move || read_snapshot(&path))
        .await
        .map_err(|e| PublishError::Io(std::io::Error::other(e)))?
}

/// [`write_snapshot`] on the blocking pool; hands the digest back once it is durable.
pub async fn store_snapshot(path: PathBuf, digest: Digest) -> Result<Digest, PublishError> {
    tokio::task::spawn_blocking(move || write_snapshot(&path, &digest).map(|()| digest))
        .await
        .map_err(|e| PublishError::Io(std::io::Error::other(e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "generatedAt": "2025-06-10T08:00:00.000Z",
            "categories": [{
                "id": "media",
                "name": "Media Headlines",
                "zhName": "媒体头条",
                "updatedAt": 1,
                "items": [{
                    "title": "t",
                    "titleZh": "标题",
                    "source": "s",
                    "link": "https://x.example/1",
                    "summary": "摘要",
                    "publishedAt": "",
                    "ts": 0,
                    "score": 1.5,
                    "topic": "ai",
                    "tags": []
                }]
            }]
        })
    }

    #[test]
    fn accepts_valid_payload() {
        let d = validate_publish_payload(&payload()).unwrap();
        assert_eq!(d.generated_at, "2025-06-10T08:00:00.000Z");
        assert_eq!(d.categories[0].items[0].title_zh, "标题");
    }

    #[test]
    fn rejects_bad_shapes() {
        for bad in [
            json!([]),
            json!({}),
            json!({"categories": {}}),
            json!({"categories": []}),
            json!({"categories": [{"name": "no id"}]}),
        ] {
            let err = validate_publish_payload(&bad).unwrap_err();
            assert!(matches!(err, PublishError::InvalidPayload(_)), "{bad}");
        }
    }

    #[test]
    fn missing_generated_at_is_filled() {
        let mut p = payload();
        p.as_object_mut().unwrap().remove("generatedAt");
        let d = validate_publish_payload(&p).unwrap();
        assert!(!d.generated_at.is_empty());
    }

    #[test]
    fn snapshot_round_trip_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/home-latest.json");
        assert!(read_snapshot(&path).unwrap().is_none());

        let d = validate_publish_payload(&payload()).unwrap();
        write_snapshot(&path, &d).unwrap();
        assert!(!path.with_extension("json.tmp").exists());
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"generatedAt\""), "pretty printed");
        assert_eq!(read_snapshot(&path).unwrap(), Some(d));
    }

    #[tokio::test]
    async fn async_snapshot_helpers_use_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("home-latest.json");
        assert!(load_snapshot(path.clone()).await.unwrap().is_none());

        let d = validate_publish_payload(&payload()).unwrap();
        let stored = store_snapshot(path.clone(), d.clone()).await.unwrap();
        assert_eq!(stored, d);
        assert_eq!(read_snapshot(&path).unwrap(), Some(d));
        assert_eq!(load_snapshot(path).await.unwrap(), Some(stored));
    }
}
