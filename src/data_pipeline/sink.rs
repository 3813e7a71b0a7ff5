// src/data_pipeline/sink.rs

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Stockage objet en aval. Le pipeline dépose et oublie : pas de ré-essai ici,
/// c'est au client du stockage de s'en charger s'il le souhaite.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Écrit `{root}/{bucket}/{key}` sur le disque local.
#[derive(Debug, Clone)]
pub struct LocalDirSink {
    root: PathBuf,
}

impl LocalDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl OutputSink for LocalDirSink {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.root.join(bucket).join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Création de {} impossible", parent.display()))?;
        }
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("Écriture de {} impossible", path.display()))?;
        debug!(path = %path.display(), bytes = body.len(), "Objet écrit");
        Ok(())
    }
}

/// `PUT {endpoint}/{bucket}/{key}` vers un stockage compatible HTTP.
#[derive(Debug, Clone)]
pub struct HttpObjectSink {
    client: reqwest::Client,
    endpoint: String,
    access_key: Option<String>,
}

impl HttpObjectSink {
    pub fn new(endpoint: impl Into<String>, access_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_key,
        }
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, bucket, key.trim_start_matches('/'))
    }
}

#[async_trait]
impl OutputSink for HttpObjectSink {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let url = self.url(bucket, key);
        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        if let Some(token) = &self.access_key {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.with_context(|| format!("PUT {url} a échoué"))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("PUT {} refusé ({}): {}", url, status, detail);
        }
        Ok(())
    }
}
