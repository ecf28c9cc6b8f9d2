//! Local filesystem storage with an HTTP download surface.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use mflow_models::JobId;

use crate::error::{StorageError, StorageResult};
use crate::resolver::LocatorResolver;

const DEFAULT_STORAGE_PATH: &str = "/tmp";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for local storage.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory that holds published artifacts
    pub root: PathBuf,
    /// Base URL under which `/download/{name}` is served
    pub public_base_url: String,
    /// Only directory local-path inputs may be read from; `None` rejects them
    pub local_input_root: Option<PathBuf>,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            root: std::env::var("LOCAL_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH)),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string()),
            local_input_root: std::env::var("LOCAL_INPUT_ROOT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Publishes under one local directory and fetches inputs into per-call directories.
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
    local_input_root: Option<PathBuf>,
    client: reqwest::Client,
    sequence: AtomicU64,
}

impl LocalStorage {
    /// Create storage rooted at `config.root`, creating the directory if needed.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        std::fs::create_dir_all(&config.root)?;
        let local_input_root = match &config.local_input_root {
            Some(dir) => Some(std::fs::canonicalize(dir).map_err(|e| {
                StorageError::config_error(format!("local input root {}: {}", dir.display(), e))
            })?),
            None => None,
        };
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self {
            root: config.root,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            local_input_root,
            client,
            sequence: AtomicU64::new(0),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env())
    }

    /// Public locator for a file name in the storage root.
    pub fn download_url(&self, file_name: &str) -> String {
        format!("{}/download/{}", self.public_base_url, urlencoding::encode(file_name))
    }

    /// Unique local destination for a fetched input.
    fn fetch_destination(&self, dest_dir: &Path, job_id: &JobId, source_name: &str) -> PathBuf {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        dest_dir.join(format!("{}_{}_{}", job_id, seq, sanitize_file_name(source_name)))
    }

    /// Resolve a local-path input, which must sit under the local input root.
    async fn resolve_local(&self, source: &Path) -> StorageResult<PathBuf> {
        let Some(allowed) = &self.local_input_root else {
            return Err(StorageError::UnsupportedLocator(format!(
                "{}: local paths are not accepted",
                source.display()
            )));
        };
        let resolved = tokio::fs::canonicalize(source)
            .await
            .map_err(|_| StorageError::not_found(source.display().to_string()))?;
        if !resolved.starts_with(allowed) {
            warn!("Rejected local input outside {}: {}", allowed.display(), source.display());
            return Err(StorageError::UnsupportedLocator(format!(
                "{}: outside the local input root",
                source.display()
            )));
        }
        Ok(resolved)
    }

    async fn download(&self, url: &Url, dest: &Path) -> StorageResult<()> {
        debug!("Downloading {} to {}", url, dest.display());

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::download_failed(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(dest).await;
                    return Err(e.into());
                }
            };
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        info!("Downloaded {} bytes from {} to {}", written, url, dest.display());
        Ok(())
    }

    async fn copy_local(&self, source: &Path, dest: &Path) -> StorageResult<()> {
        let source = self.resolve_local(source).await?;
        tokio::fs::copy(&source, dest).await?;
        debug!("Copied {} to {}", source.display(), dest.display());
        Ok(())
    }
}

#[async_trait]
impl LocatorResolver for LocalStorage {
    async fn fetch(&self, locator: &str, dest_dir: &Path, job_id: &JobId) -> StorageResult<PathBuf> {
        let locator = locator.trim();
        tokio::fs::create_dir_all(dest_dir).await?;

        if Path::new(locator).is_absolute() {
            let source = PathBuf::from(locator);
            let dest = self.fetch_destination(dest_dir, job_id, &file_name_of(&source));
            self.copy_local(&source, &dest).await?;
            return Ok(dest);
        }

        let url = Url::parse(locator)
            .map_err(|e| StorageError::UnsupportedLocator(format!("{locator}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {
                let name = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .filter(|s| !s.is_empty())
                    .map(|s| urlencoding::decode(s).map(|c| c.into_owned()).unwrap_or_else(|_| s.to_string()))
                    .unwrap_or_else(|| "input".to_string());
                let dest = self.fetch_destination(dest_dir, job_id, &name);
                self.download(&url, &dest).await?;
                Ok(dest)
            }
            "file" => {
                let source = url
                    .to_file_path()
                    .map_err(|_| StorageError::UnsupportedLocator(locator.to_string()))?;
                let dest = self.fetch_destination(dest_dir, job_id, &file_name_of(&source));
                self.copy_local(&source, &dest).await?;
                Ok(dest)
            }
            other => Err(StorageError::UnsupportedLocator(format!(
                "scheme '{other}' is not supported"
            ))),
        }
    }

    async fn publish(&self, path: &Path, file_name: &str) -> StorageResult<String> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(StorageError::not_found(path.display().to_string()));
        }

        let file_name = sanitize_file_name(file_name);
        let dest = self.root.join(&file_name);

        if dest != path {
            if let Err(e) = tokio::fs::rename(path, &dest).await {
                // Cross-device moves fail with rename.
                debug!("Rename failed ({}), copying {} instead", e, path.display());
                tokio::fs::copy(path, &dest)
                    .await
                    .map_err(|e| StorageError::publish_failed(format!("{}: {}", path.display(), e)))?;
                if let Err(e) = tokio::fs::remove_file(path).await {
                    warn!("Failed to remove {} after publish: {}", path.display(), e);
                }
            }
        }

        let url = self.download_url(&file_name);
        info!("Published {} as {}", dest.display(), url);
        Ok(url)
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "input".to_string())
}

/// Keep names flat and shell-safe.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(dir: &TempDir) -> StorageConfig {
        StorageConfig {
            root: dir.path().join("store"),
            public_base_url: "http://media.local:8080/".to_string(),
            local_input_root: None,
        }
    }

    fn storage(dir: &TempDir) -> LocalStorage {
        LocalStorage::new(config(dir)).unwrap()
    }

    fn storage_with_inputs(dir: &TempDir, inputs: &Path) -> LocalStorage {
        LocalStorage::new(StorageConfig {
            local_input_root: Some(inputs.to_path_buf()),
            ..config(dir)
        })
        .unwrap()
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("clip one.mp4"), "clip_one.mp4");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_download_url_is_encoded() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        assert_eq!(
            storage.download_url("a b.mp4"),
            "http://media.local:8080/download/a%20b.mp4"
        );
    }

    #[tokio::test]
    async fn test_fetch_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"video-bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let job_id = JobId::from_string("job1");

        let work = dir.path().join("work");
        let local = storage
            .fetch(&format!("{}/media/clip.mp4", server.uri()), &work, &job_id)
            .await
            .unwrap();

        assert!(local.starts_with(&work));
        assert!(!local.starts_with(storage.root()));
        assert!(local.file_name().unwrap().to_string_lossy().ends_with("clip.mp4"));
        assert_eq!(tokio::fs::read(&local).await.unwrap(), b"video-bytes");
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = storage(&dir)
            .fetch(&format!("{}/missing.mp4", server.uri()), &dir.path().join("work"), &JobId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_local_paths_under_input_root() {
        let dir = TempDir::new().unwrap();
        let inputs = dir.path().join("inputs");
        tokio::fs::create_dir_all(&inputs).await.unwrap();
        let storage = storage_with_inputs(&dir, &inputs);
        let work = dir.path().join("work");
        let source = inputs.join("source.wav");
        tokio::fs::write(&source, b"pcm").await.unwrap();
        let job_id = JobId::new();

        let copied = storage.fetch(source.to_str().unwrap(), &work, &job_id).await.unwrap();
        assert_eq!(tokio::fs::read(&copied).await.unwrap(), b"pcm");
        assert!(copied.starts_with(&work));
        assert!(source.exists());

        let file_url = Url::from_file_path(&source).unwrap().to_string();
        let again = storage.fetch(&file_url, &work, &job_id).await.unwrap();
        assert_ne!(copied, again);
        assert_eq!(tokio::fs::read(&again).await.unwrap(), b"pcm");
    }

    #[tokio::test]
    async fn test_local_paths_rejected_without_input_root() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let work = dir.path().join("work");
        let secret = dir.path().join("secret.txt");
        tokio::fs::write(&secret, b"private").await.unwrap();

        for locator in [
            secret.to_string_lossy().to_string(),
            Url::from_file_path(&secret).unwrap().to_string(),
        ] {
            let err = storage.fetch(&locator, &work, &JobId::new()).await.unwrap_err();
            assert!(matches!(err, StorageError::UnsupportedLocator(_)), "{err}");
        }
        let mut served = std::fs::read_dir(storage.root()).unwrap();
        assert!(served.next().is_none());
    }

    #[tokio::test]
    async fn test_local_paths_confined_to_input_root() {
        let dir = TempDir::new().unwrap();
        let inputs = dir.path().join("inputs");
        tokio::fs::create_dir_all(&inputs).await.unwrap();
        let storage = storage_with_inputs(&dir, &inputs);
        let work = dir.path().join("work");
        let outside = dir.path().join("secret.txt");
        tokio::fs::write(&outside, b"private").await.unwrap();

        let escaping = inputs.join("..").join("secret.txt");
        for locator in [outside.to_string_lossy().to_string(), escaping.to_string_lossy().to_string()] {
            let err = storage.fetch(&locator, &work, &JobId::new()).await.unwrap_err();
            assert!(matches!(err, StorageError::UnsupportedLocator(_)), "{err}");
        }

        let err = storage
            .fetch(inputs.join("missing.mp4").to_str().unwrap(), &work, &JobId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_unknown_locators() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let work = dir.path().join("work");

        assert!(matches!(
            storage.fetch("ftp://host/a.mp4", &work, &JobId::new()).await,
            Err(StorageError::UnsupportedLocator(_))
        ));
        assert!(matches!(
            storage.fetch("relative/a.mp4", &work, &JobId::new()).await,
            Err(StorageError::UnsupportedLocator(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_moves_into_root() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir);
        let work = dir.path().join("work");
        tokio::fs::create_dir_all(&work).await.unwrap();
        let artifact = work.join("job1_output_0.mp4");
        tokio::fs::write(&artifact, b"out").await.unwrap();

        let url = storage.publish(&artifact, "job1_output_0.mp4").await.unwrap();

        assert_eq!(url, "http://media.local:8080/download/job1_output_0.mp4");
        assert!(!artifact.exists());
        assert_eq!(
            tokio::fs::read(storage.root().join("job1_output_0.mp4")).await.unwrap(),
            b"out"
        );
    }

    #[tokio::test]
    async fn test_publish_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = storage(&dir)
            .publish(Path::new("/nope/out.mp4"), "out.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }
}
