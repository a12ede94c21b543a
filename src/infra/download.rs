//! HTTP download functionality
//!
//! Handles downloading archives and indexes with progress reporting,
//! `SHA-256:<hex>` checksum verification, and retry with exponential backoff.

use async_trait::async_trait;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::error::DownloadError;

/// Progress callback type for download progress reporting
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Fetches a resource to a local path
///
/// An empty `checksum` skips verification; otherwise it must use the
/// `SHA-256:<hex>` index format.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        checksum: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf, DownloadError>;
}

/// Download manager for fetching files with retry
#[derive(Debug, Clone)]
pub struct DownloadManager {
    client: reqwest::Client,
    /// Attempts per download, first one included
    max_retries: u32,
    /// First backoff delay; doubles after every failed attempt
    base_delay_ms: u64,
}

/// How a single attempt failed
enum AttemptError {
    /// Worth another attempt: connection problems and server errors
    Transient(DownloadError),
    Fatal(DownloadError),
}

fn build_client(connect_timeout_secs: u64, user_agent: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(300))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .user_agent(user_agent)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

fn io_error(path: &Path, e: &std::io::Error) -> DownloadError {
    DownloadError::IoError {
        path: path.to_path_buf(),
        error: e.to_string(),
    }
}

impl DownloadManager {
    pub fn new() -> Self {
        Self {
            client: build_client(defaults::CONNECT_TIMEOUT_SECS, defaults::USER_AGENT),
            max_retries: defaults::MAX_DOWNLOAD_RETRIES,
            base_delay_ms: 1000,
        }
    }

    /// Custom attempt count and backoff, mostly for tests
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay_ms,
            ..Self::new()
        }
    }

    /// Replace the HTTP client settings
    pub fn with_network(mut self, connect_timeout_secs: u64, user_agent: &str) -> Self {
        self.client = build_client(connect_timeout_secs, user_agent);
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetch `url` into `dest`, checking the bare hex `expected` digest if any
    ///
    /// Data lands in `<dest>.part` and is renamed once complete and verified,
    /// so `dest` only ever holds a whole file. Returns the number of bytes.
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        expected: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64, DownloadError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, &e))?;
        }
        let partial = partial_path(dest);
        let mut delay_ms = self.base_delay_ms;
        let mut attempt = 1;

        let result = loop {
            match self.attempt(url, &partial, expected, progress).await {
                Ok(size) => break Ok(size),
                Err(AttemptError::Fatal(e)) => break Err(e),
                Err(AttemptError::Transient(e)) if attempt >= self.max_retries => {
                    tracing::debug!(url, attempts = attempt, "Giving up");
                    break Err(e);
                }
                Err(AttemptError::Transient(e)) => {
                    tracing::debug!(url, attempt, error = %e, "Download attempt failed, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(30_000);
                    attempt += 1;
                }
            }
        };

        match result {
            Ok(size) => {
                tokio::fs::rename(&partial, dest)
                    .await
                    .map_err(|e| io_error(dest, &e))?;
                Ok(size)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                Err(e)
            }
        }
    }

    /// One request streamed into `partial`, hashed on the way
    async fn attempt(
        &self,
        url: &str,
        partial: &Path,
        expected: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64, AttemptError> {
        let network = |error: String| DownloadError::NetworkError {
            url: url.to_string(),
            error,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AttemptError::Transient(network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let error = network(format!("HTTP {status}"));
            return Err(if status.is_server_error() {
                AttemptError::Transient(error)
            } else {
                AttemptError::Fatal(error)
            });
        }

        let total = response.content_length().unwrap_or(0);
        let mut file = File::create(partial)
            .await
            .map_err(|e| AttemptError::Fatal(io_error(partial, &e)))?;
        let mut hasher = Sha256::new();
        let mut received: u64 = 0;
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| AttemptError::Transient(network(e.to_string())))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| AttemptError::Fatal(io_error(partial, &e)))?;
            hasher.update(&chunk);
            received += chunk.len() as u64;
            if let Some(cb) = progress {
                cb(received, total);
            }
        }
        file.flush()
            .await
            .map_err(|e| AttemptError::Fatal(io_error(partial, &e)))?;

        if let Some(expected) = expected {
            if !hex::encode(hasher.finalize()).eq_ignore_ascii_case(expected) {
                return Err(AttemptError::Fatal(DownloadError::ChecksumFailed {
                    file: partial.display().to_string(),
                }));
            }
        }
        Ok(received)
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Downloader for DownloadManager {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        checksum: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf, DownloadError> {
        let expected = if checksum.is_empty() {
            None
        } else {
            Some(parse_checksum(checksum)?)
        };
        let size = self.fetch(url, dest, expected, progress.as_ref()).await?;
        tracing::info!(url, path = %dest.display(), size, "Downloaded");
        Ok(dest.to_path_buf())
    }
}

/// Extract the hex digest from an index checksum (`SHA-256:<hex>`)
pub fn parse_checksum(checksum: &str) -> Result<&str, DownloadError> {
    match checksum.split_once(':') {
        Some((algorithm, digest)) if algorithm.eq_ignore_ascii_case("SHA-256") => Ok(digest),
        _ => Err(DownloadError::UnsupportedChecksum {
            checksum: checksum.to_string(),
        }),
    }
}

/// Check a file against an index checksum (`SHA-256:<hex>`)
pub async fn verify_checksum(path: &Path, checksum: &str) -> Result<bool, DownloadError> {
    let expected = parse_checksum(checksum)?;
    let content = tokio::fs::read(path)
        .await
        .map_err(|e| io_error(path, &e))?;
    Ok(compute_checksum(&content).eq_ignore_ascii_case(expected))
}

/// Lowercase hex SHA-256 of `data`
pub fn compute_checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HELLO_SHA256: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    // ============================================
    // Unit Tests - Checksum verification
    // ============================================

    #[test]
    fn test_compute_checksum() {
        assert_eq!(compute_checksum(b"hello world"), HELLO_SHA256);
    }

    #[test]
    fn test_parse_checksum() {
        assert_eq!(parse_checksum("SHA-256:abc").unwrap(), "abc");
        assert_eq!(parse_checksum("sha-256:abc").unwrap(), "abc");
        match parse_checksum("MD5:abc").unwrap_err() {
            DownloadError::UnsupportedChecksum { checksum } => assert_eq!(checksum, "MD5:abc"),
            e => panic!("Expected UnsupportedChecksum error, got: {e:?}"),
        }
        assert!(parse_checksum("abc").is_err());
    }

    #[tokio::test]
    async fn test_verify_checksum_valid_and_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        assert!(verify_checksum(&file_path, &format!("SHA-256:{HELLO_SHA256}"))
            .await
            .unwrap());
        assert!(verify_checksum(
            &file_path,
            &format!("SHA-256:{}", HELLO_SHA256.to_uppercase())
        )
        .await
        .unwrap());
    }

    #[tokio::test]
    async fn test_verify_checksum_invalid() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("test.txt");
        std::fs::write(&file_path, b"hello world").unwrap();

        let result = verify_checksum(&file_path, &format!("SHA-256:{}", "0".repeat(64))).await;
        assert!(!result.unwrap());
    }

    #[tokio::test]
    async fn test_verify_checksum_file_not_found() {
        let result = verify_checksum(Path::new("/nonexistent/file.txt"), "SHA-256:00").await;
        assert!(matches!(result, Err(DownloadError::IoError { .. })));
    }

    // ============================================
    // Unit Tests - Download manager creation
    // ============================================

    #[test]
    fn test_download_manager_default() {
        let manager = DownloadManager::new();
        assert_eq!(manager.max_retries(), 3);
    }

    #[test]
    fn test_download_manager_with_config() {
        let manager = DownloadManager::with_config(5, 500).with_network(5, "test-agent");
        assert_eq!(manager.max_retries(), 5);
    }

    // ============================================
    // Async Tests - Download functionality
    // ============================================

    #[tokio::test]
    async fn test_download_success() {
        let mock_server = MockServer::start().await;
        let content = b"test file content";

        Mock::given(method("GET"))
            .and(path("/test.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("staging/test.tar.gz");
        let manager = DownloadManager::new();

        let checksum = format!("SHA-256:{}", compute_checksum(content));
        let result = manager
            .download(
                &format!("{}/test.tar.gz", mock_server.uri()),
                &dest,
                &checksum,
                None,
            )
            .await;

        assert_eq!(result.unwrap(), dest);
        assert_eq!(std::fs::read(&dest).unwrap(), content);
    }

    #[tokio::test]
    async fn test_download_without_checksum() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/package_index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("package_index.json");
        let manager = DownloadManager::new();

        let result = manager
            .download(
                &format!("{}/package_index.json", mock_server.uri()),
                &dest,
                "",
                None,
            )
            .await;

        assert!(result.is_ok());
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_download_with_progress_callback() {
        let mock_server = MockServer::start().await;
        let content = b"test file content for progress";

        Mock::given(method("GET"))
            .and(path("/progress.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("progress.txt");
        let manager = DownloadManager::new();

        let progress_called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let progress_called_clone = progress_called.clone();

        let progress: ProgressCallback = Box::new(move |downloaded, _total| {
            if downloaded > 0 {
                progress_called_clone.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        });

        let result = manager
            .download(
                &format!("{}/progress.txt", mock_server.uri()),
                &dest,
                "",
                Some(progress),
            )
            .await;

        assert!(result.is_ok());
        assert!(progress_called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_download_checksum_mismatch_deletes_file() {
        let mock_server = MockServer::start().await;
        let content = b"content with wrong checksum";

        Mock::given(method("GET"))
            .and(path("/wrong.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("wrong.txt");
        let manager = DownloadManager::new();

        let result = manager
            .download(
                &format!("{}/wrong.txt", mock_server.uri()),
                &dest,
                &format!("SHA-256:{}", "0".repeat(64)),
                None,
            )
            .await;

        match result.unwrap_err() {
            DownloadError::ChecksumFailed { .. } => {}
            e => panic!("Expected ChecksumFailed error, got: {e:?}"),
        }

        assert!(!dest.exists());
        assert!(!temp.path().join("wrong.txt.part").exists());
    }

    #[tokio::test]
    async fn test_download_unsupported_checksum_fetches_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let manager = DownloadManager::new();
        let result = manager
            .download(
                &format!("{}/a.zip", mock_server.uri()),
                &temp.path().join("a.zip"),
                "MD5:d41d8cd98f00b204e9800998ecf8427e",
                None,
            )
            .await;

        assert!(matches!(
            result.unwrap_err(),
            DownloadError::UnsupportedChecksum { .. }
        ));
    }

    #[tokio::test]
    async fn test_download_retry_on_failure() {
        let mock_server = MockServer::start().await;
        let content = b"retry content";

        // First two requests fail, third succeeds
        Mock::given(method("GET"))
            .and(path("/retry.txt"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/retry.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(content.to_vec()))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("retry.txt");
        // Use short delays for testing
        let manager = DownloadManager::with_config(3, 10);

        let result = manager
            .download(
                &format!("{}/retry.txt", mock_server.uri()),
                &dest,
                &format!("SHA-256:{}", compute_checksum(content)),
                None,
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_download_max_retries_exceeded() {
        let mock_server = MockServer::start().await;

        // All requests fail
        Mock::given(method("GET"))
            .and(path("/fail.txt"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("fail.txt");
        // Use short delays for testing
        let manager = DownloadManager::with_config(3, 10);

        let result = manager
            .download(&format!("{}/fail.txt", mock_server.uri()), &dest, "", None)
            .await;

        assert!(matches!(
            result.unwrap_err(),
            DownloadError::NetworkError { .. }
        ));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/missing.tar.gz"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let manager = DownloadManager::with_config(3, 10);

        match manager
            .download(
                &format!("{}/missing.tar.gz", mock_server.uri()),
                &temp.path().join("missing.tar.gz"),
                "",
                None,
            )
            .await
            .unwrap_err()
        {
            DownloadError::NetworkError { error, .. } => assert!(error.contains("404")),
            e => panic!("Expected NetworkError, got: {e:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_download_keeps_previous_file() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/core.tar.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"truncated".to_vec()))
            .mount(&mock_server)
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("core.tar.gz");
        std::fs::write(&dest, b"previous").unwrap();

        let result = DownloadManager::with_config(1, 10)
            .download(
                &format!("{}/core.tar.gz", mock_server.uri()),
                &dest,
                &format!("SHA-256:{HELLO_SHA256}"),
                None,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
    }

    // ============================================
    // Property-Based Tests
    // ============================================

    /// Strategy for generating random byte data
    fn data_strategy() -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), 0..1000)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Checksum is always 64 lowercase hex characters
        #[test]
        fn prop_checksum_format(data in data_strategy()) {
            let checksum = compute_checksum(&data);
            prop_assert_eq!(checksum.len(), 64);
            prop_assert!(checksum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }

        /// Any non SHA-256 algorithm prefix is rejected
        #[test]
        fn prop_other_algorithms_rejected(alg in "[A-Z0-9]{2,8}", digest in "[a-f0-9]{8}") {
            prop_assume!(!alg.eq_ignore_ascii_case("SHA-256"));
            let checksum = format!("{alg}:{digest}");
            prop_assert!(parse_checksum(&checksum).is_err());
        }
    }
}
