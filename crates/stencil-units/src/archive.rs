//! Tarball download and extraction
//!
//! Registry tarballs wrap their content in a single top-level directory
//! (`package/` for npm). [`TarballInstaller`] extracts into a staging
//! directory next to the target and moves the wrapper's contents into the
//! target, so the target never holds a half-extracted tree.

use crate::error::{IoResultExt, UnitError, UnitResult};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use futures::StreamExt;
use sha2::{Digest, Sha512};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tar::Archive;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Default download timeout (5 minutes)
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Materializes a remote archive into a directory
#[async_trait]
pub trait ArchiveInstaller: Send + Sync {
    /// Install the archive at `url` into `target_dir`.
    ///
    /// `target_dir` must be absent or empty. On failure everything this call
    /// created is removed.
    async fn install_from(
        &self,
        url: &str,
        integrity: Option<&str>,
        target_dir: &Path,
    ) -> UnitResult<()>;
}

/// Check a downloaded digest against an SRI string.
///
/// Only `sha512-` entries are checked; other algorithms are skipped.
pub fn verify_integrity(url: &str, expected: &str, sha512: &[u8]) -> UnitResult<()> {
    let actual = STANDARD.encode(sha512);
    let mut checked = false;

    for entry in expected.split_whitespace() {
        if let Some(digest) = entry.strip_prefix("sha512-") {
            checked = true;
            if digest == actual {
                debug!("Integrity verified for {}", url);
                return Ok(());
            }
        }
    }

    if !checked {
        debug!("No sha512 digest for {}, skipping integrity check", url);
        return Ok(());
    }

    Err(UnitError::IntegrityMismatch {
        url: url.to_string(),
        expected: expected.to_string(),
    })
}

/// reqwest + tar/gzip [`ArchiveInstaller`]
#[derive(Clone)]
pub struct TarballInstaller {
    client: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for TarballInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TarballInstaller")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TarballInstaller {
    pub fn new() -> UnitResult<Self> {
        Self::with_timeout(
            Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
            concat!("stencil/", env!("CARGO_PKG_VERSION")),
        )
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> UnitResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| UnitError::network("<client>", e))?;
        Ok(Self { client, timeout })
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> UnitError {
        if e.is_timeout() {
            UnitError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            UnitError::network(url, e)
        }
    }

    /// Stream the archive into a temporary file, returning it with its sha512
    async fn download(&self, url: &str) -> UnitResult<(NamedTempFile, Vec<u8>)> {
        debug!("Downloading {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UnitError::not_found(url));
        }
        if !status.is_success() {
            return Err(UnitError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let temp = NamedTempFile::new().map_err(|e| UnitError::filesystem(std::env::temp_dir(), e))?;
        let std_file = temp.reopen().at_path(temp.path())?;
        let mut file = tokio::fs::File::from_std(std_file);
        let mut hasher = Sha512::new();
        let mut stream = response.bytes_stream();
        let mut total = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(url, e))?;
            hasher.update(&chunk);
            total += chunk.len();
            file.write_all(&chunk).await.at_path(temp.path())?;
        }
        file.flush().await.at_path(temp.path())?;
        file.sync_all().await.at_path(temp.path())?;

        debug!("Downloaded {} bytes from {}", total, url);
        Ok((temp, hasher.finalize().to_vec()))
    }
}

#[async_trait]
impl ArchiveInstaller for TarballInstaller {
    async fn install_from(
        &self,
        url: &str,
        integrity: Option<&str>,
        target_dir: &Path,
    ) -> UnitResult<()> {
        ensure_installable(target_dir)?;

        let (archive, digest) = self.download(url).await?;
        if let Some(expected) = integrity {
            verify_integrity(url, expected, &digest)?;
        }

        let archive_path = archive.path().to_path_buf();
        let target = target_dir.to_path_buf();
        let result = tokio::task::spawn_blocking(move || extract_into(&archive_path, &target))
            .await
            .map_err(|e| UnitError::Task(e.to_string()))?;

        // The temporary archive is deleted when `archive` drops
        drop(archive);
        result
    }
}

/// Target must be absent or an empty directory
fn ensure_installable(target_dir: &Path) -> UnitResult<()> {
    match fs::read_dir(target_dir) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(UnitError::filesystem(
                    target_dir,
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "target directory is not empty",
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UnitError::filesystem(target_dir, e)),
    }
}

/// Extract a gzip tarball into `target_dir`, flattening its wrapper directory.
///
/// Blocking; run on the blocking pool.
pub fn extract_into(archive_path: &Path, target_dir: &Path) -> UnitResult<()> {
    let parent = target_dir.parent().ok_or_else(|| {
        UnitError::filesystem(
            target_dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "target has no parent"),
        )
    })?;
    fs::create_dir_all(parent).at_path(parent)?;

    // Removed on drop, whatever happens below
    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(parent)
        .at_path(parent)?;

    unpack(archive_path, staging.path())?;

    let wrapper = single_wrapper_dir(staging.path())?;
    flatten_into(&wrapper, target_dir)
}

fn unpack(archive_path: &Path, dir: &Path) -> UnitResult<()> {
    let file = fs::File::open(archive_path).at_path(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    archive.set_preserve_permissions(false);
    archive.unpack(dir).map_err(|e| unpack_error(dir, e))
}

/// A corrupt archive is `ArchiveFormat`; a local write failure is `Filesystem`
fn unpack_error(dir: &Path, e: std::io::Error) -> UnitError {
    use std::io::ErrorKind::{InvalidData, InvalidInput, Other, UnexpectedEof};

    match e.kind() {
        // tar reports malformed headers as `Other`
        InvalidData | InvalidInput | UnexpectedEof | Other => {
            UnitError::archive_format(format!("failed to extract archive: {}", e))
        }
        _ => UnitError::filesystem(dir, e),
    }
}

/// The only top-level entry of `dir`, which must be a directory
fn single_wrapper_dir(dir: &Path) -> UnitResult<PathBuf> {
    let entries: Vec<fs::DirEntry> = fs::read_dir(dir)
        .at_path(dir)?
        .collect::<std::io::Result<_>>()
        .at_path(dir)?;

    match entries.as_slice() {
        [] => Err(UnitError::archive_format("archive is empty")),
        [entry] => {
            let file_type = entry.file_type().at_path(&entry.path())?;
            if file_type.is_dir() {
                Ok(entry.path())
            } else {
                Err(UnitError::archive_format(format!(
                    "top-level entry {} is not a directory",
                    entry.file_name().to_string_lossy()
                )))
            }
        }
        many => Err(UnitError::archive_format(format!(
            "expected one top-level directory, found {} entries",
            many.len()
        ))),
    }
}

/// Move `wrapper` (or its children) into `target_dir`
fn flatten_into(wrapper: &Path, target_dir: &Path) -> UnitResult<()> {
    if !target_dir.exists() {
        return fs::rename(wrapper, target_dir).at_path(target_dir);
    }

    // Existing (empty) target: move children one by one, undo on failure
    let mut moved: Vec<PathBuf> = Vec::new();
    let result = (|| -> UnitResult<()> {
        for entry in fs::read_dir(wrapper).at_path(wrapper)? {
            let entry = entry.at_path(wrapper)?;
            let dest = target_dir.join(entry.file_name());
            fs::rename(entry.path(), &dest).at_path(&dest)?;
            moved.push(dest);
        }
        Ok(())
    })();

    if result.is_err() {
        for path in &moved {
            let removed = if path.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            };
            if let Err(e) = removed {
                warn!("Failed to roll back {}: {}", path.display(), e);
            }
        }
    }
    result
}
