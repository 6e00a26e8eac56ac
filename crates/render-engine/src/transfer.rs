//! Media transfer to and from storage.
//!
//! Locations are either local paths or `http(s)` presigned URLs. Downloads
//! stream into a temporary file beside the destination and are persisted
//! only once complete, so a failed transfer never leaves a partial file.
//! Errors never carry the query string of a presigned URL.

use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reelsmith_common::{ReelError, ReelResult, ServiceConfig};
use tempfile::NamedTempFile;

/// Whether `location` is fetched over HTTP.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Content type sent with an upload, from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("srt") => "application/x-subrip",
        Some("vtt") => "text/vtt",
        _ => "application/json",
    }
}

pub struct TransferClient {
    http: reqwest::blocking::Client,
}

impl TransferClient {
    pub fn new(timeout: Duration) -> ReelResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("reelsmith/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ReelError::transfer(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http })
    }

    pub fn from_services(services: &ServiceConfig) -> ReelResult<Self> {
        Self::new(Duration::from_secs(services.transfer_timeout_secs))
    }

    /// Fetch `source` into `dest`. Nothing is written at `dest` unless the
    /// whole transfer succeeds.
    pub fn download(&self, source: &str, dest: &Path) -> ReelResult<()> {
        tracing::info!(source = %redact(source), dest = %dest.display(), "Starting download");
        let bytes = self.try_download(source, dest).map_err(|err| {
            ReelError::transfer(format!("download of {} failed: {err}", redact(source)))
        })?;
        tracing::info!(dest = %dest.display(), bytes, "Download complete");
        Ok(())
    }

    /// Send `local` to `dest`.
    pub fn upload(&self, local: &Path, dest: &str) -> ReelResult<()> {
        tracing::info!(local = %local.display(), dest = %redact(dest), "Starting upload");
        self.try_upload(local, dest).map_err(|err| {
            ReelError::transfer(format!(
                "upload of {} to {} failed: {err}",
                local.display(),
                redact(dest)
            ))
        })?;
        tracing::info!(local = %local.display(), "Upload complete");
        Ok(())
    }

    fn try_download(&self, source: &str, dest: &Path) -> ReelResult<u64> {
        if source.trim().is_empty() {
            return Err(ReelError::transfer("no source location given"));
        }
        let parent = match dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => p,
            None => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;
        let mut tmp = NamedTempFile::new_in(parent)?;

        let bytes = if is_remote(source) {
            let mut response = self
                .http
                .get(source)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| ReelError::transfer(format!("GET failed: {}", e.without_url())))?;
            response.copy_to(tmp.as_file_mut()).map_err(|e| {
                ReelError::transfer(format!("reading response failed: {}", e.without_url()))
            })?
        } else {
            let mut file = File::open(source)
                .map_err(|e| ReelError::transfer(format!("cannot open {source}: {e}")))?;
            std::io::copy(&mut file, tmp.as_file_mut())?
        };

        tmp.persist(dest).map_err(|e| ReelError::Io(e.error))?;
        Ok(bytes)
    }

    fn try_upload(&self, local: &Path, dest: &str) -> ReelResult<()> {
        if dest.trim().is_empty() {
            return Err(ReelError::transfer("no destination given"));
        }
        if !local.is_file() {
            return Err(ReelError::missing_asset(local));
        }

        if is_remote(dest) {
            let body = File::open(local)?;
            self.http
                .put(dest)
                .header(reqwest::header::CONTENT_TYPE, content_type_for(local))
                .body(body)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| ReelError::transfer(format!("PUT failed: {}", e.without_url())))?;
            return Ok(());
        }

        self.try_download(&local.to_string_lossy(), Path::new(dest))
            .map(|_| ())
    }
}

/// Strip the query string, which carries presigned credentials.
fn redact(location: &str) -> &str {
    location.split('?').next().unwrap_or(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TransferClient {
        TransferClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_local_download_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.mp4");
        std::fs::write(&src, b"media").unwrap();
        let dest = dir.path().join("nested/copy.mp4");

        client().download(&src.to_string_lossy(), &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"media");
    }

    #[test]
    fn test_failed_download_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("copy.mp4");
        assert!(client().download("/no/such/source.mp4", &dest).is_err());
        assert!(client().download("", &dest).is_err());
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_download_error_names_the_cause() {
        let dir = tempfile::tempdir().unwrap();
        let err = client()
            .download("/no/such/source.mp4", &dir.path().join("copy.mp4"))
            .unwrap_err();
        assert!(matches!(err, ReelError::Transfer { .. }));
        let message = err.to_string();
        assert!(message.contains("download of /no/such/source.mp4 failed"));
        assert!(message.contains("cannot open"));
    }

    #[test]
    fn test_remote_errors_hide_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let err = client()
            .download(
                "http://127.0.0.1:9/key.mp4?X-Amz-Signature=secret",
                &dir.path().join("copy.mp4"),
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("http://127.0.0.1:9/key.mp4"));
        assert!(!message.contains("secret"));
    }

    #[test]
    fn test_upload_requires_local_file_and_destination() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("cut.mp4");
        assert!(client().upload(&local, "/tmp/anywhere.mp4").is_err());
        std::fs::write(&local, b"cut").unwrap();
        let err = client().upload(&local, " ").unwrap_err();
        assert!(err.to_string().contains("no destination given"));

        let dest = dir.path().join("out/cut.mp4");
        client().upload(&local, &dest.to_string_lossy()).unwrap();
        assert_eq!(std::fs::read(dest).unwrap(), b"cut");
    }

    #[test]
    fn test_location_helpers() {
        assert!(is_remote("https://bucket.example/key?X-Amz-Signature=abc"));
        assert!(!is_remote("/media/key"));
        assert_eq!(redact("https://b/key?sig=1"), "https://b/key");
        assert_eq!(content_type_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.json")), "application/json");
    }
}
