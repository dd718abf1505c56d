//! Client configuration

use range_put::{PutConfig, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default interval between upload progress polls (3s)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
/// Default progress bar animation tick (0.1s)
pub const DEFAULT_PROGRESS_TICK_MS: u64 = 100;
/// Dropping more files than this at once asks for confirmation
pub const DEFAULT_MAX_BATCH_FILES: usize = 5;
/// Width of the progress track graphic in pixels
pub const DEFAULT_TRACK_WIDTH: u32 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base of the dynamic endpoints (`/users/home`, `/ajax/phrase`, ...)
    pub cgi_root: String,
    /// Base of the resource endpoints (`/id/file/<id>`, `/id/document/<id>`)
    pub http_root: String,
    pub chunk_size: u64,
    pub poll_interval_ms: u64,
    pub progress_tick_ms: u64,
    pub max_batch_files: usize,
    pub progress_track_width: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cgi_root: "http://localhost/cgi".to_string(),
            http_root: "http://localhost".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            progress_tick_ms: DEFAULT_PROGRESS_TICK_MS,
            max_batch_files: DEFAULT_MAX_BATCH_FILES,
            progress_track_width: DEFAULT_TRACK_WIDTH,
        }
    }
}

impl ClientConfig {
    /// Config pointing both roots at one server, as used by a repository
    /// whose cgi scripts live under `<root>/cgi`.
    pub fn for_server(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            cgi_root: format!("{}/cgi", root),
            http_root: root.to_string(),
            ..Self::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&text)
            .map_err(|e| ClientError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [("cgi_root", &self.cgi_root), ("http_root", &self.http_root)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ClientError::Config(format!(
                    "{} must be an absolute http(s) URL, got {:?}",
                    name, url
                )));
            }
        }
        if self.chunk_size == 0 {
            return Err(ClientError::Config("chunk_size must be positive".to_string()));
        }
        if self.poll_interval_ms == 0 || self.progress_tick_ms == 0 {
            return Err(ClientError::Config("intervals must be positive".to_string()));
        }
        if self.progress_track_width == 0 {
            return Err(ClientError::Config(
                "progress_track_width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn put_config(&self) -> PutConfig {
        PutConfig {
            chunk_size: self.chunk_size,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    pub(crate) fn cgi_url(&self, path: &str) -> String {
        format!("{}{}", self.cgi_root.trim_end_matches('/'), path)
    }

    pub(crate) fn screen_url(&self) -> String {
        self.cgi_url("/users/home")
    }

    pub(crate) fn file_url(&self, file_id: &str) -> String {
        format!(
            "{}/id/file/{}",
            self.http_root.trim_end_matches('/'),
            urlencoding::encode(file_id)
        )
    }

    pub(crate) fn document_url(&self, document_id: &str) -> String {
        format!(
            "{}/id/document/{}",
            self.http_root.trim_end_matches('/'),
            urlencoding::encode(document_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ClientConfig;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1_048_576);
        assert_eq!(config.max_batch_files, 5);
    }

    #[test]
    fn urls_are_built_from_roots() {
        let config = ClientConfig::for_server("https://repo.example.org/");
        assert_eq!(config.screen_url(), "https://repo.example.org/cgi/users/home");
        assert_eq!(config.file_url("12"), "https://repo.example.org/id/file/12");
        assert_eq!(
            config.document_url("a b"),
            "https://repo.example.org/id/document/a%20b"
        );
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"{{"cgi_root": "https://r.example/cgi", "http_root": "https://r.example", "chunk_size": 4096}}"#
        )
        .unwrap();
        let config = ClientConfig::from_json_file(tmp.path()).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.poll_interval_ms, 3000);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config = ClientConfig {
            chunk_size: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn relative_root_is_rejected() {
        let config = ClientConfig {
            cgi_root: "/cgi".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
