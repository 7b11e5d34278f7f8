// src/fetch/client.rs

//! Transports for source archives
//!
//! `HttpFetcher` wraps a blocking reqwest client with retry support and
//! streams responses straight to disk. `FileFetcher` serves `file://`
//! URLs for local mirrors and offline use.

use crate::error::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for a failed download
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// Something that can copy the bytes behind a URL into a local file
pub trait Fetcher: Send + Sync {
    /// Write the resource at `url` to `dest`, returning the byte count
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Stream a reader into a file, ticking an optional progress bar
fn stream_to_file<R: Read>(
    reader: &mut R,
    file: &mut File,
    total_size: u64,
    progress_bar: Option<&ProgressBar>,
    display_name: &str,
) -> Result<u64> {
    if let Some(pb) = progress_bar {
        if total_size > 0 {
            pb.set_length(total_size);
        }
        pb.set_message(display_name.to_string());
    }

    let mut downloaded: u64 = 0;
    let mut buffer = [0u8; STREAM_BUFFER_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| Error::NetworkError(format!("Failed to read response: {e}")))?;

        if bytes_read == 0 {
            break;
        }

        file.write_all(&buffer[..bytes_read])
            .map_err(|e| Error::IoError(format!("Failed to write data: {e}")))?;

        downloaded += bytes_read as u64;

        if let Some(pb) = progress_bar {
            pb.set_position(downloaded);
        }
    }

    Ok(downloaded)
}

/// HTTP(S) fetcher with retry support
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("formulary/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            show_progress: false,
        })
    }

    /// Show a progress bar on stderr while downloading
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    fn progress_bar(&self) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        Some(pb)
    }

    fn write_response(
        &self,
        mut response: reqwest::blocking::Response,
        url: &str,
        dest: &Path,
    ) -> Result<u64> {
        let total_size = response.content_length().unwrap_or(0);
        let mut file = File::create(dest)?;
        let pb = self.progress_bar();
        let display_name = url.rsplit('/').next().unwrap_or(url);
        let written = stream_to_file(&mut response, &mut file, total_size, pb.as_ref(), display_name)?;
        file.sync_all()?;

        if let Some(pb) = pb {
            pb.finish_and_clear();
        }
        Ok(written)
    }

    fn retry_or_fail(&self, attempt: u32, url: &str, reason: String) -> Result<()> {
        if attempt >= self.max_retries {
            return Err(Error::NetworkError(format!(
                "Failed to download {} after {} attempts: {}",
                url, attempt, reason
            )));
        }
        warn!("Download attempt {} failed: {}, retrying...", attempt, reason);
        std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
        Ok(())
    }
}

impl Fetcher for HttpFetcher {
    /// Transport failures and 5xx responses are retried; any other
    /// non-success status fails at once
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() {
                        self.retry_or_fail(attempt, url, format!("HTTP {}", status))?;
                        continue;
                    }
                    if !status.is_success() {
                        return Err(Error::NetworkError(format!("HTTP {} from {}", status, url)));
                    }

                    let written = self.write_response(response, url, dest).inspect_err(|_| {
                        let _ = fs::remove_file(dest);
                    })?;
                    info!("Downloaded {} ({} bytes)", url, written);
                    return Ok(written);
                }
                Err(e) => self.retry_or_fail(attempt, url, e.to_string())?,
            }
        }
    }
}

/// `file://` fetcher
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::NetworkError(format!("Invalid URL {}: {}", url, e)))?;
        let path = parsed
            .to_file_path()
            .map_err(|_| Error::NetworkError(format!("Not a local file URL: {}", url)))?;

        debug!("Copying local source {}", path.display());
        let mut source = File::open(&path)
            .map_err(|e| Error::NetworkError(format!("Cannot open {}: {}", path.display(), e)))?;
        let mut file = File::create(dest)?;
        let written = stream_to_file(&mut source, &mut file, 0, None, "")?;
        file.sync_all()?;
        Ok(written)
    }
}

/// Dispatches on URL scheme
pub struct SchemeFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl SchemeFetcher {
    pub fn new(show_progress: bool) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new()?.with_progress(show_progress),
            file: FileFetcher,
        })
    }
}

impl Fetcher for SchemeFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::NetworkError(format!("Invalid URL {}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => self.http.fetch(url, dest),
            "file" => self.file.fetch(url, dest),
            other => Err(Error::NetworkError(format!(
                "Unsupported URL scheme '{}' in {}",
                other, url
            ))),
        }
    }
}
