//! Input source detection (local path vs HTTP/HTTPS URL) and raw byte acquisition.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;

use crate::CompressionFormat;

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum InputSource {
    Local(PathBuf),
    Http(String),
}

/// Classifies the path as local or HTTP/HTTPS using string parsing only (no filesystem calls).
pub fn input_source(path: &Path) -> InputSource {
    let s = path.as_os_str().to_string_lossy();
    if let Some(after_scheme) = s.find("://") {
        let prefix = s[..after_scheme].to_lowercase();
        if prefix == "http" || prefix == "https" {
            return InputSource::Http(s.to_string());
        }
    }
    InputSource::Local(path.to_path_buf())
}

impl InputSource {
    /// Stable identity used as the cache key: canonical path for local files
    /// (falls back to the path as given when it cannot be resolved), the URL otherwise.
    pub fn identity(&self) -> String {
        match self {
            InputSource::Local(path) => std::fs::canonicalize(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
            InputSource::Http(url) => url.clone(),
        }
    }

    /// Path-like view of the source used for extension-based format detection.
    pub fn extension_path(&self) -> PathBuf {
        match self {
            InputSource::Local(path) => path.clone(),
            InputSource::Http(url) => {
                let without_query = url.split(['?', '#']).next().unwrap_or(url);
                let last_segment = without_query.rsplit('/').next().unwrap_or(without_query);
                PathBuf::from(last_segment)
            }
        }
    }

    /// Read the whole source into memory, decompressing when `compression` is set
    /// or detected from the extension.
    pub fn read_bytes(
        &self,
        compression: Option<CompressionFormat>,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let compression =
            compression.or_else(|| CompressionFormat::from_extension(&self.extension_path()));
        match self {
            InputSource::Local(path) => {
                let file = File::open(path)
                    .wrap_err_with(|| format!("Could not open {}", path.display()))?;
                decompress(BufReader::new(file), compression)
            }
            InputSource::Http(url) => {
                let reader = download(url, timeout)?;
                decompress(reader, compression)
            }
        }
    }
}

fn decompress<R: Read + 'static>(
    reader: R,
    compression: Option<CompressionFormat>,
) -> Result<Vec<u8>> {
    let mut reader: Box<dyn Read> = match compression {
        None => Box::new(reader),
        Some(CompressionFormat::Gzip) => Box::new(flate2::read::MultiGzDecoder::new(reader)),
        Some(CompressionFormat::Zstd) => Box::new(zstd::Decoder::new(reader)?),
        Some(CompressionFormat::Bzip2) => Box::new(bzip2::read::BzDecoder::new(reader)),
        Some(CompressionFormat::Xz) => Box::new(xz2::read::XzDecoder::new(reader)),
    };
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(feature = "http")]
fn download(url: &str, timeout: Duration) -> Result<Box<dyn Read + Send>> {
    let response = ureq::get(url).timeout(timeout).call().map_err(|e| {
        eyre!(
            "Download failed. Check the URL and your connection: {}",
            e
        )
    })?;
    let status = response.status();
    if status >= 400 {
        return Err(eyre!(
            "Server returned {} {}. Check the URL.",
            status,
            response.status_text()
        ));
    }
    Ok(Box::new(response.into_reader()))
}

#[cfg(not(feature = "http"))]
fn download(url: &str, _timeout: Duration) -> Result<Box<dyn Read + Send>> {
    Err(eyre!(
        "Cannot open {}: animex was built without the `http` feature",
        url
    ))
}
