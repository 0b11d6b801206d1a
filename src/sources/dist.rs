//! Node.js distribution URLs and tarball downloads.
//!
//! Releases after 0.5.0 live in a per-version directory on the mirror:
//!
//! ```text
//! https://nodejs.org/dist/node-v0.4.12.tar.gz
//! https://nodejs.org/dist/v0.8.11/node-v0.8.11.tar.gz
//! ```

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use url::Url;

use crate::core::NodeVersion;
use crate::util::shell::Shell;

/// Versions strictly above this use a versioned directory on the mirror.
pub const VERSIONED_PATH_THRESHOLD: NodeVersion = NodeVersion::new(0, 5, 0);

/// Postfix tried once when the plain release tarball cannot be fetched.
pub const RC_POSTFIX: &str = "-RC1";

/// Top-level directory name inside a tarball (`node-v0.8.11-RC1`).
pub fn archive_stem(version: &NodeVersion, postfix: &str) -> String {
    format!("{}{}", version.source_name(), postfix)
}

/// Tarball file name (`node-v0.8.11.tar.gz`).
pub fn tarball_name(version: &NodeVersion, postfix: &str) -> String {
    format!("{}.tar.gz", archive_stem(version, postfix))
}

/// Compute the source tarball URL for a version.
pub fn node_src_url(dist: &Url, version: &NodeVersion, postfix: &str) -> Result<Url, url::ParseError> {
    let mut base = dist.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let tarball = tarball_name(version, postfix);
    if *version > VERSIONED_PATH_THRESHOLD {
        base.join(&format!("v{}/{}", version, tarball))
    } else {
        base.join(&tarball)
    }
}

/// Fetches a URL into a writer.
pub trait Downloader {
    /// Write the response body for `url` into `dest`, returning the byte count.
    ///
    /// Anything other than a successful response is an error.
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64>;
}

/// Downloads over HTTP(S) with a byte progress bar.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
    shell: Arc<Shell>,
}

impl HttpDownloader {
    pub fn new(shell: Arc<Shell>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("virtual-node/", env!("CARGO_PKG_VERSION")))
            .timeout(None::<Duration>)
            .build()
            .context("failed to create HTTP client")?;

        Ok(HttpDownloader { client, shell })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &Url, dest: &mut dyn Write) -> Result<u64> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to download {}", url))?;

        if !response.status().is_success() {
            bail!("failed to download {}: HTTP {}", url, response.status());
        }

        let total = response.content_length().unwrap_or(0);
        let name = url
            .path_segments()
            .and_then(|mut s| s.next_back())
            .unwrap_or("tarball")
            .to_string();
        let mut progress = self.shell.bytes_progress(name, total);

        let mut buf = vec![0u8; 64 * 1024];
        let mut written = 0u64;
        loop {
            let n = response
                .read(&mut buf)
                .with_context(|| format!("failed to read response body from {}", url))?;
            if n == 0 {
                break;
            }
            dest.write_all(&buf[..n])
                .context("failed to write downloaded data")?;
            written += n as u64;
            progress.inc(n as u64);
        }
        progress.finish();

        tracing::debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
