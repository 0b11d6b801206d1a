//! Fetching and unpacking Node.js sources.

pub mod archive;
pub mod dist;
pub mod source_tree;

use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use thiserror::Error;
use url::Url;

use crate::core::{NodeVersion, TargetEnvironment};
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};

pub use archive::extract_tarball;
pub use dist::{node_src_url, Downloader, HttpDownloader, RC_POSTFIX};
pub use source_tree::SourceTree;

/// Failure to obtain a source tree.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid source URL for node {version}")]
    Url {
        version: NodeVersion,
        #[source]
        source: url::ParseError,
    },

    #[error("{message}")]
    Download { url: Url, message: String },

    #[error("failed to extract {url}: {message}")]
    Extract { url: Url, message: String },

    #[error("failed to prepare {path}: {message}")]
    Prepare { path: String, message: String },

    #[error("could not fetch node {version} from {primary} or {fallback}")]
    Exhausted {
        version: NodeVersion,
        primary: Url,
        fallback: Url,
        #[source]
        last: Box<FetchError>,
    },
}

/// Download and extract the sources for `version` into the environment.
///
/// The tree always lands at `<env>/src/node-v<version>`. If the release
/// tarball cannot be fetched, the release-candidate tarball (`-RC1`) is
/// tried exactly once before giving up.
pub fn fetch_and_extract(
    downloader: &dyn Downloader,
    dist: &Url,
    version: &NodeVersion,
    env: &TargetEnvironment,
) -> Result<SourceTree, FetchError> {
    let dest = env.node_src_dir(version);
    if dest.exists() {
        tracing::debug!("Reusing source directory {}", dest.display());
    }
    ensure_dir(&dest).map_err(|e| prepare_error(&dest, e))?;
    let tree = SourceTree::new(&dest);

    let primary = source_url(dist, version, "")?;
    let primary_err = match fetch_into(downloader, &primary, version, "", &dest) {
        Ok(()) => return Ok(tree),
        Err(e) => e,
    };

    let fallback = source_url(dist, version, RC_POSTFIX)?;
    tracing::warn!(
        "{}; retrying with release candidate {}",
        primary_err,
        fallback
    );

    // Start the retry from an empty directory.
    remove_dir_all_if_exists(&dest)
        .and_then(|()| ensure_dir(&dest))
        .map_err(|e| prepare_error(&dest, e))?;

    match fetch_into(downloader, &fallback, version, RC_POSTFIX, &dest) {
        Ok(()) => Ok(tree),
        Err(last) => Err(FetchError::Exhausted {
            version: version.clone(),
            primary,
            fallback,
            last: Box::new(last),
        }),
    }
}

fn source_url(dist: &Url, version: &NodeVersion, postfix: &str) -> Result<Url, FetchError> {
    node_src_url(dist, version, postfix).map_err(|source| FetchError::Url {
        version: version.clone(),
        source,
    })
}

fn prepare_error(path: &Path, e: anyhow::Error) -> FetchError {
    FetchError::Prepare {
        path: path.display().to_string(),
        message: format!("{:#}", e),
    }
}

/// Download one URL to a temporary file and unpack it into `dest`.
fn fetch_into(
    downloader: &dyn Downloader,
    url: &Url,
    version: &NodeVersion,
    postfix: &str,
    dest: &Path,
) -> Result<(), FetchError> {
    tracing::info!("Fetching {}", url);

    let staging = dest.parent().unwrap_or(dest);
    let mut file = tempfile::tempfile_in(staging).map_err(|e| prepare_error(staging, e.into()))?;

    let bytes = downloader
        .download(url, &mut file)
        .map_err(|e| FetchError::Download {
            url: url.clone(),
            message: format!("{:#}", e),
        })?;
    tracing::debug!("Downloaded {} bytes", bytes);

    file.seek(SeekFrom::Start(0))
        .map_err(|e| prepare_error(staging, e.into()))?;

    // Release candidates are not consistent about the postfix on their top directory
    let stem = dist::archive_stem(version, postfix);
    let plain = dist::archive_stem(version, "");
    let entries = extract_tarball(BufReader::new(file), dest, &[&stem, &plain]).map_err(|e| {
        FetchError::Extract {
            url: url.clone(),
            message: format!("{:#}", e),
        }
    })?;
    tracing::debug!("Extracted {} entries into {}", entries, dest.display());

    Ok(())
}
