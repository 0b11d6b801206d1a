//! Source tarball extraction.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Extract a gzip-compressed tarball to a destination directory.
///
/// The first of `strip_prefixes` that leads an entry's path is removed from
/// it, so with `["node-v0.8.11-RC1", "node-v0.8.11"]` both
/// `node-v0.8.11-RC1/configure` and `node-v0.8.11/configure` land at
/// `dest/configure`. Entries under none of the prefixes are extracted as-is.
///
/// Returns the number of entries written.
pub fn extract_tarball(data: impl Read, dest: &Path, strip_prefixes: &[&str]) -> Result<usize> {
    let decoder = GzDecoder::new(data);
    let mut archive = Archive::new(decoder);

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;
    let canonical_dest = dest.canonicalize().unwrap_or_else(|_| dest.to_path_buf());

    let mut extracted = 0;
    for entry in archive
        .entries()
        .context("failed to read tarball entries")?
    {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();
        let entry_path_str = entry_path.to_string_lossy().replace('\\', "/");

        let relative = match strip(&entry_path_str, strip_prefixes) {
            Some(relative) => relative,
            None => continue,
        };
        check_relative(&relative, &entry_path_str)?;

        let output_path = dest.join(&relative);

        if let Ok(canonical_output) = output_path.canonicalize() {
            if !canonical_output.starts_with(&canonical_dest) {
                bail!(
                    "tarball entry escapes destination directory: {}",
                    entry_path_str
                );
            }
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let entry_type = entry.header().entry_type();
        match entry_type {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            tar::EntryType::Link => {
                // Hard link targets are archive paths, so they get the same prefix stripping
                let target = entry
                    .link_name()
                    .context("failed to read hard link target")?
                    .map(|t| t.to_string_lossy().replace('\\', "/"));
                let Some(target) = target.as_deref().and_then(|t| strip(t, strip_prefixes)) else {
                    bail!("hard link without a target: {}", entry_path_str);
                };
                check_relative(&target, &entry_path_str)?;

                if output_path.symlink_metadata().is_ok() {
                    std::fs::remove_file(&output_path).ok();
                }
                std::fs::hard_link(dest.join(&target), &output_path).with_context(|| {
                    format!("failed to create hard link: {}", output_path.display())
                })?;
            }
            tar::EntryType::Symlink => {
                #[cfg(unix)]
                {
                    if let Some(target) = entry.link_name().ok().flatten() {
                        if output_path.symlink_metadata().is_ok() {
                            std::fs::remove_file(&output_path).ok();
                        }
                        std::os::unix::fs::symlink(target.as_ref(), &output_path)
                            .with_context(|| {
                                format!("failed to create symlink: {}", output_path.display())
                            })?;
                    }
                }
                #[cfg(windows)]
                {
                    tracing::debug!("Skipping symlink on Windows: {}", entry_path_str);
                }
            }
            _ => {
                // pax headers, fifos, devices
                tracing::debug!(
                    "Skipping unsupported entry type {:?}: {}",
                    entry_type,
                    entry_path_str
                );
                continue;
            }
        }

        extracted += 1;
    }

    Ok(extracted)
}

/// Archive path relative to the destination, or `None` for the stripped
/// directory itself.
fn strip(entry_path: &str, strip_prefixes: &[&str]) -> Option<String> {
    let mut relative = entry_path;
    for prefix in strip_prefixes {
        let prefix = prefix.trim_end_matches('/');
        if entry_path == prefix {
            return None;
        }
        if let Some(stripped) = entry_path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            relative = stripped;
            break;
        }
    }

    (!relative.is_empty()).then(|| relative.to_string())
}

fn check_relative(relative: &str, entry_path: &str) -> Result<()> {
    let path = Path::new(relative);
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        bail!("tarball entry escapes destination directory: {}", entry_path);
    }
    Ok(())
}
