//! Test fixtures for common provisioning scenarios.

use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::{BOWER_MANIFEST, PACKAGE_MANIFEST};

/// A project directory with optional manifests.
#[derive(Debug, Clone, Default)]
pub struct ProjectFixture {
    /// `package.json` content.
    pub package_json: Option<String>,
    /// `bower.json` content.
    pub bower_json: Option<String>,
}

impl ProjectFixture {
    pub fn new() -> Self {
        ProjectFixture::default()
    }

    /// A project pinning node with an `==` engines constraint.
    pub fn pinned(version: &str) -> Self {
        ProjectFixture::new().with_package_json(manifests::package_json(Some(&format!("=={}", version)), &[]))
    }

    pub fn with_package_json(mut self, content: impl Into<String>) -> Self {
        self.package_json = Some(content.into());
        self
    }

    pub fn with_bower_json(mut self, content: impl Into<String>) -> Self {
        self.bower_json = Some(content.into());
        self
    }

    /// Write the manifests into `dir`, returning it.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        if let Some(content) = &self.package_json {
            std::fs::write(dir.join(PACKAGE_MANIFEST), content)?;
        }
        if let Some(content) = &self.bower_json {
            std::fs::write(dir.join(BOWER_MANIFEST), content)?;
        }
        Ok(dir.to_path_buf())
    }
}

/// Manifest templates.
pub mod manifests {
    /// A `package.json` with an optional engines constraint and dependencies.
    pub fn package_json(node_engine: Option<&str>, deps: &[(&str, &str)]) -> String {
        let engines = node_engine
            .map(|c| format!(r#"  "engines": {{ "node": "{}" }},"#, c))
            .unwrap_or_default();
        let deps = deps
            .iter()
            .map(|(name, ver)| format!(r#"    "{}": "{}""#, name, ver))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            r#"{{
  "name": "fixture",
{engines}
  "dependencies": {{
{deps}
  }}
}}
"#
        )
    }

    /// A minimal `bower.json`.
    pub fn bower_json(deps: &[(&str, &str)]) -> String {
        let deps = deps
            .iter()
            .map(|(name, ver)| format!(r#"    "{}": "{}""#, name, ver))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            r#"{{
  "name": "fixture",
  "dependencies": {{
{deps}
  }}
}}
"#
        )
    }
}

/// Canned tool outputs.
pub mod outputs {
    use super::super::MockProcessOutput;

    /// `node --version` output.
    pub fn node_version(tag: &str) -> MockProcessOutput {
        MockProcessOutput::success(tag)
    }

    /// Successful `./configure` run.
    pub fn configure_success() -> MockProcessOutput {
        MockProcessOutput::success("creating  ./config.gypi\ncreating  ./config.mk")
    }

    /// `make` failing partway through.
    pub fn make_error(target: &str) -> MockProcessOutput {
        MockProcessOutput::failure(
            2,
            format!("make[1]: *** [{}] Error 1\nmake: *** [node] Error 2", target),
        )
    }
}

enum TarEntry {
    Dir,
    File { content: Vec<u8>, mode: u32 },
    HardLink { target: String },
}

/// Builds gzip-compressed tarballs in memory.
#[derive(Default)]
pub struct TarballBuilder {
    entries: Vec<(String, TarEntry)>,
}

impl TarballBuilder {
    pub fn new() -> Self {
        TarballBuilder::default()
    }

    /// Add a directory entry.
    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push((path.to_string(), TarEntry::Dir));
        self
    }

    /// Add a regular file with mode 0644.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((
            path.to_string(),
            TarEntry::File {
                content: content.as_ref().to_vec(),
                mode: 0o644,
            },
        ));
        self
    }

    /// Add a regular file with mode 0755.
    pub fn executable(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.entries.push((
            path.to_string(),
            TarEntry::File {
                content: content.as_ref().to_vec(),
                mode: 0o755,
            },
        ));
        self
    }

    /// Add a hard link to an earlier archive path.
    pub fn hard_link(mut self, path: &str, target: &str) -> Self {
        self.entries.push((
            path.to_string(),
            TarEntry::HardLink {
                target: target.to_string(),
            },
        ));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::fast());
        let mut builder = tar::Builder::new(encoder);

        for (path, entry) in self.entries {
            let mut header = tar::Header::new_gnu();
            match entry {
                TarEntry::Dir => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_mode(0o755);
                    header.set_size(0);
                    builder
                        .append_data(&mut header, &path, std::io::empty())
                        .unwrap();
                }
                TarEntry::File { content, mode } => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_mode(mode);
                    header.set_size(content.len() as u64);
                    builder
                        .append_data(&mut header, &path, content.as_slice())
                        .unwrap();
                }
                TarEntry::HardLink { target } => {
                    header.set_entry_type(tar::EntryType::Link);
                    header.set_mode(0o644);
                    header.set_size(0);
                    builder.append_link(&mut header, &path, &target).unwrap();
                }
            }
        }

        builder.into_inner().unwrap().finish().unwrap()
    }
}

/// Write a do-nothing executable script at `path`.
pub fn fake_executable(path: &Path) {
    std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
}

/// A tarball shaped like a node source release, rooted at `stem/`.
pub fn node_source_tarball(stem: &str) -> Vec<u8> {
    TarballBuilder::new()
        .dir(&format!("{}/", stem))
        .executable(&format!("{}/configure", stem), "#!/bin/sh\nexit 0\n")
        .file(&format!("{}/Makefile", stem), "all:\n\ttrue\n")
        .dir(&format!("{}/src/", stem))
        .file(&format!("{}/src/node.cc", stem), "int main() { return 0; }\n")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PackageManifest;

    #[test]
    fn test_package_json_fixture_parses() {
        let content = manifests::package_json(Some("==0.10.26"), &[("express", "3.4.8")]);
        let manifest = PackageManifest::parse(&content).unwrap();
        assert_eq!(manifest.node_engine(), Some("==0.10.26"));
        assert_eq!(manifest.install_specs(), vec!["express@3.4.8"]);
    }

    #[test]
    fn test_package_json_fixture_without_engines() {
        let manifest = PackageManifest::parse(&manifests::package_json(None, &[])).unwrap();
        assert_eq!(manifest.node_engine(), None);
        assert!(manifest.install_specs().is_empty());
    }

    #[test]
    fn test_project_fixture_write_to() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = ProjectFixture::pinned("0.10.26")
            .with_bower_json(manifests::bower_json(&[]))
            .write_to(&tmp.path().join("app"))
            .unwrap();

        assert!(dir.join(PACKAGE_MANIFEST).is_file());
        assert!(dir.join(BOWER_MANIFEST).is_file());
    }
}
