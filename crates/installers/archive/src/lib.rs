//! Download-and-unpack installer for customtools.
//!
//! Handles [`InstallerSource::DownloadAndUnpack`]:
//! - Fetches the archive over HTTP(S), or reads it from a local path or
//!   `file://` URL
//! - Extracts zip and tar.gz archives atomically into the tool's directory
//! - Records the source URL in a `.installed-from` marker so later builds skip
//!   the download

use async_trait::async_trait;
use customtools_core::paths::resolve_exported_path;
use customtools_core::tools::{InstallRequest, Installer, InstallerSource};
use customtools_core::variables::expand;
use customtools_core::{Error, Result};
use flate2::read::GzDecoder;
use reqwest::Client;
use std::fmt::Display;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use tracing::{debug, info};

/// Marker file written after a successful installation.
pub const MARKER_FILE: &str = ".installed-from";

/// Tag in the names of in-progress extraction directories.
const STAGING_TAG: &str = "staging";

/// Archive formats the installer can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` / `.tgz`
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the URL suffix, falling back to magic bytes.
    #[must_use]
    pub fn detect(url: &str, data: &[u8]) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if path.ends_with(".zip") {
            Some(Self::Zip)
        } else if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if data.starts_with(b"PK\x03\x04") {
            Some(Self::Zip)
        } else if data.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else {
            None
        }
    }
}

fn installation(context: &str, e: impl Display) -> Error {
    Error::installation(format!("{context}: {e}"))
}

/// Installer that downloads an archive and unpacks it as the tool's home.
pub struct ArchiveInstaller {
    client: Client,
}

impl ArchiveInstaller {
    /// Create a new archive installer.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialization failure).
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("customtools/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| installation("Failed to create HTTP client", e))?;
        Ok(Self { client })
    }

    /// Whether `dir` already holds an installation from `url`.
    #[must_use]
    pub fn is_installed(dir: &Path, url: &str) -> bool {
        std::fs::read_to_string(dir.join(MARKER_FILE)).is_ok_and(|from| from.trim() == url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(path) = local_path(url) {
            debug!(path = %path.display(), "Reading local archive");
            return tokio::fs::read(&path)
                .await
                .map_err(|e| Error::io(e, &path, "read archive"));
        }

        debug!(%url, "Downloading archive");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| installation("Failed to download archive", e))?;

        if !response.status().is_success() {
            return Err(Error::installation_with_help(
                format!("Failed to download archive (HTTP {})", response.status()),
                format!("Check that {url} is reachable from this node"),
            ));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| installation("Failed to read archive", e))
    }
}

fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    (!url.contains("://")).then(|| PathBuf::from(url))
}

/// Extract `data` into `dest`, replacing it only once extraction succeeded.
///
/// Extraction goes to a uniquely named staging directory next to `dest`,
/// which is renamed into place at the end.
///
/// # Errors
///
/// Returns an error if the archive is unreadable or the filesystem refuses
/// a write; `dest` is left untouched in that case.
pub fn extract_archive(data: &[u8], format: ArchiveFormat, dest: &Path) -> Result<()> {
    let parent = dest.parent().ok_or_else(|| {
        Error::installation(format!("{} has no parent directory", dest.display()))
    })?;
    std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create"))?;

    let name = dest.file_name().and_then(|s| s.to_str()).unwrap_or("extract");
    // Removed on drop, so a failed extraction leaves nothing behind
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{name}.{STAGING_TAG}"))
        .tempdir_in(parent)
        .map_err(|e| Error::io(e, parent, "create staging directory"))?;

    match format {
        ArchiveFormat::Zip => extract_zip(data, staging.path())?,
        ArchiveFormat::TarGz => extract_tar_gz(data, staging.path())?,
    }

    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| Error::io(e, dest, "remove"))?;
    }
    std::fs::rename(staging.path(), dest).map_err(|e| Error::io(e, dest, "rename"))?;
    Ok(())
}

fn extract_zip(data: &[u8], dest: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| installation("Failed to open zip", e))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| installation("Failed to read zip entry", e))?;

        let Some(outpath) = file.enclosed_name().map(|p| dest.join(p)) else {
            continue;
        };

        if file.is_dir() {
            std::fs::create_dir_all(&outpath)?;
            continue;
        }
        if let Some(parent) = outpath.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        std::fs::write(&outpath, &content)?;

        #[cfg(unix)]
        if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode))?;
        }
    }
    Ok(())
}

fn extract_tar_gz(data: &[u8], dest: &Path) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    archive.set_preserve_permissions(true);
    archive
        .unpack(dest)
        .map_err(|e| installation("Failed to extract tar", e))
}

#[async_trait]
impl Installer for ArchiveInstaller {
    fn name(&self) -> &str {
        "download_and_unpack"
    }

    fn description(&self) -> &'static str {
        "Download a zip or tar.gz archive and unpack it"
    }

    fn can_handle(&self, source: &InstallerSource) -> bool {
        matches!(source, InstallerSource::DownloadAndUnpack { .. })
    }

    async fn install_on(&self, request: &InstallRequest<'_>) -> Result<PathBuf> {
        let InstallerSource::DownloadAndUnpack { url, subdir } = request.source else {
            return Err(Error::installation(
                "ArchiveInstaller received non-archive source",
            ));
        };
        let url = expand(url, request.node.environment());
        let dir = request.install_dir();

        // Held until return so a concurrent build never sees a half-swapped home
        let _lock = request.lock().await?;
        if !request.options.force_reinstall && Self::is_installed(&dir, &url) {
            debug!(tool = %request.tool.name, dir = %dir.display(), "Archive already installed");
        } else {
            let data = self.fetch(&url).await?;
            let format = ArchiveFormat::detect(&url, &data).ok_or_else(|| {
                Error::installation_with_help(
                    format!("Unrecognized archive format for {url}"),
                    "Use a .zip, .tar.gz or .tgz archive",
                )
            })?;

            let dest = dir.clone();
            tokio::task::spawn_blocking(move || extract_archive(&data, format, &dest))
                .await
                .map_err(|e| installation("Extraction task failed", e))??;

            let marker = dir.join(MARKER_FILE);
            tokio::fs::write(&marker, &url)
                .await
                .map_err(|e| Error::io(e, &marker, "write"))?;
            info!(tool = %request.tool.name, %url, dir = %dir.display(), "Unpacked archive");
        }

        let Some(subdir) = subdir.as_deref().filter(|s| !s.trim().is_empty()) else {
            return Ok(dir);
        };
        let home = resolve_exported_path(subdir, &dir).unwrap_or_else(|| dir.clone());
        if !home.is_dir() {
            return Err(Error::installation_with_help(
                format!("Archive from {url} has no directory '{subdir}'"),
                "Check the installer's subdir setting",
            ));
        }
        Ok(home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use customtools_core::tools::{CustomTool, ToolOptions};
    use customtools_core::Node;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn tar_gz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    fn zip(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (path, data) in files {
            writer
                .start_file(*path, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn staging_dirs(root: &Path) -> usize {
        std::fs::read_dir(root)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .contains(STAGING_TAG)
            })
            .count()
    }

    async fn install(
        root: &Path,
        url: &str,
        subdir: Option<&str>,
        force: bool,
    ) -> Result<PathBuf> {
        let tool = CustomTool::new("sdk");
        let source = InstallerSource::DownloadAndUnpack {
            url: url.to_string(),
            subdir: subdir.map(String::from),
        };
        let node = Node::new("n");
        let options = ToolOptions::new()
            .with_tools_root(root.to_path_buf())
            .with_force_reinstall(force);
        let request = InstallRequest {
            tool: &tool,
            source: &source,
            node: &node,
            options: &options,
        };
        ArchiveInstaller::new()?.install_on(&request).await
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            ArchiveFormat::detect("https://e.com/a.zip?x=1", &[]),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(
            ArchiveFormat::detect("https://e.com/a.TGZ", &[]),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(
            ArchiveFormat::detect("https://e.com/download", b"PK\x03\x04rest"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::detect("https://e.com/download", b"plain"), None);
    }

    #[test]
    fn test_local_path() {
        assert_eq!(local_path("file:///tmp/a.zip"), Some(PathBuf::from("/tmp/a.zip")));
        assert_eq!(local_path("/tmp/a.zip"), Some(PathBuf::from("/tmp/a.zip")));
        assert_eq!(local_path("https://e.com/a.zip"), None);
    }

    #[tokio::test]
    async fn test_install_tar_gz_with_subdir() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("sdk.tar.gz");
        std::fs::write(&archive, tar_gz(&[("sdk-1.0/bin/sdk", b"#!/bin/sh\n")])).unwrap();
        let root = tmp.path().join("tools");

        let home = install(&root, archive.to_str().unwrap(), Some("sdk-1.0"), false)
            .await
            .unwrap();

        assert_eq!(home, root.join("sdk").join("sdk-1.0"));
        assert!(home.join("bin/sdk").exists());
        assert_eq!(
            std::fs::read_to_string(root.join("sdk").join(MARKER_FILE)).unwrap(),
            archive.to_str().unwrap()
        );
    }

    #[tokio::test]
    async fn test_install_zip_from_file_url() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("sdk.zip");
        std::fs::write(&archive, zip(&[("bin/sdk", b"binary")])).unwrap();
        let root = tmp.path().join("tools");
        let url = format!("file://{}", archive.display());

        let home = install(&root, &url, None, false).await.unwrap();
        assert_eq!(home, root.join("sdk"));
        assert_eq!(std::fs::read(home.join("bin/sdk")).unwrap(), b"binary");
    }

    #[tokio::test]
    async fn test_marker_skips_download() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("sdk.tar.gz");
        std::fs::write(&archive, tar_gz(&[("bin/sdk", b"v1")])).unwrap();
        let root = tmp.path().join("tools");
        let url = archive.to_str().unwrap().to_string();

        install(&root, &url, None, false).await.unwrap();
        // Archive gone: a second install must not need it
        std::fs::remove_file(&archive).unwrap();
        let home = install(&root, &url, None, false).await.unwrap();
        assert_eq!(std::fs::read(home.join("bin/sdk")).unwrap(), b"v1");

        // Forcing a reinstall does need it
        assert!(install(&root, &url, None, true).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_extraction_keeps_previous_install() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.tar.gz");
        std::fs::write(&good, tar_gz(&[("bin/sdk", b"v1")])).unwrap();
        let bad = tmp.path().join("bad.tar.gz");
        std::fs::write(&bad, b"\x1f\x8bnot really gzip").unwrap();
        let root = tmp.path().join("tools");

        install(&root, good.to_str().unwrap(), None, false)
            .await
            .unwrap();
        assert!(install(&root, bad.to_str().unwrap(), None, false).await.is_err());

        let dir = root.join("sdk");
        assert_eq!(std::fs::read(dir.join("bin/sdk")).unwrap(), b"v1");
        assert_eq!(staging_dirs(&root), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_installs_of_same_tool() {
        let tmp = TempDir::new().unwrap();
        let names: Vec<String> = (0..300).map(|i| format!("bin/file-{i}")).collect();
        let files: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
        let archive = tmp.path().join("sdk.tar.gz");
        std::fs::write(&archive, tar_gz(&files)).unwrap();
        let url = archive.to_str().unwrap().to_string();

        for round in 0..3 {
            let root = tmp.path().join(format!("tools{round}"));
            let mut handles = Vec::new();
            for _ in 0..6 {
                let root = root.clone();
                let url = url.clone();
                handles.push(tokio::spawn(async move {
                    install(&root, &url, None, false).await
                }));
            }
            for handle in handles {
                let home = handle.await.unwrap().unwrap();
                assert_eq!(std::fs::read_dir(home.join("bin")).unwrap().count(), 300);
            }
            assert!(ArchiveInstaller::is_installed(&root.join("sdk"), &url));
            assert_eq!(staging_dirs(&root), 0);
        }
    }

    #[tokio::test]
    async fn test_missing_subdir_is_error() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("sdk.tar.gz");
        std::fs::write(&archive, tar_gz(&[("bin/sdk", b"x")])).unwrap();

        let err = install(
            &tmp.path().join("tools"),
            archive.to_str().unwrap(),
            Some("sdk-2.0"),
            false,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("sdk-2.0"));
    }

    #[test]
    fn test_can_handle() {
        let installer = ArchiveInstaller::new().unwrap();
        assert_eq!(installer.name(), "download_and_unpack");
        assert!(installer.can_handle(&InstallerSource::DownloadAndUnpack {
            url: "u".into(),
            subdir: None,
        }));
        assert!(!installer.can_handle(&InstallerSource::Local { home: "/x".into() }));
    }
}
