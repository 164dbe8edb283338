//! Compressed archives of whole workspaces.
//!
//! Used for languages without a native build step, and as the Python
//! fallback. Archives are gzip-compressed tarballs written straight to disk
//! inside the workspace, then read back as the artifact payload.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, HeaderMode};
use walkdir::WalkDir;

use crate::error::{ForgeError, Result};
use crate::toolchain::Artifact;
use crate::workspace::{Workspace, TOOL_DIR};

/// Archives workspaces into `.tar.gz` bundles.
#[derive(Debug, Clone)]
pub struct Packager {
    level: Compression,
}

impl Default for Packager {
    fn default() -> Self {
        Self {
            level: Compression::best(),
        }
    }
}

impl Packager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Archive every file in `workspace` into `archive_name`.
    ///
    /// The archive itself lives in the workspace root and is excluded from
    /// its own contents, as are toolchain intermediates. Entries use `/`-separated paths relative to the
    /// workspace root and deterministic headers.
    pub fn archive(&self, workspace: &Workspace, archive_name: &str) -> Result<Artifact> {
        let root = workspace.root();
        let archive_path = root.join(archive_name);

        let count = self
            .write_archive(root, &archive_path)
            .map_err(|e| ForgeError::resource(&archive_path, e))?;

        let payload =
            std::fs::read(&archive_path).map_err(|e| ForgeError::resource(&archive_path, e))?;

        tracing::debug!(
            archive = %archive_path.display(),
            files = count,
            bytes = payload.len(),
            "Packaged workspace"
        );

        Ok(Artifact {
            filename: archive_name.to_string(),
            payload,
        })
    }

    fn write_archive(&self, root: &Path, archive_path: &Path) -> io::Result<usize> {
        let file = File::create(archive_path)?;
        let encoder = GzEncoder::new(BufWriter::new(file), self.level);
        let mut builder = Builder::new(encoder);
        builder.mode(HeaderMode::Deterministic);
        builder.follow_symlinks(false);

        let mut count = 0;
        for (path, name) in archive_entries(root, archive_path)? {
            builder.append_path_with_name(&path, &name)?;
            count += 1;
        }

        let encoder = builder.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        Ok(count)
    }
}

/// Files below `root` paired with their archive names, excluding `skip`.
fn archive_entries(root: &Path, skip: &Path) -> io::Result<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == TOOL_DIR));

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() || entry.path() == skip {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push((entry.into_path(), name));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkspaceConfig;
    use crate::request::FileEntry;
    use crate::workspace::WorkspaceManager;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tar::Archive;
    use tempfile::TempDir;

    fn unpack(payload: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut archive = Archive::new(GzDecoder::new(payload));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let name = e.path().unwrap().to_string_lossy().into_owned();
                let mut content = Vec::new();
                e.read_to_end(&mut content).unwrap();
                (name, content)
            })
            .collect()
    }

    fn staged(files: &[FileEntry]) -> (TempDir, WorkspaceManager, Workspace) {
        let tmp = TempDir::new().unwrap();
        let config = WorkspaceConfig {
            scratch_root: tmp.path().join("scratch"),
            ..Default::default()
        };
        let mgr = WorkspaceManager::new(&config).unwrap();
        let ws = mgr.create().unwrap();
        mgr.write_files(&ws, files).unwrap();
        (tmp, mgr, ws)
    }

    #[test]
    fn test_archive_contains_exactly_staged_files() {
        let (_tmp, _mgr, ws) = staged(&[
            FileEntry::new("index.html", "<html></html>"),
            FileEntry::new("css/site.css", "body {}"),
        ]);

        let artifact = Packager::new().archive(&ws, "site.tar.gz").unwrap();
        let entries = unpack(&artifact.payload);

        assert_eq!(artifact.filename, "site.tar.gz");
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["css/site.css", "index.html"]);
        assert_eq!(entries[1].1, b"<html></html>");
    }

    #[test]
    fn test_archive_excludes_itself_when_rerun() {
        let (_tmp, _mgr, ws) = staged(&[FileEntry::new("index.html", "<html></html>")]);

        let packager = Packager::new();
        packager.archive(&ws, "site.tar.gz").unwrap();
        let second = packager.archive(&ws, "site.tar.gz").unwrap();

        let entries = unpack(&second.payload);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "index.html");
    }

    #[test]
    fn test_archive_skips_tool_intermediates() {
        let (_tmp, _mgr, ws) = staged(&[
            FileEntry::new("main.py", "print(1)"),
            FileEntry::new("build/helpers.py", "X = 1"),
        ]);
        let debris = ws.tool_dir("pyinstaller").join("build");
        std::fs::create_dir_all(&debris).unwrap();
        std::fs::write(debris.join("warn.txt"), "partial").unwrap();

        let artifact = Packager::new().archive(&ws, "app.tar.gz").unwrap();

        let names: Vec<_> = unpack(&artifact.payload).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["build/helpers.py", "main.py"]);
    }

    #[test]
    fn test_archive_compresses() {
        let big = "a".repeat(100_000);
        let (_tmp, _mgr, ws) = staged(&[FileEntry::new("data.txt", big)]);

        let artifact = Packager::new().archive(&ws, "data.tar.gz").unwrap();

        assert!(artifact.len() < 10_000);
    }
}
