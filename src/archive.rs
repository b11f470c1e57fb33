//! Project archive staging and inspection.
//!
//! Archives are downloaded once into a unique staging directory under the OS
//! temp dir, then listed/read in place without full extraction. Staged files
//! are never deleted automatically; the returned path belongs to the caller.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use tar::Archive;
use tracing::debug;

use crate::client::TdClient;
use crate::error::{Result, TdError};

/// Largest entry size accepted when listing; larger entries are skipped.
const MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;

/// Largest entry readable through [`read_entry`].
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

/// Prefix for per-download staging directories.
const STAGING_PREFIX: &str = "td_project_";

/// Result of a successful archive download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveDownload {
    /// Project id the archive belongs to.
    pub project_id: String,
    /// Project name, for display.
    pub project_name: String,
    /// Local path of the staged tar.gz file.
    pub archive_path: PathBuf,
}

/// One entry in an archive listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Entry path, relative to the archive root.
    pub name: String,
    /// "file" or "directory".
    pub kind: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Lowercased file extension, files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Coarse classification by extension, files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// Decoded text content of one archive entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryContent {
    /// Entry path, as requested.
    pub file_path: String,
    /// Decoded text content.
    pub content: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Lowercased file extension, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

/// Whether a project id is safe to splice into URLs and file names.
pub fn valid_project_id(project_id: &str) -> bool {
    !project_id.is_empty()
        && project_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Whether an archive path points at a staged tar.gz under the temp dir.
///
/// Front-ends receive archive paths from the outside world, so anything not
/// produced by [`download_archive`] is rejected up front.
pub fn valid_archive_path(path: &Path) -> bool {
    let Some(s) = path.to_str() else {
        return false;
    };
    s.ends_with(".tar.gz")
        && !s.contains("..")
        && path.starts_with(std::env::temp_dir())
}

/// Whether an entry path is relative and traversal-free.
pub fn valid_entry_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.starts_with('\\')
        && !path.split(['/', '\\']).any(|part| part == "..")
}

/// Download a project's archive into a fresh staging directory.
///
/// The project's existence is checked first; `Ok(None)` means there is
/// nothing to download. Each invocation stages into its own directory, so
/// concurrent downloads of different projects cannot collide.
pub async fn download_archive(
    client: &TdClient,
    project_id: &str,
) -> Result<Option<ArchiveDownload>> {
    if !valid_project_id(project_id) {
        return Err(TdError::InvalidArg {
            name: "project_id".to_string(),
            reason: "only alphanumeric characters, hyphens, and underscores are allowed"
                .to_string(),
        });
    }

    let project = match client.get_project(project_id).await? {
        Some(p) => p,
        None => return Ok(None),
    };

    let bytes = client.download_project_archive(project_id).await?;

    // keep(): the staged file outlives this call, the caller owns cleanup.
    let staging_dir = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir()?
        .keep();
    let archive_path = staging_dir.join(format!("project_{}.tar.gz", project_id));
    std::fs::write(&archive_path, &bytes)?;
    debug!(project_id, path = %archive_path.display(), size = bytes.len(), "staged archive");

    Ok(Some(ArchiveDownload {
        project_id: project_id.to_string(),
        project_name: project.name,
        archive_path,
    }))
}

/// List the entries of a staged archive.
///
/// Entries with absolute or traversing paths, and files over 100 MiB, are
/// skipped rather than reported. Directories sort before files, then by name.
pub fn list_entries(archive_path: &Path) -> Result<Vec<ArchiveEntry>> {
    let file = open_archive(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut entries = Vec::new();
    for entry in archive.entries().map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        let path = entry.path().map_err(read_error)?;
        let name = path.to_string_lossy().into_owned();

        if !valid_entry_path(&name) || entry.size() > MAX_ENTRY_SIZE {
            continue;
        }

        let is_dir = entry.header().entry_type().is_dir();
        let (extension, file_type) = if is_dir {
            (None, None)
        } else {
            let ext = extension_of(&name);
            let file_type = Some(classify(ext.as_deref()).to_string());
            (ext, file_type)
        };

        entries.push(ArchiveEntry {
            name,
            kind: if is_dir { "directory" } else { "file" }.to_string(),
            size: entry.size(),
            extension,
            file_type,
        });
    }

    entries.sort_by(|a, b| {
        let rank = |e: &ArchiveEntry| if e.kind == "directory" { 0 } else { 1 };
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    Ok(entries)
}

/// Read one entry of a staged archive as text.
///
/// Fails with [`TdError::EntryNotFound`] when no entry matches `file_path`
/// exactly, and refuses directories and entries over 10 MiB.
pub fn read_entry(archive_path: &Path, file_path: &str) -> Result<EntryContent> {
    if !valid_entry_path(file_path) {
        return Err(TdError::InvalidArg {
            name: "file_path".to_string(),
            reason: "path must be relative and must not traverse upward".to_string(),
        });
    }

    let file = open_archive(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries().map_err(read_error)? {
        let mut entry = entry.map_err(read_error)?;
        let path = entry.path().map_err(read_error)?;
        if path.to_string_lossy() != file_path {
            continue;
        }

        if entry.header().entry_type().is_dir() {
            return Err(TdError::InvalidArg {
                name: "file_path".to_string(),
                reason: "cannot read directory contents".to_string(),
            });
        }
        let size = entry.size();
        if size > MAX_READ_SIZE {
            return Err(TdError::Io(format!(
                "entry '{}' is too large to read ({} bytes)",
                file_path, size
            )));
        }

        let mut bytes = Vec::with_capacity(size as usize);
        entry.read_to_end(&mut bytes).map_err(read_error)?;

        return Ok(EntryContent {
            file_path: file_path.to_string(),
            content: decode_text(bytes),
            size,
            extension: extension_of(file_path),
        });
    }

    Err(TdError::EntryNotFound(file_path.to_string()))
}

fn open_archive(archive_path: &Path) -> Result<File> {
    if !archive_path.exists() {
        return Err(TdError::Io(format!(
            "archive file not found: {}",
            archive_path.display()
        )));
    }
    File::open(archive_path).map_err(|e| {
        TdError::Io(format!("cannot open {}: {}", archive_path.display(), e))
    })
}

fn read_error(err: std::io::Error) -> TdError {
    TdError::Io(format!("invalid or corrupted archive: {}", err))
}

/// UTF-8 first, Latin-1 as the fallback for legacy files.
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

fn classify(extension: Option<&str>) -> &'static str {
    match extension {
        Some(".dig") => "Digdag workflow",
        Some(".sql") => "SQL query",
        Some(".py") => "Python script",
        Some(".yml") | Some(".yaml") => "YAML configuration",
        _ => "Other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    /// Build a small tar.gz fixture in a temp dir and return its path.
    fn fixture_archive(entries: &[(&str, &str)]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .unwrap();
        let path = dir.path().join("project_test.tar.gz");

        let file = File::create(&path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();

        (dir, path)
    }

    #[test]
    fn test_list_entries_classifies_and_sorts() {
        let (_dir, path) = fixture_archive(&[
            ("workflow.dig", "timezone: UTC\n"),
            ("queries/daily.sql", "select 1"),
            ("scripts/etl.py", "print('hi')"),
            ("config.yml", "a: 1"),
            ("README", "hello"),
        ]);

        let entries = list_entries(&path).unwrap();
        assert_eq!(entries.len(), 5);

        let by_name = |n: &str| entries.iter().find(|e| e.name == n).unwrap();
        assert_eq!(by_name("workflow.dig").file_type.as_deref(), Some("Digdag workflow"));
        assert_eq!(by_name("queries/daily.sql").file_type.as_deref(), Some("SQL query"));
        assert_eq!(by_name("scripts/etl.py").file_type.as_deref(), Some("Python script"));
        assert_eq!(by_name("config.yml").file_type.as_deref(), Some("YAML configuration"));
        assert_eq!(by_name("README").file_type.as_deref(), Some("Other"));
        assert_eq!(by_name("README").extension, None);
    }

    #[test]
    fn test_every_listed_entry_is_readable() {
        let (_dir, path) = fixture_archive(&[
            ("workflow.dig", "timezone: UTC\n"),
            ("queries/daily.sql", "select count(*) from events"),
        ]);

        for entry in list_entries(&path).unwrap() {
            let content = read_entry(&path, &entry.name).unwrap();
            assert_eq!(content.size, entry.size);
            assert!(!content.content.is_empty());
        }
    }

    #[test]
    fn test_read_missing_entry() {
        let (_dir, path) = fixture_archive(&[("workflow.dig", "x")]);
        let err = read_entry(&path, "nope.sql").unwrap_err();
        assert!(matches!(err, TdError::EntryNotFound(_)));
    }

    #[test]
    fn test_read_rejects_traversal() {
        let (_dir, path) = fixture_archive(&[("workflow.dig", "x")]);
        assert!(matches!(
            read_entry(&path, "../etc/passwd").unwrap_err(),
            TdError::InvalidArg { .. }
        ));
        assert!(matches!(
            read_entry(&path, "/abs/path").unwrap_err(),
            TdError::InvalidArg { .. }
        ));
    }

    #[test]
    fn test_read_latin1_fallback() {
        let (dir, _) = fixture_archive(&[]);
        let path = dir.path().join("project_latin.tar.gz");
        let file = File::create(&path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        // 0xE9 is 'é' in Latin-1 and invalid as standalone UTF-8.
        let content = [b'c', b'a', b'f', 0xE9];
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "note.txt", &content[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let read = read_entry(&path, "note.txt").unwrap();
        assert_eq!(read.content, "café");
    }

    #[test]
    fn test_missing_archive_file() {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .unwrap();
        let path = dir.path().join("project_gone.tar.gz");
        assert!(matches!(list_entries(&path).unwrap_err(), TdError::Io(_)));
    }

    #[test]
    fn test_project_id_validation() {
        assert!(valid_project_id("123456"));
        assert!(valid_project_id("my-project_1"));
        assert!(!valid_project_id(""));
        assert!(!valid_project_id("../../etc"));
        assert!(!valid_project_id("a/b"));
    }

    #[test]
    fn test_entry_path_validation() {
        assert!(valid_entry_path("workflow.dig"));
        assert!(valid_entry_path("queries/daily.sql"));
        assert!(!valid_entry_path(""));
        assert!(!valid_entry_path("/etc/passwd"));
        assert!(!valid_entry_path("a/../b"));
    }

    #[test]
    fn test_archive_path_validation() {
        let tmp = std::env::temp_dir().join("td_project_x").join("p.tar.gz");
        assert!(valid_archive_path(&tmp));
        assert!(!valid_archive_path(Path::new("/home/user/p.tar.gz")));
        let not_tgz = std::env::temp_dir().join("p.zip");
        assert!(!valid_archive_path(&not_tgz));
    }
}
