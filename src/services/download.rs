//! Delivery of generated files to the user.

use std::fs::create_dir_all;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use directories::UserDirs;
use tempfile::NamedTempFile;
use tracing::debug;

const FALLBACK_FILENAME: &str = "download";

/// A generated file waiting to be handed to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Somewhere a download can be delivered to.
///
/// Delivery is one-shot: once `deliver` returns, nothing the sink created
/// for the transfer is left behind except the delivered file.
pub trait DownloadSink {
    /// Deliver the file and return where it ended up
    fn deliver(&self, download: &Download) -> io::Result<PathBuf>;
}

/// Saves downloads into a directory, the way a browser fills the user's
/// downloads folder.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The platform downloads folder, if the user has one
    pub fn user_default() -> Option<Self> {
        UserDirs::new()
            .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
            .map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectoryDownloads {
    fn deliver(&self, download: &Download) -> io::Result<PathBuf> {
        create_dir_all(&self.dir)?;
        let name = sanitize_filename(&download.filename);

        // Write next to the destination and move into place in one step
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&download.bytes)?;
        tmp.flush()?;

        let mut attempt = 0usize;
        loop {
            let dest = self.dir.join(numbered_filename(&name, attempt));
            match tmp.persist_noclobber(&dest) {
                Ok(_) => {
                    debug!(
                        "Delivered {} ({} bytes, {}) to {}",
                        download.filename,
                        download.bytes.len(),
                        download.mime_type,
                        dest.display()
                    );
                    return Ok(dest);
                }
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    tmp = err.file;
                    attempt += 1;
                }
                Err(err) => return Err(err.error),
            }
        }
    }
}

/// Strip any directory components; a download only ever names a file.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match last {
        "" | "." | ".." => FALLBACK_FILENAME.to_string(),
        name => name.to_string(),
    }
}

/// `informe.csv`, `informe (1).csv`, `informe (2).csv`, ...
fn numbered_filename(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({attempt}){}", &name[..dot], &name[dot..]),
        _ => format!("{name} ({attempt})"),
    }
}
