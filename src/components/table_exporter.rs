//! Export of the page's first table as a CSV download.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::Page;
use crate::dialog::Notifier;
use crate::services::{CSV_MIME_TYPE, CsvDocument, Download, DownloadSink};

/// Notice shown when the page has no table to export
pub const NO_DATA_NOTICE: &str = "No hay datos para exportar";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not deliver the export: {0}")]
    Download(#[from] io::Error),
}

/// Turns on-screen tables into CSV downloads
#[derive(Debug, Clone)]
pub struct TableExporter<S, N> {
    sink: S,
    notifier: N,
}

impl<S: DownloadSink, N: Notifier> TableExporter<S, N> {
    pub fn new(sink: S, notifier: N) -> Self {
        Self { sink, notifier }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Serialize the first table of `page` and deliver it as `filename`.
    ///
    /// Returns the delivered path, or `None` when the page has no table, in
    /// which case the user is notified and nothing is downloaded.
    pub fn export_table_to_csv(
        &self,
        page: &Page,
        filename: &str,
        trim_last_column: bool,
    ) -> Result<Option<PathBuf>, ExportError> {
        let Some(table) = page.first_table() else {
            debug!("No table on page, skipping export of {filename}");
            self.notifier.alert(NO_DATA_NOTICE);
            return Ok(None);
        };

        let document = CsvDocument::from_table(table, trim_last_column);
        let download = Download::new(filename, CSV_MIME_TYPE, document.to_bytes());
        let path = self.sink.deliver(&download)?;
        info!(
            "Exported {} rows to {}",
            document.records().len(),
            path.display()
        );
        Ok(Some(path))
    }
}
