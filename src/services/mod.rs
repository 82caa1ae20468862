pub mod download;
pub mod export_service;
pub mod search_service;

pub use download::{DirectoryDownloads, Download, DownloadSink};
pub use export_service::{CsvDocument, CSV_MIME_TYPE, UTF8_BOM};
pub use search_service::{HttpUserDirectory, SearchError, UserDirectory};
