pub mod action;
pub mod components;
pub mod config;
pub mod core;
pub mod dialog;
pub mod logging;
pub mod services;

pub use action::Action;
pub use components::{TableExporter, UserSearch, setup_user_search};
pub use config::Config;
pub use core::{Page, SearchResult, Selection};
pub use dialog::{ConfirmModal, ConfirmRequest, Notifier, Severity};
pub use services::{DirectoryDownloads, HttpUserDirectory, UserDirectory};
