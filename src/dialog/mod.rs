pub mod confirm_dialog;
pub mod notifier;

pub use confirm_dialog::{
    ConfirmDialog, ConfirmModal, ConfirmRequest, OnConfirm, RequestKind, Severity,
    confirm_then_submit,
};
pub use notifier::{Notifier, RecordingNotifier, StderrNotifier};
