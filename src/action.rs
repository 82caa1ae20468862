use serde::{Deserialize, Serialize};
use strum::Display;

/// High-level actions emitted by widgets and dialogs for the host to carry out.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Action {
    /// Close any active dialog
    DialogClose,
    /// The user accepted the active confirmation dialog
    ConfirmAccepted,
    /// A search widget repainted the results panel with this id
    ResultsUpdated(String),
    /// A search widget committed a selection into its hidden input
    SelectionChanged { hidden_input_id: String, id: String },
    /// Submit the form with this id
    SubmitForm(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        assert_eq!(Action::DialogClose.to_string(), "DialogClose");
        assert_eq!(Action::SubmitForm("filtros".into()).to_string(), "SubmitForm");
    }
}
