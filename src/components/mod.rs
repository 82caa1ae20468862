use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::action::Action;

pub mod dialog_layout;
pub mod results_list;
pub mod table_exporter;
pub mod user_search;

pub use results_list::ResultsList;
pub use table_exporter::{ExportError, NO_DATA_NOTICE, TableExporter};
pub use user_search::{ClickTarget, SearchSettings, SearchState, UserSearch, render, setup_user_search};

/// Terminal UI element that reacts to keys and draws itself
pub trait Component {
    /// Handle a key press, optionally asking the host to carry out an action
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>>;

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()>;
}
