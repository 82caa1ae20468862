use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget};

use crate::core::ResultsPanel;

/// Dropdown drawn under the search input from a rendered `ResultsPanel`
#[derive(Debug, Clone)]
pub struct ResultsList<'a> {
    panel: &'a ResultsPanel,
}

impl<'a> ResultsList<'a> {
    pub fn new(panel: &'a ResultsPanel) -> Self {
        Self { panel }
    }

    /// Entry drawn on terminal row `row` when the list was rendered into
    /// `area` with `state`. Accounts for the list's scroll offset.
    pub fn entry_at(&self, area: Rect, state: &ListState, row: u16) -> Option<usize> {
        if !self.panel.visible || row <= area.y || row + 1 >= area.bottom() {
            return None;
        }
        let index = state.offset() + usize::from(row - area.y - 1);
        (index < self.panel.entries.len()).then_some(index)
    }

    /// Rows needed to show every entry plus borders
    pub fn height(&self) -> u16 {
        if self.panel.visible {
            self.panel.entries.len() as u16 + 2
        } else {
            0
        }
    }
}

impl StatefulWidget for ResultsList<'_> {
    type State = ListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut ListState) {
        if !self.panel.visible || area.height == 0 {
            return;
        }
        let items: Vec<ListItem> = self
            .panel
            .entries
            .iter()
            .map(|entry| ListItem::new(entry.text.as_str()))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan))
            .highlight_symbol("> ");
        StatefulWidget::render(list, area, buf, state);
    }
}
