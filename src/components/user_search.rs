//! Debounced user search autocomplete bound to a text input and a hidden
//! input on a page.
//!
//! Typing schedules a lookup after a quiet period. Each lookup carries the
//! request generation that was current when it was scheduled; responses
//! from older generations are dropped, so the panel always reflects the
//! latest query no matter in which order the server answers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::action::Action;
use crate::config::SearchConfig;
use crate::core::{Page, RequestGeneration, ResultsPanel, SearchResult, Selection, SharedPage};
use crate::services::{SearchError, UserDirectory};

/// Timing knobs of the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSettings {
    pub debounce: Duration,
    /// Queries with fewer characters never reach the server
    pub min_query_chars: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_query_chars: 2,
        }
    }
}

impl From<&SearchConfig> for SearchSettings {
    fn from(cfg: &SearchConfig) -> Self {
        Self {
            debounce: cfg.debounce(),
            min_query_chars: cfg.min_query_chars,
        }
    }
}

/// What was clicked while the widget was active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    Input,
    Panel,
    Outside,
}

/// Everything the results panel is drawn from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<SearchResult>,
    pub panel_open: bool,
    pub generation: RequestGeneration,
    pub selection: Selection,
}

/// Results panel for a given state. The panel is only visible while open
/// and non-empty.
pub fn render(state: &SearchState) -> ResultsPanel {
    ResultsPanel {
        visible: state.panel_open && !state.results.is_empty(),
        entries: state.results.clone(),
    }
}

struct Inner {
    page: SharedPage,
    directory: Arc<dyn UserDirectory>,
    text_input_id: String,
    hidden_input_id: String,
    panel_id: String,
    auto_submit: bool,
    settings: SearchSettings,
    state: Mutex<SearchState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    action_tx: Mutex<Option<UnboundedSender<Action>>>,
}

/// Handle to one autocomplete instance. Clones share the same widget.
#[derive(Clone)]
pub struct UserSearch {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for UserSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSearch")
            .field("text_input_id", &self.inner.text_input_id)
            .field("hidden_input_id", &self.inner.hidden_input_id)
            .field("auto_submit", &self.inner.auto_submit)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Bind an autocomplete to `text_input_id` / `hidden_input_id`.
///
/// Returns `None` when either input is missing from the page. The results
/// panel `<text_input_id>_results` is created if the page lacks one.
pub fn setup_user_search(
    page: SharedPage,
    directory: Arc<dyn UserDirectory>,
    text_input_id: &str,
    hidden_input_id: &str,
    auto_submit: bool,
    settings: SearchSettings,
) -> Option<UserSearch> {
    let panel_id = format!("{text_input_id}_results");
    let selection = {
        let mut guard = lock(&page);
        let (Some(text), Some(hidden)) = (guard.input(text_input_id), guard.input(hidden_input_id))
        else {
            debug!("User search not bound: missing '{text_input_id}' or '{hidden_input_id}'");
            return None;
        };
        let selection = Selection {
            text: text.value.clone(),
            id: hidden.value.clone(),
        };
        if guard.ensure_panel(&panel_id) {
            debug!("Created results panel '{panel_id}'");
        }
        selection
    };

    Some(UserSearch {
        inner: Arc::new(Inner {
            page,
            directory,
            text_input_id: text_input_id.to_string(),
            hidden_input_id: hidden_input_id.to_string(),
            panel_id,
            auto_submit,
            settings,
            state: Mutex::new(SearchState {
                query: selection.text.clone(),
                selection,
                ..SearchState::default()
            }),
            timer: Mutex::new(None),
            action_tx: Mutex::new(None),
        }),
    })
}

impl UserSearch {
    /// Where `ResultsUpdated`, `SelectionChanged` and `SubmitForm` go
    pub fn register_action_handler(&self, tx: UnboundedSender<Action>) {
        *lock(&self.inner.action_tx) = Some(tx);
    }

    pub fn text_input_id(&self) -> &str {
        &self.inner.text_input_id
    }

    pub fn hidden_input_id(&self) -> &str {
        &self.inner.hidden_input_id
    }

    pub fn panel_id(&self) -> &str {
        &self.inner.panel_id
    }

    /// Snapshot of the widget state
    pub fn view(&self) -> SearchState {
        lock(&self.inner.state).clone()
    }

    pub fn selection(&self) -> Selection {
        lock(&self.inner.state).selection.clone()
    }

    /// The visible input now holds `text`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle_input(&self, text: &str) {
        let inner = &self.inner;
        inner.cancel_timer();

        let mut state = lock(&inner.state);
        state.generation = state.generation.next();
        state.query = text.to_string();
        let generation = state.generation;

        let mut page = lock(&inner.page);
        inner.write_input(&mut page, &inner.text_input_id, text);
        if text.is_empty() {
            inner.write_input(&mut page, &inner.hidden_input_id, "");
            state.selection = Selection::default();
        }

        if text.chars().count() < inner.settings.min_query_chars {
            state.results.clear();
            state.panel_open = false;
            page.set_panel(&inner.panel_id, render(&state));
            trace!("Query '{text}' too short, panel cleared at {generation}");
            return;
        }
        drop(page);
        drop(state);

        let query = text.to_string();
        let widget = Arc::clone(inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(widget.settings.debounce).await;
            widget.issue_lookup(query, generation);
        });
        *lock(&inner.timer) = Some(timer);
    }

    /// The visible input was committed (blur or enter).
    ///
    /// An empty value clears the selection and, with auto submit, submits
    /// the owning form.
    pub fn handle_change(&self, text: &str) {
        if !text.is_empty() {
            return;
        }
        let inner = &self.inner;
        let form = {
            let mut state = lock(&inner.state);
            let mut page = lock(&inner.page);
            inner.write_input(&mut page, &inner.text_input_id, "");
            inner.write_input(&mut page, &inner.hidden_input_id, "");
            state.selection = Selection::default();
            state.query.clear();
            page.form_of(&inner.text_input_id).map(str::to_string)
        };
        if inner.auto_submit
            && let Some(form) = form
        {
            inner.send(Action::SubmitForm(form));
        }
    }

    /// Commit entry `index` of the current results
    pub fn select(&self, index: usize) -> Option<Selection> {
        let inner = &self.inner;
        inner.cancel_timer();

        let (selection, form) = {
            let mut state = lock(&inner.state);
            let Some(result) = state.results.get(index).cloned() else {
                debug!("No result #{index} to select in '{}'", inner.panel_id);
                return None;
            };
            let selection = Selection {
                text: result.text,
                id: result.id.to_string(),
            };
            state.generation = state.generation.next();
            state.selection = selection.clone();
            state.query = selection.text.clone();
            state.panel_open = false;

            let mut page = lock(&inner.page);
            inner.write_input(&mut page, &inner.hidden_input_id, &selection.id);
            inner.write_input(&mut page, &inner.text_input_id, &selection.text);
            page.set_panel(&inner.panel_id, render(&state));
            let form = page.form_of(&inner.text_input_id).map(str::to_string);
            (selection, form)
        };

        debug!("Selected '{}' ({})", selection.text, selection.id);
        inner.send(Action::SelectionChanged {
            hidden_input_id: inner.hidden_input_id.clone(),
            id: selection.id.clone(),
        });
        if inner.auto_submit
            && let Some(form) = form
        {
            inner.send(Action::SubmitForm(form));
        }
        Some(selection)
    }

    /// Clicks outside the input and its panel close the panel. The current
    /// selection is left alone.
    pub fn handle_click(&self, target: ClickTarget) {
        if target != ClickTarget::Outside {
            return;
        }
        let inner = &self.inner;
        let mut state = lock(&inner.state);
        if !state.panel_open {
            return;
        }
        state.panel_open = false;
        lock(&inner.page).set_panel(&inner.panel_id, render(&state));
    }
}

impl Inner {
    fn cancel_timer(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
    }

    fn write_input(&self, page: &mut Page, id: &str, value: &str) {
        if let Err(e) = page.set_input_value(id, value) {
            warn!("User search lost its input: {e}");
        }
    }

    fn send(&self, action: Action) {
        if let Some(tx) = lock(&self.action_tx).as_ref()
            && let Err(e) = tx.send(action)
        {
            debug!("No listener for user search action: {e}");
        }
    }

    /// Start the lookup for a query whose debounce elapsed. The request runs
    /// on its own task so a later keystroke cannot cancel it.
    fn issue_lookup(self: Arc<Self>, query: String, generation: RequestGeneration) {
        if lock(&self.state).generation != generation {
            trace!("Debounce for '{query}' outlived {generation}, not issuing");
            return;
        }
        debug!("Searching users for '{query}' at {generation}");
        tokio::spawn(async move {
            let outcome = self.directory.search(&query).await;
            self.apply_response(&query, generation, outcome);
        });
    }

    fn apply_response(
        &self,
        query: &str,
        generation: RequestGeneration,
        outcome: Result<Vec<SearchResult>, SearchError>,
    ) {
        let results = match outcome {
            Ok(results) => results,
            Err(e) => {
                warn!("User search for '{query}' failed: {e}");
                return;
            }
        };

        {
            let mut state = lock(&self.state);
            if state.generation != generation {
                debug!(
                    "Discarding stale results for '{query}' ({generation}, current {})",
                    state.generation
                );
                return;
            }
            state.panel_open = !results.is_empty();
            state.results = results;
            lock(&self.page).set_panel(&self.panel_id, render(&state));
        }
        self.send(Action::ResultsUpdated(self.panel_id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InputElement, ResultId};
    use pretty_assertions::assert_eq;

    struct NoDirectory;

    #[async_trait::async_trait]
    impl UserDirectory for NoDirectory {
        async fn search(&self, _query: &str) -> Result<Vec<SearchResult>, SearchError> {
            Ok(Vec::new())
        }
    }

    fn page() -> SharedPage {
        Page::new()
            .with_input(InputElement::text("usuario_q"))
            .with_input(InputElement::hidden("usuario_id").in_form("filtros"))
            .into_shared()
    }

    #[test]
    fn test_render_is_hidden_when_closed_or_empty() {
        let mut state = SearchState::default();
        assert!(!render(&state).visible);

        state.panel_open = true;
        assert!(!render(&state).visible);

        state.results = vec![SearchResult::new("1", "Ana")];
        let panel = render(&state);
        assert!(panel.visible);
        assert_eq!(panel.entries[0].id, ResultId::from("1"));
    }

    #[test]
    fn test_setup_requires_both_inputs() {
        let page = Page::new().with_input(InputElement::text("usuario_q")).into_shared();
        let widget = setup_user_search(
            page,
            Arc::new(NoDirectory),
            "usuario_q",
            "usuario_id",
            false,
            SearchSettings::default(),
        );
        assert!(widget.is_none());
    }

    #[test]
    fn test_setup_creates_panel_and_reads_selection() {
        let page = page();
        lock(&page).set_input_value("usuario_id", "9").unwrap();
        let widget = setup_user_search(
            Arc::clone(&page),
            Arc::new(NoDirectory),
            "usuario_q",
            "usuario_id",
            false,
            SearchSettings::default(),
        )
        .unwrap();

        assert_eq!(widget.panel_id(), "usuario_q_results");
        assert_eq!(lock(&page).panel("usuario_q_results"), Some(&ResultsPanel::hidden()));
        assert_eq!(widget.selection().id, "9");
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        let widget = setup_user_search(
            page(),
            Arc::new(NoDirectory),
            "usuario_q",
            "usuario_id",
            true,
            SearchSettings::default(),
        )
        .unwrap();
        assert!(widget.select(3).is_none());
        assert_eq!(widget.view().generation, RequestGeneration::default());
    }

    #[test]
    fn test_settings_from_config() {
        let cfg = SearchConfig {
            debounce_ms: 120,
            min_query_chars: 3,
            ..SearchConfig::default()
        };
        let settings = SearchSettings::from(&cfg);
        assert_eq!(settings.debounce, Duration::from_millis(120));
        assert_eq!(settings.min_query_chars, 3);
    }
}
