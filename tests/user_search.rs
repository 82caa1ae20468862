//! Debounce, ordering and selection behavior of the user search widget,
//! driven on a paused Tokio clock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempus_console::action::Action;
use tempus_console::components::{ClickTarget, SearchSettings, UserSearch, setup_user_search};
use tempus_console::core::{Page, SearchResult, SharedPage};
use tempus_console::services::{SearchError, UserDirectory};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::sleep;

const FORM: &str = r#"
<form id="filtros" action="/admin/fichajes">
  <input id="usuario_q" type="text" value="">
  <input id="usuario_id" type="hidden" name="usuario_id" value="">
</form>
"#;

/// Directory answering `Usuario <query>` after a per-query delay
#[derive(Default)]
struct FakeDirectory {
    calls: Mutex<Vec<String>>,
    delays: HashMap<String, Duration>,
    failing: Vec<String>,
}

impl FakeDirectory {
    fn with_delay(mut self, query: &str, millis: u64) -> Self {
        self.delays.insert(query.to_string(), Duration::from_millis(millis));
        self
    }

    fn failing_on(mut self, query: &str) -> Self {
        self.failing.push(query.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserDirectory for FakeDirectory {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.lock().unwrap().push(query.to_string());
        let delay = self.delays.get(query).copied().unwrap_or(Duration::from_millis(20));
        sleep(delay).await;
        if self.failing.iter().any(|q| q == query) {
            let err = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
            return Err(SearchError::Decode(err));
        }
        Ok(vec![
            SearchResult::new(format!("{query}-1"), format!("Usuario {query}")),
            SearchResult::new(format!("{query}-2"), format!("Usuaria {query}")),
        ])
    }
}

struct Harness {
    page: SharedPage,
    widget: UserSearch,
    directory: Arc<FakeDirectory>,
    actions: UnboundedReceiver<Action>,
}

impl Harness {
    fn new(directory: FakeDirectory, auto_submit: bool) -> Self {
        let page = Page::parse_html(FORM).into_shared();
        let directory = Arc::new(directory);
        let widget = setup_user_search(
            Arc::clone(&page),
            directory.clone(),
            "usuario_q",
            "usuario_id",
            auto_submit,
            SearchSettings::default(),
        )
        .expect("both inputs are on the page");
        let (tx, actions) = unbounded_channel();
        widget.register_action_handler(tx);
        Self {
            page,
            widget,
            directory,
            actions,
        }
    }

    fn hidden_value(&self) -> String {
        self.page.lock().unwrap().input_value("usuario_id").unwrap().to_string()
    }

    fn text_value(&self) -> String {
        self.page.lock().unwrap().input_value("usuario_q").unwrap().to_string()
    }

    fn panel_texts(&self) -> Option<Vec<String>> {
        let page = self.page.lock().unwrap();
        let panel = page.panel("usuario_q_results").unwrap();
        panel
            .visible
            .then(|| panel.entries.iter().map(|e| e.text.clone()).collect())
    }

    fn drain(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        while let Ok(action) = self.actions.try_recv() {
            out.push(action);
        }
        out
    }
}

async fn settle() {
    sleep(Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn short_query_never_reaches_the_server() {
    let h = Harness::new(FakeDirectory::default(), false);
    h.widget.handle_input("a");
    settle().await;

    assert!(h.directory.calls().is_empty());
    assert_eq!(h.panel_texts(), None);
}

#[tokio::test(start_paused = true)]
async fn typing_within_debounce_issues_one_request() {
    let h = Harness::new(FakeDirectory::default(), false);
    h.widget.handle_input("ab");
    sleep(Duration::from_millis(100)).await;
    h.widget.handle_input("abc");
    settle().await;

    assert_eq!(h.directory.calls(), vec!["abc".to_string()]);
    assert_eq!(
        h.panel_texts(),
        Some(vec!["Usuario abc".to_string(), "Usuaria abc".to_string()])
    );
}

#[tokio::test(start_paused = true)]
async fn slow_older_response_is_discarded() {
    let mut h = Harness::new(
        FakeDirectory::default().with_delay("ab", 500).with_delay("abc", 50),
        false,
    );
    h.widget.handle_input("ab");
    // Past the debounce so the "ab" request is in flight
    sleep(Duration::from_millis(350)).await;
    h.widget.handle_input("abc");
    settle().await;

    assert_eq!(h.directory.calls(), vec!["ab".to_string(), "abc".to_string()]);
    assert_eq!(h.widget.view().query, "abc");
    assert_eq!(
        h.panel_texts(),
        Some(vec!["Usuario abc".to_string(), "Usuaria abc".to_string()])
    );
    assert_eq!(h.drain(), vec![Action::ResultsUpdated("usuario_q_results".into())]);
}

#[tokio::test(start_paused = true)]
async fn short_query_discards_pending_response() {
    let h = Harness::new(FakeDirectory::default().with_delay("ana", 400), false);
    h.widget.handle_input("ana");
    sleep(Duration::from_millis(350)).await;
    h.widget.handle_input("a");
    settle().await;

    assert_eq!(h.directory.calls(), vec!["ana".to_string()]);
    assert_eq!(h.panel_texts(), None);
}

#[tokio::test(start_paused = true)]
async fn selecting_fills_inputs_and_submits() {
    let mut h = Harness::new(FakeDirectory::default(), true);
    h.widget.handle_input("ana");
    settle().await;

    let selection = h.widget.select(1).unwrap();
    assert_eq!(selection.id, "ana-2");
    assert_eq!(h.hidden_value(), "ana-2");
    assert_eq!(h.text_value(), "Usuaria ana");
    assert_eq!(h.panel_texts(), None);
    assert_eq!(
        h.drain(),
        vec![
            Action::ResultsUpdated("usuario_q_results".into()),
            Action::SelectionChanged {
                hidden_input_id: "usuario_id".into(),
                id: "ana-2".into(),
            },
            Action::SubmitForm("filtros".into()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn selecting_without_auto_submit_does_not_submit() {
    let mut h = Harness::new(FakeDirectory::default(), false);
    h.widget.handle_input("luis");
    settle().await;
    h.drain();

    h.widget.select(0).unwrap();
    let actions = h.drain();
    assert!(!actions.iter().any(|a| matches!(a, Action::SubmitForm(_))));
    assert_eq!(h.hidden_value(), "luis-1");
}

#[tokio::test(start_paused = true)]
async fn response_after_selection_is_ignored() {
    let h = Harness::new(FakeDirectory::default().with_delay("pedro", 500), false);
    h.widget.handle_input("pe");
    settle().await;
    h.widget.handle_input("pedro");
    sleep(Duration::from_millis(350)).await;
    h.widget.select(0).unwrap();
    settle().await;

    assert_eq!(h.hidden_value(), "pe-1");
    assert_eq!(h.panel_texts(), None);
}

#[tokio::test(start_paused = true)]
async fn clearing_the_input_resets_the_selection() {
    let mut h = Harness::new(FakeDirectory::default(), true);
    h.widget.handle_input("ana");
    settle().await;
    h.widget.select(0).unwrap();
    h.drain();

    h.widget.handle_input("");
    assert_eq!(h.hidden_value(), "");
    assert!(h.widget.selection().is_empty());
    assert!(h.drain().is_empty());

    h.widget.handle_change("");
    assert_eq!(h.drain(), vec![Action::SubmitForm("filtros".into())]);
}

#[tokio::test(start_paused = true)]
async fn clicking_outside_hides_panel_and_keeps_selection() {
    let h = Harness::new(FakeDirectory::default(), false);
    h.widget.handle_input("ana");
    settle().await;
    h.widget.select(0).unwrap();

    h.widget.handle_input("mar");
    settle().await;
    assert!(h.panel_texts().is_some());

    h.widget.handle_click(ClickTarget::Input);
    assert!(h.panel_texts().is_some());

    h.widget.handle_click(ClickTarget::Outside);
    assert_eq!(h.panel_texts(), None);
    assert_eq!(h.hidden_value(), "ana-1");
}

#[tokio::test(start_paused = true)]
async fn failed_lookup_leaves_panel_unchanged() {
    let mut h = Harness::new(FakeDirectory::default().failing_on("anx"), false);
    h.widget.handle_input("ana");
    settle().await;
    h.drain();

    h.widget.handle_input("anx");
    settle().await;

    assert_eq!(h.directory.calls(), vec!["ana".to_string(), "anx".to_string()]);
    assert_eq!(
        h.panel_texts(),
        Some(vec!["Usuario ana".to_string(), "Usuaria ana".to_string()])
    );
    assert!(h.drain().is_empty());
}

#[tokio::test(start_paused = true)]
async fn widgets_on_one_page_are_independent() {
    let page = Page::parse_html(
        r#"<form id="a"><input id="q1"><input id="h1" type="hidden"></form>
           <form id="b"><input id="q2"><input id="h2" type="hidden"></form>"#,
    )
    .into_shared();
    let directory = Arc::new(FakeDirectory::default());
    let first = setup_user_search(
        Arc::clone(&page),
        directory.clone(),
        "q1",
        "h1",
        false,
        SearchSettings::default(),
    )
    .unwrap();
    let second = setup_user_search(
        Arc::clone(&page),
        directory.clone(),
        "q2",
        "h2",
        false,
        SearchSettings::default(),
    )
    .unwrap();

    first.handle_input("ana");
    sleep(Duration::from_millis(100)).await;
    second.handle_input("luis");
    settle().await;

    let page = page.lock().unwrap();
    assert_eq!(page.panel("q1_results").unwrap().entries[0].text, "Usuario ana");
    assert_eq!(page.panel("q2_results").unwrap().entries[0].text, "Usuario luis");
}
