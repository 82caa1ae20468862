//! In-memory model of a server-rendered console page.
//!
//! Only the parts the console behaviors touch are modeled: tables (for CSV
//! export), input elements (for the user search widget) and the results
//! panels the widget renders into. Pages are usually parsed from the HTML the
//! server produced, but tests and the terminal front-end build them directly.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;

use super::types::SearchResult;

/// A page shared between the host and the widgets bound to it.
pub type SharedPage = Arc<Mutex<Page>>;

/// Tags whose text never shows up in a rendered cell
const UNRENDERED_TAGS: &[&str] = &["script", "style", "template", "noscript"];

lazy_static! {
    static ref TABLE: Selector = Selector::parse("table").expect("static selector");
    static ref ROW: Selector = Selector::parse("tr").expect("static selector");
    static ref CELL: Selector = Selector::parse("td, th").expect("static selector");
    static ref FORM: Selector = Selector::parse("form").expect("static selector");
    static ref INPUT: Selector = Selector::parse("input[id]").expect("static selector");
    static ref PANEL: Selector = Selector::parse(r#"div[id$="_results"]"#).expect("static selector");
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PageError {
    #[error("no element with id '{0}' on the page")]
    MissingElement(String),
}

/// Table as rendered on the page: rows of visible cell text.
///
/// Rows are not required to have the same number of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Hidden,
    Other,
}

impl InputKind {
    fn from_type_attr(attr: Option<&str>) -> Self {
        match attr.map(|t| t.to_ascii_lowercase()).as_deref() {
            None | Some("text") | Some("search") => Self::Text,
            Some("hidden") => Self::Hidden,
            Some(_) => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElement {
    pub id: String,
    pub kind: InputKind,
    pub value: String,
    /// Id of the form that owns this input, if any
    pub form: Option<String>,
}

impl InputElement {
    pub fn text(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: InputKind::Text,
            value: String::new(),
            form: None,
        }
    }

    pub fn hidden(id: impl Into<String>) -> Self {
        Self {
            kind: InputKind::Hidden,
            ..Self::text(id)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn in_form(mut self, form: impl Into<String>) -> Self {
        self.form = Some(form.into());
        self
    }
}

/// Dropdown list rendered under a search input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsPanel {
    pub visible: bool,
    pub entries: Vec<SearchResult>,
}

impl ResultsPanel {
    pub fn hidden() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    tables: Vec<Table>,
    inputs: BTreeMap<String, InputElement>,
    panels: BTreeMap<String, ResultsPanel>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a page from server-rendered HTML.
    pub fn parse_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut page = Page::new();

        for table in document.select(&TABLE) {
            page.tables.push(read_table(table));
        }

        let mut form_keys = HashMap::new();
        for (idx, form) in document.select(&FORM).enumerate() {
            let key = form
                .value()
                .attr("id")
                .or_else(|| form.value().attr("name"))
                .map(str::to_string)
                .unwrap_or_else(|| format!("form-{idx}"));
            form_keys.insert(form.id(), key);
        }

        for input in document.select(&INPUT) {
            let attrs = input.value();
            let Some(id) = attrs.attr("id") else { continue };
            // An explicit form="..." attribute wins over the enclosing form
            let form = attrs.attr("form").map(str::to_string).or_else(|| {
                input
                    .ancestors()
                    .find_map(|node| form_keys.get(&node.id()).cloned())
            });
            page.inputs.insert(
                id.to_string(),
                InputElement {
                    id: id.to_string(),
                    kind: InputKind::from_type_attr(attrs.attr("type")),
                    value: attrs.attr("value").unwrap_or_default().to_string(),
                    form,
                },
            );
        }

        for panel in document.select(&PANEL) {
            if let Some(id) = panel.value().attr("id") {
                page.panels.insert(id.to_string(), ResultsPanel::hidden());
            }
        }

        page
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_input(mut self, input: InputElement) -> Self {
        self.inputs.insert(input.id.clone(), input);
        self
    }

    pub fn into_shared(self) -> SharedPage {
        Arc::new(Mutex::new(self))
    }

    /// First table in document order
    pub fn first_table(&self) -> Option<&Table> {
        self.tables.first()
    }

    pub fn input(&self, id: &str) -> Option<&InputElement> {
        self.inputs.get(id)
    }

    pub fn input_value(&self, id: &str) -> Option<&str> {
        self.inputs.get(id).map(|input| input.value.as_str())
    }

    pub fn set_input_value(&mut self, id: &str, value: impl Into<String>) -> Result<(), PageError> {
        let input = self
            .inputs
            .get_mut(id)
            .ok_or_else(|| PageError::MissingElement(id.to_string()))?;
        input.value = value.into();
        Ok(())
    }

    /// Form owning the given input, if both exist
    pub fn form_of(&self, id: &str) -> Option<&str> {
        self.inputs.get(id).and_then(|input| input.form.as_deref())
    }

    /// Create an empty, hidden panel under `id` unless one already exists.
    ///
    /// Returns true when the panel was created.
    pub fn ensure_panel(&mut self, id: &str) -> bool {
        if self.panels.contains_key(id) {
            return false;
        }
        self.panels.insert(id.to_string(), ResultsPanel::hidden());
        true
    }

    pub fn panel(&self, id: &str) -> Option<&ResultsPanel> {
        self.panels.get(id)
    }

    pub fn set_panel(&mut self, id: &str, panel: ResultsPanel) {
        self.panels.insert(id.to_string(), panel);
    }
}

fn read_table(table: ElementRef<'_>) -> Table {
    let rows = table
        .select(&ROW)
        .map(|row| row.select(&CELL).map(visible_text).collect())
        .collect();
    Table::new(rows)
}

/// Text a reader would see in the element: text nodes outside of
/// script-like or `hidden` elements, with `<br>` as a line break.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => {
                let suppressed = node.ancestors().any(|ancestor| match ancestor.value() {
                    Node::Element(el) => {
                        UNRENDERED_TAGS.contains(&el.name()) || el.attr("hidden").is_some()
                    }
                    _ => false,
                });
                if !suppressed {
                    out.push_str(&text.text);
                }
            }
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}
